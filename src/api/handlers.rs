//! Login, logout and session handlers for kiosks and members.

use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::errors::ApiError;
use super::extractors::{AuthenticatorFor, RequireSession};
use crate::config::{Config, ConfigError};
use crate::directory::Directory;
use crate::secret::Secret;
use crate::session::{
    KioskPrincipal, MemberPrincipal, Principal, SessionAuthenticator, SessionIssuer,
    SessionSettings,
};

/// Issuer and authenticator for one principal kind, sharing one secret.
pub struct SessionService<P> {
    pub issuer: SessionIssuer<P>,
    pub authenticator: SessionAuthenticator<P>,
}

impl<P: Principal> SessionService<P> {
    pub fn new(secret: Secret, settings: SessionSettings) -> Self {
        let secret = Arc::new(secret);
        let authenticator = SessionAuthenticator::new(secret.clone(), settings.cookie_name.clone());
        Self {
            issuer: SessionIssuer::new(secret, settings),
            authenticator,
        }
    }
}

/// Application state shared across all handlers
pub struct AppState {
    pub kiosk: SessionService<KioskPrincipal>,
    pub member: SessionService<MemberPrincipal>,
    pub directory: Arc<dyn Directory>,
}

impl AppState {
    /// Resolve secrets and session settings. A missing secret is fatal.
    pub fn from_config(config: &Config, directory: Arc<dyn Directory>) -> Result<Self, ConfigError> {
        Ok(Self {
            kiosk: SessionService::new(config.kiosk_secret()?, config.kiosk_settings()?),
            member: SessionService::new(config.member_secret()?, config.member_settings()?),
            directory,
        })
    }
}

impl AuthenticatorFor<KioskPrincipal> for AppState {
    fn authenticator(&self) -> &SessionAuthenticator<KioskPrincipal> {
        &self.kiosk.authenticator
    }
}

impl AuthenticatorFor<MemberPrincipal> for AppState {
    fn authenticator(&self) -> &SessionAuthenticator<MemberPrincipal> {
        &self.member.authenticator
    }
}

#[derive(Deserialize)]
pub struct KioskLoginRequest {
    event_code: String,
    pin: String,
}

#[derive(Deserialize)]
pub struct MemberLoginRequest {
    member_id: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct KioskSessionResponse {
    event_code: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MemberSessionResponse {
    member_id: String,
    display_name: String,
    email: String,
    expires_at: DateTime<Utc>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn require_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", name)));
    }
    Ok(())
}

/// POST /api/kiosk/login — check the event PIN, set the kiosk cookie.
pub async fn kiosk_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<KioskLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("event_code", &body.event_code)?;

    let principal = match state.directory.check_kiosk(&body.event_code, &body.pin).await {
        Some(p) => p,
        None => {
            warn!("kiosk login failed for event {}", body.event_code);
            return Err(ApiError::Unauthorized);
        }
    };

    let issuer = &state.kiosk.issuer;
    let session = issuer.issue(principal)?;
    info!("kiosk signed in for event {}", body.event_code);

    Ok((
        [(header::SET_COOKIE, issuer.set_cookie(&session))],
        Json(LoginResponse {
            ok: true,
            expires_at: Some(session.expires_at),
        }),
    ))
}

/// POST /api/kiosk/logout — clear the kiosk cookie.
pub async fn kiosk_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.kiosk.issuer.logout_cookie())],
        Json(LoginResponse {
            ok: true,
            expires_at: None,
        }),
    )
}

/// GET /api/kiosk/session — current kiosk principal.
pub async fn kiosk_session(
    RequireSession(session): RequireSession<KioskPrincipal>,
) -> Json<KioskSessionResponse> {
    Json(KioskSessionResponse {
        event_code: session.principal.event_code,
        expires_at: session.expires_at,
    })
}

/// POST /api/member/login — check the member password, set the member cookie.
pub async fn member_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MemberLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_field("member_id", &body.member_id)?;

    let principal = match state
        .directory
        .check_member(&body.member_id, &body.password)
        .await
    {
        Some(p) => p,
        None => {
            warn!("member login failed for {}", body.member_id);
            return Err(ApiError::Unauthorized);
        }
    };

    let issuer = &state.member.issuer;
    let session = issuer.issue(principal)?;
    info!("member {} signed in", body.member_id);

    Ok((
        [(header::SET_COOKIE, issuer.set_cookie(&session))],
        Json(LoginResponse {
            ok: true,
            expires_at: Some(session.expires_at),
        }),
    ))
}

/// POST /api/member/logout — clear the member cookie.
pub async fn member_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.member.issuer.logout_cookie())],
        Json(LoginResponse {
            ok: true,
            expires_at: None,
        }),
    )
}

/// GET /api/member/session — current member and profile hints.
pub async fn member_session(
    RequireSession(session): RequireSession<MemberPrincipal>,
) -> Json<MemberSessionResponse> {
    let member = session.principal;
    Json(MemberSessionResponse {
        member_id: member.member_id,
        display_name: member.display_name,
        email: member.email,
        expires_at: session.expires_at,
    })
}
