//! Custom Axum extractors for session authentication
//!
//! Handlers that need a signed-in principal take [`RequireSession<P>`] as an
//! argument; requests without a valid session are rejected with a uniform
//! `401` before the handler runs.

use super::errors::ApiError;
use super::handlers::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::session::{Authenticated, Principal, SessionAuthenticator};

/// State that can authenticate principals of kind `P`.
pub trait AuthenticatorFor<P: Principal> {
    fn authenticator(&self) -> &SessionAuthenticator<P>;
}

/// Authenticated principal extractor
///
/// # Example
/// ```ignore
/// async fn kiosk_session(
///     RequireSession(session): RequireSession<KioskPrincipal>,
/// ) -> Json<KioskSessionResponse> {
///     // session.principal is verified here
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireSession<P>(pub Authenticated<P>);

impl<P> std::ops::Deref for RequireSession<P> {
    type Target = Authenticated<P>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S, P> FromRequestParts<S> for RequireSession<P>
where
    S: Send + Sync,
    P: Principal,
    Arc<AppState>: FromRef<S>,
    AppState: AuthenticatorFor<P>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let cookies = cookie_header(&parts.headers);

        AuthenticatorFor::<P>::authenticator(app_state.as_ref())
            .authenticate(cookies.as_deref())
            .map(RequireSession)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Join every `Cookie:` header into one (HTTP/2 clients may split them).
pub(crate) fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
