//! Session issuance and authentication for kiosk and member principals.
//!
//! There is no server-side session table. An issued token is the whole
//! session; logging out re-issues the cookie with a zero lifetime and
//! expiry is enforced by the verifier.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cookie::{build_set_cookie, parse_cookie, CookieOptions};
use crate::secret::Secret;
use crate::token::{self, EncodeError, Rejection, SessionPayload};

/// Kiosk session TTL: 12 hours.
pub const KIOSK_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Member session TTL: 7 days.
pub const MEMBER_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A kind of authenticated identity carried in a session token.
pub trait Principal: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Short label used in logs and errors.
    const KIND: &'static str;

    /// Cookie name used when none is configured.
    const COOKIE_NAME: &'static str;

    /// Lifetime used when none is configured.
    const DEFAULT_TTL: Duration;
}

/// Kiosk operator signed in for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KioskPrincipal {
    pub event_code: String,
}

impl Principal for KioskPrincipal {
    const KIND: &'static str = "kiosk";
    const COOKIE_NAME: &'static str = "kiosk_session";
    const DEFAULT_TTL: Duration = KIOSK_SESSION_TTL;
}

/// Club member. The display fields are hints for rendering only; the
/// record store stays authoritative for profile data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberPrincipal {
    pub member_id: String,
    pub display_name: String,
    pub email: String,
}

impl Principal for MemberPrincipal {
    const KIND: &'static str = "member";
    const COOKIE_NAME: &'static str = "member_session";
    const DEFAULT_TTL: Duration = MEMBER_SESSION_TTL;
}

/// Per-kind session settings shared by the issuer and the authenticator.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub lifetime: Duration,
    /// Adds `Secure` to issued cookies.
    pub production: bool,
}

impl SessionSettings {
    pub fn defaults_for<P: Principal>(production: bool) -> Self {
        Self {
            cookie_name: P::COOKIE_NAME.to_string(),
            lifetime: P::DEFAULT_TTL,
            production,
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Cookie `Max-Age` in seconds.
    pub max_age: u64,
}

/// Issues signed tokens for principal `P`.
pub struct SessionIssuer<P> {
    secret: Arc<Secret>,
    settings: SessionSettings,
    _principal: std::marker::PhantomData<fn() -> P>,
}

impl<P: Principal> SessionIssuer<P> {
    pub fn new(secret: Arc<Secret>, settings: SessionSettings) -> Self {
        Self {
            secret,
            settings,
            _principal: std::marker::PhantomData,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Issue a token with the configured lifetime.
    pub fn issue(&self, principal: P) -> Result<IssuedSession, EncodeError> {
        self.issue_at(principal, self.settings.lifetime, Utc::now())
    }

    /// Issue a token with an explicit lifetime, as of `now`.
    pub fn issue_at(
        &self,
        principal: P,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, EncodeError> {
        let lifetime_ms = i64::try_from(lifetime.as_millis()).unwrap_or(i64::MAX);
        let exp = now.timestamp_millis().saturating_add(lifetime_ms);
        let payload = SessionPayload::new(principal, exp);
        let token = token::pack(&payload, &self.secret)?;

        debug!(
            "issued {} session expiring at {}",
            P::KIND,
            millis_to_datetime(exp)
        );

        Ok(IssuedSession {
            token,
            expires_at: millis_to_datetime(exp),
            max_age: max_age_secs(lifetime),
        })
    }

    /// `Set-Cookie` value carrying `session`.
    pub fn set_cookie(&self, session: &IssuedSession) -> String {
        let options = CookieOptions::session(
            Duration::from_secs(session.max_age),
            self.settings.production,
        );
        build_set_cookie(&self.settings.cookie_name, &session.token, &options)
    }

    /// `Set-Cookie` value that clears the session cookie.
    pub fn logout_cookie(&self) -> String {
        let options = CookieOptions::expired(self.settings.production);
        build_set_cookie(&self.settings.cookie_name, "", &options)
    }
}

/// A verified principal together with its token expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated<P> {
    pub principal: P,
    pub expires_at: DateTime<Utc>,
}

/// Turns an inbound `Cookie:` header into a principal, or nothing.
pub struct SessionAuthenticator<P> {
    secret: Arc<Secret>,
    cookie_name: String,
    _principal: std::marker::PhantomData<fn() -> P>,
}

impl<P: Principal> SessionAuthenticator<P> {
    pub fn new(secret: Arc<Secret>, cookie_name: impl Into<String>) -> Self {
        Self {
            secret,
            cookie_name: cookie_name.into(),
            _principal: std::marker::PhantomData,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Authenticate against the current clock. Every failure, including a
    /// missing cookie, is `None`.
    pub fn authenticate(&self, cookie_header: Option<&str>) -> Option<Authenticated<P>> {
        self.authenticate_at(cookie_header, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        cookie_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Authenticated<P>> {
        let token = parse_cookie(cookie_header?, &self.cookie_name)?;
        match self.verify_at(&token, now) {
            Ok(authenticated) => Some(authenticated),
            Err(rejection) => {
                debug!("{} session rejected: {}", P::KIND, rejection);
                None
            }
        }
    }

    /// Verify a bare token, keeping the rejection reason for the caller's
    /// logs. Never hand the reason to a client.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Authenticated<P>, Rejection> {
        let payload: SessionPayload<P> =
            token::verify_at(token, &self.secret, now.timestamp_millis())?;
        Ok(Authenticated {
            expires_at: millis_to_datetime(payload.exp),
            principal: payload.claims,
        })
    }
}

/// Whole seconds for `Max-Age`, rounded up so a short but non-zero lifetime
/// never turns into a deleting `Max-Age=0`.
fn max_age_secs(lifetime: Duration) -> u64 {
    lifetime.as_secs() + u64::from(lifetime.subsec_nanos() > 0)
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::resolve_secret;

    fn secret(value: &str) -> Arc<Secret> {
        Arc::new(Secret::new(value).unwrap())
    }

    fn kiosk_pair(value: &str) -> (SessionIssuer<KioskPrincipal>, SessionAuthenticator<KioskPrincipal>) {
        let secret = secret(value);
        let settings = SessionSettings::defaults_for::<KioskPrincipal>(false);
        let auth = SessionAuthenticator::new(secret.clone(), settings.cookie_name.clone());
        (SessionIssuer::new(secret, settings), auth)
    }

    fn spring() -> KioskPrincipal {
        KioskPrincipal {
            event_code: "SPRING25".to_string(),
        }
    }

    fn cookie_header(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_issue_and_authenticate_kiosk() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let session = issuer.issue(spring()).unwrap();
        assert_eq!(session.max_age, 12 * 60 * 60);

        let header = format!("theme=dark; {}", cookie_header(&issuer.set_cookie(&session)));
        let found = auth.authenticate(Some(&header)).unwrap();
        assert_eq!(found.principal, spring());
        assert_eq!(
            found.expires_at.timestamp_millis(),
            session.expires_at.timestamp_millis()
        );
    }

    #[test]
    fn test_one_second_lifetime_expires() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let now = Utc::now();
        let session = issuer
            .issue_at(spring(), Duration::from_secs(1), now)
            .unwrap();

        let ok = auth.verify_at(&session.token, now).unwrap();
        assert_eq!(ok.principal.event_code, "SPRING25");

        let later = now + chrono::Duration::seconds(2);
        assert_eq!(
            auth.verify_at(&session.token, later).unwrap_err(),
            Rejection::Expired
        );
        let header = format!("kiosk_session={}", session.token);
        assert!(auth.authenticate_at(Some(&header), later).is_none());
    }

    #[test]
    fn test_sub_second_lifetime_keeps_cookie() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let now = Utc::now();
        let session = issuer
            .issue_at(spring(), Duration::from_millis(500), now)
            .unwrap();
        assert_eq!(session.max_age, 1);

        let set_cookie = issuer.set_cookie(&session);
        assert!(set_cookie.contains("Max-Age=1;"), "cookie: {}", set_cookie);
        assert!(auth.verify_at(&session.token, now).is_ok());
        assert_eq!(
            auth.verify_at(&session.token, now + chrono::Duration::milliseconds(500))
                .unwrap_err(),
            Rejection::Expired
        );
    }

    #[test]
    fn test_every_failure_is_unauthenticated() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let session = issuer.issue(spring()).unwrap();
        let (_, other_auth) = kiosk_pair("different-secret");

        assert!(auth.authenticate(None).is_none());
        assert!(auth.authenticate(Some("")).is_none());
        assert!(auth.authenticate(Some("member_session=x")).is_none());
        assert!(auth.authenticate(Some("kiosk_session=no-separator")).is_none());
        assert!(auth.authenticate(Some("kiosk_session=a.b")).is_none());
        let header = format!("kiosk_session={}", session.token);
        assert!(other_auth.authenticate(Some(&header)).is_none());
    }

    #[test]
    fn test_kiosk_token_is_not_a_member_token() {
        let shared = secret("shared-secret");
        let kiosk = SessionIssuer::<KioskPrincipal>::new(
            shared.clone(),
            SessionSettings::defaults_for::<KioskPrincipal>(false),
        );
        let members = SessionAuthenticator::<MemberPrincipal>::new(shared, "kiosk_session");
        let session = kiosk.issue(spring()).unwrap();
        let header = format!("kiosk_session={}", session.token);
        // Correctly signed, wrong schema.
        assert!(matches!(
            members.verify_at(&session.token, Utc::now()),
            Err(Rejection::InvalidPayload(_))
        ));
        assert!(members.authenticate(Some(&header)).is_none());
    }

    #[test]
    fn test_member_session() {
        let shared = secret("member-secret");
        let settings = SessionSettings::defaults_for::<MemberPrincipal>(true);
        let issuer = SessionIssuer::<MemberPrincipal>::new(shared.clone(), settings);
        let auth = SessionAuthenticator::<MemberPrincipal>::new(shared, "member_session");

        let member = MemberPrincipal {
            member_id: "M-0042".to_string(),
            display_name: "Ada L.".to_string(),
            email: "ada@example.org".to_string(),
        };
        let session = issuer.issue(member.clone()).unwrap();
        assert_eq!(session.max_age, 7 * 24 * 60 * 60);

        let set_cookie = issuer.set_cookie(&session);
        assert!(set_cookie.starts_with("member_session="));
        assert!(set_cookie.contains("; Secure"));

        let found = auth.authenticate(Some(&cookie_header(&set_cookie))).unwrap();
        assert_eq!(found.principal, member);
    }

    #[test]
    fn test_logout_cookie_clears() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let cookie = issuer.logout_cookie();
        assert!(cookie.starts_with("kiosk_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(auth.authenticate(Some(&cookie_header(&cookie))).is_none());
    }

    #[test]
    fn test_empty_secret_issues_nothing() {
        assert!(Secret::new("").is_err());
        assert!(resolve_secret("kiosk", &[]).is_err());
    }

    #[test]
    fn test_concurrent_verification() {
        let (issuer, auth) = kiosk_pair("kiosk-secret");
        let auth = Arc::new(auth);
        let header = format!("kiosk_session={}", issuer.issue(spring()).unwrap().token);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let auth = auth.clone();
                let header = header.clone();
                std::thread::spawn(move || {
                    (0..100).all(|_| auth.authenticate(Some(&header)).is_some())
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
