//! Cookie transport for session tokens.
//!
//! Outbound: `Set-Cookie` directives with fixed flags (HttpOnly, SameSite=Lax,
//! Path=/) and a conditional `Secure`. Inbound: a small `Cookie:` header
//! parser that tolerates whitespace, valueless segments and `=` inside
//! values.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// SameSite policy. Session cookies are always issued `Lax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Lax => f.write_str("Lax"),
            SameSite::Strict => f.write_str("Strict"),
        }
    }
}

/// Transport attributes attached to an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: &'static str,
    /// Whole seconds; zero clears the cookie.
    pub max_age: u64,
}

impl CookieOptions {
    /// Session cookie attributes. `secure` follows the production flag.
    pub fn session(max_age: Duration, production: bool) -> Self {
        Self {
            http_only: true,
            secure: production,
            same_site: SameSite::Lax,
            path: "/",
            max_age: max_age.as_secs(),
        }
    }

    /// Attributes for a logout cookie: same flags, zero lifetime.
    pub fn expired(production: bool) -> Self {
        Self::session(Duration::ZERO, production)
    }
}

/// Render a `Set-Cookie` header value. The value is percent-encoded so any
/// token text survives the trip back through [`parse_cookie`].
pub fn build_set_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path={}",
        name,
        urlencoding::encode(value),
        options.max_age,
        options.path
    );
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; SameSite=");
    cookie.push_str(&options.same_site.to_string());
    cookie
}

/// Extract and percent-decode the first cookie called `name` from a raw
/// `Cookie:` header. Absent is `None`, not an error.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|segment| {
        let (key, value) = segment.trim().split_once('=')?;
        if key.trim() != name {
            return None;
        }
        Some(percent_decode(value.trim()))
    })
}

/// Percent-decode, keeping the raw text when the result is not UTF-8.
fn percent_decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => value.to_string(),
    }
}
