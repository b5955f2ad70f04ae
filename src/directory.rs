//! Credential checks performed before a session is issued.
//!
//! The session core never looks at credentials itself; login handlers ask a
//! [`Directory`] and only call the issuer when it returns a principal.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

use crate::config::{KioskEvent, MemberAccount};
use crate::session::{KioskPrincipal, MemberPrincipal};

/// Source of truth for who may sign in.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Check a kiosk PIN for an event.
    async fn check_kiosk(&self, event_code: &str, pin: &str) -> Option<KioskPrincipal>;

    /// Check a member's password and return their profile hints.
    async fn check_member(&self, member_id: &str, password: &str) -> Option<MemberPrincipal>;
}

/// Directory backed by bcrypt hashes from the config file.
#[derive(Default)]
pub struct StaticDirectory {
    events: HashMap<String, String>,
    members: HashMap<String, MemberAccount>,
}

impl StaticDirectory {
    pub fn new(events: &[KioskEvent], accounts: &[MemberAccount]) -> Self {
        Self {
            events: events
                .iter()
                .map(|e| (e.event_code.clone(), e.pin_hash.clone()))
                .collect(),
            members: accounts
                .iter()
                .map(|a| (a.member_id.clone(), a.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.members.is_empty()
    }
}

/// bcrypt is CPU-heavy; run it on the blocking pool.
async fn verify_hash(secret: &str, hash: &str) -> bool {
    let secret = secret.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash)).await {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            warn!("stored credential hash is unusable: {}", e);
            false
        }
        Err(e) => {
            warn!("credential check task failed: {}", e);
            false
        }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn check_kiosk(&self, event_code: &str, pin: &str) -> Option<KioskPrincipal> {
        let hash = self.events.get(event_code)?;
        verify_hash(pin, hash).await.then(|| KioskPrincipal {
            event_code: event_code.to_string(),
        })
    }

    async fn check_member(&self, member_id: &str, password: &str) -> Option<MemberPrincipal> {
        let account = self.members.get(member_id)?;
        verify_hash(password, &account.password_hash)
            .await
            .then(|| MemberPrincipal {
                member_id: account.member_id.clone(),
                display_name: account.display_name.clone(),
                email: account.email.clone(),
            })
    }
}
