//! Club Session - stateless signed session cookies
//!
//! This library provides signed, expiring session tokens for event-kiosk
//! operators and club members, plus the HTTP endpoints that issue and check them.

pub mod api;
pub mod config;
pub mod cookie;
pub mod directory;
pub mod secret;
pub mod session;
pub mod token;
