//! Authentication module
//!
//! The tap never acquires tokens itself: it receives a materialized API
//! token from configuration and attaches it, together with the contact
//! headers the API requires, to every outbound request.

mod authenticator;

pub use authenticator::{Authenticator, AUTH_HEADER, EMAIL_HEADER};
