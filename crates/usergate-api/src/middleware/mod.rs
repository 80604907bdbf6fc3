//! API Middleware
//!
//! The access guard that authenticates bearer tokens, applies the route
//! policy and admits the very first account creation.

pub mod auth;

pub use auth::{enforce_access, AccessGuard, CurrentUser, GuardState, RequestContext};
