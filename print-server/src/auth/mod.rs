//! Admin authentication
//!
//! Team endpoints are open; management operations need the shared admin
//! token checked by [`AdminGuard`].

mod admin;

pub use admin::AdminGuard;
