//! opsdesk — session handling for the operations dashboard.
//!
//! Two layers cooperate:
//! - [`guard`]: a pre-render middleware that only checks the credential
//!   marker cookie and redirects to or away from the sign-in page.
//! - [`session`]: the authoritative session store, written through to
//!   persisted storage on every mutation.
//!
//! [`flows`] keeps the two in step on login and logout, and [`api`] clears
//! the store whenever the backend rejects the held credentials.

pub mod api;
pub mod config;
pub mod flows;
pub mod guard;
pub mod routes;
pub mod session;
pub mod state;
