//! Client for the socialhub API.
//!
//! The pieces a front end needs, independent of any particular UI toolkit:
//!
//! - [`session`]: the signed-in user, bearer token and view state, with an
//!   explicit load/save boundary instead of ambient globals
//! - [`api`]: one async method per endpoint, each returning `Result<T, ClientError>`
//! - [`render`]: HTML fragments for posts, comments and user cards
//! - [`search`]: input debouncing for user search
//! - [`confirm`]: double confirmation for destructive actions
//! - [`notify`]: transient notifications for failed calls

pub mod api;
pub mod confirm;
pub mod feed;
pub mod notify;
pub mod render;
pub mod search;
pub mod session;

pub use api::{ApiClient, ClientError, ImageFile};
pub use session::{Session, SessionStore};
