//! Types stored in the server session.
//!
//! The session replaces the browser storage a single-page client would use:
//! identity and token, the last successfully fetched cart, a pending checkout,
//! and one-shot notices.

pub mod cart;
pub mod notice;
pub mod session;

pub use cart::{CartLine, CartSnapshot};
pub use notice::{Notice, NoticeLevel};
pub use session::{CurrentUser, keys as session_keys};
