//! One-shot notices ("toasts").
//!
//! A handler stores a notice in the session before redirecting; the next page
//! render takes it out and shows it once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    /// CSS modifier class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.level.as_str()
    }

    /// Queue this notice for the next rendered page.
    ///
    /// A session write failure only loses the notice, so it is logged and
    /// otherwise ignored.
    pub async fn flash(self, session: &Session) {
        if let Err(e) = session.insert(keys::NOTICE, self).await {
            tracing::warn!(error = %e, "Failed to store notice in session");
        }
    }

    /// Take the queued notice, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        match session.remove::<Self>(keys::NOTICE).await {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read notice from session");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        Notice::success("Added to cart").flash(&session).await;

        assert_eq!(
            Notice::take(&session).await,
            Some(Notice::success("Added to cart"))
        );
        assert_eq!(Notice::take(&session).await, None);
    }

    #[test]
    fn test_css_class() {
        assert_eq!(Notice::error("x").css_class(), "error");
        assert_eq!(Notice::info("x").css_class(), "info");
    }
}
