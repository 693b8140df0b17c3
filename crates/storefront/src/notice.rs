//! Shopper-facing notices ("toasts").
//!
//! Collections report confirmations, rejections, and failures through a
//! [`Notifier`] instead of returning errors, so front ends decide how to
//! display them.

use std::sync::Mutex;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Info,
    /// A request was refused before any I/O (duplicate item, invalid quantity).
    Warning,
    /// A request failed.
    Error,
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Receiver of shopper-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Collects notices until a front end drains them.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl BufferedNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every notice collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.lock())
    }

    /// Copy of the notices collected so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Notifier for BufferedNotifier {
    fn notify(&self, notice: Notice) {
        self.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_notifier_drains_in_order() {
        let notifier = BufferedNotifier::new();
        notifier.notify(Notice::success("Added Rose to your cart"));
        notifier.notify(Notice::warning("Rose is already in your cart"));

        assert_eq!(notifier.notices().len(), 2);

        let drained = notifier.drain();
        assert_eq!(drained[0].level, NoticeLevel::Success);
        assert_eq!(drained[1].message, "Rose is already in your cart");
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(NoticeLevel::Warning.to_string(), "warning");
        assert_eq!(NoticeLevel::Error.to_string(), "error");
    }
}
