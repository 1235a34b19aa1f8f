//! Transient status message ("toast") and the clipboard helper that uses it

use crate::{core::constants::TOAST_TIMEOUT_MS, MapError, Result};
use instant::{Duration, Instant};
use std::cell::RefCell;

/// Id of the element the toast is written into
pub const TOAST_ELEMENT_ID: &str = "toast";

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub shown_at: Instant,
    pub timeout: Duration,
}

impl Toast {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            shown_at: Instant::now(),
            timeout,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= self.timeout
    }
}

/// Single toast slot; a new message replaces the current one
#[derive(Debug, Default)]
pub struct ToastArea {
    current: Option<Toast>,
}

impl ToastArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, text: impl Into<String>, timeout_ms: u64) {
        let toast = Toast::new(text, Duration::from_millis(timeout_ms));
        log::debug!("toast: {}", toast.text);
        self.current = Some(toast);
    }

    /// Show with the default timeout
    pub fn notify(&mut self, text: impl Into<String>) {
        self.show(text, TOAST_TIMEOUT_MS);
    }

    /// Text of the toast while it is still on screen
    pub fn current(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.text.as_str())
    }

    pub fn is_visible(&self) -> bool {
        self.current().is_some()
    }

    /// Drop an expired toast; returns `true` when one was removed
    pub fn update(&mut self) -> bool {
        if self.current.as_ref().is_some_and(|t| t.is_expired()) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn to_html(&self) -> String {
        match self.current() {
            Some(text) => format!(
                "<div id=\"{}\" class=\"show\">{}</div>",
                TOAST_ELEMENT_ID, text
            ),
            None => format!("<div id=\"{}\" class=\"\"></div>", TOAST_ELEMENT_ID),
        }
    }
}

/// Write access to the system clipboard
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// In-memory clipboard for hosts without one and for tests
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: RefCell<Option<String>>,
    read_only: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that refuses every write
    pub fn read_only() -> Self {
        Self {
            content: RefCell::new(None),
            read_only: true,
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.content.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        if self.read_only {
            return Err(MapError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "clipboard is read-only",
            )));
        }
        *self.content.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

/// Copy `text` and confirm with a toast; write failures are only logged
pub fn copy_to_clipboard(
    clipboard: &dyn Clipboard,
    toasts: &mut ToastArea,
    text: &str,
    timeout_ms: u64,
) {
    if let Err(e) = clipboard.write_text(text) {
        log::warn!("clipboard write failed: {}", e);
    }
    toasts.show("Copied to clipboard", timeout_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_expires() {
        let mut area = ToastArea::new();
        area.show("Saved", 0);
        assert!(!area.is_visible());
        assert!(area.update());
        assert!(area.to_html().contains("class=\"\""));
    }

    #[test]
    fn test_newer_toast_replaces_older() {
        let mut area = ToastArea::new();
        area.notify("first");
        area.notify("second");
        assert_eq!(area.current(), Some("second"));
        assert!(area.to_html().contains("class=\"show\">second<"));
    }

    #[test]
    fn test_copy_to_clipboard() {
        let clipboard = MemoryClipboard::new();
        let mut area = ToastArea::new();
        copy_to_clipboard(&clipboard, &mut area, "49.8, 15.5", TOAST_TIMEOUT_MS);
        assert_eq!(clipboard.contents().as_deref(), Some("49.8, 15.5"));
        assert_eq!(area.current(), Some("Copied to clipboard"));
    }

    #[test]
    fn test_failed_copy_still_toasts() {
        let clipboard = MemoryClipboard::read_only();
        let mut area = ToastArea::new();
        copy_to_clipboard(&clipboard, &mut area, "x", TOAST_TIMEOUT_MS);
        assert!(clipboard.contents().is_none());
        assert_eq!(area.current(), Some("Copied to clipboard"));
    }
}
