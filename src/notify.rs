//! Toast notification system
//!
//! One-shot, fire-and-forget user notifications. List controllers report
//! fetch failures through a `Notifier`; views decide how toasts are shown.

use std::collections::VecDeque;
use std::time::Instant;

use owo_colors::OwoColorize;
use parking_lot::Mutex;

/// Oldest toasts are dropped once a queue holds this many.
const MAX_QUEUED_TOASTS: usize = 32;

/// A toast notification message
#[derive(Debug, Clone)]
pub struct Toast {
    /// The message to display
    pub message: String,
    /// The severity level of the toast
    pub level: ToastLevel,
    /// When the toast was created
    pub timestamp: Instant,
}

/// Severity level for toast notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl Toast {
    pub fn new(message: String, level: ToastLevel) -> Self {
        Self {
            message,
            level,
            timestamp: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Error)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Success)
    }
}

/// Surface that shows toasts to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);

    fn info(&self, message: &str) {
        self.notify(Toast::info(message));
    }

    fn warning(&self, message: &str) {
        self.notify(Toast::warning(message));
    }

    fn success(&self, message: &str) {
        self.notify(Toast::success(message));
    }

    fn error(&self, message: &str) {
        self.notify(Toast::error(message));
    }
}

/// In-memory toast queue, drained by whatever renders the view.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Mutex<VecDeque<Toast>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return all pending toasts, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        self.toasts.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.toasts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.lock().is_empty()
    }

    /// Messages of pending toasts at `level`, without draining.
    pub fn messages(&self, level: ToastLevel) -> Vec<String> {
        self.toasts
            .lock()
            .iter()
            .filter(|t| t.level == level)
            .map(|t| t.message.clone())
            .collect()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, toast: Toast) {
        let mut toasts = self.toasts.lock();
        if toasts.len() == MAX_QUEUED_TOASTS {
            toasts.pop_front();
        }
        toasts.push_back(toast);
    }
}

/// Prints toasts to stderr, colored by level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        let line = match toast.level {
            ToastLevel::Info => toast.message.cyan().to_string(),
            ToastLevel::Warning => toast.message.yellow().to_string(),
            ToastLevel::Error => toast.message.red().to_string(),
            ToastLevel::Success => toast.message.green().to_string(),
        };
        eprintln!("{line}");
    }
}
