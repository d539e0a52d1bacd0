//! User-facing notifications ("alerts").

use std::sync::{Mutex, PoisonError};

/// Surfaces a message to the user and returns once it has been shown.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Notifier that keeps every message, for testing.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
