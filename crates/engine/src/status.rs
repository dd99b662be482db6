use std::sync::{Mutex, MutexGuard};

/// A single status line shared between whoever runs comparisons and whoever
/// displays them. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct StatusHolder {
    text: Mutex<String>,
}

impl StatusHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.lock().clone()
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.lock() = text.into();
    }

    /// Store `text` and return what was there before.
    pub fn replace(&self, text: impl Into<String>) -> String {
        std::mem::replace(&mut *self.lock(), text.into())
    }

    // A panic while holding the lock cannot leave a String half-written.
    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
