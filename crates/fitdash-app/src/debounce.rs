// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds the text being typed apart from the text that drives fetching.
/// Callers pass the clock in, so the timer is just a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebouncedSearch {
    delay: Duration,
    draft: String,
    committed: String,
    deadline: Option<Instant>,
}

impl DebouncedSearch {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            draft: String::new(),
            committed: String::new(),
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn on_keystroke(&mut self, text: &str, at: Instant) {
        self.draft = text.to_owned();
        self.deadline = Some(at + self.delay);
    }

    /// Fires the timer when its deadline has passed. Returns the new
    /// committed text only when it actually changed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;

        let text = self.draft.trim();
        if text == self.committed {
            return None;
        }
        self.committed = text.to_owned();
        Some(self.committed.clone())
    }

    /// Replaces both draft and committed text and drops any pending timer.
    pub fn reset(&mut self, text: &str) {
        self.draft = text.to_owned();
        self.committed = text.trim().to_owned();
        self.deadline = None;
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
