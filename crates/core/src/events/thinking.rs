//! Aggregation of streamed thinking deltas into one span
//!
//! Agents stream their reasoning as many small `delta` events followed by a
//! `completed` marker. Only the consolidated span is worth recording, so the
//! multiplexer feeds every thinking event through a [`ThinkingSpan`] and acts on
//! the returned [`ThinkingAction`].

use std::time::{Duration, Instant};

use super::{ThinkingEvent, ThinkingSubtype};

/// What the caller should do after feeding a thinking event
#[derive(Debug, Clone, PartialEq)]
pub enum ThinkingAction {
    /// Delta text was appended to the open span
    Buffer,
    /// The span closed; record it once
    Flush { text: String, duration: Duration },
    /// Nothing to do (completed marker without buffered text)
    Ignore,
}

/// Open thinking span: buffered text plus the instant of its first delta
#[derive(Debug, Default)]
pub struct ThinkingSpan {
    buffer: String,
    started: Option<Instant>,
}

impl ThinkingSpan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a delta has been seen since the last flush
    pub fn is_open(&self) -> bool {
        self.started.is_some()
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Advance the span with one event observed at `now`
    pub fn advance(&mut self, event: &ThinkingEvent, now: Instant) -> ThinkingAction {
        match event.subtype {
            ThinkingSubtype::Delta => {
                self.started.get_or_insert(now);
                self.buffer.push_str(&event.text);
                ThinkingAction::Buffer
            }
            ThinkingSubtype::Completed => {
                let started = self.started.take();
                let text = std::mem::take(&mut self.buffer);
                match started {
                    Some(started) if !text.is_empty() => ThinkingAction::Flush {
                        text,
                        duration: now.saturating_duration_since(started),
                    },
                    _ => ThinkingAction::Ignore,
                }
            }
        }
    }
}
