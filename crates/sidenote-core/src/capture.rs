//! Capture popup and inline notice timing.
//!
//! Both are deadline based: callers pass the current `Instant` so the state
//! machines stay deterministic and never own a timer thread.

use crate::{AnnotationKind, NewAnnotation, MIN_CAPTURE_WORDS, NOTICE_DURATION, POPUP_TIMEOUT};
use std::time::Instant;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOffer {
    Opened,
    TooShort,
    /// A popup is already open; it is modal with respect to itself.
    Suppressed,
}

#[derive(Debug, Clone)]
struct PendingCapture {
    text: String,
    closes_at: Instant,
}

#[derive(Debug, Default)]
pub struct CaptureGate {
    pending: Option<PendingCapture>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, selection: &str, now: Instant) -> CaptureOffer {
        if self.pending.is_some() {
            return CaptureOffer::Suppressed;
        }
        let text = selection.trim();
        if word_count(text) < MIN_CAPTURE_WORDS {
            return CaptureOffer::TooShort;
        }
        self.pending = Some(PendingCapture {
            text: text.to_string(),
            closes_at: now + POPUP_TIMEOUT,
        });
        CaptureOffer::Opened
    }

    pub fn pending_text(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.text.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Close the popup and hand back a root record draft flagged as captured.
    pub fn commit(&mut self, kind: AnnotationKind) -> Option<NewAnnotation> {
        self.pending
            .take()
            .map(|pending| NewAnnotation::root(pending.text, kind).captured())
    }

    /// Explicit close; clears the auto-close deadline with it.
    pub fn dismiss(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Auto-close once the popup deadline has passed. Returns `true` if this
    /// call closed it.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.closes_at);
        if expired {
            self.pending = None;
        }
        expired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    expires_at: Instant,
}

/// Single-slot transient message area. Posting replaces whatever is shown.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
        self.current = Some(Notice {
            kind,
            message: message.into(),
            expires_at: now + NOTICE_DURATION,
        });
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.post(NoticeKind::Error, message, now);
    }

    pub fn visible(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|notice| now < notice.expires_at)
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|notice| now >= notice.expires_at);
        if expired {
            self.current = None;
        }
        expired
    }
}
