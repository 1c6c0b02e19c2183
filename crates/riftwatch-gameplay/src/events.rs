//! Storm events and listener registration.
//!
//! Listeners are registered explicitly on the controller and invoked
//! synchronously, in registration order, from inside the tick that caused
//! the event.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::severity::SeverityTier;
use crate::storm_state::RuntimeState;

/// Kind of user-visible storm notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeKind {
    /// Storm due within a few hours.
    Approaching,
    /// Storm about to start.
    Imminent,
    /// Active storm about to end.
    Waning,
}

/// A user-visible storm notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StormNotice {
    /// What stage this notice announces
    pub kind: NoticeKind,
    /// Severity of the storm it refers to
    pub tier: SeverityTier,
    /// Broadcast text
    pub text: String,
}

impl StormNotice {
    /// Creates the notice for a stage and tier.
    #[must_use]
    pub fn new(kind: NoticeKind, tier: SeverityTier) -> Self {
        let profile = tier.profile();
        let text = match kind {
            NoticeKind::Approaching => profile.approaching_text,
            NoticeKind::Imminent => profile.imminent_text,
            NoticeKind::Waning => profile.waning_text,
        };
        Self {
            kind,
            tier,
            text: text.to_string(),
        }
    }
}

/// Events emitted by the storm controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StormEvent {
    /// A notification should be broadcast to all players.
    Notice(StormNotice),
    /// A storm entered its active window.
    Started {
        /// Storm severity
        tier: SeverityTier,
        /// Day the active window ends
        until_day: f64,
    },
    /// A storm ended and the next one was scheduled.
    Ended {
        /// Day of the next storm
        next_start_day: f64,
    },
    /// Time jumped past an entire storm, which was skipped.
    Skipped {
        /// Day of the next storm
        next_start_day: f64,
    },
    /// The authoritative state changed and was replicated.
    StateChanged(RuntimeState),
}

impl StormEvent {
    /// Returns the notice carried by this event, if any.
    #[must_use]
    pub fn as_notice(&self) -> Option<&StormNotice> {
        match self {
            Self::Notice(notice) => Some(notice),
            _ => None,
        }
    }
}

/// Receives storm events.
pub trait StormListener: Send {
    /// Handles an event.
    fn on_event(&mut self, event: &StormEvent);
}

impl<F> StormListener for F
where
    F: FnMut(&StormEvent) + Send,
{
    fn on_event(&mut self, event: &StormEvent) {
        self(event);
    }
}

/// Listener that buffers every event it receives.
///
/// Cloning yields another handle to the same buffer, so one clone can be
/// registered while the other is drained.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    /// Shared event buffer
    events: Arc<Mutex<Vec<StormEvent>>>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all buffered events.
    pub fn drain(&self) -> Vec<StormEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl StormListener for EventRecorder {
    fn on_event(&mut self, event: &StormEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text_per_tier() {
        let notice = StormNotice::new(NoticeKind::Approaching, SeverityTier::Heavy);
        assert_eq!(notice.text, "A heavy temporal storm is approaching");
        let waning = StormNotice::new(NoticeKind::Waning, SeverityTier::Light);
        assert_eq!(waning.text, "The temporal storm seems to be waning");
    }

    #[test]
    fn test_recorder_shares_buffer() {
        let recorder = EventRecorder::new();
        let mut handle = recorder.clone();
        handle.on_event(&StormEvent::Ended { next_start_day: 3.0 });
        handle.on_event(&StormEvent::Notice(StormNotice::new(
            NoticeKind::Imminent,
            SeverityTier::Medium,
        )));
        assert_eq!(recorder.pending_count(), 2);
        assert_eq!(recorder.drain().len(), 2);
        assert_eq!(recorder.pending_count(), 0);
    }

    #[test]
    fn test_closure_listener() {
        let mut count = 0;
        {
            let mut listener = |_: &StormEvent| count += 1;
            listener.on_event(&StormEvent::Skipped { next_start_day: 1.0 });
            listener.on_event(&StormEvent::Skipped { next_start_day: 2.0 });
        }
        assert_eq!(count, 2);
    }
}
