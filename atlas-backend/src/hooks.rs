//! Feed notification hook.
//!
//! Feed and notification bookkeeping lives outside this service. Successful
//! typed-value writes are announced through [`FeedHook`]; the hook's outcome
//! never influences the write that triggered it.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    TypedValueAttached {
        value_id: Uuid,
        record_id: Uuid,
        object_type_id: Uuid,
        creator_id: Uuid,
    },
    TypedValueUpdated {
        value_id: Uuid,
        record_id: Uuid,
        object_type_id: Uuid,
        creator_id: Uuid,
    },
}

pub trait FeedHook: Send + Sync {
    /// Fire-and-forget. Implementations must not block or panic.
    fn notify(&self, event: &FeedEvent);
}

/// Default hook: writes the event to the log.
pub struct LogFeedHook;

impl FeedHook for LogFeedHook {
    fn notify(&self, event: &FeedEvent) {
        log::debug!("[FEED] {:?}", event);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every event so tests can assert on what was announced.
    #[derive(Default)]
    pub struct RecordingFeedHook {
        pub events: Mutex<Vec<FeedEvent>>,
    }

    impl RecordingFeedHook {
        pub fn events(&self) -> Vec<FeedEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    impl FeedHook for RecordingFeedHook {
        fn notify(&self, event: &FeedEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.clone());
            }
        }
    }
}
