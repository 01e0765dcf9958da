//! Notifications emitted by the engine.

use crate::entity::{TabId, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyEvent {
    /// A tab's privacy flag changed (or is being highlighted after a drop)
    PrivacyChanged { tab: TabId, is_private: bool },
    /// First private tab seen in a window, once per window lifetime
    FirstPrivateTab { window: WindowId, tab: TabId },
    /// First private tab seen by this engine at all
    FirstPrivateTabEver { tab: TabId },
}

/// Queue of emitted events, drained by whoever owns the engine
#[derive(Debug, Default)]
pub struct EventOutbox {
    queue: Vec<PrivacyEvent>,
}

impl EventOutbox {
    pub fn push(&mut self, event: PrivacyEvent) {
        log::debug!("Emit {:?}", event);
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> Vec<PrivacyEvent> {
        std::mem::take(&mut self.queue)
    }
}
