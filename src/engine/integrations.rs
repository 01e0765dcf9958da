//! Best-effort collaborators notified of privacy events.
//!
//! Taskbar previews, thumbnail caches, download panels and the like react to
//! privacy changes but are not required for correctness. Their failures are
//! reported to a [`DiagnosticSink`] and never reach event dispatch.

use super::events::PrivacyEvent;

/// A best-effort consumer of privacy events
pub trait Integration {
    fn name(&self) -> &str;

    fn on_event(&self, event: &PrivacyEvent) -> anyhow::Result<()>;
}

/// Receives integration failures
pub trait DiagnosticSink {
    fn report(&self, source: &str, error: &anyhow::Error);
}

/// Default sink: log and move on
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, source: &str, error: &anyhow::Error) {
        log::warn!("Integration {} failed: {:#}", source, error);
    }
}

pub(super) struct Integrations {
    members: Vec<Box<dyn Integration>>,
    sink: Box<dyn DiagnosticSink>,
}

impl Default for Integrations {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            sink: Box::new(LogSink),
        }
    }
}

impl Integrations {
    pub(super) fn add(&mut self, integration: Box<dyn Integration>) {
        log::debug!("Registered integration {}", integration.name());
        self.members.push(integration);
    }

    pub(super) fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub(super) fn dispatch(&self, event: &PrivacyEvent) {
        for integration in &self.members {
            if let Err(e) = integration.on_event(event) {
                self.sink.report(integration.name(), &e);
            }
        }
    }

    pub(super) fn clear(&mut self) {
        self.members.clear();
    }
}
