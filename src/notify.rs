//! Overlay notification contract.
//!
//! The WebSocket overlay broadcaster lives outside this crate; the publisher
//! only knows this fire-and-forget trait. Notification failures are the
//! notifier's problem; the publish operation never observes them.

use std::collections::HashMap;

/// A display event sent to the overlay layer after a publish.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEvent {
    pub destination_ids: Vec<String>,
    pub template: String,
    pub substitutions: HashMap<String, String>,
    pub duration_ms: u64,
}

pub trait OverlayNotifier: Send + Sync {
    fn display(&self, event: DisplayEvent);
}

/// Notifier that drops every event. The default when no overlay is wired.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl OverlayNotifier for NullNotifier {
    fn display(&self, _event: DisplayEvent) {}
}
