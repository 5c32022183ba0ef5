//! State-change notifications (§10.2), the `tracing`-backed analogue of the
//! original's `emit_state_change` print statement.

use duo_core::ChainId;

/// Something an adapter may want to observe as chains change. The default
/// implementation logs; a test harness can swap in one that records calls.
pub trait EventSink: Send + Sync {
    fn state_change(&self, origin: &ChainId, action: &str, details: Option<&str>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn state_change(&self, origin: &ChainId, action: &str, details: Option<&str>) {
        tracing::info!(chain = %origin, action, details, "state change");
    }
}
