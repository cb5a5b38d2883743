use chrono::{DateTime, Utc};

/// A fact emitted by the engine for downstream collaborators.
///
/// Events are:
/// - **immutable** (never edited after emission)
/// - **versioned** (schema evolution)
/// - **append-only** (audit trail, payment history)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "lifecycle.document.status_changed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
