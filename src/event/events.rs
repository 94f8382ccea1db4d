use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Signals that can be emitted on the event bus
///
/// Events carry no payload. They tell listeners that something they display
/// may be stale, and listeners go back to the gateway for fresh data.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AppEvent {
    /// The set of classrooms the current user belongs to has changed
    ClassesChanged,
}

impl AppEvent {
    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        self.into()
    }
}
