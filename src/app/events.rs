//! Outbound events for the remote collector.
//!
//! Monitors and the boot sequence emit these through the
//! [`AlertPort`](super::ports::AlertPort).  The category selects the
//! collector endpoint; the subtype is what the collector files it under.

use core::fmt;

/// Collector endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// A hazard was confirmed.
    Alert,
    /// A sensor looks broken (power draw too low, init failed).
    Malfunction,
    /// Informational (boot, warm-up complete).
    Log,
}

impl EventCategory {
    /// Path/key fragment: `send_<tag>` and `<tag>_type`.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Malfunction => "malfunction",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single event bound for the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub category: EventCategory,
    pub subtype: String,
    pub message: Option<String>,
}

impl AlertEvent {
    pub fn alert(subtype: &str) -> Self {
        Self {
            category: EventCategory::Alert,
            subtype: subtype.into(),
            message: None,
        }
    }

    pub fn malfunction(subtype: &str, message: &str) -> Self {
        Self {
            category: EventCategory::Malfunction,
            subtype: subtype.into(),
            message: Some(message.into()),
        }
    }

    pub fn log(subtype: &str, message: &str) -> Self {
        Self {
            category: EventCategory::Log,
            subtype: subtype.into(),
            message: Some(message.into()),
        }
    }
}
