//! User activity and session events consumed by the sync schedulers

use serde::{Deserialize, Serialize};

/// Data mutation kinds that count as activity for the pull cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Add,
    Edit,
    Delete,
}

crate::impl_domain_status_conversions!(MutationKind {
    Add => "add",
    Edit => "edit",
    Delete => "delete",
});

/// Something the user did in the application shell.
///
/// Only [`ActivityEvent::DataMutation`] influences when the next pull
/// happens. Clicks, scrolling, key presses and navigation are passive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum ActivityEvent {
    Click,
    Scroll,
    Keypress,
    Navigation,
    DataMutation(MutationKind),
}

impl ActivityEvent {
    pub fn is_data_mutation(&self) -> bool {
        matches!(self, Self::DataMutation(_))
    }
}

/// Authentication transitions that activate or stop background sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    SignedIn { user_id: String },
    SignedOut,
}
