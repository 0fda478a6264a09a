//! Pool settings, loadable from a game mode's config file.
//!
//! ```rust,ignore
//! let config: PoolConfig = serde_json::from_str(r#"{
//!     "name": "player-textdraws",
//!     "capacity": 256,
//!     "duplicate_policy": "reject"
//! }"#)?;
//! let pool = IdentifiedOwnedPool::<PlayerTextDraw>::with_config(config);
//! ```

use serde_derive::{Deserialize, Serialize};

/// What `add` does when an entry with the same `(owner, id)` is already live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Caller keeps pairs unique; `add` always inserts.
    Allow,
    /// `add` fails with [`Error::Duplicate`](crate::Error::Duplicate).
    Reject,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Allow
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name used in logs and errors instead of the element type name.
    pub name: Option<String>,

    /// Slots reserved up front.
    pub capacity: usize,

    pub duplicate_policy: DuplicatePolicy,
}

impl PoolConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}
