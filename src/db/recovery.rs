//! Tail-damage state decided at open

use serde::Serialize;

use crate::storage::Layout;

/// Outcome of scanning the file tail at open time.
///
/// Damage is advisory: the handle rolls back to the newest valid checkpoint
/// and stays usable. It never changes for the lifetime of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Recovery {
    /// The newest checkpoint ends exactly at end of file
    Clean,
    /// Bytes after the newest valid checkpoint were ignored
    Damaged {
        /// How many bytes were ignored
        discarded_bytes: u64,
    },
}

impl Recovery {
    pub(crate) fn from_layout(layout: &Layout) -> Self {
        match &layout.damage {
            Some(damage) => Recovery::Damaged {
                discarded_bytes: damage.discarded_bytes(),
            },
            None => Recovery::Clean,
        }
    }

    /// Whether the tail was damaged
    pub fn is_damaged(&self) -> bool {
        matches!(self, Recovery::Damaged { .. })
    }

    /// Bytes ignored at open (0 when clean)
    pub fn discarded_bytes(&self) -> u64 {
        match self {
            Recovery::Clean => 0,
            Recovery::Damaged { discarded_bytes } => *discarded_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileHeader, TailDamage};

    #[test]
    fn test_from_layout() {
        let mut layout = Layout {
            header: FileHeader::new(512),
            current: None,
            file_len: 512,
            damage: None,
        };
        assert_eq!(Recovery::from_layout(&layout), Recovery::Clean);

        layout.file_len = 600;
        layout.damage = Some(TailDamage {
            valid_end: 512,
            file_len: 600,
            reason: "garbage".into(),
        });
        let recovery = Recovery::from_layout(&layout);
        assert!(recovery.is_damaged());
        assert_eq!(recovery.discarded_bytes(), 88);
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let json = serde_json::to_value(Recovery::Damaged { discarded_bytes: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "damaged", "discarded_bytes": 3}));
        let json = serde_json::to_value(Recovery::Clean).unwrap();
        assert_eq!(json, serde_json::json!({"state": "clean"}));
    }
}
