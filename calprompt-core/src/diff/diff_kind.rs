use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Add,
    Update,
    Delete,
}

impl DiffKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            DiffKind::Add => "+",
            DiffKind::Update => "~",
            DiffKind::Delete => "-",
        }
    }

    /// The `action` value used on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            DiffKind::Add => "add",
            DiffKind::Update => "update",
            DiffKind::Delete => "delete",
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "add" => Some(DiffKind::Add),
            "update" => Some(DiffKind::Update),
            "delete" => Some(DiffKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
