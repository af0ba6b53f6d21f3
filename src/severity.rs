//! Severity tiers of warning areas.

use std::fmt;

use serde::{Serialize, Serializer};

/// Severity tier, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    None,
    Message,
    Yellow,
    Orange,
    Red,
}

impl Severity {
    /// Parses an upstream severity code. Unrecognized codes rank as `None`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "MESSAGE" => Self::Message,
            "YELLOW" => Self::Yellow,
            "ORANGE" => Self::Orange,
            "RED" => Self::Red,
            _ => Self::None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Message => "MESSAGE",
            Self::Yellow => "YELLOW",
            Self::Orange => "ORANGE",
            Self::Red => "RED",
        }
    }

    /// Yellow, orange and red count as warnings.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Yellow | Self::Orange | Self::Red)
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message)
    }

    /// Display color hint.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Red => "#FF0000",
            Self::Orange => "#FF7F00",
            Self::Yellow => "#FFFF00",
            Self::Message | Self::None => "#FFFFFF",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}
