use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Strategy for dividing an expense among its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitType {
    /// Even split, computed by the service.
    #[default]
    Equal,
    /// Each participant's owed amount is entered explicitly.
    Exact,
    /// Each participant owes an entered share of 100.
    Percentage,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "EQUAL",
            SplitType::Exact => "EXACT",
            SplitType::Percentage => "PERCENTAGE",
        }
    }
}

impl core::fmt::Display for SplitType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(SplitType::Equal),
            "EXACT" => Ok(SplitType::Exact),
            "PERCENTAGE" => Ok(SplitType::Percentage),
            other => Err(format!("Invalid split type: {}", other)),
        }
    }
}
