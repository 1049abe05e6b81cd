use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Describes how unpacked content is made to appear at a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementMode {
    /// Unpack straight into the destination. When going through a cache the
    /// shelf itself is the result and no placement happens.
    Direct,

    /// An independent, writable copy of the content is created at the
    /// destination.
    Copy,

    /// The content is mounted read-only at the destination.
    Mount,
}

impl Display for PlacementMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementMode::Direct => write!(f, "direct"),
            PlacementMode::Copy => write!(f, "copy"),
            PlacementMode::Mount => write!(f, "mount"),
        }
    }
}

/// Returned when parsing an unknown placement mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown placement mode '{0}', expected one of 'direct', 'copy' or 'mount'")]
pub struct ParsePlacementModeError(String);

impl FromStr for PlacementMode {
    type Err = ParsePlacementModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(PlacementMode::Direct),
            "copy" => Ok(PlacementMode::Copy),
            "mount" => Ok(PlacementMode::Mount),
            _ => Err(ParsePlacementModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(PlacementMode::Direct)]
    #[case(PlacementMode::Copy)]
    #[case(PlacementMode::Mount)]
    fn display_parses_back(#[case] mode: PlacementMode) {
        assert_eq!(mode.to_string().parse::<PlacementMode>().unwrap(), mode);
    }

    #[test]
    fn unknown_mode() {
        assert!("overlay".parse::<PlacementMode>().is_err());
    }
}
