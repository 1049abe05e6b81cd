use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// The minimum number of characters in the hash part of a [`WareId`]. Shelf
/// locations are sharded on the first six characters.
pub const MIN_HASH_LEN: usize = 6;

/// Identifies a ware by its type tag and content hash, e.g. `tar:6q7G4hWr...`.
///
/// A `WareId` is opaque to everything but the pack tool that produced it. Two
/// packs of byte-identical trees under identical filters yield equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WareId {
    ware_type: String,
    hash: String,
}

/// An error that is returned when a string cannot be parsed as a [`WareId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseWareIdError {
    /// The string did not contain a `:` separating type and hash.
    #[error("ware id '{0}' is missing the ':' between type and hash")]
    MissingSeparator(String),

    /// The type tag is empty or contains characters that are not allowed.
    #[error("invalid ware type '{0}'")]
    InvalidType(String),

    /// The hash is too short or contains characters that are not allowed.
    #[error("invalid ware hash '{0}'")]
    InvalidHash(String),
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl WareId {
    /// Constructs a new id from its parts, validating both.
    pub fn new(
        ware_type: impl Into<String>,
        hash: impl Into<String>,
    ) -> Result<Self, ParseWareIdError> {
        let ware_type = ware_type.into();
        let hash = hash.into();
        if ware_type.is_empty() || !ware_type.chars().all(is_id_char) {
            return Err(ParseWareIdError::InvalidType(ware_type));
        }
        if hash.len() < MIN_HASH_LEN || !hash.chars().all(is_id_char) {
            return Err(ParseWareIdError::InvalidHash(hash));
        }
        Ok(Self { ware_type, hash })
    }

    /// The type tag, e.g. `tar`.
    pub fn ware_type(&self) -> &str {
        &self.ware_type
    }

    /// The content hash.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl Display for WareId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ware_type, self.hash)
    }
}

impl FromStr for WareId {
    type Err = ParseWareIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ware_type, hash) = s
            .split_once(':')
            .ok_or_else(|| ParseWareIdError::MissingSeparator(s.to_string()))?;
        Self::new(ware_type, hash)
    }
}

impl TryFrom<String> for WareId {
    type Error = ParseWareIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WareId> for String {
    fn from(value: WareId) -> Self {
        value.to_string()
    }
}
