use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

const NAME_PREFIX: &str = "name:";
const NAME_HASH_LEN: usize = 16;

/// Stable identifier for a catalog row, shared by the fetcher and the curation store.
///
/// Rows carrying a numeric `AppID` use it directly. Rows without one fall back
/// to a digest of the trimmed display name, which survives refreshes only as
/// long as the name itself does not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    /// Source-provided numeric identifier.
    AppId(u64),
    /// Hex digest of the item name.
    NameHash(String),
}

impl ItemKey {
    /// Derive the key for a row from its coerced app id and display name.
    pub fn derive(app_id: Option<u64>, name: &str) -> Self {
        match app_id {
            Some(id) => Self::AppId(id),
            None => Self::from_name(name),
        }
    }

    /// Name-derived key, used when no numeric id is available.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.trim().as_bytes());
        let hex: String = digest
            .iter()
            .take(NAME_HASH_LEN / 2)
            .map(|byte| format!("{byte:02x}"))
            .collect();
        Self::NameHash(hex)
    }

    /// False when the key depends on a mutable display name.
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::AppId(_))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppId(id) => write!(f, "{id}"),
            Self::NameHash(hash) => write!(f, "{NAME_PREFIX}{hash}"),
        }
    }
}

impl Default for ItemKey {
    fn default() -> Self {
        Self::from_name("")
    }
}

impl From<u64> for ItemKey {
    fn from(id: u64) -> Self {
        Self::AppId(id)
    }
}

impl FromStr for ItemKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hash) = s.strip_prefix(NAME_PREFIX) {
            if hash.is_empty() || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
                return Err(format!("invalid name hash '{hash}'"));
            }
            return Ok(Self::NameHash(hash.to_ascii_lowercase()));
        }
        s.parse::<u64>()
            .map(Self::AppId)
            .map_err(|err| format!("invalid item key '{s}': {err}"))
    }
}

impl Serialize for ItemKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl de::Visitor<'_> for KeyVisitor {
            type Value = ItemKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an app id or name-hash key")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ItemKey, E> {
                Ok(ItemKey::AppId(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ItemKey, E> {
                u64::try_from(value)
                    .map(ItemKey::AppId)
                    .map_err(|_| E::custom(format!("negative app id {value}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ItemKey, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}
