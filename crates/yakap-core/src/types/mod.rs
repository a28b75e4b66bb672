//! Core identifier types used throughout Yakap.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Unique identifier for a registered user (encoder or admin).
    UserId
}

string_id! {
    /// Unique identifier for an assistance record.
    YakapId
}

string_id! {
    /// Unique identifier for a barangay.
    BrgyId
}

string_id! {
    /// Unique identifier for a city or municipality.
    CityId
}

string_id! {
    /// Unique identifier for a province.
    ProvId
}

/// Generate a fresh prefixed identifier (`<prefix>_<uuid-v4>`).
#[must_use]
pub fn fresh_id(prefix: &str) -> String {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);

    // Set version (4) and variant bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    format!(
        "{prefix}_{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_id_shape() {
        let id = fresh_id("yakap");
        assert!(id.starts_with("yakap_"));
        assert_eq!(id.len(), "yakap_".len() + 36);
        assert_ne!(id, fresh_id("yakap"));
    }

    #[test]
    fn test_id_roundtrip() {
        let id = UserId::new("user_123");
        assert_eq!(id.as_ref(), "user_123");
        assert_eq!(id.to_string(), "user_123");
        assert_eq!(id, UserId::from("user_123"));
    }

    #[test]
    fn test_id_serde() {
        let id = BrgyId::new("brgy_7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"brgy_7\"");
        let back: BrgyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
