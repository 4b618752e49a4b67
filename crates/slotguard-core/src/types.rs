//! Strong type definitions for Slotguard.
//!
//! All identifiers are newtypes to prevent mixing a user id with a
//! resource id at compile time.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier (16 random bytes, hex).
            pub fn generate() -> Self {
                let mut bytes = [0u8; 16];
                OsRng.fill_bytes(&mut bytes);
                Self(hex::encode(bytes))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a user account.
    UserId
);

string_id!(
    /// Identifier of a resource (a calendar of day slots).
    ResourceId
);

string_id!(
    /// Identifier of a permission row.
    PermissionId
);

/// The closed set of account roles.
///
/// `Admin` may do everything without any grant. `Editor` sees only what
/// explicit permission rows allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    /// Wire and storage name of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct_hex() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_debug_and_display() {
        let id = ResourceId::new("cal-2024");
        assert_eq!(format!("{}", id), "cal-2024");
        assert_eq!(format!("{:?}", id), "ResourceId(cal-2024)");
    }

    #[test]
    fn test_role_parse_and_serde() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!(
            "owner".parse::<Role>().unwrap_err(),
            ValidationError::UnknownRole("owner".into())
        );
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = UserId::new("u1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
    }
}
