//! Opaque identifier newtypes shared across every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing [`Uuid`].
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Return the inner [`Uuid`].
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from its string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        /// Generates a random identifier — equivalent to [`Self::new`].
        ///
        /// Each call produces a unique random value, not a sentinel/zero id.
        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_id!(InstanceId, "Identifies a [`crate::ConnectorInstance`].");
uuid_id!(BindingId, "Identifies a `ClientBinding` row.");
uuid_id!(BackupId, "Identifies a `ConfigBackup` row.");
uuid_id!(OperationId, "Identifies an in-memory `Operation` handle.");
uuid_id!(SubscriberId, "Identifies an Event Bus subscriber.");
uuid_id!(DecisionId, "Identifies a recorded `PolicyDecision`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
    }

    #[test]
    fn round_trips_through_display_and_parse() {
        let id = BindingId::new();
        let parsed: BindingId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_round_trip_is_transparent() {
        let id = OperationId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: OperationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
