//! Typed identifiers.
//!
//! Ids are opaque text (UUIDs for anything the engine generates, whatever the
//! integration supplied otherwise). Wrapping them keeps an `AccountId` from
//! being passed where a `PayeeId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new random id (UUID v4).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

typed_id!(
    /// Identifier of an [`Account`](crate::Account).
    AccountId
);
typed_id!(
    /// Identifier of a [`Payee`](crate::Payee).
    PayeeId
);
typed_id!(
    /// Identifier of a [`Transaction`](crate::Transaction) row.
    TransactionId
);
