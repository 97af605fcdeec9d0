//! Master-issued and framework-assigned identifiers.
//!
//! Every identifier in the v1 API is a message with a single `value`
//! field, so on the wire they all look like `{"value": "..."}`.

/// Defines a `{"value": ...}` identifier newtype.
///
/// This generates:
/// - `new()` from anything string-like
/// - `as_str()` for borrowing the raw value
/// - `Display`, `From<&str>` and `From<String>`
/// - `Serialize`/`Deserialize` as the wrapped message form
macro_rules! value_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name {
            pub value: String,
        }

        impl $name {
            /// Creates an identifier from its raw value.
            pub fn new(value: impl Into<String>) -> Self {
                Self { value: value.into() }
            }

            /// Returns the raw value.
            pub fn as_str(&self) -> &str {
                &self.value
            }

            /// Returns true if the value is empty.
            pub fn is_empty(&self) -> bool {
                self.value.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

value_id!(
    /// Identity assigned to the framework by the master on first subscribe.
    FrameworkId
);
value_id!(
    /// A worker node known to the master.
    AgentId
);
value_id!(
    /// Caller-assigned task identifier, unique within the framework.
    TaskId
);
value_id!(
    /// A single resource offer.
    OfferId
);
