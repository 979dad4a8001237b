//! Strongly-typed identifier support.
//!
//! Each domain crate declares its own identifiers with [`define_id!`]; the
//! macro lives here so every id in the workspace gets the same shape:
//! a UUIDv7 newtype with `Display`, `FromStr`, and `Uuid` conversions.
//! UUIDv7 is time-ordered, which also gives ids a stable, reproducible
//! ordering for tie-breaking.

/// Declare a UUIDv7 newtype identifier.
///
/// ```ignore
/// stockledger_core::define_id!(
///     /// Catalog item identifier.
///     ItemId, "ItemId"
/// );
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(::uuid::Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(::uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl ::core::fmt::Display for $t {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<::uuid::Uuid> for $t {
            fn from(value: ::uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for ::uuid::Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl ::core::str::FromStr for $t {
            type Err = $crate::LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = ::core::str::FromStr::from_str(s)
                    .map_err(|e| $crate::LedgerError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use crate::LedgerError;

    define_id!(
        /// Test-only identifier.
        SampleId,
        "SampleId"
    );

    #[test]
    fn new_ids_are_unique() {
        let a = SampleId::new();
        let b = SampleId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn ordering_follows_uuid_bytes() {
        let lo = SampleId::from_uuid(uuid::Uuid::from_u128(1));
        let hi = SampleId::from_uuid(uuid::Uuid::from_u128(2));
        assert!(lo < hi);
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = SampleId::new();
        let parsed = SampleId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_text() {
        let err = SampleId::from_str("not-a-uuid").unwrap_err();
        match err {
            LedgerError::InvalidId(msg) => assert!(msg.contains("SampleId")),
            _ => panic!("expected InvalidId"),
        }
    }
}
