//! Canonical UUID identifiers.

use crate::{TypesError, TypesResult};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// A UUID that is guaranteed to render in canonical form (32 lowercase hex characters).
///
/// # Construction
/// - [`CanonicalUuid::generate`] allocates a fresh random identifier.
/// - [`CanonicalUuid::parse`] validates an externally supplied identifier. It does **not**
///   normalise hyphenated or uppercase input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalUuid(Uuid);

impl CanonicalUuid {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and wraps a canonical UUID string.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidId`] if `input` is not exactly 32 lowercase hex characters.
    pub fn parse(input: &str) -> TypesResult<Self> {
        if !Self::is_canonical(input) {
            return Err(TypesError::InvalidId(format!(
                "expected 32 lowercase hex characters without hyphens, got: '{input}'"
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| TypesError::InvalidId(e.to_string()))
    }

    /// Purely syntactic check: 32 bytes, each `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CanonicalUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CanonicalUuid {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Declares a typed identifier backed by [`CanonicalUuid`].
macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(CanonicalUuid);

        impl $name {
            /// Allocates a fresh identifier.
            pub fn generate() -> Self {
                Self(CanonicalUuid::generate())
            }

            /// Parses a canonical identifier.
            ///
            /// # Errors
            ///
            /// Returns [`TypesError::InvalidId`] for non-canonical input.
            pub fn parse(input: &str) -> TypesResult<Self> {
                CanonicalUuid::parse(input).map(Self)
            }

            pub fn uuid(&self) -> Uuid {
                self.0.uuid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

canonical_id!(
    /// Identity of one emergency episode (a TriageRecord).
    TriageId
);
canonical_id!(
    /// Reference to a patient owned by the external patient registry.
    PatientId
);
canonical_id!(
    /// Reference to a care provider.
    ProviderId
);
canonical_id!(
    /// Identity of one appointment row in the appointment store.
    AppointmentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_canonical() {
        let id = TriageId::generate();
        assert!(CanonicalUuid::is_canonical(&id.to_string()));
    }

    #[test]
    fn test_parse_accepts_canonical_form() {
        let raw = "550e8400e29b41d4a716446655440000";
        let id = PatientId::parse(raw).expect("canonical id should parse");
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn test_parse_rejects_hyphenated_and_uppercase() {
        assert!(ProviderId::parse("550e8400-e29b-41d4-a716-446655440000").is_err());
        assert!(ProviderId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(ProviderId::parse("550e8400").is_err());
        assert!(ProviderId::parse("zz0e8400e29b41d4a716446655440000").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = AppointmentId::parse("1166765a406a4552ac9b8e141931a3dc").expect("valid id");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"1166765a406a4552ac9b8e141931a3dc\"");

        let back: AppointmentId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
        assert!(serde_json::from_str::<AppointmentId>("\"not-an-id\"").is_err());
    }
}
