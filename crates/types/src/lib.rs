//! Validated primitives shared across the triage workspace.
//!
//! Identifiers use a *canonical* UUID representation: **32 lowercase hexadecimal characters**
//! (no hyphens). This is the same value produced by `Uuid::new_v4().simple().to_string()`.
//! Externally supplied identifiers (CLI arguments, request bodies, path segments) must already
//! be canonical; uppercase, hyphenated, wrong-length or non-hex values are rejected.
//!
//! Each entity gets its own identifier type so a provider id can never be passed where a
//! triage record id is expected:
//! - [`TriageId`] - one emergency episode
//! - [`PatientId`] - a patient held by the external registry
//! - [`ProviderId`] - a care provider with an appointment quota
//! - [`AppointmentId`] - one appointment row

mod id;
mod text;

pub use id::{AppointmentId, CanonicalUuid, PatientId, ProviderId, TriageId};
pub use text::NonEmptyText;

/// Errors raised when constructing validated primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    EmptyText,
    /// The input was not a canonical identifier
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Result type for primitive construction.
pub type TypesResult<T> = Result<T, TypesError>;
