//! TriageRecord: the admission record for one emergency episode.
//!
//! ## Lifecycle
//!
//! ```text
//!              +-------------------------------+
//!              v                               |
//!  EnAtencion --> Estable | Hospitalizado | EnRehabilitacion | EnComa   (any order)
//!      |                         |
//!      +-------------+-----------+
//!                    v
//!        DeAlta | AltaMedica | Fallecido    (terminal, no outgoing transitions)
//! ```
//!
//! A record holds a bed while it is in a non-terminal state and never after it reaches a
//! terminal state. `Fallecido` additionally requires a death timestamp.

use crate::bed_pool::BedAssignment;
use crate::urgency::{Classification, UrgencyLevel};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use triage_types::{NonEmptyText, PatientId, TriageId};

// ============================================================================
// CLINICAL STATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalState {
    /// Initial state: the patient is being attended.
    EnAtencion,
    Estable,
    Hospitalizado,
    EnRehabilitacion,
    EnComa,
    /// Discharged.
    DeAlta,
    /// Medical discharge.
    AltaMedica,
    /// Deceased.
    Fallecido,
}

impl ClinicalState {
    pub const ALL: [ClinicalState; 8] = [
        ClinicalState::EnAtencion,
        ClinicalState::Estable,
        ClinicalState::Hospitalizado,
        ClinicalState::EnRehabilitacion,
        ClinicalState::EnComa,
        ClinicalState::DeAlta,
        ClinicalState::AltaMedica,
        ClinicalState::Fallecido,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ClinicalState::DeAlta | ClinicalState::AltaMedica | ClinicalState::Fallecido
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn slug(self) -> &'static str {
        match self {
            ClinicalState::EnAtencion => "en_atencion",
            ClinicalState::Estable => "estable",
            ClinicalState::Hospitalizado => "hospitalizado",
            ClinicalState::EnRehabilitacion => "en_rehabilitacion",
            ClinicalState::EnComa => "en_coma",
            ClinicalState::DeAlta => "de_alta",
            ClinicalState::AltaMedica => "alta_medica",
            ClinicalState::Fallecido => "fallecido",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClinicalState::EnAtencion => "En Atención",
            ClinicalState::Estable => "Estable",
            ClinicalState::Hospitalizado => "Hospitalizado",
            ClinicalState::EnRehabilitacion => "En Rehabilitación",
            ClinicalState::EnComa => "En Coma",
            ClinicalState::DeAlta => "De Alta",
            ClinicalState::AltaMedica => "Alta Médica",
            ClinicalState::Fallecido => "Fallecido",
        }
    }
}

impl fmt::Display for ClinicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ClinicalState {
    type Err = TriageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        ClinicalState::ALL
            .into_iter()
            .find(|s| s.slug() == trimmed || s.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown clinical state: '{raw}'")))
    }
}

/// Check a move from `from` to `to` against the lifecycle.
///
/// Any non-terminal state may move to any state (re-asserting the current state is a no-op).
/// Terminal states have no outgoing transitions.
pub fn validate_transition(from: ClinicalState, to: ClinicalState) -> TriageResult<()> {
    if from.is_terminal() {
        return Err(TriageError::InvalidStateTransition { from, to });
    }
    Ok(())
}

// ============================================================================
// PATIENT IDENTITY
// ============================================================================

/// Temporary identity recorded for a patient who cannot be identified on arrival.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TemporaryIdentity {
    pub name: String,
    pub approximate_age: u8,
}

const MAX_APPROXIMATE_AGE: u8 = 130;

/// Who the episode belongs to: a registry patient, or an unidentified arrival.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatientIdentity {
    Known {
        patient_id: PatientId,
    },
    Unidentified {
        temporary_name: NonEmptyText,
        approximate_age: u8,
    },
}

impl PatientIdentity {
    /// Build an identity from the two optional request shapes.
    ///
    /// # Errors
    ///
    /// - [`TriageError::AmbiguousPatientIdentity`] if both or neither are supplied.
    /// - [`TriageError::InvalidInput`] if the temporary name is blank or the age implausible.
    pub fn from_parts(
        patient_id: Option<PatientId>,
        temporary: Option<TemporaryIdentity>,
    ) -> TriageResult<Self> {
        match (patient_id, temporary) {
            (Some(patient_id), None) => Ok(PatientIdentity::Known { patient_id }),
            (None, Some(temp)) => {
                let temporary_name = NonEmptyText::new(&temp.name)
                    .map_err(|_| TriageError::InvalidInput("temporary name cannot be empty".into()))?;
                if temp.approximate_age > MAX_APPROXIMATE_AGE {
                    return Err(TriageError::InvalidInput(format!(
                        "approximate age {} is not plausible",
                        temp.approximate_age
                    )));
                }
                Ok(PatientIdentity::Unidentified {
                    temporary_name,
                    approximate_age: temp.approximate_age,
                })
            }
            _ => Err(TriageError::AmbiguousPatientIdentity),
        }
    }

    pub fn known_patient(&self) -> Option<PatientId> {
        match self {
            PatientIdentity::Known { patient_id } => Some(*patient_id),
            PatientIdentity::Unidentified { .. } => None,
        }
    }
}

// ============================================================================
// VITAL SIGNS
// ============================================================================

/// Vital signs; each reading is independently optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    /// `systolic/diastolic` in mmHg, e.g. `120/80`.
    #[serde(default)]
    pub blood_pressure: Option<String>,
    /// Beats per minute.
    #[serde(default)]
    pub heart_rate: Option<u16>,
    /// Degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Percent.
    #[serde(default)]
    pub oxygen_saturation: Option<u8>,
}

impl VitalSigns {
    /// Reject physiologically impossible readings.
    pub fn validate(&self) -> TriageResult<()> {
        if let Some(bp) = &self.blood_pressure {
            parse_blood_pressure(bp)?;
        }
        if let Some(hr) = self.heart_rate {
            if hr > 300 {
                return Err(TriageError::InvalidInput(format!(
                    "heart rate {hr} bpm is out of range (0-300)"
                )));
            }
        }
        if let Some(t) = self.temperature {
            if !(25.0..=45.0).contains(&t) {
                return Err(TriageError::InvalidInput(format!(
                    "temperature {t} °C is out of range (25-45)"
                )));
            }
        }
        if let Some(spo2) = self.oxygen_saturation {
            if spo2 > 100 {
                return Err(TriageError::InvalidInput(format!(
                    "oxygen saturation {spo2}% is out of range (0-100)"
                )));
            }
        }
        Ok(())
    }

    /// Overlay every reading present in `update` onto `self`.
    pub fn merge(&mut self, update: VitalSigns) {
        if update.blood_pressure.is_some() {
            self.blood_pressure = update.blood_pressure;
        }
        if update.heart_rate.is_some() {
            self.heart_rate = update.heart_rate;
        }
        if update.temperature.is_some() {
            self.temperature = update.temperature;
        }
        if update.oxygen_saturation.is_some() {
            self.oxygen_saturation = update.oxygen_saturation;
        }
    }
}

fn parse_blood_pressure(raw: &str) -> TriageResult<(u16, u16)> {
    let invalid = || {
        TriageError::InvalidInput(format!(
            "blood pressure must look like 'systolic/diastolic', got '{raw}'"
        ))
    };
    let (sys, dia) = raw.trim().split_once('/').ok_or_else(invalid)?;
    let systolic: u16 = sys.trim().parse().map_err(|_| invalid())?;
    let diastolic: u16 = dia.trim().parse().map_err(|_| invalid())?;
    if systolic == 0 || diastolic == 0 || diastolic >= systolic || systolic > 350 {
        return Err(invalid());
    }
    Ok((systolic, diastolic))
}

// ============================================================================
// TRIAGE RECORD
// ============================================================================

/// Bed bound to an active record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BedRef {
    pub number: u32,
    pub floor: i32,
}

impl From<&BedAssignment> for BedRef {
    fn from(assignment: &BedAssignment) -> Self {
        Self {
            number: assignment.number,
            floor: assignment.floor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TriageRecord {
    pub id: TriageId,
    pub patient: PatientIdentity,
    pub urgency: UrgencyLevel,
    pub symptoms: NonEmptyText,
    pub vitals: VitalSigns,
    /// Set while the record is active, cleared on any terminal state.
    pub bed: Option<BedRef>,
    pub state: ClinicalState,
    pub created_at: DateTime<Utc>,
    /// Latest time by which the patient must be seen, from the urgency target.
    pub respond_by: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store revision this copy was read at. Every successful write bumps it.
    pub revision: u64,
    pub closed_at: Option<DateTime<Utc>>,
    /// Only set when `state == Fallecido`.
    pub deceased_at: Option<DateTime<Utc>>,
}

impl TriageRecord {
    /// New record in `EnAtencion`, bound to the claimed bed.
    pub fn admit(
        id: TriageId,
        patient: PatientIdentity,
        classification: Classification,
        symptoms: NonEmptyText,
        vitals: VitalSigns,
        bed: &BedAssignment,
    ) -> Self {
        let created_at = bed.occupied_since;
        Self {
            id,
            patient,
            urgency: classification.level,
            symptoms,
            vitals,
            bed: Some(BedRef::from(bed)),
            state: ClinicalState::EnAtencion,
            created_at,
            respond_by: created_at + classification.target_response,
            updated_at: created_at,
            revision: 0,
            closed_at: None,
            deceased_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn target_response(&self) -> Duration {
        self.urgency.target_response()
    }

    /// Staff-driven clinical progress between non-terminal states.
    ///
    /// Terminal states are reached through discharge only, so the bed is released with them.
    pub fn progress(&mut self, target: ClinicalState, now: DateTime<Utc>) -> TriageResult<()> {
        validate_transition(self.state, target)?;
        if target.is_terminal() {
            return Err(TriageError::InvalidStateTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.updated_at = now;
        Ok(())
    }

    /// Move to a terminal state, unbinding the bed.
    ///
    /// Returns the bed that was bound, if any, so the caller can release it.
    ///
    /// # Errors
    ///
    /// - [`TriageError::InvalidStateTransition`] if the record is already terminal or `target`
    ///   is not terminal.
    /// - [`TriageError::MissingDeathDate`] if `target` is `Fallecido` and no timestamp is given.
    /// - [`TriageError::InvalidInput`] if a death timestamp accompanies another state or lies
    ///   in the future.
    pub fn close(
        &mut self,
        target: ClinicalState,
        deceased_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> TriageResult<Option<BedRef>> {
        validate_transition(self.state, target)?;
        if !target.is_terminal() {
            return Err(TriageError::InvalidStateTransition {
                from: self.state,
                to: target,
            });
        }

        let deceased_at = match (target, deceased_at) {
            (ClinicalState::Fallecido, None) => return Err(TriageError::MissingDeathDate),
            (ClinicalState::Fallecido, Some(at)) if at > now => {
                return Err(TriageError::InvalidInput(
                    "death timestamp cannot be in the future".into(),
                ))
            }
            (ClinicalState::Fallecido, Some(at)) => Some(at),
            (_, Some(_)) => {
                return Err(TriageError::InvalidInput(format!(
                    "a death timestamp only applies to {}",
                    ClinicalState::Fallecido
                )))
            }
            (_, None) => None,
        };

        self.state = target;
        self.deceased_at = deceased_at;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(self.bed.take())
    }

    /// Merge new vital sign readings into an active record.
    pub fn update_vitals(&mut self, update: VitalSigns, now: DateTime<Utc>) -> TriageResult<()> {
        if self.state.is_terminal() {
            return Err(TriageError::InvalidStateTransition {
                from: self.state,
                to: self.state,
            });
        }
        update.validate()?;
        self.vitals.merge(update);
        self.updated_at = now;
        Ok(())
    }
}
