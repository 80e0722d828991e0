//! Defaults and environment variable names used throughout the triage core.

/// Emergency bed inventory size in the reference deployment.
pub const DEFAULT_BED_COUNT: u32 = 20;

/// Floor on which emergency beds are located when no explicit layout is configured.
pub const DEFAULT_BED_FLOOR: i32 = 1;

/// Confirmed appointments a provider may hold per calendar day unless overridden.
pub const DEFAULT_DAILY_APPOINTMENT_MAX: u32 = 20;

pub const BED_COUNT_ENV: &str = "TRIAGE_BED_COUNT";
pub const BED_FLOOR_ENV: &str = "TRIAGE_BED_FLOOR";
pub const DAILY_APPOINTMENT_MAX_ENV: &str = "TRIAGE_DAILY_APPOINTMENT_MAX";
pub const EMERGENCY_PROVIDER_ENV: &str = "TRIAGE_EMERGENCY_PROVIDER_ID";
pub const CAPACITY_FILE_ENV: &str = "TRIAGE_CAPACITY_FILE";

/// Diagnosis recorded on the clinical history when an emergency admission is linked.
pub const EMERGENCY_HISTORY_DIAGNOSIS: &str = "Emergency admission";

pub const REST_ADDR_ENV: &str = "TRIAGE_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Attempts at a read-modify-write of a TriageRecord before giving up on a busy record.
pub const RECORD_WRITE_ATTEMPTS: usize = 5;
