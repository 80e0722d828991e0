//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Services never read process-wide environment variables while handling a
//! request, so every admission and reservation in a process sees the same bed inventory and
//! the same provider quotas.

use crate::constants::{
    BED_COUNT_ENV, BED_FLOOR_ENV, CAPACITY_FILE_ENV, DAILY_APPOINTMENT_MAX_ENV,
    DEFAULT_BED_COUNT, DEFAULT_BED_FLOOR, DEFAULT_DAILY_APPOINTMENT_MAX, EMERGENCY_PROVIDER_ENV,
};
use crate::{TriageError, TriageResult};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use triage_types::ProviderId;

/// Physical location of one emergency bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedSpec {
    pub number: u32,
    pub floor: i32,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    beds: Vec<BedSpec>,
    default_daily_max: u32,
    provider_daily_max: HashMap<ProviderId, u32>,
    emergency_provider: Option<ProviderId>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidConfig`] if:
    /// - `beds` is empty, contains bed number `0`, or repeats a bed number,
    /// - `default_daily_max` or any per-provider maximum is `0`.
    pub fn new(
        beds: Vec<BedSpec>,
        default_daily_max: u32,
        provider_daily_max: HashMap<ProviderId, u32>,
        emergency_provider: Option<ProviderId>,
    ) -> TriageResult<Self> {
        if beds.is_empty() {
            return Err(TriageError::InvalidConfig(
                "bed inventory cannot be empty".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(beds.len());
        for bed in &beds {
            if bed.number == 0 {
                return Err(TriageError::InvalidConfig(
                    "bed numbers start at 1".into(),
                ));
            }
            if !seen.insert(bed.number) {
                return Err(TriageError::InvalidConfig(format!(
                    "bed number {} is configured more than once",
                    bed.number
                )));
            }
        }

        if default_daily_max == 0 {
            return Err(TriageError::InvalidConfig(
                "default daily appointment maximum must be at least 1".into(),
            ));
        }
        if let Some((provider, _)) = provider_daily_max.iter().find(|(_, max)| **max == 0) {
            return Err(TriageError::InvalidConfig(format!(
                "daily appointment maximum for provider {provider} must be at least 1"
            )));
        }

        Ok(Self {
            beds,
            default_daily_max,
            provider_daily_max,
            emergency_provider,
        })
    }

    /// `bed_count` beds numbered from 1 on a single floor, with the default appointment quota.
    pub fn with_bed_count(bed_count: u32) -> TriageResult<Self> {
        Self::new(
            bed_layout(bed_count, DEFAULT_BED_FLOOR)?,
            DEFAULT_DAILY_APPOINTMENT_MAX,
            HashMap::new(),
            None,
        )
    }

    /// Resolve configuration from raw source values (usually environment variables).
    ///
    /// An explicit `beds:` list in the capacity file takes precedence over
    /// `TRIAGE_BED_COUNT`/`TRIAGE_BED_FLOOR`.
    pub fn from_sources(sources: ConfigSources) -> TriageResult<Self> {
        let default_daily_max = positive_from_env_value(
            DAILY_APPOINTMENT_MAX_ENV,
            sources.daily_appointment_max,
            DEFAULT_DAILY_APPOINTMENT_MAX,
        )?;

        let emergency_provider = non_blank(sources.emergency_provider_id)
            .map(|raw| ProviderId::parse(&raw))
            .transpose()
            .map_err(|e| TriageError::InvalidConfig(format!("{EMERGENCY_PROVIDER_ENV}: {e}")))?;

        let capacity_file = match non_blank(sources.capacity_file) {
            Some(path) => Some(load_capacity_file(Path::new(&path))?),
            None => None,
        };

        let (file_beds, provider_daily_max) = match capacity_file {
            Some(file) => file.into_parts()?,
            None => (None, HashMap::new()),
        };

        let beds = match file_beds {
            Some(beds) => beds,
            None => {
                let count =
                    positive_from_env_value(BED_COUNT_ENV, sources.bed_count, DEFAULT_BED_COUNT)?;
                let floor = floor_from_env_value(sources.bed_floor)?;
                bed_layout(count, floor)?
            }
        };

        Self::new(beds, default_daily_max, provider_daily_max, emergency_provider)
    }

    pub fn beds(&self) -> &[BedSpec] {
        &self.beds
    }

    pub fn bed_count(&self) -> usize {
        self.beds.len()
    }

    pub fn default_daily_max(&self) -> u32 {
        self.default_daily_max
    }

    /// Daily appointment maximum for `provider`, falling back to the default.
    pub fn daily_max_for(&self, provider: &ProviderId) -> u32 {
        self.provider_daily_max
            .get(provider)
            .copied()
            .unwrap_or(self.default_daily_max)
    }

    pub fn provider_overrides(&self) -> &HashMap<ProviderId, u32> {
        &self.provider_daily_max
    }

    pub fn emergency_provider(&self) -> Option<ProviderId> {
        self.emergency_provider
    }
}

/// Raw configuration values, typically read from the environment at startup.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    pub bed_count: Option<String>,
    pub bed_floor: Option<String>,
    pub daily_appointment_max: Option<String>,
    pub emergency_provider_id: Option<String>,
    pub capacity_file: Option<String>,
}

impl ConfigSources {
    /// Snapshot the relevant environment variables.
    pub fn from_env() -> Self {
        Self {
            bed_count: std::env::var(BED_COUNT_ENV).ok(),
            bed_floor: std::env::var(BED_FLOOR_ENV).ok(),
            daily_appointment_max: std::env::var(DAILY_APPOINTMENT_MAX_ENV).ok(),
            emergency_provider_id: std::env::var(EMERGENCY_PROVIDER_ENV).ok(),
            capacity_file: std::env::var(CAPACITY_FILE_ENV).ok(),
        }
    }
}

/// Beds `1..=count` on `floor`.
pub fn bed_layout(count: u32, floor: i32) -> TriageResult<Vec<BedSpec>> {
    if count == 0 {
        return Err(TriageError::InvalidConfig(
            "bed inventory cannot be empty".into(),
        ));
    }
    Ok((1..=count).map(|number| BedSpec { number, floor }).collect())
}

/// Parse a strictly positive integer from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn positive_from_env_value(name: &str, value: Option<String>, default: u32) -> TriageResult<u32> {
    let Some(value) = non_blank(value) else {
        return Ok(default);
    };
    match value.parse::<u32>() {
        Ok(0) => Err(TriageError::InvalidConfig(format!(
            "{name} must be at least 1"
        ))),
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(TriageError::InvalidConfig(format!(
            "{name} must be a positive integer, got '{value}': {e}"
        ))),
    }
}

fn floor_from_env_value(value: Option<String>) -> TriageResult<i32> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_BED_FLOOR);
    };
    value.parse::<i32>().map_err(|e| {
        TriageError::InvalidConfig(format!("{BED_FLOOR_ENV} must be an integer, got '{value}': {e}"))
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Capacity file
// ============================================================================

/// Strict wire model for the optional capacity YAML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapacityFile {
    #[serde(default)]
    beds: Option<Vec<BedSpec>>,
    #[serde(default)]
    providers: Vec<ProviderCapacity>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderCapacity {
    provider_id: ProviderId,
    daily_max: u32,
}

impl CapacityFile {
    /// Parse capacity YAML, reporting the path of the first field that does not match.
    pub fn parse(yaml_text: &str) -> TriageResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        serde_path_to_error::deserialize::<_, CapacityFile>(deserializer).map_err(|err| {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            TriageError::InvalidConfig(format!("capacity file mismatch at {path}: {source}"))
        })
    }

    fn into_parts(self) -> TriageResult<(Option<Vec<BedSpec>>, HashMap<ProviderId, u32>)> {
        let mut limits = HashMap::with_capacity(self.providers.len());
        for entry in self.providers {
            if limits.insert(entry.provider_id, entry.daily_max).is_some() {
                return Err(TriageError::InvalidConfig(format!(
                    "provider {} is listed more than once",
                    entry.provider_id
                )));
            }
        }
        Ok((self.beds, limits))
    }
}

/// Read and parse the capacity file at `path`.
pub fn load_capacity_file(path: &Path) -> TriageResult<CapacityFile> {
    let text = std::fs::read_to_string(path).map_err(TriageError::ConfigRead)?;
    CapacityFile::parse(&text)
}

/// Location of the capacity file, if one is configured.
pub fn capacity_file_path(sources: &ConfigSources) -> Option<PathBuf> {
    sources
        .capacity_file
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROVIDER: &str = "2db695ed7cc04fc99b08e0c738069b71";

    #[test]
    fn test_defaults_match_reference_deployment() {
        let cfg = CoreConfig::from_sources(ConfigSources::default())
            .expect("defaults should resolve");
        assert_eq!(cfg.bed_count(), 20);
        assert_eq!(cfg.beds()[0], BedSpec { number: 1, floor: 1 });
        assert_eq!(cfg.default_daily_max(), 20);
        assert!(cfg.emergency_provider().is_none());
    }

    #[test]
    fn test_env_values_override_defaults() {
        let cfg = CoreConfig::from_sources(ConfigSources {
            bed_count: Some(" 5 ".into()),
            bed_floor: Some("-1".into()),
            daily_appointment_max: Some("8".into()),
            emergency_provider_id: Some(PROVIDER.into()),
            capacity_file: Some("   ".into()),
        })
        .expect("valid sources");

        assert_eq!(cfg.bed_count(), 5);
        assert!(cfg.beds().iter().all(|b| b.floor == -1));
        assert_eq!(cfg.default_daily_max(), 8);
        assert_eq!(
            cfg.emergency_provider().map(|p| p.to_string()),
            Some(PROVIDER.to_string())
        );
    }

    #[test]
    fn test_zero_and_garbage_values_are_rejected() {
        let zero = CoreConfig::from_sources(ConfigSources {
            bed_count: Some("0".into()),
            ..Default::default()
        });
        assert!(matches!(zero, Err(TriageError::InvalidConfig(_))));

        let garbage = CoreConfig::from_sources(ConfigSources {
            daily_appointment_max: Some("twenty".into()),
            ..Default::default()
        });
        assert!(matches!(garbage, Err(TriageError::InvalidConfig(_))));
    }

    #[test]
    fn test_duplicate_bed_numbers_are_rejected() {
        let beds = vec![
            BedSpec { number: 3, floor: 1 },
            BedSpec { number: 3, floor: 2 },
        ];
        let err = CoreConfig::new(beds, 20, HashMap::new(), None).expect_err("duplicate bed");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_capacity_file_sets_layout_and_provider_limits() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "beds:\n  - {{ number: 10, floor: 2 }}\n  - {{ number: 11, floor: 2 }}\nproviders:\n  - {{ provider_id: {PROVIDER}, daily_max: 12 }}\n"
        )
        .expect("write yaml");

        let cfg = CoreConfig::from_sources(ConfigSources {
            bed_count: Some("40".into()),
            capacity_file: Some(file.path().display().to_string()),
            ..Default::default()
        })
        .expect("capacity file should load");

        assert_eq!(cfg.bed_count(), 2);
        assert_eq!(cfg.beds()[1], BedSpec { number: 11, floor: 2 });
        let provider = ProviderId::parse(PROVIDER).expect("valid provider id");
        assert_eq!(cfg.daily_max_for(&provider), 12);
        assert_eq!(cfg.daily_max_for(&ProviderId::generate()), 20);
    }

    #[test]
    fn test_capacity_file_rejects_unknown_keys_with_path() {
        let yaml = format!("providers:\n  - provider_id: {PROVIDER}\n    daily_max: 3\n    colour: red\n");
        let err = CapacityFile::parse(&yaml).expect_err("unknown key should fail");
        let msg = err.to_string();
        assert!(msg.contains("providers[0]"), "unexpected message: {msg}");
        assert!(msg.contains("colour"), "unexpected message: {msg}");
    }

    #[test]
    fn test_missing_capacity_file_is_a_read_error() {
        let err = CoreConfig::from_sources(ConfigSources {
            capacity_file: Some("/definitely/not/here.yaml".into()),
            ..Default::default()
        })
        .expect_err("missing file");
        assert!(matches!(err, TriageError::ConfigRead(_)));
    }
}
