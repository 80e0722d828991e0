use crate::dto::HealthRes;

/// Health check shared by every transport.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Triage service is alive".into(),
        }
    }
}
