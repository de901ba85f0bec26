use crate::domain::{RawIncident, RawLogEntry, RawNote, Service, TimeWindow};
use crate::error::AppError;

/// One page of the provider's incident listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentPage {
    pub incidents: Vec<RawIncident>,
    pub more: bool,
}

/// Operations consumed from the alerting provider.
///
/// `list_incidents_page` may fail with [`AppError::request_too_large`] when the encoded
/// service id list exceeds the provider's request limit; every other error is fatal.
pub trait IncidentSource {
    fn escalation_policy_services(&self, policy_id: &str) -> Result<Vec<Service>, AppError>;

    fn list_incidents_page(
        &self,
        service_ids: &[String],
        window: &TimeWindow,
        offset: u32,
        limit: u32,
    ) -> Result<IncidentPage, AppError>;

    fn count_incidents(&self, service_id: &str, window: &TimeWindow) -> Result<u64, AppError>;

    fn list_notes(&self, incident_id: &str) -> Result<Vec<RawNote>, AppError>;

    /// All log entries of an incident; implementations exhaust pagination.
    fn list_log_entries(&self, incident_id: &str) -> Result<Vec<RawLogEntry>, AppError>;
}
