use prr_core::domain::{RawIncident, RawLogEntry, RawNote, Service, TimeWindow};
use prr_core::error::AppError;
use prr_core::source::{IncidentPage, IncidentSource};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::client::PagerDutyClient;

const LOG_ENTRY_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
struct ServiceBody {
    id: String,
    summary: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EscalationPolicyBody {
    #[serde(default)]
    services: Vec<ServiceBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct EscalationPolicyResponse {
    escalation_policy: EscalationPolicyBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentListResponse {
    #[serde(default)]
    pub incidents: Vec<RawIncident>,
    #[serde(default)]
    pub more: bool,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct NotesResponse {
    #[serde(default)]
    notes: Vec<RawNote>,
}

#[derive(Debug, Clone, Deserialize)]
struct LogEntriesResponse {
    #[serde(default)]
    log_entries: Vec<RawLogEntry>,
    #[serde(default)]
    more: bool,
}

fn rfc3339(field: &str, dt: OffsetDateTime) -> Result<String, AppError> {
    dt.format(&Rfc3339).map_err(|e| {
        AppError::new("PROVIDER_QUERY_FAILED", "Failed to format query time")
            .with_details(format!("{field}; err={e}"))
    })
}

fn window_params(window: &TimeWindow) -> Result<Vec<(String, String)>, AppError> {
    let mut params = vec![
        ("since".to_string(), rfc3339("since", window.since)?),
        ("time_zone".to_string(), "UTC".to_string()),
    ];
    if let Some(until) = window.until {
        params.push(("until".to_string(), rfc3339("until", until)?));
    }
    Ok(params)
}

/// Query parameters for one page of `GET /incidents`.
pub fn incident_list_query(
    service_ids: &[String],
    window: &TimeWindow,
    offset: u32,
    limit: u32,
) -> Result<Vec<(String, String)>, AppError> {
    let mut params: Vec<(String, String)> = service_ids
        .iter()
        .map(|id| ("service_ids[]".to_string(), id.clone()))
        .collect();
    params.extend(window_params(window)?);
    params.push(("offset".to_string(), offset.to_string()));
    params.push(("limit".to_string(), limit.to_string()));
    Ok(params)
}

fn services_from_policy(policy: EscalationPolicyBody) -> Vec<Service> {
    policy
        .services
        .into_iter()
        .map(|s| {
            let name = s.summary.or(s.name).unwrap_or_else(|| s.id.clone());
            Service::new(s.id, name)
        })
        .collect()
}

impl IncidentSource for PagerDutyClient {
    fn escalation_policy_services(&self, policy_id: &str) -> Result<Vec<Service>, AppError> {
        let path = format!("/escalation_policies/{policy_id}");
        let resp: EscalationPolicyResponse = self.get_json(&path, &[]).map_err(|e| {
            if e.code == "PROVIDER_NOT_FOUND" {
                AppError::new("RESOLVE_POLICY_NOT_FOUND", "Unknown escalation policy")
                    .with_details(format!("policy_id={policy_id}"))
            } else {
                e
            }
        })?;
        Ok(services_from_policy(resp.escalation_policy))
    }

    fn list_incidents_page(
        &self,
        service_ids: &[String],
        window: &TimeWindow,
        offset: u32,
        limit: u32,
    ) -> Result<IncidentPage, AppError> {
        let query = incident_list_query(service_ids, window, offset, limit)?;
        let resp: IncidentListResponse = self.get_json("/incidents", &query)?;
        Ok(IncidentPage {
            incidents: resp.incidents,
            more: resp.more,
        })
    }

    fn count_incidents(&self, service_id: &str, window: &TimeWindow) -> Result<u64, AppError> {
        let mut query = vec![("service_ids[]".to_string(), service_id.to_string())];
        query.extend(window_params(window)?);
        query.push(("total".to_string(), "true".to_string()));
        query.push(("limit".to_string(), "1".to_string()));

        let resp: IncidentListResponse = self.get_json("/incidents", &query)?;
        resp.total.ok_or_else(|| {
            AppError::new("PROVIDER_DECODE_FAILED", "Incident count missing from response")
                .with_details(format!("service_id={service_id}"))
        })
    }

    fn list_notes(&self, incident_id: &str) -> Result<Vec<RawNote>, AppError> {
        let path = format!("/incidents/{incident_id}/notes");
        let resp: NotesResponse = self.get_json(&path, &[])?;
        Ok(resp.notes)
    }

    fn list_log_entries(&self, incident_id: &str) -> Result<Vec<RawLogEntry>, AppError> {
        let path = format!("/incidents/{incident_id}/log_entries");
        let mut entries = Vec::new();
        let mut offset: u32 = 0;
        loop {
            let query = vec![
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), LOG_ENTRY_PAGE_LIMIT.to_string()),
            ];
            let resp: LogEntriesResponse = self.get_json(&path, &query)?;
            let received = resp.log_entries.len();
            entries.extend(resp.log_entries);
            if !resp.more || received == 0 {
                break;
            }
            offset = offset.saturating_add(u32::try_from(received).unwrap_or(u32::MAX));
        }
        Ok(entries)
    }
}
