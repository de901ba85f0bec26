#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use prr_core::domain::{
    Incident, RawIncident, RawLogEntry, RawNote, Service, ServiceReference, TimeWindow,
    UserReference,
};
use prr_core::error::AppError;
use prr_core::source::{IncidentPage, IncidentSource};
use time::OffsetDateTime;

/// In-memory provider. Incident listing enforces a maximum number of service ids per
/// request and pages at `page_size`.
pub struct FakeSource {
    pub policies: HashMap<String, Vec<Service>>,
    pub incidents: Vec<RawIncident>,
    pub notes: HashMap<String, Vec<RawNote>>,
    pub log_entries: HashMap<String, Vec<RawLogEntry>>,
    pub max_ids_per_request: usize,
    pub page_size: u32,
    pub fail_with: Option<AppError>,
    pub list_calls: RefCell<Vec<Vec<String>>>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            policies: HashMap::new(),
            incidents: Vec::new(),
            notes: HashMap::new(),
            log_entries: HashMap::new(),
            max_ids_per_request: usize::MAX,
            page_size: u32::MAX,
            fail_with: None,
            list_calls: RefCell::new(Vec::new()),
        }
    }
}

fn service_id(raw: &RawIncident) -> Option<&str> {
    raw.service.as_ref().and_then(|s| s.id.as_deref())
}

impl IncidentSource for FakeSource {
    fn escalation_policy_services(&self, policy_id: &str) -> Result<Vec<Service>, AppError> {
        self.policies.get(policy_id).cloned().ok_or_else(|| {
            AppError::new("RESOLVE_POLICY_NOT_FOUND", "Unknown escalation policy")
                .with_details(format!("policy_id={policy_id}"))
        })
    }

    fn list_incidents_page(
        &self,
        service_ids: &[String],
        _window: &TimeWindow,
        offset: u32,
        limit: u32,
    ) -> Result<IncidentPage, AppError> {
        self.list_calls.borrow_mut().push(service_ids.to_vec());
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        if service_ids.len() > self.max_ids_per_request {
            return Err(AppError::request_too_large(format!(
                "ids={}",
                service_ids.len()
            )));
        }

        let matching: Vec<RawIncident> = self
            .incidents
            .iter()
            .filter(|r| service_id(r).is_some_and(|id| service_ids.iter().any(|s| s == id)))
            .cloned()
            .collect();
        let start = (offset as usize).min(matching.len());
        let end = start
            .saturating_add(limit.min(self.page_size) as usize)
            .min(matching.len());
        Ok(IncidentPage {
            incidents: matching[start..end].to_vec(),
            more: end < matching.len(),
        })
    }

    fn count_incidents(
        &self,
        service_id_filter: &str,
        _window: &TimeWindow,
    ) -> Result<u64, AppError> {
        Ok(self
            .incidents
            .iter()
            .filter(|r| service_id(r) == Some(service_id_filter))
            .count() as u64)
    }

    fn list_notes(&self, incident_id: &str) -> Result<Vec<RawNote>, AppError> {
        Ok(self.notes.get(incident_id).cloned().unwrap_or_default())
    }

    fn list_log_entries(&self, incident_id: &str) -> Result<Vec<RawLogEntry>, AppError> {
        Ok(self.log_entries.get(incident_id).cloned().unwrap_or_default())
    }
}

pub fn raw_incident(id: &str, service: &str, title: &str, created_at: &str) -> RawIncident {
    RawIncident {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        created_at: Some(created_at.to_string()),
        html_url: Some(format!("https://acme.pagerduty.com/incidents/{id}")),
        service: Some(ServiceReference {
            id: Some(service.to_string()),
            summary: Some(format!("{service} service")),
            name: None,
        }),
        ..RawIncident::default()
    }
}

pub fn note(author: &str, content: &str) -> RawNote {
    RawNote {
        user: Some(UserReference {
            summary: Some(author.to_string()),
            name: None,
            email: None,
        }),
        content: Some(content.to_string()),
    }
}

pub fn incident(service: &str, description: Option<&str>, created_on: OffsetDateTime) -> Incident {
    Incident {
        id: None,
        service: service.to_string(),
        url: Some("https://acme.pagerduty.com/incidents/X".to_string()),
        description: description.map(str::to_string),
        created_on: Some(created_on),
        notes: Vec::new(),
        extras: None,
    }
}

pub fn with_notes(mut incident: Incident, notes: &[&str]) -> Incident {
    incident.notes = notes.iter().map(|n| n.to_string()).collect();
    incident
}

pub fn services(ids: &[&str]) -> Vec<Service> {
    ids.iter().map(|id| Service::new(*id, format!("{id} service"))).collect()
}
