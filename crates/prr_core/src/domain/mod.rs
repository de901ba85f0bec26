use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// A monitored service, as listed by an escalation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Creation-time window an incident must fall in to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: OffsetDateTime,
    pub until: Option<OffsetDateTime>,
}

impl TimeWindow {
    pub fn between(since: OffsetDateTime, until: Option<OffsetDateTime>) -> Self {
        Self { since, until }
    }

    /// Window covering the `days` days before `now`, open-ended at the top.
    pub fn last_days(now: OffsetDateTime, days: u32) -> Self {
        Self {
            since: now - Duration::days(i64::from(days)),
            until: None,
        }
    }
}

/// Service reference embedded in a provider incident. v2 uses `summary`, v1 uses `name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceReference {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerSummaryData {
    pub subject: Option<String>,
    pub description: Option<String>,
}

/// Incident as returned by the provider. Every field is optional because the shape
/// differs between API versions; field aliases accept the v1 spellings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawIncident {
    pub id: Option<String>,
    pub incident_number: Option<i64>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub incident_key: Option<String>,
    pub trigger_summary_data: Option<TriggerSummaryData>,
    #[serde(alias = "created_on")]
    pub created_at: Option<String>,
    pub html_url: Option<String>,
    pub service: Option<ServiceReference>,
    pub urgency: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "last_status_change_on")]
    pub last_status_change_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserReference {
    pub summary: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Free-text annotation attached to an incident by a responder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawNote {
    pub user: Option<UserReference>,
    pub content: Option<String>,
}

impl RawNote {
    pub fn author(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| {
                u.summary
                    .as_deref()
                    .or(u.name.as_deref())
                    .or(u.email.as_deref())
            })
            .unwrap_or("UNKNOWN")
    }

    /// `"<author>: <body>"`, the form tags are matched against.
    pub fn render(&self) -> String {
        format!("{}: {}", self.author(), self.content.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLogEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub created_at: Option<String>,
}

impl RawLogEntry {
    pub fn is_snooze(&self) -> bool {
        let kind = self.kind.strip_suffix("_log_entry").unwrap_or(&self.kind);
        kind == "snooze"
    }
}

/// Fields only filled in when extended output is requested; they cost one extra
/// provider call per incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentExtras {
    pub urgency: Option<String>,
    pub incident_number: Option<i64>,
    /// `None` while the incident is unresolved.
    pub minutes_open: Option<i64>,
    pub num_snoozes: usize,
}

/// Canonical incident record used by classification, grouping and rendering.
///
/// Notes:
/// - `description` stays `None` when no field of the fallback chain is present; the gap is
///   surfaced as a warning and the incident is still reported.
/// - `created_on` is already shifted into the local zone. It is `None` when the provider
///   sent no usable creation time; such incidents sort last and render as `UNKNOWN`.
/// - `notes` keep provider order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    pub id: Option<String>,
    pub service: String,
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_on: Option<OffsetDateTime>,
    pub notes: Vec<String>,
    pub extras: Option<IncidentExtras>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
