use time::OffsetDateTime;

use crate::domain::{
    Incident, IncidentExtras, RawIncident, RawLogEntry, RawNote, ValidationWarning,
};
use crate::error::AppError;
use crate::normalize::timestamps::{minutes_between_rounded, parse_provider_timestamp, LocalZone};
use crate::source::IncidentSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub zone: LocalZone,
    /// Fetch log entries and fill [`IncidentExtras`].
    pub extended: bool,
}

type DescriptionField = fn(&RawIncident) -> Option<&str>;

fn title(raw: &RawIncident) -> Option<&str> {
    raw.title.as_deref()
}

fn summary(raw: &RawIncident) -> Option<&str> {
    raw.summary.as_deref()
}

fn trigger_subject(raw: &RawIncident) -> Option<&str> {
    raw.trigger_summary_data.as_ref()?.subject.as_deref()
}

fn trigger_description(raw: &RawIncident) -> Option<&str> {
    raw.trigger_summary_data.as_ref()?.description.as_deref()
}

fn incident_key(raw: &RawIncident) -> Option<&str> {
    raw.incident_key.as_deref()
}

fn provider_id(raw: &RawIncident) -> Option<&str> {
    raw.id.as_deref()
}

/// Priority order for picking a description; the first present field wins.
const DESCRIPTION_FIELDS: [DescriptionField; 6] = [
    title,
    summary,
    trigger_subject,
    trigger_description,
    incident_key,
    provider_id,
];

/// Human description of a raw incident, or `None` if no candidate field is present.
pub fn describe(raw: &RawIncident) -> Option<String> {
    DESCRIPTION_FIELDS
        .iter()
        .find_map(|field| field(raw))
        .map(str::to_string)
}

fn service_name(raw: &RawIncident, warnings: &mut Vec<ValidationWarning>) -> String {
    let reference = raw.service.as_ref();
    let name = reference.and_then(|s| s.summary.as_deref().or(s.name.as_deref()));
    if let Some(name) = name {
        return name.to_string();
    }
    let fallback = reference
        .and_then(|s| s.id.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    warnings.push(
        ValidationWarning::new("NORMALIZE_SERVICE_MISSING", "Incident has no service name")
            .with_details(format!(
                "incident={}; using={fallback}",
                raw.id.as_deref().unwrap_or("UNKNOWN")
            )),
    );
    fallback
}

fn minutes_open(
    raw: &RawIncident,
    created: Option<OffsetDateTime>,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<i64> {
    if raw.status.as_deref() != Some("resolved") {
        return None;
    }
    // Missing creation time was already reported.
    let created = created?;
    let id = raw.id.as_deref().unwrap_or("UNKNOWN");
    let Some(changed) = raw
        .last_status_change_at
        .as_deref()
        .and_then(|s| parse_provider_timestamp("last_status_change_at", s, warnings))
    else {
        warnings.push(
            ValidationWarning::new(
                "NORMALIZE_RESOLVED_WITHOUT_STATUS_CHANGE",
                "Resolved incident has no usable status-change time",
            )
            .with_details(format!("incident={id}")),
        );
        return None;
    };
    let minutes = minutes_between_rounded(created, changed);
    if minutes.is_none() {
        warnings.push(
            ValidationWarning::new(
                "NORMALIZE_TS_ORDER_VIOLATION",
                "Status change precedes creation; minutes open left unset",
            )
            .with_details(format!("incident={id}; created={created}; changed={changed}")),
        );
    }
    minutes
}

/// Normalize a raw incident whose notes (and, in extended mode, log entries) are already
/// in hand. Pure: no provider calls. Never fails; every gap becomes a warning.
pub fn normalize_with_annotations(
    raw: &RawIncident,
    notes: &[RawNote],
    log_entries: Option<&[RawLogEntry]>,
    zone: LocalZone,
) -> (Incident, Vec<ValidationWarning>) {
    let mut warnings = Vec::new();

    let service = service_name(raw, &mut warnings);

    let description = describe(raw);
    if description.is_none() {
        warnings.push(
            ValidationWarning::new(
                "NORMALIZE_DESCRIPTION_MISSING",
                "No description field found on incident",
            )
            .with_details(format!(
                "service={service}; url={}",
                raw.html_url.as_deref().unwrap_or("UNKNOWN")
            )),
        );
    }

    if raw.html_url.is_none() {
        warnings.push(
            ValidationWarning::new("NORMALIZE_URL_MISSING", "Incident has no URL")
                .with_details(format!("service={service}")),
        );
    }

    let created_raw = raw.created_at.as_deref().unwrap_or("");
    let created = parse_provider_timestamp("created_at", created_raw, &mut warnings);
    if created.is_none() {
        warnings.push(
            ValidationWarning::new(
                "NORMALIZE_CREATED_AT_MISSING",
                "Incident creation time is missing or unparseable",
            )
            .with_details(format!(
                "incident={}; service={service}; value={created_raw}",
                raw.id.as_deref().unwrap_or("UNKNOWN")
            )),
        );
    }

    let extras = log_entries.map(|entries| IncidentExtras {
        urgency: raw.urgency.clone(),
        incident_number: raw.incident_number,
        minutes_open: minutes_open(raw, created, &mut warnings),
        num_snoozes: entries.iter().filter(|e| e.is_snooze()).count(),
    });

    let created_on = created.map(|instant| zone.to_local(instant, &mut warnings));

    (
        Incident {
            id: raw.id.clone(),
            service,
            url: raw.html_url.clone(),
            description,
            created_on,
            notes: notes.iter().map(RawNote::render).collect(),
            extras,
        },
        warnings,
    )
}

/// Normalize one raw incident, fetching its notes (and log entries when extended).
pub fn normalize_incident<S: IncidentSource + ?Sized>(
    source: &S,
    raw: &RawIncident,
    options: &NormalizeOptions,
) -> Result<(Incident, Vec<ValidationWarning>), AppError> {
    let mut warnings = Vec::new();

    let (notes, log_entries) = match raw.id.as_deref() {
        Some(id) => {
            let notes = source.list_notes(id)?;
            let log_entries = if options.extended {
                Some(source.list_log_entries(id)?)
            } else {
                None
            };
            (notes, log_entries)
        }
        None => {
            warnings.push(ValidationWarning::new(
                "NORMALIZE_NOTES_SKIPPED",
                "Incident has no id; notes and log entries were not fetched",
            ));
            (Vec::new(), options.extended.then(Vec::new))
        }
    };

    let (incident, more) =
        normalize_with_annotations(raw, &notes, log_entries.as_deref(), options.zone);
    warnings.extend(more);
    Ok((incident, warnings))
}

/// Normalize a fetched batch, keeping input order. Every incident is retained.
pub fn normalize_incidents<S: IncidentSource + ?Sized>(
    source: &S,
    raws: &[RawIncident],
    options: &NormalizeOptions,
) -> Result<(Vec<Incident>, Vec<ValidationWarning>), AppError> {
    let mut incidents = Vec::with_capacity(raws.len());
    let mut warnings = Vec::new();
    for raw in raws {
        let (incident, w) = normalize_incident(source, raw, options)?;
        incidents.push(incident);
        warnings.extend(w);
    }
    Ok((incidents, warnings))
}
