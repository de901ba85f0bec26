use prr_core::domain::{TimeWindow, ValidationWarning};
use prr_core::error::AppError;
use prr_core::fetch::{count_incidents_per_service, fetch_incidents};
use prr_core::grouping::{group_incidents, GroupBy};
use prr_core::normalize::{normalize_incidents, LocalZone, NormalizeOptions};
use prr_core::report::{render_report, OutputFormat, RenderOptions};
use prr_core::resolve::{resolve_services, unique_services};
use prr_core::source::IncidentSource;
use prr_core::tags::TagClassifier;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Everything one pull-and-report cycle needs besides the provider and the zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub window: TimeWindow,
    pub group_by: GroupBy,
    pub render: RenderOptions,
    pub include_stats: bool,
    pub legacy_tags: bool,
    pub extended: bool,
    pub service_counts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutput {
    pub text: String,
    pub incident_count: usize,
    pub warnings: Vec<ValidationWarning>,
}

fn parse_cli_time(flag: &str, raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|e| {
        AppError::new("CLI_WINDOW_INVALID", format!("{flag} must be an RFC3339 timestamp"))
            .with_details(format!("value={raw}; err={e}"))
    })
}

/// Build the fetch window from `--since`/`--until`, falling back to `days` before
/// `until` (or `now`).
pub fn resolve_window(
    now: OffsetDateTime,
    days: u32,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<TimeWindow, AppError> {
    let until = until.map(|u| parse_cli_time("--until", u)).transpose()?;
    let window = match since {
        Some(s) => TimeWindow::between(parse_cli_time("--since", s)?, until),
        None => {
            let base = TimeWindow::last_days(until.unwrap_or(now), days);
            TimeWindow::between(base.since, until)
        }
    };
    if let Some(until) = window.until {
        if until < window.since {
            return Err(
                AppError::new("CLI_WINDOW_INVALID", "--until must not precede --since")
                    .with_details(format!("since={}; until={until}", window.since)),
            );
        }
    }
    Ok(window)
}

/// Resolve, fetch, normalize, classify, group and render.
///
/// Fatal errors abort before any text is produced. Normalization gaps are logged and
/// returned alongside the report.
pub fn run_report<S: IncidentSource + ?Sized>(
    source: &S,
    policy_ids: &[String],
    request: &ReportRequest,
    zone: LocalZone,
) -> Result<ReportOutput, AppError> {
    let services = resolve_services(source, policy_ids)?;
    tracing::info!(
        policies = policy_ids.len(),
        services = services.len(),
        "resolved services"
    );

    let raws = fetch_incidents(source, &services, &request.window)?;
    tracing::info!(incidents = raws.len(), "fetched incidents");

    let options = NormalizeOptions {
        zone,
        extended: request.extended || request.render.format == OutputFormat::Tsv,
    };
    let (incidents, warnings) = normalize_incidents(source, &raws, &options)?;
    for w in &warnings {
        tracing::warn!(
            code = %w.code,
            details = w.details.as_deref().unwrap_or(""),
            "{}",
            w.message
        );
    }

    let stats = request.include_stats.then(|| {
        let classifier = if request.legacy_tags {
            TagClassifier::legacy()
        } else {
            TagClassifier::standard()
        };
        classifier.tally(&incidents)
    });

    let counts = if request.service_counts {
        Some(count_incidents_per_service(
            source,
            &unique_services(&services),
            &request.window,
        )?)
    } else {
        None
    };

    let incident_count = incidents.len();
    let grouped = group_incidents(incidents, request.group_by);
    let text = render_report(&grouped, stats.as_ref(), counts.as_deref(), &request.render)?;

    Ok(ReportOutput {
        text,
        incident_count,
        warnings,
    })
}
