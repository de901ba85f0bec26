use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::formatting::Formattable;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::domain::Incident;
use crate::error::AppError;
use crate::fetch::ServiceIncidentCount;
use crate::grouping::GroupedIncidents;
use crate::tags::TagStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Csv,
    Tsv,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Grouped pretty output prints only group headers.
    pub silent: bool,
    /// Wrap the pretty incident log in a Markdown code block.
    pub blockquote: bool,
}

pub const TSV_COLUMNS: [&str; 9] = [
    "date",
    "hour",
    "incident_number",
    "service",
    "urgency",
    "url",
    "description",
    "minutes_open",
    "num_snoozes",
];

const UNKNOWN: &str = "UNKNOWN";

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::new("REPORT_RENDER_FAILED", "Failed to render report").with_details(e.to_string())
}

fn format_pretty_time(dt: Option<OffsetDateTime>) -> Result<String, AppError> {
    let fmt = format_description!(
        "[weekday], [month repr:long] [day padding:none] - [hour repr:12 padding:none]:[minute] [period]"
    );
    match dt {
        Some(dt) => dt.format(&fmt).map_err(render_error),
        None => Ok(UNKNOWN.to_string()),
    }
}

/// Format an optional time for a delimited cell; a missing time is an empty cell.
fn format_cell(
    dt: Option<OffsetDateTime>,
    fmt: &(impl Formattable + ?Sized),
) -> Result<String, AppError> {
    dt.map(|dt| dt.format(fmt).map_err(render_error))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn pretty_block(incident: &Incident) -> Result<String, AppError> {
    let mut out = String::new();
    out.push_str(&format!("Time: {}\n", format_pretty_time(incident.created_on)?));
    out.push_str(&format!("Service: {}\n", incident.service));
    out.push_str(&format!(
        "Description: {}\n",
        incident.description.as_deref().unwrap_or(UNKNOWN)
    ));
    out.push_str(&format!("URL: {}\n", incident.url.as_deref().unwrap_or(UNKNOWN)));
    out.push_str("Notes:\n");
    for note in &incident.notes {
        out.push_str(note);
        out.push('\n');
    }
    out.push('\n');
    Ok(out)
}

fn group_header(key: Option<&str>, count: usize) -> String {
    format!("########### {count}: {} ##########\n\n", key.unwrap_or(UNKNOWN))
}

fn render_pretty(grouped: &GroupedIncidents, options: &RenderOptions) -> Result<String, AppError> {
    let mut out = String::new();
    if options.blockquote {
        out.push_str("# Raw incident log\n```\n\n");
    }
    match grouped {
        GroupedIncidents::Flat(incidents) => {
            for incident in incidents {
                out.push_str(&pretty_block(incident)?);
            }
        }
        GroupedIncidents::Groups(groups) => {
            for group in groups {
                out.push_str(&group_header(group.key.as_deref(), group.incidents.len()));
                if options.silent {
                    continue;
                }
                for incident in &group.incidents {
                    out.push_str(&pretty_block(incident)?);
                }
            }
        }
    }
    out.push_str(&format!("Total Pages: {}\n", grouped.len()));
    if options.blockquote {
        out.push_str("```\n");
    }
    Ok(out)
}

fn finish_writer(wtr: csv::Writer<Vec<u8>>) -> Result<String, AppError> {
    let bytes = wtr.into_inner().map_err(render_error)?;
    String::from_utf8(bytes).map_err(render_error)
}

/// One row per incident: local RFC3339 time, service, description, url, notes.
fn render_csv(grouped: &GroupedIncidents) -> Result<String, AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    for incident in grouped.iter() {
        let created = format_cell(incident.created_on, &Rfc3339)?;
        wtr.write_record([
            created.as_str(),
            incident.service.as_str(),
            incident.description.as_deref().unwrap_or(""),
            incident.url.as_deref().unwrap_or(""),
            incident.notes.join(" | ").as_str(),
        ])
        .map_err(render_error)?;
    }
    finish_writer(wtr)
}

fn render_tsv(grouped: &GroupedIncidents) -> Result<String, AppError> {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let hour_fmt = format_description!("[hour]");

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    wtr.write_record(TSV_COLUMNS).map_err(render_error)?;
    for incident in grouped.iter() {
        let extras = incident.extras.as_ref();
        let opt_num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        wtr.write_record([
            format_cell(incident.created_on, date_fmt)?,
            format_cell(incident.created_on, hour_fmt)?,
            opt_num(extras.and_then(|e| e.incident_number)),
            incident.service.clone(),
            extras.and_then(|e| e.urgency.clone()).unwrap_or_default(),
            incident.url.clone().unwrap_or_default(),
            incident.description.clone().unwrap_or_default(),
            opt_num(extras.and_then(|e| e.minutes_open)),
            extras.map(|e| e.num_snoozes.to_string()).unwrap_or_default(),
        ])
        .map_err(render_error)?;
    }
    finish_writer(wtr)
}

/// Markdown statistics table: total, one row per tag, then untagged.
pub fn render_stats(stats: &TagStats) -> String {
    let mut rows: Vec<(String, usize)> = vec![("Total".to_string(), stats.total)];
    for tag in &stats.tags {
        rows.push((format!("{} ({})", tag.label, tag.marker), tag.count));
    }
    rows.push(("Not Tagged".to_string(), stats.not_tagged));

    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Incidents".len());

    let mut out = String::new();
    out.push_str("# Statistics\n");
    out.push_str(&format!("| {:<width$} | Number |\n", "Incidents"));
    out.push_str(&format!("| {} | ------ |\n", "-".repeat(width)));
    for (label, count) in rows {
        out.push_str(&format!("| {label:<width$} | {count:>6} |\n"));
    }
    out.push('\n');
    out
}

pub fn render_service_counts(counts: &[ServiceIncidentCount]) -> String {
    let mut out = String::new();
    out.push_str("# Incidents per service\n");
    out.push_str("| Service | Incidents |\n");
    out.push_str("|---|---:|\n");
    for c in counts {
        out.push_str(&format!("| {} | {} |\n", c.service.name, c.count));
    }
    out.push('\n');
    out
}

/// Render the incident log in the requested format.
pub fn render_incidents(
    grouped: &GroupedIncidents,
    options: &RenderOptions,
) -> Result<String, AppError> {
    match options.format {
        OutputFormat::Pretty => render_pretty(grouped, options),
        OutputFormat::Csv => render_csv(grouped),
        OutputFormat::Tsv => render_tsv(grouped),
    }
}

/// Full report: optional statistics and service counts, then the incident log.
pub fn render_report(
    grouped: &GroupedIncidents,
    stats: Option<&TagStats>,
    service_counts: Option<&[ServiceIncidentCount]>,
    options: &RenderOptions,
) -> Result<String, AppError> {
    let mut out = String::new();
    if let Some(stats) = stats {
        out.push_str(&render_stats(stats));
    }
    if let Some(counts) = service_counts {
        out.push_str(&render_service_counts(counts));
    }
    out.push_str(&render_incidents(grouped, options)?);
    Ok(out)
}
