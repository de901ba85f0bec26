use std::cell::Cell;

use pagerreport_lib::{resolve_window, run_report, ReportRequest};
use pretty_assertions::assert_eq;
use prr_core::domain::{
    RawIncident, RawLogEntry, RawNote, Service, ServiceReference, TimeWindow, UserReference,
};
use prr_core::error::AppError;
use prr_core::grouping::GroupBy;
use prr_core::normalize::LocalZone;
use prr_core::report::{OutputFormat, RenderOptions};
use prr_core::source::{IncidentPage, IncidentSource};
use time::macros::{datetime, offset};

/// Two policies sharing a service; listing rejects more than two ids at once.
struct MockPagerDuty {
    list_calls: Cell<usize>,
    count_calls: Cell<usize>,
}

impl MockPagerDuty {
    fn new() -> Self {
        Self {
            list_calls: Cell::new(0),
            count_calls: Cell::new(0),
        }
    }

    fn all_incidents() -> Vec<RawIncident> {
        [
            ("Q1", "S1", Some("Disk full"), "2026-01-03T10:00:00Z"),
            ("Q2", "S2", Some("CPU high"), "2026-01-01T10:00:00Z"),
            ("Q3", "S3", Some("Disk full"), "2026-01-02T10:00:00Z"),
            ("Q4", "S1", None, "2026-01-04T10:00:00Z"),
        ]
        .into_iter()
        .map(|(id, svc, title, created)| RawIncident {
            id: Some(id.to_string()),
            title: title.map(str::to_string),
            created_at: Some(created.to_string()),
            html_url: Some(format!("https://acme.pagerduty.com/incidents/{id}")),
            service: Some(ServiceReference {
                id: Some(svc.to_string()),
                summary: Some(format!("Service {svc}")),
                name: None,
            }),
            status: Some("resolved".to_string()),
            last_status_change_at: Some("2026-01-05T00:00:00Z".to_string()),
            ..RawIncident::default()
        })
        .collect()
    }
}

impl IncidentSource for MockPagerDuty {
    fn escalation_policy_services(&self, policy_id: &str) -> Result<Vec<Service>, AppError> {
        match policy_id {
            "EP1" => Ok(vec![Service::new("S1", "Service S1"), Service::new("S2", "Service S2")]),
            "EP2" => Ok(vec![Service::new("S2", "Service S2"), Service::new("S3", "Service S3")]),
            _ => Err(AppError::new("RESOLVE_POLICY_NOT_FOUND", "Unknown escalation policy")),
        }
    }

    fn list_incidents_page(
        &self,
        service_ids: &[String],
        _window: &TimeWindow,
        _offset: u32,
        _limit: u32,
    ) -> Result<IncidentPage, AppError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if service_ids.len() > 2 {
            return Err(AppError::request_too_large("status=414"));
        }
        let incidents = Self::all_incidents()
            .into_iter()
            .filter(|r| {
                let id = r.service.as_ref().and_then(|s| s.id.clone()).unwrap_or_default();
                service_ids.contains(&id)
            })
            .collect();
        Ok(IncidentPage {
            incidents,
            more: false,
        })
    }

    fn count_incidents(&self, service_id: &str, _window: &TimeWindow) -> Result<u64, AppError> {
        self.count_calls.set(self.count_calls.get() + 1);
        Ok(Self::all_incidents()
            .iter()
            .filter(|r| r.service.as_ref().and_then(|s| s.id.as_deref()) == Some(service_id))
            .count() as u64)
    }

    fn list_notes(&self, incident_id: &str) -> Result<Vec<RawNote>, AppError> {
        let body = match incident_id {
            "Q1" => "#a cleaned up",
            "Q3" => "#na disk alarm is noisy",
            _ => return Ok(Vec::new()),
        };
        Ok(vec![RawNote {
            user: Some(UserReference {
                summary: Some("Ada".to_string()),
                name: None,
                email: None,
            }),
            content: Some(body.to_string()),
        }])
    }

    fn list_log_entries(&self, incident_id: &str) -> Result<Vec<RawLogEntry>, AppError> {
        if incident_id == "Q2" {
            return Ok(vec![RawLogEntry {
                kind: "snooze_log_entry".to_string(),
                created_at: None,
            }]);
        }
        Ok(Vec::new())
    }
}

fn request(group_by: GroupBy, format: OutputFormat) -> ReportRequest {
    ReportRequest {
        window: TimeWindow::last_days(datetime!(2026-01-08 00:00:00 UTC), 7),
        group_by,
        render: RenderOptions {
            format,
            silent: false,
            blockquote: false,
        },
        include_stats: false,
        legacy_tags: false,
        extended: false,
        service_counts: false,
    }
}

fn policies() -> Vec<String> {
    vec!["EP1".to_string(), "EP2".to_string()]
}

const UTC: LocalZone = LocalZone::Fixed(time::UtcOffset::UTC);

#[test]
fn grouped_report_with_stats_end_to_end() {
    let source = MockPagerDuty::new();
    let mut req = request(GroupBy::Description, OutputFormat::Pretty);
    req.include_stats = true;
    req.legacy_tags = true;

    let out = run_report(&source, &policies(), &req, UTC).expect("report");
    assert_eq!(out.incident_count, 4);
    // S1, S2, S3 after de-duplication: one rejected call, then two halves.
    assert_eq!(source.list_calls.get(), 3);

    let text = &out.text;
    assert!(text.contains("| Total                |      4 |"));
    assert!(text.contains("| Actionable (#a)      |      1 |"));
    assert!(text.contains("| Non Actionable (#na) |      1 |"));
    assert!(text.contains("| Not Tagged           |      2 |"));
    assert!(text.contains("########### 2: Disk full ##########"));
    assert!(text.find("2: Disk full") < text.find("1: CPU high"));
    // Q4 has no title; the provider id is the last fallback.
    assert!(text.contains("########### 1: Q4 ##########"));
    assert!(text.ends_with("Total Pages: 4\n"));
    assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
}

#[test]
fn tsv_report_implies_extended_fields() {
    let source = MockPagerDuty::new();
    let out = run_report(
        &source,
        &policies(),
        &request(GroupBy::None, OutputFormat::Tsv),
        LocalZone::Fixed(offset!(+1)),
    )
    .expect("report");

    let lines: Vec<&str> = out.text.lines().collect();
    assert_eq!(
        lines[0],
        "date\thour\tincident_number\tservice\turgency\turl\tdescription\tminutes_open\tnum_snoozes"
    );
    // Sorted by creation: Q2, Q3, Q1, Q4; hours shown in the +01:00 zone.
    let q2: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(q2[0], "2026-01-01");
    assert_eq!(q2[1], "11");
    assert_eq!(q2[3], "Service S2");
    assert_eq!(q2[7], (4 * 24 * 60 - 10 * 60).to_string());
    assert_eq!(q2[8], "1");
    assert_eq!(lines.len(), 5);
}

#[test]
fn service_counts_use_unique_services() {
    let source = MockPagerDuty::new();
    let mut req = request(GroupBy::Service, OutputFormat::Csv);
    req.service_counts = true;
    let out = run_report(&source, &policies(), &req, UTC).expect("report");
    assert_eq!(source.count_calls.get(), 3);
    assert!(out.text.contains("| Service S1 | 2 |"));
    // Table, blank line, then one CSV row per incident.
    let csv_rows = out.text.lines().filter(|l| l.starts_with('"')).count();
    assert_eq!(csv_rows, 4);
}

#[test]
fn unknown_policy_produces_no_report() {
    let source = MockPagerDuty::new();
    let err = run_report(
        &source,
        &["EP1".to_string(), "EP404".to_string()],
        &request(GroupBy::None, OutputFormat::Pretty),
        UTC,
    )
    .unwrap_err();
    assert_eq!(err.code, "RESOLVE_POLICY_NOT_FOUND");
    assert_eq!(source.list_calls.get(), 0);
}

#[test]
fn window_from_days_or_explicit_bounds() {
    let now = datetime!(2026-01-08 12:00:00 UTC);
    assert_eq!(
        resolve_window(now, 7, None, None).expect("window"),
        TimeWindow::between(datetime!(2026-01-01 12:00:00 UTC), None)
    );
    assert_eq!(
        resolve_window(now, 2, None, Some("2026-01-05T00:00:00Z")).expect("window"),
        TimeWindow::between(
            datetime!(2026-01-03 00:00:00 UTC),
            Some(datetime!(2026-01-05 00:00:00 UTC))
        )
    );
    assert_eq!(
        resolve_window(now, 7, Some("2026-01-06T00:00:00+02:00"), None).expect("window"),
        TimeWindow::between(datetime!(2026-01-05 22:00:00 UTC), None)
    );

    let err = resolve_window(now, 7, Some("2026-01-06T00:00:00Z"), Some("2026-01-05T00:00:00Z"))
        .unwrap_err();
    assert_eq!(err.code, "CLI_WINDOW_INVALID");
    assert_eq!(
        resolve_window(now, 7, Some("last week"), None).unwrap_err().code,
        "CLI_WINDOW_INVALID"
    );
}
