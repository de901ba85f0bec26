use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pagerreport_lib::{resolve_window, run_report, ReportRequest};
use prr_core::config::Settings;
use prr_core::error::AppError;
use prr_core::grouping::GroupBy;
use prr_core::normalize::LocalZone;
use prr_core::report::{OutputFormat, RenderOptions};
use prr_pagerduty::PagerDutyClient;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Csv,
    Tsv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Pretty => OutputFormat::Pretty,
            Format::Csv => OutputFormat::Csv,
            Format::Tsv => OutputFormat::Tsv,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "pagerreport",
    about = "Pull recent PagerDuty incidents and print grouped, tagged reports"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "pagerreport.toml")]
    config: PathBuf,

    /// Do not print each incident when grouping.
    #[arg(long)]
    silent: bool,

    /// Group incidents by description.
    #[arg(long, conflicts_with = "group_by_service")]
    group_by_description: bool,

    /// Group incidents by service.
    #[arg(long)]
    group_by_service: bool,

    /// Include tag statistics.
    #[arg(long)]
    include_stats: bool,

    /// Include the raw incident log as a Markdown block.
    #[arg(long)]
    include_incidents_as_blockquote: bool,

    /// Time window in days (defaults to the configured value).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Explicit window start (RFC3339); overrides --days.
    #[arg(long)]
    since: Option<String>,

    /// Explicit window end (RFC3339).
    #[arg(long)]
    until: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Pretty)]
    format: Format,

    /// Fetch log entries for urgency, minutes open and snooze counts.
    #[arg(long)]
    extended: bool,

    /// Count only #a / #na, first match wins.
    #[arg(long)]
    legacy_tags: bool,

    /// Print a per-service incident count table.
    #[arg(long)]
    service_counts: bool,

    /// Debug logging on stderr (RUST_LOG overrides).
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn detect_zone(now: OffsetDateTime) -> LocalZone {
    if LocalZone::system_available(now) {
        LocalZone::System
    } else {
        tracing::warn!("local UTC offset could not be determined; displaying times in UTC");
        LocalZone::Fixed(UtcOffset::UTC)
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::load(&cli.config)?;
    let client = PagerDutyClient::new(
        &settings.base_url,
        &settings.api_token,
        Duration::from_secs(settings.timeout_secs),
    )?;

    let now = OffsetDateTime::now_utc();
    let zone = detect_zone(now);
    let window = resolve_window(
        now,
        cli.days.unwrap_or(settings.default_days),
        cli.since.as_deref(),
        cli.until.as_deref(),
    )?;

    let group_by = if cli.group_by_service {
        GroupBy::Service
    } else if cli.group_by_description {
        GroupBy::Description
    } else {
        GroupBy::None
    };

    let format = OutputFormat::from(cli.format);
    if cli.include_incidents_as_blockquote && format != OutputFormat::Pretty {
        tracing::warn!("--include-incidents-as-blockquote only applies to pretty output");
    }

    let request = ReportRequest {
        window,
        group_by,
        render: RenderOptions {
            format,
            silent: cli.silent,
            blockquote: cli.include_incidents_as_blockquote,
        },
        include_stats: cli.include_stats,
        legacy_tags: cli.legacy_tags,
        extended: cli.extended,
        service_counts: cli.service_counts,
    };

    let output = run_report(&client, &settings.escalation_policies, &request, zone)?;
    tracing::info!(
        incidents = output.incident_count,
        warnings = output.warnings.len(),
        "report complete"
    );
    print!("{}", output.text);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code, "run aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
