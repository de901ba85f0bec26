use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::domain::ValidationWarning;

/// Zone incident times are displayed in. Passed explicitly so conversion never reads
/// ambient state mid-pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    /// Host zone rules, evaluated at each incident's own instant.
    System,
    Fixed(UtcOffset),
}

impl LocalZone {
    /// Offset in force at `instant`, or `None` if the host offset cannot be read.
    pub fn offset_at(&self, instant: OffsetDateTime) -> Option<UtcOffset> {
        match self {
            LocalZone::Fixed(offset) => Some(*offset),
            LocalZone::System => UtcOffset::local_offset_at(instant).ok(),
        }
    }

    /// Shift `instant` into this zone. When the host offset is unknown the instant is
    /// kept in UTC and a `NORMALIZE_LOCAL_OFFSET_UNKNOWN` warning is recorded.
    pub fn to_local(
        &self,
        instant: OffsetDateTime,
        warnings: &mut Vec<ValidationWarning>,
    ) -> OffsetDateTime {
        match self.offset_at(instant) {
            Some(offset) => instant.to_offset(offset),
            None => {
                warnings.push(
                    ValidationWarning::new(
                        "NORMALIZE_LOCAL_OFFSET_UNKNOWN",
                        "Host UTC offset could not be determined; time shown in UTC",
                    )
                    .with_details(format!("instant={instant}")),
                );
                instant.to_offset(UtcOffset::UTC)
            }
        }
    }

    /// Whether the host offset can be determined at all in this process.
    pub fn system_available(at: OffsetDateTime) -> bool {
        UtcOffset::local_offset_at(at).is_ok()
    }
}

// Older API versions emitted offsets without a colon, e.g. 2015-03-06T15:28:51-0500.
const COLONLESS_OFFSET: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

const SPACE_SEPARATED: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

fn parse_allowlist(raw: &str) -> Option<OffsetDateTime> {
    [COLONLESS_OFFSET, SPACE_SEPARATED]
        .into_iter()
        .find_map(|fmt| OffsetDateTime::parse(raw, fmt).ok())
}

/// Parse a provider timestamp string.
///
/// RFC3339 is accepted silently. A small allowlist of older offset spellings is accepted
/// with an explicit warning. Anything else yields `None` and the caller decides.
pub fn parse_provider_timestamp(
    field: &str,
    raw_input: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<OffsetDateTime> {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(dt);
    }

    let dt = parse_allowlist(trimmed)?;
    warnings.push(
        ValidationWarning::new(
            "NORMALIZE_TS_NONSTANDARD",
            format!("Parsed non-RFC3339 timestamp for {field}"),
        )
        .with_details(format!("raw={trimmed}")),
    );
    Some(dt)
}

/// Whole minutes from `start` to `end`, rounding half a minute up.
///
/// Returns `None` when `end` precedes `start`.
pub fn minutes_between_rounded(start: OffsetDateTime, end: OffsetDateTime) -> Option<i64> {
    let elapsed: Duration = end - start;
    let millis = elapsed.whole_milliseconds();
    if millis < 0 {
        return None;
    }
    i64::try_from((millis + 30_000) / 60_000).ok()
}
