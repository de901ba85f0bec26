pub mod incident;
pub mod timestamps;

pub use incident::{
    describe, normalize_incident, normalize_incidents, normalize_with_annotations,
    NormalizeOptions,
};
pub use timestamps::{minutes_between_rounded, parse_provider_timestamp, LocalZone};
