pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod grouping;
pub mod normalize;
pub mod report;
pub mod resolve;
pub mod source;
pub mod tags;
