pub mod client;
pub mod source;

pub use client::PagerDutyClient;
