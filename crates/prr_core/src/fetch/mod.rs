use serde::{Deserialize, Serialize};

use crate::domain::{RawIncident, Service, TimeWindow};
use crate::error::AppError;
use crate::resolve::unique_services;
use crate::source::IncidentSource;

/// Page size requested from the provider.
pub const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceIncidentCount {
    pub service: Service,
    pub count: u64,
}

/// Collect every page of one listing call. Partial pages are discarded on error.
fn fetch_all_pages<S: IncidentSource + ?Sized>(
    source: &S,
    service_ids: &[String],
    window: &TimeWindow,
) -> Result<Vec<RawIncident>, AppError> {
    let mut out = Vec::new();
    let mut offset: u32 = 0;
    loop {
        let page = source.list_incidents_page(service_ids, window, offset, PAGE_LIMIT)?;
        let received = page.incidents.len();
        out.extend(page.incidents);
        if !page.more || received == 0 {
            break;
        }
        offset = offset.saturating_add(u32::try_from(received).unwrap_or(u32::MAX));
        tracing::debug!(offset, services = service_ids.len(), "fetching next incident page");
    }
    Ok(out)
}

fn fetch_for_ids<S: IncidentSource + ?Sized>(
    source: &S,
    service_ids: &[String],
    window: &TimeWindow,
) -> Result<Vec<RawIncident>, AppError> {
    match fetch_all_pages(source, service_ids, window) {
        Ok(incidents) => Ok(incidents),
        Err(e) if e.is_request_too_large() => {
            if service_ids.len() <= 1 {
                return Err(AppError::new(
                    "FETCH_SERVICE_UNSPLITTABLE",
                    "Provider rejected a single-service incident request as too large",
                )
                .with_details(format!("service_ids={}", service_ids.join(","))));
            }
            let (left, right) = service_ids.split_at(service_ids.len() / 2);
            tracing::info!(
                services = service_ids.len(),
                left = left.len(),
                right = right.len(),
                "incident request too large; splitting service list"
            );
            let mut incidents = fetch_for_ids(source, left, window)?;
            incidents.extend(fetch_for_ids(source, right, window)?);
            Ok(incidents)
        }
        Err(e) => Err(e),
    }
}

/// Fetch every incident created within `window` for `services`.
///
/// Service ids are de-duplicated first. When the provider rejects a request as too large,
/// the id list is bisected and each half fetched in turn; other errors propagate.
pub fn fetch_incidents<S: IncidentSource + ?Sized>(
    source: &S,
    services: &[Service],
    window: &TimeWindow,
) -> Result<Vec<RawIncident>, AppError> {
    let ids: Vec<String> = unique_services(services)
        .into_iter()
        .map(|s| s.id)
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    fetch_for_ids(source, &ids, window)
}

/// Per-service incident counts for `window`, in the order services are given.
pub fn count_incidents_per_service<S: IncidentSource + ?Sized>(
    source: &S,
    services: &[Service],
    window: &TimeWindow,
) -> Result<Vec<ServiceIncidentCount>, AppError> {
    services
        .iter()
        .map(|service| {
            let count = source.count_incidents(&service.id, window)?;
            Ok(ServiceIncidentCount {
                service: service.clone(),
                count,
            })
        })
        .collect()
}
