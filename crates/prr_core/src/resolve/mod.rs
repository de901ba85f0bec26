use std::collections::HashSet;

use crate::domain::Service;
use crate::error::AppError;
use crate::source::IncidentSource;

/// Expand escalation policies into the services they escalate to.
///
/// Services are appended in policy order, then provider order, without de-duplication.
/// Any lookup failure (including an unknown policy) aborts resolution.
pub fn resolve_services<S: IncidentSource + ?Sized>(
    source: &S,
    policy_ids: &[String],
) -> Result<Vec<Service>, AppError> {
    if policy_ids.is_empty() {
        return Err(AppError::new(
            "RESOLVE_NO_POLICIES",
            "At least one escalation policy is required",
        ));
    }

    let mut services = Vec::new();
    for policy_id in policy_ids {
        let found = source.escalation_policy_services(policy_id)?;
        tracing::debug!(
            policy_id = %policy_id,
            services = found.len(),
            "resolved escalation policy"
        );
        services.extend(found);
    }
    Ok(services)
}

/// Drop repeated services by id, keeping the first occurrence.
pub fn unique_services(services: &[Service]) -> Vec<Service> {
    let mut seen = HashSet::new();
    services
        .iter()
        .filter(|s| seen.insert(s.id.as_str()))
        .cloned()
        .collect()
}
