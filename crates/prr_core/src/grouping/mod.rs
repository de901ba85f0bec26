use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::Incident;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    #[default]
    None,
    Description,
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentGroup {
    /// `None` only when grouping by description and the description is unset.
    pub key: Option<String>,
    pub incidents: Vec<Incident>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupedIncidents {
    Flat(Vec<Incident>),
    Groups(Vec<IncidentGroup>),
}

impl GroupedIncidents {
    pub fn len(&self) -> usize {
        match self {
            GroupedIncidents::Flat(v) => v.len(),
            GroupedIncidents::Groups(groups) => groups.iter().map(|g| g.incidents.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incidents in output order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Incident> + '_> {
        match self {
            GroupedIncidents::Flat(v) => Box::new(v.iter()),
            GroupedIncidents::Groups(groups) => {
                Box::new(groups.iter().flat_map(|g| g.incidents.iter()))
            }
        }
    }
}

/// Bucket by key in first-encounter order, then stable-sort buckets by descending size.
fn bucket_by<F>(incidents: Vec<Incident>, key_of: F) -> Vec<IncidentGroup>
where
    F: Fn(&Incident) -> Option<String>,
{
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    let mut groups: Vec<IncidentGroup> = Vec::new();
    for incident in incidents {
        let key = key_of(&incident);
        let idx = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(IncidentGroup {
                key,
                incidents: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].incidents.push(incident);
    }
    groups.sort_by(|a, b| b.incidents.len().cmp(&a.incidents.len()));
    groups
}

/// Order incidents for reporting.
///
/// - `None`: ascending `created_on`, incidents without a time last, ties keep input order.
/// - `Description` / `Service`: groups by exact key, largest first, ties in first-seen
///   order; members keep input order.
pub fn group_incidents(mut incidents: Vec<Incident>, by: GroupBy) -> GroupedIncidents {
    match by {
        GroupBy::None => {
            incidents.sort_by_key(|i| (i.created_on.is_none(), i.created_on));
            GroupedIncidents::Flat(incidents)
        }
        GroupBy::Description => {
            GroupedIncidents::Groups(bucket_by(incidents, |i| i.description.clone()))
        }
        GroupBy::Service => {
            GroupedIncidents::Groups(bucket_by(incidents, |i| Some(i.service.clone())))
        }
    }
}
