use serde::{Deserialize, Serialize};

use crate::domain::Incident;

/// A literal marker responders put in incident notes, e.g. `#a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub marker: &'static str,
    pub label: &'static str,
}

pub const ACTIONABLE: Tag = Tag {
    marker: "#a",
    label: "Actionable",
};
pub const NON_ACTIONABLE: Tag = Tag {
    marker: "#na",
    label: "Non Actionable",
};
pub const TRANSIENT: Tag = Tag {
    marker: "#t",
    label: "Transient",
};
pub const SEASONAL: Tag = Tag {
    marker: "#s",
    label: "Seasonal",
};
pub const ACTIONABLE_BY_OTHER_TEAM: Tag = Tag {
    marker: "#abot",
    label: "Actionable By Other Team",
};

pub const STANDARD_VOCABULARY: [Tag; 5] = [
    ACTIONABLE,
    NON_ACTIONABLE,
    TRANSIENT,
    SEASONAL,
    ACTIONABLE_BY_OTHER_TEAM,
];

pub const LEGACY_VOCABULARY: [Tag; 2] = [ACTIONABLE, NON_ACTIONABLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagPolicy {
    /// Only the first matching tag in vocabulary order counts.
    ExclusiveFirstMatch,
    /// Every matching tag counts.
    IndependentAllMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub marker: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStats {
    pub total: usize,
    pub tags: Vec<TagCount>,
    pub not_tagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagClassifier {
    vocabulary: Vec<Tag>,
    policy: TagPolicy,
}

impl TagClassifier {
    pub fn new(vocabulary: Vec<Tag>, policy: TagPolicy) -> Self {
        Self { vocabulary, policy }
    }

    /// Full vocabulary, tags counted independently.
    pub fn standard() -> Self {
        Self::new(STANDARD_VOCABULARY.to_vec(), TagPolicy::IndependentAllMatch)
    }

    /// Actionable / non-actionable only, first match wins.
    pub fn legacy() -> Self {
        Self::new(LEGACY_VOCABULARY.to_vec(), TagPolicy::ExclusiveFirstMatch)
    }

    pub fn vocabulary(&self) -> &[Tag] {
        &self.vocabulary
    }

    /// Tags found in the incident's notes. Matching is a plain case-sensitive substring
    /// test on the rendered note, so `#a` also matches inside `#abot` or `#admin`.
    pub fn classify(&self, incident: &Incident) -> Vec<Tag> {
        let mut matched = self
            .vocabulary
            .iter()
            .filter(|tag| incident.notes.iter().any(|n| n.contains(tag.marker)));
        match self.policy {
            TagPolicy::ExclusiveFirstMatch => matched.next().into_iter().copied().collect(),
            TagPolicy::IndependentAllMatch => matched.copied().collect(),
        }
    }

    pub fn tally(&self, incidents: &[Incident]) -> TagStats {
        let mut counts = vec![0usize; self.vocabulary.len()];
        let mut not_tagged = 0;
        for incident in incidents {
            let tags = self.classify(incident);
            if tags.is_empty() {
                not_tagged += 1;
            }
            for tag in tags {
                if let Some(idx) = self.vocabulary.iter().position(|t| *t == tag) {
                    counts[idx] += 1;
                }
            }
        }

        TagStats {
            total: incidents.len(),
            tags: self
                .vocabulary
                .iter()
                .zip(counts)
                .map(|(tag, count)| TagCount {
                    marker: tag.marker.to_string(),
                    label: tag.label.to_string(),
                    count,
                })
                .collect(),
            not_tagged,
        }
    }
}
