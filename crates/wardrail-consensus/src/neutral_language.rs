use wardrail_core::{AUTHORITY_MARKERS, FEAR_MARKERS, OPTIMISATION_MARKERS, URGENCY_MARKERS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub marker: String,
    pub category: &'static str,
}

/// Scans a free-text description for the fixed, code-defined marker
/// lists. This is not a content filter on the payee or amount — those
/// are rejected outright elsewhere — it exists to catch an approval
/// request framed in a way designed to pressure an approver into acting
/// without scrutiny.
pub fn scan(description: &str) -> Vec<Violation> {
    let lower = description.to_lowercase();
    let mut hits = Vec::new();
    for (list, category) in [
        (URGENCY_MARKERS, "urgency"),
        (FEAR_MARKERS, "fear"),
        (AUTHORITY_MARKERS, "authority"),
        (OPTIMISATION_MARKERS, "optimisation"),
    ] {
        for marker in list {
            if lower.contains(marker) {
                hits.push(Violation {
                    marker: marker.to_string(),
                    category,
                });
            }
        }
    }
    hits
}
