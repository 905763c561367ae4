use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use wardrail_core::CircleId;

/// The circles required to approve an envelope, and how many of them
/// must have a recorded, matching artifact before the gate passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverSet {
    required: HashSet<CircleId>,
    threshold: u32,
}

impl ApproverSet {
    pub fn new(required: impl IntoIterator<Item = CircleId>, threshold: u32) -> Self {
        Self {
            required: required.into_iter().collect(),
            threshold,
        }
    }

    pub fn is_required(&self, circle_id: &CircleId) -> bool {
        self.required.contains(circle_id)
    }

    pub fn required_count(&self) -> usize {
        self.required.len()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn required_circles(&self) -> impl Iterator<Item = &CircleId> {
        self.required.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_required_reflects_membership() {
        let set = ApproverSet::new([CircleId::new("a"), CircleId::new("b")], 2);
        assert!(set.is_required(&CircleId::new("a")));
        assert!(!set.is_required(&CircleId::new("c")));
        assert_eq!(set.threshold(), 2);
    }
}
