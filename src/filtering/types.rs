// Shared types for the filtering pipeline
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages in evaluation order, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Namespace,
    Name,
    Labels,
    Annotations,
    Age,
    Node,
    Health,
}

impl FilterStage {
    pub const ALL: [FilterStage; 7] = [
        FilterStage::Namespace,
        FilterStage::Name,
        FilterStage::Labels,
        FilterStage::Annotations,
        FilterStage::Age,
        FilterStage::Node,
        FilterStage::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStage::Namespace => "namespace",
            FilterStage::Name => "name",
            FilterStage::Labels => "labels",
            FilterStage::Annotations => "annotations",
            FilterStage::Age => "age",
            FilterStage::Node => "node",
            FilterStage::Health => "health",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics from one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    /// Number of candidates evaluated
    pub candidates: usize,
    /// Number of candidates accepted
    pub matched: usize,
    /// Rejections per stage, indexed in `FilterStage::ALL` order
    pub rejected: [usize; 7],
    /// Total processing time in milliseconds
    pub processing_time_ms: u64,
}

impl FilterStats {
    pub fn record_rejection(&mut self, stage: FilterStage) {
        self.rejected[stage.index()] += 1;
    }

    pub fn rejected_at(&self, stage: FilterStage) -> usize {
        self.rejected[stage.index()]
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_index() {
        for (i, stage) in FilterStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert!(FilterStage::Namespace < FilterStage::Health);
    }

    #[test]
    fn test_stats_counts() {
        let mut stats = FilterStats {
            candidates: 3,
            matched: 1,
            ..Default::default()
        };
        stats.record_rejection(FilterStage::Name);
        stats.record_rejection(FilterStage::Health);
        assert_eq!(stats.rejected_at(FilterStage::Name), 1);
        assert_eq!(stats.rejected_at(FilterStage::Health), 1);
        assert_eq!(stats.total_rejected(), 2);
    }
}
