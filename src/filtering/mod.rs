// Candidate filtering pipeline
//
// A FilterSpec is compiled once into a CompiledFilter, then every candidate
// is run through the stages in order: namespace, name, labels, annotations,
// age, node, pod health. The first failing stage rejects the candidate.

mod compiler;
mod health;
mod metadata;
mod options;
mod scope;
mod types;
mod utils;

pub use compiler::CompiledFilter;
pub use health::{compare_restarts, reasons_match, status_matches, CompareOp, RestartExpr};
pub use metadata::{MetadataRules, ValueFilter, ValueMode};
pub use options::{FilterSpec, HealthSpec, MetadataSpec, ScopeSpec};
pub use scope::{ScopeRules, EXACT_INDEX_THRESHOLD};
pub use types::{FilterStage, FilterStats};
pub use utils::parse_duration;

use crate::candidate::Candidate;
use crate::patterns::LevenshteinScratch;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Runs candidates through a compiled filter
///
/// The pipeline owns no per-run state, so a single instance can serve any
/// number of listings. Output always preserves input order.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    filter: Arc<CompiledFilter>,
}

impl FilterPipeline {
    /// Create new filter pipeline
    ///
    /// # Arguments
    /// * `filter` - Compiled filter shared with any other pipelines
    pub fn new(filter: Arc<CompiledFilter>) -> Self {
        Self { filter }
    }

    pub fn compiled(&self) -> &CompiledFilter {
        &self.filter
    }

    /// Filter candidates on the calling thread
    ///
    /// # Returns
    /// Tuple of (accepted candidates in input order, statistics)
    pub fn filter<'a>(&self, candidates: &'a [Candidate]) -> (Vec<&'a Candidate>, FilterStats) {
        let start = Instant::now();
        let (accepted, mut stats): (Vec<&'a Candidate>, FilterStats) =
            if self.filter.is_match_all() {
                (candidates.iter().collect(), match_all_stats(candidates.len()))
            } else {
                let mut scratch = LevenshteinScratch::new();
                let verdicts = candidates
                    .iter()
                    .map(|c| self.filter.rejection(&mut scratch, c));
                tally(candidates, verdicts)
            };
        stats.processing_time_ms = start.elapsed().as_millis() as u64;
        log_summary(&stats, 1);
        (accepted, stats)
    }

    /// Filter candidates on the rayon pool in at most `workers` pieces
    ///
    /// Each rayon job keeps its own fuzzy scratch buffer. The indexed
    /// iterator collects verdicts in input order, so the output is identical
    /// to [`FilterPipeline::filter`].
    ///
    /// # Arguments
    /// * `candidates` - Candidates to evaluate
    /// * `workers` - Maximum number of pieces; 0 and 1 run sequentially
    pub fn filter_parallel<'a>(
        &self,
        candidates: &'a [Candidate],
        workers: usize,
    ) -> (Vec<&'a Candidate>, FilterStats) {
        let workers = workers.min(candidates.len());
        if workers <= 1 || self.filter.is_match_all() {
            return self.filter(candidates);
        }

        let start = Instant::now();
        let filter: &CompiledFilter = &self.filter;
        let verdicts: Vec<Option<FilterStage>> = candidates
            .par_iter()
            .with_min_len(candidates.len().div_ceil(workers))
            .map_init(LevenshteinScratch::new, |scratch, c| filter.rejection(scratch, c))
            .collect();

        let (accepted, mut stats) = tally(candidates, verdicts);
        stats.processing_time_ms = start.elapsed().as_millis() as u64;
        log_summary(&stats, workers);
        (accepted, stats)
    }
}

/// Pair candidates with their verdicts, keeping the accepted ones in order
fn tally<'a, I>(candidates: &'a [Candidate], verdicts: I) -> (Vec<&'a Candidate>, FilterStats)
where
    I: IntoIterator<Item = Option<FilterStage>>,
{
    let mut stats = FilterStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    let mut accepted = Vec::new();

    for (candidate, verdict) in candidates.iter().zip(verdicts) {
        match verdict {
            None => accepted.push(candidate),
            Some(stage) => {
                tracing::trace!(
                    namespace = %candidate.namespace,
                    name = %candidate.name,
                    stage = %stage,
                    "Rejected candidate"
                );
                stats.record_rejection(stage);
            }
        }
    }

    stats.matched = accepted.len();
    (accepted, stats)
}

fn match_all_stats(count: usize) -> FilterStats {
    FilterStats {
        candidates: count,
        matched: count,
        ..Default::default()
    }
}

fn log_summary(stats: &FilterStats, workers: usize) {
    tracing::debug!(
        candidates = stats.candidates,
        matched = stats.matched,
        rejected = stats.total_rejected(),
        workers,
        elapsed_ms = stats.processing_time_ms,
        "Filtered candidates"
    );
}
