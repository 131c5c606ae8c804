use serde::Serialize;
use tracing::warn;

use crate::analysis::statistics::ScheduleStatistics;
use crate::repair::RepairReport;

/// One repaired configuration competing for selection.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub label: String,
    pub fleet_size: usize,
    pub statistics: ScheduleStatistics,
    pub repair: RepairReport,
}

const REMAINING_OVERLAP_WEIGHT: f64 = 1000.0;

impl Candidate {
    fn is_degenerate(&self) -> bool {
        self.statistics.used_resources == 0 || self.statistics.total_trips == 0
    }

    /// Composite cost: fewer used resources, no leftover overlaps, and fewer
    /// repair-added resources all pull the score down.
    fn composite_cost(&self, max_used: usize) -> f64 {
        let used = self.statistics.used_resources as f64 / max_used.max(1) as f64;
        let extra = self
            .repair
            .repaired_resources
            .saturating_sub(self.repair.original_resources) as f64;

        used + REMAINING_OVERLAP_WEIGHT * self.repair.remaining_overlaps as f64 + extra
    }
}

/// Picks the lowest-composite-cost candidate, skipping degenerate ones.
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let viable: Vec<&Candidate> = candidates
        .iter()
        .filter(|candidate| {
            if candidate.is_degenerate() {
                warn!(label = %candidate.label, "skipping degenerate candidate");
                return false;
            }
            true
        })
        .collect();

    let max_used = viable
        .iter()
        .map(|candidate| candidate.statistics.used_resources)
        .max()?;

    viable.into_iter().min_by(|a, b| {
        a.composite_cost(max_used)
            .total_cmp(&b.composite_cost(max_used))
    })
}
