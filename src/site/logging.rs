use super::distance::round_to;
use super::rank::RankingReport;
use super::report::RankingSummary;

#[macro_export]
macro_rules! rank_info {
    ($($arg:tt)+) => {
        tracing::info!(target: "nearsite", $($arg)+)
    }
}

/// Log each target with its ranked neighbours
pub fn log_ranking_table(report: &RankingReport, decimals: u32) {
    for result in report {
        let neighbors = result
            .neighbors
            .iter()
            .map(|n| format!("{} ({} km)", n.id(), round_to(n.distance_km, decimals)))
            .collect::<Vec<_>>()
            .join(", ");
        rank_info!("  {} -> [{}]", result.target.id(), neighbors);
    }
}

/// Log the overall outcome, warning when targets came up short
pub fn log_summary(summary: &RankingSummary) {
    rank_info!(
        "Summary: {} target(s), {} candidate(s), k={}, {} entries",
        summary.targets,
        summary.candidates,
        summary.k,
        summary.ranked_entries
    );
    if !summary.has_results() {
        tracing::warn!(target: "nearsite", "No neighbours found for any target");
    } else if summary.short_targets > 0 {
        tracing::warn!(
            target: "nearsite",
            "{} target(s) have fewer than {} neighbour(s) ({} with none)",
            summary.short_targets,
            summary.k,
            summary.empty_targets
        );
    }
}
