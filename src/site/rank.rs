//! K-nearest site ranking by great-circle distance

use super::types::Point;
use crate::error::{Error, Result};
use crate::rank_info;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decides whether a candidate is the target itself and must be skipped.
///
/// Implemented for [`Identity`] and for any `Fn(&Point, &Point) -> bool`,
/// so callers can plug in their own notion of "same site".
pub trait SameSite {
    fn same_site(&self, target: &Point, candidate: &Point) -> bool;
}

impl<F> SameSite for F
where
    F: Fn(&Point, &Point) -> bool,
{
    fn same_site(&self, target: &Point, candidate: &Point) -> bool {
        self(target, candidate)
    }
}

/// Built-in identity rules for self-exclusion
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Identity {
    /// Exact identifier match
    #[default]
    Id,
    /// Sites closer than `tolerance_km` are the same site
    Coordinates { tolerance_km: f64 },
    /// Never exclude anything
    Disabled,
}

impl SameSite for Identity {
    fn same_site(&self, target: &Point, candidate: &Point) -> bool {
        match self {
            Identity::Id => target.id() == candidate.id(),
            Identity::Coordinates { tolerance_km } => {
                target.distance_km(candidate) <= *tolerance_km
            }
            Identity::Disabled => false,
        }
    }
}

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub site: Point,
    /// Full precision; round only when presenting
    pub distance_km: f64,
}

impl Neighbor {
    pub fn id(&self) -> &str {
        self.site.id()
    }
}

/// Up to K neighbours of one target, nearest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborResult {
    pub target: Point,
    pub neighbors: Vec<Neighbor>,
}

impl NeighborResult {
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.neighbors.iter().map(Neighbor::id).collect()
    }

    pub fn nearest(&self) -> Option<&Neighbor> {
        self.neighbors.first()
    }
}

/// Results for every target, in target input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    pub k: usize,
    pub candidate_count: usize,
    pub results: Vec<NeighborResult>,
}

impl RankingReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NeighborResult> {
        self.results.iter()
    }

    /// First result whose target has this identifier.
    pub fn get(&self, target_id: &str) -> Option<&NeighborResult> {
        self.results.iter().find(|r| r.target.id() == target_id)
    }

    /// Number of targets that received fewer than K neighbours.
    pub fn short_results(&self) -> usize {
        self.results.iter().filter(|r| r.len() < self.k).count()
    }
}

impl<'a> IntoIterator for &'a RankingReport {
    type Item = &'a NeighborResult;
    type IntoIter = std::slice::Iter<'a, NeighborResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Brute-force K-nearest ranker
///
/// Every target is scored against every candidate; there is no spatial index,
/// which is fine up to tens of thousands of sites.
#[derive(Debug, Clone)]
pub struct NeighborRanker<S: SameSite = Identity> {
    k: usize,
    same_site: S,
}

impl NeighborRanker<Identity> {
    /// Ranker excluding candidates with the target's identifier.
    pub fn by_id(k: usize) -> Result<Self> {
        Self::new(k, Identity::Id)
    }
}

impl<S: SameSite> NeighborRanker<S> {
    pub fn new(k: usize, same_site: S) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidNeighborCount(k));
        }
        Ok(Self { k, same_site })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Rank the candidates for a single target.
    pub fn rank_target(&self, candidates: &[Point], target: &Point) -> NeighborResult {
        let mut scored: Vec<Neighbor> = candidates
            .iter()
            .filter(|c| !self.same_site.same_site(target, c))
            .map(|c| Neighbor {
                site: c.clone(),
                distance_km: target.distance_km(c),
            })
            .collect();

        // stable: equal distances keep candidate order
        scored.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        scored.truncate(self.k);

        debug!(
            target: "nearsite",
            "{}: {} neighbour(s), nearest {:?}",
            target.id(),
            scored.len(),
            scored.first().map(|n| n.distance_km)
        );

        NeighborResult {
            target: target.clone(),
            neighbors: scored,
        }
    }

    /// Rank every target against all candidates.
    pub fn rank(&self, candidates: &[Point], targets: &[Point]) -> RankingReport {
        let results: Vec<_> = targets
            .iter()
            .map(|t| self.rank_target(candidates, t))
            .collect();
        self.finish(candidates.len(), results)
    }

    fn finish(&self, candidate_count: usize, results: Vec<NeighborResult>) -> RankingReport {
        let report = RankingReport {
            k: self.k,
            candidate_count,
            results,
        };
        rank_info!(
            "Ranked {} target(s) against {} candidate(s), k={} ({} short)",
            report.len(),
            candidate_count,
            self.k,
            report.short_results()
        );
        report
    }
}

#[cfg(feature = "parallel")]
impl<S: SameSite + Sync> NeighborRanker<S> {
    /// Same output as [`NeighborRanker::rank`], one rayon task per target.
    pub fn rank_parallel(&self, candidates: &[Point], targets: &[Point]) -> RankingReport {
        use rayon::prelude::*;

        let results: Vec<_> = targets
            .par_iter()
            .map(|t| self.rank_target(candidates, t))
            .collect();
        self.finish(candidates.len(), results)
    }
}

/// Rank `targets` against `candidates`, skipping pairs `same_site` considers identical.
pub fn rank<S: SameSite>(
    candidates: &[Point],
    targets: &[Point],
    k: usize,
    same_site: S,
) -> Result<RankingReport> {
    Ok(NeighborRanker::new(k, same_site)?.rank(candidates, targets))
}

/// [`rank`] with identifier-based self-exclusion.
pub fn rank_by_id(candidates: &[Point], targets: &[Point], k: usize) -> Result<RankingReport> {
    rank(candidates, targets, k, Identity::Id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str, lat: f64, lon: f64) -> Point {
        Point::new(id, lat, lon).unwrap()
    }

    // Candidates along the equator, 1..5 degrees east of the origin
    fn equator_line() -> Vec<Point> {
        vec![
            p("E", 0.0, 5.0),
            p("B", 0.0, 2.0),
            p("D", 0.0, 4.0),
            p("A", 0.0, 1.0),
            p("C", 0.0, 3.0),
        ]
    }

    #[test]
    fn test_zero_k_rejected() {
        assert_eq!(
            NeighborRanker::by_id(0).unwrap_err(),
            Error::InvalidNeighborCount(0)
        );
        assert!(rank_by_id(&[], &[], 0).is_err());
    }

    #[test]
    fn test_top_three_in_order() {
        let target = p("T", 0.0, 0.0);
        let report = rank_by_id(&equator_line(), &[target], 3).unwrap();
        let result = &report.results[0];
        assert_eq!(result.ids(), vec!["A", "B", "C"]);
        let d: Vec<f64> = result.neighbors.iter().map(|n| n.distance_km).collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let candidates = vec![
            p("north", 1.0, 0.0),
            p("east", 0.0, 1.0),
            p("south", -1.0, 0.0),
            p("west", 0.0, -1.0),
        ];
        let report = rank_by_id(&candidates, &[p("T", 0.0, 0.0)], 3).unwrap();
        // one degree from the origin along either axis is an exact tie
        assert_eq!(report.results[0].ids(), vec!["north", "east", "south"]);
    }

    #[test]
    fn test_self_excluded_by_id() {
        let sites = vec![p("X", 10.0, 10.0), p("Y", 10.0, 11.0), p("Z", 10.0, 13.0)];
        let report = rank_by_id(&sites, &sites, 5).unwrap();
        for result in &report {
            assert!(!result.ids().contains(&result.target.id()));
            assert!(result.neighbors.iter().all(|n| n.distance_km > 0.0));
            assert_eq!(result.len(), 2);
        }
    }

    #[test]
    fn test_disjoint_ids_no_exclusion() {
        let candidates = vec![p("X1", 10.0, 10.0)];
        let targets = vec![p("X", 10.0, 10.0)];
        let report = rank_by_id(&candidates, &targets, 1).unwrap();
        assert_eq!(report.results[0].ids(), vec!["X1"]);
        assert_eq!(report.results[0].neighbors[0].distance_km, 0.0);
    }

    #[test]
    fn test_disabled_identity_keeps_self() {
        let sites = vec![p("X", 10.0, 10.0), p("Y", 10.0, 11.0)];
        let report = rank(&sites, &sites, 1, Identity::Disabled).unwrap();
        assert_eq!(report.results[0].ids(), vec!["X"]);
    }

    #[test]
    fn test_coordinate_identity() {
        let candidates = vec![p("dup", 10.0, 10.000001), p("far", 10.0, 12.0)];
        let targets = vec![p("X", 10.0, 10.0)];
        let identity = Identity::Coordinates { tolerance_km: 0.01 };
        let report = rank(&candidates, &targets, 5, identity).unwrap();
        assert_eq!(report.results[0].ids(), vec!["far"]);
    }

    #[test]
    fn test_closure_identity() {
        let candidates = equator_line();
        let skip_vowels = |_: &Point, c: &Point| matches!(c.id(), "A" | "E");
        let report = rank(&candidates, &[p("T", 0.0, 0.0)], 5, skip_vowels).unwrap();
        assert_eq!(report.results[0].ids(), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_empty_candidates_yield_empty_result() {
        let report = rank_by_id(&[], &[p("T", 0.0, 0.0)], 5).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.results[0].is_empty());
        assert_eq!(report.short_results(), 1);
    }

    #[test]
    fn test_empty_targets_yield_empty_report() {
        let report = rank_by_id(&equator_line(), &[], 5).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_truncation_never_pads() {
        let candidates = vec![p("A", 0.0, 1.0), p("B", 0.0, 2.0)];
        let report = rank_by_id(&candidates, &[p("T", 0.0, 0.0)], 5).unwrap();
        assert_eq!(report.results[0].len(), 2);
    }

    #[test]
    fn test_report_keeps_target_order_and_lookup() {
        let targets = vec![p("T2", 0.0, 4.5), p("T1", 0.0, 0.0)];
        let report = rank_by_id(&equator_line(), &targets, 1).unwrap();
        assert_eq!(report.results[0].target.id(), "T2");
        assert_eq!(report.results[1].target.id(), "T1");
        assert_eq!(report.get("T1").unwrap().ids(), vec!["A"]);
        assert!(report.get("missing").is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let candidates = equator_line();
        let targets = vec![p("T1", 0.0, 0.0), p("T2", 0.0, 4.5), p("C", 0.0, 3.0)];
        let ranker = NeighborRanker::by_id(3).unwrap();
        assert_eq!(
            ranker.rank(&candidates, &targets),
            ranker.rank_parallel(&candidates, &targets)
        );
    }
}
