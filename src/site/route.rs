use super::rank::NeighborResult;
use super::types::Point;
use serde::Serialize;

/// Length of the closed loop `start -> stops[0] -> ... -> stops[n-1] -> start`.
///
/// Stops are visited in the given order; nothing is reordered. An empty
/// `stops` slice gives 0.
pub fn route_distance_km(start: &Point, stops: &[Point]) -> f64 {
    route_legs_km(start, stops).iter().sum()
}

/// Distance of each leg of the closed loop, in travel order.
pub fn route_legs_km(start: &Point, stops: &[Point]) -> Vec<f64> {
    if stops.is_empty() {
        return Vec::new();
    }
    std::iter::once(start)
        .chain(stops)
        .zip(stops.iter().chain(std::iter::once(start)))
        .map(|(from, to)| from.distance_km(to))
        .collect()
}

/// Closed-loop route through a target's ranked neighbours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub target: String,
    pub stops: Vec<String>,
    pub legs_km: Vec<f64>,
    pub total_km: f64,
}

impl NeighborResult {
    /// Route target -> neighbour 1 -> ... -> neighbour k -> target, in ranked order.
    pub fn route(&self) -> RouteSummary {
        let stops: Vec<Point> = self.neighbors.iter().map(|n| n.site.clone()).collect();
        let legs_km = route_legs_km(&self.target, &stops);
        RouteSummary {
            target: self.target.id().to_string(),
            stops: stops.iter().map(|s| s.id().to_string()).collect(),
            total_km: legs_km.iter().sum(),
            legs_km,
        }
    }
}
