use super::distance::round_to;
use super::rank::{NeighborResult, RankingReport};
use super::route::RouteSummary;
use super::types::Point;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_DECIMALS: u32 = 3;

/// One line of the wide result table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub target_site: String,
    /// `(neighbour id, rounded distance)` nearest first
    pub neighbors: Vec<(String, f64)>,
}

pub fn build_rows(report: &RankingReport, decimals: u32) -> Vec<ResultRow> {
    report
        .iter()
        .map(|r| ResultRow {
            target_site: r.target.id().to_string(),
            neighbors: r
                .neighbors
                .iter()
                .map(|n| (n.id().to_string(), round_to(n.distance_km, decimals)))
                .collect(),
        })
        .collect()
}

fn header(k: usize) -> Vec<String> {
    let mut cols = vec!["Target Site".to_string()];
    for i in 1..=k {
        cols.push(format!("Neighbor {i}"));
        cols.push(format!("Distance {i} (km)"));
    }
    cols
}

/// Write the table as CSV; rows shorter than `k` get blank trailing cells.
pub fn write_rows_csv<W: Write>(writer: W, rows: &[ResultRow], k: usize) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(k))?;
    for row in rows {
        let mut record = vec![row.target_site.clone()];
        for i in 0..k {
            match row.neighbors.get(i) {
                Some((id, dist)) => {
                    record.push(id.clone());
                    record.push(dist.to_string());
                }
                None => {
                    record.push(String::new());
                    record.push(String::new());
                }
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_csv<P: AsRef<Path>>(
    report: &RankingReport,
    path: P,
    decimals: u32,
) -> csv::Result<PathBuf> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_rows_csv(file, &build_rows(report, decimals), report.k)?;
    Ok(path.to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingSummary {
    pub targets: usize,
    pub candidates: usize,
    pub k: usize,
    pub ranked_entries: usize,
    /// Targets that got fewer than K neighbours (not an error)
    pub short_targets: usize,
    pub empty_targets: usize,
}

impl RankingSummary {
    pub fn from_report(report: &RankingReport) -> Self {
        Self {
            targets: report.len(),
            candidates: report.candidate_count,
            k: report.k,
            ranked_entries: report.iter().map(NeighborResult::len).sum(),
            short_targets: report.short_results(),
            empty_targets: report.iter().filter(|r| r.is_empty()).count(),
        }
    }

    pub fn has_results(&self) -> bool {
        self.ranked_entries > 0
    }
}

#[derive(Debug, Serialize)]
pub struct TargetSummary {
    pub target: Point,
    pub neighbors: Vec<(String, f64)>,
    pub route: RouteSummary,
    pub maps_link: String,
}

#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub summary: RankingSummary,
    pub targets: Vec<TargetSummary>,
}

pub fn build_document(report: &RankingReport, decimals: u32) -> ReportDocument {
    let targets = report
        .iter()
        .map(|r| {
            let mut route = r.route();
            route.legs_km = route
                .legs_km
                .iter()
                .map(|d| round_to(*d, decimals))
                .collect();
            route.total_km = round_to(route.total_km, decimals);
            TargetSummary {
                target: r.target.clone(),
                neighbors: r
                    .neighbors
                    .iter()
                    .map(|n| (n.id().to_string(), round_to(n.distance_km, decimals)))
                    .collect(),
                route,
                maps_link: maps_link(r),
            }
        })
        .collect();

    ReportDocument {
        summary: RankingSummary::from_report(report),
        targets,
    }
}

pub fn write_report_json<P: AsRef<Path>>(
    report: &RankingReport,
    result_dir: P,
    decimals: u32,
) -> std::io::Result<PathBuf> {
    let summary_path = result_dir.as_ref().join("summary.json");
    let mut summary_file = File::create(&summary_path)?;
    serde_json::to_writer_pretty(&mut summary_file, &build_document(report, decimals))?;
    Ok(summary_path)
}

fn coord(p: &Point) -> String {
    format!("{:.6},{:.6}", p.latitude(), p.longitude())
}

/// Google Maps directions link for target -> neighbours -> target.
pub fn maps_link(result: &NeighborResult) -> String {
    let stops = std::iter::once(&result.target)
        .chain(result.neighbors.iter().map(|n| &n.site))
        .chain(std::iter::once(&result.target))
        .map(coord)
        .collect::<Vec<_>>()
        .join("/");
    format!("https://www.google.com/maps/dir/{stops}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::rank::rank_by_id;

    fn p(id: &str, lat: f64, lon: f64) -> Point {
        Point::new(id, lat, lon).unwrap()
    }

    fn sample() -> RankingReport {
        let candidates = vec![p("A", 0.0, 1.0), p("B", 0.0, 2.0)];
        let targets = vec![p("T", 0.0, 0.0)];
        rank_by_id(&candidates, &targets, 3).unwrap()
    }

    #[test]
    fn test_rows_rounded() {
        let rows = build_rows(&sample(), 3);
        assert_eq!(rows[0].target_site, "T");
        assert_eq!(rows[0].neighbors[0].0, "A");
        assert_eq!(rows[0].neighbors[0].1, 111.195);
        assert_eq!(rows[0].neighbors.len(), 2);
    }

    #[test]
    fn test_csv_pads_short_rows() {
        let report = sample();
        let mut out = Vec::new();
        write_rows_csv(&mut out, &build_rows(&report, 3), report.k).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Target Site,Neighbor 1,Distance 1 (km),Neighbor 2,Distance 2 (km),Neighbor 3,Distance 3 (km)"
        );
        assert_eq!(lines.next().unwrap(), "T,A,111.195,B,222.39,,");
    }

    #[test]
    fn test_summary_counts() {
        let summary = RankingSummary::from_report(&sample());
        assert_eq!(summary.targets, 1);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.ranked_entries, 2);
        assert_eq!(summary.short_targets, 1);
        assert_eq!(summary.empty_targets, 0);
        assert!(summary.has_results());
    }

    #[test]
    fn test_maps_link_closes_loop() {
        let report = sample();
        let link = maps_link(&report.results[0]);
        assert_eq!(
            link,
            "https://www.google.com/maps/dir/0.000000,0.000000/0.000000,1.000000/0.000000,2.000000/0.000000,0.000000"
        );
    }

    #[test]
    fn test_document_serializes() {
        let doc = build_document(&sample(), 3);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["summary"]["targets"], 1);
        assert_eq!(json["targets"][0]["route"]["stops"][1], "B");
    }
}
