use super::types::{CoordinatePolicy, Point};
use crate::error::{Error, Result};
use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const SITE_COLUMNS: &[&str] = &["site", "id", "name"];
const LATITUDE_COLUMNS: &[&str] = &["latitude", "lat"];
const LONGITUDE_COLUMNS: &[&str] = &["longitude", "lon", "lng", "long"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Random,
    File,
}

/// Tabular formats understood by [`load_sites`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFormat {
    Csv,
    Tsv,
    Json,
}

impl SiteFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(SiteFormat::Csv),
            "tsv" => Ok(SiteFormat::Tsv),
            "json" => Ok(SiteFormat::Json),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One raw row before validation; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl SiteRecord {
    pub fn new(site: &str, latitude: &str, longitude: &str) -> Self {
        Self {
            site: Some(site.to_string()),
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
        }
    }

    /// Validate into a [`Point`]; `record` is the zero-based row used in errors.
    pub fn into_point(self, record: usize, policy: CoordinatePolicy) -> Result<Point> {
        let site = require(record, "site", self.site)?;
        let lat_raw = require(record, "latitude", self.latitude)?;
        let lon_raw = require(record, "longitude", self.longitude)?;
        let latitude = parse_coordinate(record, "latitude", &lat_raw)?;
        let longitude = parse_coordinate(record, "longitude", &lon_raw)?;
        Point::with_policy(record, site, latitude, longitude, policy)
    }
}

fn require(record: usize, field: &'static str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingField { record, field }),
    }
}

fn parse_coordinate(record: usize, field: &'static str, raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|e| Error::InvalidCoordinate {
        record,
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Turn raw records into points, failing on the first bad record.
pub fn records_to_points(
    records: impl IntoIterator<Item = SiteRecord>,
    policy: CoordinatePolicy,
) -> Result<Vec<Point>> {
    let mut seen = HashSet::new();
    let mut points = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let point = record.into_point(i, policy)?;
        if !seen.insert(point.id().to_string()) {
            return Err(Error::ParseError(format!(
                "record {}: duplicate site `{}`",
                i,
                point.id()
            )));
        }
        points.push(point);
    }
    Ok(points)
}

fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    policy: CoordinatePolicy,
) -> Result<Vec<Point>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::ParseError(e.to_string()))?
        .clone();
    let site_idx = column(&headers, SITE_COLUMNS);
    let lat_idx = column(&headers, LATITUDE_COLUMNS);
    let lon_idx = column(&headers, LONGITUDE_COLUMNS);

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(|e| Error::ParseError(e.to_string()))?;
        let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);
        records.push(SiteRecord {
            site: get(site_idx),
            latitude: get(lat_idx),
            longitude: get(lon_idx),
        });
    }
    records_to_points(records, policy)
}

/// Parse `Site,Latitude,Longitude` CSV (header names are case-insensitive).
pub fn read_sites_csv<R: Read>(reader: R, policy: CoordinatePolicy) -> Result<Vec<Point>> {
    read_delimited(reader, b',', policy)
}

pub fn read_sites_tsv<R: Read>(reader: R, policy: CoordinatePolicy) -> Result<Vec<Point>> {
    read_delimited(reader, b'\t', policy)
}

/// Parse a JSON array of objects; coordinates may be numbers or strings.
pub fn read_sites_json<R: Read>(reader: R, policy: CoordinatePolicy) -> Result<Vec<Point>> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(reader).map_err(|e| Error::ParseError(e.to_string()))?;

    let records = rows.into_iter().map(|row| {
        let get = |names: &[&str]| {
            row.iter()
                .find(|(k, _)| names.iter().any(|n| k.trim().eq_ignore_ascii_case(n)))
                .and_then(|(_, v)| match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
        };
        SiteRecord {
            site: get(SITE_COLUMNS),
            latitude: get(LATITUDE_COLUMNS),
            longitude: get(LONGITUDE_COLUMNS),
        }
    });
    records_to_points(records, policy)
}

/// Load a site collection, picking the parser from the file extension.
///
/// An empty file is reported as [`Error::EmptyCollection`] so callers can
/// tell "no data" apart from "bad data".
pub fn load_sites(path: &Path, policy: CoordinatePolicy) -> anyhow::Result<Vec<Point>> {
    let format = SiteFormat::from_path(path)?;
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let sites = match format {
        SiteFormat::Csv => read_sites_csv(file, policy),
        SiteFormat::Tsv => read_sites_tsv(file, policy),
        SiteFormat::Json => read_sites_json(file, policy),
    }
    .with_context(|| format!("Failed to parse sites from {}", path.display()))?;

    if sites.is_empty() {
        return Err(Error::EmptyCollection(path.display().to_string()).into());
    }
    info!("Loaded {} site(s) from {}", sites.len(), path.display());
    Ok(sites)
}

pub fn save_sites_csv(sites: &[Point], path: &Path) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(["Site", "Latitude", "Longitude"])?;
    for site in sites {
        wtr.write_record([
            site.id().to_string(),
            site.latitude().to_string(),
            site.longitude().to_string(),
        ])?;
    }
    wtr.flush().context("Failed to write sites file")?;
    Ok(())
}

pub fn save_sites_json(sites: &[Point], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(sites).context("Failed to serialize sites")?;
    fs::write(path, json).context("Failed to write sites file")?;
    Ok(())
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct SiteGenParams {
    pub count: usize,
    pub lat_range: Option<(f64, f64)>,
    pub lon_range: Option<(f64, f64)>,
    /// Identifier prefix, e.g. `S` gives `S1`, `S2`, ...
    pub prefix: Option<String>,
    pub seed: Option<u64>,
}

fn checked_range(
    field: &str,
    range: Option<(f64, f64)>,
    limit: f64,
) -> Result<(f64, f64)> {
    let (min, max) = range.unwrap_or((-limit, limit));
    if !(min.is_finite() && max.is_finite()) || min > max || min < -limit || max > limit {
        return Err(Error::ConfigurationError(format!(
            "{field} [{min}, {max}] must be ordered and within [-{limit}, {limit}]"
        )));
    }
    Ok((min, max))
}

/// Sample `count` sites uniformly inside the configured box.
///
/// Ranges must be ordered and lie on the globe, otherwise
/// [`Error::ConfigurationError`] is returned before any sampling.
pub fn generate_random_sites(params: &SiteGenParams) -> Result<Vec<Point>> {
    let (min_lat, max_lat) = checked_range("lat_range", params.lat_range, 90.0)?;
    let (min_lon, max_lon) = checked_range("lon_range", params.lon_range, 180.0)?;

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let prefix = params.prefix.as_deref().unwrap_or("S");

    let mut sites = Vec::with_capacity(params.count);
    for i in 1..=params.count {
        let lat = rng.random_range(min_lat..=max_lat);
        let lon = rng.random_range(min_lon..=max_lon);
        sites.push(Point::new(format!("{prefix}{i}"), lat, lon)?);
    }
    debug!("Generated {} random site(s)", sites.len());
    Ok(sites)
}
