use super::distance::haversine_km;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A named geographic site. Coordinates are degrees.
///
/// Fields are private so a constructed point cannot be mutated; build one
/// through [`Point::new`] (finite coordinates) or [`Point::new_strict`]
/// (also range-checked). Deserialization runs the same lenient checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    id: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    id: String,
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for Point {
    type Error = Error;

    fn try_from(raw: RawPoint) -> Result<Self, Error> {
        Point::new(raw.id, raw.latitude, raw.longitude)
    }
}

/// How strictly coordinates are checked when turning records into points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatePolicy {
    /// Any finite number is accepted.
    #[default]
    Lenient,
    /// Latitude must be in [-90, 90] and longitude in [-180, 180].
    Strict,
}

impl Point {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self, Error> {
        Self::with_policy(0, id, latitude, longitude, CoordinatePolicy::Lenient)
    }

    pub fn new_strict(id: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self, Error> {
        Self::with_policy(0, id, latitude, longitude, CoordinatePolicy::Strict)
    }

    /// `record` is the zero-based position used in error messages.
    pub(crate) fn with_policy(
        record: usize,
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        policy: CoordinatePolicy,
    ) -> Result<Self, Error> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::MissingField {
                record,
                field: "site",
            });
        }
        check_coordinate(record, "latitude", latitude, 90.0, policy)?;
        check_coordinate(record, "longitude", longitude, 180.0, policy)?;
        Ok(Self {
            id,
            latitude,
            longitude,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to another point in kilometres.
    pub fn distance_km(&self, other: &Point) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

fn check_coordinate(
    record: usize,
    field: &'static str,
    value: f64,
    limit: f64,
    policy: CoordinatePolicy,
) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::InvalidCoordinate {
            record,
            field,
            value: value.to_string(),
            reason: "not a finite number".to_string(),
        });
    }
    if policy == CoordinatePolicy::Strict && !(-limit..=limit).contains(&value) {
        return Err(Error::InvalidCoordinate {
            record,
            field,
            value: value.to_string(),
            reason: format!("outside [-{limit}, {limit}]"),
        });
    }
    Ok(())
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.6}, {:.6})", self.id, self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let p = Point::new("HQ", 52.52, 13.405).unwrap();
        assert_eq!(p.id(), "HQ");
        assert_eq!(p.latitude(), 52.52);
        assert_eq!(p.longitude(), 13.405);
        assert!(p.is_in_range());
    }

    #[test]
    fn test_empty_id_is_missing_field() {
        let err = Point::new("  ", 0.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            Error::MissingField {
                record: 0,
                field: "site"
            }
        );
    }

    #[test]
    fn test_lenient_accepts_out_of_range() {
        let p = Point::new("X", 95.0, 200.0).unwrap();
        assert!(!p.is_in_range());
    }

    #[test]
    fn test_strict_rejects_out_of_range() {
        let err = Point::new_strict("X", 95.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidCoordinate {
                field: "latitude",
                ..
            }
        ));
        let err = Point::new_strict("X", 0.0, -180.5).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidCoordinate {
                field: "longitude",
                ..
            }
        ));
        assert!(Point::new_strict("X", -90.0, 180.0).is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Point::new("X", f64::NAN, 0.0).is_err());
        assert!(Point::new("X", 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let p: Point =
            serde_json::from_str(r#"{"id": "HQ", "latitude": 52.52, "longitude": 13.405}"#)
                .unwrap();
        assert_eq!(p, Point::new("HQ", 52.52, 13.405).unwrap());

        let blank = serde_json::from_str::<Point>(r#"{"id": "  ", "latitude": 0.0, "longitude": 0.0}"#);
        assert!(blank.is_err());
        let missing = serde_json::from_str::<Point>(r#"{"id": "HQ", "latitude": 0.0}"#);
        assert!(missing.is_err());
    }
}
