//! # nearsite - nearest site ranking by great-circle distance
//!
//! nearsite takes a collection of candidate sites and a collection of target
//! sites and reports, for every target, the K closest candidates using the
//! haversine formula on a 6371 km sphere.
//!
//! ## Modules
//!
//! - [`site`] - distance, ranking, routes, ingestion and exports
//! - [`error`] - Error types and handling
//! - [`config`] - Configuration loading and run settings
//! - [`logger`] - tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust
//! use nearsite::*;
//!
//! let candidates = vec![
//!     Point::new("Berlin", 52.52, 13.405).unwrap(),
//!     Point::new("Paris", 48.8566, 2.3522).unwrap(),
//!     Point::new("Madrid", 40.4168, -3.7038).unwrap(),
//! ];
//! let targets = vec![Point::new("Brussels", 50.8503, 4.3517).unwrap()];
//!
//! let report = rank_by_id(&candidates, &targets, 2).unwrap();
//! let brussels = report.get("Brussels").unwrap();
//! assert_eq!(brussels.ids(), vec!["Paris", "Berlin"]);
//!
//! let loop_km = brussels.route().total_km;
//! assert!(loop_km > 0.0);
//! ```

#![allow(ambiguous_glob_reexports)]

pub mod config;
pub mod error;
pub mod logger;
pub mod site;

pub use error::*;
pub use site::*;
