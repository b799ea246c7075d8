pub mod data;
pub mod distance;
pub mod logging;
pub mod rank;
pub mod report;
pub mod route;
pub mod types;
pub mod viz;

// Re-export commonly used types and functions for convenience
pub use data::*;
pub use distance::*;
pub use logging::*;
pub use rank::*;
pub use report::*;
pub use route::*;
pub use types::*;
pub use viz::*;
