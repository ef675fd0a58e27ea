//! Chart trends library - shared modules for the pipeline binary.
//!
//! Flow: CSV → [`loader`] → [`clean`] → [`slice`] → [`aggregate`] → [`store`].

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod slice;
pub mod store;

pub use aggregate::{compute_reports, Reports};
pub use clean::{clean, clean_with_stats};
pub use error::{PipelineError, Stage};
pub use models::{Dataset, Record};
pub use slice::{slice_by_countries, CountrySlice, CountrySlices};
pub use store::{IfExists, Store};
