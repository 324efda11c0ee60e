//! Map pins for tree-atlas records.
//!
//! Tree locations live in a free-form `location` column that has been written
//! in several encodings over the years. [`location`] turns any of them into an
//! ordered list of validated [`Pin`]s, [`icon`] picks a marker for each pin,
//! and [`tree`] ties both to the records served by `GET /api/trees`.

#[cfg(feature = "api")]
pub mod api;
pub mod error;
pub mod geo;
pub mod icon;
pub mod location;
pub mod render;
pub mod tree;

pub use error::Error;
pub use geo::Coordinate;
pub use location::{LocationShape, Pin, parse_all_coordinates, parse_primary_coordinate};
pub use tree::TreeRecord;
