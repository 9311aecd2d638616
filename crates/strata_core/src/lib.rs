//! Strata Core
//!
//! Foundational types shared by the Strata crates:
//!
//! - [`errors`]: the [`StrataError`] type and [`Result`] alias
//! - [`BoundingBox`]: axis-aligned bounding volume
//! - [`Camera`]: projection + view transform used to derive per-frame depth ranges

pub mod bounding_box;
pub mod camera;
pub mod errors;

pub use bounding_box::BoundingBox;
pub use camera::{Camera, ProjectionType};
pub use errors::{Result, StrataError};
