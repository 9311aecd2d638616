//! OIT Passes
//!
//! - [`ClearPass`]: empties all per-pixel storage at the start of a frame
//! - [`GatherStage`]: synchronized merge-insertion of incoming fragments
//! - [`ResolvePass`]: back-to-front compositing onto the scene color

pub mod clear;
pub mod gather;
pub mod resolve;

pub use clear::ClearPass;
pub use gather::{FragmentOutcome, GatherStage, GatherStats};
pub use resolve::ResolvePass;
