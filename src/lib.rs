//! # Strata
//!
//! Order-independent transparency with fixed-capacity per-pixel buckets.
//!
//! Transparent fragments may be submitted in any order and from any number
//! of threads; each pixel keeps at most `num_layers` depth-sorted entries,
//! merging the closest pair whenever a new fragment would overflow it. The
//! resolve pass composites the buckets back-to-front over the opaque scene.
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! let mut oit = OitRenderer::new(OitSettings::default())?;
//! oit.create(1280, 720)?;
//!
//! oit.set_screen_space_bounding_box(&bounds, &camera);
//! let stage = oit.gather_begin()?;
//! stage.draw(&fragments);
//! let stats = stage.end();
//!
//! let mut output = ColorBuffer::new(1280, 720, PremultipliedColor::TRANSPARENT)?;
//! oit.render_to_screen(&mut output)?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub use strata_core as core;
pub use strata_render as render;

pub use strata_core::errors;
pub use strata_core::{BoundingBox, Camera, ProjectionType, Result, StrataError};
pub use strata_render::{
    BoundingBoxTracker, ColorBuffer, DepthBuffer, Fragment, FragmentBucketStore, FragmentOutcome,
    FragmentRecord, FrameState, GatherStage, GatherStats, InsertOutcome, MAX_LAYERS, MergePolicy,
    MergeSite, OitProgram, OitRenderer, OitSettings, OitTechnique, PixelBucket,
    PremultipliedColor, SceneTargets, ShaderManager, SortedFragmentList, StatePreset,
};

pub use glam;

pub mod prelude {
    pub use crate::{
        BoundingBox, Camera, ColorBuffer, Fragment, MergePolicy, OitRenderer, OitSettings,
        OitTechnique, PremultipliedColor, Result, SceneTargets,
    };
}
