//! Strata Render
//!
//! Bucketed order-independent transparency. Translucent fragments arrive in
//! arbitrary order from many threads and are merge-inserted into a
//! fixed-capacity, depth-sorted bucket per pixel; a resolve pass composites
//! each bucket back-to-front over the opaque scene.
//!
//! - [`OitRenderer`]: lifecycle facade (create / gather / resolve / reconfigure)
//! - [`FragmentBucketStore`] and [`PixelBucket`]: per-pixel bounded storage
//! - [`GatherStage`]: concurrent fragment submission for one frame
//! - [`ShaderManager`]: WGSL programs generated for the active configuration

pub mod bucket;
pub mod depth_range;
pub mod fragment;
pub mod passes;
pub mod renderer;
pub mod settings;
pub mod shader_manager;
pub mod sorted;
pub mod store;
pub mod targets;
pub mod technique;

pub use bucket::{InsertOutcome, MergeSite, PixelBucket};
pub use depth_range::{BoundingBoxTracker, FrameState};
pub use fragment::{Fragment, FragmentRecord, PremultipliedColor};
pub use passes::{ClearPass, FragmentOutcome, GatherStage, GatherStats, ResolvePass};
pub use renderer::OitRenderer;
pub use settings::{MergePolicy, OitSettings, OitTechnique, StatePreset, MAX_LAYERS};
pub use shader_manager::{OitProgram, ShaderManager};
pub use sorted::SortedFragmentList;
pub use store::FragmentBucketStore;
pub use targets::{ColorBuffer, DepthBuffer, SceneTargets};
pub use technique::TechniqueStorage;
