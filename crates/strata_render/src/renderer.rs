//! OIT Renderer
//!
//! Lifecycle facade sequencing the transparency passes:
//!
//! ```text
//! create / resolution_changed
//!   └─► [per frame] set_screen_space_bounding_box
//!         └─► gather_begin (ClearPass) ─► draw ... ─► GatherStage::end
//!               └─► render_to_screen (ResolvePass)
//! ```
//!
//! The renderer owns every resource it touches (fragment storage, scene
//! targets, active shader program). Their lifetime is tied to `create` and
//! `resolution_changed`; reconfiguration reallocates storage, which leaves
//! every bucket empty before the next gather.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut oit = OitRenderer::new(OitSettings::default())?;
//! oit.create(1280, 720)?;
//!
//! // per frame
//! oit.set_screen_space_bounding_box(&bounds, &camera);
//! let stage = oit.gather_begin()?;
//! stage.draw(&fragments);
//! stage.end();
//! oit.render_to_screen(&mut output)?;
//! ```

use std::sync::Arc;

use strata_core::{BoundingBox, Camera, Result, StrataError};

use crate::depth_range::{BoundingBoxTracker, FrameState};
use crate::fragment::PremultipliedColor;
use crate::passes::gather::{FramePhase, GatherTarget};
use crate::passes::{ClearPass, GatherStage, GatherStats, ResolvePass};
use crate::settings::{MergePolicy, OitSettings, OitTechnique, StatePreset, validate_layers};
use crate::shader_manager::{OitProgram, ShaderManager};
use crate::sorted::SortedFragmentList;
use crate::store::FragmentBucketStore;
use crate::targets::{ColorBuffer, SceneTargets};
use crate::technique::TechniqueStorage;

pub struct OitRenderer {
    settings: OitSettings,
    shaders: ShaderManager,
    program: Arc<OitProgram>,
    tracker: BoundingBoxTracker,

    storage: Option<TechniqueStorage>,
    scene: Option<SceneTargets>,

    phase: FramePhase,
    last_stats: GatherStats,
}

impl OitRenderer {
    /// Validates `settings` and builds the initial program. No storage is
    /// allocated until [`create`](Self::create).
    pub fn new(settings: OitSettings) -> Result<Self> {
        settings.validate()?;

        let shaders = ShaderManager::new(settings.shader_dir.clone());
        let program = shaders.build_program(settings.num_layers, settings.merge_policy)?;

        log::info!(
            "OIT renderer: {:?}, {} layers, {:?}",
            settings.technique,
            settings.num_layers,
            settings.merge_policy
        );

        Ok(Self {
            settings,
            shaders,
            program: Arc::new(program),
            tracker: BoundingBoxTracker::new(),
            storage: None,
            scene: None,
            phase: FramePhase::Cleared,
            last_stats: GatherStats::default(),
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Allocates fragment storage and scene targets for `width × height`.
    ///
    /// Allocation failure is returned to the caller and leaves the renderer
    /// without storage.
    pub fn create(&mut self, width: u32, height: u32) -> Result<()> {
        self.storage = None;
        self.scene = None;

        let scene = SceneTargets::new(width, height, PremultipliedColor::BLACK)?;
        self.install(scene)?;

        log::info!("OIT storage created at {width}x{height}");
        Ok(())
    }

    /// Reallocates storage to the resolution of `scene` and composites
    /// against it from now on.
    pub fn resolution_changed(&mut self, scene: SceneTargets) -> Result<()> {
        let color = scene.color.resolution();
        let depth = scene.depth.resolution();
        if color != depth {
            return Err(StrataError::TargetSizeMismatch {
                expected: color,
                actual: depth,
            });
        }

        self.storage = None;
        self.scene = None;
        self.install(scene)?;

        log::info!("OIT storage resized to {}x{}", color.0, color.1);
        Ok(())
    }

    fn install(&mut self, scene: SceneTargets) -> Result<()> {
        let (width, height) = scene.resolution();
        let storage = TechniqueStorage::allocate(
            self.settings.technique,
            width,
            height,
            self.settings.num_layers,
        )?;

        self.storage = Some(storage);
        self.scene = Some(scene);
        self.phase = FramePhase::Cleared;
        self.last_stats = GatherStats::default();
        Ok(())
    }

    /// Clears all storage and opens the gather window for this frame.
    pub fn gather_begin(&mut self) -> Result<GatherStage<'_>> {
        let Self {
            settings,
            tracker,
            storage,
            scene,
            phase,
            last_stats,
            ..
        } = self;

        let storage = storage.as_mut().ok_or(StrataError::NotCreated)?;

        // Scene targets are reachable through `scene_targets_mut`, so their
        // size is rechecked every frame.
        if let Some(scene) = scene.as_ref() {
            let expected = storage.resolution();
            for actual in [scene.color.resolution(), scene.depth.resolution()] {
                if actual != expected {
                    return Err(StrataError::TargetSizeMismatch { expected, actual });
                }
            }
        }

        ClearPass::run(storage);
        *phase = FramePhase::Cleared;

        let target = match &*storage {
            TechniqueStorage::Bucket(store) => GatherTarget::Bucket {
                store,
                policy: settings.merge_policy,
            },
            TechniqueStorage::SortedList(list) => GatherTarget::SortedList(list),
        };
        let scene_depth = if settings.depth_test {
            scene.as_ref().map(|s| &s.depth)
        } else {
            None
        };

        Ok(GatherStage::new(
            target,
            tracker.frame_state(),
            scene_depth,
            phase,
            last_stats,
        ))
    }

    /// Composites the gathered fragments over the scene color into `output`.
    pub fn render_to_screen(&mut self, output: &mut ColorBuffer) -> Result<()> {
        let storage = self.storage.as_mut().ok_or(StrataError::NotCreated)?;
        let scene = self.scene.as_ref().ok_or(StrataError::NotCreated)?;

        if self.phase != FramePhase::Gathered {
            log::debug!("render_to_screen without a gather this frame, compositing empty storage");
        }
        ResolvePass::run(storage, &scene.color, output)
    }

    // ========================================================================
    // Reconfiguration
    // ========================================================================

    /// Switches the layer count and merge policy. The program is rebuilt
    /// first; on any failure the previous configuration stays in force.
    pub fn update_layer_mode(&mut self, num_layers: usize, merge_policy: MergePolicy) -> Result<()> {
        self.reconfigure(self.settings.technique, num_layers, merge_policy)
    }

    /// Re-renders the shader templates. On failure the active program is
    /// kept and the error is returned.
    pub fn reload_shaders(&mut self) -> Result<()> {
        match self
            .shaders
            .build_program(self.settings.num_layers, self.settings.merge_policy)
        {
            Ok(program) => {
                if program.hash != self.program.hash {
                    log::info!("OIT shaders reloaded (hash {:032x})", program.hash);
                }
                self.program = Arc::new(program);
                self.clear_storage();
                Ok(())
            }
            Err(e) => {
                log::warn!("OIT shader reload failed, keeping previous program: {e}");
                Err(e)
            }
        }
    }

    /// Applies an externally supplied configuration (technique, layers, policy).
    pub fn set_new_state(&mut self, state: &StatePreset) -> Result<()> {
        log::info!("Applying OIT state '{}'", state.name);
        self.reconfigure(state.technique, state.num_layers, state.merge_policy)
    }

    /// Publishes the depth range of the transparent geometry for this frame.
    pub fn set_screen_space_bounding_box(
        &mut self,
        bounding_box: &BoundingBox,
        camera: &Camera,
    ) -> FrameState {
        self.tracker.set_screen_space_bounding_box(bounding_box, camera)
    }

    fn reconfigure(
        &mut self,
        technique: OitTechnique,
        num_layers: usize,
        merge_policy: MergePolicy,
    ) -> Result<()> {
        validate_layers(num_layers)?;

        let program = if num_layers == self.program.num_layers
            && merge_policy == self.program.merge_policy
        {
            Arc::clone(&self.program)
        } else {
            Arc::new(self.shaders.build_program(num_layers, merge_policy)?)
        };

        let storage = match &self.storage {
            Some(current) => {
                let (width, height) = current.resolution();
                Some(TechniqueStorage::allocate(technique, width, height, num_layers)?)
            }
            None => None,
        };

        self.settings.technique = technique;
        self.settings.num_layers = num_layers;
        self.settings.merge_policy = merge_policy;
        self.program = program;
        if storage.is_some() {
            self.storage = storage;
        }
        self.phase = FramePhase::Cleared;
        self.last_stats = GatherStats::default();

        log::info!("OIT reconfigured: {technique:?}, {num_layers} layers, {merge_policy:?}");
        Ok(())
    }

    fn clear_storage(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            ClearPass::run(storage);
        }
        self.phase = FramePhase::Cleared;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &OitSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn technique(&self) -> OitTechnique {
        self.settings.technique
    }

    /// The active program. Shared so callers can hold it across reloads.
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Arc<OitProgram> {
        &self.program
    }

    #[inline]
    #[must_use]
    pub fn frame_state(&self) -> FrameState {
        self.tracker.frame_state()
    }

    /// Counters of the most recent gather window.
    #[inline]
    #[must_use]
    pub fn last_stats(&self) -> GatherStats {
        self.last_stats
    }

    #[must_use]
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.storage.as_ref().map(TechniqueStorage::resolution)
    }

    #[must_use]
    pub fn bucket_store(&self) -> Option<&FragmentBucketStore> {
        self.storage.as_ref().and_then(TechniqueStorage::as_bucket_store)
    }

    #[must_use]
    pub fn sorted_list(&self) -> Option<&SortedFragmentList> {
        self.storage.as_ref().and_then(TechniqueStorage::as_sorted_list)
    }

    #[must_use]
    pub fn scene_targets(&self) -> Option<&SceneTargets> {
        self.scene.as_ref()
    }

    /// Scene color/depth for the opaque pass to render into.
    pub fn scene_targets_mut(&mut self) -> Option<&mut SceneTargets> {
        self.scene.as_mut()
    }
}

impl std::fmt::Debug for OitRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OitRenderer")
            .field("settings", &self.settings)
            .field("resolution", &self.resolution())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
