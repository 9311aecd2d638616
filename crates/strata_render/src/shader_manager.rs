//! Shader Template Manager
//!
//! Renders the WGSL programs of the bucketed OIT technique from minijinja
//! templates. The layer count and merge policy are baked into the source, so
//! a program always matches the storage layout it was built for.
//!
//! | Template              | Stage                    |
//! |-----------------------|--------------------------|
//! | `mlab_bucket_clear`   | compute: reset headers   |
//! | `mlab_bucket_gather`  | fragment: merge-insert   |
//! | `mlab_bucket_resolve` | fullscreen: composite    |
//!
//! Templates are embedded at compile time. When a shader directory is
//! configured, files found there take precedence, so edits are picked up by
//! the next [`ShaderManager::build_program`] call.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use minijinja::{Environment, Error, ErrorKind, context, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use strata_core::{Result, StrataError};
use xxhash_rust::xxh3::xxh3_128;

use crate::settings::MergePolicy;

pub const CLEAR_TEMPLATE: &str = "mlab_bucket_clear";
pub const GATHER_TEMPLATE: &str = "mlab_bucket_gather";
pub const RESOLVE_TEMPLATE: &str = "mlab_bucket_resolve";

#[derive(RustEmbed)]
#[folder = "src/shaders"]
struct ShaderAssets;

/// A complete set of generated programs for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OitProgram {
    pub clear_source: String,
    pub gather_source: String,
    pub resolve_source: String,
    pub num_layers: usize,
    pub merge_policy: MergePolicy,
    /// xxh3-128 of all three sources.
    pub hash: u128,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderManager {
    shader_dir: Option<PathBuf>,
}

impl ShaderManager {
    #[must_use]
    pub fn new(shader_dir: Option<PathBuf>) -> Self {
        Self { shader_dir }
    }

    /// Renders all templates for the given configuration.
    ///
    /// Nothing is cached between calls; a failure leaves no partial state.
    pub fn build_program(&self, num_layers: usize, merge_policy: MergePolicy) -> Result<OitProgram> {
        let env = self.environment()?;
        let ctx = context! {
            num_layers => num_layers,
            merge_policy => merge_policy.shader_name(),
        };

        let render = |name: &str| -> Result<String> {
            let source = env
                .get_template(name)
                .and_then(|template| template.render(&ctx))
                .map_err(|e| template_error(name, &e))?;
            Ok(format!("// === Auto-generated OIT Shader: {name} ===\n{source}"))
        };

        let clear_source = render(CLEAR_TEMPLATE)?;
        let gather_source = render(GATHER_TEMPLATE)?;
        let resolve_source = render(RESOLVE_TEMPLATE)?;

        let hash = xxh3_128(
            [clear_source.as_str(), gather_source.as_str(), resolve_source.as_str()]
                .concat()
                .as_bytes(),
        );

        log::debug!(
            "Built OIT program: {num_layers} layers, {merge_policy:?}, hash {hash:032x}"
        );
        log::trace!("Gather shader:\n{gather_source}");

        Ok(OitProgram {
            clear_source,
            gather_source,
            resolve_source,
            num_layers,
            merge_policy,
            hash,
        })
    }

    fn environment(&self) -> Result<Environment<'static>> {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .map_err(|e| template_error("<syntax>", &e))?;

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);

        let shader_dir = self.shader_dir.clone();
        env.set_loader(move |name| load_template(shader_dir.as_deref(), name));
        env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());

        Ok(env)
    }
}

fn load_template(shader_dir: Option<&Path>, name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    if let Some(dir) = shader_dir {
        let path = dir.join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read {}: {e}", path.display()),
                )
            });
        }
    }

    if let Some(file) = ShaderAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

fn template_error(template: &str, err: &Error) -> StrataError {
    StrataError::ShaderTemplate {
        template: template.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_program_bakes_configuration() {
        let program = ShaderManager::default()
            .build_program(6, MergePolicy::NearestPair)
            .unwrap();

        assert!(program.gather_source.contains("const NUM_LAYERS: u32 = 6u;"));
        assert!(program.gather_source.contains("array<FragmentNode, 7>"));
        assert!(program.gather_source.contains("best_gap"));
        assert!(program.gather_source.contains("atomicCompareExchangeWeak"));
        assert!(program.resolve_source.contains("fn fs_main"));
        assert!(!program.resolve_source.contains("pixel_locks"));
        assert!(program.clear_source.contains("fn clear_main"));
    }

    #[test]
    fn test_tail_policy_skips_gap_search() {
        let program = ShaderManager::default().build_program(4, MergePolicy::Tail).unwrap();
        assert!(!program.gather_source.contains("best_gap"));
        assert!(program.gather_source.contains("fold_overflow(pixel, candidates[NUM_LAYERS]);"));
    }

    #[test]
    fn test_gather_breaks_depth_ties_on_color() {
        let program = ShaderManager::default()
            .build_program(4, MergePolicy::NearestPair)
            .unwrap();
        assert!(program.gather_source.contains("fn node_before"));
        assert!(program.gather_source.contains("node_before(incoming, entry)"));
        assert!(program.clear_source.contains("overflow_depth = OVERFLOW_DEPTH"));
    }

    fn validate_wgsl(name: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("{name} failed to parse:\n{}", e.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{name} failed validation: {e:?}"));
    }

    #[test]
    fn test_generated_programs_are_valid_wgsl() {
        let manager = ShaderManager::default();
        for policy in [MergePolicy::NearestPair, MergePolicy::Tail] {
            for num_layers in [1, 8, crate::settings::MAX_LAYERS] {
                let program = manager.build_program(num_layers, policy).unwrap();
                let label = format!("{policy:?}/{num_layers}");
                validate_wgsl(&format!("{CLEAR_TEMPLATE} ({label})"), &program.clear_source);
                validate_wgsl(&format!("{GATHER_TEMPLATE} ({label})"), &program.gather_source);
                validate_wgsl(&format!("{RESOLVE_TEMPLATE} ({label})"), &program.resolve_source);
            }
        }
    }

    #[test]
    fn test_hash_tracks_configuration() {
        let manager = ShaderManager::default();
        let a = manager.build_program(4, MergePolicy::NearestPair).unwrap();
        let b = manager.build_program(4, MergePolicy::NearestPair).unwrap();
        let c = manager.build_program(8, MergePolicy::NearestPair).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }
}
