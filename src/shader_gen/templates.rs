//! Legacy Template Path
//!
//! The older pipeline ships one hand-written pixel shader per dialect whose
//! header is a block of `#define FEATURE_*` switches. A variation is produced by
//! textually dropping disabled switches and rewriting valued ones.
//!
//! Templates are embedded with `rust-embed` and can be overridden from a
//! directory on disk. [`TemplateCache`] loads each `(base name, dialect)` once;
//! concurrent first loads simply read the same file twice.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::config::{AlbedoSource, ShaderConfig};
use crate::shader_gen::dialect::Dialect;

#[derive(RustEmbed)]
#[folder = "src/shader_gen/shaders"]
struct ShaderAssets;

/// Base name of the legacy pixel shader template.
pub const PIXEL_TEMPLATE: &str = "pixel_main";

/// Line that closes the rewritable header region.
pub const HEADER_END_MARKER: &str = "// @end-features";

/// Header lines scanned when the end marker is missing.
pub const MAX_HEADER_LINES: usize = 64;

#[derive(Debug, Default)]
pub struct TemplateCache {
    directory: Option<PathBuf>,
    entries: RwLock<FxHashMap<(String, Dialect), Arc<str>>>,
}

impl TemplateCache {
    /// Cache reading only the embedded templates.
    #[must_use]
    pub fn embedded() -> Self {
        Self::default()
    }

    /// Cache reading templates from `directory` instead of the embedded set.
    #[must_use]
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            entries: RwLock::default(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Returns the template source, loading it on first use.
    pub fn get_or_load(&self, base: &str, dialect: Dialect) -> Result<Arc<str>> {
        let key = (base.to_string(), dialect);
        if let Some(source) = self.entries.read().get(&key) {
            return Ok(source.clone());
        }

        let source = self.load(base, dialect)?;
        let mut entries = self.entries.write();
        Ok(entries.entry(key).or_insert(source).clone())
    }

    fn load(&self, base: &str, dialect: Dialect) -> Result<Arc<str>> {
        let filename = format!("{base}.{}", dialect.file_extension());

        if let Some(directory) = &self.directory {
            let path = directory.join(&filename);
            log::debug!("Loading shader template {}", path.display());
            match std::fs::read_to_string(&path) {
                Ok(source) => return Ok(source.into()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("{} not found, using the embedded template", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(file) = ShaderAssets::get(&filename)
            && let Ok(source) = std::str::from_utf8(file.data.as_ref())
        {
            return Ok(source.into());
        }

        Err(TesseraError::TemplateNotFound(filename))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// `#define` switches and values a config selects in a legacy template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDefines {
    switches: Vec<(&'static str, bool)>,
    values: Vec<(&'static str, String)>,
}

impl FeatureDefines {
    /// Defines for an already propagated config.
    #[must_use]
    pub fn from_config(config: &ShaderConfig) -> Self {
        let (a, n, l) = (&config.albedo, &config.normals, &config.lighting);
        let switches = vec![
            ("FEATURE_ALBEDO_COLOR", a.source == AlbedoSource::Color),
            ("FEATURE_ALBEDO_VERTEX_COLOR", a.source == AlbedoSource::VertexColor),
            ("FEATURE_ALBEDO_TEXTURE", a.source == AlbedoSource::SampleTexMain),
            ("FEATURE_NORMAL_MAP", n.use_normal_maps),
            ("FEATURE_PARALLAX", n.use_parallax),
            ("FEATURE_LIGHTING", l.apply_lighting),
            ("FEATURE_AMBIENT", l.use_ambient),
            ("FEATURE_LIGHT_MAP", l.use_light_maps),
            ("FEATURE_LIGHT_SOURCES", l.use_light_sources),
            ("FEATURE_SHADOW_MAP", l.use_shadow_maps),
            ("FEATURE_INDIRECT_LIGHT", l.indirect.divisor() != 0),
        ];
        let values = vec![
            ("ALBEDO_COLOR", a.color.ordinal().to_string()),
            ("LIGHTING_MODEL", l.model.ordinal().to_string()),
            ("SHADOW_SAMPLES", l.shadow_kernel().to_string()),
            ("INDIRECT_RESOLUTION", l.indirect.divisor().max(1).to_string()),
        ];
        Self { switches, values }
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.switches.iter().find(|(n, _)| *n == name).map(|(_, on)| *on)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
    }
}

/// Rewrites the header region of `template`: disabled switches are removed,
/// valued defines get their configured value. Everything after the header and
/// every unknown define is kept verbatim.
#[must_use]
pub fn rewrite_feature_defines(template: &str, defines: &FeatureDefines) -> String {
    let mut out = String::with_capacity(template.len());
    let mut in_header = true;

    for (index, line) in template.split_inclusive('\n').enumerate() {
        if !in_header {
            out.push_str(line);
            continue;
        }
        if index >= MAX_HEADER_LINES || line.trim_end() == HEADER_END_MARKER {
            in_header = false;
            out.push_str(line);
            continue;
        }

        let Some(name) = line.trim_start().strip_prefix("#define ").and_then(|rest| rest.split_whitespace().next())
        else {
            out.push_str(line);
            continue;
        };

        if let Some(enabled) = defines.is_enabled(name) {
            if enabled {
                out.push_str(line);
            }
        } else if let Some(value) = defines.value(name) {
            out.push_str("#define ");
            out.push_str(name);
            out.push(' ');
            out.push_str(value);
            out.push('\n');
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "#define FEATURE_LIGHTING\n#define FEATURE_AMBIENT\n#define LIGHTING_MODEL 0\n#define CUSTOM 3\n// @end-features\n#define FEATURE_AMBIENT\nbody\n";

    #[test]
    fn test_rewrite_header_only() {
        let config = ShaderConfig::default();
        let out = rewrite_feature_defines(TEMPLATE, &FeatureDefines::from_config(&config));
        assert_eq!(
            out,
            "#define LIGHTING_MODEL 0\n#define CUSTOM 3\n// @end-features\n#define FEATURE_AMBIENT\nbody\n"
        );
    }

    #[test]
    fn test_enabled_switches_and_values() {
        let mut config = ShaderConfig::default();
        config.lighting.apply_lighting = true;
        config.lighting.use_ambient = true;
        config.lighting.use_light_sources = true;
        config.lighting.model = crate::shader_gen::config::LightingModel::BlinnPhong;
        let out = rewrite_feature_defines(TEMPLATE, &FeatureDefines::from_config(&config));
        assert!(out.starts_with("#define FEATURE_LIGHTING\n#define FEATURE_AMBIENT\n#define LIGHTING_MODEL 2\n"));
    }

    #[test]
    fn test_header_bounded_without_marker() {
        let mut template = "// filler\n".repeat(MAX_HEADER_LINES);
        template.push_str("#define FEATURE_PARALLAX\n");
        let out = rewrite_feature_defines(&template, &FeatureDefines::from_config(&ShaderConfig::default()));
        assert!(out.ends_with("#define FEATURE_PARALLAX\n"));
    }

    #[test]
    fn test_embedded_templates_cached() {
        let cache = TemplateCache::embedded();
        for dialect in Dialect::ALL {
            let first = cache.get_or_load(PIXEL_TEMPLATE, dialect).unwrap();
            let second = cache.get_or_load(PIXEL_TEMPLATE, dialect).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert!(first.contains(HEADER_END_MARKER));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let cache = TemplateCache::with_directory("/nonexistent/tessera/templates");
        let source = cache.get_or_load(PIXEL_TEMPLATE, Dialect::Glsl).unwrap();
        assert!(source.starts_with("#version 450"));
    }

    #[test]
    fn test_missing_template() {
        let cache = TemplateCache::embedded();
        assert!(matches!(
            cache.get_or_load("does_not_exist", Dialect::Hlsl),
            Err(TesseraError::TemplateNotFound(_))
        ));
    }
}
