//! Shader Configuration
//!
//! [`ShaderConfig`] is the serializable set of toggles that selects which
//! features a generated shader contains. It round-trips through a compact
//! descriptor string used both as a readable variant tag and as a cache key:
//!
//! ```text
//! A<src><color><sampler>_N<normal><parallax><sampler>_L<apply><ambient><lightmaps><sources><shadows><model><samples>r<indirect>_V<extended><blend><anim>
//! Ac00_Nnn0_Ln0000l0r0_V000
//! ```

use std::fmt;
use std::hash::BuildHasher;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::variant::VertexDataFlags;

/// Declares a config enum whose ordinal is its descriptor digit.
macro_rules! config_enum {
    ($(#[$meta:meta])* $name:ident { $default:ident $(, $variant:ident)* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $default,
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$name::$default, $($name::$variant,)*];

            #[inline]
            #[must_use]
            pub fn ordinal(self) -> u8 {
                self as u8
            }

            #[must_use]
            pub fn from_ordinal(ordinal: u8) -> Option<Self> {
                Self::ALL.get(usize::from(ordinal)).copied()
            }

            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $name::$default => stringify!($default),
                    $($name::$variant => stringify!($variant),)*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

config_enum! {
    /// Where the base colour comes from.
    AlbedoSource { Color, VertexColor, SampleTexMain }
}

config_enum! {
    AlbedoColor { White, Black, Grey, Red, Green, Blue }
}

config_enum! {
    SamplerFilter { Linear, Point, Anisotropic }
}

config_enum! {
    /// Ordered by cost; `max` picks the more expensive model.
    LightingModel { Lambert, Phong, BlinnPhong }
}

config_enum! {
    /// Resolution of the screen-space indirect lighting buffer.
    IndirectResolution { Off, Quarter, Half, Full }
}

impl AlbedoSource {
    fn code(self) -> char {
        match self {
            Self::Color => 'c',
            Self::VertexColor => 'v',
            Self::SampleTexMain => 't',
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            'c' => Some(Self::Color),
            'v' => Some(Self::VertexColor),
            't' => Some(Self::SampleTexMain),
            _ => None,
        }
    }
}

impl AlbedoColor {
    /// RGBA literal components.
    #[must_use]
    pub fn rgba(self) -> [&'static str; 4] {
        match self {
            Self::White => ["1.0", "1.0", "1.0", "1.0"],
            Self::Black => ["0.0", "0.0", "0.0", "1.0"],
            Self::Grey => ["0.5", "0.5", "0.5", "1.0"],
            Self::Red => ["1.0", "0.0", "0.0", "1.0"],
            Self::Green => ["0.0", "1.0", "0.0", "1.0"],
            Self::Blue => ["0.0", "0.0", "1.0", "1.0"],
        }
    }
}

impl LightingModel {
    fn code(self) -> char {
        match self {
            Self::Lambert => 'l',
            Self::Phong => 'p',
            Self::BlinnPhong => 'b',
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            'l' => Some(Self::Lambert),
            'p' => Some(Self::Phong),
            'b' => Some(Self::BlinnPhong),
            _ => None,
        }
    }
}

impl IndirectResolution {
    /// Screen-to-buffer downscale factor; zero when off.
    #[must_use]
    pub fn divisor(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::Quarter => 4,
            Self::Half => 2,
            Self::Full => 1,
        }
    }
}

/// Largest accepted shadow sample count (a 4x4 PCF kernel).
pub const MAX_SHADOW_SAMPLES: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbedoConfig {
    pub source: AlbedoSource,
    pub color: AlbedoColor,
    pub sampler: SamplerFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalsConfig {
    pub use_normal_maps: bool,
    pub use_parallax: bool,
    pub sampler: SamplerFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub apply_lighting: bool,
    pub use_ambient: bool,
    pub use_light_maps: bool,
    pub use_light_sources: bool,
    pub use_shadow_maps: bool,
    pub model: LightingModel,
    pub shadow_samples: u8,
    pub indirect: IndirectResolution,
}

impl LightingConfig {
    /// Side of the square PCF kernel covering `shadow_samples`.
    #[must_use]
    pub fn shadow_kernel(&self) -> u8 {
        let samples = self.shadow_samples.clamp(1, MAX_SHADOW_SAMPLES);
        (1..=4).find(|k| k * k >= samples).unwrap_or(4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexConfig {
    pub extended: bool,
    pub blend_shapes: bool,
    pub animations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub albedo: AlbedoConfig,
    pub normals: NormalsConfig,
    pub lighting: LightingConfig,
    pub vertex: VertexConfig,
}

impl ShaderConfig {
    /// Resets every setting whose prerequisite is off. Idempotent.
    pub fn propagate_flag_states_to_hierarchy(&mut self) {
        let albedo = &mut self.albedo;
        if albedo.source != AlbedoSource::Color {
            albedo.color = AlbedoColor::default();
        }
        if albedo.source != AlbedoSource::SampleTexMain {
            albedo.sampler = SamplerFilter::default();
        }

        let normals = &mut self.normals;
        if !normals.use_normal_maps {
            normals.use_parallax = false;
            normals.sampler = SamplerFilter::default();
        }

        let lighting = &mut self.lighting;
        if !lighting.apply_lighting {
            lighting.use_ambient = false;
            lighting.use_light_maps = false;
            lighting.use_light_sources = false;
        }
        if !lighting.use_light_sources {
            lighting.use_shadow_maps = false;
            lighting.model = LightingModel::default();
            lighting.indirect = IndirectResolution::default();
        }
        if lighting.use_shadow_maps {
            lighting.shadow_samples = lighting.shadow_samples.clamp(1, MAX_SHADOW_SAMPLES);
        } else {
            lighting.shadow_samples = 0;
        }
    }

    /// Copy with [`propagate_flag_states_to_hierarchy`](Self::propagate_flag_states_to_hierarchy) applied.
    #[must_use]
    pub fn propagated(mut self) -> Self {
        self.propagate_flag_states_to_hierarchy();
        self
    }

    /// Superset of two configs: OR of toggles, max of counts and ordinals.
    #[must_use]
    pub fn max(a: &Self, b: &Self, propagate_after: bool) -> Self {
        let mut out = Self {
            albedo: AlbedoConfig {
                source: a.albedo.source.max(b.albedo.source),
                color: a.albedo.color.max(b.albedo.color),
                sampler: a.albedo.sampler.max(b.albedo.sampler),
            },
            normals: NormalsConfig {
                use_normal_maps: a.normals.use_normal_maps || b.normals.use_normal_maps,
                use_parallax: a.normals.use_parallax || b.normals.use_parallax,
                sampler: a.normals.sampler.max(b.normals.sampler),
            },
            lighting: LightingConfig {
                apply_lighting: a.lighting.apply_lighting || b.lighting.apply_lighting,
                use_ambient: a.lighting.use_ambient || b.lighting.use_ambient,
                use_light_maps: a.lighting.use_light_maps || b.lighting.use_light_maps,
                use_light_sources: a.lighting.use_light_sources || b.lighting.use_light_sources,
                use_shadow_maps: a.lighting.use_shadow_maps || b.lighting.use_shadow_maps,
                model: a.lighting.model.max(b.lighting.model),
                shadow_samples: a.lighting.shadow_samples.max(b.lighting.shadow_samples),
                indirect: a.lighting.indirect.max(b.lighting.indirect),
            },
            vertex: VertexConfig {
                extended: a.vertex.extended || b.vertex.extended,
                blend_shapes: a.vertex.blend_shapes || b.vertex.blend_shapes,
                animations: a.vertex.animations || b.vertex.animations,
            },
        };
        if propagate_after {
            out.propagate_flag_states_to_hierarchy();
        }
        out
    }

    /// Basic plus every combination of the enabled optional vertex structs.
    #[must_use]
    pub fn requested_variants(&self) -> SmallVec<[VertexDataFlags; 8]> {
        let optional: SmallVec<[VertexDataFlags; 3]> = [
            (self.vertex.extended, VertexDataFlags::EXTENDED),
            (self.vertex.blend_shapes, VertexDataFlags::BLEND_SHAPES),
            (self.vertex.animations, VertexDataFlags::ANIMATIONS),
        ]
        .into_iter()
        .filter_map(|(enabled, flag)| enabled.then_some(flag))
        .collect();

        (0..1u32 << optional.len())
            .map(|mask| {
                optional
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .fold(VertexDataFlags::BASIC, |acc, (_, flag)| acc | *flag)
            })
            .collect()
    }

    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        FxBuildHasher.hash_one(self)
    }

    /// Canonical descriptor string.
    #[must_use]
    pub fn create_description_txt(&self) -> String {
        self.to_string()
    }

    /// Strict descriptor parse; never returns a partially parsed config.
    pub fn try_parse_description_txt(text: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut seen = [false; 4];

        for section in text.split('_') {
            let invalid = |reason: String| TesseraError::InvalidDescriptor {
                text: text.to_string(),
                reason,
            };

            let mut chars = section.chars();
            let Some(letter) = chars.next() else {
                return Err(invalid("empty section".to_string()));
            };
            let index = match letter {
                'A' => 0,
                'N' => 1,
                'L' => 2,
                'V' => 3,
                other => return Err(invalid(format!("unknown section `{other}`"))),
            };
            if std::mem::replace(&mut seen[index], true) {
                return Err(invalid(format!("duplicate section `{letter}`")));
            }

            let mut cursor = Cursor {
                chars: chars.peekable(),
                section: letter,
            };
            let parsed = match letter {
                'A' => cursor.albedo(&mut config.albedo),
                'N' => cursor.normals(&mut config.normals),
                'L' => cursor.lighting(&mut config.lighting),
                _ => cursor.vertex(&mut config.vertex),
            };
            parsed.and_then(|()| cursor.finish()).map_err(invalid)?;
        }

        Ok(config)
    }

    /// Parses `text`, falling back to the default config on any error.
    #[must_use]
    pub fn parse_or_default(text: &str) -> Self {
        match Self::try_parse_description_txt(text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{e}; using the default shader config");
                Self::default()
            }
        }
    }
}

fn yn(value: bool) -> char {
    if value { 'y' } else { 'n' }
}

fn bit(value: bool) -> char {
    if value { '1' } else { '0' }
}

impl fmt::Display for ShaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, n, l, v) = (&self.albedo, &self.normals, &self.lighting, &self.vertex);
        write!(
            f,
            "A{}{}{}_N{}{}{}_L{}{}{}{}{}{}{}r{}_V{}{}{}",
            a.source.code(),
            a.color.ordinal(),
            a.sampler.ordinal(),
            yn(n.use_normal_maps),
            yn(n.use_parallax),
            n.sampler.ordinal(),
            yn(l.apply_lighting),
            bit(l.use_ambient),
            bit(l.use_light_maps),
            bit(l.use_light_sources),
            bit(l.use_shadow_maps),
            l.model.code(),
            l.shadow_samples,
            l.indirect.ordinal(),
            bit(v.extended),
            bit(v.blend_shapes),
            bit(v.animations),
        )
    }
}

impl FromStr for ShaderConfig {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse_description_txt(s)
    }
}

type FieldResult<T> = std::result::Result<T, String>;

/// Reads one section's fields; `None` means the section ended early.
struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    section: char,
}

impl Cursor<'_> {
    fn next_with<T>(&mut self, field: &str, decode: impl FnOnce(char) -> Option<T>) -> FieldResult<Option<T>> {
        let Some(c) = self.chars.next() else {
            return Ok(None);
        };
        decode(c)
            .map(Some)
            .ok_or_else(|| format!("unrecognised {field} `{c}` in section `{}`", self.section))
    }

    fn yn(&mut self, field: &str) -> FieldResult<Option<bool>> {
        self.next_with(field, |c| match c {
            'y' => Some(true),
            'n' => Some(false),
            _ => None,
        })
    }

    fn bit(&mut self, field: &str) -> FieldResult<Option<bool>> {
        self.next_with(field, |c| match c {
            '1' => Some(true),
            '0' => Some(false),
            _ => None,
        })
    }

    fn ordinal<T>(&mut self, field: &str, from_ordinal: fn(u8) -> Option<T>) -> FieldResult<Option<T>> {
        self.next_with(field, |c| {
            c.to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .and_then(from_ordinal)
        })
    }

    fn number(&mut self, field: &str) -> FieldResult<Option<u8>> {
        let mut digits = String::new();
        while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
            digits.push(c);
        }
        if digits.is_empty() {
            return Ok(None);
        }
        digits
            .parse::<u8>()
            .map(Some)
            .map_err(|_| format!("{field} `{digits}` out of range"))
    }

    fn finish(&mut self) -> FieldResult<()> {
        match self.chars.next() {
            None => Ok(()),
            Some(c) => Err(format!("trailing `{c}` in section `{}`", self.section)),
        }
    }

    fn albedo(&mut self, a: &mut AlbedoConfig) -> FieldResult<()> {
        let Some(source) = self.next_with("albedo source", AlbedoSource::from_code)? else {
            return Ok(());
        };
        a.source = source;
        let Some(color) = self.ordinal("albedo color", AlbedoColor::from_ordinal)? else {
            return Ok(());
        };
        a.color = color;
        if let Some(sampler) = self.ordinal("albedo sampler", SamplerFilter::from_ordinal)? {
            a.sampler = sampler;
        }
        Ok(())
    }

    fn normals(&mut self, n: &mut NormalsConfig) -> FieldResult<()> {
        let Some(normal_maps) = self.yn("normal map flag")? else {
            return Ok(());
        };
        n.use_normal_maps = normal_maps;
        let Some(parallax) = self.yn("parallax flag")? else {
            return Ok(());
        };
        n.use_parallax = parallax;
        if let Some(sampler) = self.ordinal("normal sampler", SamplerFilter::from_ordinal)? {
            n.sampler = sampler;
        }
        Ok(())
    }

    fn lighting(&mut self, l: &mut LightingConfig) -> FieldResult<()> {
        let Some(apply) = self.yn("lighting flag")? else {
            return Ok(());
        };
        l.apply_lighting = apply;

        for (field, name) in [
            (&mut l.use_ambient, "ambient flag"),
            (&mut l.use_light_maps, "light map flag"),
            (&mut l.use_light_sources, "light source flag"),
            (&mut l.use_shadow_maps, "shadow map flag"),
        ] {
            let Some(value) = self.bit(name)? else {
                return Ok(());
            };
            *field = value;
        }

        let Some(model) = self.next_with("lighting model", LightingModel::from_code)? else {
            return Ok(());
        };
        l.model = model;

        if let Some(samples) = self.number("shadow samples")? {
            l.shadow_samples = samples;
        }
        if self.chars.next_if_eq(&'r').is_some()
            && let Some(indirect) = self.ordinal("indirect resolution", IndirectResolution::from_ordinal)?
        {
            l.indirect = indirect;
        }
        Ok(())
    }

    fn vertex(&mut self, v: &mut VertexConfig) -> FieldResult<()> {
        for (field, name) in [
            (&mut v.extended, "extended flag"),
            (&mut v.blend_shapes, "blend shape flag"),
            (&mut v.animations, "animation flag"),
        ] {
            let Some(value) = self.bit(name)? else {
                return Ok(());
            };
            *field = value;
        }
        Ok(())
    }
}
