//! Import options.

use std::{f32::consts::FRAC_PI_2, fs, path::Path};

use n64_rdp::{mode::WrapCombo, ColorChannel};
use serde::{Deserialize, Serialize};

use crate::{error::ImportError, filter::ListMode};

/// Settings for one color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOptions {
    /// Whether the channel is written to the mesh.
    pub enabled: bool,
    /// Replace RGB with `1 - RGB`.
    pub invert: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            invert: false,
        }
    }
}

/// Settings for the mesh color attributes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorOptions {
    pub shading: ChannelOptions,
    pub primitive: ChannelOptions,
    pub environment: ChannelOptions,
    pub blend: ChannelOptions,
    pub fog: ChannelOptions,
    /// Multiply alpha into RGB.
    pub merge_alpha: bool,
}

impl ColorOptions {
    #[allow(missing_docs)]
    pub fn channel(&self, channel: ColorChannel) -> ChannelOptions {
        match channel {
            ColorChannel::Shading => self.shading,
            ColorChannel::Primitive => self.primitive,
            ColorChannel::Environment => self.environment,
            ColorChannel::Blend => self.blend,
            ColorChannel::Fog => self.fog,
        }
    }

    #[allow(missing_docs)]
    pub fn channel_mut(&mut self, channel: ColorChannel) -> &mut ChannelOptions {
        match channel {
            ColorChannel::Shading => &mut self.shading,
            ColorChannel::Primitive => &mut self.primitive,
            ColorChannel::Environment => &mut self.environment,
            ColorChannel::Blend => &mut self.blend,
            ColorChannel::Fog => &mut self.fog,
        }
    }
}

/// Replacement wrap combination for each of the 16 raw ones, indexed by
/// [WrapCombo::index].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOverrides([WrapCombo; 16]);

impl Default for WrapOverrides {
    fn default() -> Self {
        Self([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15].map(WrapCombo::from_index))
    }
}

impl WrapOverrides {
    /// The combination to use in place of `raw`.
    pub fn apply(&self, raw: WrapCombo) -> WrapCombo {
        self.0[raw.index() as usize]
    }

    /// Replaces `from` with `to`.
    pub fn set(&mut self, from: WrapCombo, to: WrapCombo) {
        self.0[from.index() as usize] = to;
    }

    /// True if no combination is replaced.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Serialized as a map from combination name to combination name, e.g.
/// `{"WN_MN": "WC_WC"}`. Missing entries map to themselves.
impl Serialize for WrapOverrides {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let changed: Vec<_> = WrapCombo::all()
            .filter(|&combo| self.apply(combo) != combo)
            .collect();
        let mut map = serializer.serialize_map(Some(changed.len()))?;
        for combo in changed {
            map.serialize_entry(&combo.name(), &self.apply(combo).name())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WrapOverrides {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let names = indexmap::IndexMap::<String, String>::deserialize(deserializer)?;
        let parse = |name: &str| {
            WrapCombo::parse(name)
                .ok_or_else(|| D::Error::custom(format!("unknown wrap combination {:?}", name)))
        };
        let mut overrides = Self::default();
        for (from, to) in &names {
            overrides.set(parse(from)?, parse(to)?);
        }
        Ok(overrides)
    }
}

/// Everything that controls an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Object location.
    pub move_by: [f32; 3],
    /// Object rotation as XYZ Euler angles in radians.
    pub rotation: [f32; 3],
    /// Object scale.
    pub scale: [f32; 3],
    /// Add a box around the scene carrying the fog color.
    pub fog_volume: bool,
    /// Merge vertices closer than `weld_distance`.
    pub weld_vertices: bool,
    /// Rounded to 6 decimals before use.
    pub weld_distance: f32,
    /// Ask the host to switch to an sRGB display with a standard view transform.
    pub color_management: bool,
    /// Alpha-blend materials whose blender reads the framebuffer.
    pub material_transparency: bool,
    /// Hide back faces of materials that request culling.
    pub backface_culling: bool,
    pub filter_mode: ListMode,
    /// Comma separated texture tokens, see [FilterList::parse](crate::FilterList::parse).
    pub filter: String,
    /// Remove triangles without a texture.
    pub drop_untextured: bool,
    /// Import version 1 files.
    pub accept_legacy_format: bool,
    pub wrap_overrides: WrapOverrides,
    pub colors: ColorOptions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            move_by: [0.0; 3],
            rotation: [FRAC_PI_2, 0.0, 0.0],
            scale: [1.0; 3],
            fog_volume: true,
            weld_vertices: true,
            weld_distance: 0.0001,
            color_management: true,
            material_transparency: false,
            backface_culling: false,
            filter_mode: ListMode::Blacklist,
            filter: String::new(),
            drop_untextured: false,
            accept_legacy_format: true,
            wrap_overrides: WrapOverrides::default(),
            colors: ColorOptions::default(),
        }
    }
}

impl ImportOptions {
    /// Loads options from a JSON file. Missing fields take their default value.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let text = fs::read_to_string(path).map_err(|error| ImportError::io(path, error))?;
        Self::from_json(&text)
    }

    #[allow(missing_docs)]
    pub fn from_json(text: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The weld distance with precision beyond 6 decimals removed.
    pub fn rounded_weld_distance(&self) -> f32 {
        ((self.weld_distance as f64 * 1e6).round() / 1e6) as f32
    }
}
