//! In-memory form of a parsed GLR file.

#![allow(missing_docs)]

use n64_rdp::{
    mode::{Microcode, WrapCombo},
    ColorChannel,
};
use serde::{Deserialize, Serialize};

/// The first six bytes of every GLR file.
pub const MAGIC: &[u8; 6] = b"GL64R\0";

/// Identity token of triangles without a bound texture.
pub const NO_TEXTURE: &str = "NO_TEXTURE";

/// Combiner used for textured version 1 triangles: `Texel 0 * Shading` for RGB and alpha.
pub const V1_TEXTURED_COMBINE: u64 = 0x0012_1824_FF33_FFFF;

/// Combiner used for untextured version 1 triangles: `Shading` for RGB and alpha.
pub const V1_UNTEXTURED_COMBINE: u64 = 0x00FF_FFFF_FFFE_793C;

/// Other-mode word used for version 1 triangles: one cycle, bilinear filtering and the
/// opaque surface blender, which never reads the framebuffer.
pub const V1_OTHER_MODE: u64 = 0x0000_2000_0F0A_4000;

/// The two record layouts that have been produced by the ripper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Vertices by value, fog color in the header, no pipeline state.
    V1,
    /// Full pipeline state per triangle and a microcode id in the header.
    V2,
}

impl FormatVersion {
    /// The version number stored in the header.
    pub fn number(self) -> u16 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
        }
    }

    /// Size of the header in bytes, including the magic.
    pub fn header_size(self) -> usize {
        match self {
            FormatVersion::V1 => 44,
            FormatVersion::V2 => 36,
        }
    }

    /// Size of one triangle record in bytes.
    pub fn record_size(self) -> usize {
        match self {
            FormatVersion::V1 => 208,
            FormatVersion::V2 => 264,
        }
    }
}

/// The fixed header at the start of a GLR file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneHeader {
    pub version: FormatVersion,
    /// Rom name with NULs and surrounding whitespace removed. May be empty.
    pub rom_name: String,
    pub triangle_count: u32,
    /// Always [Microcode::F3D] for version 1 files.
    pub microcode: Microcode,
    /// Scene-wide fog color. Only version 1 headers carry one.
    pub fog_color: Option<[f32; 4]>,
}

/// One triangle corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    /// Position with the ripper's Y-up axes converted to Z-up: `(x, -z, y)`.
    pub position: [f32; 3],
    /// Shading color.
    pub color: [f32; 4],
    /// Texture coordinates for texture unit 0 and 1.
    pub uv: [[f32; 2]; 2],
}

/// The texture bound to one texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureDescriptor {
    /// Content hash of the texture image. Zero means no texture is bound.
    pub crc: u64,
    pub mask_s: u8,
    pub mask_t: u8,
    pub wrap: WrapCombo,
}

impl TextureDescriptor {
    pub fn is_bound(&self) -> bool {
        self.crc != 0
    }

    /// The filter token of this texture, see [texture_token].
    pub fn token(&self) -> String {
        texture_token(self.crc)
    }
}

/// The identity of a texture as used by filter lists and material names:
/// 16 uppercase hex digits, or `NO_TEXTURE` for CRC 0.
pub fn texture_token(crc: u64) -> String {
    if crc == 0 {
        NO_TEXTURE.to_string()
    } else {
        format!("{:016X}", crc)
    }
}

/// A triangle and the pipeline state it was drawn with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub primitive_color: [f32; 4],
    pub environment_color: [f32; 4],
    pub blend_color: [f32; 4],
    pub fog_color: [f32; 4],
    /// Primitive LOD minimum and fraction.
    pub primitive_lod: [f32; 2],
    /// Fog multiplier and offset.
    pub fog_factor: [f32; 2],
    /// YUV conversion constants K4 and K5.
    pub convert_k: [i32; 2],
    pub combiner_mux: u64,
    pub other_mode: u64,
    pub geometry_mode: u32,
    pub textures: [TextureDescriptor; 2],
}

impl Triangle {
    /// The color of a channel at one corner. Only shading varies per corner; the
    /// other channels are constant over the triangle.
    pub fn channel_color(&self, channel: ColorChannel, corner: usize) -> [f32; 4] {
        match channel {
            ColorChannel::Shading => self.vertices[corner].color,
            ColorChannel::Primitive => self.primitive_color,
            ColorChannel::Environment => self.environment_color,
            ColorChannel::Blend => self.blend_color,
            ColorChannel::Fog => self.fog_color,
        }
    }
}

/// A parsed GLR file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    pub header: SceneHeader,
    pub triangles: Vec<Triangle>,
}

impl SceneModel {
    /// The fog color to use for a fog volume: the header's, or else that of the
    /// first triangle.
    pub fn fog_color(&self) -> Option<[f32; 4]> {
        self.header
            .fog_color
            .or_else(|| self.triangles.first().map(|tri| tri.fog_color))
    }
}
