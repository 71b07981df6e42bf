use core::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic input to the color combiner or blender.
///
/// Every field of the combiner mux and the blender section of the other-mode word
/// decodes to one of these.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    CombinedColor,
    CombinedAlpha,
    Texel0Color,
    Texel0Alpha,
    Texel1Color,
    Texel1Alpha,
    PrimitiveColor,
    PrimitiveAlpha,
    ShadingColor,
    ShadingAlpha,
    EnvironmentColor,
    EnvironmentAlpha,
    BlendColor,
    FogColor,
    FogAlpha,
    FramebufferColor,
    FramebufferAlpha,
    OneMinusA,
    LodFraction,
    PrimitiveLodFraction,
    KeyCenter,
    KeyScale,
    Noise,
    ConvertK4,
    ConvertK5,
    One,
    Zero,
}

/// A per-triangle color that is stored on the mesh as a color attribute.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorChannel {
    Shading,
    Primitive,
    Environment,
    Blend,
    Fog,
}

impl ColorChannel {
    /// All channels in attribute order.
    pub const ALL: [ColorChannel; 5] = [
        ColorChannel::Shading,
        ColorChannel::Primitive,
        ColorChannel::Environment,
        ColorChannel::Blend,
        ColorChannel::Fog,
    ];

    /// The name of the color attribute holding this channel.
    pub fn layer_name(self) -> &'static str {
        match self {
            ColorChannel::Shading => "Shading",
            ColorChannel::Primitive => "Primitive",
            ColorChannel::Environment => "Environment",
            ColorChannel::Blend => "Blend",
            ColorChannel::Fog => "Fog",
        }
    }
}

/// How a renderer should obtain the value of a [Source].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    /// Literal value.
    Constant(f32),
    /// Color (`alpha == false`) or alpha of texture unit 0 or 1.
    Texel {
        /// Texture unit.
        unit: usize,
        /// Whether the alpha output is used.
        alpha: bool,
    },
    /// Color or alpha of a mesh color attribute.
    Attribute {
        #[allow(missing_docs)]
        channel: ColorChannel,
        #[allow(missing_docs)]
        alpha: bool,
    },
    /// Output of the previous combiner cycle.
    Combined {
        #[allow(missing_docs)]
        alpha: bool,
    },
    /// Approximated by a fixed value (level of detail is not emulated).
    LodFraction,
    /// Only readable by the blender; has no node.
    BlenderOnly,
    /// Not emulated. Replaced with a placeholder.
    Unimplemented,
}

impl Source {
    /// Classifies the source for shading graph generation.
    pub fn kind(self) -> SourceKind {
        use ColorChannel::*;
        use Source::*;

        let attr = |channel, alpha| SourceKind::Attribute { channel, alpha };
        match self {
            CombinedColor => SourceKind::Combined { alpha: false },
            CombinedAlpha => SourceKind::Combined { alpha: true },
            Texel0Color => SourceKind::Texel {
                unit: 0,
                alpha: false,
            },
            Texel0Alpha => SourceKind::Texel {
                unit: 0,
                alpha: true,
            },
            Texel1Color => SourceKind::Texel {
                unit: 1,
                alpha: false,
            },
            Texel1Alpha => SourceKind::Texel {
                unit: 1,
                alpha: true,
            },
            PrimitiveColor => attr(Primitive, false),
            PrimitiveAlpha => attr(Primitive, true),
            ShadingColor => attr(Shading, false),
            ShadingAlpha => attr(Shading, true),
            EnvironmentColor => attr(Environment, false),
            EnvironmentAlpha => attr(Environment, true),
            Source::BlendColor => attr(Blend, false),
            FogColor => attr(Fog, false),
            FogAlpha => attr(Fog, true),
            FramebufferColor | FramebufferAlpha | OneMinusA => SourceKind::BlenderOnly,
            LodFraction | PrimitiveLodFraction => SourceKind::LodFraction,
            KeyCenter | KeyScale | Noise | ConvertK4 | ConvertK5 => SourceKind::Unimplemented,
            One => SourceKind::Constant(1.0),
            Zero => SourceKind::Constant(0.0),
        }
    }

    /// True for sources that the shading graph cannot reproduce.
    pub fn is_unimplemented(self) -> bool {
        matches!(self.kind(), SourceKind::Unimplemented)
    }

    /// Human readable name, e.g. `Texel 0 Alpha`.
    pub fn name(self) -> &'static str {
        use Source::*;

        match self {
            CombinedColor => "Combined Color",
            CombinedAlpha => "Combined Alpha",
            Texel0Color => "Texel 0 Color",
            Texel0Alpha => "Texel 0 Alpha",
            Texel1Color => "Texel 1 Color",
            Texel1Alpha => "Texel 1 Alpha",
            PrimitiveColor => "Primitive Color",
            PrimitiveAlpha => "Primitive Alpha",
            ShadingColor => "Shading Color",
            ShadingAlpha => "Shading Alpha",
            EnvironmentColor => "Environment Color",
            EnvironmentAlpha => "Environment Alpha",
            BlendColor => "Blend Color",
            FogColor => "Fog Color",
            FogAlpha => "Fog Alpha",
            FramebufferColor => "Framebuffer Color",
            FramebufferAlpha => "Framebuffer Alpha",
            OneMinusA => "One Minus A",
            LodFraction => "LOD Fraction",
            PrimitiveLodFraction => "Primitive LOD Fraction",
            KeyCenter => "Key Center",
            KeyScale => "Key Scale",
            Noise => "Noise",
            ConvertK4 => "Convert K4",
            ConvertK5 => "Convert K5",
            One => "1",
            Zero => "0",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unimplemented_sources() {
        let unimplemented = [
            Source::Noise,
            Source::KeyCenter,
            Source::KeyScale,
            Source::ConvertK4,
            Source::ConvertK5,
        ];
        for source in unimplemented {
            assert!(source.is_unimplemented(), "{}", source);
        }
        assert!(!Source::Texel0Color.is_unimplemented());
        assert!(!Source::LodFraction.is_unimplemented());
    }

    #[test]
    fn test_attribute_sources_map_to_channels() {
        assert_eq!(
            Source::FogAlpha.kind(),
            SourceKind::Attribute {
                channel: ColorChannel::Fog,
                alpha: true
            }
        );
        assert_eq!(
            Source::BlendColor.kind(),
            SourceKind::Attribute {
                channel: ColorChannel::Blend,
                alpha: false
            }
        );
        assert_eq!(Source::One.kind(), SourceKind::Constant(1.0));
    }
}
