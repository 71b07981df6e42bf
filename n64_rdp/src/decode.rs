//! Decoding of the combiner mux and the other-mode word.
//!
//! Both functions are pure: every bit pattern decodes to something, with encodings
//! that the hardware leaves unassigned mapping to [Source::Zero].

use serde::{Deserialize, Serialize};

use crate::{mode::*, source::Source};

/// One combiner equation, `[A, B, C, D]  ->  (A - B) * C + D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombineFormula {
    #[allow(missing_docs)]
    pub args: [Source; 4],
}

impl CombineFormula {
    /// The formula `0 * 0 + source`.
    pub const fn passthrough(source: Source) -> Self {
        Self {
            args: [Source::Zero, Source::Zero, Source::Zero, source],
        }
    }
}

/// The RGB and alpha equations of one combiner cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombinerCycle {
    #[allow(missing_docs)]
    pub color: CombineFormula,
    #[allow(missing_docs)]
    pub alpha: CombineFormula,
}

impl CombinerCycle {
    /// A cycle that outputs the previous cycle's result unchanged.
    pub const PASS_THROUGH: Self = Self {
        color: CombineFormula::passthrough(Source::CombinedColor),
        alpha: CombineFormula::passthrough(Source::CombinedAlpha),
    };

    /// True if this cycle only forwards the previous cycle's output.
    pub fn is_pass_through(&self) -> bool {
        *self == Self::PASS_THROUGH
    }

    /// The 8 inputs in socket order: color A-D then alpha A-D.
    pub fn inputs(&self) -> [Source; 8] {
        let [ca, cb, cc, cd] = self.color.args;
        let [aa, ab, ac, ad] = self.alpha.args;
        [ca, cb, cc, cd, aa, ab, ac, ad]
    }
}

/// The blender equation, `(P * A + M * B) / (A + B)`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendFormula {
    pub p: Source,
    pub a: Source,
    pub m: Source,
    pub b: Source,
}

impl BlendFormula {
    fn from_raw(p: u64, a: u64, m: u64, b: u64) -> Self {
        Self {
            p: BlendColor::from(p as u8).into(),
            a: BlendAlpha1::from(a as u8).into(),
            m: BlendColor::from(m as u8).into(),
            b: BlendAlpha2::from(b as u8).into(),
        }
    }

    /// True if either color input reads the framebuffer.
    pub fn reads_framebuffer(&self) -> bool {
        self.p == Source::FramebufferColor || self.m == Source::FramebufferColor
    }

    /// The 4 inputs in `[P, A, M, B]` order.
    pub fn inputs(&self) -> [Source; 4] {
        [self.p, self.a, self.m, self.b]
    }
}

impl From<BlendColor> for Source {
    fn from(v: BlendColor) -> Self {
        match v {
            BlendColor::Input => Source::CombinedColor,
            BlendColor::Memory => Source::FramebufferColor,
            BlendColor::Blend => Source::BlendColor,
            BlendColor::Fog => Source::FogColor,
        }
    }
}

impl From<BlendAlpha1> for Source {
    fn from(v: BlendAlpha1) -> Self {
        match v {
            BlendAlpha1::Input => Source::CombinedAlpha,
            BlendAlpha1::Fog => Source::FogAlpha,
            BlendAlpha1::Shade => Source::ShadingAlpha,
            BlendAlpha1::Zero => Source::Zero,
        }
    }
}

impl From<BlendAlpha2> for Source {
    fn from(v: BlendAlpha2) -> Self {
        match v {
            BlendAlpha2::OneMinusAlpha => Source::OneMinusA,
            BlendAlpha2::Memory => Source::FramebufferAlpha,
            BlendAlpha2::One => Source::One,
            BlendAlpha2::Zero => Source::Zero,
        }
    }
}

/// The fields of the other-mode word that affect material generation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OtherMode {
    pub blend: [BlendFormula; 2],
    pub cycle_type: CycleType,
    pub texture_filter: TextureFilter,
}

impl OtherMode {
    /// Sampling mode for both texture units.
    pub fn filter_mode(&self) -> FilterMode {
        self.texture_filter.into()
    }
}

/// Decodes the 64 bit combiner mux into the formulas for both cycles.
///
/// The mux is the `SetCombine` command with the opcode byte removed:
/// `(w0 & 0xFFFFFF) << 32 | w1`.
pub fn decode_combine_mode(mux: u64) -> [CombinerCycle; 2] {
    let field = |shift: u32, mask: u64| (mux >> shift) & mask;

    let cycle1 = CombinerCycle {
        color: CombineFormula {
            args: [
                rgb_a(field(52, 0xF)),
                rgb_b(field(28, 0xF)),
                rgb_c(field(47, 0x1F)),
                rgb_d(field(15, 0x7)),
            ],
        },
        alpha: CombineFormula {
            args: [
                alpha_abd(field(44, 0x7)),
                alpha_abd(field(12, 0x7)),
                alpha_c(field(41, 0x7)),
                alpha_abd(field(9, 0x7)),
            ],
        },
    };
    let cycle2 = CombinerCycle {
        color: CombineFormula {
            args: [
                rgb_a(field(37, 0xF)),
                rgb_b(field(24, 0xF)),
                rgb_c(field(32, 0x1F)),
                rgb_d(field(6, 0x7)),
            ],
        },
        alpha: CombineFormula {
            args: [
                alpha_abd(field(21, 0x7)),
                alpha_abd(field(3, 0x7)),
                alpha_c(field(18, 0x7)),
                alpha_abd(field(0, 0x7)),
            ],
        },
    };
    [cycle1, cycle2]
}

/// Decodes the blender, cycle type and texture filter fields of the other-mode word.
///
/// The word is `(w0 & 0xFFFFFF) << 32 | w1` of `SetOtherMode`, so the render mode
/// occupies the low 32 bits.
pub fn decode_other_mode(other_mode: u64) -> OtherMode {
    let field = |shift: u32| (other_mode >> shift) & 0x3;

    OtherMode {
        blend: [
            BlendFormula::from_raw(field(30), field(26), field(22), field(18)),
            BlendFormula::from_raw(field(28), field(24), field(20), field(16)),
        ],
        cycle_type: CycleType::from(field(52) as u8),
        texture_filter: TextureFilter::from(field(44) as u8),
    }
}

fn shared_rgb(v: u64) -> Option<Source> {
    Some(match v {
        0 => Source::CombinedColor,
        1 => Source::Texel0Color,
        2 => Source::Texel1Color,
        3 => Source::PrimitiveColor,
        4 => Source::ShadingColor,
        5 => Source::EnvironmentColor,
        _ => return None,
    })
}

fn rgb_a(v: u64) -> Source {
    shared_rgb(v).unwrap_or(match v {
        6 => Source::One,
        7 => Source::Noise,
        _ => Source::Zero,
    })
}

fn rgb_b(v: u64) -> Source {
    shared_rgb(v).unwrap_or(match v {
        6 => Source::KeyCenter,
        7 => Source::ConvertK4,
        _ => Source::Zero,
    })
}

fn rgb_c(v: u64) -> Source {
    shared_rgb(v).unwrap_or(match v {
        6 => Source::KeyScale,
        7 => Source::CombinedAlpha,
        8 => Source::Texel0Alpha,
        9 => Source::Texel1Alpha,
        10 => Source::PrimitiveAlpha,
        11 => Source::ShadingAlpha,
        12 => Source::EnvironmentAlpha,
        13 => Source::LodFraction,
        14 => Source::PrimitiveLodFraction,
        15 => Source::ConvertK5,
        _ => Source::Zero,
    })
}

fn rgb_d(v: u64) -> Source {
    shared_rgb(v).unwrap_or(match v {
        6 => Source::One,
        _ => Source::Zero,
    })
}

fn alpha_abd(v: u64) -> Source {
    match v {
        0 => Source::CombinedAlpha,
        1 => Source::Texel0Alpha,
        2 => Source::Texel1Alpha,
        3 => Source::PrimitiveAlpha,
        4 => Source::ShadingAlpha,
        5 => Source::EnvironmentAlpha,
        6 => Source::One,
        _ => Source::Zero,
    }
}

fn alpha_c(v: u64) -> Source {
    match v {
        0 => Source::LodFraction,
        1 => Source::Texel0Alpha,
        2 => Source::Texel1Alpha,
        3 => Source::PrimitiveAlpha,
        4 => Source::ShadingAlpha,
        5 => Source::EnvironmentAlpha,
        6 => Source::PrimitiveLodFraction,
        _ => Source::Zero,
    }
}
