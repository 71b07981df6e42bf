//! Raw RDP/RSP mode fields as they appear in the other-mode word, the geometry mode
//! and the tile descriptors.
//!
//! These enums mirror the hardware encodings. [crate::decode] turns them into the
//! symbolic [Source](crate::Source) vocabulary.

#![allow(missing_docs)]

use bitflags::bitflags;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CycleType {
    #[num_enum(default)]
    OneCycle = 0,
    TwoCycle = 1,
    Copy = 2,
    Fill = 3,
}

impl CycleType {
    /// Copy and fill modes never run the second combiner/blender cycle.
    pub fn is_two_cycle(self) -> bool {
        self == Self::TwoCycle
    }
}

/// Hardware texture filter. Encoding 1 is invalid and behaves like bilinear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TextureFilter {
    Point = 0,
    #[num_enum(default)]
    Bilerp = 2,
    Average = 3,
}

/// The two sampling behaviours a renderer can reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Closest,
    Linear,
}

impl From<TextureFilter> for FilterMode {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Point => FilterMode::Closest,
            TextureFilter::Bilerp | TextureFilter::Average => FilterMode::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BlendColor {
    #[num_enum(default)]
    Input = 0,
    Memory = 1,
    Blend = 2,
    Fog = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BlendAlpha1 {
    #[num_enum(default)]
    Input = 0,
    Fog = 1,
    Shade = 2,
    Zero = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BlendAlpha2 {
    #[num_enum(default)]
    OneMinusAlpha = 0,
    Memory = 1,
    One = 2,
    Zero = 3,
}

/// The raw 2-bit wrap code of one texture axis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct WrapBits {
    pub mirror: bool,
    pub clamp: bool,
}

impl From<u8> for WrapBits {
    fn from(v: u8) -> Self {
        Self {
            mirror: v & 0x1 != 0,
            clamp: v & 0x2 != 0,
        }
    }
}

impl From<WrapBits> for u8 {
    fn from(m: WrapBits) -> Self {
        let mut v = 0;
        if m.mirror {
            v |= 0x1;
        }
        if m.clamp {
            v |= 0x2;
        }
        v
    }
}

impl WrapBits {
    pub const WRAP: Self = Self {
        mirror: false,
        clamp: false,
    };
    pub const MIRROR: Self = Self {
        mirror: true,
        clamp: false,
    };
    pub const CLAMP: Self = Self {
        mirror: false,
        clamp: true,
    };
    pub const MIRROR_CLAMP: Self = Self {
        mirror: true,
        clamp: true,
    };

    /// Two letter code used in wrap combination names, e.g. `MN` (mirror, no clamp).
    pub fn code(self) -> &'static str {
        match (self.mirror, self.clamp) {
            (false, false) => "WN",
            (true, false) => "MN",
            (false, true) => "WC",
            (true, true) => "MC",
        }
    }
}

/// Texture addressing that a renderer can reproduce.
///
/// Any code with the clamp bit set clamps; mirror only applies without clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    Repeat,
    Mirror,
    Clamp,
}

impl From<WrapBits> for AddressMode {
    fn from(m: WrapBits) -> Self {
        if m.clamp {
            AddressMode::Clamp
        } else if m.mirror {
            AddressMode::Mirror
        } else {
            AddressMode::Repeat
        }
    }
}

impl AddressMode {
    pub fn name(self) -> &'static str {
        match self {
            AddressMode::Repeat => "Repeat",
            AddressMode::Mirror => "Mirror",
            AddressMode::Clamp => "Clamp",
        }
    }

    pub fn abbreviation(self) -> char {
        match self {
            AddressMode::Repeat => 'R',
            AddressMode::Mirror => 'M',
            AddressMode::Clamp => 'C',
        }
    }
}

/// One of the 16 raw (S, T) wrap code pairs, numbered `S * 4 + T`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct WrapCombo {
    pub s: WrapBits,
    pub t: WrapBits,
}

impl WrapCombo {
    /// Builds a combination from the raw 2-bit codes of each axis.
    pub fn new(s: u8, t: u8) -> Self {
        Self {
            s: s.into(),
            t: t.into(),
        }
    }

    /// Unpacks the single-byte form: S in bits 2..3, T in bits 0..1.
    pub fn from_index(index: u8) -> Self {
        Self::new((index >> 2) & 0x3, index & 0x3)
    }

    pub fn index(self) -> u8 {
        (u8::from(self.s) << 2) | u8::from(self.t)
    }

    /// All 16 combinations in index order.
    pub fn all() -> impl Iterator<Item = WrapCombo> {
        (0..16).map(WrapCombo::from_index)
    }

    /// E.g. `WN_MC`.
    pub fn name(self) -> String {
        format!("{}_{}", self.s.code(), self.t.code())
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::all().find(|combo| combo.name() == name)
    }

    pub fn address_modes(self) -> [AddressMode; 2] {
        [self.s.into(), self.t.into()]
    }

    /// Abbreviation of the resolved address modes: one letter when S and T agree
    /// (`R`, `M`, `C`), otherwise two (`RM`, `CR`, ...).
    pub fn abbreviation(self) -> String {
        let [s, t] = self.address_modes();
        if s == t {
            s.abbreviation().to_string()
        } else {
            format!("{}{}", s.abbreviation(), t.abbreviation())
        }
    }
}

bitflags! {
    /// Geometry mode bits read from the F3D/F3DEX layout.
    pub struct GeometryModes: u32 {
        const CULL_BACK = 0x00002000;
    }
}

bitflags! {
    /// Geometry mode bits read from the F3DEX2 layout.
    pub struct GeometryModesEx2: u32 {
        const CULL_BACK = 0x00000400;
    }
}

/// Microcode identifier as recorded by the ripper.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Microcode(pub u32);

impl Microcode {
    pub const F3D: Self = Self(0);
    pub const F3DEX2: Self = Self(2);
    pub const L3DEX2: Self = Self(5);
    pub const S2DEX2: Self = Self(7);
    pub const F3DEX2CBFD: Self = Self(13);
    pub const F3DZEX2OOT: Self = Self(17);
    pub const F3DZEX2MM: Self = Self(18);
    pub const F3DEX2ACCLAIM: Self = Self(21);

    const EX2_FAMILY: [Self; 7] = [
        Self::F3DEX2,
        Self::L3DEX2,
        Self::S2DEX2,
        Self::F3DEX2CBFD,
        Self::F3DZEX2OOT,
        Self::F3DZEX2MM,
        Self::F3DEX2ACCLAIM,
    ];

    /// Unknown microcodes are assumed to use the F3D layout.
    pub fn is_ex2_family(self) -> bool {
        Self::EX2_FAMILY.contains(&self)
    }

    /// The geometry mode bit that enables backface culling for this microcode.
    pub fn cull_back_mask(self) -> u32 {
        if self.is_ex2_family() {
            GeometryModesEx2::CULL_BACK.bits()
        } else {
            GeometryModes::CULL_BACK.bits()
        }
    }

    pub fn culls_backfaces(self, geometry_mode: u32) -> bool {
        geometry_mode & self.cull_back_mask() != 0
    }
}
