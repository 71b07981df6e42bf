//! Human readable renderings of combiner and blender formulas.
//!
//! Terms that are trivially zero or one are folded away, so
//! `(Texel 0 Color - 0) * Shading Color + 0` prints as `Texel 0 Color * Shading Color`.

use crate::{
    decode::{BlendFormula, CombineFormula},
    source::Source,
};

/// Formats `(A - B) * C + D`.
pub fn show_combine_formula(formula: &CombineFormula) -> String {
    let [a, b, c, d] = formula.args;

    let sub = if a == b {
        "0".to_string()
    } else if b == Source::Zero {
        a.to_string()
    } else if a == Source::Zero {
        format!("- {}", b)
    } else {
        format!("({} - {})", a, b)
    };

    let mul = if sub == "0" || c == Source::Zero {
        "0".to_string()
    } else if sub == "1" {
        c.to_string()
    } else if c == Source::One {
        sub
    } else {
        format!("{} * {}", sub, c)
    };

    if mul == "0" {
        d.to_string()
    } else if d == Source::Zero {
        mul
    } else {
        format!("{} + {}", mul, d)
    }
}

/// Formats `(P * A + M * B) / (A + B)`.
pub fn show_blend_formula(formula: &BlendFormula) -> String {
    let BlendFormula { p, a, m, b } = *formula;

    let pa = if a == Source::Zero {
        "0".to_string()
    } else {
        format!("{} * {}", p, a)
    };

    let mb = match b {
        Source::Zero => "0".to_string(),
        Source::One => m.to_string(),
        _ => format!("{} * {}", m, b),
    };

    let num = if pa == "0" {
        mb
    } else if mb == "0" {
        pa
    } else {
        format!("({} + {})", pa, mb)
    };

    let den = if a == Source::Zero {
        b.to_string()
    } else if b == Source::Zero {
        a.to_string()
    } else if b == Source::OneMinusA {
        "1".to_string()
    } else {
        format!("({} + {})", a, b)
    };

    if den == "1" {
        num
    } else if num == "0" {
        "0".to_string()
    } else if num == den {
        "1".to_string()
    } else {
        format!("{} / {}", num, den)
    }
}
