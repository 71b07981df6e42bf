//! Decoding of Nintendo 64 RDP pipeline state into symbolic form.
//!
//! - [decode] turns the combiner mux and other-mode word into formulas over [Source]s.
//! - [mode] holds the raw hardware encodings (wrap codes, geometry mode, microcodes).
//! - [formula] pretty prints decoded formulas.
//! - [graph] is the vocabulary for describing an equivalent shading network.
//!
//! Note: this crate only decodes what is needed to approximate materials. It is not an
//! RDP simulator.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub use decode::*;
pub use source::*;

pub mod decode;
pub mod formula;
pub mod graph;
pub mod mode;
mod source;
