//! Builds GLR files in memory for tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::scene::*;

/// Writes a GLR file. Vertex positions of the given triangles are written verbatim as
/// file-space (Y-up) coordinates.
#[derive(Debug)]
pub struct GlrWriter {
    version: FormatVersion,
    rom_name: [u8; 20],
    fog: [f32; 3],
    microcode: u32,
    body: Vec<u8>,
    count: u32,
}

impl GlrWriter {
    pub fn v1(rom_name: &str, fog: [f32; 3]) -> Self {
        Self::new(FormatVersion::V1, rom_name, fog, 0)
    }

    pub fn v2(rom_name: &str, microcode: u32) -> Self {
        Self::new(FormatVersion::V2, rom_name, [0.0; 3], microcode)
    }

    fn new(version: FormatVersion, rom_name: &str, fog: [f32; 3], microcode: u32) -> Self {
        let mut name = [0; 20];
        name[..rom_name.len()].copy_from_slice(rom_name.as_bytes());
        Self {
            version,
            rom_name: name,
            fog,
            microcode,
            body: Vec::new(),
            count: 0,
        }
    }

    pub fn triangle(mut self, tri: &Triangle) -> Self {
        let w = &mut self.body;
        for vertex in &tri.vertices {
            let floats = vertex
                .position
                .iter()
                .chain(&vertex.color)
                .chain(vertex.uv.iter().flatten());
            for &v in floats {
                w.write_f32::<LittleEndian>(v).unwrap();
            }
        }

        let write_rgba = |w: &mut Vec<u8>, rgba: &[f32; 4]| {
            for &v in rgba {
                w.write_f32::<LittleEndian>(v).unwrap();
            }
        };

        match self.version {
            FormatVersion::V1 => {
                w.write_u32::<LittleEndian>(0).unwrap();
                write_rgba(w, &tri.primitive_color);
                write_rgba(w, &tri.environment_color);
                write_rgba(w, &tri.blend_color);
                for texture in &tri.textures {
                    w.write_u64::<LittleEndian>(texture.crc).unwrap();
                }
                for texture in &tri.textures {
                    w.write_u8(texture.wrap.index()).unwrap();
                }
                w.write_u16::<LittleEndian>(0).unwrap();
                w.write_u32::<LittleEndian>(0).unwrap();
            }
            FormatVersion::V2 => {
                write_rgba(w, &tri.fog_color);
                write_rgba(w, &tri.blend_color);
                write_rgba(w, &tri.environment_color);
                write_rgba(w, &tri.primitive_color);
                for &v in tri.primitive_lod.iter().chain(&tri.fog_factor) {
                    w.write_f32::<LittleEndian>(v).unwrap();
                }
                for &k in &tri.convert_k {
                    w.write_i32::<LittleEndian>(k).unwrap();
                }
                w.write_u64::<LittleEndian>(tri.combiner_mux).unwrap();
                w.write_u64::<LittleEndian>(tri.other_mode).unwrap();
                w.write_u32::<LittleEndian>(tri.geometry_mode).unwrap();
                for texture in &tri.textures {
                    w.write_u64::<LittleEndian>(texture.crc).unwrap();
                    w.write_u8(texture.mask_s).unwrap();
                    w.write_u8(texture.mask_t).unwrap();
                    w.write_u8(texture.wrap.s.into()).unwrap();
                    w.write_u8(texture.wrap.t.into()).unwrap();
                }
            }
        }

        self.count += 1;
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut w = Vec::new();
        w.extend_from_slice(MAGIC);
        w.write_u16::<LittleEndian>(self.version.number()).unwrap();
        w.extend_from_slice(&self.rom_name);
        w.write_u32::<LittleEndian>(self.count).unwrap();
        match self.version {
            FormatVersion::V1 => {
                for &v in &self.fog {
                    w.write_f32::<LittleEndian>(v).unwrap();
                }
            }
            FormatVersion::V2 => w.write_u32::<LittleEndian>(self.microcode).unwrap(),
        }
        assert_eq!(w.len(), self.version.header_size());
        assert_eq!(
            self.body.len(),
            self.count as usize * self.version.record_size()
        );
        w.extend_from_slice(&self.body);
        w
    }

    /// Writes the file into `dir` and returns its path.
    pub fn write_to(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, self.finish()).unwrap();
        path
    }
}

/// A triangle with the given texture 0 CRC and otherwise default state.
pub fn textured(crc: u64) -> Triangle {
    let mut tri = Triangle::default();
    tri.textures[0].crc = crc;
    tri
}

/// A triangle with distinct corner positions.
pub fn with_positions(mut tri: Triangle, positions: [[f32; 3]; 3]) -> Triangle {
    for (vertex, position) in tri.vertices.iter_mut().zip(positions) {
        vertex.position = position;
    }
    tri
}
