//! Reader for the GLR binary format.
//!
//! A file is a fixed size header followed by `triangle_count` fixed size records. All
//! fields are little endian. The whole file is validated before any triangle is
//! decoded, so a failed read never yields a partial scene.

use std::{
    fs,
    io::{self, Cursor, Read},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};
use n64_rdp::mode::{Microcode, WrapCombo};
use tracing::trace;

use crate::{
    error::{ImportError, VersionProblem},
    scene::*,
};

const ROM_NAME_LEN: usize = 20;

/// Reads and validates a GLR file from disk.
pub fn read_scene_file(path: &Path, accept_legacy: bool) -> Result<SceneModel, ImportError> {
    let bytes = fs::read(path).map_err(|error| ImportError::io(path, error))?;
    read_scene(&bytes, accept_legacy)
}

/// Reads and validates a GLR file held in memory.
pub fn read_scene(bytes: &[u8], accept_legacy: bool) -> Result<SceneModel, ImportError> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor, accept_legacy)?;
    let triangles = read_triangle_records(&mut cursor, &header)?;
    Ok(SceneModel { header, triangles })
}

/// Reads the header and leaves the cursor at the first triangle record.
///
/// Checks run in file order: magic, version, rom name, triangle count.
pub fn read_header(
    cursor: &mut Cursor<&[u8]>,
    accept_legacy: bool,
) -> Result<SceneHeader, ImportError> {
    let available = remaining(cursor);

    let mut magic = [0; 6];
    if cursor.read_exact(&mut magic).is_err() || &magic != MAGIC {
        return Err(ImportError::InvalidFormat);
    }

    let version_number = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| ImportError::TruncatedHeader {
            expected: MAGIC.len() + 2,
            actual: available,
        })?;
    let version = match version_number {
        1 if accept_legacy => FormatVersion::V1,
        1 => {
            return Err(ImportError::UnsupportedVersion {
                version: version_number,
                kind: VersionProblem::Outdated,
            })
        }
        2 => FormatVersion::V2,
        _ => {
            return Err(ImportError::UnsupportedVersion {
                version: version_number,
                kind: VersionProblem::Unknown,
            })
        }
    };

    if available < version.header_size() {
        return Err(ImportError::TruncatedHeader {
            expected: version.header_size(),
            actual: available,
        });
    }

    let truncated = |_: io::Error| ImportError::TruncatedHeader {
        expected: version.header_size(),
        actual: available,
    };

    let mut raw_name = [0; ROM_NAME_LEN];
    cursor.read_exact(&mut raw_name).map_err(truncated)?;
    if version == FormatVersion::V1 && raw_name.iter().all(|&b| b == 0) {
        return Err(ImportError::EmptyName);
    }
    let rom_name = decode_rom_name(&raw_name);

    let triangle_count = cursor.read_u32::<LittleEndian>().map_err(truncated)?;

    let (microcode, fog_color) = match version {
        FormatVersion::V1 => {
            let mut fog = [0.0; 3];
            cursor
                .read_f32_into::<LittleEndian>(&mut fog)
                .map_err(truncated)?;
            (Microcode::F3D, Some([fog[0], fog[1], fog[2], 1.0]))
        }
        FormatVersion::V2 => {
            let microcode = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
            (Microcode(microcode), None)
        }
    };

    if version == FormatVersion::V1 && triangle_count == 0 {
        return Err(ImportError::ZeroTriangles);
    }

    Ok(SceneHeader {
        version,
        rom_name,
        triangle_count,
        microcode,
        fog_color,
    })
}

/// Reads `header.triangle_count` records from the cursor.
///
/// The remaining input must hold exactly that many records; anything else is a
/// [ImportError::SizeMismatch].
pub fn read_triangle_records(
    cursor: &mut Cursor<&[u8]>,
    header: &SceneHeader,
) -> Result<Vec<Triangle>, ImportError> {
    let expected = header.triangle_count as u64 * header.version.record_size() as u64;
    let actual = remaining(cursor) as u64;
    let mismatch = || ImportError::SizeMismatch {
        triangle_count: header.triangle_count,
        expected,
        actual,
    };
    if expected != actual {
        return Err(mismatch());
    }

    trace!(
        "reading {} v{} triangle records",
        header.triangle_count,
        header.version.number()
    );

    (0..header.triangle_count)
        .map(|_| match header.version {
            FormatVersion::V1 => read_v1_triangle(cursor, header),
            FormatVersion::V2 => read_v2_triangle(cursor),
        })
        .collect::<io::Result<Vec<_>>>()
        .map_err(|_| mismatch())
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len();
    len.saturating_sub(cursor.position() as usize)
}

fn decode_rom_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace('\0', "")
        .trim()
        .to_string()
}

fn read_rgba(cursor: &mut Cursor<&[u8]>) -> io::Result<[f32; 4]> {
    let mut rgba = [0.0; 4];
    cursor.read_f32_into::<LittleEndian>(&mut rgba)?;
    Ok(rgba)
}

fn read_vertex(cursor: &mut Cursor<&[u8]>) -> io::Result<Vertex> {
    let mut v = [0.0; 11];
    cursor.read_f32_into::<LittleEndian>(&mut v)?;
    Ok(Vertex {
        position: [v[0], -v[2], v[1]],
        color: [v[3], v[4], v[5], v[6]],
        uv: [[v[7], v[8]], [v[9], v[10]]],
    })
}

fn read_vertices(cursor: &mut Cursor<&[u8]>) -> io::Result<[Vertex; 3]> {
    Ok([
        read_vertex(cursor)?,
        read_vertex(cursor)?,
        read_vertex(cursor)?,
    ])
}

fn read_v1_triangle(cursor: &mut Cursor<&[u8]>, header: &SceneHeader) -> io::Result<Triangle> {
    let vertices = read_vertices(cursor)?;
    cursor.read_u32::<LittleEndian>()?;

    let primitive_color = read_rgba(cursor)?;
    let environment_color = read_rgba(cursor)?;
    let blend_color = read_rgba(cursor)?;

    let crcs = [
        cursor.read_u64::<LittleEndian>()?,
        cursor.read_u64::<LittleEndian>()?,
    ];
    let wraps = [cursor.read_u8()?, cursor.read_u8()?];
    cursor.read_u16::<LittleEndian>()?;
    cursor.read_u32::<LittleEndian>()?;

    let textures = [0, 1].map(|unit| TextureDescriptor {
        crc: crcs[unit],
        mask_s: 0,
        mask_t: 0,
        wrap: WrapCombo::from_index(wraps[unit] & 0xF),
    });
    let combiner_mux = if textures[0].is_bound() {
        V1_TEXTURED_COMBINE
    } else {
        V1_UNTEXTURED_COMBINE
    };

    Ok(Triangle {
        vertices,
        primitive_color,
        environment_color,
        blend_color,
        fog_color: header.fog_color.unwrap_or([0.0, 0.0, 0.0, 1.0]),
        primitive_lod: [0.0; 2],
        fog_factor: [0.0; 2],
        convert_k: [0; 2],
        combiner_mux,
        other_mode: V1_OTHER_MODE,
        geometry_mode: 0,
        textures,
    })
}

fn read_texture_descriptor(cursor: &mut Cursor<&[u8]>) -> io::Result<TextureDescriptor> {
    let crc = cursor.read_u64::<LittleEndian>()?;
    let mask_s = cursor.read_u8()?;
    let mask_t = cursor.read_u8()?;
    let wrap_s = cursor.read_u8()?;
    let wrap_t = cursor.read_u8()?;
    Ok(TextureDescriptor {
        crc,
        mask_s,
        mask_t,
        wrap: WrapCombo::new(wrap_s & 0x3, wrap_t & 0x3),
    })
}

fn read_v2_triangle(cursor: &mut Cursor<&[u8]>) -> io::Result<Triangle> {
    let vertices = read_vertices(cursor)?;

    let fog_color = read_rgba(cursor)?;
    let blend_color = read_rgba(cursor)?;
    let environment_color = read_rgba(cursor)?;
    let primitive_color = read_rgba(cursor)?;

    let mut primitive_lod = [0.0; 2];
    cursor.read_f32_into::<LittleEndian>(&mut primitive_lod)?;
    let mut fog_factor = [0.0; 2];
    cursor.read_f32_into::<LittleEndian>(&mut fog_factor)?;
    let mut convert_k = [0; 2];
    cursor.read_i32_into::<LittleEndian>(&mut convert_k)?;

    let combiner_mux = cursor.read_u64::<LittleEndian>()?;
    let other_mode = cursor.read_u64::<LittleEndian>()?;
    let geometry_mode = cursor.read_u32::<LittleEndian>()?;

    let textures = [
        read_texture_descriptor(cursor)?,
        read_texture_descriptor(cursor)?,
    ];

    Ok(Triangle {
        vertices,
        primitive_color,
        environment_color,
        blend_color,
        fog_color,
        primitive_lod,
        fog_factor,
        convert_k,
        combiner_mux,
        other_mode,
        geometry_mode,
        textures,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn test_read_v2() {
        let mut tri = Triangle::default();
        tri.vertices[1].position = [1.0, 2.0, 3.0];
        tri.textures[0].crc = 0xABCDEF0123456789;
        tri.textures[0].wrap = WrapCombo::new(1, 2);
        tri.primitive_color = [0.5, 0.25, 0.0, 1.0];
        let bytes = GlrWriter::v2("SUPER MARIO 64", 2).triangle(&tri).finish();

        let scene = read_scene(&bytes, true).unwrap();
        assert_eq!(scene.header.version, FormatVersion::V2);
        assert_eq!(scene.header.rom_name, "SUPER MARIO 64");
        assert_eq!(scene.header.microcode, Microcode::F3DEX2);
        assert_eq!(scene.header.fog_color, None);
        assert_eq!(scene.triangles.len(), 1);

        let read = &scene.triangles[0];
        assert_eq!(read.vertices[1].position, [1.0, -3.0, 2.0]);
        assert_eq!(read.primitive_color, [0.5, 0.25, 0.0, 1.0]);
        assert_eq!(read.textures[0].crc, 0xABCDEF0123456789);
        assert_eq!(read.textures[0].wrap, WrapCombo::new(1, 2));
        assert!(!read.textures[1].is_bound());
    }

    #[test]
    fn test_read_v1() {
        let mut tri = Triangle::default();
        tri.textures[0].crc = 7;
        tri.textures[0].wrap = WrapCombo::new(2, 0);
        let bytes = GlrWriter::v1("ZELDA", [0.1, 0.2, 0.3])
            .triangle(&tri)
            .triangle(&Triangle::default())
            .finish();

        let scene = read_scene(&bytes, true).unwrap();
        assert_eq!(scene.header.version, FormatVersion::V1);
        assert_eq!(scene.header.fog_color, Some([0.1, 0.2, 0.3, 1.0]));
        assert_eq!(scene.triangles.len(), 2);

        let [textured, untextured] = [&scene.triangles[0], &scene.triangles[1]];
        assert_eq!(textured.textures[0].wrap, WrapCombo::new(2, 0));
        assert_eq!(textured.combiner_mux, V1_TEXTURED_COMBINE);
        assert_eq!(untextured.combiner_mux, V1_UNTEXTURED_COMBINE);
        assert_eq!(textured.fog_color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(textured.other_mode, V1_OTHER_MODE);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = GlrWriter::v2("GAME", 0)
            .triangle(&Triangle::default())
            .finish();
        bytes[..6].copy_from_slice(b"XX64R\0");
        assert!(matches!(
            read_scene(&bytes, true),
            Err(ImportError::InvalidFormat)
        ));
        assert!(matches!(read_scene(b"GL6", true), Err(ImportError::InvalidFormat)));
    }

    #[test]
    fn test_versions() {
        let v1 = GlrWriter::v1("GAME", [0.0; 3])
            .triangle(&Triangle::default())
            .finish();
        assert!(matches!(
            read_scene(&v1, false),
            Err(ImportError::UnsupportedVersion {
                version: 1,
                kind: VersionProblem::Outdated
            })
        ));

        for version in [0, 3, 0xFFFF] {
            let mut bytes = GlrWriter::v2("GAME", 0).finish();
            bytes[6..8].copy_from_slice(&u16::to_le_bytes(version));
            assert!(matches!(
                read_scene(&bytes, true),
                Err(ImportError::UnsupportedVersion { kind: VersionProblem::Unknown, .. })
            ));
        }
    }

    #[test]
    fn test_size_must_match_exactly() {
        for count in [0, 1, 3] {
            let mut writer = GlrWriter::v2("GAME", 0);
            for _ in 0..count {
                writer = writer.triangle(&Triangle::default());
            }
            let bytes = writer.finish();
            assert_eq!(read_scene(&bytes, true).unwrap().triangles.len(), count);

            let mut longer = bytes.clone();
            longer.push(0);
            assert!(matches!(
                read_scene(&longer, true),
                Err(ImportError::SizeMismatch { .. })
            ));

            if count > 0 {
                let shorter = &bytes[..bytes.len() - 1];
                assert!(matches!(
                    read_scene(shorter, true),
                    Err(ImportError::SizeMismatch { .. })
                ));
            }
        }
    }

    #[test]
    fn test_declared_count_larger_than_body() {
        let mut bytes = GlrWriter::v2("GAME", 0)
            .triangle(&Triangle::default())
            .finish();
        bytes[28..32].copy_from_slice(&u32::to_le_bytes(2));
        match read_scene(&bytes, true) {
            Err(ImportError::SizeMismatch {
                triangle_count,
                expected,
                actual,
            }) => {
                assert_eq!(triangle_count, 2);
                assert_eq!(expected, 2 * 264);
                assert_eq!(actual, 264);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_header_checks() {
        let bytes = GlrWriter::v1("", [0.0; 3])
            .triangle(&Triangle::default())
            .finish();
        assert!(matches!(read_scene(&bytes, true), Err(ImportError::EmptyName)));

        let bytes = GlrWriter::v1("GAME", [0.0; 3]).finish();
        assert!(matches!(
            read_scene(&bytes, true),
            Err(ImportError::ZeroTriangles)
        ));

        let bytes = GlrWriter::v2("", 0).finish();
        let scene = read_scene(&bytes, true).unwrap();
        assert_eq!(scene.header.rom_name, "");
        assert!(scene.triangles.is_empty());

        let bytes = GlrWriter::v2("GAME", 0).finish();
        assert!(matches!(
            read_scene(&bytes[..20], true),
            Err(ImportError::TruncatedHeader {
                expected: 36,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_rom_name_is_decoded_permissively() {
        let mut bytes = GlrWriter::v2("AB", 0).finish();
        bytes[10] = 0xFF;
        bytes[12] = b' ';
        let scene = read_scene(&bytes, true).unwrap();
        assert_eq!(scene.header.rom_name, "AB\u{FFFD}");
    }
}
