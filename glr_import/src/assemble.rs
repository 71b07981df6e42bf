//! Turning GLR files into scene objects.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tracing::{error, info, info_span};

use crate::{
    config::ImportOptions,
    error::ImportError,
    format::read_scene_file,
    geometry::{GeometryBuilder, MeshBuffers},
    material::{Material, MaterialKey},
    scene::{SceneHeader, SceneModel},
    session::ImportSession,
};

/// Used when a version 2 file has an empty rom name.
pub const UNKNOWN_GAME: &str = "Unknown N64 Game";

/// Object transform. Rotation is XYZ Euler angles in radians.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub location: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

/// An axis aligned box around the scene carrying the fog color.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FogVolume {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub color: [f32; 4],
}

/// One imported file, ready to be linked into a host scene.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedScene {
    /// Object name, `"{rom name} ({file stem})"`.
    pub name: String,
    #[allow(missing_docs)]
    pub source: PathBuf,
    #[allow(missing_docs)]
    pub header: SceneHeader,
    #[allow(missing_docs)]
    pub mesh: MeshBuffers,
    /// Materials referenced by [MeshBuffers::face_materials].
    pub materials: Vec<Rc<Material>>,
    #[allow(missing_docs)]
    pub fog: Option<FogVolume>,
    #[allow(missing_docs)]
    pub transform: Transform,
}

/// The host document that imported scenes are linked into.
pub trait SceneSink {
    /// Whether an object with this name already exists.
    fn has_object(&self, name: &str) -> bool;

    /// Takes ownership of a completely built scene.
    fn link(&mut self, scene: ImportedScene);
}

/// A [SceneSink] that keeps scenes in memory.
#[derive(Debug, Default, Serialize)]
pub struct SceneCollection {
    #[allow(missing_docs)]
    pub objects: Vec<ImportedScene>,
}

impl SceneCollection {
    #[allow(missing_docs)]
    pub fn get(&self, name: &str) -> Option<&ImportedScene> {
        self.objects.iter().find(|scene| scene.name == name)
    }
}

impl SceneSink for SceneCollection {
    fn has_object(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn link(&mut self, scene: ImportedScene) {
        self.objects.push(scene);
    }
}

/// The object name for a file.
pub fn object_name(header: &SceneHeader, path: &Path) -> String {
    let rom_name = if header.rom_name.is_empty() {
        UNKNOWN_GAME
    } else {
        &header.rom_name
    };
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    format!("{} ({})", rom_name, stem)
}

impl ImportSession {
    /// Imports one file and links it into `sink`.
    ///
    /// Nothing is linked if any step fails. Textures are looked up next to the file.
    pub fn import_file(
        &mut self,
        path: &Path,
        sink: &mut dyn SceneSink,
    ) -> Result<String, ImportError> {
        let scene = self.build_scene(path, &*sink)?;
        let name = scene.name.clone();
        sink.link(scene);
        Ok(name)
    }

    /// Runs every import step for one file without linking the result.
    pub fn build_scene(
        &mut self,
        path: &Path,
        sink: &dyn SceneSink,
    ) -> Result<ImportedScene, ImportError> {
        let options = self.options().clone();
        let scene = read_scene_file(path, options.accept_legacy_format)?;

        let name = object_name(&scene.header, path);
        if sink.has_object(&name) {
            return Err(ImportError::DuplicateName(name));
        }

        let read_count = scene.triangles.len();
        let scene = SceneModel {
            triangles: self.filter().apply(scene.triangles),
            ..scene
        };

        let texture_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut slots: IndexMap<MaterialKey, u32> = IndexMap::new();
        let mut materials = Vec::new();
        let mut created = 0;
        let mut geometry = GeometryBuilder::new(options.colors);

        for tri in &scene.triangles {
            let key =
                MaterialKey::from_triangle(tri, scene.header.microcode, &options.wrap_overrides);
            let slot = match slots.get(&key) {
                Some(&slot) => slot,
                None => {
                    let (material, is_new) = self.material(&key, texture_dir);
                    created += is_new as usize;
                    materials.push(material);
                    let slot = slots.len() as u32;
                    slots.insert(key, slot);
                    slot
                }
            };
            geometry.push(tri, slot);
        }
        let mut mesh = geometry.finish();

        info!(
            "{}: kept {} of {} triangles, {} materials ({} new)",
            name,
            scene.triangles.len(),
            read_count,
            materials.len(),
            created
        );

        if options.weld_vertices {
            let removed = mesh.weld(options.rounded_weld_distance());
            info!("welded {} vertices, {} faces left", removed, mesh.faces.len());
        }

        let fog = if options.fog_volume {
            scene
                .fog_color()
                .zip(mesh.bounds())
                .map(|(color, (min, max))| FogVolume { min, max, color })
        } else {
            None
        };

        Ok(ImportedScene {
            name,
            source: path.to_path_buf(),
            header: scene.header,
            mesh,
            materials,
            fog,
            transform: Transform {
                location: options.move_by,
                rotation: options.rotation,
                scale: options.scale,
            },
        })
    }
}

/// Outcome of importing one file.
#[derive(Debug)]
pub struct FileReport {
    #[allow(missing_docs)]
    pub path: PathBuf,
    /// The object name, or why the file was not imported.
    pub result: Result<String, ImportError>,
}

/// Outcome of a batch import.
#[derive(Debug)]
pub struct BatchReport {
    /// One entry per input file, in input order.
    pub files: Vec<FileReport>,
    /// The host should switch its display to sRGB with a standard view transform.
    pub color_management: bool,
}

impl BatchReport {
    /// Names of the imported objects.
    pub fn imported(&self) -> impl Iterator<Item = &str> + '_ {
        self.files
            .iter()
            .filter_map(|file| file.result.as_ref().ok().map(String::as_str))
    }

    /// Files that failed, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ImportError)> + '_ {
        self.files
            .iter()
            .filter_map(|file| file.result.as_ref().err().map(|e| (file.path.as_path(), e)))
    }

    /// One line per failed file, or `None` if every file was imported.
    pub fn failure_summary(&self) -> Option<String> {
        let summary = self
            .failures()
            .map(|(path, error)| format!("{}: {}", path.display(), error))
            .join("\n");
        (!summary.is_empty()).then(|| summary)
    }
}

/// Imports every file into `sink`. A failing file does not stop the others.
///
/// Fails as a whole only if `paths` is empty or the options are invalid.
pub fn import_batch(
    paths: &[PathBuf],
    options: ImportOptions,
    sink: &mut dyn SceneSink,
) -> Result<(BatchReport, ImportSession), ImportError> {
    if paths.is_empty() {
        return Err(ImportError::NoInputSelected);
    }
    let color_management = options.color_management;
    let mut session = ImportSession::new(options)?;

    let files = paths
        .iter()
        .map(|path| {
            let span = info_span!("import", file = %path.display());
            let _enter = span.enter();
            let result = session.import_file(path, &mut *sink);
            if let Err(err) = &result {
                error!("{}", err);
            }
            FileReport {
                path: path.clone(),
                result,
            }
        })
        .collect();

    Ok((
        BatchReport {
            files,
            color_management,
        },
        session,
    ))
}
