//! State shared by all files imported in one run.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::ImportOptions,
    error::ImportError,
    filter::{FilterList, TriangleFilter},
    material::{synthesize, Material, MaterialKey, MaterialOptions, TextureResolver},
};

/// A texture image referenced by some material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// `{CRC}.png` next to the file that first referenced the texture.
    pub path: PathBuf,
    /// Whether the file existed when first referenced. Missing images keep their path
    /// so the host can resolve them later.
    pub exists: bool,
}

/// Texture images by CRC.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: IndexMap<u64, ImageRecord>,
}

impl ImageCache {
    /// The record for a CRC, if it has been referenced.
    pub fn get(&self, crc: u64) -> Option<&ImageRecord> {
        self.images.get(&crc)
    }

    /// All records in the order they were first referenced.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ImageRecord)> + '_ {
        self.images.iter().map(|(&crc, record)| (crc, record))
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn resolve_in(&mut self, dir: &Path, crc: u64) -> PathBuf {
        let record = self.images.entry(crc).or_insert_with(|| {
            let path = dir.join(format!("{:016X}.png", crc));
            let exists = path.is_file();
            if !exists {
                warn!("texture image {} not found", path.display());
            }
            ImageRecord { path, exists }
        });
        record.path.clone()
    }
}

struct DirResolver<'a> {
    images: &'a mut ImageCache,
    dir: &'a Path,
}

impl TextureResolver for DirResolver<'_> {
    fn resolve(&mut self, crc: u64) -> PathBuf {
        self.images.resolve_in(self.dir, crc)
    }
}

/// The caches and settings of an import run.
///
/// Materials are created once per distinct [MaterialKey] and shared by every file that
/// needs them.
#[derive(Debug)]
pub struct ImportSession {
    options: ImportOptions,
    filter: TriangleFilter,
    materials: IndexMap<MaterialKey, Rc<Material>>,
    material_names: HashSet<String>,
    images: ImageCache,
}

impl ImportSession {
    /// Creates a session, validating the filter expression.
    pub fn new(options: ImportOptions) -> Result<Self, ImportError> {
        let filter = TriangleFilter {
            mode: options.filter_mode,
            list: FilterList::parse(&options.filter)?,
            drop_untextured: options.drop_untextured,
        };
        Ok(Self {
            options,
            filter,
            materials: IndexMap::new(),
            material_names: HashSet::new(),
            images: ImageCache::default(),
        })
    }

    #[allow(missing_docs)]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    #[allow(missing_docs)]
    pub fn filter(&self) -> &TriangleFilter {
        &self.filter
    }

    #[allow(missing_docs)]
    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    /// All materials in creation order.
    pub fn materials(&self) -> impl Iterator<Item = &Rc<Material>> + '_ {
        self.materials.values()
    }

    /// The material for a key, creating it on first use. Texture images are looked up
    /// in `texture_dir`. The flag is true if the material was created by this call.
    pub fn material(&mut self, key: &MaterialKey, texture_dir: &Path) -> (Rc<Material>, bool) {
        if let Some(material) = self.materials.get(key) {
            return (Rc::clone(material), false);
        }

        let name = self.unique_name(key.display_name());
        let options = MaterialOptions {
            transparency: self.options.material_transparency,
            backface_culling: self.options.backface_culling,
        };
        let mut resolver = DirResolver {
            images: &mut self.images,
            dir: texture_dir,
        };
        let material = Rc::new(synthesize(key, name, &mut resolver, options));
        self.materials.insert(*key, Rc::clone(&material));
        (material, true)
    }

    fn unique_name(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut n = 0;
        while self.material_names.contains(&name) {
            n += 1;
            name = format!("{}.{:03}", base, n);
        }
        if n > 0 {
            debug!("material name {} is taken, using {}", base, name);
        }
        self.material_names.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use n64_rdp::mode::{Microcode, WrapCombo};

    use super::*;
    use crate::{
        material::TextureKey,
        scene::{V1_OTHER_MODE, V1_TEXTURED_COMBINE},
    };

    fn key(crc: u64, mux: u64) -> MaterialKey {
        MaterialKey {
            combiner_mux: mux,
            other_mode: V1_OTHER_MODE,
            geometry_mode: 0,
            microcode: Microcode::F3D,
            textures: [
                TextureKey {
                    crc,
                    wrap: WrapCombo::default(),
                },
                TextureKey::default(),
            ],
        }
    }

    #[test]
    fn test_invalid_filter_fails_session() {
        let options = ImportOptions {
            filter: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ImportSession::new(options),
            Err(ImportError::InvalidFilterExpression(_))
        ));
    }

    #[test]
    fn test_materials_are_shared() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();

        let (first, created) = session.material(&key(1, V1_TEXTURED_COMBINE), dir.path());
        assert!(created);
        let (second, created) = session.material(&key(1, V1_TEXTURED_COMBINE), dir.path());
        assert!(!created);
        assert!(Rc::ptr_eq(&first, &second));

        let (other, created) = session.material(&key(2, V1_TEXTURED_COMBINE), dir.path());
        assert!(created);
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(session.materials().count(), 2);
    }

    #[test]
    fn test_same_name_different_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();

        let (a, _) = session.material(&key(1, V1_TEXTURED_COMBINE), dir.path());
        let (b, _) = session.material(&key(1, 0), dir.path());
        let (c, _) = session.material(&key(1, 1), dir.path());
        assert_eq!(a.name, "0000000000000001 | (N)");
        assert_eq!(b.name, "0000000000000001 | (N).001");
        assert_eq!(c.name, "0000000000000001 | (N).002");
    }

    #[test]
    fn test_image_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("00000000000000AB.png"), b"png").unwrap();
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();

        session.material(&key(0xAB, V1_TEXTURED_COMBINE), dir.path());
        session.material(&key(0xCD, V1_TEXTURED_COMBINE), dir.path());
        session.material(&key(0xCD, 0), dir.path());

        let images = session.images();
        assert_eq!(images.len(), 2);
        let found = images.get(0xAB).unwrap();
        assert!(found.exists);
        assert_eq!(found.path, dir.path().join("00000000000000AB.png"));
        let missing = images.get(0xCD).unwrap();
        assert!(!missing.exists);
        assert_eq!(missing.path, dir.path().join("00000000000000CD.png"));
    }
}
