//! Flattening triangles into mesh buffers.
//!
//! Every triangle contributes three vertices and three face corners of its own, so
//! before welding vertex `i` and corner `i` are the same thing. Corner attributes
//! (colors and UVs) are stored per corner and survive welding unchanged.

use std::collections::HashMap;

use n64_rdp::ColorChannel;
use serde::{Deserialize, Serialize};

use crate::{
    config::{ChannelOptions, ColorOptions},
    scene::Triangle,
};

/// Names of the two UV layers, one per texture unit.
pub const UV_LAYER_NAMES: [&str; 2] = ["UV0", "UV1"];

/// Per-corner colors of one channel.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub channel: ColorChannel,
    pub name: String,
    pub data: Vec<[f32; 4]>,
}

/// Per-corner texture coordinates of one texture unit.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub data: Vec<[f32; 2]>,
}

/// Flat mesh data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Vertex indices, three per face.
    pub faces: Vec<[u32; 3]>,
    /// Index into the scene's material list, one per face.
    pub face_materials: Vec<u32>,
    /// Enabled color channels, in [ColorChannel::ALL] order.
    pub color_layers: Vec<ColorLayer>,
    #[allow(missing_docs)]
    pub uv_layers: [UvLayer; 2],
}

impl MeshBuffers {
    /// Number of face corners, i.e. the length of every corner attribute.
    pub fn corner_count(&self) -> usize {
        self.faces.len() * 3
    }

    /// Axis aligned bounds of all vertices, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(mut min, mut max), p| {
                    for i in 0..3 {
                        min[i] = min[i].min(p[i]);
                        max[i] = max[i].max(p[i]);
                    }
                    (min, max)
                }),
        )
    }

    /// Merges vertices that are within `distance` of an earlier vertex.
    ///
    /// Faces that end up with a repeated vertex are removed along with their corner
    /// attributes and material index. Vertices no longer referenced by any face are
    /// dropped. Returns the number of removed vertices.
    pub fn weld(&mut self, distance: f32) -> usize {
        let (remap, positions) = cluster_positions(&self.positions, distance);
        let removed = self.positions.len() - positions.len();

        let mut keep_faces = Vec::with_capacity(self.faces.len());
        for face in &mut self.faces {
            *face = face.map(|v| remap[v as usize]);
            keep_faces.push(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
        }
        let keep_corners: Vec<bool> = keep_faces.iter().flat_map(|&k| [k; 3]).collect();

        retain_by(&mut self.faces, &keep_faces);
        retain_by(&mut self.face_materials, &keep_faces);
        for layer in &mut self.color_layers {
            retain_by(&mut layer.data, &keep_corners);
        }
        for layer in &mut self.uv_layers {
            retain_by(&mut layer.data, &keep_corners);
        }

        self.positions = positions;
        removed + self.drop_unused_vertices()
    }

    fn drop_unused_vertices(&mut self) -> usize {
        let mut used = vec![false; self.positions.len()];
        for &v in self.faces.iter().flatten() {
            used[v as usize] = true;
        }
        let unused = used.iter().filter(|&&u| !u).count();
        if unused == 0 {
            return 0;
        }

        let mut remap = vec![0; self.positions.len()];
        let mut next = 0;
        for (i, &u) in used.iter().enumerate() {
            remap[i] = next;
            if u {
                next += 1;
            }
        }
        for face in &mut self.faces {
            *face = face.map(|v| remap[v as usize]);
        }
        retain_by(&mut self.positions, &used);
        unused
    }
}

fn retain_by<T>(items: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    items.retain(|_| flags.next().copied().unwrap_or(false));
}

/// Assigns every position to the first earlier position within `distance`, using a
/// uniform grid with cells of that size. A non-positive distance merges exact
/// duplicates only. Non-finite positions are never merged.
fn cluster_positions(positions: &[[f32; 3]], distance: f32) -> (Vec<u32>, Vec<[f32; 3]>) {
    let mut remap = Vec::with_capacity(positions.len());
    let mut kept: Vec<[f32; 3]> = Vec::new();

    if distance <= 0.0 {
        let mut exact: HashMap<[u32; 3], u32> = HashMap::new();
        for p in positions {
            let key = p.map(|c| if c == 0.0 { 0 } else { c.to_bits() });
            let index = *exact.entry(key).or_insert_with(|| {
                kept.push(*p);
                kept.len() as u32 - 1
            });
            remap.push(index);
        }
        return (remap, kept);
    }

    let cell_of = |p: &[f32; 3]| p.map(|c| (c / distance).floor() as i64);
    let mut grid: HashMap<[i64; 3], Vec<u32>> = HashMap::new();
    let distance_sq = distance * distance;

    for p in positions {
        if !p.iter().all(|c| c.is_finite()) {
            kept.push(*p);
            remap.push(kept.len() as u32 - 1);
            continue;
        }

        // Cells saturate for coordinates far beyond the weld distance.
        let cell = cell_of(p);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor = [
                        cell[0].saturating_add(dx),
                        cell[1].saturating_add(dy),
                        cell[2].saturating_add(dz),
                    ];
                    for &candidate in grid.get(&neighbor).into_iter().flatten() {
                        let q = kept[candidate as usize];
                        let d: f32 = (0..3).map(|i| (p[i] - q[i]).powi(2)).sum();
                        if d <= distance_sq {
                            found = Some(candidate);
                            break 'search;
                        }
                    }
                }
            }
        }

        let index = match found {
            Some(index) => index,
            None => {
                kept.push(*p);
                let index = kept.len() as u32 - 1;
                grid.entry(cell).or_default().push(index);
                index
            }
        };
        remap.push(index);
    }
    (remap, kept)
}

/// Accumulates triangles into [MeshBuffers].
#[derive(Debug)]
pub struct GeometryBuilder {
    colors: ColorOptions,
    mesh: MeshBuffers,
}

impl GeometryBuilder {
    #[allow(missing_docs)]
    pub fn new(colors: ColorOptions) -> Self {
        let color_layers = ColorChannel::ALL
            .into_iter()
            .filter(|&channel| colors.channel(channel).enabled)
            .map(|channel| ColorLayer {
                channel,
                name: channel.layer_name().to_string(),
                data: Vec::new(),
            })
            .collect();
        let uv_layers = UV_LAYER_NAMES.map(|name| UvLayer {
            name: name.to_string(),
            data: Vec::new(),
        });
        Self {
            colors,
            mesh: MeshBuffers {
                positions: Vec::new(),
                faces: Vec::new(),
                face_materials: Vec::new(),
                color_layers,
                uv_layers,
            },
        }
    }

    /// Appends one face using the given material index.
    pub fn push(&mut self, tri: &Triangle, material: u32) {
        let base = self.mesh.positions.len() as u32;
        self.mesh.faces.push([base, base + 1, base + 2]);
        self.mesh.face_materials.push(material);

        for (corner, vertex) in tri.vertices.iter().enumerate() {
            self.mesh.positions.push(vertex.position);
            for (unit, layer) in self.mesh.uv_layers.iter_mut().enumerate() {
                layer.data.push(vertex.uv[unit]);
            }
            for layer in &mut self.mesh.color_layers {
                let options = self.colors.channel(layer.channel);
                let color = tri.channel_color(layer.channel, corner);
                layer
                    .data
                    .push(adjust_color(color, options, self.colors.merge_alpha));
            }
        }
    }

    #[allow(missing_docs)]
    pub fn finish(self) -> MeshBuffers {
        self.mesh
    }
}

fn adjust_color(rgba: [f32; 4], options: ChannelOptions, merge_alpha: bool) -> [f32; 4] {
    let [mut r, mut g, mut b, a] = rgba;
    if options.invert {
        r = 1.0 - r;
        g = 1.0 - g;
        b = 1.0 - b;
    }
    if merge_alpha {
        r *= a;
        g *= a;
        b *= a;
    }
    [r, g, b, a]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::with_positions;

    const QUAD: [[[f32; 3]; 3]; 2] = [
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    ];

    fn build(triangles: &[Triangle], colors: ColorOptions) -> MeshBuffers {
        let mut builder = GeometryBuilder::new(colors);
        for (i, tri) in triangles.iter().enumerate() {
            builder.push(tri, i as u32);
        }
        builder.finish()
    }

    fn quad() -> Vec<Triangle> {
        QUAD.iter()
            .map(|&positions| with_positions(Triangle::default(), positions))
            .collect()
    }

    #[test]
    fn test_expand() {
        let mut tri = Triangle::default();
        tri.vertices[2].uv = [[0.5, 0.25], [2.0, 3.0]];
        tri.vertices[1].color = [0.1, 0.2, 0.3, 0.4];
        tri.primitive_color = [1.0, 0.0, 0.0, 1.0];

        let mesh = build(&[tri.clone(), tri], ColorOptions::default());
        assert_eq!(mesh.positions.len(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.face_materials, vec![0, 1]);
        assert_eq!(mesh.uv_layers[0].data[2], [0.5, 0.25]);
        assert_eq!(mesh.uv_layers[1].data[5], [2.0, 3.0]);

        let names: Vec<_> = mesh.color_layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Shading", "Primitive", "Environment", "Blend", "Fog"]
        );
        assert_eq!(mesh.color_layers[0].data[1], [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(mesh.color_layers[1].data, vec![[1.0, 0.0, 0.0, 1.0]; 6]);
    }

    #[test]
    fn test_channel_options() {
        let mut colors = ColorOptions::default();
        colors.environment.enabled = false;
        colors.primitive.invert = true;
        colors.merge_alpha = true;

        let mut tri = Triangle::default();
        tri.primitive_color = [0.25, 0.5, 1.0, 0.5];
        let mesh = build(&[tri], colors);

        assert!(mesh
            .color_layers
            .iter()
            .all(|l| l.channel != ColorChannel::Environment));
        let primitive = &mesh.color_layers[1];
        assert_eq!(primitive.channel, ColorChannel::Primitive);
        assert_eq!(primitive.data[0], [0.375, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_weld_shared_edge() {
        let mut mesh = build(&quad(), ColorOptions::default());
        let removed = mesh.weld(0.0001);
        assert_eq!(removed, 2);
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.uv_layers[0].data.len(), 6);
        assert_eq!(mesh.color_layers[0].data.len(), 6);
    }

    #[test]
    fn test_weld_removes_collapsed_faces() {
        let mut triangles = quad();
        triangles.insert(
            1,
            with_positions(
                Triangle::default(),
                [[5.0, 5.0, 5.0], [5.00001, 5.0, 5.0], [6.0, 5.0, 5.0]],
            ),
        );
        let mut mesh = build(&triangles, ColorOptions::default());
        mesh.weld(0.0001);

        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.face_materials, vec![0, 2]);
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.corner_count(), 6);
        assert_eq!(mesh.uv_layers[1].data.len(), 6);
        for face in &mesh.faces {
            assert!(face.iter().all(|&v| (v as usize) < mesh.positions.len()));
        }
    }

    #[test]
    fn test_weld_respects_distance() {
        let tri = with_positions(
            Triangle::default(),
            [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]],
        );
        let mut mesh = build(&[tri.clone()], ColorOptions::default());
        mesh.weld(0.0001);
        assert_eq!(mesh.faces.len(), 1);

        let mut mesh = build(&[tri], ColorOptions::default());
        mesh.weld(1.0);
        assert!(mesh.faces.is_empty());
        assert!(mesh.positions.is_empty());
    }

    #[test]
    fn test_weld_extreme_coordinates() {
        let far = with_positions(
            Triangle::default(),
            [[1e30, 0.0, 0.0], [1e30, 0.0, 0.0], [0.0, 1.0, 0.0]],
        );
        let mut mesh = build(&[far], ColorOptions::default());
        mesh.weld(0.0001);
        assert!(mesh.faces.is_empty());

        let far = with_positions(
            Triangle::default(),
            [[1e30, 0.0, 0.0], [-1e30, 0.0, 0.0], [0.0, 1.0, 0.0]],
        );
        let mut mesh = build(&[far], ColorOptions::default());
        assert_eq!(mesh.weld(0.0001), 0);
        assert_eq!(mesh.faces.len(), 1);

        let infinite = with_positions(
            Triangle::default(),
            [
                [f32::INFINITY, 0.0, 0.0],
                [f32::INFINITY, 0.0, 0.0],
                [0.0, f32::NEG_INFINITY, 0.0],
            ],
        );
        let mut mesh = build(&[infinite], ColorOptions::default());
        assert_eq!(mesh.weld(0.0001), 0);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.positions.len(), 3);
    }

    #[test]
    fn test_bounds() {
        let mesh = build(&quad(), ColorOptions::default());
        assert_eq!(mesh.bounds(), Some(([0.0, 0.0, 0.0], [1.0, 1.0, 0.0])));
        assert_eq!(build(&[], ColorOptions::default()).bounds(), None);
    }
}
