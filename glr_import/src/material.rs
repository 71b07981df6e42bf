//! Material synthesis: from a triangle's pipeline state to a shading graph.
//!
//! A material is fully determined by its [MaterialKey]. The graph approximates the RDP:
//! one [NodeKind::Combiner] per active combiner cycle, nodes for every input the
//! combiner or blender reads, and a transparency mix when the final blender cycle
//! reads the framebuffer.

use std::{collections::HashMap, path::PathBuf};

use n64_rdp::{
    decode_combine_mode, decode_other_mode,
    formula::{show_blend_formula, show_combine_formula},
    graph::{Extension, Input, MathOp, NodeId, NodeKind, ShaderGraph, TextureNode},
    mode::{AddressMode, FilterMode, Microcode, WrapCombo},
    BlendFormula, ColorChannel, CombinerCycle, Source, SourceKind,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::WrapOverrides,
    geometry::UV_LAYER_NAMES,
    scene::{texture_token, Triangle, NO_TEXTURE},
};

/// Label of combiner nodes.
pub const COMBINER_LABEL: &str = "RDP Color Combiner";

/// The texture state of one unit that affects a material.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureKey {
    pub crc: u64,
    pub wrap: WrapCombo,
}

impl TextureKey {
    #[allow(missing_docs)]
    pub fn is_bound(&self) -> bool {
        self.crc != 0
    }
}

/// The normalized triangle state that determines a material. Triangles with equal
/// keys share one material.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialKey {
    pub combiner_mux: u64,
    pub other_mode: u64,
    pub geometry_mode: u32,
    pub microcode: Microcode,
    pub textures: [TextureKey; 2],
}

impl MaterialKey {
    /// Builds the key for a triangle.
    ///
    /// Unbound units are normalized to the zero key, and unit 1 is dropped when unit 0
    /// is unbound. Wrap overrides are applied to bound units; the triangle itself is
    /// not modified.
    pub fn from_triangle(
        tri: &Triangle,
        microcode: Microcode,
        overrides: &WrapOverrides,
    ) -> Self {
        let mut textures = tri.textures.map(|texture| {
            if texture.is_bound() {
                TextureKey {
                    crc: texture.crc,
                    wrap: overrides.apply(texture.wrap),
                }
            } else {
                TextureKey::default()
            }
        });
        if !textures[0].is_bound() {
            textures[1] = TextureKey::default();
        }
        Self {
            combiner_mux: tri.combiner_mux,
            other_mode: tri.other_mode,
            geometry_mode: tri.geometry_mode,
            microcode,
            textures,
        }
    }

    /// Whether the geometry mode asks for back faces to be culled.
    pub fn culls_backfaces(&self) -> bool {
        self.microcode.culls_backfaces(self.geometry_mode)
    }

    /// The human readable material name, e.g. `0123456789ABCDEF(M) : FEDCBA9876543210 | (N)`.
    ///
    /// Not unique: different keys can share a name.
    pub fn display_name(&self) -> String {
        if !self.textures[0].is_bound() {
            return NO_TEXTURE.to_string();
        }

        let mut name = String::new();
        for (unit, texture) in self.textures.iter().enumerate() {
            if !texture.is_bound() {
                continue;
            }
            if unit == 1 {
                name += " : ";
            }
            name += &texture_token(texture.crc);
            let wrap = texture.wrap.abbreviation();
            if wrap != "R" {
                name += &format!("({})", wrap);
            }
        }
        if !self.culls_backfaces() {
            name += " | (N)";
        }
        name
    }
}

/// Supplies the image file for a texture CRC.
pub trait TextureResolver {
    /// The image path for a non-zero CRC.
    fn resolve(&mut self, crc: u64) -> PathBuf;
}

/// How a renderer should treat the material's alpha.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMethod {
    Opaque,
    Hashed,
}

/// Options that affect every synthesized material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialOptions {
    /// Use [BlendMethod::Hashed] for materials that blend with the framebuffer.
    pub transparency: bool,
    /// Display back face culling for materials that request it.
    pub backface_culling: bool,
}

/// One combiner cycle and the blender cycle that follows it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCycle {
    pub combiner: CombinerCycle,
    pub blender: BlendFormula,
}

/// A texture bound to a material.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTexture {
    pub unit: u8,
    pub crc: u64,
    pub image: PathBuf,
    pub filter: FilterMode,
    pub wrap: [AddressMode; 2],
    pub uv_layer: String,
}

/// Readable forms of the pipeline formulas. Second cycle entries are empty when that
/// cycle is not used.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Formulas {
    pub color: String,
    pub alpha: String,
    pub second_color: String,
    pub second_alpha: String,
    pub blender: String,
    pub second_blender: String,
}

/// A synthesized material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique within an import session.
    pub name: String,
    #[allow(missing_docs)]
    pub key: MaterialKey,
    /// One entry per hardware cycle.
    pub cycles: Vec<PipelineCycle>,
    /// The geometry requests back face culling.
    pub culls_backfaces: bool,
    /// Back faces should be hidden when displaying.
    pub backface_culling: bool,
    #[allow(missing_docs)]
    pub blend_method: BlendMethod,
    /// Bound textures.
    pub textures: Vec<MaterialTexture>,
    #[allow(missing_docs)]
    pub formulas: Formulas,
    #[allow(missing_docs)]
    pub graph: ShaderGraph,
}

impl Material {
    /// Number of combiner nodes in the graph, which is less than the cycle count
    /// when the second cycle only passes the first through.
    pub fn combiner_nodes(&self) -> usize {
        self.graph
            .count(|kind| matches!(kind, NodeKind::Combiner))
    }
}

/// Builds the material for a key.
pub fn synthesize(
    key: &MaterialKey,
    name: String,
    resolver: &mut dyn TextureResolver,
    options: MaterialOptions,
) -> Material {
    let [combiner1, combiner2] = decode_combine_mode(key.combiner_mux);
    let other_mode = decode_other_mode(key.other_mode);
    let two_cycle = other_mode.cycle_type.is_two_cycle();

    let mut cycles = vec![PipelineCycle {
        combiner: combiner1,
        blender: other_mode.blend[0],
    }];
    if two_cycle {
        cycles.push(PipelineCycle {
            combiner: combiner2,
            blender: other_mode.blend[1],
        });
    }

    let textures: Vec<MaterialTexture> = key
        .textures
        .iter()
        .enumerate()
        .filter(|(_, texture)| texture.is_bound())
        .map(|(unit, texture)| MaterialTexture {
            unit: unit as u8,
            crc: texture.crc,
            image: resolver.resolve(texture.crc),
            filter: other_mode.filter_mode(),
            wrap: texture.wrap.address_modes(),
            uv_layer: UV_LAYER_NAMES[unit].to_string(),
        })
        .collect();

    // A second cycle that only forwards the first is not emitted.
    let graph_cycles: Vec<&PipelineCycle> = cycles
        .iter()
        .enumerate()
        .filter(|(i, cycle)| *i == 0 || !cycle.combiner.is_pass_through())
        .map(|(_, cycle)| cycle)
        .collect();

    let mut builder = GraphBuilder::new(&name);
    builder.add_sources(&cycles, &textures);
    for cycle in &graph_cycles {
        builder.add_combiner(&cycle.combiner);
    }

    let mut blend_method = BlendMethod::Opaque;
    let last_blender = cycles[cycles.len() - 1].blender;
    if last_blender.reads_framebuffer() {
        builder.add_alpha_blend();
        if options.transparency {
            blend_method = BlendMethod::Hashed;
        }
    }
    let graph = builder.finish();

    let formulas = Formulas {
        color: show_combine_formula(&combiner1.color),
        alpha: show_combine_formula(&combiner1.alpha),
        second_color: graph_cycles
            .get(1)
            .map(|cycle| show_combine_formula(&cycle.combiner.color))
            .unwrap_or_default(),
        second_alpha: graph_cycles
            .get(1)
            .map(|cycle| show_combine_formula(&cycle.combiner.alpha))
            .unwrap_or_default(),
        blender: show_blend_formula(&cycles[0].blender),
        second_blender: cycles
            .get(1)
            .map(|cycle| show_blend_formula(&cycle.blender))
            .unwrap_or_default(),
    };

    let culls_backfaces = key.culls_backfaces();
    debug!(
        "material {}: {} cycle(s), {} combiner node(s), {} texture(s), {:?}",
        name,
        cycles.len(),
        graph_cycles.len(),
        textures.len(),
        blend_method
    );

    Material {
        name,
        key: *key,
        cycles,
        culls_backfaces,
        backface_culling: culls_backfaces && options.backface_culling,
        blend_method,
        textures,
        formulas,
        graph,
    }
}

struct GraphBuilder<'a> {
    material: &'a str,
    graph: ShaderGraph,
    inputs: HashMap<Source, Input>,
}

impl<'a> GraphBuilder<'a> {
    fn new(material: &'a str) -> Self {
        let inputs = HashMap::from([
            (Source::Zero, Input::Value(0.0)),
            (Source::One, Input::Value(1.0)),
            (Source::CombinedColor, Input::Value(1.0)),
            (Source::CombinedAlpha, Input::Value(1.0)),
        ]);
        Self {
            material,
            graph: ShaderGraph::new(),
            inputs,
        }
    }

    fn input(&self, source: Source) -> Input {
        self.inputs
            .get(&source)
            .copied()
            .unwrap_or(Input::Value(0.0))
    }

    fn set_outputs(&mut self, color: Source, alpha: Option<Source>, node: NodeId) {
        self.inputs
            .insert(color, self.graph.output(node, NodeKind::COLOR));
        if let Some(alpha) = alpha {
            self.inputs
                .insert(alpha, self.graph.output(node, NodeKind::ALPHA));
        }
    }

    /// Creates a node for every source read by any combiner or blender cycle.
    fn add_sources(&mut self, cycles: &[PipelineCycle], textures: &[MaterialTexture]) {
        let mut referenced: Vec<Source> = cycles
            .iter()
            .flat_map(|cycle| {
                cycle
                    .combiner
                    .inputs()
                    .into_iter()
                    .chain(cycle.blender.inputs())
            })
            .collect();
        referenced.sort();
        referenced.dedup();
        let uses = |wanted: &[Source]| wanted.iter().any(|s| referenced.contains(s));

        let texel_sources = [
            (Source::Texel0Color, Source::Texel0Alpha),
            (Source::Texel1Color, Source::Texel1Alpha),
        ];
        for (unit, &(color, alpha)) in texel_sources.iter().enumerate() {
            if !uses(&[color, alpha]) {
                continue;
            }
            match textures.iter().find(|texture| texture.unit as usize == unit) {
                Some(texture) => {
                    let node = self.add_texture(texture);
                    self.set_outputs(color, Some(alpha), node);
                }
                None => {
                    warn!(
                        "material {} reads texel {} but no texture is bound",
                        self.material, unit
                    );
                    self.inputs.insert(color, Input::Value(1.0));
                    self.inputs.insert(alpha, Input::Value(1.0));
                }
            }
        }

        for channel in ColorChannel::ALL {
            let (color, alpha) = channel_sources(channel);
            let wanted: Vec<Source> = std::iter::once(color).chain(alpha).collect();
            if !uses(&wanted) {
                continue;
            }
            let node = self.graph.add_labeled(
                NodeKind::VertexColor { channel },
                channel.layer_name(),
                vec![],
            );
            self.set_outputs(color, alpha, node);
        }

        for source in [Source::LodFraction, Source::PrimitiveLodFraction] {
            if uses(&[source]) {
                let node = self
                    .graph
                    .add_labeled(NodeKind::Value(0.0), source.name(), vec![]);
                self.inputs
                    .insert(source, self.graph.output(node, NodeKind::VALUE));
            }
        }

        for &source in referenced.iter().filter(|s| s.is_unimplemented()) {
            warn!(
                "material {}: unimplemented combiner input {}",
                self.material, source
            );
            let node = self.graph.add_labeled(
                NodeKind::Placeholder {
                    source,
                    rgba: [0.0, 1.0, 1.0, 1.0],
                },
                format!("UNIMPLEMENTED {}", source),
                vec![],
            );
            self.inputs
                .insert(source, self.graph.output(node, NodeKind::COLOR));
        }

        debug_assert!(referenced
            .iter()
            .all(|s| self.inputs.contains_key(s) || s.kind() == SourceKind::BlenderOnly));
    }

    fn add_texture(&mut self, texture: &MaterialTexture) -> NodeId {
        let uv_map = self.graph.add_labeled(
            NodeKind::UvMap {
                layer: texture.uv_layer.clone(),
            },
            format!("UV Map Texture {}", texture.unit),
            vec![],
        );
        let uv = self.graph.output(uv_map, NodeKind::VALUE);

        let (extension, vector) = match texture.wrap {
            [AddressMode::Repeat, AddressMode::Repeat] => (Extension::Repeat, uv),
            [AddressMode::Clamp, AddressMode::Clamp] => (Extension::Extend, uv),
            wrap => (Extension::Extend, self.add_wrap_emulation(uv, wrap)),
        };

        self.graph.add_labeled(
            NodeKind::Texture(TextureNode {
                unit: texture.unit,
                image: texture.image.clone(),
                filter: texture.filter,
                extension,
                wrap: texture.wrap,
            }),
            format!("Texture {}", texture.unit),
            vec![vector],
        )
    }

    /// Per-axis math on the UV vector for wrap combinations the texture node cannot
    /// express. Clamped axes pass through since the texture extends its edges.
    fn add_wrap_emulation(&mut self, uv: Input, wrap: [AddressMode; 2]) -> Input {
        let [s, t] = wrap;
        let label = format!(
            "{} ({}) x {} ({})",
            s.name(),
            s.abbreviation(),
            t.name(),
            t.abbreviation()
        );

        let separate = self
            .graph
            .add_labeled(NodeKind::SeparateXyz, label.clone(), vec![uv]);
        let mut axes = [Input::Value(0.0); 2];
        for (axis, mode) in wrap.into_iter().enumerate() {
            let value = self.graph.output(separate, axis as u32);
            axes[axis] = match mode {
                AddressMode::Repeat => {
                    self.add_math(MathOp::Wrap { min: 0.0, max: 1.0 }, &label, value)
                }
                AddressMode::Mirror => {
                    self.add_math(MathOp::PingPong { scale: 1.0 }, &label, value)
                }
                AddressMode::Clamp => value,
            };
        }
        let combine = self.graph.add_labeled(
            NodeKind::CombineXyz,
            label,
            vec![axes[0], axes[1], Input::Value(0.0)],
        );
        self.graph.output(combine, NodeKind::VALUE)
    }

    fn add_math(&mut self, op: MathOp, label: &str, value: Input) -> Input {
        let node = self.graph.add_labeled(NodeKind::Math(op), label, vec![value]);
        self.graph.output(node, NodeKind::VALUE)
    }

    fn add_combiner(&mut self, cycle: &CombinerCycle) {
        let inputs = cycle
            .inputs()
            .iter()
            .map(|&source| self.input(source))
            .collect();
        let node = self
            .graph
            .add_labeled(NodeKind::Combiner, COMBINER_LABEL, inputs);
        self.set_outputs(Source::CombinedColor, Some(Source::CombinedAlpha), node);
    }

    /// Approximates a framebuffer read as mixing the combined color over transparency
    /// by the combined alpha.
    fn add_alpha_blend(&mut self) {
        let transparent = self.graph.add(NodeKind::TransparentBsdf, vec![]);
        let inputs = vec![
            self.input(Source::CombinedAlpha),
            self.graph.output(transparent, NodeKind::VALUE),
            self.input(Source::CombinedColor),
        ];
        let mix = self.graph.add(NodeKind::MixShader, inputs);
        self.inputs
            .insert(Source::CombinedColor, self.graph.output(mix, NodeKind::VALUE));
    }

    fn finish(mut self) -> ShaderGraph {
        let surface = self.input(Source::CombinedColor);
        self.graph.add(NodeKind::Output, vec![surface]);
        self.graph
    }
}

fn channel_sources(channel: ColorChannel) -> (Source, Option<Source>) {
    match channel {
        ColorChannel::Shading => (Source::ShadingColor, Some(Source::ShadingAlpha)),
        ColorChannel::Primitive => (Source::PrimitiveColor, Some(Source::PrimitiveAlpha)),
        ColorChannel::Environment => (Source::EnvironmentColor, Some(Source::EnvironmentAlpha)),
        ColorChannel::Blend => (Source::BlendColor, None),
        ColorChannel::Fog => (Source::FogColor, Some(Source::FogAlpha)),
    }
}
