//! A portable description of a material's shading network.
//!
//! The graph is a flat list of nodes. Each node input is either a constant or a link
//! to an output socket of an earlier node, so the list is always in topological order.
//! Node kinds correspond to the building blocks that common node-based renderers
//! provide (image texture, vertex color, math, mix shader, ...), plus [NodeKind::Combiner]
//! which evaluates one combiner cycle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    mode::{AddressMode, FilterMode},
    source::{ColorChannel, Source},
};

/// Index of a node in [ShaderGraph::nodes].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// An output socket of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketRef {
    #[allow(missing_docs)]
    pub node: NodeId,
    /// Output index, see the socket constants on [NodeKind].
    pub output: u32,
}

/// The value feeding a node input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// A constant. Color inputs broadcast it to `(v, v, v, 1)`.
    Value(f32),
    /// A link from another node's output.
    Link(SocketRef),
}

impl Input {
    /// The linked socket, if any.
    pub fn link(self) -> Option<SocketRef> {
        match self {
            Input::Value(_) => None,
            Input::Link(socket) => Some(socket),
        }
    }
}

/// Texture lookup behaviour outside of `[0, 1]`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extension {
    Repeat,
    Extend,
}

/// An image texture lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureNode {
    /// Texture unit (0 or 1).
    pub unit: u8,
    /// Image file. The file may not exist yet.
    pub image: PathBuf,
    #[allow(missing_docs)]
    pub filter: FilterMode,
    #[allow(missing_docs)]
    pub extension: Extension,
    /// Address modes requested by the hardware. When they are not expressible by
    /// `extension` alone, the UV input is routed through wrap emulation nodes.
    pub wrap: [AddressMode; 2],
}

/// A scalar math operation with one linked operand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MathOp {
    /// Wraps `x` into `[min, max)`.
    Wrap {
        #[allow(missing_docs)]
        min: f32,
        #[allow(missing_docs)]
        max: f32,
    },
    /// Bounces `x` back and forth in `[0, scale]`.
    PingPong {
        #[allow(missing_docs)]
        scale: f32,
    },
}

/// The operation a node performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Inputs: uv. Outputs: color, alpha.
    Texture(TextureNode),
    /// Outputs: uv.
    UvMap {
        /// UV layer name.
        layer: String,
    },
    /// Outputs: color, alpha.
    VertexColor {
        #[allow(missing_docs)]
        channel: ColorChannel,
    },
    /// Outputs: value.
    Value(f32),
    /// Stand-in for an input that is not emulated. Outputs: color.
    Placeholder {
        #[allow(missing_docs)]
        source: Source,
        #[allow(missing_docs)]
        rgba: [f32; 4],
    },
    /// One combiner cycle. Inputs: color A-D, alpha A-D. Outputs: color, alpha.
    ///
    /// `color = (A - B) * C + D`, `alpha = (A - B) * C + D`.
    Combiner,
    /// Inputs: x. Outputs: value.
    Math(MathOp),
    /// Inputs: vector. Outputs: x, y, z.
    SeparateXyz,
    /// Inputs: x, y, z. Outputs: vector.
    CombineXyz,
    /// Outputs: shader.
    TransparentBsdf,
    /// Inputs: factor, shader 1, shader 2. Outputs: shader.
    MixShader,
    /// Inputs: surface.
    Output,
}

impl NodeKind {
    /// Color output of textures, vertex colors, placeholders and combiners.
    pub const COLOR: u32 = 0;
    /// Alpha output of textures, vertex colors and combiners.
    pub const ALPHA: u32 = 1;
    /// The single output of the remaining node kinds.
    pub const VALUE: u32 = 0;

    /// Number of input sockets.
    pub fn num_inputs(&self) -> usize {
        match self {
            NodeKind::Texture(_) | NodeKind::Math(_) | NodeKind::SeparateXyz => 1,
            NodeKind::UvMap { .. }
            | NodeKind::VertexColor { .. }
            | NodeKind::Value(_)
            | NodeKind::Placeholder { .. }
            | NodeKind::TransparentBsdf => 0,
            NodeKind::Combiner => 8,
            NodeKind::CombineXyz | NodeKind::MixShader => 3,
            NodeKind::Output => 1,
        }
    }

    /// Number of output sockets.
    pub fn num_outputs(&self) -> u32 {
        match self {
            NodeKind::Texture(_) | NodeKind::VertexColor { .. } | NodeKind::Combiner => 2,
            NodeKind::SeparateXyz => 3,
            NodeKind::Output => 0,
            _ => 1,
        }
    }
}

/// A node and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[allow(missing_docs)]
    pub kind: NodeKind,
    /// Display label. Wrap emulation nodes share the label of their group.
    pub label: Option<String>,
    #[allow(missing_docs)]
    pub inputs: Vec<Input>,
}

/// A material's node network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShaderGraph {
    #[allow(missing_docs)]
    pub nodes: Vec<Node>,
}

impl ShaderGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its id.
    ///
    /// # Panics
    /// Panics if the input count does not match the node kind, or an input links to a
    /// node that does not exist yet.
    #[track_caller]
    pub fn add(&mut self, kind: NodeKind, inputs: Vec<Input>) -> NodeId {
        assert_eq!(inputs.len(), kind.num_inputs(), "wrong input count for {:?}", kind);
        for socket in inputs.iter().filter_map(|input| input.link()) {
            let source = &self.nodes[socket.node.0 as usize];
            assert!(socket.output < source.kind.num_outputs(), "invalid output socket");
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            label: None,
            inputs,
        });
        id
    }

    /// Like [ShaderGraph::add], with a label.
    #[track_caller]
    pub fn add_labeled(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        inputs: Vec<Input>,
    ) -> NodeId {
        let id = self.add(kind, inputs);
        self.nodes[id.0 as usize].label = Some(label.into());
        id
    }

    /// Links to the given output of a node.
    pub fn output(&self, node: NodeId, output: u32) -> Input {
        Input::Link(SocketRef { node, output })
    }

    #[allow(missing_docs)]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Iterates over nodes matching a predicate.
    pub fn find<'a>(
        &'a self,
        predicate: impl Fn(&NodeKind) -> bool + 'a,
    ) -> impl Iterator<Item = (NodeId, &'a Node)> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| predicate(&node.kind))
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Number of nodes matching a predicate.
    pub fn count(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.iter().filter(|node| predicate(&node.kind)).count()
    }

    /// The texture nodes, in creation order.
    pub fn textures(&self) -> impl Iterator<Item = &TextureNode> + '_ {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Texture(texture) => Some(texture),
            _ => None,
        })
    }

    /// The surface input of the output node, if there is one.
    pub fn surface(&self) -> Option<Input> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, NodeKind::Output))
            .map(|node| node.inputs[0])
    }
}
