//! Draw list: what `on_draw` hooks produce.
//!
//! The kernel does not talk to a GPU. Each draw pass fills a [`DrawList`]
//! with one [`DrawCommand`] per quad (model matrix, optional texture, tint)
//! plus a projection matrix set once per frame; a rendering backend consumes
//! the list and issues the actual uniform updates and draw calls.

use crate::math::{Mat4, Transform2d};
use crate::node::NodeId;

/// One textured (or flat) unit quad to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub node: NodeId,
    pub model: Mat4,
    pub texture: Option<String>,
    pub tint: [f32; 4],
}

/// Commands collected during one draw pass, in tree order.
#[derive(Debug, Clone)]
pub struct DrawList {
    projection: Mat4,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            commands: Vec::new(),
        }
    }

    /// Orthographic projection centred on the origin, `width` x `height` units.
    pub fn orthographic(width: f32, height: f32) -> Mat4 {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Mat4::orthographic_rh(-hw, hw, -hh, hh, -1.0, 1.0)
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Queue a quad at `transform`.
    pub fn quad(
        &mut self,
        node: NodeId,
        transform: &Transform2d,
        texture: Option<&str>,
        tint: [f32; 4],
    ) {
        self.commands.push(DrawCommand {
            node,
            model: transform.matrix(),
            texture: texture.map(str::to_owned),
            tint,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop the previous frame's commands; the projection is kept.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new()
    }
}
