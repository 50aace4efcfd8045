//! Named render layers.
//!
//! Layers hold persistent draw state (what to draw every frame) outside the
//! per-frame graph. A pass typically snapshots a layer during setup and
//! replays it with [`RenderLayer::record`] during execute.

use std::collections::HashMap;

use crate::command_list::CommandList;
use crate::handles::{ModelId, PipelineId};
use crate::types::DescriptorBinding;

/// 64-bit FNV-1a hash of a layer name.
pub const fn layer_hash(name: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let bytes = name.as_bytes();
    let mut hash = OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// One persistent draw in a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDraw {
    pub pipeline: PipelineId,
    pub bindings: Vec<DescriptorBinding>,
    pub model: ModelId,
    pub instance_count: u32,
}

/// A named group of persistent draws.
#[derive(Debug, Clone)]
pub struct RenderLayer {
    name: String,
    draws: Vec<LayerDraw>,
    visible: bool,
}

impl RenderLayer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            draws: Vec::new(),
            visible: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn draws(&self) -> &[LayerDraw] {
        &self.draws
    }

    pub fn add_draw(&mut self, draw: LayerDraw) {
        self.draws.push(draw);
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether recording this layer would emit any draw.
    pub fn has_work(&self) -> bool {
        self.visible && !self.draws.is_empty()
    }

    /// Emit the layer's draws inside a marker named after the layer.
    ///
    /// Pipeline binds are skipped when consecutive draws share a pipeline.
    pub fn record(&self, cmd: &mut CommandList) {
        if !self.has_work() {
            return;
        }

        let mut scope = cmd.scoped_marker(self.name.as_str());
        let mut bound = None;
        for draw in &self.draws {
            if bound != Some(draw.pipeline) {
                scope.bind_pipeline(draw.pipeline);
                bound = Some(draw.pipeline);
            }
            if !draw.bindings.is_empty() {
                scope.bind_descriptor_set(0, &draw.bindings);
            }
            scope.draw_model(draw.model, draw.instance_count);
        }
    }
}

/// Layer registry keyed by [`layer_hash`].
#[derive(Debug, Default)]
pub struct RenderLayers {
    layers: HashMap<u64, RenderLayer>,
}

impl RenderLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a layer, creating an empty one on first use.
    ///
    /// # Panics
    ///
    /// Panics if a different name already occupies the same hash.
    pub fn get_or_create(&mut self, name: &str) -> &mut RenderLayer {
        let layer = self
            .layers
            .entry(layer_hash(name))
            .or_insert_with(|| RenderLayer::new(name));
        assert_eq!(
            layer.name, name,
            "render layer hash collision between '{}' and '{}'",
            layer.name, name
        );
        layer
    }

    pub fn get(&self, name: &str) -> Option<&RenderLayer> {
        self.get_by_hash(layer_hash(name))
    }

    pub fn get_by_hash(&self, hash: u64) -> Option<&RenderLayer> {
        self.layers.get(&hash)
    }

    pub fn remove(&mut self, name: &str) -> Option<RenderLayer> {
        self.layers.remove(&layer_hash(name))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_list::{CommandKind, CommandStorage, DispatchTable};

    const OPAQUE: u64 = layer_hash("opaque");

    fn draw(pipeline: u32, model: u32) -> LayerDraw {
        LayerDraw {
            pipeline: PipelineId::from_raw(pipeline),
            bindings: Vec::new(),
            model: ModelId::from_raw(model),
            instance_count: 1,
        }
    }

    #[test]
    fn test_hash_is_stable() {
        // Reference value of FNV-1a 64 for "a".
        assert_eq!(layer_hash("a"), 0xaf63_dc4c_8601_ec8c);
        assert_ne!(layer_hash("opaque"), layer_hash("transparent"));
    }

    #[test]
    fn test_get_or_create_reuses_layer() {
        let mut layers = RenderLayers::new();
        layers.get_or_create("opaque").add_draw(draw(0, 0));
        layers.get_or_create("opaque").add_draw(draw(0, 1));
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.get_by_hash(OPAQUE).unwrap().draws().len(), 2);
    }

    #[test]
    fn test_record_skips_redundant_pipeline_binds() {
        let mut layers = RenderLayers::new();
        let layer = layers.get_or_create("opaque");
        layer.add_draw(draw(0, 0));
        layer.add_draw(draw(0, 1));
        layer.add_draw(draw(1, 2));

        let mut cmd = CommandList::new(CommandStorage::default(), DispatchTable::RENDERER, true, true);
        layers.get("opaque").unwrap().record(&mut cmd);

        let kinds: Vec<_> = cmd.commands().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::PushMarker,
                CommandKind::BindPipeline,
                CommandKind::DrawModel,
                CommandKind::DrawModel,
                CommandKind::BindPipeline,
                CommandKind::DrawModel,
                CommandKind::PopMarker,
            ]
        );
    }

    #[test]
    fn test_hidden_layer_records_nothing() {
        let mut layers = RenderLayers::new();
        let layer = layers.get_or_create("debug");
        layer.add_draw(draw(0, 0));
        layer.set_visible(false);

        let mut cmd = CommandList::new(CommandStorage::default(), DispatchTable::RENDERER, true, true);
        layers.get("debug").unwrap().record(&mut cmd);
        assert!(cmd.is_empty());
    }
}
