//! Declaration-time API handed to each pass's setup callback.

use crate::error::{RendererError, RendererResult};
use crate::handles::{DepthImage, Image, ResourceId};
use crate::renderer::Renderer;
use crate::types::{ClearValue, DepthImageDesc, ImageDesc, LoadMode, ShaderStage, WriteMode};

use super::resources::{
    RenderGraphResources, RenderPassMutableResource, RenderPassResource, SlotWrite, TrackedKind,
};

/// Descriptor of a resource a pass can create for the current frame.
pub trait TransientDesc {
    type Kind: TrackedKind;

    fn create_transient(
        &self,
        renderer: &mut dyn Renderer,
    ) -> RendererResult<ResourceId<Self::Kind>>;

    fn clear_value(&self) -> ClearValue;
}

impl TransientDesc for ImageDesc {
    type Kind = Image;

    fn create_transient(&self, renderer: &mut dyn Renderer) -> RendererResult<ResourceId<Image>> {
        renderer.create_transient_image(self)
    }

    fn clear_value(&self) -> ClearValue {
        ClearValue::Color(self.clear_color)
    }
}

impl TransientDesc for DepthImageDesc {
    type Kind = DepthImage;

    fn create_transient(
        &self,
        renderer: &mut dyn Renderer,
    ) -> RendererResult<ResourceId<DepthImage>> {
        renderer.create_transient_depth_image(self)
    }

    fn clear_value(&self) -> ClearValue {
        ClearValue::Depth(self.clear_depth)
    }
}

/// Registers one pass's transients, reads and writes.
///
/// Reads and writes of the same concrete ID, from any pass, share one slot
/// of the frame's [`RenderGraphResources`].
pub struct RenderGraphBuilder<'a> {
    renderer: &'a mut dyn Renderer,
    resources: &'a mut RenderGraphResources,
    pass: usize,
    pass_name: &'a str,
    error: Option<RendererError>,
}

impl<'a> RenderGraphBuilder<'a> {
    pub(crate) fn new(
        renderer: &'a mut dyn Renderer,
        resources: &'a mut RenderGraphResources,
        pass: usize,
        pass_name: &'a str,
    ) -> Self {
        Self {
            renderer,
            resources,
            pass,
            pass_name,
            error: None,
        }
    }

    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Declaration index of the pass being set up.
    pub fn pass_index(&self) -> usize {
        self.pass
    }

    /// Backend access for persistent resources and render layers.
    pub fn renderer(&mut self) -> &mut dyn Renderer {
        &mut *self.renderer
    }

    /// Create a transient resource that lives until the renderer flips the frame.
    ///
    /// Every call yields a fresh concrete ID. If the backend fails, the error
    /// is kept for [`RenderGraph::setup`](super::RenderGraph::setup) to report
    /// and [`ResourceId::INVALID`] is returned.
    pub fn create<D: TransientDesc>(&mut self, desc: &D) -> ResourceId<D::Kind> {
        match desc.create_transient(&mut *self.renderer) {
            Ok(id) => {
                let slot = self.resources.register_transient(id, desc.clear_value());
                log::trace!(
                    "RenderGraphBuilder: pass '{}' created {:?} in slot {}",
                    self.pass_name,
                    id,
                    slot
                );
                id
            }
            Err(err) => {
                log::error!(
                    "RenderGraphBuilder: pass '{}' failed to create a transient: {}",
                    self.pass_name,
                    err
                );
                if self.error.is_none() {
                    self.error = Some(err);
                }
                ResourceId::INVALID
            }
        }
    }

    /// Declare that this pass reads `id` from the given shader stages.
    pub fn read<T: TrackedKind>(
        &mut self,
        id: ResourceId<T>,
        stages: ShaderStage,
    ) -> RenderPassResource<T> {
        self.check(id);
        let handle = self.resources.get_resource(id);
        let usage = self.resources.usage_mut::<T>(handle.index());
        usage.read_stages |= stages;
        if !usage.readers.contains(&self.pass) {
            usage.readers.push(self.pass);
        }
        handle
    }

    /// Declare that this pass writes `id`.
    pub fn write<T: TrackedKind>(
        &mut self,
        id: ResourceId<T>,
        mode: WriteMode,
        load: LoadMode,
    ) -> RenderPassMutableResource<T> {
        self.check(id);
        let handle = self.resources.get_mutable_resource(id);
        self.resources
            .usage_mut::<T>(handle.index())
            .writes
            .push(SlotWrite {
                pass: self.pass,
                mode,
                load,
            });
        handle
    }

    fn check<T: TrackedKind>(&self, id: ResourceId<T>) {
        assert!(
            id.is_valid() || self.error.is_some(),
            "pass '{}' registered an invalid {} handle",
            self.pass_name,
            T::NAME
        );
    }

    pub(crate) fn finish(self) -> Option<RendererError> {
        self.error
    }
}
