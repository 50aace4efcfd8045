//! Backend-facing renderer contract.
//!
//! The [`Renderer`] trait is the only thing the render graph and the command
//! list know about a graphics backend. It covers:
//!
//! - persistent and transient resource creation by descriptor
//! - shader, texture and model loading
//! - per-command-list recording, one method per [`CommandKind`](crate::command_list::CommandKind)
//! - the frame lifecycle (`begin_command_list` / `end_command_list` / `flip_frame`)
//!   and presentation
//!
//! A headless implementation lives in [`recording`].

mod layers;
pub mod recording;

use std::path::Path;

use bytemuck::Pod;
use glam::Vec4;

pub use layers::{LayerDraw, RenderLayer, RenderLayers, layer_hash};
pub use recording::{CallLog, RecordedCall, RecordingRenderer};

use crate::command_list::{BufferCopy, DrawArgs, DrawIndexedArgs};
use crate::error::RendererResult;
use crate::handles::{
    BufferId, DepthImageId, ImageId, ModelId, PipelineId, SamplerId, SemaphoreId, TextureId,
};
use crate::types::{
    BufferDesc, ColorTarget, DepthImageDesc, DepthTarget, DescriptorBinding, ImageDesc,
    ImageLayout, IndexFormat, PipelineDesc, PrimitiveModelDesc, SamplerDesc, ScissorRect,
    Viewport,
};

/// Backend command list being recorded, returned by
/// [`Renderer::begin_command_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandListId(pub u32);

/// Abstract graphics backend.
pub trait Renderer {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    // Resource creation

    fn create_buffer(&mut self, desc: &BufferDesc) -> RendererResult<BufferId>;

    /// Create a constant buffer initialised with `data`.
    fn create_constant_buffer(&mut self, data: &[u8]) -> RendererResult<BufferId>;

    /// Overwrite part of a buffer.
    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> RendererResult<()>;

    fn create_image(&mut self, desc: &ImageDesc) -> RendererResult<ImageId>;

    fn create_depth_image(&mut self, desc: &DepthImageDesc) -> RendererResult<DepthImageId>;

    /// Create an image that lives until the next [`flip_frame`](Self::flip_frame).
    fn create_transient_image(&mut self, desc: &ImageDesc) -> RendererResult<ImageId>;

    /// Create a depth image that lives until the next [`flip_frame`](Self::flip_frame).
    fn create_transient_depth_image(
        &mut self,
        desc: &DepthImageDesc,
    ) -> RendererResult<DepthImageId>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> RendererResult<SamplerId>;

    fn create_semaphore(&mut self) -> RendererResult<SemaphoreId>;

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> RendererResult<PipelineId>;

    fn create_primitive_model(&mut self, desc: &PrimitiveModelDesc) -> RendererResult<ModelId>;

    /// Replace the geometry of a model created by
    /// [`create_primitive_model`](Self::create_primitive_model).
    fn update_primitive_model(
        &mut self,
        model: ModelId,
        desc: &PrimitiveModelDesc,
    ) -> RendererResult<()>;

    /// Combine same-sized textures into one array texture.
    fn create_texture_array(&mut self, layers: &[TextureId]) -> RendererResult<TextureId>;

    // Loading

    /// Load a compiled shader binary. Pipelines reference shaders by path.
    fn load_shader(&mut self, path: &Path) -> RendererResult<()>;

    fn load_texture(&mut self, path: &Path) -> RendererResult<TextureId>;

    fn load_model(&mut self, path: &Path) -> RendererResult<ModelId>;

    // Frame lifecycle

    fn begin_command_list(&mut self) -> CommandListId;

    fn end_command_list(&mut self, list: CommandListId);

    /// Advance to the next frame, recycling transient resources.
    fn flip_frame(&mut self);

    fn present(&mut self, image: ImageId) -> RendererResult<()>;

    /// Persistent draw state grouped by named layer.
    fn render_layers(&mut self) -> &mut RenderLayers;

    // Recording

    fn signal_semaphore(&mut self, list: CommandListId, semaphore: SemaphoreId);

    fn wait_semaphore(&mut self, list: CommandListId, semaphore: SemaphoreId);

    fn push_marker(&mut self, list: CommandListId, name: &str);

    fn pop_marker(&mut self, list: CommandListId);

    fn begin_trace(&mut self, list: CommandListId, name: &str);

    fn end_trace(&mut self, list: CommandListId);

    fn begin_render_pass(
        &mut self,
        list: CommandListId,
        colors: &[ColorTarget],
        depth: Option<&DepthTarget>,
    );

    fn end_render_pass(&mut self, list: CommandListId);

    fn clear_image(&mut self, list: CommandListId, image: ImageId, color: Vec4);

    fn clear_depth(&mut self, list: CommandListId, image: DepthImageId, depth: f32);

    fn set_viewport(&mut self, list: CommandListId, viewport: &Viewport);

    fn set_scissor(&mut self, list: CommandListId, rect: &ScissorRect);

    fn bind_pipeline(&mut self, list: CommandListId, pipeline: PipelineId);

    fn bind_descriptor_set(&mut self, list: CommandListId, set: u32, bindings: &[DescriptorBinding]);

    fn bind_vertex_buffer(&mut self, list: CommandListId, slot: u32, buffer: BufferId, offset: u64);

    fn bind_index_buffer(
        &mut self,
        list: CommandListId,
        buffer: BufferId,
        offset: u64,
        format: IndexFormat,
    );

    fn draw(&mut self, list: CommandListId, args: &DrawArgs);

    fn draw_indexed(&mut self, list: CommandListId, args: &DrawIndexedArgs);

    fn draw_model(&mut self, list: CommandListId, model: ModelId, instance_count: u32);

    fn copy_buffer(&mut self, list: CommandListId, copy: &BufferCopy);

    fn image_barrier(
        &mut self,
        list: CommandListId,
        image: ImageId,
        from: ImageLayout,
        to: ImageLayout,
    );
}

/// Typed upload helpers on top of [`Renderer`].
pub trait RendererExt: Renderer {
    /// Create a constant buffer holding one `Pod` value.
    fn create_constant_buffer_from<T: Pod>(&mut self, value: &T) -> RendererResult<BufferId> {
        self.create_constant_buffer(bytemuck::bytes_of(value))
    }

    /// Overwrite a constant buffer with one `Pod` value.
    fn update_constant_buffer_from<T: Pod>(
        &mut self,
        buffer: BufferId,
        value: &T,
    ) -> RendererResult<()> {
        self.update_buffer(buffer, 0, bytemuck::bytes_of(value))
    }
}

impl<R: Renderer + ?Sized> RendererExt for R {}
