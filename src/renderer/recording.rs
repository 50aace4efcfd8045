//! Headless recording backend.
//!
//! `RecordingRenderer` doesn't talk to a GPU. It hands out real handles,
//! validates every handle it is given, keeps buffer contents on the CPU and
//! appends every lifecycle and recording call to a shared [`CallLog`]. It is
//! the backend used by tests, benchmarks and tools that want to inspect the
//! command stream a frame produces.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec4;
use image::GenericImageView;
use parking_lot::Mutex;

use super::{CommandListId, RenderLayers, Renderer};
use crate::command_list::{BufferCopy, Command, DrawArgs, DrawIndexedArgs};
use crate::error::{RendererError, RendererResult};
use crate::handles::{
    Buffer, BufferId, DepthImage, DepthImageId, HandleAllocator, Image, ImageId, Model, ModelId,
    Pipeline, PipelineId, Sampler, SamplerId, Semaphore, SemaphoreId, Texture, TextureId,
};
use crate::types::{
    BufferDesc, BufferUsage, ColorTarget, DepthImageDesc, DepthTarget, DescriptorBinding,
    ImageDesc, ImageLayout, IndexFormat, PipelineDesc, PrimitiveModelDesc, SamplerDesc,
    ScissorRect, Viewport,
};

/// First word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// `offset..offset + len` as a slice range, `None` if it doesn't fit in memory.
fn byte_range(offset: u64, len: u64) -> Option<Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = usize::try_from(offset.checked_add(len)?).ok()?;
    Some(start..end)
}

/// One call observed by the recording backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    BeginCommandList(CommandListId),
    EndCommandList(CommandListId),
    Command(CommandListId, Command),
    FlipFrame(u64),
    Present(ImageId),
}

/// Shared, append-only log of recorded calls.
pub type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

#[derive(Debug)]
struct BufferRecord {
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextureRecord {
    width: u32,
    height: u32,
    layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModelRecord {
    vertex_count: u32,
    index_count: u32,
}

/// Headless [`Renderer`] that records instead of rendering.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    buffer_ids: HandleAllocator<Buffer>,
    image_ids: HandleAllocator<Image>,
    depth_image_ids: HandleAllocator<DepthImage>,
    texture_ids: HandleAllocator<Texture>,
    model_ids: HandleAllocator<Model>,
    pipeline_ids: HandleAllocator<Pipeline>,
    sampler_ids: HandleAllocator<Sampler>,
    semaphore_ids: HandleAllocator<Semaphore>,

    buffers: HashMap<BufferId, BufferRecord>,
    images: HashMap<ImageId, ImageDesc>,
    depth_images: HashMap<DepthImageId, DepthImageDesc>,
    textures: HashMap<TextureId, TextureRecord>,
    models: HashMap<ModelId, ModelRecord>,
    pipelines: HashMap<PipelineId, PipelineDesc>,
    samplers: HashSet<SamplerId>,
    semaphores: HashSet<SemaphoreId>,
    shaders: HashMap<PathBuf, Vec<u8>>,

    transient_images: Vec<ImageId>,
    transient_depth_images: Vec<DepthImageId>,

    next_command_list: u32,
    open_lists: HashSet<CommandListId>,
    frame: u64,
    layers: RenderLayers,
    log: CallLog,
    validation_errors: Vec<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the call log; stays valid after the renderer is dropped.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.lock().clone()
    }

    /// Snapshot of the recorded commands only, across all command lists.
    pub fn recorded_commands(&self) -> Vec<Command> {
        self.log
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Command(_, command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.lock().clear();
    }

    /// Problems found while validating recorded handles.
    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    /// Frames completed via [`Renderer::flip_frame`].
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of transient images alive this frame.
    pub fn transient_image_count(&self) -> usize {
        self.transient_images.len() + self.transient_depth_images.len()
    }

    pub fn image_desc(&self, image: ImageId) -> Option<&ImageDesc> {
        self.images.get(&image)
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|record| record.data.as_slice())
    }

    /// Dimensions and layer count of a texture.
    pub fn texture_extent(&self, texture: TextureId) -> Option<(u32, u32, u32)> {
        self.textures
            .get(&texture)
            .map(|t| (t.width, t.height, t.layers))
    }

    /// Vertex and index counts of a model.
    pub fn model_counts(&self, model: ModelId) -> Option<(u32, u32)> {
        self.models
            .get(&model)
            .map(|m| (m.vertex_count, m.index_count))
    }

    fn record(&mut self, list: CommandListId, command: Command) {
        if !self.open_lists.contains(&list) {
            self.invalid(format!("{:?} recorded into closed {:?}", command.kind(), list));
        }
        log::trace!("RecordingRenderer: {:?} {:?}", list, command);
        self.log.lock().push(RecordedCall::Command(list, command));
    }

    fn invalid(&mut self, message: String) {
        log::warn!("RecordingRenderer: {}", message);
        self.validation_errors.push(message);
    }

    fn check_image(&mut self, image: ImageId) {
        if !self.images.contains_key(&image) {
            self.invalid(format!("unknown {:?}", image));
        }
    }

    fn check_depth_image(&mut self, image: DepthImageId) {
        if !self.depth_images.contains_key(&image) {
            self.invalid(format!("unknown {:?}", image));
        }
    }

    fn check_buffer(&mut self, buffer: BufferId) {
        if !self.buffers.contains_key(&buffer) {
            self.invalid(format!("unknown {:?}", buffer));
        }
    }

    fn check_binding(&mut self, binding: &DescriptorBinding) {
        match *binding {
            DescriptorBinding::ConstantBuffer(b) | DescriptorBinding::StorageBuffer(b) => {
                self.check_buffer(b)
            }
            DescriptorBinding::Texture(t) => {
                if !self.textures.contains_key(&t) {
                    self.invalid(format!("unknown {:?}", t));
                }
            }
            DescriptorBinding::SampledImage(i) | DescriptorBinding::StorageImage(i) => {
                self.check_image(i)
            }
            DescriptorBinding::DepthImage(d) => self.check_depth_image(d),
            DescriptorBinding::Sampler(s) => {
                if !self.samplers.contains(&s) {
                    self.invalid(format!("unknown {:?}", s));
                }
            }
        }
    }

    fn validate_image_desc(desc: &ImageDesc) -> RendererResult<()> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(RendererError::ResourceCreationFailed {
                kind: "image",
                reason: format!(
                    "invalid extent {}x{} with {} mips",
                    desc.width, desc.height, desc.mip_levels
                ),
            });
        }
        Ok(())
    }

    fn validate_depth_desc(desc: &DepthImageDesc) -> RendererResult<()> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RendererError::ResourceCreationFailed {
                kind: "depth image",
                reason: format!("invalid extent {}x{}", desc.width, desc.height),
            });
        }
        Ok(())
    }

    fn model_record(desc: &PrimitiveModelDesc) -> RendererResult<ModelRecord> {
        let vertex_count = desc.vertex_count();
        if let Some(&index) = desc.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(RendererError::ResourceCreationFailed {
                kind: "model",
                reason: format!("index {} out of range for {} vertices", index, vertex_count),
            });
        }
        Ok(ModelRecord {
            vertex_count,
            index_count: desc.index_count(),
        })
    }

    /// Count vertices and triangulated indices of a Wavefront OBJ file.
    fn parse_obj(source: &str) -> (u32, u32) {
        let mut vertices = 0u32;
        let mut indices = 0u32;
        for line in source.lines() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => vertices += 1,
                Some("f") => {
                    let corners = parts.count() as u32;
                    if corners >= 3 {
                        indices += (corners - 2) * 3;
                    }
                }
                _ => {}
            }
        }
        (vertices, indices)
    }
}

impl Renderer for RecordingRenderer {
    fn name(&self) -> &'static str {
        "Recording"
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> RendererResult<BufferId> {
        if desc.size == 0 {
            return Err(RendererError::ResourceCreationFailed {
                kind: "buffer",
                reason: "zero-sized buffer".into(),
            });
        }
        let id = self.buffer_ids.allocate();
        log::trace!(
            "RecordingRenderer: creating buffer {:?} {:?} (size: {})",
            id,
            desc.label,
            desc.size
        );
        self.buffers.insert(
            id,
            BufferRecord {
                usage: desc.usage,
                data: vec![0; desc.size as usize],
            },
        );
        Ok(id)
    }

    fn create_constant_buffer(&mut self, data: &[u8]) -> RendererResult<BufferId> {
        let id = self.create_buffer(&BufferDesc::new(
            data.len() as u64,
            BufferUsage::CONSTANT | BufferUsage::COPY_DST,
        ))?;
        self.update_buffer(id, 0, data)?;
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> RendererResult<()> {
        let record = self
            .buffers
            .get_mut(&buffer)
            .ok_or(RendererError::InvalidHandle { kind: "buffer" })?;
        let range = byte_range(offset, data.len() as u64)
            .filter(|range| range.end <= record.data.len());
        let Some(range) = range else {
            return Err(RendererError::ResourceCreationFailed {
                kind: "buffer",
                reason: format!(
                    "write of {} bytes at offset {} past size {}",
                    data.len(),
                    offset,
                    record.data.len()
                ),
            });
        };
        record.data[range].copy_from_slice(data);
        Ok(())
    }

    fn create_image(&mut self, desc: &ImageDesc) -> RendererResult<ImageId> {
        Self::validate_image_desc(desc)?;
        let id = self.image_ids.allocate();
        log::trace!(
            "RecordingRenderer: creating image {:?} {:?} ({}x{})",
            id,
            desc.label,
            desc.width,
            desc.height
        );
        self.images.insert(id, desc.clone());
        Ok(id)
    }

    fn create_depth_image(&mut self, desc: &DepthImageDesc) -> RendererResult<DepthImageId> {
        Self::validate_depth_desc(desc)?;
        let id = self.depth_image_ids.allocate();
        self.depth_images.insert(id, desc.clone());
        Ok(id)
    }

    fn create_transient_image(&mut self, desc: &ImageDesc) -> RendererResult<ImageId> {
        let id = self.create_image(desc)?;
        self.transient_images.push(id);
        Ok(id)
    }

    fn create_transient_depth_image(
        &mut self,
        desc: &DepthImageDesc,
    ) -> RendererResult<DepthImageId> {
        let id = self.create_depth_image(desc)?;
        self.transient_depth_images.push(id);
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> RendererResult<SamplerId> {
        log::trace!("RecordingRenderer: creating sampler {:?}", desc.label);
        let id = self.sampler_ids.allocate();
        self.samplers.insert(id);
        Ok(id)
    }

    fn create_semaphore(&mut self) -> RendererResult<SemaphoreId> {
        let id = self.semaphore_ids.allocate();
        self.semaphores.insert(id);
        Ok(id)
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> RendererResult<PipelineId> {
        let shaders = std::iter::once(&desc.vertex_shader).chain(desc.fragment_shader.as_ref());
        for shader in shaders {
            if !self.shaders.contains_key(Path::new(shader)) {
                return Err(RendererError::ResourceCreationFailed {
                    kind: "pipeline",
                    reason: format!("shader '{}' was not loaded", shader),
                });
            }
        }
        let id = self.pipeline_ids.allocate();
        self.pipelines.insert(id, desc.clone());
        Ok(id)
    }

    fn create_primitive_model(&mut self, desc: &PrimitiveModelDesc) -> RendererResult<ModelId> {
        let record = Self::model_record(desc)?;
        let id = self.model_ids.allocate();
        self.models.insert(id, record);
        Ok(id)
    }

    fn update_primitive_model(
        &mut self,
        model: ModelId,
        desc: &PrimitiveModelDesc,
    ) -> RendererResult<()> {
        let record = Self::model_record(desc)?;
        let slot = self
            .models
            .get_mut(&model)
            .ok_or(RendererError::InvalidHandle { kind: "model" })?;
        *slot = record;
        Ok(())
    }

    fn create_texture_array(&mut self, layers: &[TextureId]) -> RendererResult<TextureId> {
        let mut extent = None;
        for texture in layers {
            let record = self
                .textures
                .get(texture)
                .ok_or(RendererError::InvalidHandle { kind: "texture" })?;
            match extent {
                None => extent = Some((record.width, record.height)),
                Some(e) if e != (record.width, record.height) => {
                    return Err(RendererError::ResourceCreationFailed {
                        kind: "texture array",
                        reason: format!(
                            "layer {:?} is {}x{}, expected {}x{}",
                            texture, record.width, record.height, e.0, e.1
                        ),
                    });
                }
                Some(_) => {}
            }
        }
        let Some((width, height)) = extent else {
            return Err(RendererError::ResourceCreationFailed {
                kind: "texture array",
                reason: "no layers".into(),
            });
        };
        let id = self.texture_ids.allocate();
        self.textures.insert(
            id,
            TextureRecord {
                width,
                height,
                layers: layers.len() as u32,
            },
        );
        Ok(id)
    }

    fn load_shader(&mut self, path: &Path) -> RendererResult<()> {
        let bytes = std::fs::read(path)?;
        let magic = bytes
            .get(0..4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        if bytes.len() % 4 != 0 || magic != Some(SPIRV_MAGIC) {
            return Err(RendererError::ShaderLoadFailed {
                path: path.to_path_buf(),
                reason: "not a SPIR-V module".into(),
            });
        }
        log::debug!("RecordingRenderer: loaded shader {:?} ({} bytes)", path, bytes.len());
        self.shaders.insert(path.to_path_buf(), bytes);
        Ok(())
    }

    fn load_texture(&mut self, path: &Path) -> RendererResult<TextureId> {
        let image = image::open(path).map_err(|source| RendererError::TextureLoadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let (width, height) = image.dimensions();
        let id = self.texture_ids.allocate();
        self.textures.insert(
            id,
            TextureRecord {
                width,
                height,
                layers: 1,
            },
        );
        log::debug!(
            "RecordingRenderer: loaded texture {:?} as {:?} ({}x{})",
            path,
            id,
            width,
            height
        );
        Ok(id)
    }

    fn load_model(&mut self, path: &Path) -> RendererResult<ModelId> {
        let source = std::fs::read_to_string(path)?;
        let (vertex_count, index_count) = Self::parse_obj(&source);
        if vertex_count == 0 {
            return Err(RendererError::ModelLoadFailed {
                path: path.to_path_buf(),
                reason: "no vertices".into(),
            });
        }
        let id = self.model_ids.allocate();
        self.models.insert(
            id,
            ModelRecord {
                vertex_count,
                index_count,
            },
        );
        Ok(id)
    }

    fn begin_command_list(&mut self) -> CommandListId {
        let id = CommandListId(self.next_command_list);
        self.next_command_list += 1;
        self.open_lists.insert(id);
        self.log.lock().push(RecordedCall::BeginCommandList(id));
        id
    }

    fn end_command_list(&mut self, list: CommandListId) {
        if !self.open_lists.remove(&list) {
            self.invalid(format!("end of unknown {:?}", list));
        }
        self.log.lock().push(RecordedCall::EndCommandList(list));
    }

    fn flip_frame(&mut self) {
        for image in self.transient_images.drain(..) {
            self.images.remove(&image);
        }
        for image in self.transient_depth_images.drain(..) {
            self.depth_images.remove(&image);
        }
        self.frame += 1;
        self.log.lock().push(RecordedCall::FlipFrame(self.frame));
    }

    fn present(&mut self, image: ImageId) -> RendererResult<()> {
        if !self.images.contains_key(&image) {
            return Err(RendererError::PresentFailed(format!("unknown {:?}", image)));
        }
        self.log.lock().push(RecordedCall::Present(image));
        Ok(())
    }

    fn render_layers(&mut self) -> &mut RenderLayers {
        &mut self.layers
    }

    fn signal_semaphore(&mut self, list: CommandListId, semaphore: SemaphoreId) {
        if !self.semaphores.contains(&semaphore) {
            self.invalid(format!("unknown {:?}", semaphore));
        }
        self.record(list, Command::SignalSemaphore(semaphore));
    }

    fn wait_semaphore(&mut self, list: CommandListId, semaphore: SemaphoreId) {
        if !self.semaphores.contains(&semaphore) {
            self.invalid(format!("unknown {:?}", semaphore));
        }
        self.record(list, Command::WaitSemaphore(semaphore));
    }

    fn push_marker(&mut self, list: CommandListId, name: &str) {
        self.record(list, Command::PushMarker(name.to_string()));
    }

    fn pop_marker(&mut self, list: CommandListId) {
        self.record(list, Command::PopMarker);
    }

    fn begin_trace(&mut self, list: CommandListId, name: &str) {
        self.record(list, Command::BeginTrace(name.to_string()));
    }

    fn end_trace(&mut self, list: CommandListId) {
        self.record(list, Command::EndTrace);
    }

    fn begin_render_pass(
        &mut self,
        list: CommandListId,
        colors: &[ColorTarget],
        depth: Option<&DepthTarget>,
    ) {
        for color in colors {
            self.check_image(color.image);
        }
        if let Some(depth) = depth {
            self.check_depth_image(depth.image);
        }
        self.record(
            list,
            Command::BeginRenderPass {
                colors: colors.to_vec(),
                depth: depth.copied(),
            },
        );
    }

    fn end_render_pass(&mut self, list: CommandListId) {
        self.record(list, Command::EndRenderPass);
    }

    fn clear_image(&mut self, list: CommandListId, image: ImageId, color: Vec4) {
        self.check_image(image);
        self.record(list, Command::ClearImage { image, color });
    }

    fn clear_depth(&mut self, list: CommandListId, image: DepthImageId, depth: f32) {
        self.check_depth_image(image);
        self.record(list, Command::ClearDepth { image, depth });
    }

    fn set_viewport(&mut self, list: CommandListId, viewport: &Viewport) {
        self.record(list, Command::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, list: CommandListId, rect: &ScissorRect) {
        self.record(list, Command::SetScissor(*rect));
    }

    fn bind_pipeline(&mut self, list: CommandListId, pipeline: PipelineId) {
        if !self.pipelines.contains_key(&pipeline) {
            self.invalid(format!("unknown {:?}", pipeline));
        }
        self.record(list, Command::BindPipeline(pipeline));
    }

    fn bind_descriptor_set(&mut self, list: CommandListId, set: u32, bindings: &[DescriptorBinding]) {
        for binding in bindings {
            self.check_binding(binding);
        }
        self.record(
            list,
            Command::BindDescriptorSet {
                set,
                bindings: bindings.to_vec(),
            },
        );
    }

    fn bind_vertex_buffer(&mut self, list: CommandListId, slot: u32, buffer: BufferId, offset: u64) {
        self.check_buffer(buffer);
        self.record(
            list,
            Command::BindVertexBuffer {
                slot,
                buffer,
                offset,
            },
        );
    }

    fn bind_index_buffer(
        &mut self,
        list: CommandListId,
        buffer: BufferId,
        offset: u64,
        format: IndexFormat,
    ) {
        self.check_buffer(buffer);
        self.record(
            list,
            Command::BindIndexBuffer {
                buffer,
                offset,
                format,
            },
        );
    }

    fn draw(&mut self, list: CommandListId, args: &DrawArgs) {
        self.record(list, Command::Draw(*args));
    }

    fn draw_indexed(&mut self, list: CommandListId, args: &DrawIndexedArgs) {
        self.record(list, Command::DrawIndexed(*args));
    }

    fn draw_model(&mut self, list: CommandListId, model: ModelId, instance_count: u32) {
        if !self.models.contains_key(&model) {
            self.invalid(format!("unknown {:?}", model));
        }
        self.record(
            list,
            Command::DrawModel {
                model,
                instance_count,
            },
        );
    }

    fn copy_buffer(&mut self, list: CommandListId, copy: &BufferCopy) {
        let dst_usage = self.buffers.get(&copy.dst).map(|record| record.usage);
        if let Some(usage) = dst_usage {
            if !usage.contains(BufferUsage::COPY_DST) {
                self.invalid(format!("{:?} is not a copy destination", copy.dst));
            }
        }
        let source = byte_range(copy.src_offset, copy.size).and_then(|range| {
            self.buffers
                .get(&copy.src)
                .and_then(|record| record.data.get(range).map(<[u8]>::to_vec))
        });
        match source {
            Some(bytes) => {
                if let Err(e) = self.update_buffer(copy.dst, copy.dst_offset, &bytes) {
                    self.invalid(format!("copy into {:?} failed: {}", copy.dst, e));
                }
            }
            None => self.invalid(format!("copy from {:?} out of range", copy.src)),
        }
        self.record(list, Command::CopyBuffer(*copy));
    }

    fn image_barrier(
        &mut self,
        list: CommandListId,
        image: ImageId,
        from: ImageLayout,
        to: ImageLayout,
    ) {
        self.check_image(image);
        self.record(list, Command::ImageBarrier { image, from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererExt;

    #[test]
    fn test_transient_images_released_on_flip() {
        let mut renderer = RecordingRenderer::new();
        let persistent = renderer
            .create_image(&ImageDesc::new(8, 8, Default::default()))
            .unwrap();
        let transient = renderer
            .create_transient_image(&ImageDesc::new(8, 8, Default::default()))
            .unwrap();
        assert_eq!(renderer.transient_image_count(), 1);

        renderer.flip_frame();

        assert_eq!(renderer.transient_image_count(), 0);
        assert!(renderer.image_desc(persistent).is_some());
        assert!(renderer.image_desc(transient).is_none());
        assert_eq!(renderer.frame(), 1);
    }

    #[test]
    fn test_zero_extent_image_fails() {
        let mut renderer = RecordingRenderer::new();
        let err = renderer
            .create_image(&ImageDesc::new(0, 8, Default::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::ResourceCreationFailed { kind: "image", .. }
        ));
    }

    #[test]
    fn test_constant_buffer_roundtrip() {
        let mut renderer = RecordingRenderer::new();
        let value: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
        let buffer = renderer.create_constant_buffer_from(&value).unwrap();
        assert_eq!(
            renderer.buffer_contents(buffer).unwrap(),
            bytemuck::bytes_of(&value)
        );

        let updated: [f32; 4] = [5.0, 6.0, 7.0, 8.0];
        renderer.update_constant_buffer_from(buffer, &updated).unwrap();
        assert_eq!(
            renderer.buffer_contents(buffer).unwrap(),
            bytemuck::bytes_of(&updated)
        );
    }

    #[test]
    fn test_pipeline_requires_loaded_shader() {
        let mut renderer = RecordingRenderer::new();
        let err = renderer
            .create_pipeline(&PipelineDesc::new("shaders/missing.vert.spv"))
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::ResourceCreationFailed { kind: "pipeline", .. }
        ));
    }

    #[test]
    fn test_missing_shader_file_is_io_error() {
        let mut renderer = RecordingRenderer::new();
        let err = renderer
            .load_shader(Path::new("definitely/not/here.spv"))
            .unwrap_err();
        assert!(matches!(err, RendererError::Io(_)));
    }

    #[test]
    fn test_primitive_model_rejects_bad_indices() {
        let mut renderer = RecordingRenderer::new();
        let mut desc = PrimitiveModelDesc::quad(glam::Vec2::ZERO, glam::Vec2::ONE);
        let model = renderer.create_primitive_model(&desc).unwrap();
        assert_eq!(renderer.model_counts(model), Some((4, 6)));

        desc.indices.push(9);
        assert!(renderer.update_primitive_model(model, &desc).is_err());
        assert_eq!(renderer.model_counts(model), Some((4, 6)));
    }

    #[test]
    fn test_parse_obj_triangulates_faces() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        assert_eq!(RecordingRenderer::parse_obj(obj), (4, 6));
    }

    #[test]
    fn test_copy_buffer_moves_bytes() {
        let mut renderer = RecordingRenderer::new();
        let src = renderer.create_constant_buffer(&[1, 2, 3, 4]).unwrap();
        let dst = renderer
            .create_buffer(&BufferDesc::new(4, BufferUsage::COPY_DST))
            .unwrap();

        let list = renderer.begin_command_list();
        renderer.copy_buffer(
            list,
            &BufferCopy {
                src,
                dst,
                src_offset: 1,
                dst_offset: 0,
                size: 3,
            },
        );
        renderer.end_command_list(list);

        assert_eq!(renderer.buffer_contents(dst).unwrap(), &[2, 3, 4, 0]);
        assert!(renderer.validation_errors().is_empty());
    }

    #[test]
    fn test_recording_outside_list_is_flagged() {
        let mut renderer = RecordingRenderer::new();
        renderer.draw(
            CommandListId(7),
            &DrawArgs {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            },
        );
        assert_eq!(renderer.validation_errors().len(), 1);
    }

    #[test]
    fn test_update_buffer_rejects_overflowing_offset() {
        let mut renderer = RecordingRenderer::new();
        let buffer = renderer.create_constant_buffer(&[0; 4]).unwrap();

        let err = renderer.update_buffer(buffer, u64::MAX, &[1]).unwrap_err();
        assert!(matches!(
            err,
            RendererError::ResourceCreationFailed { kind: "buffer", .. }
        ));
        assert!(renderer.update_buffer(buffer, 3, &[1, 2]).is_err());
        assert_eq!(renderer.buffer_contents(buffer).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_copy_buffer_with_overflowing_range_is_flagged() {
        let mut renderer = RecordingRenderer::new();
        let src = renderer.create_constant_buffer(&[1, 2, 3, 4]).unwrap();
        let dst = renderer
            .create_buffer(&BufferDesc::new(4, BufferUsage::COPY_DST))
            .unwrap();

        let list = renderer.begin_command_list();
        for (src_offset, size) in [(2, u64::MAX), (u64::MAX, 1)] {
            renderer.copy_buffer(
                list,
                &BufferCopy {
                    src,
                    dst,
                    src_offset,
                    dst_offset: 0,
                    size,
                },
            );
        }
        renderer.end_command_list(list);

        assert_eq!(renderer.validation_errors().len(), 2);
        assert!(renderer
            .validation_errors()
            .iter()
            .all(|e| e.contains("out of range")));
        assert_eq!(renderer.buffer_contents(dst).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(renderer.recorded_commands().len(), 2);
    }
}
