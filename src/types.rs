//! Descriptor and value types shared by the graph, the command list and backends.

use bitflags::bitflags;
use glam::{Vec2, Vec3, Vec4};

use crate::handles::{BufferId, DepthImageId, ImageId, SamplerId, TextureId};

// ============================================================================
// Formats
// ============================================================================

/// Color image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
}

impl ImageFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            ImageFormat::Rgba8Unorm
            | ImageFormat::Rgba8UnormSrgb
            | ImageFormat::Bgra8Unorm
            | ImageFormat::R32Float => 4,
            ImageFormat::Rgba16Float => 8,
            ImageFormat::Rgba32Float => 16,
        }
    }
}

/// Depth/stencil formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFormat {
    #[default]
    Depth32Float,
    Depth24PlusStencil8,
}

/// Index buffer element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

bitflags! {
    /// Shader stages a resource is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const CONSTANT = 1 << 2;
        const STORAGE = 1 << 3;
        const COPY_SRC = 1 << 4;
        const COPY_DST = 1 << 5;
    }
}

// ============================================================================
// Write and load semantics
// ============================================================================

/// How a pass writes a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Unordered / storage write from a shader (UAV style).
    Storage,
    /// Written as a color or depth attachment of a render pass.
    RenderTarget,
}

/// What happens to a written resource's previous contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadMode {
    /// Preserve the previous contents.
    #[default]
    Load,
    /// Previous contents are undefined and may be thrown away.
    Discard,
    /// Clear to the target's clear value before the first write.
    Clear,
}

/// Value a transient is cleared to when written with [`LoadMode::Clear`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color(Vec4),
    Depth(f32),
}

/// Layout an image is transitioned to by a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthAttachment,
    ShaderRead,
    TransferSrc,
    TransferDst,
    Present,
}

// ============================================================================
// Descriptors
// ============================================================================

/// Descriptor for a color image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub mip_levels: u32,
    pub clear_color: Vec4,
}

impl ImageDesc {
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            label: None,
            width,
            height,
            format,
            mip_levels: 1,
            clear_color: Vec4::ZERO,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self
    }

    /// Total size of the base level in bytes.
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Descriptor for a depth image.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImageDesc {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: DepthFormat,
    pub clear_depth: f32,
}

impl DepthImageDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            format: DepthFormat::default(),
            clear_depth: 1.0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Descriptor for a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texture addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Descriptor for a sampler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplerDesc {
    pub label: Option<String>,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

/// Primitive topology for pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Descriptor for a graphics pipeline.
///
/// Shaders are referenced by the paths handed to
/// [`Renderer::load_shader`](crate::renderer::Renderer::load_shader).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub label: Option<String>,
    pub vertex_shader: String,
    pub fragment_shader: Option<String>,
    pub topology: PrimitiveTopology,
    pub color_formats: Vec<ImageFormat>,
    pub depth_format: Option<DepthFormat>,
    pub depth_write: bool,
}

impl PipelineDesc {
    pub fn new(vertex_shader: impl Into<String>) -> Self {
        Self {
            label: None,
            vertex_shader: vertex_shader.into(),
            fragment_shader: None,
            topology: PrimitiveTopology::default(),
            color_formats: Vec::new(),
            depth_format: None,
            depth_write: false,
        }
    }

    pub fn with_fragment(mut self, fragment_shader: impl Into<String>) -> Self {
        self.fragment_shader = Some(fragment_shader.into());
        self
    }

    pub fn with_color_format(mut self, format: ImageFormat) -> Self {
        self.color_formats.push(format);
        self
    }

    pub fn with_depth(mut self, format: DepthFormat, write: bool) -> Self {
        self.depth_format = Some(format);
        self.depth_write = write;
        self
    }
}

/// CPU-side geometry for procedurally built models (UI quads, debug shapes).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimitiveModelDesc {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub indices: Vec<u32>,
}

impl PrimitiveModelDesc {
    /// Axis-aligned quad in the XY plane, two triangles.
    pub fn quad(min: Vec2, max: Vec2) -> Self {
        Self {
            positions: vec![
                Vec3::new(min.x, min.y, 0.0),
                Vec3::new(max.x, min.y, 0.0),
                Vec3::new(max.x, max.y, 0.0),
                Vec3::new(min.x, max.y, 0.0),
            ],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            colors: vec![Vec4::ONE; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

// ============================================================================
// Recording values
// ============================================================================

/// Viewport rectangle with `[0, 1]` depth range by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }
}

/// Scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One entry of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorBinding {
    ConstantBuffer(BufferId),
    StorageBuffer(BufferId),
    Texture(TextureId),
    SampledImage(ImageId),
    StorageImage(ImageId),
    DepthImage(DepthImageId),
    Sampler(SamplerId),
}

/// Color attachment of a render pass, resolved from a graph handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTarget {
    pub image: ImageId,
    pub load: LoadMode,
    pub clear_color: Vec4,
}

/// Depth attachment of a render pass, resolved from a graph handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthTarget {
    pub image: DepthImageId,
    pub load: LoadMode,
    pub clear_depth: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_byte_size() {
        let desc = ImageDesc::new(4, 2, ImageFormat::Rgba16Float);
        assert_eq!(desc.byte_size(), 4 * 2 * 8);
    }

    #[test]
    fn test_quad_geometry() {
        let quad = PrimitiveModelDesc::quad(Vec2::ZERO, Vec2::ONE);
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.index_count(), 6);
        assert!(quad.indices.iter().all(|&i| i < quad.vertex_count()));
    }

    #[test]
    fn test_shader_stage_union() {
        let stages = ShaderStage::VERTEX | ShaderStage::FRAGMENT;
        assert_eq!(stages, ShaderStage::VERTEX_FRAGMENT);
        assert!(!stages.contains(ShaderStage::COMPUTE));
    }
}
