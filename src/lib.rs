//! Framegraph - a frame-scoped render graph over an abstract renderer
//!
//! Rendering code declares passes; each pass registers the resources it reads
//! and writes during setup and records commands during execute. The graph
//! runs the passes that opted in, in declaration order, into one
//! backend-agnostic command list and replays it against a [`Renderer`].
//!
//! # Features
//! - Typed resource handles and per-frame pass handles
//! - Two-phase setup/execute protocol with conditional passes
//! - Deferred command recording with scoped debug markers and GPU traces
//! - Pluggable per-command dispatch tables
//! - A headless [`RecordingRenderer`] for tests and tooling
//!
//! ```ignore
//! let mut alloc = FrameAllocator::default();
//! let mut graph = RenderGraph::new(&mut alloc);
//! graph.add_pass("clear", (), |_, _| true, |_, _, cmd| cmd.clear_image(target, Vec4::ZERO));
//! graph.setup(&mut renderer)?;
//! graph.execute(&mut renderer);
//! ```

pub mod command_list;
pub mod config;
pub mod error;
pub mod frame_allocator;
pub mod handles;
pub mod render_graph;
pub mod renderer;
pub mod types;

pub use command_list::{
    Command, CommandKind, CommandList, DispatchFn, DispatchTable, ScopedGpuTrace, ScopedMarker,
};
pub use config::RenderGraphConfig;
pub use error::{GraphError, RendererError, RendererResult};
pub use frame_allocator::{FrameAllocator, FrameAllocatorStats};
pub use handles::{
    BufferId, DepthImageId, ImageId, ModelId, PipelineId, ResourceId, SamplerId, SemaphoreId,
    TextureId,
};
pub use render_graph::{
    FrameStats, RenderGraph, RenderGraphBuilder, RenderGraphResources, RenderPass,
    RenderPassMutableResource, RenderPassResource,
};
pub use renderer::{CommandListId, RecordingRenderer, Renderer, RendererExt};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
