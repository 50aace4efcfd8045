//! Render Graph System
//!
//! A frame-scoped, declarative pass list. Passes declare their resource
//! reads and writes during setup without knowing about each other; the graph
//! resolves shared resources through one per-frame table and records every
//! executing pass, in declaration order, into a single command list.

mod builder;
mod graph;
mod pass;
mod resources;

pub use builder::{RenderGraphBuilder, TransientDesc};
pub use graph::{FrameStats, GraphState, OrderHazard, PassDependency, PassId, RenderGraph};
pub use pass::{RenderPass, TypedRenderPass};
pub use resources::{
    DepthImageResource, GraphHandle, ImageResource, MutableDepthImageResource,
    MutableImageResource, RenderGraphResources, RenderPassMutableResource, RenderPassResource,
    ResourceSlot, SlotUsage, SlotWrite, TextureResource, TrackedKind,
};
