//! Render graph configuration.

/// Configuration shared by every graph built on one
/// [`FrameAllocator`](crate::frame_allocator::FrameAllocator).
#[derive(Debug, Clone)]
pub struct RenderGraphConfig {
    /// Name of the debug marker wrapping a whole frame.
    pub frame_marker: String,
    /// Record debug marker commands. When disabled, pushes and pops are
    /// both dropped so scopes stay balanced.
    pub debug_markers: bool,
    /// Record GPU trace scope commands.
    pub gpu_traces: bool,
    /// Log a warning when a pass reads a resource that only a later pass writes.
    pub warn_on_order_hazards: bool,
    /// Initial capacity of the per-frame command storage.
    pub command_capacity: usize,
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            frame_marker: "RenderGraph".to_string(),
            debug_markers: true,
            gpu_traces: true,
            warn_on_order_hazards: true,
            command_capacity: 256,
        }
    }
}
