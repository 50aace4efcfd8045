//! Deferred, backend-agnostic command recording.
//!
//! Passes record into a single [`CommandList`] per frame through typed
//! methods. Nothing reaches the backend until the owning
//! [`RenderGraph`](crate::render_graph::RenderGraph) executes the list, which
//! walks the records and their dispatch functions in lock-step.
//!
//! ```ignore
//! let mut scope = cmd.scoped_marker("shadows");
//! scope.set_viewport(Viewport::from_dimensions(2048, 2048));
//! scope.draw_model(model, 1);
//! // marker popped when `scope` drops, including on early return
//! ```

mod commands;

use std::ops::{Deref, DerefMut};

use glam::Vec4;

pub use commands::{
    BufferCopy, Command, CommandKind, DispatchFn, DispatchTable, DrawArgs, DrawIndexedArgs,
};

use crate::handles::{BufferId, DepthImageId, ImageId, ModelId, PipelineId, SemaphoreId};
use crate::renderer::Renderer;
use crate::types::{
    ColorTarget, DepthTarget, DescriptorBinding, ImageLayout, IndexFormat, ScissorRect, Viewport,
};

/// Parallel record/dispatch storage, recycled by the frame allocator.
#[derive(Debug, Default)]
pub(crate) struct CommandStorage {
    commands: Vec<Command>,
    dispatch: Vec<DispatchFn>,
}

impl CommandStorage {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            dispatch: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    pub(crate) fn clear(&mut self) {
        self.commands.clear();
        self.dispatch.clear();
    }
}

/// Ordered list of command records for one frame.
#[derive(Debug)]
pub struct CommandList {
    storage: CommandStorage,
    table: DispatchTable,
    markers_enabled: bool,
    traces_enabled: bool,
    marker_depth: u32,
    trace_depth: u32,
}

impl CommandList {
    pub(crate) fn new(
        storage: CommandStorage,
        table: DispatchTable,
        markers_enabled: bool,
        traces_enabled: bool,
    ) -> Self {
        debug_assert!(storage.is_empty());
        Self {
            storage,
            table,
            markers_enabled,
            traces_enabled,
            marker_depth: 0,
            trace_depth: 0,
        }
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Recorded commands in submission order.
    pub fn commands(&self) -> &[Command] {
        &self.storage.commands
    }

    /// Number of debug markers currently open.
    pub fn marker_depth(&self) -> u32 {
        self.marker_depth
    }

    /// Number of GPU trace scopes currently open.
    pub fn trace_depth(&self) -> u32 {
        self.trace_depth
    }

    fn push(&mut self, command: Command) {
        let dispatch = self.table.get(command.kind());
        self.storage.commands.push(command);
        self.storage.dispatch.push(dispatch);
    }

    // ------------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------------

    pub fn signal_semaphore(&mut self, semaphore: SemaphoreId) {
        self.push(Command::SignalSemaphore(semaphore));
    }

    pub fn wait_semaphore(&mut self, semaphore: SemaphoreId) {
        self.push(Command::WaitSemaphore(semaphore));
    }

    pub fn image_barrier(&mut self, image: ImageId, from: ImageLayout, to: ImageLayout) {
        self.push(Command::ImageBarrier { image, from, to });
    }

    // ------------------------------------------------------------------------
    // Markers and traces
    // ------------------------------------------------------------------------

    pub fn push_marker(&mut self, name: impl Into<String>) {
        self.marker_depth += 1;
        if self.markers_enabled {
            self.push(Command::PushMarker(name.into()));
        }
    }

    /// # Panics
    ///
    /// Panics if no marker is open.
    pub fn pop_marker(&mut self) {
        assert!(self.marker_depth > 0, "pop_marker without a matching push");
        self.marker_depth -= 1;
        if self.markers_enabled {
            self.push(Command::PopMarker);
        }
    }

    /// Push a marker that is popped when the returned guard drops.
    pub fn scoped_marker(&mut self, name: impl Into<String>) -> ScopedMarker<'_> {
        self.push_marker(name);
        ScopedMarker { list: self }
    }

    pub fn begin_trace(&mut self, name: impl Into<String>) {
        self.trace_depth += 1;
        if self.traces_enabled {
            self.push(Command::BeginTrace(name.into()));
        }
    }

    /// # Panics
    ///
    /// Panics if no trace scope is open.
    pub fn end_trace(&mut self) {
        assert!(self.trace_depth > 0, "end_trace without a matching begin");
        self.trace_depth -= 1;
        if self.traces_enabled {
            self.push(Command::EndTrace);
        }
    }

    /// Begin a GPU trace scope that ends when the returned guard drops.
    pub fn scoped_trace(&mut self, name: impl Into<String>) -> ScopedGpuTrace<'_> {
        self.begin_trace(name);
        ScopedGpuTrace { list: self }
    }

    // ------------------------------------------------------------------------
    // Render passes and clears
    // ------------------------------------------------------------------------

    pub fn begin_render_pass(&mut self, colors: &[ColorTarget], depth: Option<DepthTarget>) {
        self.push(Command::BeginRenderPass {
            colors: colors.to_vec(),
            depth,
        });
    }

    pub fn end_render_pass(&mut self) {
        self.push(Command::EndRenderPass);
    }

    pub fn clear_image(&mut self, image: ImageId, color: Vec4) {
        self.push(Command::ClearImage { image, color });
    }

    pub fn clear_depth(&mut self, image: DepthImageId, depth: f32) {
        self.push(Command::ClearDepth { image, depth });
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Command::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, rect: ScissorRect) {
        self.push(Command::SetScissor(rect));
    }

    pub fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.push(Command::BindPipeline(pipeline));
    }

    pub fn bind_descriptor_set(&mut self, set: u32, bindings: &[DescriptorBinding]) {
        self.push(Command::BindDescriptorSet {
            set,
            bindings: bindings.to_vec(),
        });
    }

    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64) {
        self.push(Command::BindVertexBuffer {
            slot,
            buffer,
            offset,
        });
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat) {
        self.push(Command::BindIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    // ------------------------------------------------------------------------
    // Draws and transfers
    // ------------------------------------------------------------------------

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.draw_with(DrawArgs {
            vertex_count,
            instance_count,
            first_vertex: 0,
            first_instance: 0,
        });
    }

    pub fn draw_with(&mut self, args: DrawArgs) {
        self.push(Command::Draw(args));
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.draw_indexed_with(DrawIndexedArgs {
            index_count,
            instance_count,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        });
    }

    pub fn draw_indexed_with(&mut self, args: DrawIndexedArgs) {
        self.push(Command::DrawIndexed(args));
    }

    pub fn draw_model(&mut self, model: ModelId, instance_count: u32) {
        self.push(Command::DrawModel {
            model,
            instance_count,
        });
    }

    pub fn copy_buffer(&mut self, copy: BufferCopy) {
        self.push(Command::CopyBuffer(copy));
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Replay every record against the backend and hand the storage back.
    ///
    /// Consumes the list, so a list can never run twice.
    ///
    /// # Panics
    ///
    /// Panics if a marker or trace scope is still open.
    pub(crate) fn execute(self, renderer: &mut dyn Renderer) -> CommandStorage {
        assert_eq!(self.marker_depth, 0, "command list executed with open markers");
        assert_eq!(self.trace_depth, 0, "command list executed with open trace scopes");

        let list = renderer.begin_command_list();
        log::trace!(
            "CommandList: dispatching {} commands to {:?}",
            self.storage.len(),
            list
        );
        for (command, dispatch) in self.storage.commands.iter().zip(&self.storage.dispatch) {
            dispatch(renderer, list, command);
        }
        renderer.end_command_list(list);

        self.storage
    }
}

/// Debug marker scope; pops its marker on drop.
///
/// Derefs to the underlying [`CommandList`] so recording continues inside
/// the scope.
#[derive(Debug)]
pub struct ScopedMarker<'a> {
    list: &'a mut CommandList,
}

impl Deref for ScopedMarker<'_> {
    type Target = CommandList;

    fn deref(&self) -> &CommandList {
        self.list
    }
}

impl DerefMut for ScopedMarker<'_> {
    fn deref_mut(&mut self) -> &mut CommandList {
        self.list
    }
}

impl Drop for ScopedMarker<'_> {
    fn drop(&mut self) {
        self.list.pop_marker();
    }
}

/// GPU trace scope; ends its trace on drop.
#[derive(Debug)]
pub struct ScopedGpuTrace<'a> {
    list: &'a mut CommandList,
}

impl Deref for ScopedGpuTrace<'_> {
    type Target = CommandList;

    fn deref(&self) -> &CommandList {
        self.list
    }
}

impl DerefMut for ScopedGpuTrace<'_> {
    fn deref_mut(&mut self) -> &mut CommandList {
        self.list
    }
}

impl Drop for ScopedGpuTrace<'_> {
    fn drop(&mut self) {
        self.list.end_trace();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> CommandList {
        CommandList::new(CommandStorage::default(), DispatchTable::RENDERER, true, true)
    }

    fn record_with_early_return(cmd: &mut CommandList, bail: bool) {
        let mut scope = cmd.scoped_marker("maybe");
        scope.draw(3, 1);
        if bail {
            return;
        }
        scope.draw(6, 1);
    }

    #[test]
    fn test_records_in_order() {
        let mut cmd = list();
        cmd.set_viewport(Viewport::from_dimensions(64, 64));
        cmd.draw(3, 1);
        cmd.draw_indexed(6, 2);

        let kinds: Vec<_> = cmd.commands().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![CommandKind::SetViewport, CommandKind::Draw, CommandKind::DrawIndexed]
        );
        assert_eq!(cmd.storage.dispatch.len(), cmd.len());
    }

    #[test]
    fn test_scoped_marker_balances_on_early_return() {
        for bail in [true, false] {
            let mut cmd = list();
            record_with_early_return(&mut cmd, bail);
            assert_eq!(cmd.marker_depth(), 0);
            let pushes = cmd
                .commands()
                .iter()
                .filter(|c| c.kind() == CommandKind::PushMarker)
                .count();
            let pops = cmd
                .commands()
                .iter()
                .filter(|c| c.kind() == CommandKind::PopMarker)
                .count();
            assert_eq!(pushes, pops);
        }
    }

    #[test]
    fn test_nested_scopes() {
        let mut cmd = list();
        {
            let mut outer = cmd.scoped_marker("outer");
            let mut trace = outer.scoped_trace("gpu");
            let mut inner = trace.scoped_marker("inner");
            inner.draw(3, 1);
            assert_eq!(inner.marker_depth(), 2);
            assert_eq!(inner.trace_depth(), 1);
        }
        assert_eq!(cmd.marker_depth(), 0);
        assert_eq!(cmd.trace_depth(), 0);
        assert_eq!(cmd.len(), 7);
    }

    #[test]
    fn test_disabled_markers_record_nothing() {
        let mut cmd = CommandList::new(
            CommandStorage::default(),
            DispatchTable::RENDERER,
            false,
            false,
        );
        {
            let mut scope = cmd.scoped_marker("hidden");
            scope.begin_trace("hidden");
            scope.end_trace();
        }
        assert!(cmd.is_empty());
        assert_eq!(cmd.marker_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "pop_marker without a matching push")]
    fn test_unmatched_pop_panics() {
        list().pop_marker();
    }
}
