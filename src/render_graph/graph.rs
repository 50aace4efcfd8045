//! Render graph definition and the setup/execute protocol

use std::fmt;

use crate::command_list::{CommandList, DispatchTable};
use crate::error::GraphError;
use crate::frame_allocator::FrameAllocator;
use crate::handles::SemaphoreId;
use crate::renderer::Renderer;

use super::builder::RenderGraphBuilder;
use super::pass::{RenderPass, TypedRenderPass};
use super::resources::RenderGraphResources;

/// Where a graph is in its one-frame life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Accepting passes.
    Declared,
    /// Setup ran; the executing subset is fixed.
    SetUp,
    /// Commands were submitted. Terminal.
    Executed,
}

/// Unique identifier for a render pass; its declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) usize);

impl PassId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `reader` reads a slot that `writer`, declared earlier, writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassDependency {
    pub writer: PassId,
    pub reader: PassId,
}

/// `reader` reads a slot that only `writer`, declared later, writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHazard {
    pub resource: String,
    pub reader: PassId,
    pub writer: PassId,
}

/// Counters for one executed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub declared_passes: usize,
    pub executed_passes: usize,
    pub recorded_commands: usize,
    pub transient_images: usize,
}

/// One frame's passes, in declaration order.
///
/// The graph borrows the [`FrameAllocator`] for its whole life, so passes
/// and the closures they capture can't outlive the frame:
///
/// 1. [`add_pass`](Self::add_pass) for every pass,
/// 2. [`setup`](Self::setup) once, which fixes the executing subset,
/// 3. [`execute`](Self::execute) once, which records and submits.
///
/// Passes run in declaration order. A pass that writes a resource must be
/// declared before the passes that read it.
pub struct RenderGraph<'f> {
    allocator: &'f mut FrameAllocator,
    passes: Vec<Box<dyn RenderPass + 'f>>,
    executing: Vec<PassId>,
    resources: RenderGraphResources,
    wait_semaphores: Vec<SemaphoreId>,
    signal_semaphores: Vec<SemaphoreId>,
    dispatch: DispatchTable,
    state: GraphState,
}

impl<'f> RenderGraph<'f> {
    /// # Panics
    ///
    /// Panics if the allocator already backed a graph since its last reset.
    pub fn new(allocator: &'f mut FrameAllocator) -> Self {
        allocator.open_frame();
        let resources = RenderGraphResources::new(allocator.generation());
        Self {
            allocator,
            passes: Vec::new(),
            executing: Vec::new(),
            resources,
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
            dispatch: DispatchTable::RENDERER,
            state: GraphState::Declared,
        }
    }

    /// Record commands with a custom dispatch table instead of forwarding
    /// straight to the [`Renderer`] methods.
    pub fn with_dispatch_table(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Add a pass built from its data and two closures.
    pub fn add_pass<D, S, E>(
        &mut self,
        name: impl Into<String>,
        data: D,
        setup: S,
        execute: E,
    ) -> PassId
    where
        D: 'f,
        S: FnMut(&mut D, &mut RenderGraphBuilder<'_>) -> bool + 'f,
        E: FnMut(&mut D, &RenderGraphResources, &mut CommandList) + 'f,
    {
        self.add_render_pass(TypedRenderPass::new(name, data, setup, execute))
    }

    /// Add a pass implementing [`RenderPass`] directly.
    pub fn add_render_pass<P: RenderPass + 'f>(&mut self, pass: P) -> PassId {
        assert_eq!(
            self.state,
            GraphState::Declared,
            "passes must be added before RenderGraph::setup"
        );
        let id = PassId(self.passes.len());
        log::trace!("RenderGraph: declared pass '{}' as {:?}", pass.name(), id);
        let pass = self.allocator.alloc_pass(pass);
        self.passes.push(pass);
        id
    }

    /// Signal `semaphore` when the frame's commands complete.
    pub fn add_signal_semaphore(&mut self, semaphore: SemaphoreId) {
        assert_ne!(self.state, GraphState::Executed, "graph already executed");
        self.signal_semaphores.push(semaphore);
    }

    /// Wait on `semaphore` before the frame's commands run.
    pub fn add_wait_semaphore(&mut self, semaphore: SemaphoreId) {
        assert_ne!(self.state, GraphState::Executed, "graph already executed");
        self.wait_semaphores.push(semaphore);
    }

    /// Run every pass's setup in declaration order.
    ///
    /// Passes returning `true` join the executing subset in the same relative
    /// order. A pass whose transient creation failed is left out and the first
    /// such failure is returned once every pass has been set up.
    ///
    /// # Panics
    ///
    /// Panics if called twice.
    pub fn setup(&mut self, renderer: &mut dyn Renderer) -> Result<(), GraphError> {
        assert_eq!(
            self.state,
            GraphState::Declared,
            "RenderGraph::setup called twice"
        );
        self.state = GraphState::SetUp;

        let mut failure = None;
        for (index, pass) in self.passes.iter_mut().enumerate() {
            let name = pass.name().to_string();
            let mut builder =
                RenderGraphBuilder::new(&mut *renderer, &mut self.resources, index, &name);
            let wants_execute = pass.setup(&mut builder);

            match builder.finish() {
                Some(source) => {
                    log::debug!("RenderGraph: pass '{}' failed setup", name);
                    if failure.is_none() {
                        failure = Some(GraphError::TransientCreationFailed { pass: name, source });
                    }
                }
                None if wants_execute => {
                    log::debug!("RenderGraph: pass '{}' will execute", name);
                    self.executing.push(PassId(index));
                }
                None => log::debug!("RenderGraph: pass '{}' skipped this frame", name),
            }
        }

        if self.allocator.config().warn_on_order_hazards {
            for hazard in self.order_hazards() {
                log::warn!(
                    "RenderGraph: pass '{}' reads {} before pass '{}' writes it",
                    self.pass_name(hazard.reader),
                    hazard.resource,
                    self.pass_name(hazard.writer)
                );
            }
        }

        for (resource, usage) in self.resources.usages() {
            let read = usage.readers.iter().any(|&p| self.is_executing(p));
            if read && usage.is_written() && !usage.writers().any(|w| self.is_executing(w)) {
                log::warn!(
                    "RenderGraph: {} is read but every pass writing it was skipped",
                    resource
                );
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record every executing pass into one command list and submit it.
    ///
    /// Frame wait semaphores are recorded first, then signal semaphores, then
    /// the passes inside the frame debug marker.
    ///
    /// # Panics
    ///
    /// Panics if [`setup`](Self::setup) hasn't run, if called twice, or if a
    /// pass leaves a debug marker or trace scope open.
    pub fn execute(&mut self, renderer: &mut dyn Renderer) -> FrameStats {
        match self.state {
            GraphState::Declared => panic!("RenderGraph::setup must be called before execute"),
            GraphState::Executed => panic!("RenderGraph executed twice"),
            GraphState::SetUp => {}
        }
        self.state = GraphState::Executed;

        let config = self.allocator.config();
        let (markers, traces) = (config.debug_markers, config.gpu_traces);
        let frame_marker = config.frame_marker.clone();

        let storage = self.allocator.take_command_storage();
        let mut cmd = CommandList::new(storage, self.dispatch, markers, traces);

        for &semaphore in &self.wait_semaphores {
            cmd.wait_semaphore(semaphore);
        }
        for &semaphore in &self.signal_semaphores {
            cmd.signal_semaphore(semaphore);
        }

        cmd.push_marker(frame_marker);
        for &id in &self.executing {
            let pass = &mut self.passes[id.0];
            let depth = (cmd.marker_depth(), cmd.trace_depth());
            let recorded = cmd.len();

            self.resources.set_current_pass(Some(id.0));
            pass.execute(&self.resources, &mut cmd);

            assert_eq!(
                (cmd.marker_depth(), cmd.trace_depth()),
                depth,
                "pass '{}' left debug markers or trace scopes open",
                pass.name()
            );
            log::trace!(
                "RenderGraph: pass '{}' recorded {} commands",
                pass.name(),
                cmd.len() - recorded
            );
        }
        self.resources.set_current_pass(None);
        cmd.pop_marker();

        let recorded_commands = cmd.len();
        let storage = cmd.execute(renderer);
        self.allocator.return_command_storage(storage);

        let stats = FrameStats {
            declared_passes: self.passes.len(),
            executed_passes: self.executing.len(),
            recorded_commands,
            transient_images: self.resources.transient_count(),
        };
        log::debug!(
            "RenderGraph: frame {} executed {}/{} passes, {} commands",
            self.allocator.generation(),
            stats.executed_passes,
            stats.declared_passes,
            stats.recorded_commands
        );
        stats
    }

    /// Writer-to-reader edges between executing passes, derived from their
    /// registrations. Only earlier writers feed later readers.
    pub fn dependencies(&self) -> Vec<PassDependency> {
        let mut edges = Vec::new();
        for (_, usage) in self.resources.usages() {
            for &reader in usage.readers.iter().filter(|&&p| self.is_executing(p)) {
                for writer in usage
                    .writers()
                    .filter(|&w| w < reader && self.is_executing(w))
                {
                    edges.push(PassDependency {
                        writer: PassId(writer),
                        reader: PassId(reader),
                    });
                }
            }
        }
        edges.sort();
        edges.dedup();
        edges
    }

    /// Reads of slots that no earlier executing pass writes but a later one does.
    pub fn order_hazards(&self) -> Vec<OrderHazard> {
        let mut hazards = Vec::new();
        for (resource, usage) in self.resources.usages() {
            for &reader in usage.readers.iter().filter(|&&p| self.is_executing(p)) {
                if usage
                    .writers()
                    .any(|w| w < reader && self.is_executing(w))
                {
                    continue;
                }
                if let Some(writer) = usage
                    .writers()
                    .find(|&w| w > reader && self.is_executing(w))
                {
                    hazards.push(OrderHazard {
                        resource: resource.clone(),
                        reader: PassId(reader),
                        writer: PassId(writer),
                    });
                }
            }
        }
        hazards
    }

    fn is_executing(&self, pass: usize) -> bool {
        self.executing.contains(&PassId(pass))
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_name(&self, id: PassId) -> &str {
        self.passes[id.0].name()
    }

    /// Passes that opted in during setup, in execution order.
    pub fn executing_pass_ids(&self) -> &[PassId] {
        &self.executing
    }

    /// Names of the executing passes, in execution order.
    pub fn executing_passes(&self) -> Vec<&str> {
        self.executing.iter().map(|&id| self.pass_name(id)).collect()
    }

    /// The frame's resource table.
    pub fn resources(&self) -> &RenderGraphResources {
        &self.resources
    }
}

impl fmt::Debug for RenderGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.passes.iter().map(|p| p.name()).collect();
        f.debug_struct("RenderGraph")
            .field("state", &self.state)
            .field("passes", &names)
            .field("executing", &self.executing)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(RenderGraph<'static>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RecordingRenderer;

    fn noop_pass(graph: &mut RenderGraph<'_>, name: &str, run: bool) -> PassId {
        graph.add_pass(name, (), move |_, _| run, |_, _, _| {})
    }

    #[test]
    fn test_state_transitions() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        noop_pass(&mut graph, "a", true);
        assert_eq!(graph.state(), GraphState::Declared);

        graph.setup(&mut renderer).unwrap();
        assert_eq!(graph.state(), GraphState::SetUp);

        let stats = graph.execute(&mut renderer);
        assert_eq!(graph.state(), GraphState::Executed);
        assert_eq!(stats.declared_passes, 1);
        assert_eq!(stats.executed_passes, 1);
        // Frame marker push and pop.
        assert_eq!(stats.recorded_commands, 2);
    }

    #[test]
    fn test_executing_subset_keeps_order() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        noop_pass(&mut graph, "a", true);
        noop_pass(&mut graph, "b", false);
        noop_pass(&mut graph, "c", true);
        graph.setup(&mut renderer).unwrap();

        assert_eq!(graph.executing_passes(), vec!["a", "c"]);
        assert_eq!(graph.executing_pass_ids(), &[PassId(0), PassId(2)]);
    }

    #[test]
    #[should_panic(expected = "setup must be called before execute")]
    fn test_execute_before_setup_panics() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        graph.execute(&mut renderer);
    }

    #[test]
    #[should_panic(expected = "setup called twice")]
    fn test_setup_twice_panics() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        graph.setup(&mut renderer).unwrap();
        let _ = graph.setup(&mut renderer);
    }

    #[test]
    #[should_panic(expected = "passes must be added before")]
    fn test_add_after_setup_panics() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        graph.setup(&mut renderer).unwrap();
        noop_pass(&mut graph, "late", true);
    }

    #[test]
    #[should_panic(expected = "left debug markers or trace scopes open")]
    fn test_unbalanced_pass_panics() {
        let mut alloc = FrameAllocator::default();
        let mut renderer = RecordingRenderer::new();
        let mut graph = RenderGraph::new(&mut alloc);
        graph.add_pass("leaky", (), |_, _| true, |_, _, cmd| cmd.push_marker("open"));
        graph.setup(&mut renderer).unwrap();
        graph.execute(&mut renderer);
    }
}
