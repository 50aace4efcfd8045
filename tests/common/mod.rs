//! Common utilities for render graph integration tests.
//!
//! Provides a frame context over the headless recording backend and a mock
//! dispatch table that captures replayed records per thread.

use std::cell::RefCell;
use std::rc::Rc;

use framegraph::renderer::RecordingRenderer;
use framegraph::{
    Command, CommandKind, CommandListId, FrameAllocator, RenderGraphConfig, Renderer,
};

/// Initialise logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Frame context
// ============================================================================

/// Allocator plus backend for driving frames in tests.
pub struct TestContext {
    pub allocator: FrameAllocator,
    pub renderer: RecordingRenderer,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(RenderGraphConfig::default())
    }

    pub fn with_config(config: RenderGraphConfig) -> Self {
        init_logging();
        Self {
            allocator: FrameAllocator::new(config),
            renderer: RecordingRenderer::new(),
        }
    }

    /// Finish the frame on both the allocator and the backend.
    #[allow(dead_code)]
    pub fn end_frame(&mut self) {
        self.allocator.reset();
        self.renderer.flip_frame();
    }
}

/// Config with markers and traces off, so only pass commands are recorded.
#[allow(dead_code)]
pub fn quiet_config() -> RenderGraphConfig {
    RenderGraphConfig {
        debug_markers: false,
        gpu_traces: false,
        ..RenderGraphConfig::default()
    }
}

/// Shared, cloneable log written from pass closures.
#[allow(dead_code)]
pub type SharedLog<T> = Rc<RefCell<Vec<T>>>;

#[allow(dead_code)]
pub fn shared_log<T>() -> SharedLog<T> {
    Rc::new(RefCell::new(Vec::new()))
}

#[allow(dead_code)]
pub fn kinds(commands: &[Command]) -> Vec<CommandKind> {
    commands.iter().map(Command::kind).collect()
}

#[allow(dead_code)]
pub fn count_kind(commands: &[Command], kind: CommandKind) -> usize {
    commands.iter().filter(|c| c.kind() == kind).count()
}

// ============================================================================
// Mock dispatch
// ============================================================================

thread_local! {
    static REPLAYED: RefCell<Vec<Command>> = const { RefCell::new(Vec::new()) };
}

/// Dispatch function that captures the record instead of calling the backend.
#[allow(dead_code)]
pub fn mock_dispatch(_renderer: &mut dyn Renderer, _list: CommandListId, command: &Command) {
    REPLAYED.with(|replayed| replayed.borrow_mut().push(command.clone()));
}

/// Drain the records captured by [`mock_dispatch`] on this thread.
#[allow(dead_code)]
pub fn take_replayed() -> Vec<Command> {
    REPLAYED.with(|replayed| std::mem::take(&mut *replayed.borrow_mut()))
}
