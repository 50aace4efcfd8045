//! Per-frame allocation arena.
//!
//! All per-frame objects (passes, command records, pass-local handles) are
//! tied to a [`FrameAllocator`]. A [`RenderGraph`](crate::render_graph::RenderGraph)
//! mutably borrows the allocator for its whole lifetime, so nothing allocated
//! for a frame can outlive it. Storage is recycled between frames instead of
//! being freed, and every frame gets a fresh generation number that stamps
//! pass-local handles.

use crate::command_list::CommandStorage;
use crate::config::RenderGraphConfig;
use crate::render_graph::RenderPass;

/// Allocation counters for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameAllocatorStats {
    /// Passes allocated since the last reset.
    pub passes: usize,
    /// Command records allocated since the last reset.
    pub commands: usize,
}

/// Arena backing one frame's render graph.
#[derive(Debug)]
pub struct FrameAllocator {
    config: RenderGraphConfig,
    generation: u32,
    frame_open: bool,
    command_storage: Option<CommandStorage>,
    stats: FrameAllocatorStats,
}

impl FrameAllocator {
    pub fn new(config: RenderGraphConfig) -> Self {
        let command_storage = Some(CommandStorage::with_capacity(config.command_capacity));
        Self {
            config,
            generation: 0,
            frame_open: false,
            command_storage,
            stats: FrameAllocatorStats::default(),
        }
    }

    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    /// Generation of the current frame.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn stats(&self) -> FrameAllocatorStats {
        self.stats
    }

    /// Reclaim everything allocated for the finished frame and start a new one.
    pub fn reset(&mut self) {
        log::trace!(
            "FrameAllocator: reset generation {} ({} passes, {} commands)",
            self.generation,
            self.stats.passes,
            self.stats.commands
        );
        self.generation = self.generation.wrapping_add(1);
        self.frame_open = false;
        self.stats = FrameAllocatorStats::default();
        if let Some(storage) = self.command_storage.as_mut() {
            storage.clear();
        }
    }

    /// Mark the frame as claimed by a graph.
    ///
    /// # Panics
    ///
    /// Panics if a graph was already built since the last [`reset`](Self::reset).
    pub(crate) fn open_frame(&mut self) {
        assert!(
            !self.frame_open,
            "FrameAllocator::reset must be called before building the next frame's graph"
        );
        self.frame_open = true;
    }

    /// Move a pass into frame storage behind the narrow pass interface.
    pub(crate) fn alloc_pass<'f, P>(&mut self, pass: P) -> Box<dyn RenderPass + 'f>
    where
        P: RenderPass + 'f,
    {
        self.stats.passes += 1;
        Box::new(pass)
    }

    /// Take the recycled command storage for this frame's command list.
    ///
    /// Storage that never came back (a pass panicked during execute) is
    /// replaced with a fresh allocation.
    pub(crate) fn take_command_storage(&mut self) -> CommandStorage {
        self.command_storage.take().unwrap_or_else(|| {
            log::warn!(
                "FrameAllocator: command storage was not returned by generation {}, reallocating",
                self.generation
            );
            CommandStorage::with_capacity(self.config.command_capacity)
        })
    }

    /// Give the command storage back after execution.
    pub(crate) fn return_command_storage(&mut self, mut storage: CommandStorage) {
        self.stats.commands += storage.len();
        storage.clear();
        self.command_storage = Some(storage);
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new(RenderGraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_advances_generation() {
        let mut alloc = FrameAllocator::default();
        let first = alloc.generation();
        alloc.reset();
        assert_eq!(alloc.generation(), first + 1);
        assert_eq!(alloc.stats(), FrameAllocatorStats::default());
    }

    #[test]
    fn test_command_storage_is_recycled() {
        let mut alloc = FrameAllocator::default();
        let storage = alloc.take_command_storage();
        let capacity = storage.capacity();
        alloc.return_command_storage(storage);
        let storage = alloc.take_command_storage();
        assert!(storage.capacity() >= capacity);
        assert!(storage.is_empty());
        alloc.return_command_storage(storage);
    }

    #[test]
    fn test_lost_command_storage_is_replaced() {
        let mut alloc = FrameAllocator::default();
        let lost = alloc.take_command_storage();
        drop(lost);
        alloc.reset();

        let storage = alloc.take_command_storage();
        assert!(storage.is_empty());
        assert!(storage.capacity() >= alloc.config().command_capacity);
        alloc.return_command_storage(storage);
    }

    #[test]
    #[should_panic(expected = "reset must be called")]
    fn test_second_frame_without_reset_panics() {
        let mut alloc = FrameAllocator::default();
        alloc.open_frame();
        alloc.open_frame();
    }
}
