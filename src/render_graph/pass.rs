//! Render pass definitions for the render graph

use crate::command_list::CommandList;

use super::builder::RenderGraphBuilder;
use super::resources::RenderGraphResources;

/// Type-erased pass as stored by the graph.
pub trait RenderPass {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Setup phase - declare resources. Returning `false` skips the pass this frame.
    fn setup(&mut self, builder: &mut RenderGraphBuilder<'_>) -> bool;

    /// Execute phase - record commands
    fn execute(&mut self, resources: &RenderGraphResources, cmd: &mut CommandList);
}

/// Adapter binding pass data `D` to its setup and execute closures.
pub struct TypedRenderPass<D, S, E> {
    name: String,
    data: D,
    setup: S,
    execute: E,
}

impl<D, S, E> TypedRenderPass<D, S, E>
where
    S: FnMut(&mut D, &mut RenderGraphBuilder<'_>) -> bool,
    E: FnMut(&mut D, &RenderGraphResources, &mut CommandList),
{
    pub fn new(name: impl Into<String>, data: D, setup: S, execute: E) -> Self {
        Self {
            name: name.into(),
            data,
            setup,
            execute,
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }
}

impl<D, S, E> RenderPass for TypedRenderPass<D, S, E>
where
    S: FnMut(&mut D, &mut RenderGraphBuilder<'_>) -> bool,
    E: FnMut(&mut D, &RenderGraphResources, &mut CommandList),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut RenderGraphBuilder<'_>) -> bool {
        (self.setup)(&mut self.data, builder)
    }

    fn execute(&mut self, resources: &RenderGraphResources, cmd: &mut CommandList) {
        (self.execute)(&mut self.data, resources, cmd)
    }
}

impl<D, S, E> std::fmt::Debug for TypedRenderPass<D, S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRenderPass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
