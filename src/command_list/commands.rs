//! Command records and their backend dispatch functions.
//!
//! A [`Command`] is plain data describing one GPU operation. Each record is
//! paired with a [`DispatchFn`] chosen from a [`DispatchTable`] when the
//! record is appended; at execute time the function translates the record
//! into calls on the [`Renderer`].

use glam::Vec4;

use crate::handles::{BufferId, DepthImageId, ImageId, ModelId, PipelineId, SemaphoreId};
use crate::renderer::{CommandListId, Renderer};
use crate::types::{
    ColorTarget, DepthTarget, DescriptorBinding, ImageLayout, IndexFormat, ScissorRect, Viewport,
};

/// Arguments of a non-indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Arguments of an indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawIndexedArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// Buffer-to-buffer copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    pub src: BufferId,
    pub dst: BufferId,
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SignalSemaphore(SemaphoreId),
    WaitSemaphore(SemaphoreId),
    PushMarker(String),
    PopMarker,
    BeginTrace(String),
    EndTrace,
    BeginRenderPass {
        colors: Vec<ColorTarget>,
        depth: Option<DepthTarget>,
    },
    EndRenderPass,
    ClearImage {
        image: ImageId,
        color: Vec4,
    },
    ClearDepth {
        image: DepthImageId,
        depth: f32,
    },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    BindPipeline(PipelineId),
    BindDescriptorSet {
        set: u32,
        bindings: Vec<DescriptorBinding>,
    },
    BindVertexBuffer {
        slot: u32,
        buffer: BufferId,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: BufferId,
        offset: u64,
        format: IndexFormat,
    },
    Draw(DrawArgs),
    DrawIndexed(DrawIndexedArgs),
    DrawModel {
        model: ModelId,
        instance_count: u32,
    },
    CopyBuffer(BufferCopy),
    ImageBarrier {
        image: ImageId,
        from: ImageLayout,
        to: ImageLayout,
    },
}

/// Discriminant of a [`Command`], used to index a [`DispatchTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CommandKind {
    SignalSemaphore,
    WaitSemaphore,
    PushMarker,
    PopMarker,
    BeginTrace,
    EndTrace,
    BeginRenderPass,
    EndRenderPass,
    ClearImage,
    ClearDepth,
    SetViewport,
    SetScissor,
    BindPipeline,
    BindDescriptorSet,
    BindVertexBuffer,
    BindIndexBuffer,
    Draw,
    DrawIndexed,
    DrawModel,
    CopyBuffer,
    ImageBarrier,
}

impl CommandKind {
    pub const COUNT: usize = CommandKind::ImageBarrier as usize + 1;

    pub const ALL: [CommandKind; CommandKind::COUNT] = [
        CommandKind::SignalSemaphore,
        CommandKind::WaitSemaphore,
        CommandKind::PushMarker,
        CommandKind::PopMarker,
        CommandKind::BeginTrace,
        CommandKind::EndTrace,
        CommandKind::BeginRenderPass,
        CommandKind::EndRenderPass,
        CommandKind::ClearImage,
        CommandKind::ClearDepth,
        CommandKind::SetViewport,
        CommandKind::SetScissor,
        CommandKind::BindPipeline,
        CommandKind::BindDescriptorSet,
        CommandKind::BindVertexBuffer,
        CommandKind::BindIndexBuffer,
        CommandKind::Draw,
        CommandKind::DrawIndexed,
        CommandKind::DrawModel,
        CommandKind::CopyBuffer,
        CommandKind::ImageBarrier,
    ];
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SignalSemaphore(_) => CommandKind::SignalSemaphore,
            Command::WaitSemaphore(_) => CommandKind::WaitSemaphore,
            Command::PushMarker(_) => CommandKind::PushMarker,
            Command::PopMarker => CommandKind::PopMarker,
            Command::BeginTrace(_) => CommandKind::BeginTrace,
            Command::EndTrace => CommandKind::EndTrace,
            Command::BeginRenderPass { .. } => CommandKind::BeginRenderPass,
            Command::EndRenderPass => CommandKind::EndRenderPass,
            Command::ClearImage { .. } => CommandKind::ClearImage,
            Command::ClearDepth { .. } => CommandKind::ClearDepth,
            Command::SetViewport(_) => CommandKind::SetViewport,
            Command::SetScissor(_) => CommandKind::SetScissor,
            Command::BindPipeline(_) => CommandKind::BindPipeline,
            Command::BindDescriptorSet { .. } => CommandKind::BindDescriptorSet,
            Command::BindVertexBuffer { .. } => CommandKind::BindVertexBuffer,
            Command::BindIndexBuffer { .. } => CommandKind::BindIndexBuffer,
            Command::Draw(_) => CommandKind::Draw,
            Command::DrawIndexed(_) => CommandKind::DrawIndexed,
            Command::DrawModel { .. } => CommandKind::DrawModel,
            Command::CopyBuffer(_) => CommandKind::CopyBuffer,
            Command::ImageBarrier { .. } => CommandKind::ImageBarrier,
        }
    }
}

/// Backend function translating one record into renderer calls.
pub type DispatchFn = fn(&mut dyn Renderer, CommandListId, &Command);

/// One dispatch function per [`CommandKind`].
#[derive(Clone, Copy)]
pub struct DispatchTable {
    entries: [DispatchFn; CommandKind::COUNT],
}

impl DispatchTable {
    /// Table forwarding every record to the matching [`Renderer`] method.
    pub const RENDERER: DispatchTable = DispatchTable {
        entries: [
            dispatch_signal_semaphore,
            dispatch_wait_semaphore,
            dispatch_push_marker,
            dispatch_pop_marker,
            dispatch_begin_trace,
            dispatch_end_trace,
            dispatch_begin_render_pass,
            dispatch_end_render_pass,
            dispatch_clear_image,
            dispatch_clear_depth,
            dispatch_set_viewport,
            dispatch_set_scissor,
            dispatch_bind_pipeline,
            dispatch_bind_descriptor_set,
            dispatch_bind_vertex_buffer,
            dispatch_bind_index_buffer,
            dispatch_draw,
            dispatch_draw_indexed,
            dispatch_draw_model,
            dispatch_copy_buffer,
            dispatch_image_barrier,
        ],
    };

    /// Table using the same function for every kind.
    pub const fn uniform(f: DispatchFn) -> Self {
        Self {
            entries: [f; CommandKind::COUNT],
        }
    }

    /// Replace the function for one kind.
    pub fn with(mut self, kind: CommandKind, f: DispatchFn) -> Self {
        self.entries[kind as usize] = f;
        self
    }

    pub fn get(&self, kind: CommandKind) -> DispatchFn {
        self.entries[kind as usize]
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::RENDERER
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable").finish_non_exhaustive()
    }
}

fn mismatched(expected: CommandKind, command: &Command) -> ! {
    panic!(
        "dispatch function for {:?} invoked with {:?} record",
        expected,
        command.kind()
    )
}

fn dispatch_signal_semaphore(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::SignalSemaphore(semaphore) = command else {
        mismatched(CommandKind::SignalSemaphore, command)
    };
    r.signal_semaphore(list, *semaphore);
}

fn dispatch_wait_semaphore(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::WaitSemaphore(semaphore) = command else {
        mismatched(CommandKind::WaitSemaphore, command)
    };
    r.wait_semaphore(list, *semaphore);
}

fn dispatch_push_marker(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::PushMarker(name) = command else {
        mismatched(CommandKind::PushMarker, command)
    };
    r.push_marker(list, name);
}

fn dispatch_pop_marker(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::PopMarker = command else {
        mismatched(CommandKind::PopMarker, command)
    };
    r.pop_marker(list);
}

fn dispatch_begin_trace(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BeginTrace(name) = command else {
        mismatched(CommandKind::BeginTrace, command)
    };
    r.begin_trace(list, name);
}

fn dispatch_end_trace(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::EndTrace = command else {
        mismatched(CommandKind::EndTrace, command)
    };
    r.end_trace(list);
}

fn dispatch_begin_render_pass(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BeginRenderPass { colors, depth } = command else {
        mismatched(CommandKind::BeginRenderPass, command)
    };
    r.begin_render_pass(list, colors, depth.as_ref());
}

fn dispatch_end_render_pass(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::EndRenderPass = command else {
        mismatched(CommandKind::EndRenderPass, command)
    };
    r.end_render_pass(list);
}

fn dispatch_clear_image(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::ClearImage { image, color } = command else {
        mismatched(CommandKind::ClearImage, command)
    };
    r.clear_image(list, *image, *color);
}

fn dispatch_clear_depth(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::ClearDepth { image, depth } = command else {
        mismatched(CommandKind::ClearDepth, command)
    };
    r.clear_depth(list, *image, *depth);
}

fn dispatch_set_viewport(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::SetViewport(viewport) = command else {
        mismatched(CommandKind::SetViewport, command)
    };
    r.set_viewport(list, viewport);
}

fn dispatch_set_scissor(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::SetScissor(rect) = command else {
        mismatched(CommandKind::SetScissor, command)
    };
    r.set_scissor(list, rect);
}

fn dispatch_bind_pipeline(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BindPipeline(pipeline) = command else {
        mismatched(CommandKind::BindPipeline, command)
    };
    r.bind_pipeline(list, *pipeline);
}

fn dispatch_bind_descriptor_set(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BindDescriptorSet { set, bindings } = command else {
        mismatched(CommandKind::BindDescriptorSet, command)
    };
    r.bind_descriptor_set(list, *set, bindings);
}

fn dispatch_bind_vertex_buffer(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BindVertexBuffer {
        slot,
        buffer,
        offset,
    } = command
    else {
        mismatched(CommandKind::BindVertexBuffer, command)
    };
    r.bind_vertex_buffer(list, *slot, *buffer, *offset);
}

fn dispatch_bind_index_buffer(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::BindIndexBuffer {
        buffer,
        offset,
        format,
    } = command
    else {
        mismatched(CommandKind::BindIndexBuffer, command)
    };
    r.bind_index_buffer(list, *buffer, *offset, *format);
}

fn dispatch_draw(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::Draw(args) = command else {
        mismatched(CommandKind::Draw, command)
    };
    r.draw(list, args);
}

fn dispatch_draw_indexed(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::DrawIndexed(args) = command else {
        mismatched(CommandKind::DrawIndexed, command)
    };
    r.draw_indexed(list, args);
}

fn dispatch_draw_model(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::DrawModel {
        model,
        instance_count,
    } = command
    else {
        mismatched(CommandKind::DrawModel, command)
    };
    r.draw_model(list, *model, *instance_count);
}

fn dispatch_copy_buffer(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::CopyBuffer(copy) = command else {
        mismatched(CommandKind::CopyBuffer, command)
    };
    r.copy_buffer(list, copy);
}

fn dispatch_image_barrier(r: &mut dyn Renderer, list: CommandListId, command: &Command) {
    let Command::ImageBarrier { image, from, to } = command else {
        mismatched(CommandKind::ImageBarrier, command)
    };
    r.image_barrier(list, *image, *from, *to);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_matches_discriminants() {
        for (index, kind) in CommandKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, index);
        }
    }

    #[test]
    fn test_kind_of_record() {
        assert_eq!(Command::PopMarker.kind(), CommandKind::PopMarker);
        let draw = Command::Draw(DrawArgs {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        });
        assert_eq!(draw.kind(), CommandKind::Draw);
    }
}
