//! Integration tests for command recording and dispatch replay.

mod common;

use rstest::rstest;

use common::{TestContext, count_kind, kinds, mock_dispatch, quiet_config, take_replayed};
use framegraph::command_list::DrawArgs;
use framegraph::renderer::RecordedCall;
use framegraph::types::{ImageLayout, ScissorRect, Viewport};
use framegraph::{Command, CommandKind, CommandList, DispatchTable, ImageId, RenderGraph};

fn draw_record(vertex_count: u32) -> Command {
    Command::Draw(DrawArgs {
        vertex_count,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    })
}

#[rstest]
#[case::single(1, 1)]
#[case::wide(3, 5)]
#[case::deep(8, 2)]
#[case::empty_passes(4, 0)]
fn test_passes_times_commands_replay_in_order(#[case] passes: u32, #[case] per_pass: u32) {
    let mut ctx = TestContext::with_config(quiet_config());
    take_replayed();

    let stats = {
        let mut graph = RenderGraph::new(&mut ctx.allocator)
            .with_dispatch_table(DispatchTable::uniform(mock_dispatch));
        for p in 0..passes {
            graph.add_pass(
                format!("pass{p}"),
                p,
                |_, _| true,
                move |&mut p, _, cmd| {
                    for m in 0..per_pass {
                        cmd.draw(p * 100 + m, 1);
                    }
                },
            );
        }
        graph.setup(&mut ctx.renderer).unwrap();
        graph.execute(&mut ctx.renderer)
    };

    let expected: Vec<Command> = (0..passes)
        .flat_map(|p| (0..per_pass).map(move |m| draw_record(p * 100 + m)))
        .collect();
    assert_eq!(stats.recorded_commands, (passes * per_pass) as usize);
    assert_eq!(take_replayed(), expected);
    // The mock swallowed every record; only the list lifecycle reached the backend.
    assert!(ctx.renderer.recorded_commands().is_empty());
    assert_eq!(ctx.renderer.calls().len(), 2);
}

#[test]
fn test_mixed_dispatch_table_routes_per_kind() {
    let mut ctx = TestContext::with_config(quiet_config());
    take_replayed();

    {
        let table = DispatchTable::RENDERER.with(CommandKind::Draw, mock_dispatch);
        let mut graph = RenderGraph::new(&mut ctx.allocator).with_dispatch_table(table);
        graph.add_pass(
            "mixed",
            (),
            |_, _| true,
            |_, _, cmd| {
                cmd.set_viewport(Viewport::from_dimensions(8, 8));
                cmd.draw(3, 1);
                cmd.set_scissor(ScissorRect::new(0, 0, 8, 8));
            },
        );
        graph.setup(&mut ctx.renderer).unwrap();
        graph.execute(&mut ctx.renderer);
    }

    assert_eq!(take_replayed(), vec![draw_record(3)]);
    assert_eq!(
        kinds(&ctx.renderer.recorded_commands()),
        vec![CommandKind::SetViewport, CommandKind::SetScissor]
    );
}

fn record_with_exits(cmd: &mut CommandList, exit_at: u32) {
    let mut frame = cmd.scoped_marker("outer");
    frame.draw(1, 1);
    if exit_at == 0 {
        return;
    }
    let mut trace = frame.scoped_trace("timed");
    let mut inner = trace.scoped_marker("inner");
    inner.draw(2, 1);
    if exit_at == 1 {
        return;
    }
    inner.image_barrier(
        ImageId::from_raw(0),
        ImageLayout::ColorAttachment,
        ImageLayout::ShaderRead,
    );
}

#[rstest]
#[case::first_exit(0)]
#[case::nested_exit(1)]
#[case::full(2)]
fn test_markers_balance_on_every_exit_path(#[case] exit_at: u32) {
    let mut ctx = TestContext::new();
    {
        let mut graph = RenderGraph::new(&mut ctx.allocator);
        graph.add_pass(
            "early_out",
            exit_at,
            |_, _| true,
            |&mut exit_at, _, cmd| record_with_exits(cmd, exit_at),
        );
        graph.setup(&mut ctx.renderer).unwrap();
        graph.execute(&mut ctx.renderer);
    }

    let commands = ctx.renderer.recorded_commands();
    assert_eq!(
        count_kind(&commands, CommandKind::PushMarker),
        count_kind(&commands, CommandKind::PopMarker)
    );
    assert_eq!(
        count_kind(&commands, CommandKind::BeginTrace),
        count_kind(&commands, CommandKind::EndTrace)
    );

    // Every prefix opens at least as many markers as it closes.
    let mut depth = 0i32;
    for command in &commands {
        match command.kind() {
            CommandKind::PushMarker => depth += 1,
            CommandKind::PopMarker => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);
}

#[test]
fn test_replay_matches_recorded_list() {
    let mut ctx = TestContext::new();
    let semaphore = {
        use framegraph::Renderer;
        ctx.renderer.create_semaphore().unwrap()
    };

    {
        let mut graph = RenderGraph::new(&mut ctx.allocator);
        graph.add_wait_semaphore(semaphore);
        graph.add_pass(
            "a",
            (),
            |_, _| true,
            |_, _, cmd| {
                let mut scope = cmd.scoped_marker("a");
                scope.draw(3, 1);
                scope.draw_indexed(6, 1);
            },
        );
        graph.setup(&mut ctx.renderer).unwrap();
        graph.execute(&mut ctx.renderer);
    }

    let calls = ctx.renderer.calls();
    let RecordedCall::BeginCommandList(list) = calls[0] else {
        panic!("expected BeginCommandList, got {:?}", calls[0]);
    };
    assert!(calls[1..calls.len() - 1]
        .iter()
        .all(|call| matches!(call, RecordedCall::Command(id, _) if *id == list)));
    assert_eq!(
        kinds(&ctx.renderer.recorded_commands()),
        vec![
            CommandKind::WaitSemaphore,
            CommandKind::PushMarker,
            CommandKind::PushMarker,
            CommandKind::Draw,
            CommandKind::DrawIndexed,
            CommandKind::PopMarker,
            CommandKind::PopMarker,
        ]
    );
}
