//! Headless Bridge Demo
//!
//! Drives one root through both backends with a recording native factory:
//! builds a small tree, measures a paragraph with an inline image, and
//! prints what reached the widgets and the document side.
//!
//! Run with `RUST_LOG=trellis_render=debug` for batch statistics.

use std::sync::mpsc;
use std::time::Duration;

use trellis_core::{
    event::names, props, BackendKind, BridgeConfig, CreateNode, LayoutFrame, LayoutUpdate,
    ListenerUpdate, MeasureMode, MeasureRequest, Result, UiEvent,
};
use trellis_render::{init_tracing, ChannelSink, HeadlessViewFactory, NativeCall, RenderBridge};

fn main() -> Result<()> {
    let config = BridgeConfig::standard().with_density(2.0);
    init_tracing(&config.log_filter);

    let (tx, rx) = mpsc::channel();
    let bridge = RenderBridge::new(config, Box::new(ChannelSink::new(tx)))?;

    for (root_id, kind) in [(1, BackendKind::Direct), (2, BackendKind::Serialized)] {
        let factory = HeadlessViewFactory::new();
        let calls = factory.calls();
        let backend = bridge.attach_root_with(root_id, Box::new(factory), kind)?;

        backend.create_node(vec![
            CreateNode::new(10, root_id, 0, "View").with_props(props! { "backgroundColor" => 0xffee_eeeeu32 }),
            CreateNode::new(11, 10, 0, "Text").with_props(props! {
                "text" => "Inline images flow with the text around them",
                "fontSize" => 15,
                "lineHeight" => 22,
            }),
            CreateNode::new(12, 11, 0, "Image")
                .with_props(props! { "width" => 18, "height" => 18, "verticalAlign" => "middle" })
                .with_parent_text(true),
        ])?;

        let size = backend.measure(&MeasureRequest::new(root_id, 11).with_width(160.0, MeasureMode::AtMost))?;
        println!("[{kind:?}] paragraph measured at {:.1} x {:.1} dp", size.width, size.height);

        backend.update_layout(vec![LayoutUpdate {
            tag: 11,
            frame: LayoutFrame::new(8.0, 8.0, size.width, size.height),
            padding: None,
        }])?;
        backend.update_event_listener(vec![ListenerUpdate::new(10).with_event(names::LAYOUT, true)])?;
        backend.end_batch()?;

        bridge.dispatch_event(UiEvent::new(root_id, 10, names::LAYOUT));
        bridge.dispatch_event(UiEvent::new(root_id, 11, names::SCROLL));

        if let Some(snapshot) = bridge.snapshot(root_id) {
            let image = &snapshot.children[0].children[0].children[0];
            println!("[{kind:?}] image span at {:?}", image.span_position);
        }
        let calls = calls.lock();
        let frames = calls.iter().filter(|c| matches!(c, NativeCall::Frame { .. })).count();
        println!("[{kind:?}] {} native calls, {} frames", calls.len(), frames);
    }

    while let Ok(message) = rx.recv_timeout(Duration::from_millis(100)) {
        println!("document <- {message:?}");
    }

    bridge.detach_root(1)?;
    bridge.detach_root(2)?;
    Ok(())
}
