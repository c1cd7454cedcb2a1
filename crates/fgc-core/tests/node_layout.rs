//! Integration tests: backend JSON → nodes → pixel layout.
//!
//! Exercises the `fgc-core` pipeline a scene builder relies on: decode the
//! stored node, compile its input, and size it in pixels.

use fgc_core::units::{numpad_block_size, numpad_icon_frame, to_pixels};
use fgc_core::{CanvasNode, ControllerType, NodeId, NodeKind, UserSettings, compile};
use pretty_assertions::assert_eq;

const STAGE_NODES: &str = r#"[
    { "kind": "ARROW", "id": "arr-1", "startNodeId": "blk-1", "endNodeId": null, "points": [0, 0, 0.05, 0.02] },
    { "kind": "NUMPAD_BLOCK", "id": "blk-1", "input": "236HP", "type": "CLASSIC", "x": 0.1, "y": 0.2 },
    { "kind": "NUMPAD_BLOCK", "id": "blk-2", "input": "2 a_ m", "type": "MODERN", "x": 0.4, "y": 0.2 }
]"#;

fn settings() -> UserSettings {
    UserSettings {
        viewport_width_unit: 1000.0,
        viewport_height_unit: 1000.0,
        length_unit: 10.0,
        command_size: 3.0,
        ..UserSettings::default()
    }
}

#[test]
fn decodes_mixed_kinds() {
    let nodes: Vec<CanvasNode> = serde_json::from_str(STAGE_NODES).unwrap();
    let kinds: Vec<NodeKind> = nodes.iter().map(CanvasNode::kind).collect();
    assert_eq!(kinds, [NodeKind::Arrow, NodeKind::NumpadBlock, NodeKind::NumpadBlock]);
    assert!(nodes[0].references(NodeId::intern("blk-1")));
    assert!(!nodes[0].references(NodeId::intern("blk-2")));
}

#[test]
fn block_geometry_follows_compiled_tokens() {
    let nodes: Vec<CanvasNode> = serde_json::from_str(STAGE_NODES).unwrap();
    let CanvasNode::NumpadBlock(block) = &nodes[2] else {
        panic!("expected a numpad block");
    };
    assert_eq!(block.controller_type, ControllerType::Modern);

    let tokens = compile(&block.input, block.controller_type);
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["2", "a_", "m"]);

    let s = settings();
    let size = numpad_block_size(tokens.len(), &s);
    assert!((size.width - 100.0).abs() < 1e-9, "width {}", size.width);
    assert_eq!(size.height, 60.0);

    // Last icon ends one margin before the block's right edge.
    let last = numpad_icon_frame(tokens.len() - 1, &s);
    assert!((size.width - last.x1 - 5.0).abs() < 1e-9);

    let origin = to_pixels(nodes[2].position().unwrap(), &s);
    assert!((origin.x - 400.0).abs() < 1e-9);
    assert!((origin.y - 200.0).abs() < 1e-9);
}
