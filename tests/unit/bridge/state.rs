use super::*;
use serde_json::json;

#[test]
fn bundle_state_wire_format() {
    assert_eq!(
        serde_json::to_value(BundleState::Index).unwrap(),
        json!({"type": "index"})
    );
    let s: BundleState = serde_json::from_value(json!({
        "type": "composition",
        "compositionName": "Main",
        "serializedResolvedProps": "{}",
        "compositionWidth": 1280,
        "compositionHeight": 720,
        "compositionDurationInFrames": 30,
        "compositionFps": {"num": 30, "den": 1}
    }))
    .unwrap();
    assert_eq!(s.mode_name(), "composition");
    assert_eq!(s.composition_name(), Some("Main"));
    let cfg = s.video_config().unwrap();
    assert_eq!(cfg.width, 1280);
    assert_eq!(cfg.duration_in_frames, 30);
}

#[test]
fn composition_state_from_metadata() {
    let meta = CompositionMetadata {
        id: "Main".to_owned(),
        width: 100,
        height: 50,
        fps: Fps::new(24, 1).unwrap(),
        duration_in_frames: 48,
        serialized_default_props: "{}".to_owned(),
        serialized_resolved_props: r#"{"a":1}"#.to_owned(),
    };
    let s = BundleState::composition(&meta);
    assert_eq!(s.video_config(), Some(meta.config()));
    assert_eq!(BundleState::Evaluation.composition_name(), None);
}

#[test]
fn clip_region_clamps_to_canvas() {
    let canvas = Canvas {
        width: 100,
        height: 100,
    };
    let r = ClipRegion::Area {
        x: 50.0,
        y: -10.0,
        width: 100.0,
        height: 40.0,
    }
    .clamp_to(canvas);
    assert_eq!(
        r,
        ClipRegion::Area {
            x: 50.0,
            y: 0.0,
            width: 50.0,
            height: 30.0
        }
    );

    let outside = ClipRegion::Area {
        x: 200.0,
        y: 200.0,
        width: 10.0,
        height: 10.0,
    };
    assert_eq!(outside.clamp_to(canvas), ClipRegion::Hide);
    assert_eq!(ClipRegion::Hide.clamp_to(canvas), ClipRegion::Hide);
}

#[test]
fn clip_region_wire_format() {
    assert_eq!(
        serde_json::to_value(ClipRegion::Hide).unwrap(),
        json!({"type": "hide"})
    );
    let r = ClipRegion::from_rect(Rect::new(1.0, 2.0, 11.0, 22.0));
    assert_eq!(
        serde_json::to_value(r).unwrap(),
        json!({"type": "area", "x": 1.0, "y": 2.0, "width": 10.0, "height": 20.0})
    );
}
