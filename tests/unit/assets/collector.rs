use super::*;

fn asset(id: &str, kind: MediaKind, frame: u64) -> RenderAsset {
    RenderAsset {
        id: id.to_owned(),
        kind,
        src: format!("{id}.media"),
        frame: FrameIndex(frame),
        media_frame: frame,
        volume: 1.0,
        playback_rate: 1.0,
        trim_before: 0,
        trim_after: None,
    }
}

#[test]
fn collect_returns_emission_order_then_drains() {
    let mut c = AssetCollector::default();
    assert!(c.emit(asset("audioA", MediaKind::Audio, 0)).unwrap());
    assert!(c.emit(asset("videoB", MediaKind::Video, 0)).unwrap());
    assert_eq!(c.pending_len(), 2);

    let got = c.collect();
    let ids: Vec<_> = got.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["audioA", "videoB"]);
    assert!(c.collect().is_empty());
}

#[test]
fn disabled_kinds_are_dropped_on_emission() {
    let mut c = AssetCollector::new(false, true);
    assert!(!c.emit(asset("a", MediaKind::Audio, 0)).unwrap());
    assert!(c.emit(asset("v", MediaKind::Video, 0)).unwrap());
    assert_eq!(c.collect().len(), 1);

    let mut c = AssetCollector::new(true, false);
    assert!(!c.emit(asset("v", MediaKind::Video, 0)).unwrap());
    assert_eq!(c.pending_len(), 0);
}

#[test]
fn invalid_assets_are_rejected() {
    let mut c = AssetCollector::default();
    let mut a = asset("a", MediaKind::Audio, 0);
    a.src = "  ".to_owned();
    assert!(c.emit(a).is_err());

    let mut a = asset("a", MediaKind::Audio, 0);
    a.volume = f64::NAN;
    assert!(c.emit(a).is_err());

    let mut a = asset("a", MediaKind::Audio, 0);
    a.playback_rate = 0.0;
    assert!(c.emit(a).is_err());
    assert_eq!(c.pending_len(), 0);
}

#[test]
fn discard_clears_without_returning() {
    let mut c = AssetCollector::default();
    c.emit(asset("a", MediaKind::Audio, 3)).unwrap();
    assert_eq!(c.discard(), 1);
    assert!(c.collect().is_empty());
}

#[test]
fn serializes_for_the_driver() {
    let v = serde_json::to_value(asset("a", MediaKind::Audio, 4)).unwrap();
    assert_eq!(v["type"], "audio");
    assert_eq!(v["mediaFrame"], 4);
    assert_eq!(v["playbackRate"], 1.0);
    assert!(v.get("trimAfter").is_none());
}
