use super::*;
use serde_json::json;

fn file_json() -> Value {
    json!({
        "compositions": [
            {
                "id": "Main",
                "width": 1920,
                "height": 1080,
                "fps": {"num": 30, "den": 1},
                "durationInFrames": 120,
                "defaultProps": {"title": "Hello"},
                "schema": {
                    "type": "object",
                    "fields": {"title": {"type": "string"}},
                    "required": ["title"]
                },
                "media": [
                    {"id": "music", "kind": "audio", "src": "music.mp3", "durationInFrames": 120}
                ]
            },
            {
                "id": "Thumb",
                "width": 640,
                "height": 360,
                "fps": {"num": 1, "den": 1},
                "durationInFrames": 10,
                "still": true
            }
        ]
    })
}

#[test]
fn parses_and_registers_in_order() {
    let file = CompositionFile::from_reader(file_json().to_string().as_bytes()).unwrap();
    let mut r = CompositionResolver::new();
    assert_eq!(file.register_into(&mut r).unwrap(), 2);
    assert_eq!(r.names(), vec!["Main".to_owned(), "Thumb".to_owned()]);

    let main = r.get("Main").unwrap();
    assert_eq!(main.media.len(), 1);
    assert!(main.schema.is_some());

    let thumb = r.get("Thumb").unwrap();
    assert!(thumb.still);
    assert_eq!(thumb.default_props, json!({}));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = CompositionFile::from_reader("{\"compositions\": 3}".as_bytes()).unwrap_err();
    assert!(matches!(err, BridgeError::Serde(_)));
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = CompositionFile::from_path("does/not/exist.json").unwrap_err();
    assert!(err.to_string().contains("does/not/exist.json"));
}

#[test]
fn invalid_definitions_fail_registration() {
    let mut v = file_json();
    v["compositions"][0]["width"] = json!(0);
    let file: CompositionFile = serde_json::from_value(v).unwrap();
    let mut r = CompositionResolver::new();
    assert!(file.register_into(&mut r).is_err());
}
