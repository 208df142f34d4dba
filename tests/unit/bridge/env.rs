use super::*;
use serde_json::json;

#[test]
fn empty_object_is_a_valid_env() {
    let env = PageEnv::from_json("{}").unwrap();
    assert_eq!(env, PageEnv::default());
    assert_eq!(env.default_timeout(), Duration::from_secs(30));
    assert_eq!(env.input_props().unwrap(), json!({}));
    assert!(env.env_variables().unwrap().is_empty());
}

#[test]
fn serialized_inputs_are_parsed() {
    let env = PageEnv::from_json(
        r#"{
            "inputProps": "{\"title\":\"Hi\"}",
            "envVariables": "{\"API_URL\":\"https://example.test\"}",
            "audioEnabled": false,
            "timeoutInMilliseconds": 1500
        }"#,
    )
    .unwrap();
    assert_eq!(env.input_props().unwrap(), json!({"title": "Hi"}));
    assert_eq!(
        env.env_variables().unwrap().get("API_URL").map(String::as_str),
        Some("https://example.test")
    );
    assert!(!env.audio_enabled);
    assert!(env.video_enabled);
    assert_eq!(env.default_timeout(), Duration::from_millis(1500));
}

#[test]
fn bad_serialized_props_are_serde_errors() {
    let env = PageEnv {
        input_props: "{nope".to_owned(),
        ..PageEnv::default()
    };
    assert!(matches!(env.input_props(), Err(BridgeError::Serde(_))));
    assert!(matches!(
        PageEnv::from_json("[1,2]"),
        Err(BridgeError::Serde(_))
    ));
}

#[test]
fn version_mismatch_warns_but_passes() {
    let mut env = PageEnv::default();
    assert!(env.check_version("1.0.0"));
    env.version = Some("1.0.0".to_owned());
    assert!(env.check_version("1.0.0"));
    assert!(!env.check_version("2.0.0"));
}

#[test]
fn static_file_urls() {
    let env = PageEnv {
        static_base: "/static-abc/".to_owned(),
        ..PageEnv::default()
    };
    assert_eq!(
        env.static_file("img/logo.png").unwrap(),
        "/static-abc/img/logo.png"
    );
    assert_eq!(
        env.static_file("./a b#1.mp3").unwrap(),
        "/static-abc/a%20b%231.mp3"
    );
    assert!(env.static_file("/etc/passwd").is_err());
    assert!(env.static_file("../secret").is_err());
    assert!(env.static_file("").is_err());
    assert!(env.static_file("./").is_err());
}

#[test]
fn normalize_collapses_separators() {
    assert_eq!(normalize_static_path("a//b/./c").unwrap(), "a/b/c");
    assert_eq!(normalize_static_path("a\\b").unwrap(), "a/b");
}
