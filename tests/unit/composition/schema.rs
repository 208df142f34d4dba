use super::*;
use serde_json::json;

fn title_schema() -> PropsSchema {
    serde_json::from_value(json!({
        "type": "object",
        "fields": {
            "title": {"type": "string"},
            "speed": {"type": "number", "min": 0.0, "max": 4.0},
            "count": {"type": "integer", "min": 1},
            "theme": {"type": "string", "enum": ["dark", "light"]},
            "tags": {"type": "array", "items": {"type": "string"}},
            "logo": {"type": "nullable", "inner": {"type": "string"}}
        },
        "required": ["title"],
        "additional": false
    }))
    .unwrap()
}

#[test]
fn valid_props_pass() {
    let props = json!({
        "title": "Hello",
        "speed": 1.5,
        "count": 3,
        "theme": "dark",
        "tags": ["a", "b"],
        "logo": null
    });
    title_schema().validate(&props).unwrap();
}

#[test]
fn violations_report_json_paths() {
    let props = json!({
        "speed": 9.0,
        "count": 1.5,
        "theme": "blue",
        "tags": ["a", 3],
        "extra": true
    });
    let errs = title_schema().validate(&props).unwrap_err();
    let paths: Vec<String> = errs.errors.iter().map(|e| e.path()).collect();
    assert_eq!(
        paths,
        vec!["$.title", "$.count", "$.extra", "$.speed", "$.tags[1]", "$.theme"]
    );
    let text = errs.to_string();
    assert!(text.contains("$.title: required field is missing"));
    assert!(text.contains("$.tags[1]: expected string, got number"));
    assert!(text.contains("must be one of [dark, light]"));
}

#[test]
fn type_mismatch_at_root() {
    let errs = title_schema().validate(&json!([1, 2])).unwrap_err();
    assert_eq!(errs.errors.len(), 1);
    assert_eq!(errs.errors[0].path(), "$");
    assert!(errs.errors[0].message.contains("expected object, got array"));
}

#[test]
fn any_and_open_objects_accept_extras() {
    let schema = PropsSchema::Object {
        fields: BTreeMap::new(),
        required: vec![],
        additional: true,
    };
    schema.validate(&json!({"whatever": [1, 2, 3]})).unwrap();
    PropsSchema::Any.validate(&json!(null)).unwrap();
}

#[test]
fn schema_serializes_with_type_tag() {
    let s = PropsSchema::String {
        one_of: Some(vec!["a".to_owned()]),
    };
    assert_eq!(
        serde_json::to_value(&s).unwrap(),
        json!({"type": "string", "enum": ["a"]})
    );
}
