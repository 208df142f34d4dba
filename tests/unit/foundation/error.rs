use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        BridgeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        BridgeError::protocol("x")
            .to_string()
            .contains("protocol usage error:")
    );
    assert!(
        BridgeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn timeout_names_label_and_id() {
    let err = BridgeError::HandleTimeout {
        id: HandleId(2),
        label: Some("fetch font".to_owned()),
        timeout: Duration::from_millis(100),
    };
    let msg = err.to_string();
    assert!(msg.contains("fetch font"));
    assert!(msg.contains("#2"));
    assert!(msg.contains("100ms"));
    assert!(err.is_page_fatal());

    let unlabeled = BridgeError::HandleTimeout {
        id: HandleId(9),
        label: None,
        timeout: Duration::from_secs(1),
    };
    assert!(unlabeled.to_string().contains("delayRender()"));
}

#[test]
fn not_found_lists_available_ids() {
    let err = BridgeError::CompositionNotFound {
        name: "Nope".to_owned(),
        available: vec!["Main".to_owned(), "Intro".to_owned()],
    };
    let msg = err.to_string();
    assert!(msg.contains("'Nope'"));
    assert!(msg.contains("Main, Intro"));
    assert!(!err.is_page_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BridgeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
