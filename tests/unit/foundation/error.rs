use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::config("x")
            .to_string()
            .contains("config error:")
    );
    assert!(
        ReelError::unsupported_format("avi")
            .to_string()
            .contains("unsupported format: 'avi'")
    );
    assert!(ReelError::Busy.to_string().contains("busy"));
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn encoding_error_carries_frame_index() {
    let err = ReelError::encoding(42, "disk full");
    match &err {
        ReelError::Encoding { frame, message } => {
            assert_eq!(*frame, 42);
            assert_eq!(message, "disk full");
        }
        other => panic!("unexpected variant: {other:?}"),
    }
    assert!(err.to_string().contains("frame 42"));
    assert!(err.is_runtime());
}

#[test]
fn render_timeout_mentions_frame_and_wait() {
    let err = ReelError::RenderTimeout {
        frame: 7,
        timeout_ms: 250,
    };
    let msg = err.to_string();
    assert!(msg.contains("frame 7"));
    assert!(msg.contains("250ms"));
    assert!(err.is_runtime());
    assert!(!ReelError::Busy.is_runtime());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
