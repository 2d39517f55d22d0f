use super::*;

#[test]
fn test_provider_error_display_messages() {
    let status = ProviderError::Status {
        operation: "assistants.list".to_string(),
        status_code: 429,
        request_id: Some("req_abc".to_string()),
        message: "rate limited".to_string(),
    };
    assert_eq!(
        status.to_string(),
        "provider status error [operation=assistants.list, request_id=req_abc, status_code=429]: rate limited"
    );

    let not_found = ProviderError::NotFound {
        operation: "threads.delete".to_string(),
        request_id: None,
        message: "No thread found with id 'thread_1'.".to_string(),
    };
    assert_eq!(
        not_found.to_string(),
        "remote resource not found [operation=threads.delete]: No thread found with id 'thread_1'."
    );

    let transport = ProviderError::Transport {
        operation: String::new(),
        request_id: None,
        message: "timeout".to_string(),
    };
    assert_eq!(transport.to_string(), "provider transport error: timeout");
}

#[test]
fn test_provider_error_not_found_predicate() {
    let not_found = ProviderError::NotFound {
        operation: "assistants.delete".to_string(),
        request_id: None,
        message: "gone".to_string(),
    };
    assert!(not_found.is_not_found());
    assert_eq!(not_found.operation(), "assistants.delete");

    let status = ProviderError::Status {
        operation: "assistants.delete".to_string(),
        status_code: 500,
        request_id: None,
        message: "boom".to_string(),
    };
    assert!(!status.is_not_found());
}

#[test]
fn test_platform_error_kinds() {
    assert_eq!(
        PlatformError::UnsupportedMedium {
            medium: Medium::Audio
        }
        .kind(),
        ErrorKind::Configuration
    );
    assert_eq!(
        PlatformError::UnsupportedRole {
            role: "tool".to_string()
        }
        .kind(),
        ErrorKind::Configuration
    );
    assert_eq!(
        PlatformError::UnsupportedContentType {
            content_type: "image_url".to_string()
        }
        .kind(),
        ErrorKind::Configuration
    );
    assert_eq!(PlatformError::ThreadNotStarted.kind(), ErrorKind::Usage);
    assert_eq!(
        PlatformError::AssistantNotRegistered {
            action: "summarize".to_string()
        }
        .kind(),
        ErrorKind::Usage
    );

    let remote: PlatformError = ProviderError::Protocol {
        operation: "runs.retrieve".to_string(),
        request_id: None,
        message: "bad".to_string(),
    }
    .into();
    assert_eq!(remote.kind(), ErrorKind::Remote);
}

#[test]
fn test_platform_error_display_is_transparent_for_provider() {
    let error: PlatformError = ProviderError::CredentialsRejected {
        operation: "assistants.list".to_string(),
        request_id: Some("req_1".to_string()),
        message: "invalid api key".to_string(),
    }
    .into();

    assert_eq!(
        error.to_string(),
        "provider credentials rejected [operation=assistants.list, request_id=req_1]: invalid api key"
    );
    assert_eq!(
        PlatformError::UnsupportedMedium {
            medium: Medium::Video
        }
        .to_string(),
        "unsupported medium: video"
    );
}
