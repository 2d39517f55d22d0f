use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use assistant_platform::core::traits::DEFAULT_MESSAGE_PAGE_SIZE;
use assistant_platform::{
    Assistant, Content, ErrorKind, HttpAssistantsClient, LanguageModelLevel, Medium,
    OpenAiPlatform, Platform, PlatformError, ProviderError, Reconciliation, Role, RunStatus,
    Thread,
};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct MockResponse {
    status_code: u16,
    body: String,
}

impl MockResponse {
    fn json(body: Value) -> Self {
        Self {
            status_code: 200,
            body: body.to_string(),
        }
    }

    fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: json!({ "error": { "message": message, "type": "invalid_request_error" } })
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

struct MockServer {
    addr: std::net::SocketAddr,
    captured_requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockServer {
    fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");

        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let captured_requests = Arc::new(Mutex::new(Vec::new()));

        let queue_clone = Arc::clone(&queue);
        let captured_clone = Arc::clone(&captured_requests);

        let handle = thread::spawn(move || {
            loop {
                let next_response = {
                    let mut queue = queue_clone.lock().expect("queue lock");
                    queue.pop_front()
                };

                let Some(response) = next_response else {
                    break;
                };

                let (mut stream, _) = listener.accept().expect("accept connection");
                stream
                    .set_read_timeout(Some(Duration::from_secs(3)))
                    .expect("set stream timeout");

                let raw = read_http_request_with_body(&mut stream);
                captured_clone
                    .lock()
                    .expect("capture lock")
                    .push(parse_request(&raw));

                let response_text = build_http_response(response.status_code, &response.body);
                stream
                    .write_all(response_text.as_bytes())
                    .expect("write response");
                stream.flush().expect("flush response");
            }
        });

        Self {
            addr,
            captured_requests,
            handle: Some(handle),
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.captured_requests.lock().expect("capture lock").clone()
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn platform_for(server: &MockServer) -> OpenAiPlatform {
    let client = HttpAssistantsClient::with_base_url(Some("test-key".to_string()), server.url())
        .expect("client should build");
    OpenAiPlatform::new(Arc::new(client))
}

fn remote_assistant(id: &str, action: &str, model: &str) -> Value {
    json!({
        "id": id,
        "object": "assistant",
        "created_at": 1_700_000_000,
        "name": format!("remote {id}"),
        "description": null,
        "instructions": "Summarize the input.",
        "model": model,
        "tools": [],
        "metadata": { "action": action, "model": model }
    })
}

fn run(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "object": "thread.run",
        "thread_id": "thread_1",
        "assistant_id": "asst_new",
        "status": status,
        "created_at": 1_700_000_100,
        "started_at": null,
        "completed_at": null,
        "expires_at": 1_700_000_700
    })
}

fn text_message(id: &str, role: &str, text: &str, created_at: i64) -> Value {
    json!({
        "id": id,
        "object": "thread.message",
        "created_at": created_at,
        "thread_id": "thread_1",
        "role": role,
        "content": [{ "type": "text", "text": { "value": text, "annotations": [] } }]
    })
}

#[tokio::test]
async fn test_full_lifecycle_over_http() {
    let server = MockServer::start(vec![
        MockResponse::json(json!({
            "object": "list",
            "data": [remote_assistant("asst_other", "translate", "gpt-3.5-turbo")],
            "first_id": "asst_other",
            "last_id": "asst_other",
            "has_more": false
        })),
        MockResponse::json(remote_assistant("asst_new", "summarize", "gpt-3.5-turbo")),
        MockResponse::json(run("run_1", "queued")),
        MockResponse::json(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "completed",
            "started_at": 1_700_000_110,
            "completed_at": 1_700_000_120,
            "expires_at": null
        })),
        MockResponse::json(text_message("msg_user", "user", "Summarize this.", 1_700_000_200)),
        MockResponse::json(run("run_2", "in_progress")),
        MockResponse::json(json!({
            "object": "list",
            "data": [
                text_message("msg_reply", "assistant", "A summary.", 1_700_000_210),
                text_message("msg_user", "user", "Summarize this.", 1_700_000_200)
            ],
            "first_id": "msg_reply",
            "last_id": "msg_user",
            "has_more": false
        })),
        MockResponse::error(404, "No thread found with id 'thread_1'."),
        MockResponse::json(json!({
            "id": "asst_new",
            "object": "assistant.deleted",
            "deleted": true
        })),
    ]);
    let platform = platform_for(&server);

    let mut assistant = Assistant::new("summarize", Medium::Text)
        .with_name("Summarizer")
        .with_instructions("Summarize the input.");
    let outcome = platform
        .reconcile_assistant(&mut assistant, LanguageModelLevel::Standard, &[])
        .await
        .expect("reconcile should succeed");
    assert_eq!(outcome, Reconciliation::Created);
    assert_eq!(assistant.service_id.as_deref(), Some("asst_new"));

    let mut thread = Thread::new("summarize", Medium::Text);
    platform
        .start_thread(&assistant, &mut thread, Some("Keep it short."))
        .await
        .expect("start should succeed");
    assert_eq!(thread.status, Some(RunStatus::Queued));

    platform
        .refresh_thread(&mut thread)
        .await
        .expect("refresh should succeed");
    assert!(thread.is_settled());
    assert_eq!(
        thread.completed_at.map(|value| value.timestamp()),
        Some(1_700_000_120)
    );
    assert_eq!(thread.expires_at, None);

    let sent = platform
        .reply(&assistant, &mut thread, "Summarize this.")
        .await
        .expect("reply should succeed");
    assert_eq!(sent.role(), Role::User);
    assert_eq!(thread.run_id.as_deref(), Some("run_2"));
    assert_eq!(thread.status, Some(RunStatus::InProgress));
    assert_eq!(thread.completed_at, None);

    let messages = platform
        .fetch_messages(&thread, DEFAULT_MESSAGE_PAGE_SIZE, None)
        .await
        .expect("fetch should succeed");
    let ids: Vec<&str> = messages.iter().map(|message| message.id()).collect();
    assert_eq!(ids, vec!["msg_user", "msg_reply"]);
    assert_eq!(
        messages.messages[1].content(),
        &[Content::Text {
            text: "A summary.".to_string()
        }]
    );

    assert!(platform.delete_thread(&thread).await.expect("delete thread"));
    assert!(
        platform
            .delete_assistant(&assistant)
            .await
            .expect("delete assistant")
    );

    let captured = server.captured();
    let lines: Vec<(String, String)> = captured
        .iter()
        .map(|request| (request.method.clone(), request.path.clone()))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("GET".to_string(), "/v1/assistants?limit=50".to_string()),
            ("POST".to_string(), "/v1/assistants".to_string()),
            ("POST".to_string(), "/v1/threads/runs".to_string()),
            ("GET".to_string(), "/v1/threads/thread_1/runs/run_1".to_string()),
            ("POST".to_string(), "/v1/threads/thread_1/messages".to_string()),
            ("POST".to_string(), "/v1/threads/thread_1/runs".to_string()),
            ("GET".to_string(), "/v1/threads/thread_1/messages?limit=20".to_string()),
            ("DELETE".to_string(), "/v1/threads/thread_1".to_string()),
            ("DELETE".to_string(), "/v1/assistants/asst_new".to_string()),
        ]
    );

    for request in &captured {
        assert_eq!(request.header("authorization"), Some("Bearer test-key"));
        assert_eq!(request.header("openai-beta"), Some("assistants=v2"));
    }

    assert_eq!(
        captured[1].json_body(),
        json!({
            "name": "Summarizer",
            "instructions": "Summarize the input.",
            "model": "gpt-3.5-turbo",
            "response_format": "auto",
            "metadata": { "action": "summarize", "model": "gpt-3.5-turbo" }
        })
    );
    assert_eq!(
        captured[2].json_body(),
        json!({
            "assistant_id": "asst_new",
            "additional_instructions": "Keep it short.",
            "thread": { "metadata": { "action": "summarize" } }
        })
    );
    assert_eq!(
        captured[4].json_body(),
        json!({ "role": "user", "content": "Summarize this." })
    );
    assert_eq!(captured[5].json_body(), json!({ "assistant_id": "asst_new" }));
}

#[tokio::test]
async fn test_reconcile_updates_stale_model_over_http() {
    let server = MockServer::start(vec![
        MockResponse::json(json!({
            "object": "list",
            "data": [remote_assistant("asst_legacy", "extract", "gpt-3.5-turbo")],
            "has_more": false
        })),
        MockResponse::json(remote_assistant("asst_legacy", "extract", "gpt-4o-mini")),
    ]);
    let platform = platform_for(&server);

    let mut assistant = Assistant::new("extract", Medium::Json)
        .with_name("Extractor")
        .with_language_model("gpt-3.5-turbo");
    let outcome = platform
        .reconcile_assistant(&mut assistant, LanguageModelLevel::Standard, &[])
        .await
        .expect("reconcile should succeed");

    assert_eq!(outcome, Reconciliation::Updated);
    assert_eq!(assistant.service_id.as_deref(), Some("asst_legacy"));
    assert_eq!(assistant.language_model_name.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(assistant.name, "remote asst_legacy");
    assert_eq!(assistant.instructions, "Summarize the input.");

    let captured = server.captured();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[1].method, "POST");
    assert_eq!(captured[1].path, "/v1/assistants/asst_legacy");
    assert_eq!(
        captured[1].json_body(),
        json!({
            "name": "remote asst_legacy",
            "instructions": "Summarize the input.",
            "description": "",
            "model": "gpt-4o-mini",
            "metadata": { "action": "extract", "model": "gpt-4o-mini" }
        })
    );
}

#[tokio::test]
async fn test_fetch_messages_sends_cursor_and_decodes_json_medium() {
    let server = MockServer::start(vec![MockResponse::json(json!({
        "object": "list",
        "data": [text_message("msg_5", "assistant", "{\"ok\":true}", 1_700_000_500)],
        "first_id": "msg_5",
        "last_id": "msg_5",
        "has_more": true
    }))]);
    let platform = platform_for(&server);

    let mut thread = Thread::new("extract", Medium::Json);
    thread.service_id = Some("thread_1".to_string());

    let page = platform
        .fetch_messages(&thread, 5, Some("msg_6"))
        .await
        .expect("fetch should succeed");

    assert!(page.has_more);
    assert_eq!(page.last_id.as_deref(), Some("msg_5"));
    let content = &page.messages[0].content()[0];
    assert!(matches!(content, Content::Json { .. }));
    assert_eq!(
        content.parse_json().expect("json content").expect("valid json"),
        json!({ "ok": true })
    );

    let captured = server.captured();
    assert_eq!(captured[0].path, "/v1/threads/thread_1/messages?limit=5&before=msg_6");
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_remote_error() {
    let server = MockServer::start(vec![MockResponse::error(401, "Incorrect API key provided")]);
    let platform = platform_for(&server);

    let mut assistant = Assistant::new("summarize", Medium::Text);
    let err = platform
        .find_assistant(&mut assistant)
        .await
        .expect_err("find should fail");

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(matches!(
        err,
        PlatformError::Provider(ProviderError::CredentialsRejected { .. })
    ));
    assert_eq!(assistant.service_id, None);
}

#[tokio::test]
async fn test_delete_assistant_propagates_server_failure() {
    let server = MockServer::start(vec![MockResponse::error(400, "Invalid assistant id")]);
    let platform = platform_for(&server);

    let mut assistant = Assistant::new("summarize", Medium::Text);
    assistant.service_id = Some("asst_bad".to_string());

    let err = platform
        .delete_assistant(&assistant)
        .await
        .expect_err("delete should fail");
    assert!(matches!(
        err,
        PlatformError::Provider(ProviderError::Status {
            status_code: 400,
            ..
        })
    ));
}

fn parse_request(raw: &str) -> CapturedRequest {
    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let headers = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    CapturedRequest {
        method,
        path,
        headers,
        body: body.to_string(),
    }
}

fn read_http_request_with_body(stream: &mut std::net::TcpStream) -> String {
    let mut request = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(bytes_read) => {
                request.extend_from_slice(&chunk[..bytes_read]);

                if let Some(header_end) =
                    request.windows(4).position(|window| window == b"\r\n\r\n")
                {
                    let headers = String::from_utf8_lossy(&request[..header_end]).to_string();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(error) => panic!("failed reading request: {error}"),
        }
    }

    String::from_utf8_lossy(&request).to_string()
}

fn build_http_response(status_code: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_reason(status_code),
        body.len(),
        body,
    )
}

fn status_reason(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Unknown",
    }
}
