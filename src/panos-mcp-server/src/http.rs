//! HTTP and legacy HTTP+SSE transports.
//!
//! `POST /` answers a JSON-RPC message directly. `GET /sse` opens an event
//! stream whose first `endpoint` event names the URL the client posts its
//! messages to; responses come back as `message` events on that stream.
//! `GET /mcp/tools` and `POST /mcp/execute` expose the same tools as plain
//! REST for clients that do not speak JSON-RPC.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatcher::ToolResult;
use crate::error::FailureKind;
use crate::format::OutputFormat;
use crate::handlers::ToolDescriptor;
use crate::server::McpServer;

const SESSION_BUFFER: usize = 32;

type EventSender = mpsc::Sender<Result<Event, Infallible>>;

/// Open SSE sessions by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, EventSender>>,
}

impl SessionRegistry {
    async fn open(&self) -> (Uuid, EventSender, mpsc::Receiver<Result<Event, Infallible>>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions.write().await.insert(id, tx.clone());
        (id, tx, rx)
    }

    async fn sender(&self, id: &Uuid) -> Option<EventSender> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn close(&self, id: &Uuid) {
        if self.sessions.write().await.remove(id).is_some() {
            debug!(session_id = %id, "SSE session closed");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    sessions: Arc<SessionRegistry>,
}

/// Router serving every HTTP route of the server.
pub fn router(server: Arc<McpServer>) -> Router {
    router_with_sessions(server, Arc::new(SessionRegistry::default()))
}

pub fn router_with_sessions(server: Arc<McpServer>, sessions: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/", post(handle_json_rpc))
        .route("/health", get(health))
        .route("/sse", get(open_sse))
        .route("/messages", post(post_message))
        .route("/mcp/tools", get(list_tools))
        .route("/mcp/execute", post(execute_tool))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { server, sessions })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .server
        .dispatcher()
        .list_tools()
        .into_iter()
        .map(catalogue_entry)
        .collect();
    Json(json!({ "tools": tools }))
}

fn catalogue_entry(descriptor: &ToolDescriptor) -> Value {
    let parameters: serde_json::Map<String, Value> = descriptor
        .params
        .iter()
        .map(|spec| {
            let mut entry = json!({ "type": "string", "required": spec.required });
            if let Some(default) = &spec.default {
                entry["default"] = json!(default);
            }
            if !spec.description.is_empty() {
                entry["description"] = json!(spec.description);
            }
            (spec.name.clone(), entry)
        })
        .collect();
    json!({
        "name": descriptor.name,
        "description": descriptor.description,
        "parameters": parameters,
    })
}

fn bad_request(detail: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": detail.into() })),
    )
        .into_response()
}

/// `POST /mcp/execute` with `{"tool": ..., "parameters": {...}}`.
async fn execute_tool(State(state): State<AppState>, body: String) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(format!("Invalid JSON body: {e}")),
    };
    let (Some(tool), Some(parameters)) = (
        request.get("tool").and_then(Value::as_str),
        request.get("parameters"),
    ) else {
        return bad_request("Request must include 'tool' and 'parameters' fields");
    };

    let dispatcher = state.server.dispatcher();
    let names: Vec<&str> = dispatcher
        .list_tools()
        .into_iter()
        .map(|d| d.name.as_str())
        .collect();
    if !names.contains(&tool) {
        return bad_request(format!(
            "Invalid tool name. Available tools: {}",
            names.join(", ")
        ));
    }

    match dispatcher.invoke(tool, Some(parameters.clone())).await {
        ToolResult::Success(text) => {
            let result = match dispatcher.format() {
                OutputFormat::Json => serde_json::from_str(&text).unwrap_or(Value::String(text)),
                OutputFormat::Markdown => Value::String(text),
            };
            Json(json!({ "status": "success", "result": result })).into_response()
        }
        ToolResult::Failure(failure) => {
            let status = match failure.kind {
                FailureKind::Validation | FailureKind::UnknownTool => StatusCode::BAD_REQUEST,
                FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                FailureKind::Transport
                | FailureKind::Upstream
                | FailureKind::MalformedResponse => StatusCode::BAD_GATEWAY,
            };
            let body = json!({
                "status": "error",
                "kind": failure.kind.to_string(),
                "message": failure.message,
            });
            (status, Json(body)).into_response()
        }
    }
}

async fn handle_json_rpc(State(state): State<AppState>, body: String) -> Response {
    match state.server.handle_raw(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn open_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, tx, rx) = state.sessions.open().await;
    info!(session_id = %session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={session_id}"));
    // First message on a fresh channel; cannot be full.
    let _ = tx.try_send(Ok(endpoint));

    // The receiver is dropped with the response stream when the client goes away.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        tx.closed().await;
        sessions.close(&session_id).await;
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> StatusCode {
    let Ok(session_id) = Uuid::parse_str(&query.session_id) else {
        return StatusCode::NOT_FOUND;
    };
    let Some(tx) = state.sessions.sender(&session_id).await else {
        return StatusCode::NOT_FOUND;
    };
    if tx.is_closed() {
        state.sessions.close(&session_id).await;
        return StatusCode::NOT_FOUND;
    }

    tokio::spawn(async move {
        let Some(response) = state.server.handle_raw(&body).await else {
            return;
        };
        let data = match serde_json::to_string(&response) {
            Ok(data) => data,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to serialize response");
                return;
            }
        };
        if tx.send(Ok(Event::default().event("message").data(data))).await.is_err() {
            warn!(session_id = %session_id, "SSE client disconnected, dropping session");
            state.sessions.close(&session_id).await;
        }
    });

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use futures::StreamExt;
    use tower::ServiceExt;

    use panos_api::{ClientConfig, PanosClient};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::builder::McpServerBuilder;
    use crate::tools::panos_tools;

    fn test_server() -> Arc<McpServer> {
        McpServerBuilder::new("panos-mcp", "0.1.0")
            .output_format(OutputFormat::Json)
            .build()
            .unwrap()
    }

    fn firewall_server(firewall: &MockServer) -> Arc<McpServer> {
        let client = PanosClient::new(ClientConfig::new(firewall.uri(), "test-key")).unwrap();
        McpServerBuilder::new("panos-mcp", "0.1.0")
            .output_format(OutputFormat::Json)
            .tool_handlers(panos_tools(&client))
            .build()
            .unwrap()
    }

    fn execute(body: &str) -> Request<Body> {
        Request::post("/mcp/execute")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_server())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_post_json_rpc() {
        let request = Request::post("/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#))
            .unwrap();
        let response = router(test_server()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn test_post_notification_is_accepted() {
        let request = Request::post("/")
            .body(Body::from(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            ))
            .unwrap();
        let response = router(test_server()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_post_garbage_is_parse_error() {
        let request = Request::post("/").body(Body::from("{not json")).unwrap();
        let response = router(test_server()).oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = router(test_server());
        for uri in [
            format!("/messages?session_id={}", Uuid::new_v4()),
            "/messages?session_id=not-a-uuid".to_string(),
        ] {
            let request = Request::post(uri.as_str())
                .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    /// Reads SSE frames until one with the given event name arrives.
    async fn next_event(
        stream: &mut (impl Stream<Item = reqwest::Result<axum::body::Bytes>> + Unpin),
        buffer: &mut String,
        event: &str,
    ) -> String {
        loop {
            while let Some(end) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..end + 2).collect();
                let mut name = None;
                let mut data = String::new();
                for line in frame.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        name = Some(value.trim().to_string());
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                if name.as_deref() == Some(event) {
                    return data;
                }
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    #[tokio::test]
    async fn test_sse_session_round_trip() {
        let sessions = Arc::new(SessionRegistry::default());
        let app = router_with_sessions(test_server(), sessions.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let http = reqwest::Client::new();
        let response = http
            .get(format!("http://{addr}/sse"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let mut stream = Box::pin(response.bytes_stream());
        let mut buffer = String::new();

        let endpoint = next_event(&mut stream, &mut buffer, "endpoint").await;
        assert!(endpoint.starts_with("/messages?session_id="), "{endpoint}");
        assert_eq!(sessions.len().await, 1);

        let posted = http
            .post(format!("http://{addr}{endpoint}"))
            .body(r#"{"jsonrpc":"2.0","id":"abc","method":"tools/list"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(posted.status(), reqwest::StatusCode::ACCEPTED);

        let message = next_event(&mut stream, &mut buffer, "message").await;
        let response: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(response["id"], "abc");
        assert_eq!(response["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn test_sse_sessions_closed_on_disconnect() {
        let sessions = Arc::new(SessionRegistry::default());
        let app = router_with_sessions(test_server(), sessions.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let http = reqwest::Client::new();
        let mut streams = Vec::new();
        for _ in 0..5 {
            let response = http
                .get(format!("http://{addr}/sse"))
                .send()
                .await
                .unwrap();
            let mut stream = Box::pin(response.bytes_stream());
            let mut buffer = String::new();
            next_event(&mut stream, &mut buffer, "endpoint").await;
            streams.push(stream);
        }
        assert_eq!(sessions.len().await, 5);

        drop(streams);
        drop(http);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !sessions.is_empty().await {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_rest_tool_catalogue() {
        let firewall = MockServer::start().await;
        let response = router(firewall_server(&firewall))
            .oneshot(Request::get("/mcp/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let tools = body["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "show_system_info",
                "retrieve_address_objects",
                "retrieve_security_zones",
                "retrieve_security_policies",
            ]
        );
        assert_eq!(tools[0]["parameters"], json!({}));
        let parameters = &tools[1]["parameters"];
        assert_eq!(parameters["location"]["required"], true);
        assert_eq!(parameters["vsys"]["default"], "vsys1");
        assert_eq!(parameters["vsys"]["type"], "string");
    }

    #[tokio::test]
    async fn test_rest_execute_rejects_incomplete_request() {
        let firewall = MockServer::start().await;
        let app = router(firewall_server(&firewall));
        for body in [
            r#"{"tool": "show_system_info"}"#,
            r#"{"parameters": {}}"#,
            r#"{"tool": 3, "parameters": {}}"#,
        ] {
            let response = app.clone().oneshot(execute(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(
                body_json(response).await["detail"],
                "Request must include 'tool' and 'parameters' fields"
            );
        }
    }

    #[tokio::test]
    async fn test_rest_execute_unknown_tool() {
        let firewall = MockServer::start().await;
        let response = router(firewall_server(&firewall))
            .oneshot(execute(r#"{"tool": "commit", "parameters": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["detail"],
            "Invalid tool name. Available tools: show_system_info, retrieve_address_objects, \
             retrieve_security_zones, retrieve_security_policies"
        );
    }

    #[tokio::test]
    async fn test_rest_execute_validation_failure() {
        let firewall = MockServer::start().await;
        let response = router(firewall_server(&firewall))
            .oneshot(execute(
                r#"{"tool": "retrieve_security_zones", "parameters": {}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "status": "error",
                "kind": "validation",
                "message": "Missing required parameter: location",
            })
        );
        assert!(firewall.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rest_execute_success() {
        let firewall = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<response status="success"><result><system><hostname>fw01</hostname></system></result></response>"#,
                "application/xml",
            ))
            .mount(&firewall)
            .await;

        let response = router(firewall_server(&firewall))
            .oneshot(execute(r#"{"tool": "show_system_info", "parameters": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "result": {"hostname": "fw01"}})
        );
    }

    #[tokio::test]
    async fn test_rest_execute_upstream_failure() {
        let firewall = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&firewall)
            .await;

        let response = router(firewall_server(&firewall))
            .oneshot(execute(r#"{"tool": "show_system_info", "parameters": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "upstream");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Error retrieving system information:"),
            "{body}"
        );
    }
}
