use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;

use models::Entity;
use server::{Registrar, Resource, ResourceRouter};
use service::storage::MemoryStore;
use service::{DefaultManager, Document, ManagerError, QueryParams, ResourceManager, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Thing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    name: String,
}

impl Entity for Thing {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    List,
    Create(Option<String>),
    Update(String, Option<String>),
    Delete(String),
}

/// Records every manager call and answers with a scripted outcome.
struct FakeManager {
    base: DefaultManager,
    calls: Mutex<Vec<Call>>,
    queries: Mutex<Vec<QueryParams>>,
    fail: bool,
    decode_error: Option<String>,
}

impl FakeManager {
    fn new() -> Self {
        Self {
            base: DefaultManager::new("test", Arc::new(MemoryStore::new())),
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            fail: false,
            decode_error: None,
        }
    }

    fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    fn rejecting(msg: &str) -> Self {
        Self { decode_error: Some(msg.to_string()), ..Self::new() }
    }

    fn record(&self, call: Call, query: &QueryParams) -> Result<(), ManagerError> {
        self.calls.lock().unwrap().push(call);
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            Err(StoreError::Backend("test error".into()).into())
        } else {
            Ok(())
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceManager for FakeManager {
    type Entity = Thing;

    fn base(&self) -> &DefaultManager {
        &self.base
    }

    fn new_entity(&self) -> Thing {
        Thing::default()
    }

    fn decode(&self, body: &[u8]) -> Result<Thing, ManagerError> {
        if let Some(msg) = &self.decode_error {
            return Err(ManagerError::Decode(msg.clone()));
        }
        serde_json::from_slice(body).map_err(ManagerError::decode)
    }

    async fn get(&self, id: &str, query: &QueryParams) -> Result<Document, ManagerError> {
        self.record(Call::Get(id.to_string()), query)?;
        Ok(json!({"id": id, "bar": "baz"}))
    }

    async fn create(&self, entity: Thing, query: &QueryParams) -> Result<Document, ManagerError> {
        self.record(Call::Create(entity.id.clone()), query)?;
        Ok(json!({"id": "new", "name": entity.name}))
    }

    async fn list(&self, query: &QueryParams) -> Result<Vec<Document>, ManagerError> {
        self.record(Call::List, query)?;
        Ok(vec![json!({"bar": "baz"})])
    }

    async fn update(&self, id: &str, entity: Thing, query: &QueryParams) -> Result<Document, ManagerError> {
        self.record(Call::Update(id.to_string(), entity.id.clone()), query)?;
        Ok(json!({"id": id, "name": entity.name}))
    }

    async fn delete(&self, id: &str, query: &QueryParams) -> Result<(), ManagerError> {
        self.record(Call::Delete(id.to_string()), query)
    }
}

fn app(manager: &Arc<FakeManager>) -> Router {
    let mut routes = ResourceRouter::new();
    Resource::new(Arc::clone(manager), &mut routes);
    routes.into_router()
}

async fn send(app: &Router, method: Method, uri: &str, body: &str) -> anyhow::Result<Response> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))?;
    Ok(app.clone().oneshot(req).await?)
}

async fn text(res: Response) -> anyhow::Result<String> {
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn content_type(res: &Response) -> &str {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[derive(Default)]
struct Recorder {
    patterns: Vec<String>,
}

impl Registrar for Recorder {
    fn handle(&mut self, pattern: &str, _route: MethodRouter) {
        self.patterns.push(pattern.to_string());
    }
}

#[test]
fn binds_exactly_the_collection_and_item_patterns() {
    let mut recorder = Recorder::default();
    Resource::new(Arc::new(FakeManager::new()), &mut recorder);
    assert_eq!(recorder.patterns, ["/test", "/test/:id"]);
}

#[tokio::test]
async fn get_with_id_returns_the_entity() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::GET, "/test/foo", "").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "application/json");
    let body: Value = serde_json::from_str(&text(res).await?)?;
    assert_eq!(body, json!({"id": "foo", "bar": "baz"}));
    assert_eq!(m.calls(), [Call::Get("foo".into())]);
    Ok(())
}

#[tokio::test]
async fn get_without_id_lists() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::GET, "/test", "").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await?, r#"[{"bar":"baz"}]"#);
    assert_eq!(m.calls(), [Call::List]);
    Ok(())
}

#[tokio::test]
async fn get_failure_is_a_plain_500() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::failing());
    for uri in ["/test/foo", "/test"] {
        let res = send(&app(&m), Method::GET, uri, "").await?;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&res), "text/plain; charset=utf-8");
        assert_eq!(text(res).await?, "test error\n");
    }
    Ok(())
}

#[tokio::test]
async fn query_parameters_reach_the_manager() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    send(&app(&m), Method::GET, "/test?tag=a&tag=b&limit=5", "").await?;
    let queries = m.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get_all("tag"), ["a", "b"]);
    assert_eq!(queries[0].get("limit"), Some("5"));
    Ok(())
}

#[tokio::test]
async fn head_fetches_but_writes_no_body() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::HEAD, "/test/foo", "").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "application/json");
    assert!(text(res).await?.is_empty());

    let res = send(&app(&m), Method::HEAD, "/test", "").await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(m.calls(), [Call::Get("foo".into()), Call::List]);
    Ok(())
}

#[tokio::test]
async fn head_failure_is_500() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::failing());
    let res = send(&app(&m), Method::HEAD, "/test/foo", "").await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // the dispatcher itself still carries the message
    let resource = Resource::new(Arc::clone(&m), &mut Recorder::default());
    let res = resource.serve(&Method::HEAD, Some("foo"), &QueryParams::new(), b"").await;
    assert_eq!(text(res).await?, "test error\n");
    Ok(())
}

#[tokio::test]
async fn post_without_any_id_creates() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::POST, "/test", r#"{"name":"n"}"#).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "application/json");
    assert_eq!(text(res).await?, r#"{"id":"new","name":"n"}"#);
    assert_eq!(m.calls(), [Call::Create(None)]);
    Ok(())
}

#[tokio::test]
async fn post_with_embedded_id_updates() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::POST, "/test", r#"{"id":"bar","name":"n"}"#).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(m.calls(), [Call::Update("bar".into(), Some("bar".into()))]);
    Ok(())
}

#[tokio::test]
async fn path_id_wins_over_embedded_id() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    for method in [Method::POST, Method::PUT] {
        let res = send(&app(&m), method, "/test/foo", r#"{"id":"bar","name":"n"}"#).await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(text(res).await?, r#"{"id":"foo","name":"n"}"#);
    }
    assert_eq!(
        m.calls(),
        [
            Call::Update("foo".into(), Some("bar".into())),
            Call::Update("foo".into(), Some("bar".into())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn put_without_any_id_creates() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::PUT, "/test", r#"{"name":"n"}"#).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(m.calls(), [Call::Create(None)]);
    Ok(())
}

#[tokio::test]
async fn decode_failure_is_400_and_skips_the_manager() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::rejecting("bad body"));
    for (method, uri) in [(Method::POST, "/test"), (Method::PUT, "/test/foo")] {
        let res = send(&app(&m), method, uri, "{}").await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&res), "text/plain; charset=utf-8");
        assert_eq!(text(res).await?, "bad body\n");
    }
    assert!(m.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn save_failure_is_500() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::failing());
    let res = send(&app(&m), Method::POST, "/test", r#"{"name":"n"}"#).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text(res).await?, "test error\n");

    let res = send(&app(&m), Method::PUT, "/test/foo", r#"{"name":"n"}"#).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text(res).await?, "test error\n");
    Ok(())
}

#[tokio::test]
async fn delete_requires_an_id() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::DELETE, "/test", "").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text(res).await?, "Invalid Id\n");
    assert!(m.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_with_id_is_204() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let res = send(&app(&m), Method::DELETE, "/test/foo", "").await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(text(res).await?.is_empty());
    assert_eq!(m.calls(), [Call::Delete("foo".into())]);
    Ok(())
}

#[tokio::test]
async fn delete_failure_is_500() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::failing());
    let res = send(&app(&m), Method::DELETE, "/test/foo", "").await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text(res).await?, "test error\n");
    Ok(())
}

#[tokio::test]
async fn patch_and_unknown_verbs_are_501() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let verbs = [Method::PATCH, Method::OPTIONS, Method::from_bytes(b"FROB")?];
    for method in verbs {
        for uri in ["/test", "/test/1"] {
            let res = send(&app(&m), method.clone(), uri, "").await?;
            assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
            assert_eq!(text(res).await?, "Method Not Supported\n");
        }
    }
    assert!(m.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn junk_verbs_share_one_metric_series() -> anyhow::Result<()> {
    let m = Arc::new(FakeManager::new());
    let app = app(&m);
    for i in 0..50 {
        let verb = Method::from_bytes(format!("JUNK{i}").as_bytes())?;
        let res = send(&app, verb, "/test", "").await?;
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    }

    let methods: BTreeSet<String> = prometheus::gather()
        .iter()
        .filter(|family| family.get_name() == "resource_requests_total")
        .flat_map(|family| family.get_metric().iter())
        .flat_map(|metric| metric.get_label().iter())
        .filter(|label| label.get_name() == "method")
        .map(|label| label.get_value().to_string())
        .collect();
    assert!(methods.contains("OTHER"));
    assert!(!methods.iter().any(|m| m.starts_with("JUNK")));
    Ok(())
}
