//! End-to-end dispatch through the facade, using the in-memory client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use heron::dispatch::{RenderError, TemplateRenderer, BAD_API_VERSION, NO_API_AT_PATH};
use heron::prelude::*;
use heron::telemetry::{MetricsCollector, MetricsSink};
use heron_test::{TestAuth, TestClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const ALICE: &str = "alice-token";
const ADMIN: &str = "admin-token";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Search {
    title: String,
    #[serde(default)]
    limit: u32,
    tag: Option<String>,
}

impl InputShape for Search {}

#[derive(Deserialize)]
struct Mine {
    #[serde(skip)]
    user: Id,
}

impl InputShape for Mine {
    fn describe(slots: &mut SlotMap<Self>) {
        slots.user_id(|s| &mut s.user);
    }
}

#[derive(Deserialize)]
struct Visitor {
    #[serde(skip)]
    user: Id,
}

impl InputShape for Visitor {
    fn describe(slots: &mut SlotMap<Self>) {
        slots.anonymous_user_id(|s| &mut s.user);
    }
}

#[derive(Deserialize)]
struct Moderate {
    #[serde(skip)]
    admin: Id,
}

impl InputShape for Moderate {
    fn describe(slots: &mut SlotMap<Self>) {
        slots.admin_id(|s| &mut s.admin);
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct NewPost {
    title: String,
}

#[derive(Deserialize)]
struct EditPost {
    #[serde(skip)]
    id: Id,
    #[serde(skip)]
    post: Option<NewPost>,
    #[serde(skip)]
    conf: i64,
    #[serde(skip)]
    request: Option<Arc<ApiRequest>>,
}

impl InputShape for EditPost {
    fn describe(slots: &mut SlotMap<Self>) {
        slots
            .resource_id(|s| &mut s.id)
            .content(|s| &mut s.post)
            .config_version(|s| &mut s.conf)
            .raw_request(|s| &mut s.request);
    }
}

#[derive(Deserialize)]
struct ShowPost {
    #[serde(skip)]
    id: Id,
}

impl InputShape for ShowPost {
    fn describe(slots: &mut SlotMap<Self>) {
        slots.resource_id(|s| &mut s.id);
    }
}

#[derive(Deserialize)]
struct Dashboard {
    #[serde(default)]
    guest: bool,
}

impl InputShape for Dashboard {}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Counts handler invocations so tests can prove a handler never ran.
#[derive(Default)]
struct Calls(AtomicUsize);

impl Calls {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Template renderer that counts renders.
struct CountingTemplates {
    inner: MinijinjaRenderer,
    renders: Arc<AtomicUsize>,
}

impl TemplateRenderer for CountingTemplates {
    fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.inner.render(name, data)
    }
}

struct Fixture {
    client: TestClient,
    calls: Arc<Calls>,
    renders: Arc<AtomicUsize>,
    metrics: Arc<MetricsCollector>,
    auth: TestAuth,
}

fn registry(calls: &Arc<Calls>) -> ApiRegistry {
    let mut registry = ApiRegistry::new();

    registry
        .register(
            ApiDescriptor::build(
                HandlerSet::json("/versions")
                    .on("GET", Handler::data(|_: DummyInput| async { HandlerResult::Ok("GET v1") }))
                    .on("GET2", Handler::data(|_: DummyInput| async { HandlerResult::Ok("GET v2") }))
                    .on("GET7", Handler::data(|_: DummyInput| async { HandlerResult::Ok("GET v7") }))
                    .on("POST", Handler::data(|_: DummyInput| async { HandlerResult::Ok("POST v1") }))
                    .on("PUT3", Handler::data(|_: DummyInput| async { HandlerResult::Ok("PUT v3") })),
            )
            .unwrap(),
        )
        .unwrap();

    registry
        .register(
            ApiDescriptor::build(HandlerSet::json("/search").on(
                "GET",
                Handler::data(|input: Search| async move {
                    HandlerResult::Ok(json!({"title": input.title, "limit": input.limit, "tag": input.tag}))
                }),
            ))
            .unwrap(),
        )
        .unwrap();

    let mine_calls = Arc::clone(calls);
    registry
        .register(
            ApiDescriptor::build(HandlerSet::json("/mine").on(
                "GET",
                Handler::data(move |input: Mine| {
                    mine_calls.hit();
                    async move { HandlerResult::Ok(json!({"user": input.user})) }
                }),
            ))
            .unwrap(),
        )
        .unwrap();

    registry
        .register(
            ApiDescriptor::build(HandlerSet::json("/feed").on(
                "GET",
                Handler::data(|input: Visitor| async move { HandlerResult::Ok(json!({"user": input.user})) }),
            ))
            .unwrap(),
        )
        .unwrap();

    let moderation_calls = Arc::clone(calls);
    registry
        .register(
            ApiDescriptor::build(HandlerSet::json("/moderation").on(
                "POST",
                Handler::data(move |input: Moderate| {
                    moderation_calls.hit();
                    async move { HandlerResult::Ok(json!({"admin": input.admin})) }
                }),
            ))
            .unwrap(),
        )
        .unwrap();

    let edit_calls = Arc::clone(calls);
    registry
        .register(
            ApiDescriptor::build(
                HandlerSet::json("/posts/{id}")
                    .on(
                        "PUT",
                        Handler::data(move |input: EditPost| {
                            edit_calls.hit();
                            async move {
                                let post = input
                                    .post
                                    .ok_or_else(|| ApiError::bad_request("missing post"))?;
                                let path = input
                                    .request
                                    .map(|r| r.path().to_string())
                                    .unwrap_or_default();
                                HandlerResult::Ok(json!({
                                    "id": input.id,
                                    "title": post.title,
                                    "conf": input.conf,
                                    "path": path,
                                }))
                            }
                        }),
                    )
                    .on(
                        "DELETE",
                        Handler::empty(|input: ShowPost| async move {
                            if input.id == 13 {
                                return Err(ApiError::bad_request("X").into());
                            }
                            HandlerResult::Ok(())
                        }),
                    )
                    .on(
                        "GET",
                        Handler::data(|input: ShowPost| async move {
                            if input.id == 500 {
                                return Err(HandlerError::from(anyhow::anyhow!("db down: secret")));
                            }
                            HandlerResult::Ok(json!({"id": input.id}))
                        }),
                    ),
            )
            .unwrap(),
        )
        .unwrap();

    registry
        .register(
            ApiDescriptor::build(
                HandlerSet::document("/dashboard")
                    .with_template("dashboard.html")
                    .on(
                        "HTML",
                        Handler::page(|input: Dashboard| async move {
                            if input.guest {
                                return Err(ApiError::redirect("/login").into());
                            }
                            HandlerResult::Ok(Page::with_default_template(json!({"name": "Alice"})))
                        }),
                    ),
            )
            .unwrap(),
        )
        .unwrap();

    registry
}

fn fixture() -> Fixture {
    let calls = Arc::new(Calls::default());
    let renders = Arc::new(AtomicUsize::new(0));
    let metrics = Arc::new(MetricsCollector::new("heron_e2e"));

    let auth = TestAuth::new();
    auth.issue(ALICE, Identity::new(7, Role::APP_USER))
        .issue(ADMIN, Identity::new(1, Role::WEB_ADMIN));

    let mut templates = MinijinjaRenderer::new();
    templates
        .add_template("dashboard.html", "<h1>Hello {{ name }}</h1>")
        .unwrap();

    let dispatcher = Dispatcher::builder(registry(&calls))
        .authenticator(auth.authenticator())
        .templates(Arc::new(CountingTemplates {
            inner: templates,
            renders: Arc::clone(&renders),
        }))
        .metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>)
        .build();

    Fixture {
        client: TestClient::new(dispatcher),
        calls,
        renders,
        metrics,
        auth,
    }
}

// ---------------------------------------------------------------------------
// Version selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_each_bound_key_reaches_its_handler() {
    let fx = fixture();
    let cases = [
        ("GET", None, "GET v1"),
        ("GET", Some(1), "GET v1"),
        ("GET", Some(2), "GET v2"),
        ("GET", Some(7), "GET v7"),
        ("POST", None, "POST v1"),
        ("PUT", Some(3), "PUT v3"),
    ];

    for (method, version, expected) in cases {
        let mut request = fx
            .client
            .request(method.parse().unwrap(), "/versions");
        if let Some(version) = version {
            request = request.version(version);
        }
        request.send().await.assert_json_eq(&json!(expected));
    }
}

#[tokio::test]
async fn test_unbound_keys_are_bad_api_version() {
    let fx = fixture();
    let cases = [("GET", 3), ("POST", 2), ("PUT", 1), ("DELETE", 1), ("PATCH", 1)];

    for (method, version) in cases {
        fx.client
            .request(method.parse().unwrap(), "/versions")
            .version(version)
            .send()
            .await
            .assert_error(40400, BAD_API_VERSION);
    }
}

#[tokio::test]
async fn test_out_of_range_version_falls_back_to_v1() {
    let fx = fixture();
    for raw in ["0", "100", "abc", "1"] {
        fx.client
            .get("/versions")
            .header("X-Api-Version", raw)
            .send()
            .await
            .assert_json_eq(&json!("GET v1"));
    }
}

#[tokio::test]
async fn test_unknown_path() {
    let fx = fixture();
    fx.client
        .get("/nowhere")
        .send()
        .await
        .assert_error(40400, NO_API_AT_PATH);
}

// ---------------------------------------------------------------------------
// Query decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_query_fields_round_trip_and_unknown_keys_ignored() {
    let fx = fixture();
    fx.client
        .get("/search?title=hello%20world&limit=5&tag=rust&unknown=1&other=x")
        .send()
        .await
        .assert_json_eq(&json!({"title": "hello world", "limit": 5, "tag": "rust"}));
}

#[tokio::test]
async fn test_query_decode_failure_is_bad_request() {
    let fx = fixture();
    let response = fx.client.get("/search?title=a&limit=many").send().await;
    response.assert_errcode(40000);
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_unauthorized_and_handler_not_invoked() {
    let fx = fixture();
    let response = fx.client.get("/mine").send().await;

    response.assert_error(
        40100,
        "either remove the user id slot from your input, or allow anonymous access",
    );
    assert_eq!(fx.calls.get(), 0);
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let fx = fixture();
    fx.auth.revoke(ALICE);
    fx.client
        .get("/mine")
        .token(ALICE)
        .send()
        .await
        .assert_errcode(40100);
    assert_eq!(fx.calls.get(), 0);
}

#[tokio::test]
async fn test_valid_token_fills_user_id() {
    let fx = fixture();
    fx.client
        .get("/mine")
        .token(ALICE)
        .send()
        .await
        .assert_json_eq(&json!({"user": 7}));
    assert_eq!(fx.calls.get(), 1);
}

#[tokio::test]
async fn test_anonymous_caller_gets_sentinel_id() {
    let fx = fixture();
    fx.client
        .get("/feed")
        .send()
        .await
        .assert_json_eq(&json!({"user": ANONYMOUS_ID}));

    fx.client
        .get("/feed")
        .token(ALICE)
        .send()
        .await
        .assert_json_eq(&json!({"user": 7}));
}

#[tokio::test]
async fn test_admin_slot_requires_web_admin() {
    let fx = fixture();
    fx.client
        .post("/moderation")
        .token(ALICE)
        .send()
        .await
        .assert_error(
            40100,
            "admin role required, you could remove the admin id slot from your input",
        );
    assert_eq!(fx.calls.get(), 0);

    fx.client
        .post("/moderation")
        .token(ADMIN)
        .send()
        .await
        .assert_json_eq(&json!({"admin": 1}));
    assert_eq!(fx.calls.get(), 1);
}

#[tokio::test]
async fn test_admin_slot_without_token_is_unauthorized_and_handler_not_invoked() {
    let fx = fixture();
    fx.client
        .post("/moderation")
        .send()
        .await
        .assert_error(
            40100,
            "admin role required, you could remove the admin id slot from your input",
        );

    fx.client
        .post("/moderation")
        .token("never-issued")
        .send()
        .await
        .assert_errcode(40100);

    assert_eq!(fx.calls.get(), 0);
    assert_eq!(fx.auth.store().lookups(), 0);
}

// ---------------------------------------------------------------------------
// Resource id and content
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bad_resource_id_is_not_found_before_invocation() {
    let fx = fixture();
    for raw in ["0", "abc"] {
        fx.client
            .put(format!("/posts/{raw}"))
            .json(&json!({"title": "t"}))
            .send()
            .await
            .assert_error(
                40400,
                &format!(
                    "ResourceId ('{raw}' in url) required, you could remove the resource id slot from your input"
                ),
            );
    }
    assert_eq!(fx.calls.get(), 0);
}

#[tokio::test]
async fn test_malformed_content_is_bad_request_before_invocation() {
    let fx = fixture();
    fx.client
        .put("/posts/3")
        .body("{not json")
        .send()
        .await
        .assert_errcode(40000);

    fx.client
        .put("/posts/3")
        .send()
        .await
        .assert_errcode(40000);

    assert_eq!(fx.calls.get(), 0);
}

#[tokio::test]
async fn test_all_slots_filled_together() {
    let fx = fixture();
    fx.client
        .put("/posts/42")
        .config_version(9)
        .json(&NewPost {
            title: "Hello".to_string(),
        })
        .send()
        .await
        .assert_json_eq(&json!({
            "id": 42,
            "title": "Hello",
            "conf": 9,
            "path": "/posts/42",
        }));
    assert_eq!(fx.calls.get(), 1);
}

#[tokio::test]
async fn test_missing_config_version_is_zero() {
    let fx = fixture();
    fx.client
        .put("/posts/42")
        .json(&json!({"title": "t"}))
        .send()
        .await
        .assert_json_field("conf", &json!(0));
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_data_and_empty_replies() {
    let fx = fixture();
    fx.client
        .get("/posts/5")
        .send()
        .await
        .assert_json_eq(&json!({"id": 5}))
        .assert_content_type("application/json");

    fx.client.delete("/posts/5").send().await.assert_body_eq("{}");
}

#[tokio::test]
async fn test_business_error_envelope() {
    let fx = fixture();
    fx.client
        .delete("/posts/13")
        .send()
        .await
        .assert_body_eq(r#"{"errcode":40000,"msg":"X"}"#);
}

#[tokio::test]
async fn test_unexpected_error_is_generic_internal() {
    let fx = fixture();
    fx.client
        .get("/posts/500")
        .send()
        .await
        .assert_error(50000, "Internal error");
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_document_renders_default_template() {
    let fx = fixture();
    fx.client
        .get("/dashboard")
        .send()
        .await
        .assert_content_type("text/html")
        .assert_body_eq("<h1>Hello Alice</h1>");
    assert_eq!(fx.renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_document_redirect_skips_template() {
    let fx = fixture();
    fx.client
        .get("/dashboard?guest=true")
        .send()
        .await
        .assert_redirect("/login");
    assert_eq!(fx.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_document_only_answers_get_v1() {
    let fx = fixture();
    fx.client
        .get("/dashboard")
        .version(2)
        .send()
        .await
        .assert_error(40400, BAD_API_VERSION);
    fx.client
        .post("/dashboard")
        .send()
        .await
        .assert_error(40400, BAD_API_VERSION);
    assert_eq!(fx.renders.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_first_requests_share_one_counter() {
    let fx = fixture();
    let before = fx.metrics.counter_count();
    assert_eq!(fx.metrics.count("GET_posts_{id}"), None);

    let first = fx.client.clone();
    let second = fx.client.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.get("/posts/77").send().await }),
        tokio::spawn(async move { second.get("/posts/77").send().await }),
    );
    a.unwrap().assert_json_eq(&json!({"id": 77}));
    b.unwrap().assert_json_eq(&json!({"id": 77}));

    assert_eq!(fx.metrics.count("GET_posts_{id}"), Some(2));
    assert_eq!(fx.metrics.counter_count(), before + 1);
    assert_eq!(fx.metrics.count("all"), Some(2));
}

#[tokio::test]
async fn test_rejected_requests_are_counted() {
    let fx = fixture();
    fx.client.get("/mine").send().await;
    fx.client.get("/nowhere?x=1").send().await;

    assert_eq!(fx.metrics.count("GET_mine"), Some(1));
    assert_eq!(fx.metrics.count("unmatched"), Some(1));
    assert_eq!(fx.metrics.count("GET_nowhere"), None);
    assert_eq!(fx.metrics.count("all"), Some(2));
}
