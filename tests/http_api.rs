//! End-to-end tests for the HTTP endpoints.
//!
//! Every test gets a fresh temp directory holding the user database and
//! public assets, and a scripted model in place of the LLM API.
//!
//! Run with: `cargo test --test http_api`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use futures::{stream, StreamExt};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use sulama_asistani::agent::prompts::OUT_OF_SCOPE_REPLY;
use sulama_asistani::inference::{ChatModel, CompletionRequest, DeltaStream, InferenceError};
use sulama_asistani::server::{
    build_router,
    handlers::chat::{INCOMPLETE_WARNING, UNAVAILABLE_REPLY},
    state::AppState,
};
use sulama_asistani::storage::users::UserStore;
use sulama_asistani::types::config::ServerConfig;
use sulama_asistani::types::user::User;

// ── test infrastructure ──

const ADMIN_KEY: &str = "test-admin-key";
const SEED_EMAIL: &str = "deneme@deneme.com";

/// How the scripted model answers a streaming request
enum Reply {
    Chunks(Vec<&'static str>),
    RefuseToStart,
    FailFirst,
    FailAfter(Vec<&'static str>),
}

struct Scripted {
    label: &'static str,
    reply: Reply,
}

#[async_trait]
impl ChatModel for Scripted {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, InferenceError> {
        Ok(self.label.to_string())
    }

    async fn stream(&self, _request: CompletionRequest) -> Result<DeltaStream, InferenceError> {
        let ok = |chunks: &[&'static str]| -> Vec<Result<String, InferenceError>> {
            chunks.iter().map(|c| Ok(c.to_string())).collect()
        };
        let items = match &self.reply {
            Reply::Chunks(chunks) => ok(chunks.as_slice()),
            Reply::RefuseToStart => {
                return Err(InferenceError::Api {
                    status: 503,
                    body: "overloaded".into(),
                })
            }
            Reply::FailFirst => vec![Err(InferenceError::EmptyResponse)],
            Reply::FailAfter(chunks) => {
                let mut items = ok(chunks.as_slice());
                items.push(Err(InferenceError::Malformed("cut off".into())));
                items
            }
        };
        Ok(stream::iter(items).boxed())
    }
}

struct Harness {
    dir: TempDir,
    app: Router,
}

impl Harness {
    fn new(label: &'static str, reply: Reply) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let public = dir.path().join("public");
        std::fs::create_dir_all(&public).expect("create public dir");
        std::fs::write(public.join("index.html"), "<h1>Sulama</h1>").expect("write index");

        let config = ServerConfig {
            data_dir: dir.path().join("data"),
            users_file: dir.path().join("users.json"),
            public_dir: public,
            admin_key: ADMIN_KEY.to_string(),
            ..ServerConfig::default()
        };
        let state = AppState::new(config, Arc::new(Scripted { label, reply }));
        Self {
            dir,
            app: build_router(state),
        }
    }

    fn irrigation(chunks: Vec<&'static str>) -> Self {
        Self::new("IRRIGATION", Reply::Chunks(chunks))
    }

    /// A second handle on the same user file
    fn store(&self) -> UserStore {
        UserStore::open(self.dir.path().join("users.json"))
    }

    fn user(&self, email: &str) -> User {
        self.store().find(email).unwrap().expect("user exists")
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn post(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(post_json(uri, body)).await
    }

    async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Wait for the background bookkeeping of a streamed chat to land
    async fn wait_for_memory(&self, email: &str, len: usize) -> User {
        for _ in 0..200 {
            let user = self.user(email);
            if user.memory.len() >= len {
                return user;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("memory of {email} never reached {len} entries");
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/admin/update-user")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-admin-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn chat_body(message: &str, email: &str) -> Value {
    json!({"message": message, "user": {"email": email}})
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn remaining_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("x-remaining")
        .map(|v| v.to_str().unwrap().to_string())
}

// ── accounts ──

#[tokio::test]
async fn test_register_then_duplicate() {
    let h = Harness::irrigation(vec![]);

    let res = h
        .post("/register", json!({"email": "ali@ornek.com", "password": "gizli"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"success": true, "email": "ali@ornek.com", "limit": 20, "used": 0, "remaining": 20})
    );

    let res = h
        .post("/register", json!({"email": "ali@ornek.com", "password": "baska"}))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["error"], "Bu e-posta ile kullanıcı zaten var.");
}

#[tokio::test]
async fn test_register_requires_fields() {
    let h = Harness::irrigation(vec![]);
    let res = h.post("/register", json!({"email": "ali@ornek.com"})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "email ve password zorunlu.");
}

#[tokio::test]
async fn test_login() {
    let h = Harness::irrigation(vec![]);

    let res = h
        .post("/login", json!({"email": SEED_EMAIL, "password": "1234"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["limit"], 50);
    assert_eq!(body["remaining"], 50);

    let res = h
        .post("/login", json!({"email": SEED_EMAIL, "password": "yanlis"}))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = h
        .post("/login", json!({"email": "yok@ornek.com", "password": "1234"}))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_accepts_form_body() {
    let h = Harness::irrigation(vec![]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=deneme%40deneme.com&password=1234"))
        .unwrap();
    let res = h.send(request).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["email"], SEED_EMAIL);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let h = Harness::irrigation(vec![]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = h.send(request).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purchase_packages() {
    let h = Harness::irrigation(vec![]);

    let res = h
        .post("/purchase", json!({"email": SEED_EMAIL, "packageType": "pro"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["limit"], 250);
    assert_eq!(body["remaining"], 250);

    let res = h
        .post("/purchase", json!({"email": SEED_EMAIL, "packageType": "altin"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "Geçersiz paket tipi.");
    assert_eq!(h.user(SEED_EMAIL).limit, 250);

    let res = h
        .post("/purchase", json!({"email": "yok@ornek.com", "packageType": "mini"}))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = h.post("/purchase", json!({"email": SEED_EMAIL})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_keeps_hand_edited_records() {
    let h = Harness::irrigation(vec![]);
    let raw = r#"[{"email":"eski@musteri.com","password":1234,"limit":"30","used":2.0,
        "memory":"yok","notlar":"elle eklendi"}]"#;
    std::fs::write(h.dir.path().join("users.json"), raw).unwrap();

    let res = h
        .post("/login", json!({"email": "eski@musteri.com", "password": "1234"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["remaining"], 28);

    let res = h
        .post("/register", json!({"email": "yeni@musteri.com", "password": "p"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let text = std::fs::read_to_string(h.dir.path().join("users.json")).unwrap();
    let records: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(records[0]["notlar"], "elle eklendi");
    assert_eq!(records[0]["limit"], "30");
}

// ── chat ──

#[tokio::test]
async fn test_chat_streams_reply_and_records_memory() {
    let h = Harness::irrigation(vec!["Damla ", "sulama ", "öneririm."]);

    let res = h
        .post("/chat", chat_body("Domates için ne önerirsin?", SEED_EMAIL))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(remaining_header(&res).as_deref(), Some("49"));
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_text(res).await, "Damla sulama öneririm.");

    let user = h.wait_for_memory(SEED_EMAIL, 2).await;
    assert_eq!(user.used, 1);
    assert_eq!(user.memory[0].content, "Domates için ne önerirsin?");
    assert_eq!(user.memory[1].content, "Damla sulama öneririm.");
    assert!(user.projects.is_empty());
}

#[tokio::test]
async fn test_chat_out_of_scope_keeps_quota() {
    let h = Harness::new("NON_IRRIGATION", Reply::Chunks(vec!["unused"]));

    let res = h
        .post("/chat", chat_body("Bana bir şiir yaz", SEED_EMAIL))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(remaining_header(&res).as_deref(), Some("50"));
    assert_eq!(body_text(res).await, OUT_OF_SCOPE_REPLY);

    let user = h.user(SEED_EMAIL);
    assert_eq!(user.used, 0);
    assert!(user.memory.is_empty());
}

#[tokio::test]
async fn test_chat_requires_user() {
    let h = Harness::irrigation(vec![]);

    let res = h.post("/chat", json!({"message": "merhaba"})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "Kullanıcı bilgisi eksik.");

    let res = h
        .post("/chat", chat_body("merhaba", "yok@ornek.com"))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["error"], "Kullanıcı bulunamadı.");
}

#[tokio::test]
async fn test_chat_rejects_exhausted_quota() {
    let h = Harness::irrigation(vec!["cevap"]);
    h.store()
        .update(SEED_EMAIL, |u| u.used = u.limit)
        .unwrap();

    let res = h.post("/chat", chat_body("Vana önerisi?", SEED_EMAIL)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(res).await["error"],
        "Soru hakkınız doldu. Paket satın almanız gerekiyor."
    );
    assert_eq!(h.user(SEED_EMAIL).used, 50);
}

#[tokio::test]
async fn test_chat_model_unavailable() {
    for reply in [Reply::RefuseToStart, Reply::FailFirst] {
        let h = Harness::new("IRRIGATION", reply);

        let res = h.post("/chat", chat_body("Damla sulama?", SEED_EMAIL)).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(res).await, UNAVAILABLE_REPLY);

        // the question was already counted
        let user = h.user(SEED_EMAIL);
        assert_eq!(user.used, 1);
        assert!(user.memory.is_empty());
    }
}

#[tokio::test]
async fn test_chat_interrupted_stream_warns_without_recording() {
    let h = Harness::new("IRRIGATION", Reply::FailAfter(vec!["Yarım ", "cevap"]));

    let res = h.post("/chat", chat_body("Sprink?", SEED_EMAIL)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let text = body_text(res).await;
    assert_eq!(text, format!("Yarım cevap{INCOMPLETE_WARNING}"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let user = h.user(SEED_EMAIL);
    assert_eq!(user.used, 1);
    assert!(user.memory.is_empty());
}

#[tokio::test]
async fn test_design_chat_saves_project() {
    let h = Harness::irrigation(vec!["Tasarım: 3 zon, ", "TM2 4 istasyon."]);

    let res = h
        .post(
            "/chat",
            json!({
                "message": "tasarla",
                "user": {"email": SEED_EMAIL},
                "mode": "design",
                "designData": {"title": "Villa Bahçesi", "alan": 300}
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "Tasarım: 3 zon, TM2 4 istasyon.");

    let user = h.wait_for_memory(SEED_EMAIL, 2).await;
    assert!(user.memory[0].content.starts_with("ÖZEL TASARIM TALEBİ:"));
    assert_eq!(user.projects.len(), 1);

    let res = h.get(&format!("/projects?email={SEED_EMAIL}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let list = body_json(res).await;
    let summary = &list["projects"][0];
    assert_eq!(summary["title"], "Villa Bahçesi");
    assert_eq!(summary["type"], "design");
    assert!(summary.get("content").is_none());

    let id = summary["id"].as_str().unwrap().to_string();
    let res = h.get(&format!("/projects/{id}?email={SEED_EMAIL}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let project = body_json(res).await;
    assert_eq!(project["project"]["content"], "Tasarım: 3 zon, TM2 4 istasyon.");
    assert_eq!(project["project"]["rawDesignData"]["alan"], 300);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chats_each_spend_one_question() {
    let h = Harness::irrigation(vec!["Tamam."]);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let app = h.app.clone();
            tokio::spawn(async move {
                let request = post_json("/chat", chat_body(&format!("Soru {i}"), SEED_EMAIL));
                let res = app.oneshot(request).await.unwrap();
                assert_eq!(res.status(), StatusCode::OK);
                body_text(res).await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), "Tamam.");
    }

    let user = h.wait_for_memory(SEED_EMAIL, 16).await;
    assert_eq!(user.used, 8);
    assert_eq!(user.memory.len(), 16);
}

// ── projects ──

#[tokio::test]
async fn test_projects_errors() {
    let h = Harness::irrigation(vec![]);

    let res = h.get("/projects").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "email parametresi zorunlu.");

    let res = h.get("/projects?email=yok@ornek.com").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = h.get(&format!("/projects?email={SEED_EMAIL}")).await;
    assert_eq!(body_json(res).await, json!({"projects": []}));

    let res = h.get("/projects/123").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "email parametresi ve id zorunludur.");

    let res = h.get(&format!("/projects/123?email={SEED_EMAIL}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["error"], "Proje bulunamadı.");
}

// ── export ──

#[tokio::test]
async fn test_export_pdf() {
    let h = Harness::irrigation(vec![]);

    let res = h
        .post(
            "/export-pdf",
            json!({
                "email": SEED_EMAIL,
                "title": "Bahçe/Projesi: 1",
                "content": "Birinci paragraf.\n\nİkinci paragraf, damla sulama."
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Bahçe_Projesi_ 1.pdf\""
    );
    let bytes = body_bytes(res).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_pdf_errors() {
    let h = Harness::irrigation(vec![]);

    let res = h
        .post("/export-pdf", json!({"email": SEED_EMAIL, "title": "T"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "email, title ve content zorunlu.");

    let res = h
        .post(
            "/export-pdf",
            json!({"email": "yok@ornek.com", "title": "T", "content": "C"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── admin ──

#[tokio::test]
async fn test_admin_requires_key() {
    let h = Harness::irrigation(vec![]);

    for key in [None, Some(""), Some("yanlis")] {
        let res = h.send(admin_request(key, json!({"email": SEED_EMAIL}))).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(res).await["error"], "Geçersiz admin anahtarı.");
    }
}

#[tokio::test]
async fn test_admin_update_user() {
    let h = Harness::irrigation(vec![]);
    h.store()
        .update(SEED_EMAIL, |u| {
            u.used = 7;
            u.memory.push(sulama_asistani::types::message::Message::user("eski"));
        })
        .unwrap();

    let res = h
        .send(admin_request(
            Some(ADMIN_KEY),
            json!({"email": SEED_EMAIL, "limit": 100, "resetUsed": true, "resetMemory": true}),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"success": true, "email": SEED_EMAIL, "limit": 100, "used": 0, "remaining": 100})
    );
    assert!(h.user(SEED_EMAIL).memory.is_empty());

    // a non-numeric limit is ignored
    let res = h
        .send(admin_request(Some(ADMIN_KEY), json!({"email": SEED_EMAIL, "limit": "5"})))
        .await;
    assert_eq!(body_json(res).await["limit"], 100);

    let res = h.send(admin_request(Some(ADMIN_KEY), json!({}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = h
        .send(admin_request(Some(ADMIN_KEY), json!({"email": "yok@ornek.com"})))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── static assets ──

#[tokio::test]
async fn test_static_fallback() {
    let h = Harness::irrigation(vec![]);
    let res = h.get("/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "<h1>Sulama</h1>");

    let res = h.get("/yok.html").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
