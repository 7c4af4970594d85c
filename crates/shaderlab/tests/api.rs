use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use shaderstore::{ShaderStore, DEFAULT_TTL};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestApp {
    base_url: String,
    root: TempDir,
    http: Client,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    async fn spawn() -> Self {
        let root = TempDir::new().unwrap();
        let static_dir = root.path().join("src");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("index.html"), "<canvas id=\"preview\"></canvas>").unwrap();

        let store = Arc::new(ShaderStore::new(
            root.path(),
            root.path().join("src/shaders"),
            DEFAULT_TTL,
        ));
        let app = shaderlab::router(store, &static_dir);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let server = tokio::spawn(shaderlab::serve(listener, app, async move {
            let _ = signal.await;
        }));

        Self {
            base_url: format!("http://{address}"),
            root,
            http: Client::new(),
            shutdown: Some(shutdown),
            server,
        }
    }

    async fn stop(mut self) -> std::io::Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.server.await.unwrap()
    }

    fn shaders(&self) -> PathBuf {
        self.root.path().join("src/shaders")
    }

    fn write_exercise(&self, chapter: &str, exercise: &str, source: &str) -> PathBuf {
        let dir = self.shaders().join(chapter).join(exercise);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("fragment.glsl"), source).unwrap();
        dir
    }

    async fn list(&self) -> (StatusCode, Value) {
        let response = self
            .http
            .get(format!("{}/api/list-shaders", self.base_url))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}/api/save-shader", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

fn exercise_count(listing: &Value, chapter: &str) -> usize {
    listing["structure"][chapter]["exercises"]
        .as_object()
        .map(|exercises| exercises.len())
        .unwrap_or(0)
}

fn is_iso_timestamp(value: &Value) -> bool {
    value
        .as_str()
        .map(|raw| raw.len() == 24 && raw.ends_with('Z') && raw.as_bytes()[10] == b'T')
        .unwrap_or(false)
}

#[tokio::test]
async fn lists_single_exercise_in_documented_shape() {
    let app = TestApp::spawn().await;
    app.write_exercise("chapter01", "exercise01", "void main() {}");

    let (status, body) = app.list().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let chapter = &body["structure"]["chapter01"];
    assert_eq!(chapter["name"], json!("chapter01"));
    assert!(is_iso_timestamp(&chapter["createdAt"]));
    let exercise = &chapter["exercises"]["exercise01"];
    assert_eq!(exercise["name"], json!("exercise01"));
    assert!(is_iso_timestamp(&exercise["createdAt"]));
    assert!(exercise.get("hasVertex").is_none());
    assert_eq!(body["structure"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn listing_creates_missing_shader_root() {
    let app = TestApp::spawn().await;

    let (status, body) = app.list().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "structure": {}}));
    assert!(app.shaders().is_dir());
}

#[tokio::test]
async fn listing_counts_exercises_and_skips_empty_chapters() {
    let app = TestApp::spawn().await;
    app.write_exercise("chapter01", "exercise01", "// a");
    app.write_exercise("chapter01", "exercise02", "// b");
    app.write_exercise("chapter02", "exercise01", "// c");
    fs::create_dir_all(app.shaders().join("chapter03/draft")).unwrap();

    let (_, body) = app.list().await;

    assert_eq!(body["structure"].as_object().unwrap().len(), 2);
    assert_eq!(exercise_count(&body, "chapter01"), 2);
    assert_eq!(exercise_count(&body, "chapter02"), 1);
    assert!(body["structure"].get("chapter03").is_none());
}

#[tokio::test]
async fn listing_is_cached_until_a_write() {
    let app = TestApp::spawn().await;
    app.write_exercise("chapter01", "exercise01", "// a");
    app.list().await;

    app.write_exercise("chapter01", "exercise02", "// written behind the server's back");
    let (_, cached) = app.list().await;
    assert_eq!(exercise_count(&cached, "chapter01"), 1);

    let (status, _) = app
        .post(json!({
            "content": "// b",
            "path": "src/shaders/chapter02/exercise01/fragment.glsl",
            "isNew": true
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, refreshed) = app.list().await;
    assert_eq!(exercise_count(&refreshed, "chapter01"), 2);
    assert_eq!(exercise_count(&refreshed, "chapter02"), 1);
}

#[tokio::test]
async fn saved_shader_is_served_back_verbatim() {
    let app = TestApp::spawn().await;
    let content = "precision mediump float;\n// ñandú ✓\nvoid main() { gl_FragColor = vec4(0.2); }\n";

    let (status, body) = app
        .post(json!({
            "content": content,
            "path": "src/shaders/chapter01/exercise01/fragment.glsl"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let on_disk =
        fs::read_to_string(app.shaders().join("chapter01/exercise01/fragment.glsl")).unwrap();
    assert_eq!(on_disk, content);

    let served = app
        .http
        .get(format!(
            "{}/src/shaders/chapter01/exercise01/fragment.glsl",
            app.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.text().await.unwrap(), content);
}

#[tokio::test]
async fn new_shader_conflict_is_rejected_without_overwriting() {
    let app = TestApp::spawn().await;
    let dir = app.write_exercise("chapter01", "exercise01", "// original");

    let (status, body) = app
        .post(json!({
            "content": "// replacement",
            "path": "src/shaders/chapter01/exercise01/fragment.glsl",
            "isNew": true
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("already exists"));
    assert_eq!(fs::read_to_string(dir.join("fragment.glsl")).unwrap(), "// original");
}

#[tokio::test]
async fn save_without_content_or_path_writes_nothing() {
    let app = TestApp::spawn().await;

    let (no_content, body) = app
        .post(json!({"path": "src/shaders/chapter01/exercise01/fragment.glsl"}))
        .await;
    assert_eq!(no_content, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (no_path, body) = app.post(json!({"content": "void main() {}"})).await;
    assert_eq!(no_path, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (empty_content, _) = app
        .post(json!({"content": "", "path": "src/shaders/chapter01/exercise01/fragment.glsl"}))
        .await;
    assert_eq!(empty_content, StatusCode::BAD_REQUEST);

    assert!(!app.shaders().join("chapter01").exists());
}

#[tokio::test]
async fn save_outside_shader_root_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(json!({"content": "alert(1)", "path": "src/index.html"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        fs::read_to_string(app.root.path().join("src/index.html")).unwrap(),
        "<canvas id=\"preview\"></canvas>"
    );
}

#[tokio::test]
async fn deleting_missing_exercise_succeeds() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(json!({"delete": true, "chapter": "chapter09", "exercise": "ghost"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn delete_requires_chapter_and_exercise() {
    let app = TestApp::spawn().await;
    let dir = app.write_exercise("chapter01", "exercise01", "// keep");

    let (status, body) = app.post(json!({"delete": true, "chapter": "chapter01"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(dir.join("fragment.glsl").exists());
}

#[tokio::test]
async fn deleting_last_exercise_removes_chapter() {
    let app = TestApp::spawn().await;
    app.write_exercise("chapter01", "exercise01", "// a");
    app.write_exercise("chapter02", "exercise01", "// b");
    app.list().await;

    let (status, _) = app
        .post(json!({"delete": true, "chapter": "chapter01", "exercise": "exercise01"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.shaders().join("chapter01").exists());
    assert!(app.shaders().join("chapter02/exercise01/fragment.glsl").exists());
    let (_, body) = app.list().await;
    assert!(body["structure"].get("chapter01").is_none());
    assert_eq!(exercise_count(&body, "chapter02"), 1);
}

#[tokio::test]
async fn deleting_one_of_several_exercises_keeps_siblings() {
    let app = TestApp::spawn().await;
    app.write_exercise("chapter01", "exercise01", "// a");
    let sibling = app.write_exercise("chapter01", "exercise02", "// b");

    let (status, _) = app
        .post(json!({"delete": true, "chapter": "chapter01", "exercise": "exercise01"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!app.shaders().join("chapter01/exercise01").exists());
    assert_eq!(fs::read_to_string(sibling.join("fragment.glsl")).unwrap(), "// b");
}

#[tokio::test]
async fn saves_fragment_and_vertex_together() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(json!({
            "chapter": "Chapter 02",
            "exercise": "Vertex Waves",
            "fragment": "// fragment",
            "vertex": "// vertex",
            "isNew": true
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "chapter": "chapter-02", "exercise": "vertex-waves"})
    );
    let dir = app.shaders().join("chapter-02/vertex-waves");
    assert_eq!(fs::read_to_string(dir.join("fragment.glsl")).unwrap(), "// fragment");
    assert_eq!(fs::read_to_string(dir.join("vertex.glsl")).unwrap(), "// vertex");

    let (_, listing) = app.list().await;
    assert_eq!(
        listing["structure"]["chapter-02"]["exercises"]["vertex-waves"]["hasVertex"],
        json!(true)
    );
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let app = TestApp::spawn().await;

    let response = app
        .http
        .post(format!("{}/api/save-shader", app.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn serves_client_bundle_with_permissive_cors() {
    let app = TestApp::spawn().await;

    let response = app
        .http
        .get(format!("{}/index.html", app.base_url))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
    assert!(response.text().await.unwrap().contains("preview"));
}

#[tokio::test]
async fn listing_failure_returns_error_envelope() {
    let app = TestApp::spawn().await;
    fs::write(app.shaders(), "not a directory").unwrap();

    let (status, body) = app.list().await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("internal server error: "));
}

#[tokio::test]
async fn shutdown_signal_stops_server() {
    let app = TestApp::spawn().await;
    let (status, _) = app.list().await;
    assert_eq!(status, StatusCode::OK);
    let base_url = app.base_url.clone();

    app.stop().await.unwrap();

    assert!(reqwest::get(format!("{base_url}/api/list-shaders"))
        .await
        .is_err());
}
