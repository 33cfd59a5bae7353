use std::path::Path;
use std::sync::Arc;

use classroll::auth::TokenService;
use classroll::server::{AppState, create_router};
use classroll::store::{SqliteStore, Store};
use reqwest::{Response, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A server bound to an ephemeral port on a fresh database.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    client: reqwest::Client,
    server_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("classroll.db")).expect("open store");
        store.initialize().expect("initialize store");
        let store = Arc::new(store);

        let tokens = TokenService::new(b"test-secret", chrono::Duration::minutes(30))
            .expect("token service");
        let state = Arc::new(AppState::new(store.clone(), tokens));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            store,
            client: reqwest::Client::new(),
            server_task,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_token(builder: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        Self::with_token(self.client.get(self.url(path)), token)
            .send()
            .await
            .expect("send GET")
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        Self::with_token(self.client.post(self.url(path)), token)
            .json(body)
            .send()
            .await
            .expect("send POST")
    }

    pub async fn put_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        Self::with_token(self.client.put(self.url(path)), token)
            .json(body)
            .send()
            .await
            .expect("send PUT")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        Self::with_token(self.client.delete(self.url(path)), token)
            .send()
            .await
            .expect("send DELETE")
    }

    pub async fn register(&self, username: &str, password: &str, role: &str) -> Response {
        self.post_json(
            "/api/auth/register",
            None,
            &json!({ "username": username, "password": password, "role": role }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("send login")
    }

    /// Registers `<role>1` with the given role and returns a fresh access token.
    pub async fn token_for(&self, role: &str) -> String {
        let username = format!("{role}1");
        let res = self.register(&username, "pw", role).await;
        assert_eq!(res.status(), StatusCode::OK, "register {username}");

        let res = self.login(&username, "pw").await;
        assert_eq!(res.status(), StatusCode::OK, "login {username}");

        let body: Value = res.json().await.expect("token json");
        body["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    /// Creates a student as `token` and returns its id.
    pub async fn create_student(&self, token: &str, name: &str, number: &str, class: &str) -> i64 {
        let res = self
            .post_json(
                "/api/students/",
                Some(token),
                &json!({ "name": name, "student_number": number, "class_name": class }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK, "create student {number}");

        let body: Value = res.json().await.expect("student json");
        body["id"].as_i64().expect("student id")
    }

    pub fn count_rows(&self, table: &str, student_id: i64) -> i64 {
        let conn = self.store.connection();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE student_id = ?1"),
            [student_id],
            |row| row.get(0),
        )
        .expect("count rows")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}
