#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use jobboard_api::auth::hash_password;
use jobboard_api::config::AppConfig;
use jobboard_api::database::models::{NewAccount, Role};
use jobboard_api::database::DatabaseManager;
use jobboard_api::AppState;

pub const PASSWORD: &str = "correct-horse";
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024;
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// In-process server over a fresh in-memory store, one per test
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub upload_dir: TempDir,
}

/// Account created through the API (or seeded) plus its token
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub email: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let upload_dir = tempfile::tempdir().context("failed to create upload dir")?;
        let dir = upload_dir.path().to_string_lossy().to_string();
        let max_upload = MAX_UPLOAD_BYTES.to_string();
        let max_request = MAX_REQUEST_BYTES.to_string();

        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration-test-secret".to_string()),
            "DATABASE_URL" => Some("memory://".to_string()),
            "SECURITY_BCRYPT_COST" => Some("4".to_string()),
            "UPLOAD_DIR" => Some(dir.clone()),
            "UPLOAD_MAX_FILE_SIZE_BYTES" => Some(max_upload.clone()),
            "API_MAX_REQUEST_SIZE_BYTES" => Some(max_request.clone()),
            _ => None,
        })?;

        let store = DatabaseManager::connect(&config.database).await?;
        let state = AppState::new(store, config);
        let app = jobboard_api::app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            state,
            upload_dir,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a JSON request and return the status with the parsed body
    /// (`Value::Null` when the body is not JSON).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        Ok((status, serde_json::from_str(&text).unwrap_or(Value::Null)))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, token, None).await
    }

    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<Session> {
        let (status, body) = self
            .post(
                "/api/users/register",
                None,
                json!({"name": name, "email": email, "password": PASSWORD, "role": role}),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        Ok(Session {
            id: body["user"]["id"].as_str().context("missing user id")?.to_string(),
            token: body["token"].as_str().context("missing token")?.to_string(),
            email: email.to_string(),
        })
    }

    /// Admins cannot self-register, so seed one directly as the CLI does.
    pub async fn seed_admin(&self, email: &str) -> Result<Session> {
        let password_hash = hash_password(PASSWORD, 4).await?;
        let account = self
            .state
            .store
            .insert_account(NewAccount {
                name: "Admin".to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Admin,
            })
            .await?;
        let token = self.state.tokens.issue(account.id, account.role)?;

        Ok(Session {
            id: account.id.to_string(),
            token,
            email: email.to_string(),
        })
    }

    pub async fn create_job(&self, employer: &Session, title: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/jobs",
                Some(&employer.token),
                json!({
                    "title": title,
                    "description": "Build and run services",
                    "company": "Acme",
                    "location": "Remote",
                    "salary": 120000,
                    "skills": ["rust", "postgres"],
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create job failed: {} {}", status, body);
        Ok(body["id"].as_str().context("missing job id")?.to_string())
    }
}
