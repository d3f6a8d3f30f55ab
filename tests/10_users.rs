mod common;

use anyhow::Result;
use common::{TestServer, PASSWORD};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_hides_password_and_login_succeeds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .post(
            "/api/users/register",
            None,
            json!({"name": "Ada", "email": "ada@example.com", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "job_seeker");
    assert!(body["token"].is_string());

    let raw = body.to_string();
    assert!(!raw.contains("password"));
    assert!(!raw.contains(PASSWORD));

    let (status, body) = server
        .post(
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(!body.to_string().contains("password"));
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_401_not_404() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("Ada", "ada@example.com", "job_seeker").await?;

    let (status, wrong_password) = server
        .post(
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": "nope"}),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = server
        .post(
            "/api/users/login",
            None,
            json!({"email": "nobody@example.com", "password": "nope"}),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
    Ok(())
}

#[tokio::test]
async fn registration_rules() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("Ada", "ada@example.com", "employer").await?;

    let (status, body) = server
        .post(
            "/api/users/register",
            None,
            json!({"name": "Other", "email": "ada@example.com", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already exists");

    let (status, _) = server
        .post(
            "/api/users/register",
            None,
            json!({"name": "Root", "email": "root@example.com", "password": PASSWORD, "role": "admin"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .post(
            "/api/users/register",
            None,
            json!({"name": "Bad", "email": "not-an-email", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/api/users/register", None, json!({"email": "x@example.com"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.get("/api/users/me", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = server.get("/api/users/me", Some("garbage.token.here")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_only_listing() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seeker = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let admin = server.seed_admin("root@example.com").await?;

    let (status, _) = server.get("/api/users", Some(&seeker.token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.get("/api/users", Some(&admin.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert!(!body.to_string().contains("password"));

    let (status, body) = server
        .get(&format!("/api/users/{}", seeker.id), Some(&admin.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");

    let (status, _) = server
        .get(
            "/api/users/00000000-0000-0000-0000-000000000000",
            Some(&admin.token),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn update_is_self_or_admin_and_roles_are_admin_only() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let bob = server.register("Bob", "bob@example.com", "job_seeker").await?;
    let admin = server.seed_admin("root@example.com").await?;
    let ada_path = format!("/api/users/{}", ada.id);

    let (status, body) = server
        .put(&ada_path, Some(&ada.token), json!({"name": "Ada L."}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada L.");
    assert_eq!(body["email"], "ada@example.com");

    let (status, _) = server
        .put(&ada_path, Some(&bob.token), json!({"name": "Hijacked"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .put(&ada_path, Some(&ada.token), json!({"role": "admin"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .put(&ada_path, Some(&ada.token), json!({"email": "bob@example.com"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .put(&ada_path, Some(&admin.token), json!({"role": "employer"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "employer");

    // The role is re-read from the store, so Ada's old token now passes the employer gate
    let (status, _) = server
        .post(
            "/api/jobs",
            Some(&ada.token),
            json!({"title": "T", "description": "D", "company": "C", "location": "L", "skills": []}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn change_password_requires_own_id_and_current_password() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let bob = server.register("Bob", "bob@example.com", "job_seeker").await?;

    let (status, _) = server
        .post(
            &format!("/api/users/change-password/{}", bob.id),
            Some(&ada.token),
            json!({"currentPassword": PASSWORD, "newPassword": "new-secret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let own = format!("/api/users/change-password/{}", ada.id);
    let (status, _) = server
        .post(
            &own,
            Some(&ada.token),
            json!({"currentPassword": "wrong", "newPassword": "new-secret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .post(
            &own,
            Some(&ada.token),
            json!({"currentPassword": PASSWORD, "newPassword": "new-secret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .post(
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": "new-secret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forgot_password_resets_by_email() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("Ada", "ada@example.com", "job_seeker").await?;

    let (status, _) = server
        .post(
            "/api/users/forgot-password",
            None,
            json!({"email": "nobody@example.com", "newPassword": "reset"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post(
            "/api/users/forgot-password",
            None,
            json!({"email": "ada@example.com", "newPassword": "reset"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .post(
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": "reset"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn favorites_toggle_and_expand() -> Result<()> {
    let server = TestServer::spawn().await?;
    let employer = server.register("Acme", "hr@acme.com", "employer").await?;
    let seeker = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let job_id = server.create_job(&employer, "Rust engineer").await?;
    let path = format!("/api/users/favorites/{}", job_id);

    let (status, body) = server.post(&path, Some(&seeker.token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorites"][0]["id"], job_id.as_str());
    assert_eq!(body["favorites"][0]["title"], "Rust engineer");

    let (_, me) = server.get("/api/users/me", Some(&seeker.token)).await?;
    assert_eq!(me["favorites"].as_array().map(Vec::len), Some(1));

    let (status, body) = server.post(&path, Some(&seeker.token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorites"].as_array().map(Vec::len), Some(0));

    let (status, _) = server
        .post(
            "/api/users/favorites/00000000-0000-0000-0000-000000000000",
            Some(&seeker.token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
