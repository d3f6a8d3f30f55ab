mod common;

use anyhow::Result;
use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn get_or_create_is_idempotent_for_the_pair() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let bob = server.register("Bob", "bob@acme.com", "employer").await?;

    let (status, first) = server
        .post("/api/chat", Some(&ada.token), json!({"recipientId": bob.id}))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["participants"].as_array().map(Vec::len), Some(2));
    assert!(!first.to_string().contains("password"));

    // Same pair from the other side
    let (status, second) = server
        .post("/api/chat", Some(&bob.token), json!({"recipientId": ada.id}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);

    let (status, list) = server.get("/api/chat", Some(&ada.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn conversation_recipient_rules() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;

    let (status, _) = server
        .post("/api/chat", Some(&ada.token), json!({"recipientId": ada.id}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/api/chat",
            Some(&ada.token),
            json!({"recipientId": "00000000-0000-0000-0000-000000000000"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post("/api/chat", None, json!({"recipientId": ada.id}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn messages_are_stored_in_order() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let bob = server.register("Bob", "bob@acme.com", "employer").await?;

    let (_, conversation) = server
        .post("/api/chat", Some(&ada.token), json!({"recipientId": bob.id}))
        .await?;
    let conversation_id = conversation["id"].as_str().unwrap_or_default().to_string();

    for (sender, text) in [(&ada, "hello"), (&bob, "hi there"), (&ada, "are you hiring?")] {
        let (status, body) = server
            .post(
                "/api/chat/message",
                Some(&sender.token),
                json!({"conversationId": conversation_id, "text": text}),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sender"], sender.id.as_str());
    }

    let (status, messages) = server
        .get(&format!("/api/chat/{}", conversation_id), Some(&bob.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = messages
        .as_array()
        .map(|m| m.iter().filter_map(|msg| msg["text"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(texts, ["hello", "hi there", "are you hiring?"]);
    Ok(())
}

#[tokio::test]
async fn message_validation() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ada = server.register("Ada", "ada@example.com", "job_seeker").await?;
    let bob = server.register("Bob", "bob@acme.com", "employer").await?;
    let (_, conversation) = server
        .post("/api/chat", Some(&ada.token), json!({"recipientId": bob.id}))
        .await?;

    let (status, _) = server
        .post(
            "/api/chat/message",
            Some(&ada.token),
            json!({"conversationId": conversation["id"], "text": "   "}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/api/chat/message",
            Some(&ada.token),
            json!({"conversationId": "00000000-0000-0000-0000-000000000000", "text": "hello"}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
