// handlers/chat.rs - /api/chat handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{parse_id, ApiJson};
use crate::database::models::{Conversation, ConversationView, Message, PublicAccount};
use crate::database::Store;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentAccount;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub recipient_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub conversation_id: Uuid,
    pub text: Option<String>,
}

/// Expand participants to public accounts. Deleted accounts are left out.
async fn expand(store: &dyn Store, conversations: Vec<Conversation>) -> ApiResult<Vec<ConversationView>> {
    let mut ids: Vec<Uuid> = conversations.iter().flat_map(|c| c.participants).collect();
    ids.sort();
    ids.dedup();

    let accounts: HashMap<Uuid, PublicAccount> = store
        .find_accounts(&ids)
        .await?
        .iter()
        .map(|a| (a.id, PublicAccount::from(a)))
        .collect();

    Ok(conversations
        .into_iter()
        .map(|c| ConversationView {
            id: c.id,
            participants: c
                .participants
                .iter()
                .filter_map(|id| accounts.get(id).cloned())
                .collect(),
            created_at: c.created_at,
        })
        .collect())
}

/// POST /api/chat
///
/// Get-or-create the conversation between the caller and the recipient.
pub async fn start_conversation(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    ApiJson(body): ApiJson<StartConversationRequest>,
) -> ApiResult<(StatusCode, Json<ConversationView>)> {
    if body.recipient_id == caller.id {
        return Err(ApiError::bad_request("You cannot start a conversation with yourself"));
    }
    if state.store.find_account(body.recipient_id).await?.is_none() {
        return Err(ApiError::not_found("Recipient not found"));
    }

    let (conversation, created) = state
        .store
        .get_or_create_conversation(caller.id, body.recipient_id)
        .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    let mut views = expand(state.store.as_ref(), vec![conversation]).await?;
    let view = views
        .pop()
        .ok_or_else(|| ApiError::internal_server_error("Conversation could not be loaded"))?;
    Ok((status, Json(view)))
}

/// GET /api/chat
pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
) -> ApiResult<Json<Vec<ConversationView>>> {
    let conversations = state.store.conversations_for(caller.id).await?;
    Ok(Json(expand(state.store.as_ref(), conversations).await?))
}

/// GET /api/chat/:conversationId
///
/// Any authenticated caller can read a conversation's messages.
pub async fn messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let conversation_id = parse_id(&conversation_id, "Conversation")?;
    Ok(Json(state.store.messages_in(conversation_id).await?))
}

/// POST /api/chat/message
pub async fn post_message(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    ApiJson(body): ApiJson<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let text = body.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }

    if state.store.find_conversation(body.conversation_id).await?.is_none() {
        return Err(ApiError::not_found("Conversation not found"));
    }

    let message = state
        .store
        .insert_message(body.conversation_id, caller.id, &text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
