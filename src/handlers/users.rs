// handlers/users.rs - /api/users handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{parse_id, required, validate_email_format, ApiJson};
use crate::auth::{check_password, hash_password};
use crate::database::models::{
    Account, AccountPatch, AccountSummary, AccountWithFavorites, NewAccount, PublicAccount, Role,
};
use crate::database::Store;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentAccount;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Body returned by register and login
#[derive(Debug, Serialize)]
pub struct SessionResponse<U> {
    pub message: &'static str,
    pub user: U,
    pub token: String,
}

fn password_field(value: Option<String>, field: &str) -> ApiResult<String> {
    match value {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

/// Expand the account's favorite ids into full jobs.
pub(crate) async fn with_favorites(store: &dyn Store, account: &Account) -> ApiResult<AccountWithFavorites> {
    let jobs = store.find_jobs(&account.favorites).await?;
    Ok(AccountWithFavorites::new(account, jobs))
}

/// POST /api/users/register
///
/// Creates a `job_seeker` or `employer` account and signs the caller in.
/// Admin accounts cannot be self-registered.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse<AccountSummary>>)> {
    let name = required(body.name, "name")?;
    let email = required(body.email, "email")?;
    let password = password_field(body.password, "password")?;
    validate_email_format(&email)?;

    let role = body.role.unwrap_or_default();
    if role == Role::Admin {
        warn!("Rejected self-registration as admin for {}", email);
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    if state.store.find_account_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let password_hash = hash_password(&password, state.config.security.bcrypt_cost).await?;
    // A concurrent registration can still win the race; the store reports it as Duplicate
    let account = state
        .store
        .insert_account(NewAccount {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    let token = state.tokens.issue(account.id, account.role)?;
    info!("Registered account {} ({})", account.id, account.role);

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "Registration successful",
            user: AccountSummary::from(&account),
            token,
        }),
    ))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse<PublicAccount>>> {
    let email = required(body.email, "email")?;
    let password = password_field(body.password, "password")?;

    // Unknown email and wrong password are indistinguishable to the caller
    let found = state.store.find_account_by_email(&email).await?;
    let verified = match &found {
        Some(account) => check_password(&password, &account.password_hash).await?,
        None => false,
    };
    let account = match found {
        Some(account) if verified => account,
        _ => {
            warn!("Failed login for {}", email);
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    let token = state.tokens.issue(account.id, account.role)?;
    Ok(Json(SessionResponse {
        message: "Login successful",
        user: PublicAccount::from(&account),
        token,
    }))
}

/// POST /api/users/forgot-password
///
/// Resets the password for an email without proving control of it.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let email = required(body.email, "email")?;
    let new_password = password_field(body.new_password, "newPassword")?;

    let account = state
        .store
        .find_account_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("No account found with this email"))?;

    let password_hash = hash_password(&new_password, state.config.security.bcrypt_cost).await?;
    state.store.set_password_hash(account.id, &password_hash).await?;

    warn!("Password reset without identity proof for account {}", account.id);
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// POST /api/users/change-password/:id
pub async fn change_password(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "User")?;
    if id != caller.id {
        warn!("Account {} tried to change the password of {}", caller.id, id);
        return Err(ApiError::forbidden("You can only change your own password"));
    }

    let current = password_field(body.current_password, "currentPassword")?;
    let new_password = password_field(body.new_password, "newPassword")?;

    if !check_password(&current, &caller.password_hash).await? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&new_password, state.config.security.bcrypt_cost).await?;
    if !state.store.set_password_hash(caller.id, &password_hash).await? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// GET /api/users/me
pub async fn me(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
) -> ApiResult<Json<AccountWithFavorites>> {
    Ok(Json(with_favorites(state.store.as_ref(), &caller).await?))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicAccount>>> {
    let accounts = state.store.list_accounts().await?;
    Ok(Json(accounts.iter().map(PublicAccount::from).collect()))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicAccount>> {
    let id = parse_id(&id, "User")?;
    let account = state
        .store
        .find_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(PublicAccount::from(&account)))
}

/// PUT /api/users/:id
///
/// Blank fields are left unchanged. Only admins may change a role.
pub async fn update_user(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<AccountSummary>> {
    let id = parse_id(&id, "User")?;

    if body.role.is_some() && !caller.is_admin() {
        warn!("Account {} tried to change a role", caller.id);
        return Err(ApiError::forbidden("Only admins can change user roles"));
    }

    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let patch = AccountPatch {
        name: non_blank(body.name),
        email: non_blank(body.email),
        role: body.role,
    };
    if let Some(email) = &patch.email {
        validate_email_format(email)?;
    }

    let account = state
        .store
        .update_account(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(AccountSummary::from(&account)))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "User")?;

    if id == caller.id {
        return Err(ApiError::forbidden("Admins cannot delete their own account"));
    }

    if !state.store.delete_account(id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!("Account {} deleted by {}", id, caller.id);
    Ok(Json(json!({ "message": "User deleted" })))
}

/// POST /api/users/favorites/:jobId
///
/// Adds the job to the caller's favorites, or removes it if already there.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    Path(job_id): Path<String>,
) -> ApiResult<Json<AccountWithFavorites>> {
    let job_id = parse_id(&job_id, "Job")?;

    if state.store.find_job(job_id).await?.is_none() {
        return Err(ApiError::not_found("Job not found"));
    }

    let outcome = state.store.toggle_favorite(caller.id, job_id).await?;
    tracing::debug!("Favorite {} for account {}: {:?}", job_id, caller.id, outcome);

    let account = state
        .store
        .find_account(caller.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(with_favorites(state.store.as_ref(), &account).await?))
}
