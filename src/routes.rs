//! Route table. Every route declares its policy here and nowhere else.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::database::models::Role;
use crate::handlers::{chat, jobs, reviews, service, uploads, users};
use crate::middleware::{secured, JobOwnership, Policy, ResourceLookup};
use crate::realtime::ws::ws_handler;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let upload_dir = state.config.upload.dir.clone();

    Router::new()
        // Public
        .route("/", get(service::root))
        .route("/health", get(service::health))
        .route("/ws", get(ws_handler))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        // API
        .nest("/api", api_routes(&state))
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes(state))
        .nest("/jobs", job_routes(state))
        .nest("/chat", chat_routes(state))
        .nest("/reviews", review_routes(state))
        .route(
            "/uploads",
            secured(state, Policy::authenticated(), post(uploads::upload_image)),
        )
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let token = Policy::authenticated;
    let admin = || Policy::authenticated().role(Role::Admin);

    Router::new()
        .route("/register", secured(state, Policy::public(), post(users::register)))
        .route("/login", secured(state, Policy::public(), post(users::login)))
        .route(
            "/forgot-password",
            secured(state, Policy::public(), post(users::forgot_password)),
        )
        .route(
            "/change-password/:id",
            secured(state, token(), post(users::change_password)),
        )
        .route("/me", secured(state, token(), get(users::me)))
        .route("/", secured(state, admin(), get(users::list_users)))
        .route(
            "/:id",
            secured(state, admin(), get(users::get_user))
                .merge(secured(
                    state,
                    token().self_or_admin("id"),
                    put(users::update_user),
                ))
                .merge(secured(state, admin(), delete(users::delete_user))),
        )
        .route(
            "/favorites/:jobId",
            secured(state, token(), post(users::toggle_favorite)),
        )
}

fn job_routes(state: &AppState) -> Router<AppState> {
    let owner: Arc<dyn ResourceLookup> = Arc::new(JobOwnership);
    let owner_or_admin = || Policy::authenticated().owner_or_admin(owner.clone(), "id");

    Router::new()
        .route(
            "/",
            secured(state, Policy::public(), get(jobs::list_jobs)).merge(secured(
                state,
                Policy::authenticated().role(Role::Employer),
                post(jobs::create_job),
            )),
        )
        .route(
            "/:id",
            secured(state, Policy::public(), get(jobs::get_job))
                .merge(secured(state, owner_or_admin(), put(jobs::update_job)))
                .merge(secured(state, owner_or_admin(), delete(jobs::delete_job))),
        )
        .route(
            "/:id/apply",
            secured(state, Policy::authenticated(), post(jobs::apply)),
        )
        .route(
            "/:id/applicants",
            secured(state, owner_or_admin(), get(jobs::applicants)),
        )
}

fn chat_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            secured(state, Policy::authenticated(), post(chat::start_conversation))
                .merge(secured(state, Policy::authenticated(), get(chat::list_conversations))),
        )
        .route(
            "/message",
            secured(state, Policy::authenticated(), post(chat::post_message)),
        )
        .route(
            "/:conversationId",
            secured(state, Policy::authenticated(), get(chat::messages)),
        )
}

fn review_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            secured(state, Policy::authenticated(), post(reviews::create_review)),
        )
        .route(
            "/:userId",
            secured(state, Policy::authenticated(), get(reviews::reviews_for_user)),
        )
}
