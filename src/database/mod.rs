pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use models::{
    Account, AccountPatch, ApplyOutcome, Conversation, FavoriteToggle, Job, JobPatch, Message,
    NewAccount, NewJob, NewReview, Review,
};

/// Errors from the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key violation (email, conversation pair)
    #[error("{0}")]
    Duplicate(String),

    /// Stored data could not be mapped back into a model
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle used by application state
pub type SharedStore = Arc<dyn Store>;

/// Persistence seam for every resource.
///
/// Each method is a single logical store operation. Array-valued fields
/// (applicants, favorites) are only ever changed through the conditional
/// operations `add_applicant` and `toggle_favorite`, which implementations
/// must perform atomically rather than as read-modify-write.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn health_check(&self) -> StoreResult<()>;

    /// Release connections on shutdown.
    async fn close(&self) {}

    // Accounts

    /// Fails with `Duplicate` when the email is taken.
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    /// Returns `None` when the account does not exist.
    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Option<Account>>;
    /// Returns whether an account was updated.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;
    /// Returns whether an account was deleted.
    async fn delete_account(&self, id: Uuid) -> StoreResult<bool>;
    /// Remove `job_id` from favorites if present, otherwise add it.
    async fn toggle_favorite(&self, account_id: Uuid, job_id: Uuid) -> StoreResult<FavoriteToggle>;

    // Jobs

    async fn insert_job(&self, employer: Uuid, job: NewJob) -> StoreResult<Job>;
    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>>;
    async fn find_jobs(&self, ids: &[Uuid]) -> StoreResult<Vec<Job>>;
    /// Newest first.
    async fn list_jobs(&self) -> StoreResult<Vec<Job>>;
    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>>;
    async fn delete_job(&self, id: Uuid) -> StoreResult<bool>;
    /// Add `account_id` to the job's applicants unless already present or
    /// the account owns the job.
    async fn add_applicant(&self, job_id: Uuid, account_id: Uuid) -> StoreResult<ApplyOutcome>;

    // Conversations

    /// Returns the conversation for the unordered pair and whether it was created.
    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<(Conversation, bool)>;
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>>;
    async fn conversations_for(&self, account_id: Uuid) -> StoreResult<Vec<Conversation>>;
    async fn insert_message(&self, conversation_id: Uuid, sender: Uuid, text: &str) -> StoreResult<Message>;
    /// Creation order.
    async fn messages_in(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>>;

    // Reviews

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;
    async fn reviews_for(&self, reviewee: Uuid) -> StoreResult<Vec<Review>>;
}
