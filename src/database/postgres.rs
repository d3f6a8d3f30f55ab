use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::{
    Account, AccountPatch, Applicant, ApplyOutcome, Conversation, FavoriteToggle, Job, JobPatch,
    Message, NewAccount, NewJob, NewReview, Review, Role,
};
use super::{Store, StoreError, StoreResult};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Idempotent schema bootstrap, run once at startup.
///
/// Array-valued document fields (applicants, favorites) live in keyed side
/// tables so that "add if absent" is a single `ON CONFLICT DO NOTHING` insert.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY,
        seq BIGSERIAL,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('job_seeker', 'employer', 'admin')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY,
        seq BIGSERIAL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        company TEXT NOT NULL,
        location TEXT NOT NULL,
        salary DOUBLE PRECISION,
        skills TEXT[] NOT NULL DEFAULT '{}',
        employer_id UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS job_applicants (
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        seq BIGSERIAL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (job_id, account_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS account_favorites (
        account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        seq BIGSERIAL,
        PRIMARY KEY (account_id, job_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS conversations (
        id UUID PRIMARY KEY,
        seq BIGSERIAL,
        participant_a UUID NOT NULL,
        participant_b UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (participant_a, participant_b),
        CHECK (participant_a <= participant_b)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        seq BIGSERIAL,
        conversation_id UUID NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        sender_id UUID NOT NULL,
        text TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS reviews (
        id UUID PRIMARY KEY,
        seq BIGSERIAL,
        job_id UUID NOT NULL,
        reviewer_id UUID NOT NULL,
        reviewee_id UUID NOT NULL,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comment TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (reviewer_id <> reviewee_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS messages_conversation_idx ON messages (conversation_id, seq)",
    "CREATE INDEX IF NOT EXISTS reviews_reviewee_idx ON reviews (reviewee_id)",
];

const ACCOUNT_SELECT: &str = r#"
    SELECT a.id, a.name, a.email, a.password_hash, a.role, a.created_at,
        ARRAY(SELECT f.job_id FROM account_favorites f WHERE f.account_id = a.id ORDER BY f.seq) AS favorites
    FROM accounts a
"#;

const JOB_SELECT: &str = r#"
    SELECT j.id, j.title, j.description, j.company, j.location, j.salary, j.skills,
        j.employer_id, j.created_at,
        ARRAY(SELECT ja.account_id FROM job_applicants ja WHERE ja.job_id = j.id ORDER BY ja.seq) AS applicant_ids,
        ARRAY(SELECT ja.applied_at FROM job_applicants ja WHERE ja.job_id = j.id ORDER BY ja.seq) AS applicant_times
    FROM jobs j
"#;

const CONVERSATION_COLUMNS: &str = "id, participant_a, participant_b, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, text, created_at";
const REVIEW_COLUMNS: &str = "id, job_id, reviewer_id, reviewee_id, rating, comment, created_at";

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    favorites: Vec<Uuid>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(StoreError::Corrupt)?;
        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            favorites: row.favorites,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    title: String,
    description: String,
    company: String,
    location: String,
    salary: Option<f64>,
    skills: Vec<String>,
    employer_id: Uuid,
    created_at: DateTime<Utc>,
    applicant_ids: Vec<Uuid>,
    applicant_times: Vec<DateTime<Utc>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let applicants = row
            .applicant_ids
            .into_iter()
            .zip(row.applicant_times)
            .map(|(user, applied_at)| Applicant { user, applied_at })
            .collect();

        Job {
            id: row.id,
            title: row.title,
            description: row.description,
            company: row.company,
            location: row.location,
            salary: row.salary,
            skills: row.skills,
            employer: row.employer_id,
            created_at: row.created_at,
            applicants,
        }
    }
}

#[derive(FromRow)]
struct ConversationRow {
    id: Uuid,
    participant_a: Uuid,
    participant_b: Uuid,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            participants: [row.participant_a, row.participant_b],
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender: row.sender_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    job_id: Uuid,
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            job: row.job_id,
            reviewer: row.reviewer_id,
            reviewee: row.reviewee_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|c| c == code)
        .unwrap_or(false)
}

/// Map a unique violation to `Duplicate(message)`, anything else passes through.
fn unique_as(message: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        if has_code(&err, UNIQUE_VIOLATION) {
            StoreError::Duplicate(message.to_string())
        } else {
            StoreError::Sqlx(err)
        }
    }
}

fn foreign_key_as(message: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        if has_code(&err, FOREIGN_KEY_VIOLATION) {
            StoreError::NotFound(message.to_string())
        } else {
            StoreError::Sqlx(err)
        }
    }
}

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready ({} statements)", SCHEMA.len());
        Ok(())
    }

    async fn account_where(&self, clause: &str, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE {clause}");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn job_by_id(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let sql = format!("{JOB_SELECT} WHERE j.id = $1");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Job::from))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO accounts (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(unique_as("Email already exists"))?;

        self.account_where("a.id = $1", id)
            .await?
            .ok_or_else(|| StoreError::NotFound("Account vanished after insert".into()))
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.account_where("a.id = $1", id).await
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE a.email = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("{ACCOUNT_SELECT} WHERE a.id = ANY($1) ORDER BY a.seq");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let sql = format!("{ACCOUNT_SELECT} ORDER BY a.seq");
        sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Option<Account>> {
        let updated = sqlx::query(
            r#"UPDATE accounts
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   role = COALESCE($4, role)
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(unique_as("Email already exists"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.account_where("a.id = $1", id).await
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn toggle_favorite(&self, account_id: Uuid, job_id: Uuid) -> StoreResult<FavoriteToggle> {
        // Remove-if-present or add-if-absent in a single statement
        let added = sqlx::query_scalar::<_, bool>(
            r#"WITH removed AS (
                   DELETE FROM account_favorites
                   WHERE account_id = $1 AND job_id = $2
                   RETURNING job_id
               ), inserted AS (
                   INSERT INTO account_favorites (account_id, job_id)
                   SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)
                   ON CONFLICT DO NOTHING
                   RETURNING job_id
               )
               SELECT EXISTS (SELECT 1 FROM inserted)"#,
        )
        .bind(account_id)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(foreign_key_as("Job not found"))?;

        Ok(if added {
            FavoriteToggle::Added
        } else {
            FavoriteToggle::Removed
        })
    }

    async fn insert_job(&self, employer: Uuid, new: NewJob) -> StoreResult<Job> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO jobs (id, title, description, company, location, salary, skills, employer_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.company)
        .bind(&new.location)
        .bind(new.salary)
        .bind(&new.skills)
        .bind(employer)
        .execute(&self.pool)
        .await?;

        self.job_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("Job vanished after insert".into()))
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        self.job_by_id(id).await
    }

    async fn find_jobs(&self, ids: &[Uuid]) -> StoreResult<Vec<Job>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("{JOB_SELECT} WHERE j.id = ANY($1)");
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let sql = format!("{JOB_SELECT} ORDER BY j.created_at DESC, j.seq DESC");
        let rows = sqlx::query_as::<_, JobRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>> {
        let updated = sqlx::query(
            r#"UPDATE jobs
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   company = COALESCE($4, company),
                   location = COALESCE($5, location),
                   salary = COALESCE($6, salary),
                   skills = COALESCE($7, skills)
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.company)
        .bind(patch.location)
        .bind(patch.salary)
        .bind(patch.skills)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.job_by_id(id).await
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_applicant(&self, job_id: Uuid, account_id: Uuid) -> StoreResult<ApplyOutcome> {
        // Ownership never changes after creation, so checking it first is race-free
        let employer = sqlx::query_scalar::<_, Uuid>("SELECT employer_id FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        match employer {
            None => return Ok(ApplyOutcome::JobMissing),
            Some(owner) if owner == account_id => return Ok(ApplyOutcome::OwnJob),
            Some(_) => {}
        }

        let result = sqlx::query(
            "INSERT INTO job_applicants (job_id, account_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(job_id)
        .bind(account_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(ApplyOutcome::Added),
            Ok(_) => Ok(ApplyOutcome::AlreadyApplied),
            // Job deleted between the ownership read and the insert
            Err(err) if has_code(&err, FOREIGN_KEY_VIOLATION) => Ok(ApplyOutcome::JobMissing),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<(Conversation, bool)> {
        let [first, second] = Conversation::pair_key(a, b);

        let sql = format!(
            "INSERT INTO conversations (id, participant_a, participant_b) VALUES ($1, $2, $3) \
             ON CONFLICT (participant_a, participant_b) DO NOTHING RETURNING {CONVERSATION_COLUMNS}"
        );
        let created = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(first)
            .bind(second)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = created {
            return Ok((row.into(), true));
        }

        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE participant_a = $1 AND participant_b = $2"
        );
        let existing = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(first)
            .bind(second)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing.into(), false))
    }

    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let row = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Conversation::from))
    }

    async fn conversations_for(&self, account_id: Uuid) -> StoreResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE participant_a = $1 OR participant_b = $1 ORDER BY seq"
        );
        let rows = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn insert_message(&self, conversation_id: Uuid, sender: Uuid, text: &str) -> StoreResult<Message> {
        let sql = format!(
            "INSERT INTO messages (id, conversation_id, sender_id, text) VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(sender)
            .bind(text)
            .fetch_one(&self.pool)
            .await
            .map_err(foreign_key_as("Conversation not found"))?;
        Ok(row.into())
    }

    async fn messages_in(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY seq");
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (id, job_id, reviewer_id, reviewee_id, rating, comment) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.job)
            .bind(new.reviewer)
            .bind(new.reviewee)
            .bind(new.rating)
            .bind(new.comment)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn reviews_for(&self, reviewee: Uuid) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE reviewee_id = $1 ORDER BY seq");
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(reviewee)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }
}
