//! In-process store used by the test suite and `DATABASE_URL=memory://`.
//!
//! Every operation runs under one `RwLock` guard, so conditional updates
//! (applicants, favorites, conversation pairs) are atomic with respect to
//! concurrent requests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Account, AccountPatch, Applicant, ApplyOutcome, Conversation, FavoriteToggle, Job, JobPatch,
    Message, NewAccount, NewJob, NewReview, Review,
};
use super::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Collections {
    accounts: Vec<Account>,
    jobs: Vec<Job>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    reviews: Vec<Review>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(accounts: &[Account], email: &str, except: Option<Uuid>) -> bool {
    accounts
        .iter()
        .any(|a| a.email == email && Some(a.id) != except)
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut db = self.inner.write().await;
        if email_taken(&db.accounts, &new.email, None) {
            return Err(StoreError::Duplicate("Email already exists".into()));
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            favorites: Vec::new(),
            created_at: Utc::now(),
        };
        db.accounts.push(account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let db = self.inner.read().await;
        Ok(db.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let db = self.inner.read().await;
        Ok(db.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>> {
        let db = self.inner.read().await;
        Ok(db
            .accounts
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.inner.read().await.accounts.clone())
    }

    async fn update_account(&self, id: Uuid, patch: AccountPatch) -> StoreResult<Option<Account>> {
        let mut db = self.inner.write().await;
        if let Some(email) = &patch.email {
            if email_taken(&db.accounts, email, Some(id)) {
                return Err(StoreError::Duplicate("Email already exists".into()));
            }
        }

        let Some(account) = db.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            account.name = name;
        }
        if let Some(email) = patch.email {
            account.email = email;
        }
        if let Some(role) = patch.role {
            account.role = role;
        }
        Ok(Some(account.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        match db.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        let before = db.accounts.len();
        db.accounts.retain(|a| a.id != id);
        if db.accounts.len() == before {
            return Ok(false);
        }
        for job in db.jobs.iter_mut() {
            job.applicants.retain(|applicant| applicant.user != id);
        }
        Ok(true)
    }

    async fn toggle_favorite(&self, account_id: Uuid, job_id: Uuid) -> StoreResult<FavoriteToggle> {
        let mut db = self.inner.write().await;
        let account = db
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| StoreError::NotFound("Account not found".into()))?;

        if let Some(index) = account.favorites.iter().position(|id| *id == job_id) {
            account.favorites.remove(index);
            Ok(FavoriteToggle::Removed)
        } else {
            account.favorites.push(job_id);
            Ok(FavoriteToggle::Added)
        }
    }

    async fn insert_job(&self, employer: Uuid, new: NewJob) -> StoreResult<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            company: new.company,
            location: new.location,
            salary: new.salary,
            skills: new.skills,
            employer,
            created_at: Utc::now(),
            applicants: Vec::new(),
        };
        self.inner.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let db = self.inner.read().await;
        Ok(db.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn find_jobs(&self, ids: &[Uuid]) -> StoreResult<Vec<Job>> {
        let db = self.inner.read().await;
        Ok(db
            .jobs
            .iter()
            .filter(|j| ids.contains(&j.id))
            .cloned()
            .collect())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let db = self.inner.read().await;
        Ok(db.jobs.iter().rev().cloned().collect())
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>> {
        let mut db = self.inner.write().await;
        match db.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                patch.apply_to(job);
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        let before = db.jobs.len();
        db.jobs.retain(|j| j.id != id);
        if db.jobs.len() == before {
            return Ok(false);
        }
        for account in db.accounts.iter_mut() {
            account.favorites.retain(|fav| *fav != id);
        }
        Ok(true)
    }

    async fn add_applicant(&self, job_id: Uuid, account_id: Uuid) -> StoreResult<ApplyOutcome> {
        let mut db = self.inner.write().await;
        let Some(job) = db.jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(ApplyOutcome::JobMissing);
        };

        if job.is_owned_by(account_id) {
            return Ok(ApplyOutcome::OwnJob);
        }
        if job.applicants.iter().any(|a| a.user == account_id) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }
        job.applicants.push(Applicant {
            user: account_id,
            applied_at: Utc::now(),
        });
        Ok(ApplyOutcome::Added)
    }

    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<(Conversation, bool)> {
        let key = Conversation::pair_key(a, b);
        let mut db = self.inner.write().await;

        if let Some(existing) = db.conversations.iter().find(|c| c.participants == key) {
            return Ok((existing.clone(), false));
        }
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participants: key,
            created_at: Utc::now(),
        };
        db.conversations.push(conversation.clone());
        Ok((conversation, true))
    }

    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let db = self.inner.read().await;
        Ok(db.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn conversations_for(&self, account_id: Uuid) -> StoreResult<Vec<Conversation>> {
        let db = self.inner.read().await;
        Ok(db
            .conversations
            .iter()
            .filter(|c| c.includes(account_id))
            .cloned()
            .collect())
    }

    async fn insert_message(&self, conversation_id: Uuid, sender: Uuid, text: &str) -> StoreResult<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.inner.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_in(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        let db = self.inner.read().await;
        Ok(db
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            job: new.job,
            reviewer: new.reviewer,
            reviewee: new.reviewee,
            rating: new.rating,
            comment: new.comment,
            created_at: Utc::now(),
        };
        self.inner.write().await.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for(&self, reviewee: Uuid) -> StoreResult<Vec<Review>> {
        let db = self.inner.read().await;
        Ok(db
            .reviews
            .iter()
            .filter(|r| r.reviewee == reviewee)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use std::sync::Arc;

    fn new_account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            name: "Test".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role,
        }
    }

    fn new_job() -> NewJob {
        NewJob {
            title: "Backend".into(),
            description: "Rust services".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            salary: None,
            skills: vec!["rust".into()],
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_account(new_account("a@x.io", Role::JobSeeker)).await.unwrap();
        let err = store
            .insert_account(new_account("a@x.io", Role::Employer))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn concurrent_applies_add_exactly_one_entry() {
        let store = Arc::new(MemoryStore::new());
        let employer = store.insert_account(new_account("e@x.io", Role::Employer)).await.unwrap();
        let seeker = store.insert_account(new_account("s@x.io", Role::JobSeeker)).await.unwrap();
        let job = store.insert_job(employer.id, new_job()).await.unwrap();
        let (job_id, seeker_id) = (job.id, seeker.id);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add_applicant(job_id, seeker_id).await.unwrap() })
            })
            .collect();

        let mut added = 0;
        for handle in handles {
            if handle.await.unwrap() == ApplyOutcome::Added {
                added += 1;
            }
        }
        assert_eq!(added, 1);
        assert_eq!(store.find_job(job_id).await.unwrap().unwrap().applicants.len(), 1);
    }

    #[tokio::test]
    async fn owner_cannot_apply() {
        let store = MemoryStore::new();
        let employer = store.insert_account(new_account("e@x.io", Role::Employer)).await.unwrap();
        let job = store.insert_job(employer.id, new_job()).await.unwrap();

        assert_eq!(store.add_applicant(job.id, employer.id).await.unwrap(), ApplyOutcome::OwnJob);
        assert_eq!(
            store.add_applicant(Uuid::new_v4(), employer.id).await.unwrap(),
            ApplyOutcome::JobMissing
        );
    }

    #[tokio::test]
    async fn toggle_favorite_flips() {
        let store = MemoryStore::new();
        let account = store.insert_account(new_account("f@x.io", Role::JobSeeker)).await.unwrap();
        let job_id = Uuid::new_v4();

        assert_eq!(store.toggle_favorite(account.id, job_id).await.unwrap(), FavoriteToggle::Added);
        assert_eq!(store.toggle_favorite(account.id, job_id).await.unwrap(), FavoriteToggle::Removed);
        assert!(store.find_account(account.id).await.unwrap().unwrap().favorites.is_empty());
    }

    #[tokio::test]
    async fn conversation_pair_is_unique() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (first, created) = store.get_or_create_conversation(a, b).await.unwrap();
        assert!(created);
        let (second, created) = store.get_or_create_conversation(b, a).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn deleting_job_clears_favorites() {
        let store = MemoryStore::new();
        let employer = store.insert_account(new_account("e@x.io", Role::Employer)).await.unwrap();
        let job = store.insert_job(employer.id, new_job()).await.unwrap();
        store.toggle_favorite(employer.id, job.id).await.unwrap();

        assert!(store.delete_job(job.id).await.unwrap());
        assert!(store.find_account(employer.id).await.unwrap().unwrap().favorites.is_empty());
        assert!(!store.delete_job(job.id).await.unwrap());
    }
}
