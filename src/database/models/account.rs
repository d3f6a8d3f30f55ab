use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::job::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    JobSeeker,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "job_seeker",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job_seeker" => Ok(Role::JobSeeker),
            "employer" => Ok(Role::Employer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored account. Not serializable: responses go through the public views
/// below so the password hash can never leak.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Minimal identity returned from registration, updates and applicant lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Account as seen by other users and admins (password omitted)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for PublicAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            favorites: account.favorites.clone(),
            created_at: account.created_at,
        }
    }
}

/// Own account with favorite jobs expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWithFavorites {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub favorites: Vec<Job>,
    pub created_at: DateTime<Utc>,
}

impl AccountWithFavorites {
    /// Expand favorites in the account's own order, skipping jobs that no longer exist.
    pub fn new(account: &Account, jobs: Vec<Job>) -> Self {
        let favorites = account
            .favorites
            .iter()
            .filter_map(|id| jobs.iter().find(|job| job.id == *id).cloned())
            .collect();

        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            favorites,
            created_at: account.created_at,
        }
    }
}

/// Result of an atomic favorite toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_value(Role::JobSeeker).unwrap(), "job_seeker");
        assert_eq!("employer".parse::<Role>().unwrap(), Role::Employer);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::JobSeeker);
    }

    #[test]
    fn public_view_has_no_password() {
        let account = Account {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$04$secret".into(),
            role: Role::Employer,
            favorites: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(PublicAccount::from(&account)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("$2b$04$secret"));
    }
}
