use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::{Account, AccountSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub user: Uuid,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<f64>,
    pub skills: Vec<String>,
    pub employer: Uuid,
    pub created_at: DateTime<Utc>,
    pub applicants: Vec<Applicant>,
}

impl Job {
    pub fn is_owned_by(&self, account_id: Uuid) -> bool {
        self.employer == account_id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub salary: Option<f64>,
    pub skills: Vec<String>,
}

/// Partial update; ownership and applicants are never patchable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<f64>,
    pub skills: Option<Vec<String>>,
}

impl JobPatch {
    pub fn apply_to(self, job: &mut Job) {
        if let Some(title) = self.title {
            job.title = title;
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        if let Some(company) = self.company {
            job.company = company;
        }
        if let Some(location) = self.location {
            job.location = location;
        }
        if let Some(salary) = self.salary {
            job.salary = Some(salary);
        }
        if let Some(skills) = self.skills {
            job.skills = skills;
        }
    }
}

/// Outcome of the atomic add-if-absent applicant write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Added,
    AlreadyApplied,
    OwnJob,
    JobMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Job listing entry with the employer expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<f64>,
    pub skills: Vec<String>,
    /// `None` when the employer account has since been deleted
    pub employer: Option<EmployerRef>,
    pub created_at: DateTime<Utc>,
    pub applicants: Vec<Applicant>,
}

impl JobView {
    pub fn new(job: Job, employer: Option<&Account>) -> Self {
        Self {
            id: job.id,
            title: job.title,
            description: job.description,
            company: job.company,
            location: job.location,
            salary: job.salary,
            skills: job.skills,
            employer: employer.map(|a| EmployerRef {
                id: a.id,
                name: a.name.clone(),
                email: a.email.clone(),
            }),
            created_at: job.created_at,
            applicants: job.applicants,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub user: Option<AccountSummary>,
    pub applied_at: DateTime<Utc>,
}
