pub mod account;
pub mod conversation;
pub mod job;
pub mod review;

pub use account::{
    Account, AccountPatch, AccountSummary, AccountWithFavorites, FavoriteToggle, NewAccount,
    PublicAccount, Role,
};
pub use conversation::{Conversation, ConversationView, Message};
pub use job::{Applicant, ApplicantView, ApplyOutcome, EmployerRef, Job, JobPatch, JobView, NewJob};
pub use review::{NewReview, Review, ReviewView, ReviewerRef, MAX_RATING, MIN_RATING};
