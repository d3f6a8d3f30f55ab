pub mod auth;
pub mod gate;

pub use auth::{authenticate, CurrentAccount};
pub use gate::{enforce, secured, Gate, JobOwnership, Policy, ResourceLookup};
