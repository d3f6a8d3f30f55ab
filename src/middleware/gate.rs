//! Per-route authorization policies.
//!
//! A [`Policy`] is an ordered list of [`Gate`]s evaluated left to right. The
//! first failing gate decides the response and nothing after it runs.
//! Evaluation is a plain async function; [`enforce`] adapts it to axum.

use async_trait::async_trait;
use axum::{
    extract::{RawPathParams, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::auth::{authenticate, CurrentAccount};
use crate::database::models::{Account, Role};
use crate::database::Store;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the owning account of a resource addressed by a route parameter.
#[async_trait]
pub trait ResourceLookup: Send + Sync + 'static {
    /// Resource name used in not-found messages
    fn resource(&self) -> &'static str;

    async fn owner_of(&self, store: &dyn Store, id: Uuid) -> Result<Option<Uuid>, ApiError>;
}

/// Jobs are owned by the employer who posted them.
pub struct JobOwnership;

#[async_trait]
impl ResourceLookup for JobOwnership {
    fn resource(&self) -> &'static str {
        "Job"
    }

    async fn owner_of(&self, store: &dyn Store, id: Uuid) -> Result<Option<Uuid>, ApiError> {
        Ok(store.find_job(id).await?.map(|job| job.employer))
    }
}

#[derive(Clone)]
pub enum Gate {
    Authenticate,
    RequireRole(Role),
    RequireSelfOrAdmin {
        param: &'static str,
    },
    RequireOwnerOrAdmin {
        lookup: Arc<dyn ResourceLookup>,
        param: &'static str,
    },
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Authenticate => f.write_str("authenticate"),
            Gate::RequireRole(role) => write!(f, "role({})", role),
            Gate::RequireSelfOrAdmin { param } => write!(f, "self-or-admin(:{})", param),
            Gate::RequireOwnerOrAdmin { lookup, param } => {
                write!(f, "owner-or-admin({}:{})", lookup.resource(), param)
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct Policy {
    gates: Vec<Gate>,
}

impl Policy {
    /// No gates
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self::public().then(Gate::Authenticate)
    }

    pub fn then(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn role(self, role: Role) -> Self {
        self.then(Gate::RequireRole(role))
    }

    pub fn self_or_admin(self, param: &'static str) -> Self {
        self.then(Gate::RequireSelfOrAdmin { param })
    }

    pub fn owner_or_admin(self, lookup: Arc<dyn ResourceLookup>, param: &'static str) -> Self {
        self.then(Gate::RequireOwnerOrAdmin { lookup, param })
    }

    pub fn is_public(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Run every gate in order. Returns the authenticated account, if any gate
    /// authenticated the caller.
    pub async fn evaluate(
        &self,
        state: &AppState,
        headers: &HeaderMap,
        params: &HashMap<String, String>,
    ) -> Result<Option<Account>, ApiError> {
        let mut caller: Option<Account> = None;

        for gate in &self.gates {
            match gate {
                Gate::Authenticate => {
                    caller = Some(authenticate(state, headers).await?);
                }
                Gate::RequireRole(role) => {
                    let account = identity(&caller)?;
                    if account.role != *role {
                        warn!("Account {} ({}) denied: requires role {}", account.id, account.role, role);
                        return Err(ApiError::forbidden("Access denied"));
                    }
                }
                Gate::RequireSelfOrAdmin { param } => {
                    let account = identity(&caller)?;
                    let target: Uuid = path_param(params, param)?
                        .parse()
                        .map_err(|_| ApiError::not_found("User not found"))?;
                    if !account.is_admin() && account.id != target {
                        warn!("Account {} denied access to account {}", account.id, target);
                        return Err(ApiError::forbidden("Access denied"));
                    }
                }
                Gate::RequireOwnerOrAdmin { lookup, param } => {
                    let account = identity(&caller)?;
                    let not_found = || ApiError::not_found(format!("{} not found", lookup.resource()));

                    // An id that does not parse cannot name an existing resource
                    let id: Uuid = path_param(params, param)?.parse().map_err(|_| not_found())?;
                    let owner = lookup
                        .owner_of(state.store.as_ref(), id)
                        .await?
                        .ok_or_else(not_found)?;

                    if !account.is_admin() && owner != account.id {
                        warn!("Account {} denied: not the owner of {} {}", account.id, lookup.resource(), id);
                        return Err(ApiError::forbidden(format!(
                            "You do not have permission to modify this {}",
                            lookup.resource().to_lowercase()
                        )));
                    }
                }
            }
        }

        Ok(caller)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gates.is_empty() {
            return f.write_str("public");
        }
        let names: Vec<String> = self.gates.iter().map(|g| format!("{:?}", g)).collect();
        f.write_str(&names.join(" -> "))
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Policy({})", self)
    }
}

fn identity(caller: &Option<Account>) -> Result<&Account, ApiError> {
    caller
        .as_ref()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

fn path_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiError> {
    params.get(name).map(String::as_str).ok_or_else(|| {
        tracing::error!("Route is missing path parameter :{}", name);
        ApiError::internal_server_error("An error occurred while processing your request")
    })
}

/// Middleware state: the application state plus the route's policy
#[derive(Clone)]
pub struct PolicyGuard {
    state: AppState,
    policy: Arc<Policy>,
}

/// Evaluate the route's policy; on success attach the caller and run the handler.
pub async fn enforce(
    State(guard): State<PolicyGuard>,
    params: Option<RawPathParams>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let params: HashMap<String, String> = params
        .map(|raw| raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        .unwrap_or_default();

    let caller = guard
        .policy
        .evaluate(&guard.state, request.headers(), &params)
        .await?;

    if let Some(account) = caller {
        request.extensions_mut().insert(CurrentAccount(account));
    }

    Ok(next.run(request).await)
}

/// Attach `policy` to every method of `route`. Public policies add no layer.
pub fn secured(state: &AppState, policy: Policy, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    if policy.is_public() {
        return route;
    }

    let guard = PolicyGuard {
        state: state.clone(),
        policy: Arc::new(policy),
    };
    route.route_layer(middleware::from_fn_with_state(guard, enforce))
}
