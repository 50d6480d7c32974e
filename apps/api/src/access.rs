//! Role-based access: the landing/redirect table for the staff UI and the
//! header-based guard used by the HTTP handlers.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::user::Role;

/// Header carrying the caller's role, set by the authenticating proxy.
pub const ROLE_HEADER: &str = "x-user-role";

pub const STAFF: &[Role] = &[Role::SuperAdmin, Role::Supervisor];
pub const ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

/// Destinations of the staff UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Apply,
    Home,
    Dashboard,
    Admin,
    Supervisor,
    ProcessDetail,
    CandidateDetail,
    Settings,
}

impl Route {
    pub const fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Apply => "/postular",
            Route::Home => "/",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
            Route::Supervisor => "/supervisor",
            Route::ProcessDetail => "/proceso/:id",
            Route::CandidateDetail => "/candidato/:id",
            Route::Settings => "/settings",
        }
    }

    /// Unknown paths fall back to `Home`.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/postular" => Route::Apply,
            "/dashboard" => Route::Dashboard,
            "/admin" => Route::Admin,
            "/supervisor" => Route::Supervisor,
            "/settings" => Route::Settings,
            p if p.starts_with("/proceso/") => Route::ProcessDetail,
            p if p.starts_with("/candidato/") => Route::CandidateDetail,
            _ => Route::Home,
        }
    }
}

/// Roles allowed on a route. An empty slice means any authenticated caller (or public).
pub const fn route_roles(route: Route) -> &'static [Role] {
    match route {
        Route::Admin | Route::Settings => ADMIN_ONLY,
        Route::Supervisor | Route::ProcessDetail | Route::CandidateDetail => STAFF,
        Route::Login | Route::Apply | Route::Home | Route::Dashboard => &[],
    }
}

pub const fn allowed_landing_page(role: Role) -> Route {
    match role {
        Role::SuperAdmin => Route::Admin,
        Role::Supervisor => Route::Supervisor,
        Role::Usuario => Route::Apply,
    }
}

pub fn can_access(role: Role, required: &[Role]) -> bool {
    required.is_empty() || required.contains(&role)
}

/// Where a caller lands after being refused a route.
pub const fn denied_redirect(role: Role) -> Route {
    match role {
        Role::SuperAdmin => Route::Admin,
        Role::Supervisor => Route::Dashboard,
        Role::Usuario => Route::Home,
    }
}

/// Resolves a navigation attempt to the route actually shown.
pub fn navigate(role: Option<Role>, target: Route) -> Route {
    let Some(role) = role else {
        return match target {
            Route::Login | Route::Apply => target,
            _ => Route::Login,
        };
    };
    match target {
        Route::Home | Route::Dashboard => allowed_landing_page(role),
        _ if can_access(role, route_roles(target)) => target,
        _ => denied_redirect(role),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP guard
// ────────────────────────────────────────────────────────────────────────────

/// Role of the caller, read from [`ROLE_HEADER`]. Missing or unknown → 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerRole(pub Role);

impl CallerRole {
    pub fn require(self, allowed: &[Role]) -> Result<(), AppError> {
        if can_access(self.0, allowed) {
            Ok(())
        } else {
            tracing::debug!(role = %self.0, "access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerRole
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        raw.parse::<Role>()
            .map(CallerRole)
            .map_err(|_| AppError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub target: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub role: Role,
    pub landing_page: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<&'static str>,
}

/// GET /api/v1/session
/// Landing page for the caller, and where `?target=` would actually take them.
pub async fn handle_session(
    caller: CallerRole,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionView>, AppError> {
    let CallerRole(role) = caller;
    let resolved = query
        .target
        .as_deref()
        .map(|target| navigate(Some(role), Route::from_path(target)).path());
    Ok(Json(SessionView {
        role,
        landing_page: allowed_landing_page(role).path(),
        resolved,
    }))
}
