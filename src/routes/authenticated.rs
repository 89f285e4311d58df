use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

pub const USERS: &str = "/users";
pub const USERS_ME: &str = "/users/me";
pub const USER_BY_ID: &str = "/users/{id}";

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, installed by `create_router` with
/// `route_layer`. Handlers receive the resulting `AuthorizationContext` as an argument.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /users
        // First-time account creation. Exempt from identity resolution by default, since
        // the caller has no internal record yet.
        // GET /users
        // Admin only. Not exempt: the caller is resolved, then the handler checks the role.
        .route(
            USERS,
            post(handlers::create_user).get(handlers::list_users),
        )
        // GET /users/me
        // Self-scoped: the target is the caller.
        .route(USERS_ME, get(handlers::get_me))
        // GET /users/{id}
        // By-id route. `id` is the external id of the target; the ownership check runs
        // against its internal id.
        .route(USER_BY_ID, get(handlers::get_user))
}
