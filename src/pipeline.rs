use axum::{
    extract::{FromRef, FromRequestParts, MatchedPath, RawPathParams, Request, State},
    http::{Method, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::{
    AppState,
    authorization::decide,
    error::AuthError,
    exemption::ExemptionTable,
    identity::IdentityResolver,
    models::AuthorizationContext,
    token::TokenVerifier,
};

/// Name of the path parameter that identifies the target user on by-id routes.
pub const TARGET_PATH_PARAM: &str = "id";

/// RequestFacts
///
/// Everything the pipeline reads from one inbound request.
#[derive(Debug, Clone, Copy)]
pub struct RequestFacts<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    pub method: &'a Method,
    /// Route template the request matched (e.g. `/users/{id}`).
    pub path: &'a str,
    /// External id named by the `id` path parameter. Required when `path` contains `{id}`.
    pub target_external_id: Option<&'a str>,
}

/// AuthPipeline
///
/// Sequences token verification, exemption lookup, identity resolution and the
/// authorization decision for a single request. Holds only immutable configuration, so
/// one instance is shared by every request.
pub struct AuthPipeline {
    verifier: TokenVerifier,
    exemptions: ExemptionTable,
    identities: IdentityResolver,
}

/// PipelineState
///
/// Shared handle to the pipeline, pulled from [`AppState`] by the middleware.
pub type PipelineState = Arc<AuthPipeline>;

impl FromRef<AppState> for PipelineState {
    fn from_ref(app_state: &AppState) -> PipelineState {
        app_state.pipeline.clone()
    }
}

impl AuthPipeline {
    pub fn new(
        verifier: TokenVerifier,
        exemptions: ExemptionTable,
        identities: IdentityResolver,
    ) -> Self {
        Self {
            verifier,
            exemptions,
            identities,
        }
    }

    pub fn exemptions(&self) -> &ExemptionTable {
        &self.exemptions
    }

    /// Runs the pipeline. The first failing step ends it; later steps never execute.
    pub async fn authorize(
        &self,
        facts: &RequestFacts<'_>,
    ) -> Result<AuthorizationContext, AuthError> {
        // 1. Verify the credential. Nothing below runs for an unverified caller.
        let claims = self.verifier.verify(facts.authorization)?;
        let role = claims.role();
        tracing::trace!(sub = %claims.sub, expires_at = ?claims.expires_at(), "credential verified");

        // 2. Exemption must be checked before any lookup: a first-time caller has no
        //    internal record yet.
        let exempt = self.exemptions.is_exempt(facts.method, facts.path);

        // 3. Resolve the caller and, when the path names someone else, the target.
        let (caller_internal_id, target_internal_id) = if exempt {
            (None, None)
        } else {
            let caller = self.identities.resolve(&claims.sub).await?;
            let target = match facts.target_external_id {
                Some(target) if target != claims.sub => self.identities.resolve(target).await?,
                Some(_) => caller,
                // A by-id route must never fall back to the caller as its target.
                None if names_target(facts.path) => {
                    return Err(AuthError::InternalFault(format!(
                        "no target extracted for route {}",
                        facts.path
                    )));
                }
                None => caller,
            };
            (Some(caller), Some(target))
        };

        // 4. Decide.
        decide(role, exempt, caller_internal_id, target_internal_id).into_result()?;

        Ok(AuthorizationContext {
            role,
            external_id: claims.sub,
            caller_internal_id,
            target_internal_id,
            exempt,
        })
    }
}

/// True when the route template carries the target path parameter.
fn names_target(template: &str) -> bool {
    target_position(template).is_some()
}

fn target_position(template: &str) -> Option<usize> {
    let placeholder = format!("{{{TARGET_PATH_PARAM}}}");
    template.split('/').position(|segment| segment == placeholder)
}

/// Returns the target segment of `path` exactly as sent, without percent-decoding.
fn raw_target_segment<'a>(template: &str, path: &'a str) -> Option<&'a str> {
    let index = target_position(template)?;
    path.split('/').nth(index).filter(|segment| !segment.is_empty())
}

/// auth_middleware
///
/// Runs the [`AuthPipeline`] for every request on the guarded routes. On success the
/// [`AuthorizationContext`] is inserted into the request extensions; on failure the
/// [`AuthError`] becomes the response and the handler never runs.
///
/// Must be installed with `route_layer` so the matched route template and path
/// parameters are available.
pub async fn auth_middleware(
    State(pipeline): State<PipelineState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();

    let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(params) => Some(params),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "path parameters could not be decoded");
            None
        }
    };

    let route = parts
        .extensions
        .get::<MatchedPath>()
        .map(|matched| matched.as_str())
        .unwrap_or_else(|| parts.uri.path());

    // An undecodable `{id}` falls back to the raw segment, never to the caller.
    let target_external_id = params
        .as_ref()
        .and_then(|params| {
            params
                .iter()
                .find(|(name, _)| *name == TARGET_PATH_PARAM)
                .map(|(_, value)| value)
        })
        .or_else(|| raw_target_segment(route, parts.uri.path()));

    let facts = RequestFacts {
        authorization: parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        method: &parts.method,
        path: route,
        target_external_id,
    };

    let context = match pipeline.authorize(&facts).await {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(
                method = %parts.method,
                route,
                error = e.name(),
                status = e.status().as_u16(),
                "request rejected by auth pipeline"
            );
            return Err(e);
        }
    };

    tracing::debug!(
        external_id = %context.external_id,
        role = context.role.as_str(),
        exempt = context.exempt,
        "request authorized"
    );

    parts.extensions.insert(context);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Lets handlers take the [`AuthorizationContext`] as an argument.
///
/// Rejects with an internal fault when the route is not behind [`auth_middleware`].
impl<S> FromRequestParts<S> for AuthorizationContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizationContext>()
            .cloned()
            .ok_or_else(|| {
                AuthError::InternalFault("authorization context missing from request".to_string())
            })
    }
}
