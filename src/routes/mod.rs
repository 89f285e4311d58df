use axum::http::Method;

use crate::exemption::{ExemptionError, ExemptionTable};

/// Routes accessible without credentials (health probes).
pub mod public;

/// Routes guarded by the authentication pipeline.
pub mod authenticated;

/// The `(method, path template)` pairs registered behind the authentication pipeline.
///
/// Exemption rules only make sense for these routes.
pub fn guarded_routes() -> Vec<(Method, &'static str)> {
    vec![
        (Method::POST, authenticated::USERS),
        (Method::GET, authenticated::USERS),
        (Method::GET, authenticated::USERS_ME),
        (Method::GET, authenticated::USER_BY_ID),
    ]
}

/// Startup check that every exemption rule names a guarded route.
pub fn validate_exemptions(exemptions: &ExemptionTable) -> Result<(), ExemptionError> {
    exemptions.validate_against(&guarded_routes())
}
