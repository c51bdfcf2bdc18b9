use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use karma_app::AppContext;
use karma_errors::AppError;

pub fn credential(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Rejects requests without a valid credential and exposes the verified
/// claims to handlers as a request extension.
pub async fn require_auth(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = ctx.tokens.verify(credential(req.headers()))?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
