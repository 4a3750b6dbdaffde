use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use campus_types::UserId;
use campus_types::api::{Claims, ErrorBody};

use crate::AppState;

pub type Failure = (StatusCode, Json<ErrorBody>);

pub fn failure(status: StatusCode, message: &str) -> Failure {
    (status, Json(ErrorBody::message(message)))
}

/// Mint a signed bearer token valid for `ttl_days`.
pub fn issue_token(
    secret: &str,
    user_id: UserId,
    username: &str,
    role: &str,
    ttl_days: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate the bearer token and require the admin role.
/// 401 for a missing or bad token, 403 for a valid non-admin token.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Failure> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Unauthenticated."))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Unauthenticated."))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| failure(StatusCode::UNAUTHORIZED, "Unauthenticated."))?;

    if !token_data.claims.role.eq_ignore_ascii_case("admin") {
        return Err(failure(
            StatusCode::FORBIDDEN,
            "Unauthorized: only administrators can access this resource.",
        ));
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
