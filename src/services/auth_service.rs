use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};

use crate::auth::auth::Actor;
use crate::auth::principals;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req
            .headers()
            .get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header) {
            if let Ok(c) = cookie {
                if c.name() == "auth_token" {
                    return Ok(c.value().to_string());
                }
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(
    token: &str,
    secret: &str,
) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

/// Build the verified Actor from validated user-token claims.
///
/// Expected claims: `sub` (user id), `org` (organization id), optional
/// `name` (display name) and `roles` (array). Role claims become `r/<role>`
/// principals, the org membership becomes `<org>/u/<uid>`, and any extra
/// principals from the application backend are merged in.
pub async fn actor_from_claims(claims: &serde_json::Value) -> Result<Actor, String> {
    let user_id = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "JWT token does not contain 'sub' claim".to_string())?
        .to_string();

    let org_id = claims
        .get("org")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "JWT token does not contain 'org' claim".to_string())?
        .to_string();

    let display_name = claims
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(&user_id)
        .to_string();

    let mut prpls = vec![format!("{}/u/{}", org_id, user_id)];

    let roles = match claims.get("roles").and_then(|v| v.as_array()) {
        Some(roles_array) => roles_array
            .iter()
            .filter_map(|r| r.as_str().map(|s| s.to_string()))
            .collect::<Vec<String>>(),
        None => Vec::new(),
    };
    for role in roles {
        let role_prpl = format!("r/{}", role);
        if !prpls.contains(&role_prpl) {
            prpls.push(role_prpl);
        }
    }

    // Merge in principals held by the application backend (cached)
    for prpl in principals::get_or_fetch_prpls(&user_id).await {
        if !prpls.contains(&prpl) {
            prpls.push(prpl);
        }
    }

    Ok(Actor {
        user_id,
        org_id,
        display_name,
        prpls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn bearer_header_is_preferred() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc123")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "abc123");
    }

    #[test]
    fn cookie_fallback_is_used() {
        let req = Request::builder()
            .header("Cookie", "theme=dark; auth_token=tok456")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "tok456");
    }

    #[test]
    fn missing_token_is_an_error() {
        let req = Request::builder().body(()).unwrap();
        assert!(get_auth_token(&req).is_err());
    }
}
