use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{error, info};

use crate::auth::auth::Actor;
use crate::config;
use crate::services::auth_service::{actor_from_claims, get_auth_token, validate_jwt};

/// Validates the caller's identity before any handler runs.
///
/// Every REST call and WebSocket upgrade must present a pre-validated
/// identity; requests without one never reach the collaboration core.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    // 2. Validate the token
    let config = config::get_config();
    let secret = match &config.auth_jwt_secret {
        Some(secret) => secret,
        None => {
            error!("Auth JWT secret not configured");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let token_data = match validate_jwt(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            error!("JWT validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Determine the type of token (user/service)
    let token_type = token_data
        .claims
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            error!("JWT token does not contain 'type' claim");
            StatusCode::UNAUTHORIZED
        })?;

    // 4A. User token: build the actor from the claims and cached principals
    if token_type == "user" {
        let actor = match actor_from_claims(&token_data.claims).await {
            Ok(actor) => actor,
            Err(e) => {
                error!("Failed to build actor from claims: {}", e);
                return Err(StatusCode::UNAUTHORIZED);
            }
        };
        info!("User token validated successfully for {}", actor.user_id);
        req.extensions_mut().insert(actor);
    }
    // 4B. Service token: the service name becomes the single principal
    else if token_type == "service" {
        let service_name = match token_data.claims.get("sub").and_then(|v| v.as_str()) {
            Some(sub) => sub.to_string(),
            None => {
                error!("JWT token does not contain 'sub' claim");
                return Err(StatusCode::UNAUTHORIZED);
            }
        };
        info!("Service token validated successfully for {}", service_name);

        let org_id = token_data
            .claims
            .get("org")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut prpls = vec![format!("s/{}", service_name)];
        if let Some(roles) = token_data.claims.get("roles").and_then(|v| v.as_array()) {
            for role in roles.iter().filter_map(|r| r.as_str()) {
                let role_prpl = format!("r/{}", role);
                if !prpls.contains(&role_prpl) {
                    prpls.push(role_prpl);
                }
            }
        }

        req.extensions_mut().insert(Actor {
            user_id: format!("s/{}", service_name),
            org_id,
            display_name: service_name,
            prpls,
        });
    } else {
        error!("Invalid token type: {}", token_type);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Identity attached, proceed to the handler
    Ok(next.run(req).await)
}
