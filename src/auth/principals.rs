use moka::sync::Cache;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info};

use crate::clients::app_client;

/// Principals fetched from the main application backend for one user
#[derive(Clone, Debug)]
pub struct UserPrincipals {
    pub prpls: Vec<String>,
}

static PRPL_CACHE: OnceLock<Cache<String, UserPrincipals>> = OnceLock::new();

pub fn init_prpl_cache() {
    PRPL_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(5 * 60))
            .build()
    });
    info!("Principal cache initialized");
}

fn get_prpl_cache() -> &'static Cache<String, UserPrincipals> {
    PRPL_CACHE
        .get()
        .expect("Principal cache not initialized. Call init_prpl_cache() first.")
}

fn parse_principals_from_json(prpls_json: Value) -> Vec<String> {
    if let Some(prpls_val) = prpls_json.get("prpls") {
        serde_json::from_value(prpls_val.clone()).unwrap_or_else(|e| {
            error!("Failed to parse principals array from 'prpls' field: {}", e);
            Vec::new()
        })
    } else {
        serde_json::from_value(prpls_json).unwrap_or_else(|e| {
            error!("Failed to parse principals JSON: {}", e);
            Vec::new()
        })
    }
}

/// Fetch the principal list for a user, cached.
///
/// When no application backend is configured (local dev) the result is
/// empty and the caller falls back to the JWT role claims alone.
pub async fn get_or_fetch_prpls(uid: &str) -> Vec<String> {
    let cache = get_prpl_cache();

    if let Some(ctx) = cache.get(uid) {
        return ctx.prpls;
    }

    let client = match app_client::get_app_client() {
        Some(client) => client,
        None => return Vec::new(),
    };

    info!("Principal cache miss for uid {}. Refreshing from app service.", uid);
    let prpls = match client.get_prpls(uid).await {
        Ok(json) => parse_principals_from_json(json),
        Err(e) => {
            error!("Failed to retrieve principals for user {}: {}", uid, e);
            Vec::new()
        }
    };

    cache.insert(uid.to_string(), UserPrincipals { prpls: prpls.clone() });
    prpls
}
