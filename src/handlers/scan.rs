// src/handlers/scan.rs
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::services::orchestrator::Scanner;
use super::error::ApiError;

/// Exact match against `Bearer <secret>`. No configured secret means nothing is authorized.
pub fn is_authorized(header: Option<&str>, secret: Option<&str>) -> bool {
    match (header, secret) {
        (Some(header), Some(secret)) => header == format!("Bearer {}", secret),
        _ => false,
    }
}

fn start(scanner: &Arc<Scanner>, trigger: &str) -> Result<(), Rejection> {
    match scanner.start_cycle() {
        Ok(_) => {
            info!("Scan started by {} trigger", trigger);
            Ok(())
        }
        Err(e) => {
            warn!("Ignoring {} trigger: {}", trigger, e);
            Err(warp::reject::custom(ApiError::conflict(e.to_string())))
        }
    }
}

pub async fn trigger_scan(scanner: Arc<Scanner>) -> Result<impl Reply, Rejection> {
    start(&scanner, "manual")?;
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "started": true })),
        StatusCode::ACCEPTED,
    ))
}

pub async fn cron_trigger(
    authorization: Option<String>,
    scanner: Arc<Scanner>,
    secret: Option<Arc<String>>,
) -> Result<impl Reply, Rejection> {
    if !is_authorized(authorization.as_deref(), secret.as_deref().map(String::as_str)) {
        warn!("Rejected scheduled trigger with bad credentials");
        return Err(warp::reject::custom(ApiError::unauthorized("Unauthorized request")));
    }
    start(&scanner, "scheduled")?;
    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Auto-scan successfully triggered.",
    })))
}
