// src/handlers/targets.rs
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Json;
use warp::{Rejection, Reply};

use crate::services::orchestrator::Scanner;
use crate::services::registry::RegistryError;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub url: String,
}

pub async fn list_targets(scanner: Arc<Scanner>) -> Result<Json, Rejection> {
    Ok(warp::reply::json(&scanner.targets().await))
}

pub async fn add_target(request: TargetRequest, scanner: Arc<Scanner>) -> Result<impl Reply, Rejection> {
    match scanner.add_target(&request.url).await {
        Ok(preview) => Ok(warp::reply::with_status(warp::reply::json(&preview), StatusCode::CREATED)),
        Err(e @ RegistryError::EmptyUrl) => Err(warp::reject::custom(ApiError::bad_request(e.to_string()))),
        Err(e @ RegistryError::DuplicateTarget(_)) => Err(warp::reject::custom(ApiError::conflict(e.to_string()))),
    }
}

pub async fn remove_target(request: TargetRequest, scanner: Arc<Scanner>) -> Result<Json, Rejection> {
    let removed = scanner.remove_target(&request.url).await;
    info!("Remove {}: {}", request.url.trim(), removed);
    Ok(warp::reply::json(&json!({ "removed": removed })))
}
