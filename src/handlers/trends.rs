// src/handlers/trends.rs
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::models::PredictionLabel;
use crate::services::orchestrator::Scanner;

pub async fn get_trends(scanner: Arc<Scanner>) -> Result<Json, Rejection> {
    Ok(warp::reply::json(&scanner.view()))
}

pub async fn get_predictions(scanner: Arc<Scanner>) -> Result<Json, Rejection> {
    Ok(warp::reply::json(&scanner.predictions()))
}

pub async fn get_labels() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&PredictionLabel::badges()))
}
