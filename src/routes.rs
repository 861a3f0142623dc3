// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;
use log::info;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::scan::{cron_trigger, trigger_scan};
use crate::handlers::targets::{add_target, list_targets, remove_target, TargetRequest};
use crate::handlers::trends::{get_labels, get_predictions, get_trends};
use crate::services::orchestrator::Scanner;

const MAX_BODY_BYTES: u64 = 16 * 1024;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = e.to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload Too Large".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

fn target_body() -> impl Filter<Extract = (TargetRequest,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn routes(
    scanner: Arc<Scanner>,
    cron_secret: Option<String>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let scanner_filter = warp::any().map(move || scanner.clone());
    let cron_secret = cron_secret.map(Arc::new);
    let secret_filter = warp::any().map(move || cron_secret.clone());

    let trends_route = warp::path!("api" / "v1" / "trends")
        .and(warp::get())
        .and(scanner_filter.clone())
        .and_then(get_trends);

    let predictions_route = warp::path!("api" / "v1" / "predictions")
        .and(warp::get())
        .and(scanner_filter.clone())
        .and_then(get_predictions);

    let labels_route = warp::path!("api" / "v1" / "labels")
        .and(warp::get())
        .and_then(get_labels);

    let scan_route = warp::path!("api" / "v1" / "scan")
        .and(warp::post())
        .and(scanner_filter.clone())
        .and_then(trigger_scan);

    let cron_route = warp::path!("api" / "cron")
        .and(warp::get().or(warp::post()).unify())
        .and(warp::header::optional::<String>("authorization"))
        .and(scanner_filter.clone())
        .and(secret_filter)
        .and_then(cron_trigger);

    let list_targets_route = warp::path!("api" / "v1" / "targets")
        .and(warp::get())
        .and(scanner_filter.clone())
        .and_then(list_targets);

    let add_target_route = warp::path!("api" / "v1" / "targets")
        .and(warp::post())
        .and(target_body())
        .and(scanner_filter.clone())
        .and_then(add_target);

    let remove_target_route = warp::path!("api" / "v1" / "targets")
        .and(warp::delete())
        .and(target_body())
        .and(scanner_filter.clone())
        .and_then(remove_target);

    info!("All routes configured successfully.");

    trends_route
        .or(predictions_route)
        .or(labels_route)
        .or(scan_route)
        .or(cron_route)
        .or(list_targets_route)
        .or(add_target_route)
        .or(remove_target_route)
        .recover(handle_rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scoring::ConfidenceScorer;
    use crate::services::store::{KvStore, MemoryStore};
    use serde_json::Value;
    use std::time::Duration;

    async fn scanner() -> Arc<Scanner> {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        Arc::new(Scanner::load(Vec::new(), store, ConfidenceScorer::default(), Duration::from_secs(1)).await)
    }

    fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn trends_start_idle() {
        let api = routes(scanner().await, None);
        let res = warp::test::request().method("GET").path("/api/v1/trends").reply(&api).await;

        assert_eq!(res.status(), StatusCode::OK);
        let view = body(&res);
        assert_eq!(view["cycleState"], "idle");
        assert_eq!(view["items"].as_array().unwrap().len(), 0);
        assert!(view["error"].is_null());
    }

    #[tokio::test]
    async fn labels_list_every_badge() {
        let api = routes(scanner().await, None);
        let res = warp::test::request().path("/api/v1/labels").reply(&api).await;

        let labels = body(&res);
        assert_eq!(labels.as_array().unwrap().len(), 6);
        assert_eq!(labels[0]["label"], "breaking_out");
        assert_eq!(labels[0]["text"], "Breaking Out");
    }

    #[tokio::test]
    async fn cron_requires_exact_secret() {
        let scanner = scanner().await;
        let api = routes(scanner.clone(), Some("s3cret".to_string()));

        let res = warp::test::request().method("POST").path("/api/cron").reply(&api).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&res)["error"], "Unauthorized request");

        let res = warp::test::request()
            .method("GET")
            .path("/api/cron")
            .header("authorization", "Bearer wrong")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(!scanner.is_running());
        assert_eq!(scanner.view().cycle_state, crate::models::CycleState::Idle);

        let res = warp::test::request()
            .method("GET")
            .path("/api/cron")
            .header("authorization", "Bearer s3cret")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["success"], true);
    }

    #[tokio::test]
    async fn cron_is_closed_without_a_configured_secret() {
        let api = routes(scanner().await, None);
        let res = warp::test::request()
            .path("/api/cron")
            .header("authorization", "Bearer ")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn manual_scan_is_accepted() {
        let api = routes(scanner().await, None);
        let res = warp::test::request().method("POST").path("/api/v1/scan").reply(&api).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn target_lifecycle() {
        let api = routes(scanner().await, None);
        let url = "https://example.com/launch-post";

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/targets")
            .json(&serde_json::json!({ "url": url }))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let preview = body(&res);
        assert_eq!(preview["target"]["type"], "generic");
        assert_eq!(preview["target"]["itemId"], "example.com/launch-post");
        assert_eq!(preview["item"]["id"], "custom-generic-example.com/launch-post");
        assert_eq!(preview["item"]["analysis"]["confidence"], 50);

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/targets")
            .json(&serde_json::json!({ "url": url }))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = warp::test::request().path("/api/v1/targets").reply(&api).await;
        assert_eq!(body(&res).as_array().unwrap().len(), 1);

        let res = warp::test::request()
            .method("DELETE")
            .path("/api/v1/targets")
            .json(&serde_json::json!({ "url": url }))
            .reply(&api)
            .await;
        assert_eq!(body(&res)["removed"], true);
    }

    #[tokio::test]
    async fn blank_target_is_a_bad_request() {
        let api = routes(scanner().await, None);
        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/targets")
            .json(&serde_json::json!({ "url": "  " }))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "Please enter a URL");
    }
}
