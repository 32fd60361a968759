// Lambda-specific handler and AWS integration

use crate::core::{
    CatalogSnapshot, PersonalRecommendations, PreferenceRecommender, RecommendError,
    RecommenderConfig, Recommendations, RefreshReport, SimilarityResolver,
};
use aws_sdk_s3 as s3;
use lambda_runtime::{Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

/// Operation requested from the recommender
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Similar,
    Refresh,
    Preferences,
}

/// Lambda request structure
#[derive(Serialize, Deserialize, Clone)]
pub struct Request {
    pub action: Action,
    pub item_id: Option<String>,
    pub limit: Option<usize>,
    pub customer_id: Option<String>,
    /// Inline catalog snapshot
    pub snapshot: Option<CatalogSnapshot>,
    /// S3 location of a snapshot, as bucket/key
    pub s3_snapshot: Option<String>,
}

/// Lambda response structure
#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum Response {
    Similar(Recommendations),
    Refresh(RefreshReport),
    Preferences(PersonalRecommendations),
}

/// API Gateway response wrapper
#[derive(Serialize, Deserialize)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Request failures, mapped to HTTP status codes for API Gateway
#[derive(Error, Debug)]
enum RequestError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl RequestError {
    fn status_code(&self) -> u16 {
        match self {
            RequestError::BadRequest(_) => 400,
            RequestError::NotFound(_) => 404,
            RequestError::Internal(_) => 500,
        }
    }
}

impl From<RecommendError> for RequestError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::NotFound(_) => RequestError::NotFound(e.to_string()),
            other => RequestError::Internal(other.to_string()),
        }
    }
}

// Configuration read once per cold start
static CONFIG: LazyLock<RecommenderConfig> = LazyLock::new(RecommenderConfig::from_env);

async fn read_from_s3(s3_client: &s3::Client, s3_path: &str) -> Result<String, RequestError> {
    let (bucket, key) = s3_path
        .split_once('/')
        .ok_or_else(|| RequestError::BadRequest("Invalid S3 path format. Expected: bucket/key".to_string()))?;

    let resp = s3_client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| RequestError::Internal(format!("Failed to fetch snapshot: {}", e)))?;

    let data = resp
        .body
        .collect()
        .await
        .map_err(|e| RequestError::Internal(format!("Failed to read snapshot: {}", e)))?;

    String::from_utf8(data.to_vec()).map_err(|e| RequestError::BadRequest(format!("Snapshot is not UTF-8: {}", e)))
}

async fn load_snapshot(request: &Request) -> Result<CatalogSnapshot, RequestError> {
    if let Some(snapshot) = &request.snapshot {
        snapshot
            .validate()
            .map_err(|e| RequestError::BadRequest(e.to_string()))?;
        return Ok(snapshot.clone());
    }

    let Some(s3_path) = &request.s3_snapshot else {
        return Err(RequestError::BadRequest(
            "Either 'snapshot' or 's3_snapshot' must be provided".to_string(),
        ));
    };

    let config = aws_config::load_from_env().await;
    let s3_client = s3::Client::new(&config);
    let content = read_from_s3(&s3_client, s3_path).await?;

    CatalogSnapshot::from_json(&content).map_err(|e| RequestError::BadRequest(e.to_string()))
}

fn is_api_gateway_request(event: &LambdaEvent<Value>) -> bool {
    event.payload.get("requestContext").is_some()
        || event.payload.get("httpMethod").is_some()
        || event.payload.get("headers").is_some()
}

fn parse_api_gateway_body(event: &LambdaEvent<Value>) -> Result<Request, Error> {
    let body = event
        .payload
        .get("body")
        .and_then(|b| b.as_str())
        .ok_or("Missing body in API Gateway request")?;

    serde_json::from_str(body).map_err(|e| format!("Failed to parse body: {}", e).into())
}

fn create_api_gateway_response(status_code: u16, body: Value) -> ApiGatewayResponse {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    ApiGatewayResponse {
        status_code,
        headers,
        body: body.to_string(),
    }
}

async fn process_request(request: Request) -> Result<Response, RequestError> {
    let snapshot = load_snapshot(&request).await?;
    let config = CONFIG.clone();

    match request.action {
        Action::Similar => {
            let item_id = request
                .item_id
                .as_deref()
                .ok_or_else(|| RequestError::BadRequest("'item_id' is required".to_string()))?;
            info!(item_id, limit = ?request.limit, "Finding similar items");

            let resolver = SimilarityResolver::new(&snapshot, &snapshot, config);
            Ok(Response::Similar(resolver.find_similar_items(item_id, request.limit)?))
        }
        Action::Refresh => {
            let resolver = SimilarityResolver::new(&snapshot, &snapshot, config);
            Ok(Response::Refresh(resolver.refresh_clusters()?))
        }
        Action::Preferences => {
            let customer_id = request
                .customer_id
                .as_deref()
                .ok_or_else(|| RequestError::BadRequest("'customer_id' is required".to_string()))?;

            let limit = config.preference_limit(request.limit);
            let recommender = PreferenceRecommender::new(&snapshot, &snapshot, limit);
            Ok(Response::Preferences(recommender.recommend(customer_id)?))
        }
    }
}

/// Main Lambda handler
pub async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    if is_api_gateway_request(&event) {
        let request = match parse_api_gateway_body(&event) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed API Gateway request");
                let error_response = create_api_gateway_response(
                    400,
                    json!({
                        "error": format!("Bad Request: {}", e)
                    }),
                );
                return Ok(serde_json::to_value(error_response)?);
            }
        };

        match process_request(request).await {
            Ok(response) => {
                let api_response =
                    create_api_gateway_response(200, serde_json::to_value(response)?);
                Ok(serde_json::to_value(api_response)?)
            }
            Err(e) => {
                warn!(error = %e, "Request failed");
                let error_response = create_api_gateway_response(
                    e.status_code(),
                    json!({
                        "error": e.to_string()
                    }),
                );
                Ok(serde_json::to_value(error_response)?)
            }
        }
    } else {
        let request: Request = serde_json::from_value(event.payload)?;
        let response = process_request(request).await?;
        Ok(serde_json::to_value(response)?)
    }
}
