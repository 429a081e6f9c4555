// HTTP commands
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{
    ClassifierError, FeatureVector, LabeledSample, ModelSummary, PlayerClassifier, TraceEntry,
    TraceWriter, TrainingReport,
};
use crate::state::{self, DbConnection, DbError, PlayerPerformanceDto};

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub classifier: Arc<RwLock<PlayerClassifier>>,
    pub model_path: PathBuf,
    pub trace_path: PathBuf,
}

impl AppState {
    pub fn new(
        db: DbConnection,
        classifier: PlayerClassifier,
        model_path: PathBuf,
        trace_path: PathBuf,
    ) -> Self {
        AppState {
            db,
            classifier: Arc::new(RwLock::new(classifier)),
            model_path,
            trace_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommandError {
    #[serde(skip)]
    status: StatusCode,
    message: String,
}

impl CommandError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        CommandError {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<DbError> for CommandError {
    fn from(error: DbError) -> Self {
        log::error!("Database error: {}", error);
        CommandError::internal(error.to_string())
    }
}

impl From<ClassifierError> for CommandError {
    fn from(error: ClassifierError) -> Self {
        match error {
            ClassifierError::InvalidArity { .. }
            | ClassifierError::EmptyTrainingSet
            | ClassifierError::InvalidSample { .. } => CommandError::bad_request(error.to_string()),
            ClassifierError::InvalidConfig(_)
            | ClassifierError::Storage(_)
            | ClassifierError::Serialization(_) => {
                log::error!("Model error: {}", error);
                CommandError::internal(error.to_string())
            }
        }
    }
}

impl From<JsonRejection> for CommandError {
    fn from(rejection: JsonRejection) -> Self {
        CommandError::bad_request(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for CommandError {
    fn from(rejection: PathRejection) -> Self {
        CommandError::bad_request(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

type CommandResult<T> = Result<T, CommandError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/performance",
            get(list_performances).post(create_performance),
        )
        .route("/api/performance/predict", post(predict_suitability))
        .route("/api/performance/train", post(train_model))
        .route("/api/performance/:id", get(get_performance))
        .route("/api/model", get(get_model_summary))
        .with_state(state)
}

// ==================== PERFORMANCE COMMANDS ====================

pub async fn list_performances(
    State(app): State<AppState>,
) -> CommandResult<Json<Vec<PlayerPerformanceDto>>> {
    let performances = state::list_performances(&app.db)?;
    Ok(Json(performances.iter().map(state::to_dto).collect()))
}

pub async fn create_performance(
    State(app): State<AppState>,
    input: Result<Json<PlayerPerformanceDto>, JsonRejection>,
) -> CommandResult<Json<PlayerPerformanceDto>> {
    let Json(dto) = input?;
    dto.validate()
        .map_err(|e| CommandError::bad_request(format!("Invalid input: {}", e)))?;

    let stored = state::create_performance(&app.db, state::to_entity(&dto))?;
    log::info!("Stored performance record {}", stored.id);

    Ok(Json(state::to_dto(&stored)))
}

pub async fn get_performance(
    State(app): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> CommandResult<Json<PlayerPerformanceDto>> {
    let Path(id) = id?;
    state::get_performance(&app.db, id)?
        .map(|performance| Json(state::to_dto(&performance)))
        .ok_or_else(|| CommandError::not_found(format!("Performance record {} not found", id)))
}

// ==================== MODEL COMMANDS ====================

/// Suitability for a raw feature vector; nothing is stored
pub async fn predict_suitability(
    State(app): State<AppState>,
    input: Result<Json<FeatureVector>, JsonRejection>,
) -> CommandResult<Json<bool>> {
    let Json(features) = input?;
    if !features.is_finite() {
        return Err(CommandError::bad_request(
            "Invalid input: features must be finite numbers",
        ));
    }

    let suitable = app.classifier.read().await.predict(&features);
    Ok(Json(suitable))
}

/// Fit the classifier on every stored record, then persist it.
/// The in-memory model is only replaced if the save succeeds.
pub async fn train_model(State(app): State<AppState>) -> CommandResult<Json<TrainingReport>> {
    let samples: Vec<LabeledSample> = state::list_performances(&app.db)?
        .iter()
        .map(|performance| performance.to_sample())
        .collect();

    let report = tokio::task::spawn_blocking(move || -> CommandResult<TrainingReport> {
        let mut entries = Vec::new();
        let report = app.classifier.blocking_write().train_and_save(
            &samples,
            &app.model_path,
            |progress| entries.push(TraceEntry::from_progress(progress)),
        )?;

        let writer = TraceWriter::new(app.trace_path.clone());
        if let Err(e) = writer.write_batch(&entries) {
            log::warn!("Failed to write training trace to {}: {}", writer.path().display(), e);
        }

        Ok(report)
    })
    .await
    .map_err(|e| CommandError::internal(format!("Training task failed: {}", e)))??;

    Ok(Json(report))
}

pub async fn get_model_summary(State(app): State<AppState>) -> CommandResult<Json<ModelSummary>> {
    Ok(Json(app.classifier.read().await.summary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::model::{self, ModelSource, TrainingConfig};
    use std::time::Duration;

    fn test_state(temp_dir: &TempDir) -> AppState {
        state_with_model_path(temp_dir, temp_dir.path().join("player_model.json"))
    }

    fn state_with_model_path(temp_dir: &TempDir, model_path: PathBuf) -> AppState {
        let config = TrainingConfig {
            epochs: 5,
            ..TrainingConfig::default()
        };
        let classifier = PlayerClassifier::open(config, &model_path).unwrap();
        AppState::new(
            state::init_db_in_memory().unwrap(),
            classifier,
            model_path,
            temp_dir.path().join("training_trace.jsonl"),
        )
    }

    async fn send(app: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(app.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn record(average: f64, label: i32) -> Value {
        json!({
            "average": average,
            "strikeRate": 140.0,
            "bowlingAverage": 20.0,
            "economyRate": 4.2,
            "fieldingStats": 15,
            "label": label
        })
    }

    #[tokio::test]
    async fn test_predict_returns_boolean() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let body = json!({
            "average": 50.5,
            "strikeRate": 140.0,
            "bowlingAverage": 20.0,
            "economyRate": 4.2,
            "fieldingStats": 15
        });
        let (status, value) = send(&app, "POST", "/api/performance/predict", Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(value.is_boolean());

        let expected = app
            .classifier
            .read()
            .await
            .predict(&FeatureVector::new(50.5, 140.0, 20.0, 4.2, 15.0));
        assert_eq!(value, Value::Bool(expected));
    }

    #[tokio::test]
    async fn test_predict_does_not_store() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let body = json!({
            "average": 20.0, "strikeRate": 90.0, "bowlingAverage": 35.0,
            "economyRate": 7.0, "fieldingStats": 3
        });
        send(&app, "POST", "/api/performance/predict", Some(body)).await;

        let (_, list) = send(&app, "GET", "/api/performance", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_input() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let missing = json!({"average": 50.5, "strikeRate": 140.0});
        let (status, value) = send(&app, "POST", "/api/performance/predict", Some(missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["message"].as_str().unwrap().starts_with("Invalid input"));

        let non_numeric = json!({
            "average": "fifty", "strikeRate": 140.0, "bowlingAverage": 20.0,
            "economyRate": 4.2, "fieldingStats": 15
        });
        let (status, _) = send(&app, "POST", "/api/performance/predict", Some(non_numeric)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/api/performance/predict", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let (status, created) = send(&app, "POST", "/api/performance", Some(record(50.5, 1))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(created["id"].is_i64());

        let (status, list) = send(&app, "GET", "/api/performance", None).await;
        assert_eq!(status, StatusCode::OK);

        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], created["id"]);
        assert_eq!(list[0]["average"], 50.5);
        assert_eq!(list[0]["strikeRate"], 140.0);
        assert_eq!(list[0]["bowlingAverage"], 20.0);
        assert_eq!(list[0]["economyRate"], 4.2);
        assert_eq!(list[0]["fieldingStats"], 15);
        assert_eq!(list[0]["label"], 1);
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let mut body = record(40.0, 0);
        body["id"] = json!(999);
        let (_, created) = send(&app, "POST", "/api/performance", Some(body)).await;

        assert_ne!(created["id"], 999);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_label() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let (status, _) = send(&app, "POST", "/api/performance", Some(record(50.5, 5))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = send(&app, "GET", "/api/performance", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_get_performance_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let (_, created) = send(&app, "POST", "/api/performance", Some(record(33.3, 0))).await;
        let uri = format!("/api/performance/{}", created["id"]);

        let (status, fetched) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, _) = send(&app, "GET", "/api/performance/4242", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/performance/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_train_with_empty_store_is_client_error() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let (status, value) = send(&app, "POST", "/api/performance/train", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["message"], "Training set is empty");
    }

    #[tokio::test]
    async fn test_train_persists_model_and_trace() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);
        let before = app.classifier.read().await.summary().fingerprint;

        for (average, label) in [(50.5, 1), (12.0, 0), (44.0, 1), (18.5, 0)] {
            send(&app, "POST", "/api/performance", Some(record(average, label))).await;
        }

        let (status, report) = send(&app, "POST", "/api/performance/train", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["samples"], 4);
        assert_eq!(report["epoch_losses"].as_array().unwrap().len(), 5);

        let after = app.classifier.read().await.summary().fingerprint;
        assert!(after.is_some());
        assert_ne!(after, before);

        let classifier = app.classifier.read().await;
        let reloaded =
            PlayerClassifier::open(classifier.training().clone(), &app.model_path).unwrap();
        assert_eq!(reloaded.source(), ModelSource::Loaded);
        assert_eq!(reloaded.network(), classifier.network());

        let trace = model::read_trace_file(&app.trace_path).unwrap();
        assert_eq!(trace.len(), 5 + 2);
        assert_eq!(trace[1].epoch, Some(1));
        assert!(trace[0].timestamp <= trace[6].timestamp);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_model() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();
        let app = state_with_model_path(&temp_dir, blocker.join("player_model.json"));

        let features = FeatureVector::new(12.0, 65.0, 45.0, 8.5, 2.0);
        let before = app.classifier.read().await.probability(&features);

        for (average, label) in [(50.5, 1), (12.0, 0), (44.0, 1), (18.5, 0)] {
            send(&app, "POST", "/api/performance", Some(record(average, label))).await;
        }

        let (status, _) = send(&app, "POST", "/api/performance/train", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let classifier = app.classifier.read().await;
        assert_eq!(classifier.probability(&features).to_bits(), before.to_bits());
        assert!(classifier.summary().fingerprint.is_none());
        assert!(!app.trace_path.exists());
    }

    #[tokio::test]
    async fn test_predict_waits_for_training_lock() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let body = json!({
            "average": 50.5, "strikeRate": 140.0, "bowlingAverage": 20.0,
            "economyRate": 4.2, "fieldingStats": 15
        });

        let guard = app.classifier.write().await;
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            send(&app, "POST", "/api/performance/predict", Some(body.clone())),
        )
        .await;
        assert!(blocked.is_err());
        drop(guard);

        let (status, _) = send(&app, "POST", "/api/performance/predict", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_model_summary() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_state(&temp_dir);

        let (status, summary) = send(&app, "GET", "/api/model", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["source"], "created");
        assert_eq!(summary["architecture"].as_array().unwrap().len(), 3);
        assert_eq!(summary["architecture"][0]["inputs"], 5);
        assert_eq!(summary["architecture"][2]["activation"], "sigmoid");
        assert_eq!(summary["decision_threshold"], 0.5);
    }
}
