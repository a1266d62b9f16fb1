use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use counsel::{
    CareerAssessment, ChatClient, Completion, LearningModeRequest, ProfileSummaryRequest, Prompt,
};
use emotion::{Aggregate, EmotionTally, FramePipeline, VisionBackend};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::args::Args;
use crate::error::ApiError;
use crate::mjpeg;
use crate::shutdown::shutdown_signal;

/// Shared handles passed to every request.
#[derive(Clone)]
pub struct AppState {
    pub tally: Arc<EmotionTally>,
    /// `None` when no API key was configured.
    pub advisor: Option<Arc<dyn Completion>>,
    pub vision: Arc<dyn VisionBackend>,
    /// Flipped to `true` once shutdown starts; open video feeds end on it.
    streams: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(
        tally: Arc<EmotionTally>,
        advisor: Option<Arc<dyn Completion>>,
        vision: Arc<dyn VisionBackend>,
    ) -> Self {
        Self {
            tally,
            advisor,
            vision,
            streams: Arc::new(watch::channel(false).0),
        }
    }

    /// End every open video feed so graceful shutdown does not wait on them.
    pub fn close_streams(&self) {
        let open = self.streams.receiver_count();
        if open > 0 {
            info!(open, "closing video feeds");
        }
        self.streams.send_replace(true);
    }

    /// Build the state described by the command line.
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let advisor = match args.chat_config() {
            Some(config) => {
                info!(url = %config.url, model = %config.model, "chat model configured");
                Some(Arc::new(ChatClient::new(config)?) as Arc<dyn Completion>)
            }
            None => {
                error!("GROQ_API_KEY is not set; assessment routes will fail");
                None
            }
        };
        Ok(Self::new(
            Arc::new(EmotionTally::new(args.retention.get())),
            advisor,
            vision_backend(args),
        ))
    }

    async fn ask<P: Prompt + Sync>(&self, record: &P) -> Result<String, ApiError> {
        let advisor = self.advisor.as_ref().ok_or(ApiError::MissingApiKey)?;
        let prompt = record.prompt()?;
        debug!(%prompt, "prompt built");
        Ok(advisor.complete(&prompt).await?)
    }
}

#[cfg(feature = "opencv")]
fn vision_backend(args: &Args) -> Arc<dyn VisionBackend> {
    Arc::new(emotion::opencv_backend::OpenCvBackend::new(
        args.camera,
        args.cascade.clone(),
        args.emotion_model.clone(),
    ))
}

#[cfg(not(feature = "opencv"))]
fn vision_backend(_args: &Args) -> Arc<dyn VisionBackend> {
    tracing::warn!("built without the opencv feature; /video_feed will answer 503");
    Arc::new(emotion::UnavailableBackend)
}

#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub recommendation: String,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct LearningMode {
    pub learning_mode: String,
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Emotion Tracking and Career Assessment API is running" }))
}

async fn assess(
    State(state): State<AppState>,
    body: Result<Json<CareerAssessment>, JsonRejection>,
) -> Result<Json<Recommendation>, ApiError> {
    let Json(assessment) = body?;
    assessment.validate()?;
    let recommendation = state.ask(&assessment).await?;
    info!(%recommendation, "career recommendation");
    Ok(Json(Recommendation { recommendation }))
}

async fn profile_summary(
    State(state): State<AppState>,
    body: Result<Json<ProfileSummaryRequest>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    let Json(request) = body?;
    let summary = state.ask(&request).await?;
    Ok(Json(Summary { summary }))
}

async fn learning_mode(
    State(state): State<AppState>,
    body: Result<Json<LearningModeRequest>, JsonRejection>,
) -> Result<Json<LearningMode>, ApiError> {
    let Json(request) = body?;
    let learning_mode = state.ask(&request).await?;
    Ok(Json(LearningMode { learning_mode }))
}

async fn analyze_emotion(State(state): State<AppState>) -> Json<Aggregate> {
    let aggregate = state.tally.query();
    debug!(
        emotion = %aggregate.emotion,
        confidence = aggregate.confidence,
        total = aggregate.total_detections,
        "emotion queried"
    );
    Json(aggregate)
}

async fn video_feed(State(state): State<AppState>) -> Result<Response, ApiError> {
    let vision = state.vision.clone();
    let session = tokio::task::spawn_blocking(move || vision.start())
        .await
        .map_err(|e| ApiError::Internal(format!("camera task failed: {e}")))??;
    info!("video feed started");
    Ok(mjpeg::stream(
        FramePipeline::new(session, state.tally.clone()),
        state.streams.subscribe(),
    ))
}

/// All HTTP routes, with permissive CORS for the browser front end.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/assess", post(assess))
        .route("/profile_summary", post(profile_summary))
        .route("/learning_mode", post(learning_mode))
        .route("/analyze_emotion", get(analyze_emotion))
        .route("/video_feed", get(video_feed))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve until a shutdown signal arrives.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let state = AppState::from_args(&args)?;
    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, retention = args.retention.get(), "assessd listening");
    let streams = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            streams.close_streams();
        })
        .await?;
    info!("server stopped");
    Ok(())
}
