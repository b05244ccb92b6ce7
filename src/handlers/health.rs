//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::classifier::CLASSES;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    device: String,
    classes: [&'static str; 2],
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.classifier.is_loaded(),
        device: state.classifier.device().to_string(),
        classes: CLASSES,
    })
}
