//! HTTP boundary of the inference service.
//!
//! `GET /health`, `GET /` (form page), `POST /predict` (form fields, HTML
//! answer) and `POST /predict-json`. `ModelNotLoaded` maps to 503 and
//! `SchemaViolation` to 422.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::common::error::{AdmitError, AdmitResult};
use crate::data::domain::{
    APPLICATION_ID, CHINESE_PROFICIENCY, COUNTRY, DEGREE_LANGUAGE, ENGLISH_SCORE, ENGLISH_TEST_TYPE,
    INTERVIEW, MATH_PHYSICS, PREVIOUS_GPA, PROGRAM_APPLIED, PROGRAM_CATEGORY, PUBLICATION_COUNT,
    RECOMMENDATION, RESEARCH_ALIGNMENT,
};
use crate::inference::{InferenceService, Prediction, PredictionReport};

pub type ApiState = Arc<InferenceService>;

/// Error wrapper carrying the transport mapping.
#[derive(Debug)]
pub struct ApiError(pub AdmitError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AdmitError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            AdmitError::SchemaViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AdmitError> for ApiError {
    fn from(err: AdmitError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.to_string(),
            "code": self.0.code().as_u32(),
        }));
        (self.status(), body).into_response()
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/predict-json", post(predict_json))
        .with_state(state)
}

/// Bind `addr` and serve until the process ends.
pub async fn serve(addr: &str, state: ApiState) -> AdmitResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "inference server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> AdmitResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(AdmitError::Io(std::io::Error::other(e.to_string()))))?
        .map_err(ApiError)
}

async fn health(State(service): State<ApiState>) -> impl IntoResponse {
    let snapshot = run_blocking(move || service.snapshot()).await.ok();
    Json(HealthBody {
        status: "ok",
        model_loaded: snapshot.is_some(),
        run_id: snapshot.map(|s| s.bundle.run_id.to_string()),
    })
}

async fn predict_json(
    State(service): State<ApiState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<PredictionReport>, ApiError> {
    let report = run_blocking(move || service.report_json(&payload)).await?;
    Ok(Json(report))
}

async fn predict_form(
    State(service): State<ApiState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Response {
    match run_blocking(move || service.predict_cells(&fields)).await {
        Ok(prediction) => Html(page(&result_section(&prediction))).into_response(),
        Err(err) => {
            let section = format!(
                "<section class=\"error\"><h2>Request rejected</h2><p>{}</p></section>",
                escape_html(&err.0.to_string())
            );
            (err.status(), Html(page(&section))).into_response()
        }
    }
}

async fn index() -> Html<String> {
    Html(page(""))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn result_section(p: &Prediction) -> String {
    let scholarship = match (&p.scholarship_decision, p.scholarship_probability) {
        (Some(decision), Some(prob)) => format!("{decision} ({prob:.3})"),
        _ => "not applicable".to_string(),
    };
    format!(
        "<section class=\"result\"><h2>Prediction</h2>\
         <p>Admission: {} ({:.3})</p><p>Scholarship: {}</p></section>",
        escape_html(&p.admission_decision),
        p.admission_probability,
        escape_html(&scholarship)
    )
}

const FORM_FIELDS: [(&str, &str); 14] = [
    (APPLICATION_ID, "text"),
    (PROGRAM_CATEGORY, "text"),
    (COUNTRY, "text"),
    (PROGRAM_APPLIED, "text"),
    (DEGREE_LANGUAGE, "text"),
    (PREVIOUS_GPA, "number"),
    (MATH_PHYSICS, "number"),
    (RESEARCH_ALIGNMENT, "number"),
    (PUBLICATION_COUNT, "number"),
    (RECOMMENDATION, "number"),
    (INTERVIEW, "number"),
    (ENGLISH_TEST_TYPE, "text"),
    (ENGLISH_SCORE, "number"),
    (CHINESE_PROFICIENCY, "text"),
];

fn page(body: &str) -> String {
    let inputs: String = FORM_FIELDS
        .iter()
        .map(|(name, kind)| {
            format!(
                "<label>{name}<input name=\"{name}\" type=\"{kind}\" step=\"any\"></label>\n"
            )
        })
        .collect();
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Admission predictor</title></head>\
         <body><h1>Admission predictor</h1>\n<form method=\"post\" action=\"/predict\">\n{inputs}\
         <button type=\"submit\">Predict</button></form>\n{body}</body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError(AdmitError::ModelNotLoaded).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError(AdmitError::schema(COUNTRY, None, "missing")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError(AdmitError::config("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>\"x\"&"), "&lt;b&gt;&quot;x&quot;&amp;");
    }
}
