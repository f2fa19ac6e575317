use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Form, Json, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::advice::{AdviceRequester, AdviceResponse};
use crate::bmi::{self, BmiResult, HeightUnit, Measurement, Severity, WeightUnit};
use crate::config::ServeConfig;
use crate::constants;
use crate::error::{AdviceError, EvaluationError};

const INVALID_MEASUREMENT: &str = "Please enter valid positive numbers";
const MISSING_BMI: &str = "Please calculate your BMI first";
const MISSING_QUESTION: &str = "Please enter your health question first";

// Shared application state. Nothing in here is mutated after start-up.
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    requester: AdviceRequester,
}

impl AppState {
    pub fn new(templates_dir: impl Into<PathBuf>, requester: AdviceRequester) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            requester,
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

/// Raw form fields, echoed back into the page so inputs survive a submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementForm {
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub height_unit: HeightUnit,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub weight_unit: WeightUnit,
}

impl MeasurementForm {
    fn evaluate(&self) -> Result<BmiResult, EvaluationError> {
        bmi::evaluate(
            bmi::parse_quantity("height", &self.height)?,
            self.height_unit,
            bmi::parse_quantity("weight", &self.weight)?,
            self.weight_unit,
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdviceForm {
    #[serde(flatten)]
    pub measurement: MeasurementForm,
    #[serde(default)]
    pub question: String,
}

/// Everything a BMI readout needs, shared by the page and the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BmiView {
    pub value: f64,
    pub display: String,
    pub label: String,
    pub range: String,
    pub message: String,
    pub severity: String,
}

impl From<BmiResult> for BmiView {
    fn from(result: BmiResult) -> Self {
        let severity = match result.category.severity() {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        Self {
            value: result.value,
            display: format!("{:.1}", result.value),
            label: result.category.label().to_string(),
            range: result.category.range().to_string(),
            message: result.category.wellness_message().to_string(),
            severity: severity.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Notice {
    severity: &'static str,
    message: String,
}

impl Notice {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: "warning",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageView {
    title: &'static str,
    tagline: &'static str,
    disclaimer: &'static [&'static str],
    form: MeasurementForm,
    question: String,
    bmi: Option<BmiView>,
    advice: Option<String>,
    notice: Option<Notice>,
}

impl PageView {
    fn new(form: MeasurementForm) -> Self {
        Self {
            title: constants::APP_TITLE,
            tagline: constants::TAGLINE,
            disclaimer: constants::DISCLAIMER,
            form,
            question: String::new(),
            bmi: None,
            advice: None,
            notice: None,
        }
    }
}

fn render_page(state: &AppState, view: &PageView, status: StatusCode) -> Response {
    // Acquire env, get template, and render within the same block
    let rendered = state.templates.acquire_env().and_then(|env| {
        let tmpl = env.get_template("index.html")?;
        tmpl.render(view)
    });

    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        }
    }
}

fn status_for(err: &AdviceError) -> StatusCode {
    match err {
        AdviceError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdviceError::AuthenticationError(_) | AdviceError::EmptyResponse => StatusCode::BAD_GATEWAY,
        AdviceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AdviceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

async fn index_handler(State(state): State<AppState>) -> Response {
    render_page(&state, &PageView::new(MeasurementForm::default()), StatusCode::OK)
}

async fn bmi_form_handler(
    State(state): State<AppState>,
    Form(form): Form<MeasurementForm>,
) -> Response {
    let result = form.evaluate();
    let mut view = PageView::new(form);
    match result {
        Ok(result) => {
            info!(bmi = result.value, category = ?result.category, "BMI calculated");
            view.bmi = Some(result.into());
            render_page(&state, &view, StatusCode::OK)
        }
        Err(e) => {
            warn!("Rejected BMI input: {}", e);
            view.notice = Some(Notice::error(INVALID_MEASUREMENT));
            render_page(&state, &view, StatusCode::UNPROCESSABLE_ENTITY)
        }
    }
}

async fn advice_form_handler(
    State(state): State<AppState>,
    Form(form): Form<AdviceForm>,
) -> Response {
    let AdviceForm {
        measurement,
        question,
    } = form;
    let result = measurement.evaluate();
    let mut view = PageView::new(measurement);
    view.question = question.clone();

    if question.trim().is_empty() {
        view.bmi = result.ok().map(BmiView::from);
        view.notice = Some(Notice::warning(MISSING_QUESTION));
        return render_page(&state, &view, StatusCode::OK);
    }

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            warn!("Advice requested without a valid measurement: {}", e);
            view.notice = Some(Notice::warning(MISSING_BMI));
            return render_page(&state, &view, StatusCode::UNPROCESSABLE_ENTITY);
        }
    };
    view.bmi = Some(result.into());

    match state.requester.request_advice(&result, Some(&question)).await {
        Ok(response) => {
            view.advice = Some(response.text);
            render_page(&state, &view, StatusCode::OK)
        }
        Err(e) => {
            error!(kind = e.kind(), "Advice request failed: {}", e);
            let status = status_for(&e);
            view.notice = Some(Notice::error(format!("Response failed: {}", e)));
            render_page(&state, &view, status)
        }
    }
}

/// JSON error body: `{"error": kind, "message": text}`.
pub struct ApiError(AdviceError);

impl<E: Into<AdviceError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status_for(&self.0), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    #[serde(flatten)]
    pub measurement: Measurement,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdviceReply {
    pub bmi: BmiView,
    pub advice: AdviceResponse,
}

// Unparseable bodies get the same JSON error shape as bad measurements.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(status = %rejection.status(), "Rejected JSON body: {}", rejection.body_text());
            Err(EvaluationError::MalformedBody {
                reason: rejection.body_text(),
            }
            .into())
        }
    }
}

async fn api_bmi_handler(
    payload: Result<Json<Measurement>, JsonRejection>,
) -> Result<Json<BmiView>, ApiError> {
    let result = json_body(payload)?.evaluate()?;
    Ok(Json(result.into()))
}

async fn api_advice_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdviceRequest>, JsonRejection>,
) -> Result<Json<AdviceReply>, ApiError> {
    let request = json_body(payload)?;
    let result = request.measurement.evaluate()?;
    let advice = state
        .requester
        .request_advice(&result, request.question.as_deref())
        .await
        .inspect_err(|e| error!(kind = e.kind(), "Advice request failed: {}", e))?;
    Ok(Json(AdviceReply {
        bmi: result.into(),
        advice,
    }))
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    // Serve static files from the configured directory
    let static_files_service = ServeDir::new(static_dir).not_found_service(tower::service_fn(|_| async {
        Ok::<_, Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
    }));

    Router::new()
        .route("/", get(index_handler))
        .route("/bmi", post(bmi_form_handler))
        .route("/advice", post(advice_form_handler))
        .route("/api/bmi", post(api_bmi_handler))
        .route("/api/advice", post(api_advice_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(config: ServeConfig, requester: AdviceRequester) -> Result<()> {
    let state = AppState::new(config.templates_dir.clone(), requester);
    let app = build_router(state, &config.static_dir);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .context(format!("Failed to bind to address {}", config.addr))?;
    info!(
        "Web server listening on http://{}",
        listener.local_addr().unwrap_or(config.addr)
    );

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
