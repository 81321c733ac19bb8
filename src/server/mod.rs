//! HTTP server: web UI and JSON API
//!
//! Routes:
//!   GET    /                       - Web UI
//!   GET    /health                 - Health check
//!   GET    /api/info               - Providers, models, layout options
//!   POST   /api/generate/syllabus  - Sheet from an uploaded textbook
//!   POST   /api/generate/free      - Revision notes for a free topic
//!   POST   /api/export             - Render a sheet to PDF
//!   GET    /api/templates          - List saved templates
//!   GET    /api/templates/:name    - Load a template
//!   PUT    /api/templates/:name    - Save a template
//!   DELETE /api/templates/:name    - Delete a template

pub mod state;

pub use state::AppState;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::{ProviderKind, TOC_PAGES_MAX};
use crate::error::FicheError;
use crate::extract::decode_upload;
use crate::llm::connect;
use crate::pipeline::{FreeTopicRequest, Generator, SyllabusRequest};
use crate::prompts::Audience;
use crate::sheet::style::{FONT_SIZE_RANGE, LINE_SPACING_RANGE, MARGIN_RANGE};
use crate::sheet::{pdf_file_name, render_sheet, BaseTemplate, CoverMeta, PdfStyle};

/// Upload limit; textbooks arrive base64-encoded inside JSON
pub const BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Provider selection sent with every generation request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderChoice {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    /// Key typed in the UI; overrides the environment
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateSyllabusBody {
    /// The textbook, base64 or a `data:` URL
    pub pdf_base64: String,
    pub toc_pages: Option<usize>,
    #[serde(flatten)]
    pub request: SyllabusRequest,
    #[serde(flatten)]
    pub llm: ProviderChoice,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateFreeBody {
    #[serde(flatten)]
    pub request: FreeTopicRequest,
    #[serde(flatten)]
    pub llm: ProviderChoice,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportBody {
    pub markdown: String,
    pub audience: Audience,
    pub file_base: String,
    /// Explicit style; wins over `template`
    pub style: Option<PdfStyle>,
    /// Name of a saved template
    pub template: Option<String>,
    pub cover: Option<CoverMeta>,
}

/// Map a failure to a status code and `{"error": ...}` body.
pub fn error_response(err: &FicheError) -> (StatusCode, Json<Value>) {
    let status = match err {
        FicheError::AuthFailed { .. } => StatusCode::UNAUTHORIZED,
        FicheError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
        FicheError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        FicheError::Provider { .. } | FicheError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}", err);
    } else {
        warn!("{}", err);
    }
    (status, Json(json!({ "error": err.to_string() })))
}

/// Unwrap a JSON body, turning extractor rejections into [`FicheError`]s.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, FicheError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => Err(FicheError::PayloadTooLarge),
        Err(rejection) => Err(FicheError::InvalidRequest(rejection.body_text())),
    }
}

fn info_body(state: &AppState) -> Value {
    let providers: Vec<Value> = ProviderKind::all()
        .into_iter()
        .map(|kind| {
            json!({
                "id": kind,
                "name": kind.name(),
                "env_var": kind.env_var(),
                "models": kind.models(),
                "default_model": if kind == ProviderKind::OpenRouter {
                    state.config.openrouter_model.clone()
                } else {
                    kind.default_model().to_string()
                },
                "has_key": state.keys.has(kind),
            })
        })
        .collect();
    let templates: Vec<Value> = BaseTemplate::all()
        .into_iter()
        .map(|t| json!({ "id": t, "label": t.label() }))
        .collect();

    json!({
        "app_name": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "default_provider": state.config.provider,
        "providers": providers,
        "toc_pages": { "default": state.config.toc_pages, "max": TOC_PAGES_MAX },
        "base_templates": templates,
        "default_style": PdfStyle::default(),
        "ranges": {
            "margins": MARGIN_RANGE,
            "base_font_size": FONT_SIZE_RANGE,
            "line_spacing": LINE_SPACING_RANGE,
        },
        "unicode_fonts": state.fonts.is_unicode(),
    })
}

async fn generate_syllabus(state: &AppState, body: GenerateSyllabusBody) -> Result<Value, FicheError> {
    if body.pdf_base64.trim().is_empty() {
        return Err(FicheError::MissingField { field: "manuel PDF" });
    }
    let pdf = decode_upload(&body.pdf_base64)?;
    info!("Syllabus request: '{}' ({}), {} bytes", body.request.topic, body.request.class_level, pdf.len());

    let provider = connect(
        body.llm.provider.unwrap_or(state.config.provider),
        &state.keys,
        body.llm.api_key.as_deref(),
        body.llm.model.as_deref().or(Some(state.config.openrouter_model.as_str())),
        &state.config,
    )?;
    let toc_pages = body.toc_pages.unwrap_or(state.config.toc_pages).clamp(1, TOC_PAGES_MAX);

    let sheet = Generator::new(provider.as_ref(), toc_pages)
        .from_syllabus(&pdf, &body.request)
        .await?;
    Ok(json!(sheet))
}

async fn generate_free(state: &AppState, body: GenerateFreeBody) -> Result<Value, FicheError> {
    info!("Free topic request: '{}' ({})", body.request.topic, body.request.subject);
    let provider = connect(
        body.llm.provider.unwrap_or(state.config.provider),
        &state.keys,
        body.llm.api_key.as_deref(),
        body.llm.model.as_deref().or(Some(state.config.openrouter_model.as_str())),
        &state.config,
    )?;

    let sheet = Generator::new(provider.as_ref(), state.config.toc_pages)
        .free_topic(&body.request)
        .await?;
    Ok(json!(sheet))
}

async fn export(state: Arc<AppState>, body: ExportBody) -> Result<Response, FicheError> {
    if body.markdown.trim().is_empty() {
        return Err(FicheError::MissingField { field: "contenu de la fiche" });
    }
    let style = match (body.style, body.template.as_deref()) {
        (Some(style), _) => style.normalized(),
        (None, Some(name)) if !name.trim().is_empty() => state.templates.load(name)?,
        _ => PdfStyle::default(),
    };
    let file_base = if body.file_base.trim().is_empty() {
        "Fiche".to_string()
    } else {
        body.file_base.trim().to_string()
    };
    let cover = body.cover.unwrap_or_default().or_defaults(&file_base);

    let markdown = body.markdown;
    let audience = body.audience;
    let bytes = tokio::task::spawn_blocking(move || {
        render_sheet(&markdown, audience, &style, &cover, &state.fonts)
    })
    .await
    .map_err(|e| FicheError::Internal(format!("Render task failed: {}", e)))??;
    info!("Exported {} ({} bytes)", file_base, bytes.len());

    let file_name = pdf_file_name(&file_base);
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_file_name(&file_name),
        percent_encode(&file_name)
    );
    let disposition =
        HeaderValue::from_str(&disposition).unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn ascii_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect()
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/info", get({
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move { (StatusCode::OK, Json(info_body(&state))) }
            }
        }))
        .route("/generate/syllabus", post({
            let state = Arc::clone(&state);
            move |payload: Result<Json<GenerateSyllabusBody>, JsonRejection>| {
                let state = Arc::clone(&state);
                async move {
                    let result = match json_body(payload) {
                        Ok(body) => generate_syllabus(&state, body).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(sheet) => (StatusCode::OK, Json(sheet)),
                        Err(e) => error_response(&e),
                    }
                }
            }
        }))
        .route("/generate/free", post({
            let state = Arc::clone(&state);
            move |payload: Result<Json<GenerateFreeBody>, JsonRejection>| {
                let state = Arc::clone(&state);
                async move {
                    let result = match json_body(payload) {
                        Ok(body) => generate_free(&state, body).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(sheet) => (StatusCode::OK, Json(sheet)),
                        Err(e) => error_response(&e),
                    }
                }
            }
        }))
        .route("/export", post({
            let state = Arc::clone(&state);
            move |payload: Result<Json<ExportBody>, JsonRejection>| {
                let state = Arc::clone(&state);
                async move {
                    let result = match json_body(payload) {
                        Ok(body) => export(state, body).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(response) => response,
                        Err(e) => error_response(&e).into_response(),
                    }
                }
            }
        }))
        .route("/templates", get({
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    match state.templates.list() {
                        Ok(names) => (StatusCode::OK, Json(json!({ "templates": names }))),
                        Err(e) => error_response(&e),
                    }
                }
            }
        }))
        .route(
            "/templates/:name",
            get({
                let state = Arc::clone(&state);
                move |Path(name): Path<String>| {
                    let state = Arc::clone(&state);
                    async move {
                        match state.templates.load(&name) {
                            Ok(style) => (StatusCode::OK, Json(json!({ "name": name, "style": style }))),
                            Err(e) => error_response(&e),
                        }
                    }
                }
            })
            .put({
                let state = Arc::clone(&state);
                move |Path(name): Path<String>, payload: Result<Json<PdfStyle>, JsonRejection>| {
                    let state = Arc::clone(&state);
                    async move {
                        let result = json_body(payload).and_then(|style| state.templates.save(&name, &style));
                        match result {
                            Ok(_) => (StatusCode::OK, Json(json!({ "saved": name.trim() }))),
                            Err(e) => error_response(&e),
                        }
                    }
                }
            })
            .delete({
                let state = Arc::clone(&state);
                move |Path(name): Path<String>| {
                    let state = Arc::clone(&state);
                    async move {
                        match state.templates.delete(&name) {
                            Ok(()) => (StatusCode::OK, Json(json!({ "deleted": name.trim() }))),
                            Err(e) => error_response(&e),
                        }
                    }
                }
            }),
        );

    Router::new()
        .route("/", get(|| async { Html(include_str!("../../web/index.html")) }))
        .route("/style.css", get(|| async {
            (
                [(header::CONTENT_TYPE, "text/css")],
                include_str!("../../web/style.css"),
            )
        }))
        .route("/app.js", get(|| async {
            (
                [(header::CONTENT_TYPE, "application/javascript")],
                include_str!("../../web/app.js"),
            )
        }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// Run the HTTP server until interrupted
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let port = state.config.port;
    let app = router(Arc::new(state));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            eprintln!("\n\x1b[31mError:\x1b[0m Port {} is already in use.\n", port);
            eprintln!("Try a different port with:");
            eprintln!("  \x1b[36mfichegen serve --port <PORT>\x1b[0m\n");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Server running on http://{}", addr);
    println!("\nAPI Endpoints:");
    println!("  GET    /health                  - Health check");
    println!("  GET    /api/info                - Providers, models, layout options");
    println!("  POST   /api/generate/syllabus   - Sheet from a PDF textbook");
    println!("  POST   /api/generate/free       - Revision notes for a free topic");
    println!("  POST   /api/export              - Render a sheet to PDF");
    println!("  GET    /api/templates           - List saved templates");
    println!("  GET    /api/templates/:name     - Load a template");
    println!("  PUT    /api/templates/:name     - Save a template");
    println!("  DELETE /api/templates/:name     - Delete a template");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeys, Config};
    use crate::sheet::FontSet;
    use crate::templates::TemplateStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn test_app() -> (Router, TempDir) {
        let dir = tempdir().unwrap();
        let state = AppState {
            config: Config::default(),
            keys: ApiKeys::default(),
            templates: TemplateStore::open(dir.path().join("templates")).unwrap(),
            fonts: FontSet::builtin(),
        };
        (router(Arc::new(state)), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>, Option<String>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), content_type)
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ui() {
        let (app, _dir) = test_app();
        let (status, body, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (status, _, content_type) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_info_lists_providers() {
        let (app, _dir) = test_app();
        let (status, body, _) = send(&app, "GET", "/api/info", None).await;
        assert_eq!(status, StatusCode::OK);
        let info = json_of(&body);
        assert_eq!(info["providers"][0]["id"], "openrouter");
        assert_eq!(info["providers"][1]["default_model"], crate::config::GEMINI_MODEL);
        assert_eq!(info["toc_pages"]["max"], TOC_PAGES_MAX);
        assert_eq!(info["base_templates"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_template_crud() {
        let (app, _dir) = test_app();
        let style = json!({ "base_template": "pro", "orientation": "L" });

        let (status, _, _) = send(&app, "PUT", "/api/templates/Paysage", Some(style)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body, _) = send(&app, "GET", "/api/templates", None).await;
        assert_eq!(json_of(&body)["templates"], json!(["Paysage"]));

        let (status, body, _) = send(&app, "GET", "/api/templates/Paysage", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["style"]["base_template"], "pro");

        let (status, _, _) = send(&app, "DELETE", "/api/templates/Paysage", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body, _) = send(&app, "GET", "/api/templates/Paysage", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("Paysage"));
    }

    #[tokio::test]
    async fn test_invalid_template_name() {
        let (app, _dir) = test_app();
        let (status, _, _) = send(&app, "PUT", "/api/templates/%2F%2F", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_returns_pdf() {
        let (app, _dir) = test_app();
        let body = json!({
            "markdown": "## Les Idées Clés\n- Le cœur pompe le sang.\n",
            "audience": "student",
            "file_base": "Fiche_Le_cœur",
            "style": { "base_template": "study", "show_cover": true },
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"Fiche_Le_c"));
        assert!(disposition.contains("filename*=UTF-8''Fiche_Le_c%C5%93ur.pdf"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_export_with_missing_template() {
        let (app, _dir) = test_app();
        let body = json!({ "markdown": "Bonjour", "template": "absent" });
        let (status, _, _) = send(&app, "POST", "/api/export", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_empty_markdown() {
        let (app, _dir) = test_app();
        let (status, body, _) = send(&app, "POST", "/api/export", Some(json!({ "markdown": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("contenu"));
    }

    #[tokio::test]
    async fn test_generate_free_without_key() {
        let (app, _dir) = test_app();
        let body = json!({
            "topic": "Les volcans",
            "class_level": "6ème",
            "country": "Maroc",
            "subject": "SVT",
            "provider": "gemini",
        });
        let (status, body, _) = send(&app, "POST", "/api/generate/free", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_generate_syllabus_rejects_bad_upload() {
        let (app, _dir) = test_app();
        let (status, _, _) = send(&app, "POST", "/api/generate/syllabus", Some(json!({ "topic": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({ "pdf_base64": "aGVsbG8=", "topic": "x", "class_level": "CP" });
        let (status, body, _) = send(&app, "POST", "/api/generate/syllabus", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("Fichier invalide"));
    }

    #[tokio::test]
    async fn test_generate_free_rejects_unknown_provider_with_json_error() {
        let (app, _dir) = test_app();
        let body = json!({
            "topic": "Les volcans",
            "class_level": "6ème",
            "country": "Maroc",
            "subject": "SVT",
            "provider": "claude",
        });
        let (status, body, content_type) = send(&app, "POST", "/api/generate/free", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert!(json_of(&body)["error"].as_str().unwrap().starts_with("Requête invalide"));
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_body() {
        let (app, _dir) = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ pas du json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(json_of(&bytes)["error"].as_str().unwrap().starts_with("Requête invalide"));
    }

    #[tokio::test]
    async fn test_template_put_rejects_bad_style() {
        let (app, _dir) = test_app();
        let (status, body, _) = send(&app, "PUT", "/api/templates/cours", Some(json!({ "page_format": "A0" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].is_string());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (FicheError::EmptyToc, StatusCode::BAD_REQUEST),
            (
                FicheError::AuthFailed { provider: "OpenRouter", status: 401, hint: "" },
                StatusCode::UNAUTHORIZED,
            ),
            (
                FicheError::Provider { provider: "Gemini", message: "quota".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (FicheError::InvalidRequest("json".into()), StatusCode::BAD_REQUEST),
            (FicheError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (FicheError::Internal("io".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).0, expected, "{err:?}");
        }
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("Fiche_é.pdf"), "Fiche_%C3%A9.pdf");
        assert_eq!(ascii_file_name("Fiche_é.pdf"), "Fiche__.pdf");
    }
}
