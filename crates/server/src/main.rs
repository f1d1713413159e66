use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{ProfileId, ViewChange},
    error::{ApiError, ErrorCode},
};
use showcase_api::{
    list_profiles, profile_view, select_profile, selectable_names, submit_comment,
    submit_session_profile, ApiContext,
};
use storage::{Storage, DEFAULT_DATABASE_URL};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod forms;
mod pages;
mod session;

use app_state::AppState;
use config::load_settings;
use forms::{read_create_form, CommentForm, CreateAction};
use pages::{BrowsePage, CreatePage, Notice, Pages, ProfileFormValues, BROWSE_PAGE, CREATE_PAGE};
use session::resolve_session;

const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct BrowseQuery {
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let storage = Storage::new(DEFAULT_DATABASE_URL).await.map_err(|error| {
        error!(
            database_url = DEFAULT_DATABASE_URL,
            %error,
            "failed to open SQLite database; verify the working directory is writable"
        );
        error
    })?;
    let pages = Pages::load()?;

    let state = AppState {
        api: ApiContext::new(storage),
        pages,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "showcase listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/create", get(create_page).post(create_submit))
        .route("/profiles", get(browse_page))
        .route("/profiles/:profile_id", get(browse_profile))
        .route("/profiles/:profile_id/comments", post(post_comment))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn index() -> Redirect {
    Redirect::to("/create")
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn create_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let (session, cookie) = resolve_session(&headers);
    let page = CreatePage {
        form: ProfileFormValues::default(),
        today: today().to_string(),
        drafts: state.api.drafts.snapshot(session).await,
        picture_kept: state.api.drafts.picture_kept(session).await,
        notice: None,
    };
    render(&state, CREATE_PAGE, &page, StatusCode::OK, cookie)
}

async fn create_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let (session, cookie) = resolve_session(&headers);
    let mut form = read_create_form(multipart).await?;

    let outcome = match form.action() {
        CreateAction::AddEvent => {
            if let Some(picture) = form.picture.take() {
                state.api.drafts.keep_picture(session, picture).await;
            }
            let added = match form.event_input() {
                Ok(input) => state.api.drafts.add(session, input, today()).await,
                Err(err) => Err(err),
            };
            added.map(|_| (Notice::success("Event added!"), form.values_after_draft()))
        }
        CreateAction::Submit => {
            let submission = form.submission();
            submit_session_profile(&state.api, session, submission)
                .await
                .map(|profile_id| {
                    info!(profile_id = profile_id.0, "profile form committed");
                    (
                        Notice::success("Your profile has been submitted!"),
                        ProfileFormValues::default(),
                    )
                })
        }
    };

    let (status, notice, values) = match outcome {
        Ok((notice, values)) => (StatusCode::OK, notice, values),
        Err(err) if err.is_validation() => {
            (StatusCode::BAD_REQUEST, Notice::error(err.message), form.values)
        }
        Err(err) => return Err(err.into()),
    };

    let page = CreatePage {
        form: values,
        today: today().to_string(),
        drafts: state.api.drafts.snapshot(session).await,
        picture_kept: state.api.drafts.picture_kept(session).await,
        notice: Some(notice),
    };
    render(&state, CREATE_PAGE, &page, status, cookie)
}

async fn browse_page(
    State(state): State<Arc<AppState>>,
    Query(q): Query<BrowseQuery>,
) -> Result<Response, PageError> {
    let profiles = list_profiles(&state.api).await?;
    let name = q.name.as_deref().filter(|name| !name.is_empty());
    let profile = select_profile(&state.api, name).await?;
    let page = BrowsePage::new(selectable_names(&profiles), profile);
    render(&state, BROWSE_PAGE, &page, StatusCode::OK, None)
}

async fn browse_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
) -> Result<Response, PageError> {
    let profiles = list_profiles(&state.api).await?;
    let profile = profile_view(&state.api, ProfileId(profile_id)).await?;
    let page = BrowsePage::new(selectable_names(&profiles), Some(profile));
    render(&state, BROWSE_PAGE, &page, StatusCode::OK, None)
}

async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let profile_id = ProfileId(profile_id);
    let profile = profile_view(&state.api, profile_id).await?;
    let comment = forms::normalize_newlines(&form.comment);

    match submit_comment(&state.api, profile_id, &comment, form.rating).await {
        Ok(ViewChange::Refresh) => {
            Ok(Redirect::to(&format!("/profiles/{}", profile_id.0)).into_response())
        }
        Err(err) if err.is_validation() => {
            let profiles = list_profiles(&state.api).await?;
            let mut page = BrowsePage::new(selectable_names(&profiles), Some(profile));
            page.comment = comment;
            page.notice = Some(Notice::error(err.message));
            render(&state, BROWSE_PAGE, &page, StatusCode::BAD_REQUEST, None)
        }
        Err(err) => Err(err.into()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn render<T: Serialize>(
    state: &AppState,
    template: &str,
    page: &T,
    status: StatusCode,
    cookie: Option<HeaderValue>,
) -> Result<Response, PageError> {
    let html = state.pages.render(template, page)?;
    let mut response = (status, Html(html)).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Failures that replace the whole page rather than showing inline.
#[derive(Debug)]
enum PageError {
    Api(ApiError),
    Render(anyhow::Error),
}

impl From<ApiError> for PageError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(value: anyhow::Error) -> Self {
        Self::Render(value)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Api(err) => match err.code {
                ErrorCode::Validation => (StatusCode::BAD_REQUEST, err.message),
                ErrorCode::NotFound => (StatusCode::NOT_FOUND, err.message),
                ErrorCode::Internal => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                ),
            },
            Self::Render(error) => {
                error!(%error, "page rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };
        if status.is_client_error() {
            warn!(%status, %message, "request rejected");
        }
        let body = format!(
            "<!DOCTYPE html><html><body><h1>{}</h1><p>{}</p><p><a href=\"/profiles\">Back</a></p></body></html>",
            status,
            tera::escape_html(&message)
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
