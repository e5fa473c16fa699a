//! HTTP route handlers for the ListKeeper server.
//!
//! This module provides the HTML endpoints for managing lists and todos:
//!
//! - `GET /` - Redirect to `/lists`
//! - `GET /lists` - All lists, incomplete first
//! - `GET /lists/new` - New list form
//! - `POST /lists` - Create a list
//! - `GET /lists/{id}` - One list and its todos
//! - `GET /lists/{id}/edit` - Edit list form
//! - `POST /lists/{id}` - Rename a list
//! - `POST /lists/{id}/delete` - Delete a list
//! - `POST /lists/{id}/todos` - Add a todo
//! - `POST /lists/{id}/todos/{index}/delete` - Delete a todo
//! - `POST /lists/{id}/todos/{index}` - Set a todo's completed flag
//! - `POST /lists/{id}/complete_all` - Complete every todo in a list
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`]. Handlers reach
//! the caller's session through a [`SessionContext`], which the router
//! extracts from the request's cookie. Viewing pages never creates a
//! session; the visitor's first change does.
//!
//! `{id}` is a list's stable id; `{index}` is a todo's position within its
//! list. Both must parse as unsigned integers and refer to something that
//! exists, otherwise the handler answers 404.
//!
//! A successful mutation sets a flash message and redirects with
//! `303 See Other`. A validation failure re-renders the submitted form with
//! `422 Unprocessable Entity`; the lists are left unchanged and any pending
//! flash is dropped in favour of the error. A missing form body is treated
//! as an empty form.
//!
//! # Example
//!
//! ```rust,no_run
//! use listkeeper_server::config::Config;
//! use listkeeper_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config).expect("templates parse");
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{ServerError, Target, TodoError};
use crate::presentation::{list_summaries, ListDetail, ListSummary};
use crate::session::{session_cookie, token_from_cookies, SessionStore};
use crate::store::ListStore;
use crate::types::{Flash, SessionData};
use crate::views::{Page, Views};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Per-visitor session data.
    pub sessions: SessionStore,

    /// Parsed page templates.
    pub views: Arc<Views>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates a new application state with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::View`] if a built-in template fails to parse.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let sessions = SessionStore::new(config.session_store_config());
        Self::with_sessions(config, sessions)
    }

    /// Creates application state around an existing session store.
    ///
    /// Useful for testing, where the store is inspected directly.
    pub fn with_sessions(config: Config, sessions: SessionStore) -> Result<Self, ServerError> {
        Ok(Self {
            config: Arc::new(config),
            sessions,
            views: Arc::new(Views::new()?),
            start_time: Instant::now(),
        })
    }

    /// Renders `page` into a response with the given status.
    fn render(
        &self,
        status: StatusCode,
        page: Page,
        title: &str,
        data: &impl Serialize,
        flash: Option<&Flash>,
    ) -> Response {
        match self.views.render(page, title, data, flash) {
            Ok(html) => (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
                .into_response(),
            Err(err) => {
                error!(error = %err, page = page.name(), "Failed to render page");
                ServerError::from(err).into_response()
            }
        }
    }

    /// Renders the 404 page for a list or todo that does not exist.
    fn not_found(&self, err: &TodoError) -> Response {
        debug!(error = %err, "Resource not found");
        self.render(
            StatusCode::NOT_FOUND,
            Page::NotFound,
            "Not Found",
            &NotFoundView {
                message: err.to_string(),
            },
            None,
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/lists", get(get_lists).post(post_lists))
        .route("/lists/new", get(get_new_list))
        .route("/lists/{id}", get(get_list).post(post_list))
        .route("/lists/{id}/edit", get(get_edit_list))
        .route("/lists/{id}/delete", post(post_delete_list))
        .route("/lists/{id}/todos", post(post_todos))
        .route("/lists/{id}/todos/{index}", post(post_todo))
        .route("/lists/{id}/todos/{index}/delete", post(post_delete_todo))
        .route("/lists/{id}/complete_all", post(post_complete_all))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Session Context
// ============================================================================

/// The caller's session, resolved from the request cookie.
///
/// Extraction only reads the store. A visitor without a live session sees
/// pages rendered from empty [`SessionData`]; the session itself is created
/// by the first [`SessionContext::update`], and [`SessionContext::respond`]
/// then attaches the `Set-Cookie` header.
#[derive(Debug)]
pub struct SessionContext {
    store: SessionStore,
    config: Arc<Config>,
    token: Option<String>,
    set_cookie: Option<String>,
}

impl SessionContext {
    /// Returns `true` if the request carried a live session cookie or an
    /// update has since started a session.
    pub fn has_session(&self) -> bool {
        self.token.is_some()
    }

    /// Runs `f` against the session's data without creating a session.
    ///
    /// Visitors without a session get a throwaway, empty [`SessionData`].
    ///
    /// # Errors
    ///
    /// Fails only if the session expired since it was extracted.
    pub fn view<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> Result<R, ServerError> {
        match &self.token {
            Some(token) => Ok(self.store.with_session(token, f)?),
            None => Ok(f(&mut SessionData::default())),
        }
    }

    /// Runs `f` against the session's data, starting a session first if the
    /// visitor has none.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Session`] if the store is full, or if the
    /// session expired since it was extracted.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut SessionData) -> R) -> Result<R, ServerError> {
        let token = match self.token.clone() {
            Some(token) => token,
            None => self.start()?,
        };
        Ok(self.store.with_session(&token, f)?)
    }

    fn start(&mut self) -> Result<String, ServerError> {
        let token = self.store.create_session()?;
        self.set_cookie = Some(session_cookie(
            &self.config.cookie_name,
            &token,
            self.config.secure_cookie,
        ));
        self.token = Some(token.clone());
        info!(sessions = self.store.len(), "Started new session");
        Ok(token)
    }

    /// Finishes the request, attaching the session cookie if it is new.
    pub fn respond(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if let Some(cookie) = self.set_cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => error!(error = %err, "Session cookie is not a valid header value"),
            }
        }
        response
    }
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let store = state.sessions.clone();

        let token = match token_from_cookies(&parts.headers, &state.config.cookie_name) {
            Some(token) if store.is_valid(&token) => Some(token),
            Some(_) => {
                debug!("Ignoring unknown or expired session cookie");
                None
            }
            None => None,
        };

        Ok(Self {
            store,
            config: Arc::clone(&state.config),
            token,
            set_cookie: None,
        })
    }
}

// ============================================================================
// Request and View Types
// ============================================================================

/// Form body for creating or renaming a list.
#[derive(Debug, Default, Deserialize)]
pub struct ListNameForm {
    #[serde(default)]
    pub list_name: String,
}

/// Form body for adding a todo.
#[derive(Debug, Default, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub todo: String,
}

/// Form body for setting a todo's completed flag.
#[derive(Debug, Default, Deserialize)]
pub struct CompletedForm {
    #[serde(default)]
    pub completed: String,
}

impl CompletedForm {
    /// Only the literal `"true"` marks a todo completed.
    pub fn is_completed(&self) -> bool {
        self.completed == "true"
    }
}

#[derive(Debug, Serialize)]
struct ListsView {
    lists: Vec<ListSummary>,
}

#[derive(Debug, Serialize)]
struct NewListView {
    list_name: String,
}

#[derive(Debug, Serialize)]
struct ListView {
    list: ListDetail,
    todo: String,
}

#[derive(Debug, Serialize)]
struct EditListView {
    list: ListDetail,
    list_name: String,
}

#[derive(Debug, Serialize)]
struct NotFoundView {
    message: String,
}

/// Parses a path segment into an unsigned integer.
///
/// # Errors
///
/// Returns [`TodoError::InvalidIndex`] for anything that is not a
/// non-negative integer.
pub fn parse_index<T: std::str::FromStr>(raw: &str, target: Target) -> Result<T, TodoError> {
    raw.parse().map_err(|_| TodoError::invalid_index(target, raw))
}

/// Result of an operation that may fail validation.
enum Outcome<T> {
    Done,
    Invalid(TodoError, T),
}

fn list_url(id: u64) -> String {
    format!("/lists/{id}")
}

/// Without a session there are no lists, so every list id is unknown.
/// Answering before [`SessionContext::update`] keeps such posts from
/// creating empty sessions.
fn no_such_list(state: &AppState, raw_id: &str) -> Response {
    state.not_found(&TodoError::invalid_index(Target::List, raw_id))
}

/// A missing or unreadable form body counts as an empty form, so absent
/// fields fail validation (or clear a flag) instead of the extractor.
fn form_or_default<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable form body, treating it as empty");
            T::default()
        }
    }
}

// ============================================================================
// GET handlers
// ============================================================================

/// GET / - Redirect to the list index.
async fn get_root() -> Redirect {
    Redirect::to("/lists")
}

/// GET /lists - Render all lists, incomplete lists first.
async fn get_lists(State(state): State<AppState>, ctx: SessionContext) -> Response {
    let (flash, lists) = match ctx.view(|data| (data.take_flash(), list_summaries(&data.lists))) {
        Ok(found) => found,
        Err(err) => return ctx.respond(err),
    };

    let response = state.render(
        StatusCode::OK,
        Page::Lists,
        "Lists",
        &ListsView { lists },
        flash.as_ref(),
    );
    ctx.respond(response)
}

/// GET /lists/new - Render the new list form.
async fn get_new_list(State(state): State<AppState>, ctx: SessionContext) -> Response {
    let flash = match ctx.view(SessionData::take_flash) {
        Ok(flash) => flash,
        Err(err) => return ctx.respond(err),
    };

    let response = state.render(
        StatusCode::OK,
        Page::NewList,
        "New List",
        &NewListView {
            list_name: String::new(),
        },
        flash.as_ref(),
    );
    ctx.respond(response)
}

/// Looks up the list for `raw_id` and returns its detail plus the pending
/// flash. The flash is only consumed if the list exists.
fn load_list(ctx: &SessionContext, raw_id: &str) -> Result<Result<(ListDetail, Option<Flash>), TodoError>, ServerError> {
    ctx.view(|data| -> Result<(ListDetail, Option<Flash>), TodoError> {
        let id = parse_index(raw_id, Target::List)?;
        let store = ListStore::new(&mut data.lists);
        let detail = ListDetail::from_list(store.list(store.position_of(id)?)?);
        Ok((detail, data.take_flash()))
    })
}

/// GET /lists/{id} - Render one list and its todos.
async fn get_list(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<String>,
) -> Response {
    let response = match load_list(&ctx, &id) {
        Ok(Ok((list, flash))) => {
            let title = list.name.clone();
            state.render(
                StatusCode::OK,
                Page::List,
                &title,
                &ListView {
                    list,
                    todo: String::new(),
                },
                flash.as_ref(),
            )
        }
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// GET /lists/{id}/edit - Render the edit form for one list.
async fn get_edit_list(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<String>,
) -> Response {
    let response = match load_list(&ctx, &id) {
        Ok(Ok((list, flash))) => {
            let list_name = list.name.clone();
            state.render(
                StatusCode::OK,
                Page::EditList,
                "Edit List",
                &EditListView { list, list_name },
                flash.as_ref(),
            )
        }
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

// ============================================================================
// POST handlers
// ============================================================================

/// POST /lists - Create a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists` on success
/// - `422 Unprocessable Entity` with the form re-rendered on a bad name
async fn post_lists(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    form: Result<Form<ListNameForm>, FormRejection>,
) -> Response {
    let form = form_or_default(form);
    let name = form.list_name.trim().to_string();

    let result = ctx.update(|data| {
        let created = ListStore::new(&mut data.lists).create_list(&name);
        match created {
            Ok(_) => data.set_flash(Flash::success("The list has been created.")),
            // The error is shown on this render; an older message is stale.
            Err(_) => {
                data.take_flash();
            }
        }
        created
    });

    let response = match result {
        Ok(Ok(id)) => {
            info!(list_id = id, "List created");
            Redirect::to("/lists").into_response()
        }
        Ok(Err(err)) => {
            debug!(error = %err, "Rejected new list");
            state.render(
                StatusCode::UNPROCESSABLE_ENTITY,
                Page::NewList,
                "New List",
                &NewListView { list_name: name },
                Some(&Flash::error(err.to_string())),
            )
        }
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// POST /lists/{id} - Rename a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists/{id}` on success
/// - `404 Not Found` if the list does not exist
/// - `422 Unprocessable Entity` with the edit form re-rendered on a bad name
async fn post_list(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Path(id): Path<String>,
    form: Result<Form<ListNameForm>, FormRejection>,
) -> Response {
    if !ctx.has_session() {
        return ctx.respond(no_such_list(&state, &id));
    }

    let form = form_or_default(form);
    let name = form.list_name.trim().to_string();

    let result = ctx.update(|data| -> Result<(u64, Outcome<ListDetail>), TodoError> {
        let id = parse_index(&id, Target::List)?;
        let mut store = ListStore::new(&mut data.lists);
        let index = store.position_of(id)?;

        match store.rename_list(index, &name) {
            Ok(()) => {
                data.set_flash(Flash::success("The list name has been updated."));
                Ok((id, Outcome::Done))
            }
            Err(err) if err.is_validation() => {
                let detail = ListDetail::from_list(store.list(index)?);
                data.take_flash();
                Ok((id, Outcome::Invalid(err, detail)))
            }
            Err(err) => Err(err),
        }
    });

    let response = match result {
        Ok(Ok((id, Outcome::Done))) => Redirect::to(&list_url(id)).into_response(),
        Ok(Ok((_, Outcome::Invalid(err, list)))) => {
            debug!(error = %err, list_id = list.id, "Rejected list rename");
            state.render(
                StatusCode::UNPROCESSABLE_ENTITY,
                Page::EditList,
                "Edit List",
                &EditListView {
                    list,
                    list_name: name,
                },
                Some(&Flash::error(err.to_string())),
            )
        }
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// POST /lists/{id}/delete - Delete a list.
async fn post_delete_list(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Path(id): Path<String>,
) -> Response {
    if !ctx.has_session() {
        return ctx.respond(no_such_list(&state, &id));
    }

    let result = ctx.update(|data| {
        let id = parse_index(&id, Target::List)?;
        let mut store = ListStore::new(&mut data.lists);
        let index = store.position_of(id)?;
        let removed = store.delete_list(index)?;
        data.set_flash(Flash::success("The list has been deleted."));
        Ok::<_, TodoError>(removed)
    });

    let response = match result {
        Ok(Ok(removed)) => {
            info!(list_id = removed.id, todo_count = removed.todos.len(), "List deleted");
            Redirect::to("/lists").into_response()
        }
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// POST /lists/{id}/todos - Add a todo to a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists/{id}` on success
/// - `404 Not Found` if the list does not exist
/// - `422 Unprocessable Entity` with the list page re-rendered on a bad name
async fn post_todos(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Path(id): Path<String>,
    form: Result<Form<TodoForm>, FormRejection>,
) -> Response {
    if !ctx.has_session() {
        return ctx.respond(no_such_list(&state, &id));
    }

    let form = form_or_default(form);
    let name = form.todo.trim().to_string();

    let result = ctx.update(|data| -> Result<(u64, Outcome<ListDetail>), TodoError> {
        let id = parse_index(&id, Target::List)?;
        let mut store = ListStore::new(&mut data.lists);
        let index = store.position_of(id)?;

        match store.add_todo(index, &name) {
            Ok(()) => {
                data.set_flash(Flash::success("The todo was added."));
                Ok((id, Outcome::Done))
            }
            Err(err) if err.is_validation() => {
                let detail = ListDetail::from_list(store.list(index)?);
                data.take_flash();
                Ok((id, Outcome::Invalid(err, detail)))
            }
            Err(err) => Err(err),
        }
    });

    let response = match result {
        Ok(Ok((id, Outcome::Done))) => Redirect::to(&list_url(id)).into_response(),
        Ok(Ok((_, Outcome::Invalid(err, list)))) => {
            debug!(error = %err, list_id = list.id, "Rejected new todo");
            let title = list.name.clone();
            state.render(
                StatusCode::UNPROCESSABLE_ENTITY,
                Page::List,
                &title,
                &ListView { list, todo: name },
                Some(&Flash::error(err.to_string())),
            )
        }
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// Applies `op` to the list addressed by `raw_id` and the todo addressed by
/// `raw_index`, then redirects back to the list.
fn mutate_todo(
    state: &AppState,
    mut ctx: SessionContext,
    raw_id: &str,
    raw_index: &str,
    message: &str,
    op: impl FnOnce(&mut ListStore<'_>, usize, usize) -> Result<(), TodoError>,
) -> Response {
    if !ctx.has_session() {
        return ctx.respond(no_such_list(state, raw_id));
    }

    let result = ctx.update(|data| {
        let id = parse_index(raw_id, Target::List)?;
        let todo_index = parse_index(raw_index, Target::Todo)?;
        let mut store = ListStore::new(&mut data.lists);
        let index = store.position_of(id)?;
        op(&mut store, index, todo_index)?;
        data.set_flash(Flash::success(message));
        Ok::<_, TodoError>(id)
    });

    let response = match result {
        Ok(Ok(id)) => Redirect::to(&list_url(id)).into_response(),
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

/// POST /lists/{id}/todos/{index}/delete - Delete a todo.
async fn post_delete_todo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((id, index)): Path<(String, String)>,
) -> Response {
    mutate_todo(
        &state,
        ctx,
        &id,
        &index,
        "The todo has been deleted.",
        |store, list, todo| store.delete_todo(list, todo).map(drop),
    )
}

/// POST /lists/{id}/todos/{index} - Set a todo's completed flag.
///
/// The todo is marked completed only when the form's `completed` field is
/// exactly `"true"`; any other value clears the flag.
async fn post_todo(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((id, index)): Path<(String, String)>,
    form: Result<Form<CompletedForm>, FormRejection>,
) -> Response {
    let form = form_or_default(form);
    let completed = form.is_completed();
    mutate_todo(
        &state,
        ctx,
        &id,
        &index,
        "The todo has been updated.",
        |store, list, todo| store.set_todo_completed(list, todo, completed),
    )
}

/// POST /lists/{id}/complete_all - Complete every todo in a list.
async fn post_complete_all(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Path(id): Path<String>,
) -> Response {
    if !ctx.has_session() {
        return ctx.respond(no_such_list(&state, &id));
    }

    let result = ctx.update(|data| {
        let id = parse_index(&id, Target::List)?;
        let mut store = ListStore::new(&mut data.lists);
        let index = store.position_of(id)?;
        store.complete_all(index)?;
        data.set_flash(Flash::success("All todos have been completed."));
        Ok::<_, TodoError>(id)
    });

    let response = match result {
        Ok(Ok(id)) => Redirect::to(&list_url(id)).into_response(),
        Ok(Err(err)) => state.not_found(&err),
        Err(err) => err.into_response(),
    };
    ctx.respond(response)
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of sessions currently held in memory.
    pub sessions: usize,

    /// Sessions past their TTL that the next sweep will remove.
    pub expired_sessions: usize,

    /// New sessions the store can still accept.
    pub available_capacity: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
///
/// Does not touch or create a session.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions.len(),
        expired_sessions: state.sessions.count_expired(),
        available_capacity: state.sessions.available_capacity(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
