use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{delete, get},
};
use std::collections::HashMap;

use crate::{
    auth::CurrentUser,
    error::Result,
    note_models::{NoteForm, PageNumber, SearchForm},
    server::AppState,
};

pub fn create_dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route(
            "/dashboard/view-note/{id}",
            get(view_note).put(update_note),
        )
        .route("/dashboard/delete-note/{id}", delete(delete_note))
        .route("/dashboard/add", get(add_note).post(add_note_submit))
        .route("/dashboard/search", get(search).post(search_submit))
}

// page は数値でなくてもエラーにせず1ページ目を表示する
async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Html<String>> {
    let page = PageNumber::parse(query.get("page").map(String::as_str));
    let notes = state.note_service.list_notes(&user.id, page).await?;
    state.views.dashboard(&user, &notes)
}

async fn view_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let note = state.note_service.get_note(&id, &user.id).await?;
    state.views.view_note(&note)
}

async fn update_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<NoteForm>,
) -> Result<Redirect> {
    state.note_service.update_note(&id, &user.id, form).await?;
    Ok(Redirect::to("/dashboard"))
}

async fn delete_note(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Redirect> {
    state.note_service.delete_note(&id, &user.id).await?;
    Ok(Redirect::to("/dashboard"))
}

async fn add_note(State(state): State<AppState>, _user: CurrentUser) -> Result<Html<String>> {
    state.views.add_note()
}

async fn add_note_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NoteForm>,
) -> Result<Redirect> {
    state.note_service.create_note(&user.id, form).await?;
    Ok(Redirect::to("/dashboard"))
}

async fn search(State(state): State<AppState>, _user: CurrentUser) -> Result<Html<String>> {
    state.views.search(None)
}

async fn search_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<SearchForm>,
) -> Result<Html<String>> {
    let results = state
        .note_service
        .search_notes(&user.id, &form.search_term)
        .await?;
    state.views.search(Some(&results))
}
