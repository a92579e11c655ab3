use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::{
    auth::{ACCESS_TOKEN_COOKIE, issue_access_token},
    error::{AppError, Result},
    server::AppState,
};

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/logout", get(handle_logout))
}

/// 任意のIDでログインできる開発用ルート。`server.dev_login` が有効なときだけ組み込む
pub fn create_dev_login_routes() -> Router<AppState> {
    Router::new().route("/auth/dev-login", get(handle_dev_login))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevLoginQuery {
    id: String,
    #[serde(default)]
    first_name: String,
}

// 指定したIDでアクセストークンを発行し、Cookieに入れてダッシュボードへ
async fn handle_dev_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<DevLoginQuery>,
) -> Result<impl IntoResponse> {
    let id = query.id.trim();
    if id.is_empty() {
        return Err(AppError::ValidationError("id must not be empty".to_string()));
    }

    let token = issue_access_token(id, &query.first_name, &state.jwt_encoding_key)?;
    tracing::info!(user_id = %id, "issued development access token");

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(false) // 開発用なのでhttpを許可
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to("/dashboard")))
}

async fn handle_logout(jar: CookieJar) -> impl IntoResponse {
    let mut cookie = Cookie::from(ACCESS_TOKEN_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), Redirect::to("/"))
}
