use axum::{
    extract::{Query, Request},
    http::Method,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

mod auth;
mod dashboard;

pub use auth::{create_auth_routes, create_dev_login_routes};
pub use dashboard::create_dashboard_routes;

#[derive(Deserialize)]
struct MethodOverride {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// HTMLフォームはGET/POSTしか送れないため、`POST ...?_method=PUT` のようなリクエストの
/// メソッドをルーティング前に書き換える
pub async fn method_override(mut req: Request, next: Next) -> Response {
    if req.method() == Method::POST {
        let requested = Query::<MethodOverride>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(o)| o.method);

        if let Some(method) = requested {
            match method.to_ascii_uppercase().as_str() {
                "PUT" => *req.method_mut() = Method::PUT,
                "PATCH" => *req.method_mut() = Method::PATCH,
                "DELETE" => *req.method_mut() = Method::DELETE,
                other => tracing::debug!(method = other, "ignoring unsupported method override"),
            }
        }
    }

    next.run(req).await
}
