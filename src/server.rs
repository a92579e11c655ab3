use axum::{Router, middleware};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::{create_decoding_key, create_encoding_key, resolve_secret_key};
use crate::config::Config;
use crate::error::Result;
use crate::repositories::NoteRepository;
use crate::routes::{
    create_auth_routes, create_dashboard_routes, create_dev_login_routes, method_override,
};
use crate::services::NoteService;
use crate::views::Views;

/// アプリケーション全体で共有される状態
#[derive(Clone)]
pub struct AppState {
    /// サービス層
    pub note_service: Arc<NoteService>,
    pub views: Arc<Views>,
    pub jwt_encoding_key: Arc<EncodingKey>,
    pub jwt_decoding_key: Arc<DecodingKey>,
    /// アプリケーション設定
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, note_repo: Arc<dyn NoteRepository>) -> Result<Self> {
        let secret = resolve_secret_key(&config)?;

        Ok(Self {
            note_service: Arc::new(NoteService::new(note_repo)),
            views: Arc::new(Views::new()?),
            jwt_encoding_key: Arc::new(create_encoding_key(&secret)),
            jwt_decoding_key: Arc::new(create_decoding_key(&secret)),
            config: Arc::new(config),
        })
    }
}

/// ルーター全体を組み立てる
///
/// メソッドの書き換えはルーティングより前に行う必要があるため、実際のルーターは
/// 外側のルーターのフォールバックとして包む。
pub fn create_app(state: AppState) -> Router {
    let mut routes = Router::new()
        .merge(create_auth_routes())
        .merge(create_dashboard_routes());

    if state.config.dev_login_enabled() {
        tracing::warn!("/auth/dev-login is enabled; anyone can sign in as any user");
        routes = routes.merge(create_dev_login_routes());
    }

    let inner = routes.with_state(state);

    Router::new()
        .fallback_service(inner)
        .layer(middleware::from_fn(method_override))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    tracing::info!("Creating routes...");
    let app = create_app(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server is running on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
