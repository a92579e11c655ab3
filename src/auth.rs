use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::server::AppState;

/// アクセストークンを入れるCookie名
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

const JWT_ISSUER: &str = "notes-dashboard";
const JWT_AUDIENCE: &str = "notes-dashboard";

// JWTヘッダー
static JWT_ALGORITHM: Algorithm = Algorithm::HS256;

//////
// 共通鍵（HMAC）関係の実装

/// 起動ごとの使い捨て署名鍵。256ビットの乱数をURL-safe Base64で返す
pub fn generate_secret_key() -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// JWT秘密鍵の決定
/// 優先順位: 1. 設定値（環境変数 JWT_SECRET を含む）, 2. 自動生成（開発環境のみ）
pub fn resolve_secret_key(config: &Config) -> Result<String> {
    if let Some(secret) = config.jwt.secret.as_deref().filter(|s| !s.is_empty()) {
        return Ok(secret.to_string());
    }

    if config.server.is_production() {
        return Err(AppError::ConfigError(
            "JWT_SECRET must be set in production".to_string(),
        ));
    }

    tracing::warn!("JWT secret not configured; generating a throwaway key for this session");
    Ok(generate_secret_key())
}

/// EncodingKey を作成（署名用）
pub fn create_encoding_key(secret: &str) -> EncodingKey {
    EncodingKey::from_secret(secret.as_bytes())
}

/// DecodingKey を作成（検証用）
pub fn create_decoding_key(secret: &str) -> DecodingKey {
    DecodingKey::from_secret(secret.as_bytes())
}

//////
// JWTの実装

// JWTペイロード(クレーム)
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaim {
    iss: String,  // JWT issuer
    aud: String,  // 利用先
    sub: String,  // User ID
    name: String, // 表示用の名前
    iat: usize,   // 発行日時
    jti: String,  // JWT ID
    nbf: usize,   // この日時以前のリクエストは拒否
    exp: usize,   // 有効期限
}

/// リクエストを送ってきたユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub first_name: String,
}

/// アクセストークンの発行（有効期限12時間）
pub fn issue_access_token(user_id: &str, first_name: &str, key: &EncodingKey) -> Result<String> {
    let now = Utc::now();
    let expiration = now + Duration::hours(12);

    let claims = JwtClaim {
        iss: JWT_ISSUER.to_string(),
        aud: JWT_AUDIENCE.to_string(),
        sub: user_id.to_string(),
        name: first_name.to_string(),
        iat: now.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        nbf: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(&Header::new(JWT_ALGORITHM), &claims, key)
        .map_err(|e| AppError::ConfigError(e.to_string()))
}

/// アクセストークンを検証してユーザーを取り出す
pub fn decode_access_token(token: &str, key: &DecodingKey) -> Result<CurrentUser> {
    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.set_audience(&[JWT_AUDIENCE]);
    validation.set_issuer(&[JWT_ISSUER]);

    let token_data = decode::<JwtClaim>(token, key, &validation)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;
    let claims = token_data.claims;

    if claims.sub.is_empty() {
        return Err(AppError::Unauthorized("Token has no subject".to_string()));
    }

    Ok(CurrentUser {
        id: claims.sub,
        first_name: claims.name,
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let jar = CookieJar::from_headers(&parts.headers);
        let access_token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        decode_access_token(access_token.value(), &state.jwt_decoding_key)
    }
}
