use anyhow::Context;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::de::value::{Error as ValueError, StrDeserializer};
use std::env;
use std::fs;
use std::str::FromStr;

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

// 環境変数の値はTOMLと同じ名前で解釈する。前後の空白と大文字小文字は無視する
fn parse_variant<T: DeserializeOwned>(raw: &str, what: &str) -> anyhow::Result<T> {
    let lowered = raw.trim().to_ascii_lowercase();
    let de: StrDeserializer<'_, ValueError> = lowered.as_str().into_deserializer();
    T::deserialize(de).map_err(|e| anyhow::anyhow!("Invalid {what} {raw:?}: {e}"))
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "environment")
    }
}

/// ノートの保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    #[serde(alias = "mongo")]
    Mongodb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "note store")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub mongodb: Option<MongoDBConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MongoDBConfig {
    pub connection_uri: String,
    pub db_name: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "notes".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub env: Environment,
    /// `/auth/dev-login` を有効にする。明示的に true にしたときだけ公開する
    #[serde(default)]
    pub dev_login: bool,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JwtConfig {
    /// 未設定なら開発環境に限り起動時に生成する
    pub secret: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // 環境変数から読み込む場合
        if env::var("MONGODB_CONNECTION_URI").is_ok() || env::var("NOTES_STORE").is_ok() {
            return Self::from_env();
        }

        // Config.tomlから読み込む場合（ローカル開発）
        let config_str = fs::read_to_string("Config.toml").context(
            "Failed to read Config.toml. Use environment variables or provide Config.toml",
        )?;
        let mut config = Self::from_toml(&config_str)?;

        // 環境変数があれば優先する
        if let Ok(secret) = env::var("JWT_SECRET") {
            config.jwt.secret = Some(secret);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            config.server.port = port.parse().context("Invalid SERVER_PORT")?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse Config.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// 環境変数相当の値から設定を組み立てる。`var` は未設定なら `None` を返す
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = match var("NOTES_STORE") {
            Some(s) => s.parse()?,
            None => StoreBackend::Mongodb,
        };

        let mongodb = match var("MONGODB_CONNECTION_URI") {
            Some(connection_uri) => Some(MongoDBConfig {
                connection_uri,
                db_name: var("MONGODB_DB_NAME").unwrap_or_else(|| "notes_db".to_string()),
                collection: var("MONGODB_COLLECTION").unwrap_or_else(default_collection),
                timeout_secs: match var("MONGODB_TIMEOUT_SECS") {
                    Some(s) => s.parse().context("Invalid MONGODB_TIMEOUT_SECS")?,
                    None => default_timeout_secs(),
                },
            }),
            None => None,
        };

        let env = match var("ENVIRONMENT") {
            Some(s) => s.parse().context("Invalid ENVIRONMENT")?,
            None => Environment::default(),
        };
        let dev_login = match var("DEV_LOGIN") {
            Some(s) => s.trim().parse().context("Invalid DEV_LOGIN (expected true or false)")?,
            None => false,
        };

        let config = Config {
            database: DatabaseConfig { backend, mongodb },
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: var("SERVER_PORT")
                    .as_deref()
                    .unwrap_or("5050")
                    .parse()
                    .context("Invalid SERVER_PORT")?,
                env,
                dev_login,
            },
            logging: LoggingConfig {
                level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
            jwt: JwtConfig {
                secret: var("JWT_SECRET"),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 任意のユーザーとしてログインできるルートを公開するか
    pub fn dev_login_enabled(&self) -> bool {
        self.server.dev_login && !self.server.is_production()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.backend == StoreBackend::Mongodb && self.database.mongodb.is_none() {
            anyhow::bail!("database.mongodb must be configured when the note store is mongodb");
        }
        if let Some(mongo) = &self.database.mongodb {
            if mongo.timeout_secs == 0 {
                anyhow::bail!("database.mongodb.timeout_secs must be greater than zero");
            }
        }
        if self.server.is_production() {
            if self.database.backend == StoreBackend::Memory {
                anyhow::bail!("The in-memory note store is not allowed in production");
            }
            if self.jwt.secret.as_deref().is_none_or(str::is_empty) {
                anyhow::bail!("Production environment requires JWT_SECRET");
            }
            if self.server.dev_login {
                anyhow::bail!("server.dev_login must not be enabled in production");
            }
        }
        Ok(())
    }
}
