use std::env;

use log::*;
use mesa_common::{helpers::parse_boolean_flag, Secret};
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::ServerError;

const DEFAULT_MESA_HOST: &str = "127.0.0.1";
const DEFAULT_MESA_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// When true, the server registers the order-confirmation mail hook so that every new order triggers a
    /// best-effort confirmation to the customer's contact address.
    pub send_order_confirmations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MESA_HOST.to_string(),
            port: DEFAULT_MESA_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            send_order_confirmations: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MESA_HOST").ok().unwrap_or_else(|| DEFAULT_MESA_HOST.into());
        let port = env::var("MESA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MESA_PORT. {e} Using the default, {DEFAULT_MESA_PORT}, \
                         instead."
                    );
                    DEFAULT_MESA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MESA_PORT);
        let database_url = env::var("MESA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MESA_DATABASE_URL is not set. Please set it to the URL for the order database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let send_order_confirmations = parse_boolean_flag(env::var("MESA_SEND_ORDER_CONFIRMATIONS").ok(), false);
        Self { host, port, database_url, auth, send_order_confirmations }
    }
}

//-------------------------------------------------  AuthConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to verify the HS256 signature on access tokens. It must match the secret the token
    /// issuing service signs with.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session, so every \
             externally issued token will fail verification. Set MESA_JWT_SECRET before operating on production. \
             🚨️🚨️🚨️"
        );
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("MESA_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [MESA_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("MESA_JWT_SECRET is set but empty".to_string()));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
