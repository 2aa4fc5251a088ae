use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Connection string used when neither the config file nor the environment set one.
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/aegis-esports";

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub main: Main,
    #[serde(default)]
    pub client: Client,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Main {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Only needed by commands that sign or check tokens
    pub jwt_secret: Option<String>,
}

impl Default for Main {
    fn default() -> Self {
        Self {
            address: default_address(),
            database: default_database(),
            jwt_secret: None,
        }
    }
}

/// Settings for the `connections` command
#[derive(Deserialize, Clone, Debug)]
pub struct Client {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_owned()
}

fn default_database() -> String {
    DEFAULT_MONGO_URI.to_owned()
}

fn default_api_url() -> String {
    "http://localhost:3000/".to_owned()
}

impl Config {
    /// Config sources, later ones win: `Aegis.toml`, `MONGO_URI`, then `AEGIS_*` variables.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("Aegis.toml"))
            .merge(Env::raw().only(&["MONGO_URI"]).map(|_| "main.database".into()))
            .merge(Env::prefixed("AEGIS_").split("__"))
    }

    /// Returns the JWT secret or fails with a hint on how to set it.
    ///
    /// # Errors
    /// This fails if no secret is configured.
    pub fn jwt_secret(&self) -> anyhow::Result<&str> {
        self.main.jwt_secret.as_deref().ok_or_else(|| {
            anyhow::anyhow!("main.jwt_secret must be set (e.g. via AEGIS_MAIN__JWT_SECRET)")
        })
    }
}
