use rocket::figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    #[serde(alias = "DATABASE_URL")]
    pub database_url: String,
    /// Server-held secret keying the HMAC audit tags on ballots and ledger
    /// rows.
    #[serde(alias = "AUDIT_KEY")]
    pub audit_key: String,
    #[serde(default = "default_rocket_port", alias = "ROCKET_PORT")]
    pub rocket_port: u16,
    #[serde(default = "default_static_dir", alias = "STATIC_DIR")]
    pub static_dir: String,
}

fn default_rocket_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "public".to_string()
}

impl AppConfig {
    pub fn load() -> Self {
        Figment::new()
            .merge(Toml::file("Config.toml"))
            .merge(Toml::file("../Config.toml"))
            .merge(Env::raw().only(&["DATABASE_URL", "AUDIT_KEY", "ROCKET_PORT", "STATIC_DIR"]))
            .extract()
            .expect("Failed to load configuration. Ensure Config.toml exists or environment variables are set (DATABASE_URL, AUDIT_KEY).")
    }
}
