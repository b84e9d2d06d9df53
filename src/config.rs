use std::{env, fs, net::SocketAddr, path::PathBuf};

use anyhow::Result;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub api_key: String,
    pub api_key_is_fallback: bool,
    pub db_path: PathBuf,
    pub katottg_csv_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_raw =
            env::var("KATOTTG_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_normalized = bind_raw
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .to_string();
        let bind_addr = bind_normalized
            .parse::<SocketAddr>()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let (api_key, api_key_is_fallback) = resolve_api_key();

        let db_path = PathBuf::from(
            env::var("KATOTTG_DB_PATH").unwrap_or_else(|_| "/data/locations.sqlite".to_string()),
        );

        // Source updates are rare and adopted manually, so the file path
        // is configuration, not a request parameter.
        let katottg_csv_path = PathBuf::from(
            env::var("KATOTTG_CSV_PATH").unwrap_or_else(|_| "/data/katottg.csv".to_string()),
        );

        Ok(Self {
            bind_addr,
            api_key,
            api_key_is_fallback,
            db_path,
            katottg_csv_path,
        })
    }
}

fn resolve_api_key() -> (String, bool) {
    if let Ok(value) = env::var("KATOTTG_API_KEY") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return (trimmed.to_string(), false);
        }
    }

    if let Ok(key_file) = env::var("KATOTTG_API_KEY_FILE") {
        match fs::read_to_string(&key_file) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return (trimmed.to_string(), false);
                }
                eprintln!(
                    "[katottg-locations-api] KATOTTG_API_KEY_FILE is empty: {}. Falling back to generated key.",
                    key_file
                );
            }
            Err(err) => {
                eprintln!(
                    "[katottg-locations-api] Failed reading KATOTTG_API_KEY_FILE at {}: {}. Falling back to generated key.",
                    key_file, err
                );
            }
        }
    } else {
        eprintln!(
            "[katottg-locations-api] KATOTTG_API_KEY not set. Falling back to generated key."
        );
    }

    let generated = format!("fallback-{}", Uuid::new_v4());
    (generated, true)
}
