use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::scroll::ScrollConfig;

/// What to do when a business item is missing a mandatory field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedItemPolicy {
    /// Log and continue with the rest of the payload (default).
    Skip,
    /// Fail the whole query.
    Abort,
}

/// Runtime configuration, read once at startup from the environment
/// (`.env` supported via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub cities: Vec<String>,
    pub districts: Vec<String>,
    pub categories: Vec<String>,
    pub data_dir: PathBuf,
    pub headless: bool,
    /// Bound on waits for expected UI state (search bar, submit button,
    /// results panel).
    pub wait_timeout: Duration,
    pub scroll: ScrollConfig,
    pub malformed_items: MalformedItemPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let cities = csv_list("MAP_CITIES");
        if cities.is_empty() {
            bail!("MAP_CITIES must list at least one city (comma-separated)");
        }
        let categories = csv_list("MAP_CATEGORIES");
        if categories.is_empty() {
            bail!("MAP_CATEGORIES must list at least one category (comma-separated)");
        }
        // District is allowed to be blank: "Moscow  pharmacy" is a valid
        // query with an empty middle part.
        let mut districts = csv_list("MAP_DISTRICTS");
        if districts.is_empty() {
            districts.push(String::new());
        }

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let headless = env::var("HEADLESS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let scroll = ScrollConfig {
            step: env_u64("SCROLL_STEP", 2000) as i64,
            settle: Duration::from_millis(env_u64("SCROLL_PAUSE_MS", 500)),
            stagnation_threshold: env_u64("SCROLL_STAGNATION_LIMIT", 15) as u32,
            max_iterations: env::var("SCROLL_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok()),
        };

        let malformed_items = match env::var("MALFORMED_ITEM_POLICY").as_deref() {
            Ok("abort") => MalformedItemPolicy::Abort,
            _ => MalformedItemPolicy::Skip,
        };

        Ok(Self {
            cities,
            districts,
            categories,
            data_dir,
            headless,
            wait_timeout: Duration::from_secs(env_u64("RESPONSE_WAIT_SECS", 15)),
            scroll,
            malformed_items,
        })
    }
}

fn csv_list(var: &str) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn env_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
