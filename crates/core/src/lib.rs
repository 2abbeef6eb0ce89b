pub mod domain;
pub mod editor;
pub mod error;
pub mod present;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_STORE_DIR: &str = ".asset_views";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub store_dir: PathBuf,
        pub default_dataset_url: Option<String>,
        pub default_dataset_path: Option<PathBuf>,
        pub fetch_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let fetch_timeout_secs = match non_empty_var("ASSET_VIEWS_FETCH_TIMEOUT_SECS") {
                Some(s) => Some(
                    s.parse::<u64>()
                        .with_context(|| format!("ASSET_VIEWS_FETCH_TIMEOUT_SECS is not a number: {s}"))?,
                ),
                None => None,
            };

            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                store_dir: non_empty_var("ASSET_VIEWS_STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
                default_dataset_url: non_empty_var("ASSET_VIEWS_DEFAULT_URL"),
                default_dataset_path: non_empty_var("ASSET_VIEWS_DEFAULT_PATH").map(PathBuf::from),
                fetch_timeout_secs,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }
}
