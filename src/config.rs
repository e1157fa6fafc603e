//! Configuration from environment variables (port, directories, secrets).

use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use time::OffsetDateTime;

/// Obfuscation key used when `WAYPOINT_ID_KEY` is unset. Player URLs issued
/// before the key became configurable were built with this value.
pub const DEFAULT_ID_KEY: &str = "THIS_IS_A_STATIC_32_BYTE_SECRET_KEY";

/// HMAC key for target display codes when `WAYPOINT_TARGET_SECRET` is unset.
pub const DEFAULT_TARGET_SECRET: &str = "a-very-secret-key-for-the-game";

const SEED_FILE_NAME: &str = "initial_targets.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// JSON seed file read by the bulk target import.
    pub initial_targets_path: PathBuf,
    pub id_key: String,
    pub target_secret: String,
    /// Cache-busting string injected into the HTML shells.
    pub app_version: String,
    /// Overrides the Host-derived base of obfuscated player URLs.
    pub public_base_url: Option<String>,
    /// Snapshot file for the in-memory store. Loaded at boot, written on shutdown.
    pub data_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let static_dir = static_dir();
        let initial_targets_path = env::var("INITIAL_TARGETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| static_dir.join(SEED_FILE_NAME));
        Self {
            addr: server_addr(),
            initial_targets_path,
            static_dir,
            id_key: env::var("WAYPOINT_ID_KEY").unwrap_or_else(|_| DEFAULT_ID_KEY.to_string()),
            target_secret: env::var("WAYPOINT_TARGET_SECRET")
                .unwrap_or_else(|_| DEFAULT_TARGET_SECRET.to_string()),
            app_version: app_version(),
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
            data_file: non_empty_var("DATA_FILE").map(PathBuf::from),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let static_dir = PathBuf::from("./static");
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            initial_targets_path: static_dir.join(SEED_FILE_NAME),
            static_dir,
            id_key: DEFAULT_ID_KEY.to_string(),
            target_secret: DEFAULT_TARGET_SECRET.to_string(),
            app_version: local_version(),
            public_base_url: None,
            data_file: None,
        }
    }
}

/// Socket address to bind the server to.
///
/// Reads the `PORT` env var (App Engine, Fly.io) or defaults to 8080, binds to 0.0.0.0.
pub fn server_addr() -> SocketAddr {
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080);
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Resolve the static directory path used by the server.
/// Order:
/// 1) STATIC_DIR env var
/// 2) ./static (container and local layout)
/// 3) ../static (running from a subdirectory)
pub fn static_dir() -> PathBuf {
    if let Ok(p) = env::var("STATIC_DIR") {
        return PathBuf::from(p);
    }
    let p1 = Path::new("./static");
    if p1.exists() {
        return p1.to_path_buf();
    }
    PathBuf::from("../static")
}

/// Deployed version identifier, falling back to a per-boot local version.
fn app_version() -> String {
    non_empty_var("APP_VERSION")
        .or_else(|| non_empty_var("GAE_VERSION"))
        .unwrap_or_else(local_version)
}

fn local_version() -> String {
    format!("local-{}", OffsetDateTime::now_utc().unix_timestamp())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
