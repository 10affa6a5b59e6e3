use std::env;
use std::path::PathBuf;

/// Default request body limit: 15 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 15 * 1024 * 1024;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn path_env_or(var: &str, default: &str) -> PathBuf {
    env::var(var)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Process-level configuration, read from the environment.
///
/// Everything that shapes OCR behavior lives in the preset documents instead;
/// see `presets`.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root of the preset documents (`<name>.json`, `language_presets/<name>.json`).
    pub presets_dir: PathBuf,
    pub models_dir: PathBuf,
    pub labels_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("POLYOCR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                max_body_bytes: parse_env_or("POLYOCR_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            },
            storage: StorageConfig {
                presets_dir: path_env_or("POLYOCR_PRESETS_DIR", "./presets"),
                models_dir: path_env_or("POLYOCR_MODELS_DIR", "./models"),
                labels_dir: path_env_or("POLYOCR_LABELS_DIR", "./recognition_label_files"),
            },
            rpc: RpcConfig {
                enabled: parse_env_or("POLYOCR_RPC_ENABLED", true),
                path: normalize_mount_path(
                    &env::var("POLYOCR_RPC_PATH").unwrap_or_else(|_| "/rpc".to_string()),
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Ensure a mount path starts with `/` and has no trailing slash.
fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/rpc".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "POLYOCR_HOST",
        "POLYOCR_PRESETS_DIR",
        "POLYOCR_MODELS_DIR",
        "POLYOCR_LABELS_DIR",
        "POLYOCR_MAX_BODY_BYTES",
        "POLYOCR_RPC_ENABLED",
        "POLYOCR_RPC_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = Config::from_env();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_body_bytes, 15_728_640);
        assert_eq!(config.storage.presets_dir, PathBuf::from("./presets"));
        assert_eq!(config.storage.models_dir, PathBuf::from("./models"));
        assert_eq!(
            config.storage.labels_dir,
            PathBuf::from("./recognition_label_files")
        );
        assert!(config.rpc.enabled);
        assert_eq!(config.rpc.path, "/rpc");
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        env::set_var("POLYOCR_HOST", "127.0.0.1");
        env::set_var("POLYOCR_PRESETS_DIR", "/etc/polyocr/presets");
        env::set_var("POLYOCR_MAX_BODY_BYTES", "1048576");
        env::set_var("POLYOCR_RPC_ENABLED", "false");
        env::set_var("POLYOCR_RPC_PATH", "grpc/");

        let config = Config::from_env();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.storage.presets_dir,
            PathBuf::from("/etc/polyocr/presets")
        );
        assert_eq!(config.server.max_body_bytes, 1_048_576);
        assert!(!config.rpc.enabled);
        assert_eq!(config.rpc.path, "/grpc");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_falls_back_to_default() {
        clear_env();
        env::set_var("POLYOCR_MAX_BODY_BYTES", "lots");

        let config = Config::from_env();
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

        clear_env();
    }

    #[test]
    fn test_normalize_mount_path() {
        assert_eq!(normalize_mount_path("/rpc"), "/rpc");
        assert_eq!(normalize_mount_path("mcp"), "/mcp");
        assert_eq!(normalize_mount_path("/"), "/rpc");
    }
}
