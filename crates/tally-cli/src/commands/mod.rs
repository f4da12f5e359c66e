//! CLI command implementations for `tally`.
//!
//! - [`serve`] -- HTTP receiver, counter and command handling.
//! - [`config_cmd`] -- Configuration display.

pub mod config_cmd;
pub mod serve;

use std::path::{Path, PathBuf};

use tally_types::config::Config;

/// Env var naming a config file.
const CONFIG_ENV: &str = "TALLY_CONFIG";

/// Load configuration from the given path override or via auto-discovery,
/// then overlay environment variables.
///
/// Discovery chain when no override is given:
/// 1. `TALLY_CONFIG` env var
/// 2. `~/.tally/config.json`
///
/// Falls back to defaults if no config file is found. Validation is left to
/// the caller, so `tally config show` works on incomplete configs.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let env = |key: &str| std::env::var(key).ok();
    load_config_with(config_override, env, dirs::home_dir())
}

fn load_config_with<F>(
    config_override: Option<&str>,
    env: F,
    home: Option<PathBuf>,
) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let path = match config_override {
        Some(p) => {
            let path = PathBuf::from(p);
            if !path.exists() {
                anyhow::bail!("config file not found: {p}");
            }
            Some(path)
        }
        None => discover_config_path(&env, home),
    };

    let mut config = match path {
        Some(path) => read_config(&path)?,
        None => {
            tracing::debug!("no config file found, using defaults");
            Config::default()
        }
    };
    config.apply_env(&env)?;
    Ok(config)
}

/// Find the config file: `TALLY_CONFIG`, then `~/.tally/config.json`.
fn discover_config_path<F>(env: &F, home: Option<PathBuf>) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(p) = env(CONFIG_ENV).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(p));
    }
    let candidate = home?.join(".tally").join("config.json");
    candidate.exists().then_some(candidate)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    tracing::debug!(path = %path.display(), "loading config");
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tally_types::config::MembershipPolicy;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn write_config(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        path
    }

    #[test]
    fn defaults_without_any_file() {
        let home = tempfile::tempdir().unwrap();
        let config = load_config_with(None, env_of(&[]), Some(home.path().to_owned())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.slack.webhook_path, "/slack/events");
        assert_eq!(config.backfill.membership, MembershipPolicy::JoinAndVerify);
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "tally.json",
            r#"{"server":{"port":4000},"access":{"adminUserId":"UADMIN"},"backfill":{"membership":"join"}}"#,
        );
        let config = load_config_with(path.to_str(), env_of(&[]), None).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.access.admin_user_id, "UADMIN");
        assert_eq!(config.backfill.membership, MembershipPolicy::Join);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_with(Some("/nonexistent/tally.json"), env_of(&[]), None).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn tally_config_env_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "from-env.json", r#"{"server":{"port":5000}}"#);
        let env = env_of(&[(CONFIG_ENV, path.to_str().unwrap())]);
        let config = load_config_with(None, env, None).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn home_config_is_discovered() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(".tally")).unwrap();
        write_config(
            &home.path().join(".tally"),
            "config.json",
            r#"{"slack":{"botUserId":"UBOT"}}"#,
        );
        let config = load_config_with(None, env_of(&[]), Some(home.path().to_owned())).unwrap();
        assert_eq!(config.slack.bot_user_id, "UBOT");
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "tally.json",
            r#"{"server":{"port":4000},"slack":{"signing_secret":"file-secret"}}"#,
        );
        let env = env_of(&[
            ("PORT", "8080"),
            ("SLACK_SIGNING_SECRET", "env-secret"),
            ("ADMIN_USER_ID", "U01F9QU9JLD"),
        ]);
        let config = load_config_with(path.to_str(), env, None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.slack.signing_secret.expose(), "env-secret");
        assert_eq!(config.access.admin_user_id, "U01F9QU9JLD");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "bad.json", "{ not json");
        let err = load_config_with(path.to_str(), env_of(&[]), None).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
