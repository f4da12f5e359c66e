//! Configuration schema.
//!
//! A [`Config`] is read from a JSON file (all sections optional), then
//! overlaid with environment variables via [`Config::apply_env`], then
//! checked with [`Config::validate`]. Multi-word keys accept camelCase
//! aliases.

use serde::{Deserialize, Serialize};

use crate::error::TallyError;
use crate::secret::SecretString;

/// Env var for the Slack signing secret.
pub const ENV_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
/// Env var for the Slack bot token.
pub const ENV_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
/// Env var for the listen port.
pub const ENV_PORT: &str = "PORT";
/// Env var for the admin user id.
pub const ENV_ADMIN_USER_ID: &str = "ADMIN_USER_ID";
/// Env var for the bot's own user id.
pub const ENV_BOT_USER_ID: &str = "BOT_USER_ID";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Slack credentials and receiver path.
    #[serde(default)]
    pub slack: SlackConfig,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Who may run commands.
    #[serde(default)]
    pub access: AccessConfig,

    /// Historical replay behaviour.
    #[serde(default)]
    pub backfill: BackfillConfig,
}

/// Slack app configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Signing secret used to verify inbound requests.
    #[serde(default, alias = "signingSecret")]
    pub signing_secret: SecretString,

    /// Bot token (`xoxb-...`).
    #[serde(default, alias = "botToken")]
    pub bot_token: SecretString,

    /// The bot's own user id. Resolved through `auth.test` when empty.
    #[serde(default, alias = "botUserId")]
    pub bot_user_id: String,

    /// Path that receives both Events API callbacks and slash commands.
    #[serde(default = "default_webhook_path", alias = "webhookPath")]
    pub webhook_path: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            signing_secret: SecretString::default(),
            bot_token: SecretString::default(),
            bot_user_id: String::new(),
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_webhook_path() -> String {
    "/slack/events".into()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

/// Command access configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// The single user allowed to run commands. Empty denies everyone.
    #[serde(default, alias = "adminUserId")]
    pub admin_user_id: String,
}

/// How the backfill handles channels the bot may not be in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipPolicy {
    /// Read every listed channel as-is.
    None,
    /// Try to join each channel first; a failed join is logged and ignored.
    Join,
    /// Join, then skip the channel unless the bot is listed as a member.
    #[default]
    #[serde(alias = "joinAndVerify")]
    JoinAndVerify,
}

impl MembershipPolicy {
    /// Whether a join is attempted before reading history.
    pub fn joins(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether membership is checked before reading history.
    pub fn verifies(self) -> bool {
        matches!(self, Self::JoinAndVerify)
    }
}

/// Backfill configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Channel membership policy.
    #[serde(default)]
    pub membership: MembershipPolicy,
}

impl Config {
    /// Overlay environment values on top of file values.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; empty values are
    /// ignored. An unparseable `PORT` is reported as a config error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), TallyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_SIGNING_SECRET) {
            self.slack.signing_secret = SecretString::new(v);
        }
        if let Some(v) = get(ENV_BOT_TOKEN) {
            self.slack.bot_token = SecretString::new(v);
        }
        if let Some(v) = get(ENV_BOT_USER_ID) {
            self.slack.bot_user_id = v;
        }
        if let Some(v) = get(ENV_ADMIN_USER_ID) {
            self.access.admin_user_id = v;
        }
        if let Some(v) = get(ENV_PORT) {
            self.server.port = v.trim().parse().map_err(|_| TallyError::ConfigInvalid {
                reason: format!("{ENV_PORT} is not a valid port: {v}"),
            })?;
        }
        Ok(())
    }

    /// Check that the config is usable for `serve`.
    pub fn validate(&self) -> Result<(), TallyError> {
        if self.slack.signing_secret.is_empty() {
            return Err(TallyError::ConfigInvalid {
                reason: format!("slack.signing_secret is empty (set {ENV_SIGNING_SECRET})"),
            });
        }
        if self.slack.bot_token.is_empty() {
            return Err(TallyError::ConfigInvalid {
                reason: format!("slack.bot_token is empty (set {ENV_BOT_TOKEN})"),
            });
        }
        if self.server.port == 0 {
            return Err(TallyError::ConfigInvalid {
                reason: "server.port must be non-zero".into(),
            });
        }
        if !self.slack.webhook_path.starts_with('/') {
            return Err(TallyError::ConfigInvalid {
                reason: format!(
                    "slack.webhook_path must start with '/': {}",
                    self.slack.webhook_path
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    fn valid() -> Config {
        let mut config = Config::default();
        config.slack.signing_secret = "secret".into();
        config.slack.bot_token = "xoxb-test".into();
        config
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.slack.webhook_path, "/slack/events");
        assert_eq!(config.backfill.membership, MembershipPolicy::JoinAndVerify);
        assert!(config.access.admin_user_id.is_empty());
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.slack.webhook_path, "/slack/events");
    }

    #[test]
    fn camel_case_aliases() {
        let json = r#"{
            "slack": {
                "signingSecret": "s",
                "botToken": "xoxb-1",
                "botUserId": "UBOT",
                "webhookPath": "/hooks/slack"
            },
            "access": { "adminUserId": "UADMIN" },
            "backfill": { "membership": "joinAndVerify" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.slack.signing_secret.expose(), "s");
        assert_eq!(config.slack.bot_token.expose(), "xoxb-1");
        assert_eq!(config.slack.bot_user_id, "UBOT");
        assert_eq!(config.slack.webhook_path, "/hooks/slack");
        assert_eq!(config.access.admin_user_id, "UADMIN");
        assert_eq!(config.backfill.membership, MembershipPolicy::JoinAndVerify);
    }

    #[test]
    fn membership_policy_names() {
        let policy: MembershipPolicy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(policy, MembershipPolicy::None);
        assert!(!policy.joins());
        let policy: MembershipPolicy = serde_json::from_str("\"join\"").unwrap();
        assert!(policy.joins());
        assert!(!policy.verifies());
        let policy: MembershipPolicy = serde_json::from_str("\"join_and_verify\"").unwrap();
        assert!(policy.joins());
        assert!(policy.verifies());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = valid();
        config.server.port = 8080;
        config
            .apply_env(env(&[
                (ENV_SIGNING_SECRET, "env-secret"),
                (ENV_BOT_TOKEN, "xoxb-env"),
                (ENV_PORT, "4000"),
                (ENV_ADMIN_USER_ID, "U01ADMIN"),
                (ENV_BOT_USER_ID, "UBOT"),
            ]))
            .unwrap();
        assert_eq!(config.slack.signing_secret.expose(), "env-secret");
        assert_eq!(config.slack.bot_token.expose(), "xoxb-env");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.access.admin_user_id, "U01ADMIN");
        assert_eq!(config.slack.bot_user_id, "UBOT");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = valid();
        config.apply_env(env(&[(ENV_BOT_TOKEN, "  ")])).unwrap();
        assert_eq!(config.slack.bot_token.expose(), "xoxb-test");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = valid();
        let err = config.apply_env(env(&[(ENV_PORT, "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn validate_requires_credentials() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.slack.signing_secret = SecretString::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("signing_secret"));

        let mut config = valid();
        config.slack.bot_token = SecretString::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn validate_rejects_port_zero_and_relative_path() {
        let mut config = valid();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.slack.webhook_path = "slack/events".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn serialized_config_hides_secrets() {
        let json = serde_json::to_string(&valid()).unwrap();
        assert!(!json.contains("xoxb-test"));
        assert!(!json.contains("\"secret\""));
    }
}
