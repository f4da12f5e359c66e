//! `tally config` -- display resolved configuration.
//!
//! # Examples
//!
//! ```text
//! tally config show
//! tally config show --config ./tally.json
//! ```

use tally_types::config::Config;

/// Display the resolved configuration as formatted JSON.
///
/// Secrets serialize as empty strings.
pub fn config_show(config: &Config) {
    match render(config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize config: {e}"),
    }
}

fn render(config: &Config) -> serde_json::Result<String> {
    serde_json::to_string_pretty(config)
}
