//! Config command - prints the effective configuration

use anyhow::Context;

use crate::config::AppConfig;

/// Print the merged configuration (secrets omitted)
pub fn run(config_file: Option<&str>) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_from(config_file).context("Failed to load configuration")?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
