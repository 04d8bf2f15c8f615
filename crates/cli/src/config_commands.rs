use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use parlor_config::ParlorConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file in use (or where one would be created).
    Path,
    /// Print the effective config with secrets redacted.
    Show,
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>, config: &ParlorConfig) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = explicit
                .map(Path::to_path_buf)
                .unwrap_or_else(parlor_config::find_or_default_config_path);
            println!("{}", path.display());
        },
        ConfigAction::Show => println!("{}", render(config)?),
    }
    Ok(())
}

fn render(config: &ParlorConfig) -> Result<String> {
    let mut value = serde_json::to_value(config)?;
    if let Some(providers) = value.get_mut("providers").and_then(|p| p.as_object_mut()) {
        for entry in providers.values_mut() {
            if let Some(key) = entry.get_mut("api_key")
                && !key.is_null()
            {
                *key = serde_json::Value::String("[REDACTED]".into());
            }
        }
    }
    if let Some(accounts) = value
        .pointer_mut("/channels/telegram")
        .and_then(|t| t.as_object_mut())
    {
        for account in accounts.values_mut() {
            if let Some(token) = account.get_mut("token") {
                *token = serde_json::Value::String("[REDACTED]".into());
            }
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}
