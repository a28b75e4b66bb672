//! Configuration inspection commands.

use yakap_core::Config;

use crate::ui;

/// Arguments for the config command.
pub struct ConfigArgs {
    /// The config action to perform.
    pub action: ConfigAction,
}

/// Config actions.
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Validate the configuration, including the session secret.
    Validate,
    /// Generate a fresh hex-encoded session secret.
    GenerateSecret,
}

/// Run the config command.
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded.
pub fn run_config(args: ConfigArgs) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => show_config(),
        ConfigAction::Validate => validate_config(),
        ConfigAction::GenerateSecret => {
            println!("{}", generate_secret());
            Ok(())
        }
    }
}

fn show_config() -> anyhow::Result<()> {
    let mut config = Config::load_default()?;

    // Never print the secret itself
    if config.session.secret.is_some() {
        config.session.secret = Some("<redacted>".to_string());
    }

    ui::header("Configuration");
    ui::info(&format!("File: {}", Config::default_path().display()));
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn validate_config() -> anyhow::Result<()> {
    let config = Config::load_default()?;

    match config.session.require_secret() {
        Ok(_) => ui::success("Session secret is configured"),
        Err(e) => {
            ui::error(&format!("{e}"));
            ui::info("Generate one with 'yakap config generate-secret'");
            return Err(anyhow::anyhow!("Configuration is incomplete"));
        }
    }

    ui::success(&format!(
        "Gateway will bind {}:{}",
        config.gateway.bind_address, config.gateway.port
    ));
    ui::success(&format!("Session TTL: {} hours", config.session.ttl_hours));
    Ok(())
}

/// Generate a random 256-bit secret as a hex string.
fn generate_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_is_usable() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert_ne!(secret, generate_secret());
        assert_eq!(hex::decode(&secret).unwrap().len(), 32);
    }
}
