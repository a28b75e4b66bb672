//! Gateway server command.

use yakap_core::Config;
use yakap_gateway::GatewayConfig;

use crate::ui;

/// Arguments for the serve command.
pub struct ServeArgs {
    /// Port override.
    pub port: Option<u16>,
    /// Bind address override.
    pub bind: Option<String>,
}

/// Run the gateway server.
///
/// # Errors
///
/// Returns error if configuration is incomplete (no session secret) or the
/// server fails to start.
pub async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = Config::load_default()?;

    let mut gateway_config = GatewayConfig::from_config(&config).map_err(|e| {
        ui::error(&format!("{e}"));
        anyhow::anyhow!("Gateway configuration failed")
    })?;

    if let Some(port) = args.port {
        gateway_config.port = port;
    }
    if let Some(bind) = args.bind {
        gateway_config.bind_address = bind;
    }

    ui::info(&format!(
        "Starting gateway on {}:{}",
        gateway_config.bind_address, gateway_config.port
    ));

    yakap_gateway::start(gateway_config).await?;
    Ok(())
}
