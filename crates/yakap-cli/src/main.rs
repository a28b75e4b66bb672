//! Yakap CLI - Command-line interface for the Yakap registry.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "yakap")]
#[command(about = "Yakap - barangay assistance registry")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// User management (admin commands)
    Admin {
        #[command(subcommand)]
        action: AdminCommands,

        /// Data directory override
        #[arg(long, global = true)]
        data_dir: Option<PathBuf>,
    },

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a new user
    Create {
        /// Username for the new user
        #[arg(long)]
        username: String,

        /// Password (or use --generate-password)
        #[arg(long)]
        password: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// User role: admin or encoder
        #[arg(long, default_value = "encoder")]
        role: String,

        /// Generate a random password
        #[arg(long)]
        generate_password: bool,
    },

    /// List all users
    List,

    /// Reset a user's password
    ResetPassword {
        /// Username of the user
        #[arg(long)]
        username: String,
    },

    /// Enable a user account
    Enable {
        /// Username of the user
        #[arg(long)]
        username: String,
    },

    /// Disable a user account
    Disable {
        /// Username of the user
        #[arg(long)]
        username: String,
    },

    /// Delete a user
    Delete {
        /// Username of the user to delete
        #[arg(long)]
        username: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Validate the configuration
    Validate,

    /// Generate a fresh session secret
    GenerateSecret,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { port, bind } => {
            commands::run_serve(commands::serve::ServeArgs { port, bind }).await?;
        }

        Commands::Admin { action, data_dir } => {
            let args = commands::admin::AdminArgs {
                action: match action {
                    AdminCommands::Create {
                        username,
                        password,
                        name,
                        role,
                        generate_password,
                    } => commands::admin::AdminAction::Create {
                        username,
                        password,
                        name,
                        role,
                        generate_password,
                    },
                    AdminCommands::List => commands::admin::AdminAction::List,
                    AdminCommands::ResetPassword { username } => {
                        commands::admin::AdminAction::ResetPassword { username }
                    }
                    AdminCommands::Enable { username } => {
                        commands::admin::AdminAction::Enable { username }
                    }
                    AdminCommands::Disable { username } => {
                        commands::admin::AdminAction::Disable { username }
                    }
                    AdminCommands::Delete { username } => {
                        commands::admin::AdminAction::Delete { username }
                    }
                },
                data_dir,
            };
            commands::run_admin(args)?;
        }

        Commands::Config { action } => {
            let args = commands::config::ConfigArgs {
                action: match action {
                    ConfigCommands::Show => commands::config::ConfigAction::Show,
                    ConfigCommands::Validate => commands::config::ConfigAction::Validate,
                    ConfigCommands::GenerateSecret => {
                        commands::config::ConfigAction::GenerateSecret
                    }
                },
            };
            commands::run_config(args)?;
        }
    }

    Ok(())
}
