use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{miette, IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

use fleetgate::authz::context::AccessContext;
use fleetgate::authz::loader::load_catalog;
use fleetgate::authz::types::{PermissionAction, ResourceType};
use fleetgate::session::SessionService;
use fleetgate::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "fleetgate",
    version,
    about = "Role/permission/constraint authorization for logistics fleet management"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate against the demo directory and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show the restored session
    Whoami,
    /// Evaluate an authorization query against the restored session
    Check {
        /// Resource type, e.g. "shipment"
        #[arg(long)]
        resource: String,
        /// Action, e.g. "read"
        #[arg(long)]
        action: String,
        /// Optional camelCase JSON context, e.g. '{"ownerId":"u-1"}'
        #[arg(long)]
        context: Option<String>,
    },
}

fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::debug!(?settings, "Loaded configuration");

    // compile the authorization catalog
    let catalog = Arc::new(load_catalog(&settings.catalog.dir)?);

    // hydrate the session from the store file
    let mut service = SessionService::new(catalog, settings.session.store_path);
    service.restore();

    match cli.command {
        Command::Login { email, password } => {
            service.login(&email, &password)?;
            let state = service.state();
            if let Some(user) = &state.user {
                println!(
                    "logged in as {} ({} roles, {} permissions)",
                    user.username,
                    state.roles.len(),
                    state.permissions.len()
                );
            }
        }
        Command::Logout => {
            service.logout()?;
            println!("logged out");
        }
        Command::Whoami => match service.current_user() {
            Some(user) => {
                let state = service.state();
                let roles: Vec<&str> = state.roles.iter().map(|r| r.name.as_str()).collect();
                println!(
                    "{} <{}> roles=[{}] permissions={}",
                    user.username,
                    user.email,
                    roles.join(", "),
                    state.permissions.len()
                );
            }
            None => println!("not logged in"),
        },
        Command::Check {
            resource,
            action,
            context,
        } => {
            let resource = ResourceType::parse(&resource)
                .ok_or_else(|| miette!("unknown resource type `{resource}`"))?;
            let action = PermissionAction::parse(&action)
                .ok_or_else(|| miette!("unknown action `{action}`"))?;
            let context: Option<AccessContext> = match context {
                Some(raw) => Some(serde_json::from_str(&raw).into_diagnostic()?),
                None => None,
            };

            let allowed = service.can_access(resource, action, context.as_ref());
            println!("{}", if allowed { "ALLOW" } else { "DENY" });
            if !allowed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
