// role-assistant/crates/role-assistant/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use role_assistant::{config::Config, run_server};

/// Answer questions about company roles, permissions and users.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "role-assistant", version, about)]
struct Args {
    /// Role-knowledge JSON document (overrides ROLES_PATH)
    #[arg(long)]
    roles: Option<String>,

    /// User-mapping JSON document (overrides USERS_PATH)
    #[arg(long)]
    users: Option<String>,

    /// HTTP port (overrides API_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cfg = Config::from_env()?;
    if let Some(roles) = args.roles {
        cfg.roles_path = roles;
    }
    if let Some(users) = args.users {
        cfg.users_path = users;
    }
    if let Some(port) = args.port {
        cfg.api_port = port;
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
