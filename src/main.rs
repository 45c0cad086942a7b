use tracing::{error, info};

use servdesk::{Config, Database, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = servdesk::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        servdesk::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> servdesk::Result<()> {
    config.validate()?;

    info!("servdesk - service-order desk");

    let db = Database::open(&config.database.path).await?;
    servdesk::ensure_admin(&db, &config.admin).await?;

    let mailer = match servdesk::build_mailer(&config.mail) {
        Ok(mailer) => Some((mailer, config.mail.default_from.clone())),
        Err(e) => {
            error!("Outbound mail disabled: {e}");
            None
        }
    };

    let server = WebServer::new(&config.web, db, mailer)?;
    info!("Server configured on {}", server.addr());
    server.run().await?;
    Ok(())
}
