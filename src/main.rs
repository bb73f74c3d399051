// Entrypoint for the game.
// - Keeps `main` small: set up logging, read the configuration, create the
//   catalog client and hand everything to the UI loop.
// - Logs go to stderr so they never land on the menu line.

use tracing_subscriber::EnvFilter;
use winkel_tass::{api::CatalogClient, config::Config, ui::main_menu};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // `CATALOG_API_URL` and friends, see `config::Config::from_env`.
    let config = Config::from_env()?;
    let catalog = CatalogClient::new(&config.catalog_url)?;

    // Blocks until the player is done.
    main_menu(&config, catalog)?;
    Ok(())
}
