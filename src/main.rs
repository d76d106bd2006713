//! Binary entry point: resolve settings, start logging, open the database and
//! drive the Ratatui event loop until the user exits.
use anyhow::Context;
use clap::Parser;
use journal_admin::{db, init_tracing, run_app, App, Cli};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().resolve()?;
    init_tracing(&settings.log_dir, settings.debug)?;

    let conn = db::open(&settings.db_path).with_context(|| {
        format!(
            "could not connect to the database at {}",
            settings.db_path.display()
        )
    })?;
    info!(db = %settings.db_path.display(), limit = settings.limit, "starting");

    let mut app = App::new(conn, settings.limit);
    let result = run_app(&mut app);
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "event loop failed");
    }
    app.close()?;
    result
}
