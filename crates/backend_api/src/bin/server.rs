use anyhow::Context;
use backend_api::{run_server, AppState, InMemorySessionRepository};
use data_pipeline::Session;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // SETTINGS_PATH picks the settings file; otherwise ./settings.json, otherwise defaults
    let settings_path = env::var("SETTINGS_PATH").ok().map(PathBuf::from);
    let settings = settings_loader::load_settings_or_default(settings_path.as_deref())?;
    let settings = settings_loader::apply_server_overrides(settings, |key| env::var(key).ok())
        .context("Applying HOST/PORT overrides")?;

    logger::init(&format!(
        "{},backend_api=debug,tower_http=debug",
        settings.log_filter
    ));

    println!("Billing Ledger API Server");
    println!("=========================");
    match &settings_path {
        Some(path) => println!("Settings: {}", path.display()),
        None => println!("Settings: default lookup (settings.json)"),
    }
    println!("Default merge mode: {:?}", settings.default_merge_mode);
    println!("Export directory: {}", settings.export.output_dir.display());
    println!("Listening on: {}:{}", settings.server.host, settings.server.port);
    println!();

    let host = settings.server.host.clone();
    let port = settings.server.port;

    let repo = Arc::new(InMemorySessionRepository::new(Session::from_settings(&settings)));
    let state = AppState::new(repo, settings);

    run_server(state, &host, port).await?;

    Ok(())
}
