use std::sync::Arc;
use live_moikas::{
    AppState,
    Roster,
    StatusError,
    config::{load_creators, Config},
    handlers::routes,
    services::{helix::HelixClient, user_list::UserListStore},
};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(true)
        .init();
}

async fn run() -> Result<(), StatusError> {
    let config = Config::from_env()?;
    let creators = load_creators(&config.creators_file)?;
    let roster = Roster::new(&config.primary_creator, creators);
    let api = Arc::new(HelixClient::new(&config)?);
    let user_list = UserListStore::new(config.user_list_path());

    log::info!(
        "Tracking {} creators (primary: {}), user list at {:?}",
        roster.entries().len(),
        roster.primary(),
        user_list.path()
    );

    let state = Arc::new(AppState::new(api, roster, config.cache_ttl, user_list));

    log::info!("Creator status service running on http://{}", config.bind_addr);
    warp::serve(routes(state)).run(config.bind_addr).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
