use std::net::TcpListener;

use listenfd::ListenFd;
use pirrip::Settings;
use tracing::info;

fn setup_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let config = tracing_subscriber::registry().with(filter_layer);

    if atty::is(atty::Stream::Stdout) {
        config.with(fmt::layer().pretty()).init();
    } else {
        config.with(fmt::layer().json()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let settings = Settings::from_env()?;
    info!(?settings, "loaded settings");

    let mut listenfd = ListenFd::from_env();

    let bind = if let Some(listener) = listenfd.take_tcp_listener(0)? {
        listener
    } else {
        TcpListener::bind((settings.host.as_str(), settings.port))?
    };

    let app = pirrip::package_routes(&settings)?;

    info!(addr = %bind.local_addr()?, "server listening");
    axum::Server::from_tcp(bind)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
