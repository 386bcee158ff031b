//! Headless viewer.
//!
//! Connects to a Conwaymore server, keeps the UI state in sync with the
//! snapshots it streams and logs playback changes. Stops on ctrl-c.

use conwaymore_client::worker::{spawn_worker, HeadlessRenderer};
use conwaymore_client::{App, ClientConfig};
use conwaymore_client::transport::WebSocketConnector;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SURFACE_HEIGHT: f64 = 720.0;
const SURFACE_WIDTH: f64 = 1280.0;
const INITIAL_CELL_SIZE: u16 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ClientConfig::from_env()?;
    info!(
        server_url = %config.server_url,
        world_size = config.world_size,
        frame_interval_ms = config.frame_interval.as_millis() as u64,
        "conwaymore-viewer starting"
    );

    let connector = WebSocketConnector::new(config.server_url.clone(), config.read_limit);
    let mut worker = spawn_worker(connector, config.frame_interval);
    let app = App::new(worker.sender(), INITIAL_CELL_SIZE);

    app.initialise(
        Box::new(HeadlessRenderer::new()),
        SURFACE_HEIGHT,
        SURFACE_WIDTH,
        config.world_size,
    );

    let playback = app.view().play_pause_label.clone();
    let speed = app.view().speed_label.clone();
    let _status = conwaymore_client::reactive::Effect::new(move || {
        let (playback, speed) = (playback.get(), speed.get());
        info!(playback, %speed, "status");
    });

    loop {
        tokio::select! {
            batch = worker.next_events() => match batch {
                Some(batch) => {
                    app.apply_events(batch);
                    if let Some(message) = app.notification().get_untracked() {
                        warn!(%message, "transport problem");
                        app.dismiss_notification();
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                worker.abort();
                return Ok(());
            }
        }
    }

    drop(app);
    worker.join().await?;
    Ok(())
}
