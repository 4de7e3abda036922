use courier::config::Config;
use courier::server::EventLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    tracing::info!(
        web_root = %cfg.storage.web_root.display(),
        upload_root = %cfg.storage.upload_root.display(),
        "Starting courier"
    );

    let mut event_loop = EventLoop::bind(&cfg)?;
    let shutdown = event_loop.shutdown_handle();
    let mut server = tokio::task::spawn_blocking(move || event_loop.run());

    tokio::select! {
        res = &mut server => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.shutdown()?;
            server.await??;
        }
    }

    Ok(())
}
