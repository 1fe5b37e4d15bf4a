//! # SpaceAPI Status Server
//!
//! Republishes the open/closed state of the space, received over MQTT, as a
//! SpaceAPI JSON document (`/json`), a plain-text token (`/text`) and a status
//! icon (`/state.png`).
//!
//! The status record is created here and shared by handle: the MQTT bridge
//! gets the write side, the HTTP handlers get a `StatusReader`. While the
//! broker is unreachable the HTTP side keeps serving the last known state.

use anyhow::{Context, Result};
use lib_common::core::{SpaceProfile, StatusReader, StatusRecord};
use lib_common::ingestors::MessageBridge;
use std::sync::Arc;
use tokio::signal;

mod spaceapi_logic;
use spaceapi_logic::{config, downstream, health::HealthInfo, logger, picture::PictureManager};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let (settings, config_notes) = config::load_config();
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;
    for (level, message) in config_notes {
        log::log!(level, "{}", message);
    }

    let profile = match &settings.profile_path {
        Some(path) => SpaceProfile::from_json_file(path).context("Failed to load space profile")?,
        None => SpaceProfile::netz39(),
    };
    log::info!("Serving SpaceAPI status for {}", profile.space);

    let record = Arc::new(StatusRecord::new(profile));
    let reader = StatusReader::new(Arc::clone(&record));

    let bridge = MessageBridge::new(settings.bridge.clone(), Arc::clone(&record)).start();

    let app_state = downstream::AppState::new(
        reader.clone(),
        PictureManager::new(
            reader,
            settings.open_image_path.clone(),
            settings.closed_image_path.clone(),
        ),
        HealthInfo::detect(),
        settings.oas3_path.clone(),
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let mut downstream_handle = tokio::spawn(downstream::run(
        settings.port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal, or for the HTTP server to die on its own.
    let mut server_finished = None;
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
        }
        result = &mut downstream_handle => {
            server_finished = Some(result);
        }
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    if let Err(e) = bridge.stop().await {
        log::error!("{}", e);
    }

    let server_result = match server_finished {
        Some(result) => result,
        None => downstream_handle.await,
    };
    match server_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("HTTP server failed: {:#}", e),
        Err(e) => log::error!("HTTP server task failed: {}", e),
    }

    log::info!("Server stopped");
    Ok(())
}

async fn terminate() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        // On non-unix platforms, just wait forever.
        std::future::pending::<()>().await;
    }
}
