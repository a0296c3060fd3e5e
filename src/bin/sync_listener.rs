//! Sync Listener
//!
//! Connects to the real-time sync server, subscribes to the configured
//! channels and logs every event it receives until Ctrl+C.

use anyhow::{Context, Result};
use realtime_sync::bin_common::resolve_config_path;
use realtime_sync::syncsockets::{ClientEvent, EventType, Signal, SyncClient, Topic};
use realtime_sync::{init_logging_with_level, SyncConfig};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the lifecycle event stream is drained
const EVENT_DRAIN_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = resolve_config_path(std::env::args().skip(1));
    let config = SyncConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // Initialize logging with configured level
    init_logging_with_level(&config.log_level);
    config.log();

    let client = config.client()?;

    for event_type in EventType::ALL {
        client.on(event_type, |signal| {
            if let Some(event) = signal.as_event() {
                info!(
                    "[{}] {} booking={} vehicle={} data={}",
                    event.event_type(),
                    event.id(),
                    event.booking_id().unwrap_or("-"),
                    event.vehicle_id().unwrap_or("-"),
                    event.payload()
                );
            }
            Ok(())
        });
    }

    client.on(Topic::Connected, |_| {
        info!("Connected to sync server");
        Ok(())
    });
    client.on(Topic::Disconnected, |signal| {
        if let Signal::Disconnected { reason } = signal {
            warn!("Disconnected: {}", reason);
        }
        Ok(())
    });
    client.on(Topic::MaxReconnectAttemptsReached, |signal| {
        if let Signal::MaxReconnectAttemptsReached { attempts } = signal {
            warn!("Gave up after {} reconnection attempts, waiting for Ctrl+C", attempts);
        }
        Ok(())
    });

    client.subscribe(config.channels.iter().cloned());
    client.connect(&config.user_id, config.token.as_deref())?;

    print_banner("Sync Listener", config.endpoint());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut drain = tokio::time::interval(EVENT_DRAIN_INTERVAL);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
            _ = drain.tick() => drain_lifecycle_events(&client),
        }
    }

    let metrics = client.metrics();
    client.disconnect();

    print_shutdown(
        "Sync listener",
        &format!(
            "Received {} events ({} malformed), sent {} messages, {} reconnects",
            metrics.messages_received,
            metrics.malformed_messages,
            metrics.messages_sent,
            metrics.reconnect_count
        ),
    );
    Ok(())
}

/// Log everything waiting on the client's lifecycle stream
fn drain_lifecycle_events(client: &SyncClient) {
    while let Some(event) = client.try_recv_event() {
        match event {
            ClientEvent::Reconnecting(attempt) => info!("Reconnection attempt {} scheduled", attempt),
            ClientEvent::Error(message) => error!("Connection error: {}", message),
            ClientEvent::RetriesExhausted(attempts) => {
                warn!("Retries exhausted after {} attempts", attempts)
            }
            // Connected and Disconnected are already logged by the signal listeners
            other => debug!("Lifecycle event: {:?}", other),
        }
    }
}

fn print_banner(name: &str, endpoint: &str) {
    info!("");
    info!("========================================");
    info!("Starting {}", name);
    info!("Endpoint: {}", endpoint);
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown(name: &str, stats: &str) {
    info!("");
    info!("========================================");
    info!("{} stopped gracefully", name);
    info!("{}", stats);
    info!("========================================");
}
