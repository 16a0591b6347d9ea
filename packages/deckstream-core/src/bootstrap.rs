//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root: the single place where the
//! event bus, its history, and the producer adapters are instantiated and
//! wired to the feed collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{DeckstreamError, DeckstreamResult};
use crate::events::{EventBus, EventHistory, EventSink};
use crate::prolink::{Network, TrackLookup};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::ProducerAdapters;
use crate::state::{Config, CoreState};

/// Container for all bootstrapped services.
///
/// Consumed by `AppState` to build the HTTP application state, and by the
/// feed (live network or replay) through [`BootstrappedServices::adapters`].
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Fan-out engine and replay history.
    pub bus: Arc<EventBus>,
    /// Feed-facing adapters publishing into `bus`.
    pub adapters: ProducerAdapters,
    /// Device topology and configuration collaborator.
    pub network: Arc<dyn Network>,
    /// Track database collaborator.
    pub tracks: Arc<dyn TrackLookup>,
    /// Runtime-mutable configuration.
    pub state: Arc<CoreState>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Stops background tasks and disconnects every client.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();

        let closed = self.bus.close_all();
        log::info!("[Bootstrap] Closed {} connection(s)", closed);

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps the engine around the given feed collaborators.
///
/// Wiring order:
///
/// 1. Validate config
/// 2. Shared infrastructure (spawner, cancellation token)
/// 3. History and bus
/// 4. History trim driver (runs until [`BootstrappedServices::shutdown`])
/// 5. Producer adapters (depend on bus and track lookup)
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`DeckstreamError::Configuration`] if `config` is invalid.
pub fn bootstrap_services(
    config: &Config,
    network: Arc<dyn Network>,
    tracks: Arc<dyn TrackLookup>,
) -> DeckstreamResult<BootstrappedServices> {
    config.validate().map_err(DeckstreamError::Configuration)?;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let history = EventHistory::new(config.history_ttl());
    let bus = Arc::new(EventBus::new(history, spawner.clone()));
    spawn_history_trim(
        &spawner,
        cancel_token.clone(),
        Arc::clone(&bus),
        config.history_trim_interval(),
    );

    let adapters = ProducerAdapters::new(
        Arc::clone(&bus) as Arc<dyn EventSink>,
        Arc::clone(&tracks),
    );

    Ok(BootstrappedServices {
        bus,
        adapters,
        network,
        tracks,
        state: Arc::new(CoreState::new(config.clone())),
        spawner,
        cancel_token,
    })
}

/// Evicts expired history every `period` until `cancel_token` fires.
fn spawn_history_trim(
    spawner: &TokioSpawner,
    cancel_token: CancellationToken,
    bus: Arc<EventBus>,
    period: Duration,
) {
    spawner.spawn_until_cancelled(cancel_token, async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = bus.trim_history();
            if removed > 0 {
                log::debug!("[Bootstrap] Trimmed {} expired history event(s)", removed);
            }
        }
    });

    log::info!("[Bootstrap] History trim driver started (every {:?})", period);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::bus::test_support::RecordingTransport;
    use crate::events::{kinds, Event, EventData};
    use crate::feed::{DetachedNetwork, TrackCatalog};
    use chrono::{TimeDelta, Utc};

    fn services(config: &Config) -> DeckstreamResult<BootstrappedServices> {
        bootstrap_services(
            config,
            Arc::new(DetachedNetwork::new()),
            Arc::new(TrackCatalog::new()),
        )
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = Config {
            outbound_queue_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(
            services(&config),
            Err(DeckstreamError::Configuration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrapped_bus_trims_expired_history() {
        let config = Config {
            history_ttl_secs: 60,
            history_trim_interval_secs: 1,
            ..Config::default()
        };
        let services = services(&config).unwrap();

        services.bus.publish(Event::at(
            kinds::SET_STARTED,
            None,
            EventData::None,
            Utc::now() - TimeDelta::minutes(5),
        ));
        services
            .bus
            .publish(Event::new(kinds::SET_ENDED, None, EventData::None));
        assert_eq!(services.bus.history().len(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let history = services.bus.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type(), kinds::SET_ENDED);
        services.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_trim_driver() {
        let config = Config {
            history_ttl_secs: 60,
            history_trim_interval_secs: 1,
            ..Config::default()
        };
        let services = services(&config).unwrap();
        services.shutdown();

        services.bus.publish(Event::at(
            kinds::SET_STARTED,
            None,
            EventData::None,
            Utc::now() - TimeDelta::minutes(5),
        ));
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(services.bus.history().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_connections() {
        let services = services(&Config::default()).unwrap();
        let transport = RecordingTransport::new("client");
        services.bus.register(transport.clone());

        services.shutdown();

        assert!(services.cancel_token.is_cancelled());
        assert_eq!(services.bus.connection_count(), 0);
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn adapters_publish_into_bus() {
        let services = services(&Config::default()).unwrap();

        services.adapters.mix_status.on_mix_event(
            crate::prolink::MixEventKind::SetStarted,
            &crate::prolink::StatusSnapshot::new(crate::prolink::DeviceId(1)),
        );

        assert_eq!(services.bus.history()[0].event_type(), kinds::SET_STARTED);
    }
}
