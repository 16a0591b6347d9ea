//! Log output of a failed track lookup.

use std::sync::Arc;

use deckstream_core::feed::{DetachedNetwork, TrackCatalog};
use deckstream_core::prolink::{DeviceId, MixEventKind, StatusSnapshot};
use deckstream_core::{bootstrap_services, Config};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

/// Logger that keeps every record for inspection.
struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: parking_lot::const_mutex(Vec::new()),
};

#[tokio::test]
async fn failed_now_playing_lookup_logs_one_error() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let services = bootstrap_services(
        &Config::default(),
        Arc::new(DetachedNetwork::new()),
        Arc::new(TrackCatalog::new()),
    )
    .unwrap();

    let mut status = StatusSnapshot::new(DeviceId(2));
    status.track_id = 991;
    services
        .adapters
        .mix_status
        .on_mix_event(MixEventKind::NowPlaying, &status);

    let errors: Vec<String> = LOGGER
        .records
        .lock()
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, message)| message.clone())
        .collect();
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].starts_with("[MixStatus]"));
    assert!(errors[0].contains("now_playing on player 2"));
    assert!(services.bus.history().is_empty());
}
