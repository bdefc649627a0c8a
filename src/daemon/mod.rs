use std::{path::Path, time::Duration};

use anyhow::Result;
use collection::{collector::WindowSampler, sample::WindowSample};
use processing::{ProcessingModule, recorder::EventRecorder};
use storage::event_store::EventStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    utils::{
        clock::{Clock, DefaultClock},
        dir::database_path,
    },
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(2);

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: &Path, collection_interval: Duration) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<WindowSample>(10);
    let manager = GenericWindowManager::new()?;

    let shutdown_token = CancellationToken::new();

    let collector = create_collector(
        sender,
        manager,
        &shutdown_token,
        DefaultClock,
        collection_interval,
    );

    let processor = create_processor(EventStore::open(&database_path(dir))?, receiver);

    info!("Recording every {collection_interval:?} into {}", dir.display());

    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = collector.run().await;
            // Lets the shutdown watcher finish if the collector stopped on its own.
            shutdown_token.cancel();
            result
        },
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_collector(
    sender: mpsc::Sender<WindowSample>,
    manager: impl WindowManager + 'static,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
    collection_interval: Duration,
) -> WindowSampler {
    WindowSampler::new(
        sender,
        Box::new(manager),
        shutdown_token.clone(),
        collection_interval,
        Box::new(clock),
    )
}

fn create_processor(
    store: EventStore,
    receiver: mpsc::Receiver<WindowSample>,
) -> ProcessingModule<EventRecorder> {
    ProcessingModule::new(receiver, EventRecorder::new(store))
}
