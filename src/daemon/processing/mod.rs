use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{error, trace};

use super::collection::sample::WindowSample;

pub mod blacklist;
pub mod dedup;
pub mod module;
pub mod recorder;

/// Receives window samples from the collector and hands them to a processor. A failing sample
/// is logged and dropped, the module keeps running until the collector goes away.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<WindowSample>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<WindowSample>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(sample) = self.receiver.recv().await {
            trace!("Processing sample taken at {}", sample.timestamp);
            if let Err(e) = self.processor.process_next(sample).await {
                error!("Error processing sample: {e:?}")
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{Result, bail};
    use chrono::Duration;
    use tokio::sync::mpsc;

    use super::{ProcessingModule, module::EventProcessor};
    use crate::{
        daemon::{collection::sample::WindowSample, storage::event_store::tests::at},
        utils::logging::TEST_LOGGING,
    };

    #[derive(Default, Clone)]
    struct FailingEveryOther {
        seen: usize,
        processed: Arc<Mutex<Vec<String>>>,
        finalized: Arc<Mutex<bool>>,
    }

    impl EventProcessor for FailingEveryOther {
        async fn process_next(&mut self, sample: WindowSample) -> Result<()> {
            self.seen += 1;
            if self.seen % 2 == 0 {
                bail!("simulated storage failure");
            }
            self.processed.lock().unwrap().push(sample.title.to_string());
            Ok(())
        }

        async fn finalize(&mut self) -> Result<()> {
            *self.finalized.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_processing() -> Result<()> {
        *TEST_LOGGING;
        let (sender, receiver) = mpsc::channel(10);
        for i in 0..4 {
            sender
                .send(WindowSample {
                    app: "code".into(),
                    title: format!("file {i}").into(),
                    timestamp: at(Duration::seconds(i)),
                })
                .await?;
        }
        drop(sender);

        let processor = FailingEveryOther::default();
        ProcessingModule::new(receiver, processor.clone()).run().await?;

        assert_eq!(
            *processor.processed.lock().unwrap(),
            vec!["file 0".to_string(), "file 2".to_string()]
        );
        assert!(*processor.finalized.lock().unwrap());
        Ok(())
    }
}
