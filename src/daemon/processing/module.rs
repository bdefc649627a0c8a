use anyhow::Result;

use crate::daemon::collection::sample::WindowSample;

/// Represents a consumer of window samples. The recorder writing to the local event store is
/// the only one today.
pub trait EventProcessor {
    fn process_next(
        &mut self,
        sample: WindowSample,
    ) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
