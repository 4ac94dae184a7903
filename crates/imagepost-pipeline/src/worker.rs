//! Background rendering with stale-result suppression.
//!
//! Control changes can arrive faster than a render finishes. A
//! [`RenderWorker`] serializes renders for one view on a dedicated
//! thread and makes sure an outdated image is never shown:
//!
//! - Every [`submit`](RenderWorker::submit) is tagged with a
//!   monotonically increasing generation.
//! - Only one request waits at a time; a newer submission replaces a
//!   request that has not started yet.
//! - A finished render whose generation is no longer the latest is
//!   dropped instead of delivered.
//!
//! The worker thread is stopped and joined when the worker is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use web_time::Instant;

use crate::pipeline::Pipeline;
use crate::types::{FilterConfig, Image, PipelineError};

/// Result of one render request.
#[derive(Debug)]
pub struct RenderOutcome {
    /// Generation returned by the matching [`RenderWorker::submit`].
    pub generation: u64,
    /// The rendered image, or why the render failed.
    pub result: Result<Image, PipelineError>,
}

struct Request {
    generation: u64,
    image: Option<Image>,
    config: FilterConfig,
}

#[derive(Default)]
struct Queue {
    pending: Option<Request>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
    latest: AtomicU64,
}

/// A single background render thread for one view.
pub struct RenderWorker {
    shared: Arc<Shared>,
    results: Receiver<RenderOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Start the render thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(pipeline: Pipeline) -> std::io::Result<Self> {
        Self::spawn_with(move |image, config| pipeline.run(image, config))
    }

    /// Start the render thread with an arbitrary render function.
    fn spawn_with<F>(render: F) -> std::io::Result<Self>
    where
        F: FnMut(Option<&Image>, &FilterConfig) -> Result<Image, PipelineError> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wake: Condvar::new(),
            latest: AtomicU64::new(0),
        });
        let (tx, results) = mpsc::channel();

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("imagepost-render".to_string())
            .spawn(move || render_loop(render, &worker_shared, &tx))?;

        Ok(Self {
            shared,
            results,
            handle: Some(handle),
        })
    }

    /// Queue a render of `image` with `config`, replacing any request
    /// that has not started yet. Returns the request's generation.
    pub fn submit(&self, image: Option<Image>, config: FilterConfig) -> u64 {
        let generation = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let mut queue = self
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(superseded) = queue.pending.replace(Request {
            generation,
            image,
            config,
        }) {
            tracing::debug!(
                superseded = superseded.generation,
                generation,
                "replaced pending render request"
            );
        }
        drop(queue);
        self.shared.wake.notify_one();
        generation
    }

    /// Generation of the most recent submission (0 before the first).
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.shared.latest.load(Ordering::Acquire)
    }

    /// Wait up to `timeout` for the outcome of the most recent
    /// submission, discarding any older outcomes still in the channel.
    ///
    /// Returns `None` on timeout or if the worker thread has stopped.
    pub fn recv_latest(&self, timeout: Duration) -> Option<RenderOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(outcome) if outcome.generation >= self.latest_generation() => {
                    return Some(outcome);
                }
                Ok(stale) => {
                    tracing::trace!(generation = stale.generation, "discarding stale render");
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("render thread panicked");
        }
    }
}

fn render_loop<F>(mut render: F, shared: &Shared, results: &Sender<RenderOutcome>)
where
    F: FnMut(Option<&Image>, &FilterConfig) -> Result<Image, PipelineError>,
{
    loop {
        let request = {
            let mut queue = shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
            loop {
                if queue.shutdown {
                    return;
                }
                if let Some(request) = queue.pending.take() {
                    break request;
                }
                queue = shared
                    .wake
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let result = render(request.image.as_ref(), &request.config);

        let latest = shared.latest.load(Ordering::Acquire);
        if request.generation < latest {
            tracing::debug!(
                generation = request.generation,
                latest,
                "dropping render superseded while in flight"
            );
            continue;
        }

        let outcome = RenderOutcome {
            generation: request.generation,
            result,
        };
        if results.send(outcome).is_err() {
            // Receiver gone: the worker is being dropped.
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbaImage;

    const WAIT: Duration = Duration::from_secs(30);

    fn photo() -> Image {
        #[allow(clippy::cast_possible_truncation)]
        let pixels = RgbaImage::from_fn(32, 32, |x, y| {
            image::Rgba([(x * 8) as u8, (y * 8) as u8, 60, 255])
        });
        Image::new(pixels)
    }

    #[test]
    fn single_request_is_delivered() {
        let worker = RenderWorker::spawn(Pipeline::new()).unwrap();
        let generation = worker.submit(Some(photo()), FilterConfig::default());
        assert_eq!(generation, 1);

        let outcome = worker.recv_latest(WAIT).unwrap();
        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.result.unwrap(), photo());
    }

    #[test]
    fn burst_of_requests_resolves_to_the_last_one() {
        let worker = RenderWorker::spawn(Pipeline::new()).unwrap();
        let configs: Vec<FilterConfig> = (0..6u8)
            .map(|step| FilterConfig {
                blur_radius: f32::from(step),
                pixellate_enabled: step % 2 == 0,
                ..FilterConfig::default()
            })
            .collect();
        for config in &configs {
            worker.submit(Some(photo()), *config);
        }
        assert_eq!(worker.latest_generation(), 6);

        let outcome = worker.recv_latest(WAIT).unwrap();
        assert_eq!(outcome.generation, 6);
        let expected = Pipeline::new().run(Some(&photo()), &configs[5]).unwrap();
        assert_eq!(outcome.result.unwrap(), expected);
    }

    #[test]
    fn render_superseded_while_in_flight_is_never_delivered() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut calls = 0u32;
        let worker = RenderWorker::spawn_with(move |image, config| {
            calls += 1;
            if calls == 1 {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            }
            Pipeline::new().run(image, config)
        })
        .unwrap();

        let first = FilterConfig {
            pixellate_enabled: true,
            ..FilterConfig::default()
        };
        assert_eq!(worker.submit(Some(photo()), first), 1);
        started_rx.recv_timeout(WAIT).unwrap();

        let second = FilterConfig {
            blur_radius: 2.0,
            ..FilterConfig::default()
        };
        assert_eq!(worker.submit(Some(photo()), second), 2);
        release_tx.send(()).unwrap();

        // Renders are sequential: had generation 1 been sent, it would
        // arrive before generation 2.
        let outcome = worker.results.recv_timeout(WAIT).unwrap();
        assert_eq!(outcome.generation, 2);
        let expected = Pipeline::new().run(Some(&photo()), &second).unwrap();
        assert_eq!(outcome.result.unwrap(), expected);
        assert!(worker.results.try_recv().is_err());
    }

    #[test]
    fn missing_image_is_reported_as_empty_input() {
        let worker = RenderWorker::spawn(Pipeline::new()).unwrap();
        worker.submit(None, FilterConfig::default());
        let outcome = worker.recv_latest(WAIT).unwrap();
        assert!(matches!(outcome.result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn recv_without_submission_times_out() {
        let worker = RenderWorker::spawn(Pipeline::new()).unwrap();
        assert!(worker.recv_latest(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn dropping_an_idle_worker_joins_the_thread() {
        let worker = RenderWorker::spawn(Pipeline::new()).unwrap();
        drop(worker);
    }
}
