//! Render worker for andruck pipeline processing.
//!
//! A host drives renders from an interactive surface and must never
//! block on one. [`RenderWorker`] owns a dedicated thread that consumes
//! a FIFO queue of [`RenderRequest`]s and emits [`RenderResponse`]s on
//! a channel, each tagged with the task class of the run that produced
//! it, in run order.
//!
//! Three task classes exist — `preview`, `loupe`, `export` — and the
//! queue holds at most one *unstarted* request per class: submitting a
//! new request while an older one of the same class is still queued
//! replaces it in place (same queue position). A run that has already
//! started is never preempted; there is no mid-run cancellation. No
//! state survives from one run to the next.
//!
//! The message types serialize with serde, so the same protocol works
//! over an in-process channel or a JSON boundary.

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use andruck_pipeline::{
    render, ActiveModules, ParamBundle, RenderError, RenderOptions, RgbaImage,
};

/// The class of a render request.
///
/// The host debounces and coalesces per class; the worker treats the
/// class as an opaque tag except for queue coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskClass {
    /// Bounded-size interactive preview.
    Preview,
    /// Full-resolution sample under the magnifier.
    Loupe,
    /// Full-resolution (optionally upscaled) export.
    Export,
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview => f.write_str("preview"),
            Self::Loupe => f.write_str("loupe"),
            Self::Export => f.write_str("export"),
        }
    }
}

/// A raster crossing the worker boundary: dimensions plus a packed
/// RGBA byte buffer (`(y * width + x) * 4` indexing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterPayload {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA bytes, row-major.
    pub pixels: Vec<u8>,
}

impl RasterPayload {
    /// Wrap a pipeline raster.
    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }

    /// Convert into a pipeline raster.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidParameter`] when the byte buffer
    /// does not match `width * height * 4`.
    pub fn into_image(self) -> Result<RgbaImage, RenderError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() != expected {
            return Err(RenderError::InvalidParameter(format!(
                "source buffer holds {} bytes, expected {expected}",
                self.pixels.len()
            )));
        }
        RgbaImage::from_raw(self.width, self.height, self.pixels).ok_or_else(|| {
            RenderError::InvalidParameter("source buffer does not form a raster".into())
        })
    }
}

/// One render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Task class (also the coalescing key).
    pub task: TaskClass,
    /// Source raster.
    pub source: RasterPayload,
    /// Active module ids.
    pub active: ActiveModules,
    /// Raw parameter bundle.
    pub params: ParamBundle,
    /// Export mode flag.
    pub for_export: bool,
    /// Preview clamp for the longest axis.
    pub preview_max_px: u32,
    /// Integer export upscale factor.
    pub upscale: u32,
}

impl RenderRequest {
    /// The run options encoded in this request.
    #[must_use]
    pub const fn options(&self) -> RenderOptions {
        RenderOptions {
            for_export: self.for_export,
            preview_max_px: self.preview_max_px,
            upscale: self.upscale,
        }
    }
}

/// One render response, emitted in run order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    /// Class of the run that produced this response.
    pub task: TaskClass,
    /// The finished raster, or the error that rejected the run.
    pub result: Result<RasterPayload, RenderError>,
}

/// Pending-work queue shared between host handle and worker thread.
#[derive(Default)]
struct QueueState {
    pending: VecDeque<RenderRequest>,
    shutdown: bool,
}

impl QueueState {
    /// Enqueue a request, coalescing onto a queued-but-unstarted
    /// request of the same class. The replaced request keeps its queue
    /// position, preserving FIFO fairness between classes.
    fn enqueue(&mut self, request: RenderRequest) {
        match self
            .pending
            .iter_mut()
            .find(|queued| queued.task == request.task)
        {
            Some(queued) => *queued = request,
            None => self.pending.push_back(request),
        }
    }
}

/// A render worker backed by one dedicated thread.
///
/// Dropping the worker shuts the thread down after the in-progress run
/// (if any) completes; queued requests that never started are dropped.
pub struct RenderWorker {
    queue: Arc<(Mutex<QueueState>, Condvar)>,
    results: Receiver<RenderResponse>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Start the worker thread.
    #[must_use]
    pub fn spawn() -> Self {
        let queue = Arc::new((Mutex::new(QueueState::default()), Condvar::new()));
        let (sender, results) = channel();
        let worker_queue = Arc::clone(&queue);
        let handle = std::thread::spawn(move || worker_loop(&worker_queue, &sender));
        Self {
            queue,
            results,
            handle: Some(handle),
        }
    }

    /// Submit a request.
    ///
    /// If a request of the same task class is queued but not yet
    /// started, the new request replaces it; otherwise it joins the
    /// back of the FIFO queue.
    pub fn submit(&self, request: RenderRequest) {
        let (state, ready) = &*self.queue;
        if let Ok(mut state) = state.lock() {
            state.enqueue(request);
            ready.notify_one();
        }
    }

    /// The response channel. Responses arrive in the order their runs
    /// completed, which is the order the runs were dequeued.
    #[must_use]
    pub const fn results(&self) -> &Receiver<RenderResponse> {
        &self.results
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let (state, ready) = &*self.queue;
        if let Ok(mut state) = state.lock() {
            state.shutdown = true;
            ready.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker thread body: pop one request at a time, render, respond.
fn worker_loop(queue: &Arc<(Mutex<QueueState>, Condvar)>, sender: &Sender<RenderResponse>) {
    let (state, ready) = &**queue;
    loop {
        let request = {
            let Ok(mut guard) = state.lock() else {
                return;
            };
            loop {
                if let Some(request) = guard.pending.pop_front() {
                    break request;
                }
                if guard.shutdown {
                    return;
                }
                guard = match ready.wait(guard) {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
        };

        let response = RenderResponse {
            task: request.task,
            result: process(request),
        };
        // A dropped receiver means the host is gone; keep draining so
        // shutdown still happens promptly.
        let _ = sender.send(response);
    }
}

/// Run one request through the pipeline.
fn process(request: RenderRequest) -> Result<RasterPayload, RenderError> {
    let options = request.options();
    let source = request.source.into_image()?;
    let output = render(&source, &request.active, &request.params, &options)?;
    Ok(RasterPayload::from_image(output))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    const RECV_TIMEOUT: Duration = Duration::from_secs(30);

    fn gray_payload(w: u32, h: u32, v: u8) -> RasterPayload {
        RasterPayload::from_image(RgbaImage::from_fn(w, h, |_, _| image::Rgba([v, v, v, 255])))
    }

    fn request(task: TaskClass, source: RasterPayload) -> RenderRequest {
        RenderRequest {
            task,
            source,
            active: ActiveModules::new(),
            params: ParamBundle::new(),
            for_export: true,
            preview_max_px: 1400,
            upscale: 1,
        }
    }

    #[test]
    fn renders_a_request_end_to_end() {
        let worker = RenderWorker::spawn();
        worker.submit(request(TaskClass::Preview, gray_payload(24, 16, 90)));

        let response = worker.results().recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(response.task, TaskClass::Preview);
        let raster = response.result.unwrap();
        assert_eq!((raster.width, raster.height), (24, 16));
        assert_eq!(raster.pixels.len(), 24 * 16 * 4);
    }

    #[test]
    fn responses_preserve_submission_order() {
        let worker = RenderWorker::spawn();
        worker.submit(request(TaskClass::Preview, gray_payload(16, 16, 40)));
        worker.submit(request(TaskClass::Loupe, gray_payload(16, 16, 90)));
        worker.submit(request(TaskClass::Export, gray_payload(16, 16, 160)));

        let classes: Vec<TaskClass> = (0..3)
            .map(|_| worker.results().recv_timeout(RECV_TIMEOUT).unwrap().task)
            .collect();
        // FIFO may have started request 1 before 2 and 3 arrived, but
        // emission order always matches dequeue order.
        assert_eq!(
            classes,
            vec![TaskClass::Preview, TaskClass::Loupe, TaskClass::Export]
        );
    }

    #[test]
    fn queue_coalesces_same_class_in_place() {
        let mut state = QueueState::default();
        state.enqueue(request(TaskClass::Preview, gray_payload(8, 8, 10)));
        state.enqueue(request(TaskClass::Export, gray_payload(8, 8, 20)));
        state.enqueue(request(TaskClass::Preview, gray_payload(8, 8, 30)));

        assert_eq!(state.pending.len(), 2);
        // The replacement kept the original queue position.
        assert_eq!(state.pending[0].task, TaskClass::Preview);
        assert_eq!(state.pending[0].source, gray_payload(8, 8, 30));
        assert_eq!(state.pending[1].task, TaskClass::Export);
    }

    #[test]
    fn invalid_source_yields_an_error_response() {
        let worker = RenderWorker::spawn();
        let mut bad = gray_payload(8, 8, 0);
        bad.pixels.truncate(7);
        worker.submit(request(TaskClass::Export, bad));

        let response = worker.results().recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(response.task, TaskClass::Export);
        assert!(matches!(
            response.result,
            Err(RenderError::InvalidParameter(_))
        ));
    }

    #[test]
    fn zero_dimension_source_is_rejected_not_fatal() {
        let worker = RenderWorker::spawn();
        worker.submit(request(
            TaskClass::Preview,
            RasterPayload {
                width: 0,
                height: 0,
                pixels: Vec::new(),
            },
        ));
        let response = worker.results().recv_timeout(RECV_TIMEOUT).unwrap();
        assert!(matches!(response.result, Err(RenderError::EmptyInput)));

        // The worker survives and serves the next request.
        worker.submit(request(TaskClass::Preview, gray_payload(8, 8, 128)));
        let response = worker.results().recv_timeout(RECV_TIMEOUT).unwrap();
        assert!(response.result.is_ok());
    }

    #[test]
    fn drop_shuts_the_worker_down() {
        let worker = RenderWorker::spawn();
        worker.submit(request(TaskClass::Preview, gray_payload(8, 8, 128)));
        let _ = worker.results().recv_timeout(RECV_TIMEOUT).unwrap();
        drop(worker); // must not hang
    }

    #[test]
    fn request_round_trips_through_json() {
        let req = request(TaskClass::Loupe, gray_payload(4, 4, 77));
        let json = serde_json::to_string(&req).unwrap();
        let back: RenderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn task_class_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TaskClass::Preview).unwrap(), "\"preview\"");
        assert_eq!(serde_json::to_string(&TaskClass::Loupe).unwrap(), "\"loupe\"");
        assert_eq!(serde_json::to_string(&TaskClass::Export).unwrap(), "\"export\"");
    }
}
