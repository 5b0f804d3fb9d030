//! Deterministic test fixtures: synthetic images, a stub backend, and a
//! tempdir-backed snapshot store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tempfile::TempDir;

use mediaproof_harness::{
    CallContext, CallError, GenerationBackend, GenerationRequest, Monitor, StatusCode,
};
use mediaproof_image::{FrameBatch, PixelBuffer};
use mediaproof_snapshot::{Answer, Artifact, ResultValue, SnapshotStore};

/// Deterministic RGB noise. The same seed always produces the same
/// pixels, so snapshot round-trips are byte-stable.
pub fn noise_buffer(seed: u32, width: u32, height: u32) -> PixelBuffer {
    // Expand the 32-bit seed the same way for every fixture.
    let seed64 = u64::from(seed) | (u64::from(seed) << 32);
    let mut rng = Pcg32::seed_from_u64(seed64);
    let data = (0..width as usize * height as usize * 3)
        .map(|_| rng.gen::<f32>())
        .collect();
    PixelBuffer::new(width, height, 3, data).expect("fixture buffer dimensions are valid")
}

/// Horizontal gradient, for tests that want structure instead of noise.
pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _y in 0..height {
        for x in 0..width {
            let v = x as f32 / width.max(1) as f32;
            data.extend_from_slice(&[v, v, 1.0 - v]);
        }
    }
    PixelBuffer::new(width, height, 3, data).expect("fixture buffer dimensions are valid")
}

/// A snapshot store rooted in a fresh temp directory.
pub struct StoreFixture {
    pub dir: TempDir,
    pub store: SnapshotStore,
}

impl StoreFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = SnapshotStore::new(dir.path()).expect("failed to open snapshot store");
        Self { dir, store }
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process backend double: deterministic images from the request seed.
///
/// Result shape depends on `samples`, covering every flattener rule:
/// zero samples returns an answer with no image artifacts, one sample a
/// typed answer (image plus a non-image artifact), and more a frame
/// batch.
pub struct StubBackend {
    pub samples: usize,
}

impl StubBackend {
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }

    fn frame(&self, request: &GenerationRequest, index: u32) -> PixelBuffer {
        let width = request.width.unwrap_or(64);
        let height = request.height.unwrap_or(64);
        noise_buffer(request.seed.wrapping_add(index), width, height)
    }
}

impl GenerationBackend for StubBackend {
    fn generate(
        &mut self,
        request: &GenerationRequest,
        context: &mut CallContext,
    ) -> Result<ResultValue, CallError> {
        if request.text_prompts.is_empty() {
            return Err(context.abort(
                StatusCode::InvalidArgument,
                "at least one text prompt is required",
            ));
        }

        context.set_code(StatusCode::Ok);

        match self.samples {
            0 => Ok(ResultValue::Answer(
                Answer::new(&request.engine_id).with_artifact(Artifact::text("no images")),
            )),
            1 => Ok(ResultValue::Answer(
                Answer::new(&request.engine_id)
                    .with_artifact(Artifact::text("safety: passed"))
                    .with_artifact(Artifact::image(ResultValue::Buffer(
                        self.frame(request, 0),
                    ))),
            )),
            n => {
                let frames = (0..n as u32).map(|i| self.frame(request, i)).collect();
                let batch =
                    FrameBatch::new(frames).expect("stub frames share dimensions");
                Ok(ResultValue::Batch(batch))
            }
        }
    }
}

/// Backend that aborts with `OK` — the defect the harness must surface.
pub struct InvalidAbortBackend;

impl GenerationBackend for InvalidAbortBackend {
    fn generate(
        &mut self,
        _request: &GenerationRequest,
        context: &mut CallContext,
    ) -> Result<ResultValue, CallError> {
        Err(context.abort(StatusCode::Ok, "this abort is itself a bug"))
    }
}

/// Monitor that counts lifecycle calls, for teardown assertions.
#[derive(Clone, Default)]
pub struct RecordingMonitor {
    pub started: Arc<AtomicUsize>,
    pub stopped: Arc<AtomicUsize>,
}

impl Monitor for RecordingMonitor {
    fn start(&mut self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingMonitor {
    pub fn times_stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn times_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}
