//! Barcode capture engine.
//!
//! A state machine that owns a camera stream, polls a decoder against live
//! frames, and emits decoded tracking codes over a channel. The decoding
//! capability itself is opaque: a primary (platform-native) decoder is
//! preferred when the source reports support for it, otherwise the
//! software fallback is used. The choice is made once per stream start and
//! never changes mid-stream.
//!
//! Stopping is generation-guarded: a decode that completes after `stop()`
//! is dropped before emission, so no late result ever reaches ingestion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

/// Poll cadence while detecting
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Delay before auto-restarting the stream under [`ScanPolicy::StopAfterScan`]
const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Cooldown window under [`ScanPolicy::DebouncedContinuous`]
const DEBOUNCE_COOLDOWN: Duration = Duration::from_millis(500);

/// Camera acquisition failures, one distinct user-facing message per class
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Camera permission denied. Allow camera access and retry.")]
    PermissionDenied,
    #[error("No camera found on this device.")]
    NoDevice,
    #[error("Camera is in use by another application.")]
    DeviceBusy,
    #[error("Camera does not support the requested settings.")]
    ConstraintsUnsupported,
}

/// Expected, frequent decoder noise while no barcode is in frame.
/// Swallowed inside the detection loop, never user-visible.
#[derive(Debug, Error)]
#[error("decoder noise: {0}")]
pub struct DecodeNoise(pub String);

/// A single video frame handed to the decoder
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Barcode-recognition capability over a video frame.
///
/// `Ok(None)` means "no barcode in frame"; `Err` is decoder noise and is
/// swallowed by the engine.
pub trait Decoder {
    fn name(&self) -> &'static str;

    fn try_decode(&mut self, frame: &Frame) -> Result<Option<String>, DecodeNoise>;
}

/// Stream acquisition settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Specific camera to open; `None` picks the platform default
    pub device_id: Option<String>,
    /// Prefer a rear-facing camera when several are available
    pub prefer_rear: bool,
}

impl StreamConstraints {
    /// Relaxed defaults used for the one automatic retry after a
    /// [`CaptureError::ConstraintsUnsupported`] failure.
    #[must_use]
    pub fn relaxed() -> Self {
        Self::default()
    }
}

/// Camera abstraction the engine drives
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Request the stream; classification of failures is the source's job.
    async fn acquire(&mut self, constraints: &StreamConstraints) -> Result<(), CaptureError>;

    /// Next live frame. Only called while the stream is held.
    async fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Release the camera track. Must be safe to call in any state.
    fn release(&mut self);

    /// Whether the active track exposes a torch control
    fn has_torch(&self) -> bool;

    /// Torch on/off; only called when `has_torch()` is true
    fn set_torch(&mut self, on: bool);

    /// Probe for a platform-native barcode detector on this source
    fn supports_native_decode(&self) -> bool;
}

/// What to do after a successful decode. Exactly one policy is configured;
/// the variants are alternatives, not composable behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Stop the stream, auto-restart after a fixed delay
    #[default]
    StopAfterScan,
    /// Keep streaming; suppress further decodes for a cooldown window
    DebouncedContinuous,
    /// Stop the stream and wait for an explicit resume
    StopAndPrompt,
}

/// Observable engine state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    RequestingPermission,
    Streaming,
    Detecting,
    Failed(CaptureError),
}

/// Timing knobs, overridable for tests
#[derive(Debug, Clone)]
pub struct CaptureTiming {
    pub poll_interval: Duration,
    pub restart_delay: Duration,
    pub cooldown: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            restart_delay: RESTART_DELAY,
            cooldown: DEBOUNCE_COOLDOWN,
        }
    }
}

/// Handle for stopping a running engine from outside the loop
#[derive(Debug, Clone)]
pub struct StopHandle {
    generation: Arc<AtomicU64>,
}

impl StopHandle {
    /// Request a stop. The engine observes the bump at its next guard point;
    /// any decode already in flight is discarded before emission.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Which decoder slot is active for the current stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveDecoder {
    Primary,
    Fallback,
}

/// The capture state machine
pub struct CaptureEngine<S: FrameSource> {
    source: S,
    primary: Box<dyn Decoder + Send>,
    fallback: Box<dyn Decoder + Send>,
    policy: ScanPolicy,
    timing: CaptureTiming,
    constraints: StreamConstraints,
    state: CaptureState,
    torch_on: bool,
    generation: Arc<AtomicU64>,
}

impl<S: FrameSource> CaptureEngine<S> {
    pub fn new(
        source: S,
        primary: Box<dyn Decoder + Send>,
        fallback: Box<dyn Decoder + Send>,
        policy: ScanPolicy,
    ) -> Self {
        Self {
            source,
            primary,
            fallback,
            policy,
            timing: CaptureTiming::default(),
            constraints: StreamConstraints::default(),
            state: CaptureState::Idle,
            torch_on: false,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override timing (tests use near-zero intervals)
    #[must_use]
    pub fn with_timing(mut self, timing: CaptureTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Initial stream constraints
    #[must_use]
    pub fn with_constraints(mut self, constraints: StreamConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Current observable state
    #[must_use]
    pub const fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Handle for stopping the engine while `run` is in flight
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            generation: Arc::clone(&self.generation),
        }
    }

    /// Stop between runs: release the camera and invalidate late decodes.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.source.release();
        self.torch_on = false;
        self.state = CaptureState::Idle;
    }

    /// Switch to a different camera. Takes effect on the next `run`.
    pub fn switch_camera(&mut self, device_id: impl Into<String>) {
        self.stop();
        self.constraints.device_id = Some(device_id.into());
    }

    /// Toggle the torch. Never errors: unsupported tracks log a warning.
    pub fn toggle_torch(&mut self) {
        if self.source.has_torch() {
            self.torch_on = !self.torch_on;
            self.source.set_torch(self.torch_on);
        } else {
            tracing::warn!("torch not supported by the active camera track");
        }
    }

    /// Drive the state machine until stopped, failed, or (under
    /// [`ScanPolicy::StopAndPrompt`]) one value has been emitted.
    ///
    /// Decoded non-empty values are sent over `emit`; a closed receiver
    /// behaves like a stop request.
    pub async fn run(&mut self, emit: &mpsc::Sender<String>) -> Result<(), CaptureError> {
        let run_generation = self.generation.load(Ordering::SeqCst);

        self.acquire_stream().await?;

        let active = if self.source.supports_native_decode() {
            ActiveDecoder::Primary
        } else {
            ActiveDecoder::Fallback
        };
        tracing::debug!(decoder = self.decoder_name(active), "stream started");
        self.state = CaptureState::Streaming;

        loop {
            if self.stopped(run_generation) {
                break;
            }

            self.state = CaptureState::Detecting;
            let frame = match self.source.next_frame().await {
                Ok(frame) => frame,
                Err(error) => {
                    self.source.release();
                    self.state = CaptureState::Failed(error.clone());
                    return Err(error);
                }
            };

            let decoded = {
                let decoder = match active {
                    ActiveDecoder::Primary => &mut self.primary,
                    ActiveDecoder::Fallback => &mut self.fallback,
                };
                match decoder.try_decode(&frame) {
                    Ok(value) => value,
                    Err(noise) => {
                        // Expected while no barcode is in frame.
                        tracing::trace!(%noise, "decode attempt failed");
                        None
                    }
                }
            };

            match decoded {
                Some(value) if !value.is_empty() => {
                    // Guard against a decode that raced a stop request.
                    if self.stopped(run_generation) {
                        break;
                    }
                    if emit.send(value).await.is_err() {
                        break;
                    }

                    match self.policy {
                        ScanPolicy::StopAfterScan => {
                            self.source.release();
                            self.state = CaptureState::Idle;
                            tokio::time::sleep(self.timing.restart_delay).await;
                            if self.stopped(run_generation) {
                                return Ok(());
                            }
                            self.acquire_stream().await?;
                            self.state = CaptureState::Streaming;
                        }
                        ScanPolicy::DebouncedContinuous => {
                            tokio::time::sleep(self.timing.cooldown).await;
                        }
                        ScanPolicy::StopAndPrompt => {
                            self.source.release();
                            self.state = CaptureState::Idle;
                            return Ok(());
                        }
                    }
                }
                _ => {
                    tokio::time::sleep(self.timing.poll_interval).await;
                }
            }
        }

        self.source.release();
        self.state = CaptureState::Idle;
        Ok(())
    }

    /// Acquire the stream, retrying once with relaxed constraints when the
    /// requested ones are unsupported.
    async fn acquire_stream(&mut self) -> Result<(), CaptureError> {
        self.state = CaptureState::RequestingPermission;

        match self.source.acquire(&self.constraints).await {
            Ok(()) => Ok(()),
            Err(CaptureError::ConstraintsUnsupported) => {
                tracing::debug!("constraints unsupported, retrying with defaults");
                let relaxed = StreamConstraints::relaxed();
                match self.source.acquire(&relaxed).await {
                    Ok(()) => {
                        self.constraints = relaxed;
                        Ok(())
                    }
                    Err(error) => {
                        self.state = CaptureState::Failed(error.clone());
                        Err(error)
                    }
                }
            }
            Err(error) => {
                self.state = CaptureState::Failed(error.clone());
                Err(error)
            }
        }
    }

    fn stopped(&self, run_generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != run_generation
    }

    fn decoder_name(&self, active: ActiveDecoder) -> &'static str {
        match active {
            ActiveDecoder::Primary => self.primary.name(),
            ActiveDecoder::Fallback => self.fallback.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Decoder fed a script of results; exhaustion means "no barcode".
    struct ScriptedDecoder {
        name: &'static str,
        script: VecDeque<Result<Option<String>, DecodeNoise>>,
        /// When set, `stop()` is called right before a successful decode is
        /// returned, simulating a stop racing an in-flight decode.
        stop_before_success: Option<StopHandle>,
    }

    impl ScriptedDecoder {
        fn new(name: &'static str, script: Vec<Result<Option<String>, DecodeNoise>>) -> Self {
            Self {
                name,
                script: script.into(),
                stop_before_success: None,
            }
        }
    }

    impl Decoder for ScriptedDecoder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn try_decode(&mut self, _frame: &Frame) -> Result<Option<String>, DecodeNoise> {
            let next = self.script.pop_front().unwrap_or(Ok(None));
            if let (Ok(Some(_)), Some(handle)) = (&next, &self.stop_before_success) {
                handle.stop();
            }
            next
        }
    }

    /// Source with configurable acquisition behavior and native-probe result.
    struct FakeSource {
        native: bool,
        fail_specific_constraints: bool,
        hard_failure: Option<CaptureError>,
        acquired: bool,
        acquire_calls: usize,
        torch: bool,
    }

    impl FakeSource {
        fn ok(native: bool) -> Self {
            Self {
                native,
                fail_specific_constraints: false,
                hard_failure: None,
                acquired: false,
                acquire_calls: 0,
                torch: false,
            }
        }
    }

    impl FrameSource for FakeSource {
        async fn acquire(&mut self, constraints: &StreamConstraints) -> Result<(), CaptureError> {
            self.acquire_calls += 1;
            if let Some(error) = &self.hard_failure {
                return Err(error.clone());
            }
            if self.fail_specific_constraints && *constraints != StreamConstraints::relaxed() {
                return Err(CaptureError::ConstraintsUnsupported);
            }
            self.acquired = true;
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
            if self.acquired {
                Ok(Frame::default())
            } else {
                Err(CaptureError::DeviceBusy)
            }
        }

        fn release(&mut self) {
            self.acquired = false;
        }

        fn has_torch(&self) -> bool {
            self.torch
        }

        fn set_torch(&mut self, _on: bool) {}

        fn supports_native_decode(&self) -> bool {
            self.native
        }
    }

    fn fast_timing() -> CaptureTiming {
        CaptureTiming {
            poll_interval: Duration::from_millis(1),
            restart_delay: Duration::from_millis(1),
            cooldown: Duration::from_millis(1),
        }
    }

    fn noise() -> Result<Option<String>, DecodeNoise> {
        Err(DecodeNoise("blur".to_string()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn emits_decoded_value_and_swallows_noise() {
        let primary = ScriptedDecoder::new(
            "native",
            vec![Ok(None), noise(), Ok(Some("1Z999AA1".to_string()))],
        );
        let fallback = ScriptedDecoder::new("soft", vec![]);
        let mut engine = CaptureEngine::new(
            FakeSource::ok(true),
            Box::new(primary),
            Box::new(fallback),
            ScanPolicy::StopAndPrompt,
        )
        .with_timing(fast_timing());

        let (tx, mut rx) = mpsc::channel(4);
        engine.run(&tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "1Z999AA1");
        assert_eq!(*engine.state(), CaptureState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fallback_decoder_is_used_without_native_support() {
        let primary = ScriptedDecoder::new("native", vec![Ok(Some("WRONG".to_string()))]);
        let fallback = ScriptedDecoder::new("soft", vec![Ok(Some("RIGHT".to_string()))]);
        let mut engine = CaptureEngine::new(
            FakeSource::ok(false),
            Box::new(primary),
            Box::new(fallback),
            ScanPolicy::StopAndPrompt,
        )
        .with_timing(fast_timing());

        let (tx, mut rx) = mpsc::channel(4);
        engine.run(&tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "RIGHT");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_discards_in_flight_decode() {
        let mut primary =
            ScriptedDecoder::new("native", vec![Ok(None), Ok(Some("LATE".to_string()))]);
        let fallback = ScriptedDecoder::new("soft", vec![]);
        let source = FakeSource::ok(true);

        // Wire the decoder so a stop lands between decode and emission.
        let mut engine_shell = CaptureEngine::new(
            source,
            Box::new(ScriptedDecoder::new("placeholder", vec![])),
            Box::new(fallback),
            ScanPolicy::DebouncedContinuous,
        )
        .with_timing(fast_timing());
        primary.stop_before_success = Some(engine_shell.stop_handle());
        engine_shell.primary = Box::new(primary);

        let (tx, mut rx) = mpsc::channel(4);
        engine_shell.run(&tx).await.unwrap();
        drop(tx);

        // The late decode must not have been emitted.
        assert!(rx.recv().await.is_none());
        assert_eq!(*engine_shell.state(), CaptureState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn permission_denied_surfaces_and_sets_failed_state() {
        let mut source = FakeSource::ok(true);
        source.hard_failure = Some(CaptureError::PermissionDenied);

        let mut engine = CaptureEngine::new(
            source,
            Box::new(ScriptedDecoder::new("native", vec![])),
            Box::new(ScriptedDecoder::new("soft", vec![])),
            ScanPolicy::StopAfterScan,
        );

        let (tx, _rx) = mpsc::channel(4);
        let err = engine.run(&tx).await.unwrap_err();
        assert_eq!(err, CaptureError::PermissionDenied);
        assert_eq!(
            *engine.state(),
            CaptureState::Failed(CaptureError::PermissionDenied)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsupported_constraints_retry_once_relaxed() {
        let mut source = FakeSource::ok(true);
        source.fail_specific_constraints = true;

        let mut engine = CaptureEngine::new(
            source,
            Box::new(ScriptedDecoder::new(
                "native",
                vec![Ok(Some("OK".to_string()))],
            )),
            Box::new(ScriptedDecoder::new("soft", vec![])),
            ScanPolicy::StopAndPrompt,
        )
        .with_timing(fast_timing())
        .with_constraints(StreamConstraints {
            device_id: Some("rear-1".to_string()),
            prefer_rear: true,
        });

        let (tx, mut rx) = mpsc::channel(4);
        engine.run(&tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "OK");
        assert_eq!(engine.source.acquire_calls, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_after_scan_restarts_the_stream() {
        let primary = ScriptedDecoder::new(
            "native",
            vec![Ok(Some("FIRST".to_string())), Ok(Some("SECOND".to_string()))],
        );
        let mut engine = CaptureEngine::new(
            FakeSource::ok(true),
            Box::new(primary),
            Box::new(ScriptedDecoder::new("soft", vec![])),
            ScanPolicy::StopAfterScan,
        )
        .with_timing(fast_timing());

        let handle = engine.stop_handle();
        let (tx, mut rx) = mpsc::channel(4);

        let run = engine.run(&tx);
        tokio::pin!(run);

        // Collect two emissions, proving the stream restarted, then stop.
        let mut seen = Vec::new();
        while seen.len() < 2 {
            tokio::select! {
                result = &mut run => {
                    panic!("run ended before both scans: {result:?}");
                }
                Some(value) = rx.recv() => {
                    seen.push(value);
                }
            }
        }
        handle.stop();
        run.await.unwrap();

        assert_eq!(seen, vec!["FIRST", "SECOND"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn toggle_torch_without_support_is_silent() {
        let mut engine = CaptureEngine::new(
            FakeSource::ok(true),
            Box::new(ScriptedDecoder::new("native", vec![])),
            Box::new(ScriptedDecoder::new("soft", vec![])),
            ScanPolicy::StopAfterScan,
        );

        // No torch on the fake source; must not panic or error.
        engine.toggle_torch();
        assert!(!engine.torch_on);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn switch_camera_updates_constraints_and_idles() {
        let mut engine = CaptureEngine::new(
            FakeSource::ok(true),
            Box::new(ScriptedDecoder::new("native", vec![])),
            Box::new(ScriptedDecoder::new("soft", vec![])),
            ScanPolicy::StopAfterScan,
        );

        engine.switch_camera("front-2");
        assert_eq!(*engine.state(), CaptureState::Idle);
        assert_eq!(engine.constraints.device_id.as_deref(), Some("front-2"));
    }
}
