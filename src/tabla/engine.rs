// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The self-rescheduling tabla loop driver.
//!
//! A start resolves the anchor and first variant, loads both stems as a pair,
//! starts them together and arms a one-shot swap timer that fires just before
//! the stretched loop ends. Each swap re-resolves against the current tempo,
//! rotates the variant, queues the new pair on the device and re-arms. At most
//! one swap timer exists at a time: arming always cancels the previous one, and
//! stop cancels it synchronously.
//!
//! Swap timers are aimed at loop boundaries, not at the moment the previous
//! swap finished. A `LoopClock` follows where the device's boundaries fall so
//! the lead-in doesn't accumulate from one pass to the next.

use std::{
    future::{Future, IntoFuture},
    path::PathBuf,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::{debug, info, span, warn, Instrument, Level, Span};

use super::anchors::resolve_anchor;
use super::rate::{playback_rate, stretched};
use super::stems::StemPaths;
use super::style::Style;
use super::variant::VariantCursor;
use crate::audio::{Device, LoadError, StemLoader, StemPair};

/// How long before the end of the loop the next swap starts loading.
pub const DEFAULT_LEAD_IN: Duration = Duration::from_millis(50);

/// How long a failed start shows the error status.
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_secs(2);

/// Floor for the swap timer so very short stems can't spin.
const MIN_SWAP_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unable to load tabla stems: {0}")]
    Load(#[from] LoadError),

    #[error("output device error: {0}")]
    Device(String),

    #[error("tabla load task failed: {0}")]
    Task(String),
}

/// Where the loop driver is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Loading,
    Playing,
}

/// What the control surface shows for the tabla.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Stopped,
    Loading,
    Playing,
    /// A start failed. Reverts to `Stopped` after the error display delay.
    Error,
}

/// Engine tuning that doesn't change while running.
#[derive(Clone, Debug)]
pub struct Options {
    /// Root of the tabla sample bank.
    pub samples: PathBuf,
    pub lead_in: Duration,
    pub error_display: Duration,
}

impl Options {
    pub fn new(samples: PathBuf) -> Options {
        Options {
            samples,
            lead_in: DEFAULT_LEAD_IN,
            error_display: DEFAULT_ERROR_DISPLAY,
        }
    }
}

/// A point-in-time view of the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    /// The selected style. A running loop keeps the style it was started with.
    pub style: Style,
    pub tempo: u32,
    pub anchor: Option<u32>,
    pub variant: Option<&'static str>,
    pub rate: Option<f64>,
    pub cursor: usize,
    pub pending_swaps: usize,
}

/// A start or tempo change whose stems load on their own task. The state
/// change has already happened when this is returned. Await it for the load
/// result, or drop it and let the load finish in the background; failures are
/// logged either way.
pub struct Load {
    handle: Option<JoinHandle<Result<(), EngineError>>>,
}

impl Load {
    fn done() -> Load {
        Load { handle: None }
    }

    fn spawn(task: impl Future<Output = Result<(), EngineError>> + Send + 'static) -> Load {
        Load {
            handle: Some(tokio::spawn(task)),
        }
    }
}

impl IntoFuture for Load {
    type Output = Result<(), EngineError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            match self.handle {
                Some(handle) => handle.await.map_err(|e| EngineError::Task(e.to_string()))?,
                None => Ok(()),
            }
        })
    }
}

/// The one outstanding swap timer and the handle that cancels it.
struct SwapTimer {
    id: u64,
    handle: JoinHandle<()>,
}

impl SwapTimer {
    fn cancel(self) {
        debug!(id = self.id, "Cancelling swap timer");
        self.handle.abort();
    }
}

/// The take most recently handed to the device.
struct Playback {
    anchor: u32,
    variant: &'static str,
    rate: f64,
    stems: StemPair,
}

impl Playback {
    /// How long one pass of the loop lasts at the current rate.
    fn loop_length(&self) -> Duration {
        stretched(self.stems.duration(), self.rate)
    }
}

/// Follows where the device's loop boundaries fall. Queued stems begin at the
/// next boundary and replaced stems keep the loop's phase, mirroring the mixer.
struct LoopClock {
    /// When the audible pass ends.
    boundary: Instant,
    /// Length of the audible pass.
    length: Duration,
    /// Length of the take queued to begin at `boundary`.
    queued: Option<Duration>,
}

impl LoopClock {
    fn new(now: Instant, length: Duration) -> LoopClock {
        LoopClock {
            boundary: now + length,
            length,
            queued: None,
        }
    }

    /// Moves past every boundary the device has already crossed.
    fn catch_up(&mut self, now: Instant) {
        while self.boundary <= now {
            if let Some(length) = self.queued.take() {
                self.length = length;
            }
            if self.length.is_zero() {
                self.boundary = now;
                break;
            }
            self.boundary += self.length;
        }
    }

    /// A take queued at `now` begins at the next boundary.
    fn queue(&mut self, now: Instant, length: Duration) {
        self.catch_up(now);
        self.queued = Some(length);
    }

    /// Nothing new was queued, so the audible take plays one more pass.
    fn repeat(&mut self, now: Instant) {
        self.catch_up(now);
        let length = self.length;
        self.queued.get_or_insert(length);
    }

    /// A take replaced at `now` keeps the phase, so the rest of the pass
    /// scales with the new length. Anything queued is dropped by the device.
    fn replace(&mut self, now: Instant, length: Duration) {
        self.catch_up(now);
        let remaining = self.boundary.saturating_duration_since(now);
        let remaining = if self.length.is_zero() {
            length
        } else {
            remaining.mul_f64(length.as_secs_f64() / self.length.as_secs_f64())
        };
        self.boundary = now + remaining;
        self.length = length;
        self.queued = None;
    }

    /// When the next take has to start loading: the lead-in before the end of
    /// the pass filled by the last take handed to the device.
    fn next_swap(&self, lead_in: Duration) -> Instant {
        let end = self.boundary + self.queued.unwrap_or_default();
        end.checked_sub(lead_in).unwrap_or(end)
    }
}

/// All mutable engine state. Owned by one engine and only touched under its lock.
pub struct PercussionEngineState {
    phase: Phase,
    /// Style picked by the user.
    style: Style,
    /// Style of the running session, fixed at start.
    session_style: Style,
    tempo: u32,
    cursor: VariantCursor,
    /// Bumped on every start and stop.
    session: u64,
    /// Bumped on every load request.
    generation: u64,
    next_timer_id: u64,
    playback: Option<Playback>,
    clock: Option<LoopClock>,
    swap_timer: Option<SwapTimer>,
}

impl PercussionEngineState {
    fn new(style: Style, tempo: u32) -> PercussionEngineState {
        PercussionEngineState {
            phase: Phase::Stopped,
            style,
            session_style: style,
            tempo: tempo.max(1),
            cursor: VariantCursor::new(),
            session: 0,
            generation: 0,
            next_timer_id: 0,
            playback: None,
            clock: None,
            swap_timer: None,
        }
    }

    fn cancel_swap(&mut self) {
        if let Some(timer) = self.swap_timer.take() {
            timer.cancel();
        }
    }
}

/// A resolved take waiting on its stems.
struct Request {
    session: u64,
    generation: u64,
    tempo: u32,
    anchor: u32,
    variant: &'static str,
    paths: StemPaths,
    /// Replace the playing stems right away instead of at the loop boundary.
    immediate: bool,
}

impl Request {
    /// False once a stop, restart or newer request has superseded this one.
    fn is_current(&self, state: &PercussionEngineState) -> bool {
        self.session == state.session && self.generation == state.generation
    }
}

struct Inner<L> {
    loader: L,
    device: Arc<dyn Device>,
    options: Options,
    state: Mutex<PercussionEngineState>,
    status: watch::Sender<Status>,
    span: Span,
}

/// Drives the tabla loop. Cloning gives another handle to the same engine.
pub struct TablaEngine<L: StemLoader> {
    inner: Arc<Inner<L>>,
}

impl<L: StemLoader> Clone for TablaEngine<L> {
    fn clone(&self) -> Self {
        TablaEngine {
            inner: self.inner.clone(),
        }
    }
}

impl<L: StemLoader> TablaEngine<L> {
    /// Creates a stopped engine.
    pub fn new(
        loader: L,
        device: Arc<dyn Device>,
        options: Options,
        style: Style,
        tempo: u32,
    ) -> TablaEngine<L> {
        let (status, _) = watch::channel(Status::Stopped);
        TablaEngine {
            inner: Arc::new(Inner {
                loader,
                device,
                options,
                state: Mutex::new(PercussionEngineState::new(style, tempo)),
                status,
                span: span!(Level::INFO, "tabla engine"),
            }),
        }
    }

    /// Watches the status shown to the user.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> Status {
        *self.inner.status.borrow()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock();
        let playback = state.playback.as_ref();
        Snapshot {
            phase: state.phase,
            style: state.style,
            tempo: state.tempo,
            anchor: playback.map(|p| p.anchor),
            variant: playback.map(|p| p.variant),
            rate: playback.map(|p| p.rate),
            cursor: state.cursor.index(),
            pending_swaps: usize::from(state.swap_timer.is_some()),
        }
    }

    /// Selects the style used by the next start.
    pub fn set_style(&self, style: Style) {
        let _enter = self.inner.span.enter();
        let mut state = self.inner.state.lock();
        state.style = style;
        if state.phase != Phase::Stopped {
            info!(style = %style, "Style selected, takes effect on the next start.");
        }
    }

    /// Starts the loop from the first variant. Does nothing if the loop is
    /// already loading or playing. The engine is `Loading` on return; the
    /// returned [`Load`] resolves to the load error if either stem fails.
    pub fn start(&self) -> Load {
        let _enter = self.inner.span.enter();
        let request = {
            let mut state = self.inner.state.lock();
            if state.phase != Phase::Stopped {
                info!(phase = ?state.phase, "Tabla is already running.");
                return Load::done();
            }
            state.phase = Phase::Loading;
            state.session += 1;
            state.session_style = state.style;
            self.inner.status.send_replace(Status::Loading);
            self.prepare(&mut state, true, false)
        };

        info!(
            tempo = request.tempo,
            anchor = request.anchor,
            variant = request.variant,
            "Starting tabla."
        );
        let engine = self.clone();
        Load::spawn(
            async move { engine.finish_start(request).await }.instrument(self.inner.span.clone()),
        )
    }

    /// Starts the loaded stems unless a stop got there first.
    async fn finish_start(&self, request: Request) -> Result<(), EngineError> {
        let loaded = self.load(&request).await;

        let mut state = self.inner.state.lock();
        if !request.is_current(&state) || state.phase != Phase::Loading {
            info!("Tabla was stopped while loading, discarding stems.");
            return Ok(());
        }

        let result = loaded.and_then(|stems| {
            let rate = playback_rate(request.tempo, request.anchor);
            self.inner
                .device
                .start_stems(stems.clone(), rate)
                .map_err(|e| EngineError::Device(e.to_string()))?;
            Ok(Playback {
                anchor: request.anchor,
                variant: request.variant,
                rate,
                stems,
            })
        });

        match result {
            Ok(playback) => {
                state.phase = Phase::Playing;
                state.clock = Some(LoopClock::new(Instant::now(), playback.loop_length()));
                state.playback = Some(playback);
                self.arm_swap(&mut state);
                self.inner.status.send_replace(Status::Playing);
                Ok(())
            }
            Err(e) => {
                warn!(err = %e, "Unable to start tabla.");
                state.phase = Phase::Stopped;
                state.playback = None;
                self.signal_error();
                Err(e)
            }
        }
    }

    /// Stops the loop and cancels the pending swap. Does nothing if stopped.
    pub fn stop(&self) {
        let _enter = self.inner.span.enter();
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Stopped {
            info!("Tabla is not playing, nothing to stop.");
            return;
        }

        info!(phase = ?state.phase, "Stopping tabla.");
        state.phase = Phase::Stopped;
        state.session += 1;
        state.playback = None;
        state.clock = None;
        state.cancel_swap();
        self.inner.device.stop_stems();
        self.inner.status.send_replace(Status::Stopped);
    }

    /// Starts when stopped, stops otherwise. Either way the phase has changed
    /// by the time this returns.
    pub fn toggle(&self) -> Load {
        let phase = self.inner.state.lock().phase;
        match phase {
            Phase::Stopped => self.start(),
            Phase::Loading | Phase::Playing => {
                self.stop();
                Load::done()
            }
        }
    }

    /// Records the desired tempo. While playing, the loop is resynchronized
    /// right away without restarting: the next take is resolved against the
    /// new tempo and replaces the playing stems in place, and the swap timer is
    /// re-armed from the rest of the current pass.
    pub fn set_tempo(&self, tempo: u32) -> Load {
        let request = {
            let mut state = self.inner.state.lock();
            state.tempo = tempo.max(1);
            if state.phase != Phase::Playing {
                debug!(tempo = state.tempo, "Tabla not playing, tempo stored.");
                return Load::done();
            }
            state.cancel_swap();
            self.prepare(&mut state, false, true)
        };

        info!(
            tempo = request.tempo,
            anchor = request.anchor,
            variant = request.variant,
            "Resynchronizing tabla to new tempo."
        );
        let engine = self.clone();
        Load::spawn(
            async move {
                let loaded = engine.load(&request).await;
                engine.apply(request, loaded)
            }
            .instrument(self.inner.span.clone()),
        )
    }

    /// Resolves the next take against the current tempo and moves the cursor.
    fn prepare(
        &self,
        state: &mut PercussionEngineState,
        fresh: bool,
        immediate: bool,
    ) -> Request {
        let style = state.session_style;
        let tempo = state.tempo;
        let anchor = resolve_anchor(style, tempo);
        let variant = state.cursor.next_variant(style, anchor, fresh);
        state.generation += 1;

        Request {
            session: state.session,
            generation: state.generation,
            tempo,
            anchor,
            variant,
            paths: StemPaths::new(&self.inner.options.samples, style, anchor, variant),
            immediate,
        }
    }

    /// Loads both stems of a take together.
    async fn load(&self, request: &Request) -> Result<StemPair, EngineError> {
        let (lead, bass) = tokio::join!(
            self.inner.loader.load(request.paths.lead.clone()),
            self.inner.loader.load(request.paths.bass.clone()),
        );
        Ok(StemPair {
            lead: lead?,
            bass: bass?,
        })
    }

    /// Hands a loaded take to the running loop and re-arms the swap timer. A
    /// failed load leaves the current stems playing and re-arms from them.
    fn apply(
        &self,
        request: Request,
        loaded: Result<StemPair, EngineError>,
    ) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock();
        if !request.is_current(&state) || state.phase != Phase::Playing {
            debug!(
                anchor = request.anchor,
                variant = request.variant,
                "Discarding superseded stems."
            );
            return Ok(());
        }

        let result = loaded.and_then(|stems| {
            let rate = playback_rate(request.tempo, request.anchor);
            let device = &self.inner.device;
            if request.immediate {
                device.replace_stems(stems.clone(), rate)
            } else {
                device.queue_stems(stems.clone(), rate)
            }
            .map_err(|e| EngineError::Device(e.to_string()))?;
            Ok(Playback {
                anchor: request.anchor,
                variant: request.variant,
                rate,
                stems,
            })
        });

        let now = Instant::now();
        let outcome = match result {
            Ok(playback) => {
                info!(
                    anchor = playback.anchor,
                    variant = playback.variant,
                    rate = playback.rate,
                    "Tabla stems swapped."
                );
                let length = playback.loop_length();
                if let Some(clock) = state.clock.as_mut() {
                    if request.immediate {
                        clock.replace(now, length);
                    } else {
                        clock.queue(now, length);
                    }
                }
                state.playback = Some(playback);
                Ok(())
            }
            Err(e) => {
                warn!(err = %e, "Unable to swap tabla stems, keeping the current loop.");
                if let Some(clock) = state.clock.as_mut() {
                    if request.immediate {
                        clock.catch_up(now);
                    } else {
                        clock.repeat(now);
                    }
                }
                Err(e)
            }
        };
        self.arm_swap(&mut state);
        outcome
    }

    /// Arms the swap timer for the lead-in before the next boundary that still
    /// needs a take, cancelling any timer already armed.
    fn arm_swap(&self, state: &mut PercussionEngineState) {
        state.cancel_swap();
        let Some(clock) = state.clock.as_ref() else {
            return;
        };

        let now = Instant::now();
        let deadline = clock
            .next_swap(self.inner.options.lead_in)
            .max(now + MIN_SWAP_DELAY);
        state.next_timer_id += 1;
        let id = state.next_timer_id;

        let engine = self.clone();
        let handle = tokio::spawn(
            async move {
                tokio::time::sleep_until(deadline).await;
                engine.swap(id).await;
            }
            .instrument(self.inner.span.clone()),
        );
        debug!(
            id,
            delay_ms = deadline.duration_since(now).as_millis(),
            "Armed swap timer"
        );
        state.swap_timer = Some(SwapTimer { id, handle });
    }

    /// Runs when swap timer `id` fires.
    async fn swap(&self, id: u64) {
        let request = {
            let mut state = self.inner.state.lock();
            match &state.swap_timer {
                Some(timer) if timer.id == id => {}
                _ => {
                    debug!(id, "Ignoring superseded swap timer");
                    return;
                }
            }
            // This task is the timer; it has fired and is no longer pending.
            state.swap_timer = None;
            if state.phase != Phase::Playing {
                return;
            }
            self.prepare(&mut state, false, false)
        };

        debug!(
            anchor = request.anchor,
            variant = request.variant,
            "Loading next tabla take"
        );
        let loaded = self.load(&request).await;
        // Failures are logged and re-armed by apply.
        let _ = self.apply(request, loaded);
    }

    /// Shows the error status and schedules its revert.
    fn signal_error(&self) {
        self.inner.status.send_replace(Status::Error);
        let engine = self.clone();
        let delay = self.inner.options.error_display;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.inner.status.send_if_modified(|status| {
                if *status == Status::Error {
                    *status = Status::Stopped;
                    true
                } else {
                    false
                }
            });
        });
    }
}
