//! DragLoopController: the automatic "drag from A to B, repeat" loop.
//!
//! The user captures a source and a destination point from the phone, then
//! starts the loop.  A background thread repeatedly presses the left button at
//! the source, glides to the destination, and releases, until stopped.
//!
//! # State and locking
//!
//! The endpoints, the run state, the task generation, and the task's join
//! handle all live in one [`Mutex`] paired with a [`Condvar`]:
//!
//! - The task only holds the lock briefly to read the endpoints and to
//!   check for cancellation.  Its sleeps between iterations are condvar
//!   waits, so a stop request wakes it immediately.
//! - `stop()` waits on the same condvar, which releases the lock while
//!   waiting, so the task can always reach its exit path.
//! - Each launch bumps `generation`.  A task only ever updates the run state
//!   for its own generation, so a straggler from a timed-out stop cannot mark
//!   a newer task idle.
//!
//! At most one task exists at any time: `start()` refuses to launch while a
//! previous task is still alive.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use starbutton_core::{protocol::MouseButton, CapturePurpose, DragEndpoints, Point};
use tracing::{debug, error, info, warn};

use super::emulate_input::{EmulationError, PlatformInputEmulator};
use super::task::spawn_named;

/// Interval between cursor updates during the animated move.
const ANIMATION_STEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopRunState {
    Idle,
    Running,
    StopRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// At least one endpoint has not been captured yet.
    EndpointsUnset,
    /// The previous task did not exit within the stop timeout.
    PreviousStillRunning,
    SpawnFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped,
    TimedOut,
}

/// Delays used by the drag cycle and the loop around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragTimings {
    /// Pause after pressing the button, before the move starts.
    pub settle: Duration,
    /// Duration of the animated move from source to destination.
    pub drag_duration: Duration,
    /// Pause at the destination before releasing the button.
    pub post_drag: Duration,
    /// Pause between drag cycles.
    pub loop_interval: Duration,
    /// Retry interval while an endpoint is unset.
    pub unset_retry: Duration,
    /// How long `stop()` waits for the task to exit.
    pub stop_timeout: Duration,
}

impl Default for DragTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
            drag_duration: Duration::from_millis(100),
            post_drag: Duration::from_millis(50),
            loop_interval: Duration::from_millis(100),
            unset_retry: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

struct LoopState {
    endpoints: DragEndpoints,
    run_state: LoopRunState,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<LoopState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps up to `timeout`, waking early if `generation` is no longer the
    /// running one.  Returns `true` if the task should exit.
    fn wait_cancellable(&self, generation: u64, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| is_live(s, generation))
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !is_live(&guard, generation)
    }
}

fn is_live(state: &LoopState, generation: u64) -> bool {
    state.generation == generation && state.run_state == LoopRunState::Running
}

pub struct DragLoopController {
    shared: Arc<Shared>,
    emulator: Arc<dyn PlatformInputEmulator>,
    timings: DragTimings,
}

impl DragLoopController {
    pub fn new(emulator: Arc<dyn PlatformInputEmulator>, timings: DragTimings) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState {
                    endpoints: DragEndpoints::default(),
                    run_state: LoopRunState::Idle,
                    generation: 0,
                    task: None,
                }),
                changed: Condvar::new(),
            }),
            emulator,
            timings,
        }
    }

    pub fn run_state(&self) -> LoopRunState {
        self.shared.lock().run_state
    }

    pub fn endpoints(&self) -> DragEndpoints {
        self.shared.lock().endpoints
    }

    /// Stores the current cursor position as the `purpose` endpoint.
    ///
    /// # Errors
    ///
    /// Returns the emulator error if the cursor position cannot be read; the
    /// stored endpoint is left unchanged.
    pub fn capture(&self, purpose: CapturePurpose) -> Result<Point, EmulationError> {
        let point = self.emulator.cursor_position().map_err(|e| {
            warn!("could not read cursor position for {purpose} capture: {e}");
            e
        })?;
        self.shared.lock().endpoints.set(purpose, point);
        info!("captured drag {purpose} at {point}");
        Ok(point)
    }

    /// Launches the drag task.
    ///
    /// A running task is stopped first.  Nothing is launched if an endpoint
    /// is unset or the previous task refuses to exit.
    pub fn start(&self) -> StartOutcome {
        let has_task = {
            let state = self.shared.lock();
            if state.endpoints.complete().is_none() {
                warn!("drag loop not started: source and destination must both be captured");
                return StartOutcome::EndpointsUnset;
            }
            state.task.is_some() || state.run_state != LoopRunState::Idle
        };

        if has_task {
            debug!("drag loop restart requested; stopping current task");
            if self.stop() == StopOutcome::TimedOut {
                warn!("drag loop not started: previous task is still running");
                return StartOutcome::PreviousStillRunning;
            }
        }

        let mut state = self.shared.lock();
        if state.task.is_some() {
            warn!("drag loop not started: previous task is still running");
            return StartOutcome::PreviousStillRunning;
        }

        state.generation += 1;
        let generation = state.generation;
        state.run_state = LoopRunState::Running;

        let shared = Arc::clone(&self.shared);
        let emulator = Arc::clone(&self.emulator);
        let timings = self.timings;
        match spawn_named("starbutton-drag-loop", move || {
            run_task(&shared, emulator.as_ref(), timings, generation)
        }) {
            Ok(handle) => {
                state.task = Some(handle);
                info!("drag loop started");
                StartOutcome::Started
            }
            Err(e) => {
                state.run_state = LoopRunState::Idle;
                error!("failed to spawn drag loop thread: {e}");
                StartOutcome::SpawnFailed
            }
        }
    }

    /// Requests the task to exit and waits up to the stop timeout for it.
    pub fn stop(&self) -> StopOutcome {
        let mut state = self.shared.lock();

        if state.run_state == LoopRunState::Idle {
            // Reap a task that already exited on its own.
            let finished = state.task.take();
            drop(state);
            if let Some(handle) = finished {
                let _ = handle.join();
            }
            return StopOutcome::NotRunning;
        }

        state.run_state = LoopRunState::StopRequested;
        let generation = state.generation;
        self.shared.changed.notify_all();

        let (mut state, _) = self
            .shared
            .changed
            .wait_timeout_while(state, self.timings.stop_timeout, |s| {
                s.generation == generation && s.run_state != LoopRunState::Idle
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.run_state != LoopRunState::Idle {
            warn!(
                "drag loop did not stop within {:?}; leaving it to exit on its own",
                self.timings.stop_timeout
            );
            return StopOutcome::TimedOut;
        }

        let handle = state.task.take();
        drop(state);
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("drag loop task panicked");
            }
        }
        info!("drag loop stopped");
        StopOutcome::Stopped
    }
}

impl Drop for DragLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Marks the task's generation idle when the task exits, including by panic.
struct ExitGuard<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.generation == self.generation {
            state.run_state = LoopRunState::Idle;
        }
        self.shared.changed.notify_all();
    }
}

fn run_task(
    shared: &Shared,
    emulator: &dyn PlatformInputEmulator,
    timings: DragTimings,
    generation: u64,
) {
    let _exit = ExitGuard { shared, generation };

    loop {
        let endpoints = {
            let state = shared.lock();
            if !is_live(&state, generation) {
                break;
            }
            state.endpoints
        };

        let Some((source, destination)) = endpoints.complete() else {
            debug!("drag endpoints unset; retrying in {:?}", timings.unset_retry);
            if shared.wait_cancellable(generation, timings.unset_retry) {
                break;
            }
            continue;
        };

        if let Err(e) = drag_once(emulator, source, destination, &timings) {
            warn!("drag cycle failed: {e}");
        }

        if shared.wait_cancellable(generation, timings.loop_interval) {
            break;
        }
    }
    debug!("drag loop task exiting");
}

/// One press-move-release cycle.  The button is released even if a step
/// in between fails.
fn drag_once(
    emulator: &dyn PlatformInputEmulator,
    source: Point,
    destination: Point,
    timings: &DragTimings,
) -> Result<(), EmulationError> {
    emulator.emit_mouse_move(source.x, source.y)?;
    emulator.emit_mouse_button(MouseButton::Left, true)?;

    let dragged = (|| -> Result<(), EmulationError> {
        std::thread::sleep(timings.settle);
        animate_move(emulator, source, destination, timings.drag_duration)?;
        std::thread::sleep(timings.post_drag);
        Ok(())
    })();

    let released = emulator.emit_mouse_button(MouseButton::Left, false);
    dragged.and(released)
}

fn animate_move(
    emulator: &dyn PlatformInputEmulator,
    from: Point,
    to: Point,
    duration: Duration,
) -> Result<(), EmulationError> {
    let steps = (duration.as_millis() / ANIMATION_STEP.as_millis()).max(1) as u32;
    let pause = duration / steps;
    for step in 1..=steps {
        let point = from.lerp(to, f64::from(step) / f64::from(steps));
        emulator.emit_mouse_move(point.x, point.y)?;
        if step < steps {
            std::thread::sleep(pause);
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
