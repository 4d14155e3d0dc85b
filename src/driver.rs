//! Serialized control loop.
//!
//! One tokio task owns the [`GuidanceSession`] and the [`SuggestionEngine`].
//! Host inputs arrive through an unbounded channel and are handled one at a
//! time, interleaved with the guidance tick, the speed tick, the suggestion
//! tick and any pending snooze deadline. Nothing else touches the two
//! components, so they need no locking.
//!
//! Timers are re-armed or dropped after every handled input, based on the
//! components' own flags, so no tick can fire after a stop returns.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use crate::config::GuidanceConfig;
use crate::route::Route;
use crate::session::{GuidanceEvent, GuidanceSession, PositionFix};
use crate::speech::SpeechSignal;
use crate::suggestions::{SmartStopSuggestion, SuggestionEngine, SuggestionId};

/// Host commands.
#[derive(Debug, Clone)]
pub enum Command {
    /// Start guidance and stop-suggestion analysis on the same route.
    Start(Arc<Route>),
    Pause,
    Resume,
    Stop,
    Cancel,
    SkipStep,
    /// Arrival at the current maneuver point was detected.
    AdvanceStep,
    SetVoiceEnabled(bool),
    SetHapticsEnabled(bool),
    StartAnalysis(Arc<Route>),
    StopAnalysis,
    Dismiss(SuggestionId),
    Accept(SuggestionId),
    Snooze(SuggestionId),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum Input {
    Command(Command),
    Position(PositionFix),
    PositionError(String),
    Speech(SpeechSignal),
}

/// Everything the loop reports back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum DriverEvent {
    Guidance(GuidanceEvent),
    /// The full ranked list after any change.
    Suggestions(Vec<SmartStopSuggestion>),
    /// The routing collaborator should add this stop.
    StopAccepted(SmartStopSuggestion),
}

/// Sending side of the loop's inbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<Input>,
}

impl DriverHandle {
    /// Returns false once the loop has shut down.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(Input::Command(command)).is_ok()
    }

    pub fn position(&self, fix: PositionFix) -> bool {
        self.tx.send(Input::Position(fix)).is_ok()
    }

    pub fn position_error(&self, message: impl Into<String>) -> bool {
        self.tx.send(Input::PositionError(message.into())).is_ok()
    }

    pub fn speech(&self, signal: SpeechSignal) -> bool {
        self.tx.send(Input::Speech(signal)).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

/// Spawn the loop on the current tokio runtime.
///
/// The join handle yields both components back after shutdown.
pub fn spawn(
    session: GuidanceSession,
    engine: SuggestionEngine,
    config: &GuidanceConfig,
) -> (
    DriverHandle,
    mpsc::UnboundedReceiver<DriverEvent>,
    JoinHandle<(GuidanceSession, SuggestionEngine)>,
) {
    let (tx, inbox) = mpsc::unbounded_channel();
    let (events, events_rx) = mpsc::unbounded_channel();
    let driver = Driver {
        suggestion_tick: engine.config().interval(),
        session,
        engine,
        inbox,
        events,
        guidance_tick: config.guidance_tick(),
        speed_tick: config.speed_tick(),
        timers: Timers::default(),
    };
    let join = tokio::spawn(driver.run());
    (DriverHandle { tx }, events_rx, join)
}

#[derive(Default)]
struct Timers {
    guidance: Option<Interval>,
    speed: Option<Interval>,
    suggestions: Option<Interval>,
}

struct Driver {
    session: GuidanceSession,
    engine: SuggestionEngine,
    inbox: mpsc::UnboundedReceiver<Input>,
    events: mpsc::UnboundedSender<DriverEvent>,
    guidance_tick: Duration,
    speed_tick: Duration,
    suggestion_tick: Duration,
    timers: Timers,
}

impl Driver {
    async fn run(mut self) -> (GuidanceSession, SuggestionEngine) {
        info!("guidance driver running");
        loop {
            let snooze = self.engine.next_snooze_deadline();
            tokio::select! {
                input = self.inbox.recv() => match input {
                    Some(Input::Command(Command::Shutdown)) | None => break,
                    Some(input) => self.handle(input),
                },
                _ = tick(&mut self.timers.guidance) => {
                    if let Some(event) = self.session.update_guidance() {
                        self.emit_guidance(event);
                    }
                }
                _ = tick(&mut self.timers.speed) => self.session.update_speed(),
                _ = tick(&mut self.timers.suggestions) => {
                    if self.engine.evaluate(Instant::now()) {
                        self.publish_suggestions();
                    }
                }
                _ = wait_until(snooze) => {
                    if self.engine.on_snooze_deadline(Instant::now()) {
                        self.publish_suggestions();
                    }
                }
            }
            self.sync_progress();
            self.sync_timers();
        }
        info!("guidance driver stopped");
        (self.session, self.engine)
    }

    fn handle(&mut self, input: Input) {
        match input {
            Input::Command(command) => self.handle_command(command),
            Input::Position(fix) => {
                for event in self.session.update_location(fix) {
                    self.emit_guidance(event);
                }
            }
            Input::PositionError(message) => self.session.report_position_error(message),
            Input::Speech(signal) => self.session.handle_speech_signal(signal),
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!("command {command:?}");
        match command {
            Command::Start(route) => {
                if let Some(event) = self.session.start(Arc::clone(&route)) {
                    self.emit_guidance(event);
                    self.engine.start_analysis(route);
                    self.publish_suggestions();
                }
            }
            Command::Pause => {
                let event = self.session.pause();
                self.emit_opt(event);
            }
            Command::Resume => {
                let event = self.session.resume();
                self.emit_opt(event);
            }
            Command::Stop => {
                let event = self.session.stop();
                self.emit_opt(event);
            }
            Command::Cancel => {
                let event = self.session.cancel();
                self.emit_opt(event);
            }
            Command::SkipStep => {
                let event = self.session.skip_step();
                self.emit_opt(event);
            }
            Command::AdvanceStep => {
                for event in self.session.advance_step() {
                    self.emit_guidance(event);
                }
            }
            Command::SetVoiceEnabled(enabled) => self.session.set_voice_enabled(enabled),
            Command::SetHapticsEnabled(enabled) => self.session.set_haptics_enabled(enabled),
            Command::StartAnalysis(route) => {
                self.engine.start_analysis(route);
                self.publish_suggestions();
            }
            Command::StopAnalysis => {
                self.engine.stop_analysis();
                self.publish_suggestions();
            }
            Command::Dismiss(id) => {
                if self.engine.dismiss(&id).is_some() {
                    self.publish_suggestions();
                }
            }
            Command::Accept(id) => {
                if let Some(stop) = self.engine.accept(&id) {
                    self.send(DriverEvent::StopAccepted(stop));
                    self.publish_suggestions();
                }
            }
            Command::Snooze(id) => {
                if self.engine.snooze(&id, Instant::now()).is_some() {
                    self.publish_suggestions();
                }
            }
            Command::Shutdown => {}
        }
    }

    /// Keep the engine's view of the remaining trip in step with guidance
    /// when both follow the same route.
    fn sync_progress(&mut self) {
        let same_route = match (self.session.route(), self.engine.route()) {
            (Some(guided), Some(analyzed)) => Arc::ptr_eq(guided, analyzed),
            _ => false,
        };
        if same_route {
            self.engine.update_progress(self.session.step_index());
        }
    }

    /// Arm or drop intervals to match the components' state.
    fn sync_timers(&mut self) {
        let running = self.session.timers_running();
        if running && self.timers.guidance.is_none() {
            debug!("arming guidance timers");
            self.timers.guidance = Some(delayed_interval(self.guidance_tick));
            self.timers.speed = Some(delayed_interval(self.speed_tick));
        } else if !running && self.timers.guidance.is_some() {
            debug!("disarming guidance timers");
            self.timers.guidance = None;
            self.timers.speed = None;
        }

        let analyzing = self.engine.is_analyzing();
        if analyzing && self.timers.suggestions.is_none() {
            // first tick fires immediately
            let mut timer = interval(self.suggestion_tick);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timers.suggestions = Some(timer);
        } else if !analyzing {
            self.timers.suggestions = None;
        }
    }

    fn emit_opt(&mut self, event: Option<GuidanceEvent>) {
        if let Some(event) = event {
            self.emit_guidance(event);
        }
    }

    fn emit_guidance(&mut self, event: GuidanceEvent) {
        let session_over = matches!(event, GuidanceEvent::Completed | GuidanceEvent::Cancelled);
        self.send(DriverEvent::Guidance(event));
        if session_over && self.engine.is_analyzing() {
            self.engine.stop_analysis();
            self.publish_suggestions();
        }
    }

    fn publish_suggestions(&mut self) {
        let list = self.engine.suggestions().to_vec();
        self.send(DriverEvent::Suggestions(list));
    }

    fn send(&self, event: DriverEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
