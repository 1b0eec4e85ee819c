//! The control loop.
//!
//! [`Bot`] owns every piece of run state. One tick runs, in order:
//! refresh positions if due, evaluate navigation, steer the held movement
//! key, fire due actions, check the stop signal. The loop then sleeps for the
//! poll interval. Held keys are released on every exit path.
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::capture::FrameSource;
use crate::clock::{Clock, SystemClock};
use crate::config::{BotConfig, ConfigError, MonsterScope};
use crate::debug::DebugSink;
use crate::error::{BotError, Result};
use crate::geometry::{Anchor, Direction};
use crate::input::{InputDevice, Key, MovementController};
use crate::matcher::{NccMatcher, TemplateMatcher};
use crate::navigation::NavigationPolicy;
use crate::scheduler::{ActionKind, ActionScheduler, IntervalSpec, ScheduledAction};
use crate::template::TemplateSet;
use crate::tracker::{PositionTracker, RefreshReport, TrackerSettings};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polled once per tick; `true` ends the loop.
pub trait StopSignal {
    fn should_stop(&mut self) -> bool;
}

impl<S: StopSignal + ?Sized> StopSignal for Box<S> {
    fn should_stop(&mut self) -> bool {
        (**self).should_stop()
    }
}

/// Stops after a fixed number of ticks. Used by the replay backend and tests.
#[derive(Debug, Clone, Copy)]
pub struct StopAfterTicks {
    remaining: u64,
}

impl StopAfterTicks {
    /// Always allows at least one tick.
    pub fn new(ticks: u64) -> Self {
        Self { remaining: ticks }
    }
}

impl StopSignal for StopAfterTicks {
    fn should_stop(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BotState {
    Init,
    Running,
    Stopped,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub refreshes: u64,
    pub flips: u64,
    pub final_direction: Direction,
    /// `(label, pulses)` per scheduled action, in firing order.
    pub pulses: Vec<(String, u64)>,
    pub debug_frames: u64,
}

impl RunSummary {
    pub fn total_pulses(&self) -> u64 {
        self.pulses.iter().map(|(_, n)| n).sum()
    }
}

pub struct Bot {
    tracker: PositionTracker,
    navigation: NavigationPolicy,
    scope: MonsterScope,
    movement: MovementController,
    scheduler: ActionScheduler,
    input: Box<dyn InputDevice>,
    stop: Box<dyn StopSignal>,
    clock: Box<dyn Clock>,
    debug: Option<DebugSink>,
    poll_interval: Duration,
    state: BotState,
    ticks: u64,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.navigation.direction()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Run until the stop signal fires or a fatal error occurs.
    ///
    /// Both movement keys are released before returning, whatever the
    /// outcome. A loop error takes precedence over a release error.
    pub fn run(&mut self) -> Result<RunSummary> {
        let outcome = self.start().and_then(|()| self.run_loop());
        let released = self.shutdown();
        outcome.and(released)?;

        let summary = self.summary();
        tracing::info!(
            "stopped after {} ticks: {} refreshes, {} direction flips, {} pulses",
            summary.ticks,
            summary.refreshes,
            summary.flips,
            summary.total_pulses()
        );
        for (label, count) in &summary.pulses {
            tracing::info!("  {label}: {count}");
        }
        Ok(summary)
    }

    /// Initial refresh and initial movement.
    fn start(&mut self) -> Result<()> {
        tracing::info!(
            "starting: {} navigation ({}), {} templates at {} anchor, {} scheduled actions",
            self.navigation.strategy_name(),
            self.navigation.strategy_description(),
            self.tracker.templates().template_count(),
            self.tracker.settings().anchor,
            self.scheduler.actions().len()
        );

        let now = self.clock.now();
        self.refresh(now, true)?;

        let heading = self.navigation.direction();
        self.movement.steer(self.input.as_mut(), heading, now)?;
        self.scheduler.start(now);
        self.state = BotState::Running;
        tracing::info!("moving {heading}");
        Ok(())
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            self.tick()?;
            if self.stop.should_stop() {
                tracing::info!("stop signal received");
                return Ok(());
            }
            self.clock.sleep(self.poll_interval);
        }
    }

    fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.ticks += 1;

        self.refresh(now, false)?;

        let view = self.tracker.view(self.scope);
        self.navigation.evaluate(&view);

        self.movement
            .steer(self.input.as_mut(), self.navigation.direction(), now)?;

        self.scheduler
            .run_due(now, self.input.as_mut(), self.clock.as_ref())?;
        Ok(())
    }

    fn refresh(&mut self, now: Duration, force: bool) -> Result<()> {
        let outcome = if force {
            self.tracker.refresh(now).map(Some)
        } else {
            self.tracker.refresh_if_due(now)
        };

        match outcome {
            Ok(Some(report)) => {
                self.record(&report);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err @ BotError::CharacterNotFound { .. }) => {
                self.dump_lookup_failure();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn record(&mut self, report: &RefreshReport) {
        let (Some(sink), Some(frame)) = (self.debug.as_mut(), self.tracker.latest_frame()) else {
            return;
        };
        if let Err(err) = sink.write_refresh(frame, report) {
            tracing::error!("debug screenshot for refresh #{} failed: {err:#}", report.cycle);
        }
    }

    fn dump_lookup_failure(&self) {
        let (Some(sink), Some(frame)) = (self.debug.as_ref(), self.tracker.latest_frame()) else {
            return;
        };
        match sink.write_lookup_failure(frame, &self.tracker.templates().character) {
            Ok(path) => tracing::info!("failing frame saved to {}", path.display()),
            Err(err) => tracing::error!("could not save failing frame: {err:#}"),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.state = BotState::Stopped;
        let released = self.movement.release_all(self.input.as_mut());
        if let Err(err) = &released {
            tracing::error!("failed to release movement keys: {err}");
        }
        released
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            refreshes: self.tracker.cycles(),
            flips: self.navigation.flips(),
            final_direction: self.navigation.direction(),
            pulses: self
                .scheduler
                .actions()
                .iter()
                .map(|a| (a.label().to_string(), a.fired()))
                .collect(),
            debug_frames: self.debug.as_ref().map_or(0, DebugSink::written),
        }
    }
}

impl Drop for Bot {
    fn drop(&mut self) {
        if self.movement.held().is_some()
            && let Err(err) = self.movement.release_all(self.input.as_mut())
        {
            tracing::error!("failed to release movement keys on drop: {err}");
        }
    }
}

/// Assembles a [`Bot`] from its capabilities.
///
/// A frame source, templates, an input device, and a stop signal are
/// required; everything else has a default (NCC matcher, system clock,
/// boundary navigation heading right, arrow keys, no scheduled actions).
/// Tracked positions use the navigation strategy's anchor unless one is set
/// with [`anchor`](Self::anchor).
pub struct BotBuilder {
    source: Option<Box<dyn FrameSource>>,
    matcher: Box<dyn TemplateMatcher>,
    templates: Option<TemplateSet>,
    settings: TrackerSettings,
    anchor: Option<Anchor>,
    navigation: Option<NavigationPolicy>,
    scope: MonsterScope,
    movement: MovementController,
    scheduler: Option<ActionScheduler>,
    input: Option<Box<dyn InputDevice>>,
    stop: Option<Box<dyn StopSignal>>,
    clock: Box<dyn Clock>,
    debug: Option<DebugSink>,
    poll_interval: Duration,
}

impl BotBuilder {
    fn new() -> Self {
        Self {
            source: None,
            matcher: Box::new(NccMatcher),
            templates: None,
            settings: TrackerSettings::default(),
            anchor: None,
            navigation: None,
            scope: MonsterScope::default(),
            movement: MovementController::new(Key::Left, Key::Right),
            scheduler: None,
            input: None,
            stop: None,
            clock: Box::new(SystemClock::new()),
            debug: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Apply tracking, navigation, key, timing, and action settings.
    pub fn with_config(mut self, config: &BotConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        self.settings = TrackerSettings {
            threshold: config.tracking.threshold,
            refresh_interval: config.tracking.refresh_interval()?,
            vertical_tolerance: config.tracking.vertical_tolerance,
            ..TrackerSettings::default()
        };
        self.anchor = config.tracking.anchor;
        self.navigation = Some(NavigationPolicy::from_kind(
            config.navigation.strategy,
            config.navigation.initial_direction,
        ));
        self.scope = config.navigation.monster_scope;
        self.movement = MovementController::new(config.keys.left, config.keys.right)
            .with_reassert(config.timing.movement_reassert()?);
        self.poll_interval = config.timing.poll_interval()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut scheduler = ActionScheduler::new(config.timing.pulse_width()?, rng);
        if config.attack.enabled {
            scheduler.push(ScheduledAction::new(
                ActionKind::Attack,
                "attack",
                config.keys.attack,
                config.attack.interval("attack")?,
            ));
        }
        for (i, skill) in config.skills.iter().enumerate() {
            scheduler.push(ScheduledAction::new(
                ActionKind::Skill,
                skill.label(),
                skill.key,
                skill.interval(&format!("skills[{i}]"))?,
            ));
        }
        if config.pickup.enabled {
            scheduler.push(ScheduledAction::new(
                ActionKind::Pickup,
                "pickup",
                config.keys.pickup,
                config.pickup.interval("pickup")?,
            ));
        }
        self.scheduler = Some(scheduler);
        Ok(self)
    }

    pub fn frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn matcher(mut self, matcher: impl TemplateMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn tracker_settings(mut self, settings: TrackerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the point of each matched box used as a position.
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn navigation(mut self, policy: NavigationPolicy, scope: MonsterScope) -> Self {
        self.navigation = Some(policy);
        self.scope = scope;
        self
    }

    pub fn movement(mut self, movement: MovementController) -> Self {
        self.movement = movement;
        self
    }

    pub fn scheduler(mut self, scheduler: ActionScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn input(mut self, device: impl InputDevice + 'static) -> Self {
        self.input = Some(Box::new(device));
        self
    }

    pub fn stop_signal(mut self, stop: impl StopSignal + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Write annotated screenshots for every refresh into `sink`.
    pub fn debug(mut self, sink: Option<DebugSink>) -> Self {
        self.debug = sink;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> Result<Bot> {
        let source = self
            .source
            .ok_or(BotError::MissingComponent("frame source"))?;
        let templates = self
            .templates
            .ok_or(BotError::MissingComponent("template set"))?;
        let input = self
            .input
            .ok_or(BotError::MissingComponent("input device"))?;
        let stop = self.stop.ok_or(BotError::MissingComponent("stop signal"))?;

        let navigation = self
            .navigation
            .unwrap_or_else(|| NavigationPolicy::from_kind(Default::default(), Direction::Right));
        let settings = TrackerSettings {
            anchor: self.anchor.unwrap_or_else(|| navigation.anchor()),
            ..self.settings
        };
        let tracker = PositionTracker::new(source, self.matcher, templates, settings);
        let scheduler = self.scheduler.unwrap_or_else(|| {
            ActionScheduler::new(
                IntervalSpec::uniform(Duration::from_millis(50), Duration::from_millis(80)),
                StdRng::from_entropy(),
            )
        });

        Ok(Bot {
            tracker,
            navigation,
            scope: self.scope,
            movement: self.movement,
            scheduler,
            input,
            stop,
            clock: self.clock,
            debug: self.debug,
            poll_interval: self.poll_interval,
            state: BotState::Init,
            ticks: 0,
        })
    }
}
