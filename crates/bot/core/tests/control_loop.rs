//! End-to-end runs of the control loop against scripted capabilities.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use bot_core::{
    ActionKind, ActionScheduler, Bot, BotConfig, Clock, BotError, BotState, CaptureError, DebugSink,
    Direction, Frame, FrameSource, InputDevice, InputError, IntervalSpec, Key, ManualClock, Match,
    MatchResult, MonsterScope, NavigationPolicy, Point, PreparedFrame, ScheduledAction,
    StopAfterTicks, StrategyKind, Template, TemplateMatcher, TemplateSet, TrackerSettings,
};
use image::RgbImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Down(Key),
    Up(Key),
}

#[derive(Clone, Default)]
struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl InputDevice for Recorder {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        self.events.borrow_mut().push(Event::Down(key));
        Ok(())
    }

    fn release(&mut self, key: Key) -> Result<(), InputError> {
        self.events.borrow_mut().push(Event::Up(key));
        Ok(())
    }
}

struct BrokenKeyboard;

impl InputDevice for BrokenKeyboard {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        Err(InputError::Unsupported(key))
    }

    fn release(&mut self, _key: Key) -> Result<(), InputError> {
        Ok(())
    }
}

struct BlankScreen;

impl FrameSource for BlankScreen {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        Ok(RgbImage::new(640, 480))
    }
}

struct NoScreen;

impl FrameSource for NoScreen {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::Backend("display server went away".into()))
    }
}

/// Where each template "is" on screen. The character walks through a list of
/// top-left positions, one per refresh, then stays at the last one.
#[derive(Clone, Default)]
struct Scene {
    character: Rc<RefCell<VecDeque<Point>>>,
    left: Option<Point>,
    right: Option<Point>,
    monsters: Vec<Point>,
}

impl Scene {
    fn walking(path: &[(i32, i32)]) -> Self {
        Self {
            character: Rc::new(RefCell::new(
                path.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            )),
            ..Self::default()
        }
    }

    fn boundaries(mut self, left: (i32, i32), right: (i32, i32)) -> Self {
        self.left = Some(Point::new(left.0, left.1));
        self.right = Some(Point::new(right.0, right.1));
        self
    }
}

impl TemplateMatcher for Scene {
    fn match_best(&self, _: &PreparedFrame, template: &Template, threshold: f32) -> MatchResult {
        let at = match template.name() {
            "character" => {
                let mut path = self.character.borrow_mut();
                if path.len() > 1 {
                    path.pop_front()
                } else {
                    path.front().copied()
                }
            }
            "left" => self.left,
            "right" => self.right,
            _ => None,
        };
        match at {
            Some(at) => MatchResult::from_score(at, 0.97, threshold),
            None => MatchResult::from_score(Point::new(0, 0), 0.2, threshold),
        }
    }

    fn match_all(&self, _: &PreparedFrame, _: &Template, _: f32) -> Vec<Match> {
        self.monsters
            .iter()
            .map(|&location| Match {
                location,
                confidence: 0.9,
            })
            .collect()
    }
}

fn template(name: &str) -> Template {
    Template::new(name, RgbImage::new(10, 10))
}

fn templates() -> TemplateSet {
    TemplateSet::new(template("character"))
        .with_boundaries(template("left"), template("right"))
        .with_monsters(vec![template("slime")])
}

fn idle_scheduler() -> ActionScheduler {
    ActionScheduler::seeded(
        IntervalSpec::uniform(Duration::from_millis(50), Duration::from_millis(80)),
        11,
    )
}

/// Fails if LEFT and RIGHT were ever held at the same time.
fn assert_never_both_held(events: &[Event]) {
    let (mut left, mut right) = (false, false);
    for event in events {
        match *event {
            Event::Down(Key::Left) => left = true,
            Event::Up(Key::Left) => left = false,
            Event::Down(Key::Right) => right = true,
            Event::Up(Key::Right) => right = false,
            _ => {}
        }
        assert!(!(left && right), "both movement keys held: {events:?}");
    }
}

#[test]
fn crossing_right_boundary_turns_left_and_releases_on_stop() {
    let clock = ManualClock::new();
    let keyboard = Recorder::default();
    let scene = Scene::walking(&[(100, 300), (300, 300), (510, 300)])
        .boundaries((0, 300), (500, 300));

    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(templates())
        .scheduler(idle_scheduler())
        .input(keyboard.clone())
        .stop_signal(StopAfterTicks::new(100))
        .clock(clock.clone())
        .build()
        .unwrap();

    let summary = bot.run().unwrap();

    assert_eq!(
        *keyboard.events.borrow(),
        vec![
            Event::Up(Key::Left),
            Event::Down(Key::Right),
            Event::Up(Key::Right),
            Event::Down(Key::Left),
            Event::Up(Key::Left),
            Event::Up(Key::Right),
        ]
    );
    assert_eq!(summary.ticks, 100);
    assert_eq!(summary.flips, 1);
    assert_eq!(summary.final_direction, Direction::Left);
    assert_eq!(bot.state(), BotState::Stopped);
}

#[test]
fn boundary_compares_top_left_corners_of_differently_sized_templates() {
    // 40px character against a 10px marker at x 500: centers would differ by
    // 15px, corners compare directly
    let wide = |path: &[(i32, i32)]| {
        let scene = Scene::walking(path).boundaries((0, 300), (500, 300));
        Bot::builder()
            .frame_source(BlankScreen)
            .matcher(scene)
            .templates(
                TemplateSet::new(Template::new("character", RgbImage::new(40, 60)))
                    .with_boundaries(template("left"), template("right")),
            )
            .navigation(
                NavigationPolicy::from_kind(StrategyKind::Boundary, Direction::Right),
                MonsterScope::Platform,
            )
            .scheduler(idle_scheduler())
            .input(Recorder::default())
            .stop_signal(StopAfterTicks::new(60))
            .clock(ManualClock::new())
            .build()
            .unwrap()
    };

    let mut short = wide(&[(100, 300), (495, 300)]);
    let summary = short.run().unwrap();
    assert_eq!(summary.flips, 0);
    assert_eq!(short.tracker().character().position(), Some(Point::new(495, 300)));

    let mut past = wide(&[(100, 300), (501, 300)]);
    let summary = past.run().unwrap();
    assert_eq!(summary.flips, 1);
    assert_eq!(summary.final_direction, Direction::Left);
}

#[test]
fn refreshes_are_rate_limited_independently_of_the_tick_rate() {
    let clock = ManualClock::new();
    let scene = Scene::walking(&[(100, 300)]).boundaries((0, 300), (500, 300));

    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(templates())
        .tracker_settings(TrackerSettings {
            refresh_interval: Duration::from_millis(250),
            ..TrackerSettings::default()
        })
        .scheduler(idle_scheduler())
        .input(Recorder::default())
        .stop_signal(StopAfterTicks::new(100))
        .clock(clock.clone())
        .build()
        .unwrap();

    let summary = bot.run().unwrap();

    // ticks at 0..=990ms; refreshes at 0, 250, 500, 750
    assert_eq!(summary.refreshes, 4);
    assert_eq!(clock.now(), Duration::from_millis(990));
}

#[test]
fn stop_releases_both_keys_whichever_is_held() {
    for initial in [Direction::Left, Direction::Right] {
        let keyboard = Recorder::default();
        let scene = Scene::walking(&[(100, 300)]).boundaries((0, 300), (500, 300));

        let mut bot = Bot::builder()
            .frame_source(BlankScreen)
            .matcher(scene)
            .templates(templates())
            .navigation(
                NavigationPolicy::from_kind(StrategyKind::Boundary, initial),
                MonsterScope::Platform,
            )
            .scheduler(idle_scheduler())
            .input(keyboard.clone())
            .stop_signal(StopAfterTicks::new(1))
            .clock(ManualClock::new())
            .build()
            .unwrap();

        bot.run().unwrap();

        let events = keyboard.events.borrow();
        assert_eq!(
            events[events.len() - 2..],
            [Event::Up(Key::Left), Event::Up(Key::Right)]
        );
    }
}

#[test]
fn target_presence_turns_when_nothing_is_ahead() {
    let keyboard = Recorder::default();
    let mut scene = Scene::walking(&[(300, 300)]);
    // target presence uses centers: 255 is behind the character at 305
    scene.monsters = vec![Point::new(250, 310)];

    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(TemplateSet::new(template("character")).with_monsters(vec![template("slime")]))
        .navigation(
            NavigationPolicy::from_kind(StrategyKind::TargetPresence, Direction::Right),
            MonsterScope::Platform,
        )
        .scheduler(idle_scheduler())
        .input(keyboard.clone())
        .stop_signal(StopAfterTicks::new(5))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let summary = bot.run().unwrap();

    assert_eq!(summary.flips, 1);
    assert_eq!(summary.final_direction, Direction::Left);
}

#[test]
fn configured_actions_pulse_without_ever_holding_both_directions() {
    let keyboard = Recorder::default();
    let clock = ManualClock::new();
    let scene = Scene::walking(&[(100, 300), (300, 300), (510, 300), (300, 300), (-20, 300)])
        .boundaries((0, 300), (500, 300));
    let mut config = BotConfig {
        seed: Some(99),
        ..BotConfig::default()
    };
    config.skills.push(bot_core::config::SkillConfig {
        key: Key::Char('e'),
        min_interval: 0.8,
        max_interval: 1.0,
        name: None,
    });

    let mut bot = Bot::builder()
        .with_config(&config)
        .unwrap()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(templates())
        .input(keyboard.clone())
        .stop_signal(StopAfterTicks::new(300))
        .clock(clock.clone())
        .build()
        .unwrap();

    let summary = bot.run().unwrap();
    let events = keyboard.events.borrow();

    assert_never_both_held(&events);
    assert_eq!(summary.flips, 2);
    assert_eq!(summary.final_direction, Direction::Right);
    let pulses: Vec<&str> = summary.pulses.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(pulses, vec!["attack", "e", "pickup"]);
    assert!(summary.pulses.iter().all(|(_, n)| *n > 0));
    assert!(events.contains(&Event::Down(Key::Control)));
    assert!(events.contains(&Event::Down(Key::Char('z'))));
}

#[test]
fn character_never_found_stops_with_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let keyboard = Recorder::default();

    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(Scene::default())
        .templates(templates())
        .scheduler(idle_scheduler())
        .input(keyboard.clone())
        .stop_signal(StopAfterTicks::new(10))
        .clock(ManualClock::new())
        .debug(Some(DebugSink::new(dir.path()).unwrap()))
        .build()
        .unwrap();

    let err = bot.run().unwrap_err();

    assert!(matches!(err, BotError::CharacterNotFound { ref template } if template == "character"));
    assert!(err.to_string().contains("'character'"));
    assert_eq!(
        *keyboard.events.borrow(),
        vec![Event::Up(Key::Left), Event::Up(Key::Right)]
    );
    assert!(dir.path().join("lookup_failure_character_frame.png").exists());
    assert!(dir.path().join("lookup_failure_character_template.png").exists());
}

#[test]
fn capture_failure_is_fatal() {
    let mut bot = Bot::builder()
        .frame_source(NoScreen)
        .matcher(Scene::default())
        .templates(templates())
        .scheduler(idle_scheduler())
        .input(Recorder::default())
        .stop_signal(StopAfterTicks::new(10))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let err = bot.run().unwrap_err();

    assert!(matches!(err, BotError::Capture(CaptureError::Backend(_))));
    assert_eq!(bot.state(), BotState::Stopped);
}

#[test]
fn input_failure_is_fatal() {
    let scene = Scene::walking(&[(100, 300)]).boundaries((0, 300), (500, 300));
    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(templates())
        .scheduler(idle_scheduler().with_action(ScheduledAction::new(
            ActionKind::Attack,
            "attack",
            Key::Control,
            IntervalSpec::Fixed(Duration::from_millis(200)),
        )))
        .input(BrokenKeyboard)
        .stop_signal(StopAfterTicks::new(10))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let err = bot.run().unwrap_err();

    assert!(matches!(
        err,
        BotError::Input {
            action: "press",
            key: Key::Right,
            ..
        }
    ));
}

#[test]
fn first_action_pulse_waits_one_interval_after_start() {
    let attack_after = |ticks| {
        let keyboard = Recorder::default();
        let scene = Scene::walking(&[(100, 300)]).boundaries((0, 300), (500, 300));
        let mut bot = Bot::builder()
            .frame_source(BlankScreen)
            .matcher(scene)
            .templates(templates())
            .scheduler(idle_scheduler().with_action(ScheduledAction::new(
                ActionKind::Attack,
                "attack",
                Key::Control,
                IntervalSpec::Fixed(Duration::from_millis(200)),
            )))
            .input(keyboard.clone())
            .stop_signal(StopAfterTicks::new(ticks))
            .clock(ManualClock::new())
            .build()
            .unwrap();
        let summary = bot.run().unwrap();
        let presses = keyboard
            .events
            .borrow()
            .iter()
            .filter(|e| **e == Event::Down(Key::Control))
            .count();
        (summary.total_pulses(), presses)
    };

    // ticks at 0..=140ms
    assert_eq!(attack_after(15), (0, 0));
    // first pulse on the tick at 210ms
    assert_eq!(attack_after(30), (1, 1));
}

#[test]
fn debug_mode_writes_one_screenshot_per_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let scene = Scene::walking(&[(100, 300)]).boundaries((0, 300), (500, 300));

    let mut bot = Bot::builder()
        .frame_source(BlankScreen)
        .matcher(scene)
        .templates(templates())
        .scheduler(idle_scheduler())
        .input(Recorder::default())
        .stop_signal(StopAfterTicks::new(60))
        .clock(ManualClock::new())
        .debug(Some(DebugSink::new(dir.path().join("shots")).unwrap()))
        .build()
        .unwrap();

    let summary = bot.run().unwrap();

    assert_eq!(summary.debug_frames, summary.refreshes);
    for cycle in 1..=summary.refreshes {
        let stem = format!("refresh_{cycle:06}");
        assert!(dir.path().join("shots").join(format!("{stem}.png")).exists());
        assert!(dir.path().join("shots").join(format!("{stem}.json")).exists());
    }
}
