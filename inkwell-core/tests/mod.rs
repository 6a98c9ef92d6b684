use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand::rngs::StdRng;

use inkwell_core::config::ControllerConfig;
use inkwell_core::quotes::{CsvFile, QuoteSource};
use inkwell_core::retry::{DeviceHealth, RetryPolicy};
use inkwell_core::{
    Clock, ControlKey, DataLoadError, DeviceError, DisplayFrame, DisplayRenderer, FallbackPolicy,
    FrameKind, KeyEvent, KeyOutcome, KeySource, Mode, ModeController, QuoteDataset, QuoteRecord,
    RenderError, TimeOfDay,
};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct ScriptedKeys {
    events: VecDeque<Result<Option<KeyEvent>, DeviceError>>,
    rediscoveries: VecDeque<Result<(), DeviceError>>,
    rediscover_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl KeySource for ScriptedKeys {
    async fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, DeviceError> {
        match self.events.pop_front() {
            Some(next) => next,
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn rediscover(&mut self) -> Result<(), DeviceError> {
        self.rediscover_calls.fetch_add(1, Ordering::SeqCst);
        self.rediscoveries
            .pop_front()
            .unwrap_or_else(|| Err(DeviceError::NotFound("scripted".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Clone, Default)]
struct RecordingDisplay {
    frames: Arc<Mutex<Vec<DisplayFrame>>>,
}

impl RecordingDisplay {
    fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    fn last(&self) -> DisplayFrame {
        self.frames.lock().unwrap().last().cloned().expect("no frame rendered")
    }
}

impl DisplayRenderer for RecordingDisplay {
    fn render(&mut self, frame: &DisplayFrame) -> Result<(), RenderError> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

struct BrokenDisplay;

impl DisplayRenderer for BrokenDisplay {
    fn render(&mut self, _frame: &DisplayFrame) -> Result<(), RenderError> {
        Err(RenderError::Backend("panel busy".to_string()))
    }
}

#[derive(Clone)]
struct ManualClock(Arc<Mutex<NaiveDateTime>>);

impl ManualClock {
    fn at(h: u32, m: u32) -> Self {
        Self(Arc::new(Mutex::new(datetime(h, m))))
    }

    fn set(&self, h: u32, m: u32) {
        *self.0.lock().unwrap() = datetime(h, m);
    }

    fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += chrono::Duration::seconds(secs);
    }
}

/// Panel whose refresh takes wall-clock time.
struct SlowDisplay {
    clock: ManualClock,
    refresh_secs: i64,
    frames: Arc<AtomicUsize>,
}

impl DisplayRenderer for SlowDisplay {
    fn render(&mut self, _frame: &DisplayFrame) -> Result<(), RenderError> {
        self.clock.advance(self.refresh_secs);
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn slow_controller(refresh_secs: i64) -> (ModeController, Arc<AtomicUsize>) {
    let clock = ManualClock::at(9, 15);
    let frames = Arc::new(AtomicUsize::new(0));
    let display = SlowDisplay {
        clock: clock.clone(),
        refresh_secs,
        frames: frames.clone(),
    };
    let controller = ModeController::new(
        ControllerConfig::default(),
        sample_dataset(),
        Box::new(ScriptedKeys::default()),
        Box::new(display),
        Box::new(clock),
        Box::new(StdRng::seed_from_u64(7)),
    );
    (controller, frames)
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

fn datetime(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 14)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn record(time: &str, text: &str, title: &str) -> QuoteRecord {
    QuoteRecord {
        time: time.parse().unwrap(),
        time_phrase: String::new(),
        quote_text: text.to_string(),
        source_title: title.to_string(),
        source_author: "Author".to_string(),
    }
}

fn sample_dataset() -> Arc<QuoteDataset> {
    Arc::new(QuoteDataset::from_records(vec![
        record("09:15", "It was quarter past nine...", "Nine"),
        record("12:00", "Noon, first.", "Noon A"),
        record("12:00", "Noon, second.", "Noon B"),
        record("12:00", "Noon, third.", "Noon C"),
    ]))
}

struct Harness {
    controller: ModeController,
    display: RecordingDisplay,
    clock: ManualClock,
}

fn harness_with(config: ControllerConfig, keys: ScriptedKeys, dataset: Arc<QuoteDataset>) -> Harness {
    let display = RecordingDisplay::default();
    let clock = ManualClock::at(9, 15);
    let controller = ModeController::new(
        config,
        dataset,
        Box::new(keys),
        Box::new(display.clone()),
        Box::new(clock.clone()),
        Box::new(StdRng::seed_from_u64(7)),
    );
    Harness {
        controller,
        display,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(ControllerConfig::default(), ScriptedKeys::default(), sample_dataset())
}

fn type_str(controller: &mut ModeController, s: &str) {
    for c in s.chars() {
        let event = match c {
            ' ' => KeyEvent::Control(ControlKey::Space),
            '\n' => KeyEvent::Control(ControlKey::Enter),
            c => KeyEvent::Character(c),
        };
        controller.handle_key(event);
    }
}

/// Leave clock mode with a throwaway key press.
fn enter_typing(controller: &mut ModeController) {
    assert_eq!(
        controller.handle_key(KeyEvent::Character('x')),
        KeyOutcome::EnteredTypeMode
    );
}

// ============================================================================
// Quote Dataset
// ============================================================================

#[test]
fn test_load_skips_malformed_rows() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "09:15|quarter past nine|It was quarter past nine.|A Book|An Author|sfw").unwrap();
    writeln!(file, "9.15|bad time|Skipped.|X|Y").unwrap();
    writeln!(file, "too|few").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "23:59|a minute to midnight|Almost.|Late|Night Owl").unwrap();

    let dataset = CsvFile::new(file.path()).load().unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.time_count(), 2);
    let q = dataset.query("09:15".parse().unwrap());
    assert_eq!(q.len(), 1);
    assert_eq!(q[0].source_title, "A Book");
    assert_eq!(q[0].time_phrase, "quarter past nine");
}

#[test]
fn test_load_skips_rows_that_are_not_utf8() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"09:15|quarter past nine|It was quarter past nine.|A Book|An Author\n")
        .unwrap();
    file.write_all(b"09:16|x|Bad \xff\xfe row.|T|A\n").unwrap();
    file.write_all(b"09:17|seventeen past|Still here.|B Book|B Author\n")
        .unwrap();

    let dataset = QuoteDataset::load(file.path()).unwrap();
    assert_eq!(dataset.len(), 2);
    assert!(dataset.query("09:16".parse().unwrap()).is_empty());
    assert_eq!(dataset.query("09:17".parse().unwrap())[0].source_title, "B Book");
}

#[test]
fn test_load_missing_file_is_read_error() {
    let err = QuoteDataset::load("/definitely/not/here/litclock.csv").unwrap_err();
    assert!(matches!(err, DataLoadError::Read { .. }));
}

#[test]
fn test_load_without_usable_rows_is_empty_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "not a row").unwrap();
    writeln!(file, "xx:yy|a|b|c").unwrap();
    let err = QuoteDataset::load(file.path()).unwrap_err();
    assert!(matches!(err, DataLoadError::Empty { .. }));
}

#[test]
fn test_query_allows_empty_minutes() {
    let dataset = sample_dataset();
    assert!(dataset.query("13:37".parse().unwrap()).is_empty());
    assert_eq!(dataset.query("12:00".parse().unwrap()).len(), 3);
}

#[test]
fn test_select_is_reproducible_under_a_seed() {
    let dataset = sample_dataset();
    let noon: TimeOfDay = "12:00".parse().unwrap();
    for seed in 0..20 {
        let a = dataset.select(noon, &mut StdRng::seed_from_u64(seed)).cloned();
        let b = dataset.select(noon, &mut StdRng::seed_from_u64(seed)).cloned();
        assert_eq!(a, b);
    }
}

#[test]
fn test_select_stays_within_candidates() {
    let dataset = sample_dataset();
    let noon: TimeOfDay = "12:00".parse().unwrap();
    let candidates = dataset.query(noon);
    let mut rng = StdRng::seed_from_u64(99);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        let chosen = dataset.select(noon, &mut rng).unwrap();
        assert!(candidates.contains(&chosen));
        seen.insert(chosen.source_title.clone());
    }
    assert_eq!(seen.len(), 3, "all candidates should eventually be chosen");
}

#[test]
fn test_select_single_candidate() {
    let dataset = sample_dataset();
    let mut rng = StdRng::seed_from_u64(1);
    let chosen = dataset.select("09:15".parse().unwrap(), &mut rng).unwrap();
    assert_eq!(chosen.source_title, "Nine");
}

#[test]
fn test_missing_minute_falls_back_to_previous_quote() {
    let dataset = sample_dataset();
    let mut rng = StdRng::seed_from_u64(1);
    let t916: TimeOfDay = "09:16".parse().unwrap();
    assert!(dataset.select(t916, &mut rng).is_none());

    let selection = dataset
        .select_with_fallback(t916, FallbackPolicy::Previous, &mut rng)
        .unwrap();
    assert_eq!(selection.matched.to_string(), "09:15");
    assert!(selection.is_fallback(t916));
    assert_eq!(selection.record.quote_text, "It was quarter past nine...");
}

// ============================================================================
// Mode Controller: transitions
// ============================================================================

#[test]
fn test_starts_in_clock_mode() {
    let h = harness();
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.display.count(), 0);
}

#[test]
fn test_tick_renders_quote_frame() {
    let mut h = harness();
    h.controller.handle_tick(datetime(9, 15));
    let frame = h.display.last();
    assert_eq!(frame.kind, FrameKind::Clock);
    assert_eq!(frame.lines, vec!["It was quarter past nine..."]);
    assert_eq!(frame.attribution.unwrap().title, "Nine");
    assert_eq!(frame.time, Some("09:15".parse().unwrap()));
}

#[test]
fn test_tick_at_empty_minute_shows_previous_quote() {
    let mut h = harness();
    h.controller.handle_tick(datetime(9, 16));
    let frame = h.display.last();
    assert_eq!(frame.lines, vec!["It was quarter past nine..."]);
    assert_eq!(frame.time, Some("09:16".parse().unwrap()));
}

#[test]
fn test_placeholder_policy_shows_static_message() {
    let config = ControllerConfig {
        fallback: FallbackPolicy::Placeholder,
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, ScriptedKeys::default(), sample_dataset());
    h.controller.handle_tick(datetime(9, 16));
    let frame = h.display.last();
    assert_eq!(frame.lines, vec!["No quote found for 09:16"]);
    assert!(frame.attribution.is_none());
}

#[test]
fn test_clock_history_stacks_quotes() {
    let mut h = harness();
    h.controller.handle_tick(datetime(9, 15));
    h.controller.handle_tick(datetime(9, 16));
    let frame = h.display.last();
    assert_eq!(
        frame.lines,
        vec![
            "It was quarter past nine...",
            "",
            "",
            "It was quarter past nine..."
        ]
    );
}

#[test]
fn test_any_key_in_clock_mode_opens_empty_typing_frame() {
    let mut h = harness();
    h.controller.handle_tick(datetime(9, 15));
    let outcome = h.controller.handle_key(KeyEvent::Character('a'));
    assert_eq!(outcome, KeyOutcome::EnteredTypeMode);
    assert_eq!(h.controller.mode(), Mode::Type);

    let frame = h.display.last();
    assert_eq!(frame.kind, FrameKind::Typing);
    assert!(frame.lines.iter().all(String::is_empty));
    assert!(h.controller.buffer().is_empty(), "the waking key is not typed");
}

#[test]
fn test_control_keys_also_leave_clock_mode() {
    let mut h = harness();
    assert_eq!(
        h.controller.handle_key(KeyEvent::Control(ControlKey::Unknown)),
        KeyOutcome::EnteredTypeMode
    );
    assert_eq!(h.controller.mode(), Mode::Type);
}

#[test]
fn test_typing_is_lossless() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    let text = "the judge never sleeps\nhe says he will never die";
    type_str(&mut h.controller, text);
    assert_eq!(h.controller.mode(), Mode::Type);
    assert_eq!(h.controller.buffer().logical_text(), text);
}

#[test]
fn test_each_edit_renders_once() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    let before = h.display.count();
    type_str(&mut h.controller, "abc");
    assert_eq!(h.display.count(), before + 3);
    assert_eq!(h.display.last().lines, vec!["abc"]);
}

#[test]
fn test_escape_command_returns_to_clock() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "hello;cloc");
    assert_eq!(h.controller.mode(), Mode::Type);

    let outcome = h.controller.handle_key(KeyEvent::Character('k'));
    assert_eq!(outcome, KeyOutcome::EnteredClockMode);
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.controller.buffer().logical_text(), "hello");

    let frame = h.display.last();
    assert_eq!(frame.kind, FrameKind::Clock);
    assert_eq!(frame.lines, vec!["It was quarter past nine..."]);
}

#[test]
fn test_escape_clears_clock_history() {
    let mut h = harness();
    h.controller.handle_tick(datetime(9, 15));
    h.controller.handle_tick(datetime(9, 16));
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, ";clock");
    assert_eq!(h.display.last().lines.len(), 1);
}

#[test]
fn test_escape_command_spanning_a_wrap() {
    let config = ControllerConfig {
        line_width: 4,
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, ScriptedKeys::default(), sample_dataset());
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "ab;clock");
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.controller.buffer().render_text(), vec!["ab".to_string()]);
}

#[test]
fn test_escape_command_typed_with_space_key_token() {
    let config = ControllerConfig {
        escape_command: inkwell_core::EscapeCommand::new("; clock").unwrap(),
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, ScriptedKeys::default(), sample_dataset());
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "x; clock");
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.controller.buffer().logical_text(), "x");
}

#[test]
fn test_ticks_are_ignored_while_typing() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    let before = h.display.count();
    h.controller.handle_tick(datetime(12, 0));
    assert_eq!(h.display.count(), before);
    assert_eq!(h.controller.mode(), Mode::Type);
}

#[test]
fn test_ignored_keys_do_not_render() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    let before = h.display.count();
    assert_eq!(
        h.controller.handle_key(KeyEvent::Control(ControlKey::Unknown)),
        KeyOutcome::Ignored
    );
    assert_eq!(
        h.controller.handle_key(KeyEvent::Control(ControlKey::Backspace)),
        KeyOutcome::Ignored
    );
    assert_eq!(h.display.count(), before);
}

#[test]
fn test_backspace_and_enter_edit_the_buffer() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "ab\ncd");
    h.controller.handle_key(KeyEvent::Control(ControlKey::Backspace));
    h.controller.handle_key(KeyEvent::Control(ControlKey::Backspace));
    assert_eq!(h.display.last().lines, vec!["ab", ""]);
    h.controller.handle_key(KeyEvent::Control(ControlKey::Backspace));
    assert_eq!(h.display.last().lines, vec!["ab"]);
}

#[test]
fn test_buffer_persists_across_clock_round_trip() {
    let mut h = harness();
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "draft;clock");
    assert_eq!(h.controller.mode(), Mode::Clock);

    enter_typing(&mut h.controller);
    assert_eq!(h.display.last().lines, vec!["draft"]);
}

#[test]
fn test_reset_on_type_mode_clears_buffer() {
    let config = ControllerConfig {
        reset_on_type_mode: true,
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, ScriptedKeys::default(), sample_dataset());
    enter_typing(&mut h.controller);
    type_str(&mut h.controller, "draft;clock");
    enter_typing(&mut h.controller);
    assert!(h.controller.buffer().is_empty());
}

#[test]
fn test_render_failures_are_survived() {
    let mut controller = ModeController::new(
        ControllerConfig::default(),
        sample_dataset(),
        Box::new(ScriptedKeys::default()),
        Box::new(BrokenDisplay),
        Box::new(ManualClock::at(9, 15)),
        Box::new(StdRng::seed_from_u64(1)),
    );
    controller.handle_tick(datetime(9, 15));
    enter_typing(&mut controller);
    type_str(&mut controller, "still typing");
    assert_eq!(controller.mode(), Mode::Type);
    assert_eq!(controller.buffer().logical_text(), "still typing");
    assert_eq!(controller.dropped_frames(), 2 + "still typing".len() as u64);
}

// ============================================================================
// Mode Controller: event loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_iteration_ticks_then_handles_key() {
    let keys = ScriptedKeys {
        events: VecDeque::from([Ok(Some(KeyEvent::Character('q')))]),
        ..ScriptedKeys::default()
    };
    let mut h = harness_with(ControllerConfig::default(), keys, sample_dataset());

    h.controller.run_once().await;
    let frames = h.display.frames.lock().unwrap().clone();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].kind, FrameKind::Clock);
    assert_eq!(frames[1].kind, FrameKind::Typing);
    assert_eq!(h.controller.mode(), Mode::Type);
}

#[tokio::test(start_paused = true)]
async fn test_minute_change_ticks_once() {
    let mut h = harness();
    h.controller.run_once().await;
    h.controller.run_once().await;
    assert_eq!(h.display.count(), 1, "same minute must not re-render");

    h.clock.set(12, 0);
    h.controller.run_once().await;
    assert_eq!(h.display.count(), 2);
    assert!(h.display.last().lines[3].starts_with("Noon"));
}

#[tokio::test(start_paused = true)]
async fn test_wait_is_measured_after_slow_refresh() {
    let (mut controller, frames) = slow_controller(40);
    let started = tokio::time::Instant::now();
    controller.run_once().await;
    assert_eq!(frames.load(Ordering::SeqCst), 1);
    // Refresh ended at 09:15:40, so the next boundary is 20s away.
    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_past_boundary_ticks_without_waiting() {
    let (mut controller, frames) = slow_controller(65);
    let started = tokio::time::Instant::now();
    controller.run_once().await;
    assert_eq!(started.elapsed(), Duration::ZERO);
    controller.run_once().await;
    assert_eq!(frames.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_device_loss_returns_to_clock_and_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let keys = ScriptedKeys {
        events: VecDeque::from([
            Ok(Some(KeyEvent::Character('a'))),
            Ok(Some(KeyEvent::Character('b'))),
            Err(DeviceError::Disconnected("usb unplugged".to_string())),
        ]),
        rediscoveries: VecDeque::from([
            Err(DeviceError::NotFound("still gone".to_string())),
            Ok(()),
        ]),
        rediscover_calls: calls.clone(),
    };
    let config = ControllerConfig {
        retry: RetryPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: 5,
        },
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, keys, sample_dataset());

    h.controller.run_once().await; // tick + 'a' wakes typing
    h.controller.run_once().await; // 'b'
    assert_eq!(h.controller.mode(), Mode::Type);

    h.controller.run_once().await; // device lost
    assert!(matches!(h.controller.device_health(), DeviceHealth::Lost { .. }));
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.display.last().kind, FrameKind::Clock);

    h.controller.run_once().await; // first retry fails
    assert!(matches!(
        h.controller.device_health(),
        DeviceHealth::Lost { attempts: 1, .. }
    ));
    h.controller.run_once().await; // second retry succeeds
    assert_eq!(h.controller.device_health(), DeviceHealth::Connected);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.controller.buffer().logical_text(), "b");
}

#[tokio::test(start_paused = true)]
async fn test_rediscovery_is_bounded() {
    let keys = ScriptedKeys {
        events: VecDeque::from([Err(DeviceError::Disconnected("gone".to_string()))]),
        ..ScriptedKeys::default()
    };
    let config = ControllerConfig {
        retry: RetryPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: 2,
        },
        ..ControllerConfig::default()
    };
    let mut h = harness_with(config, keys, sample_dataset());
    for _ in 0..4 {
        h.controller.run_once().await;
    }
    assert_eq!(h.controller.device_health(), DeviceHealth::Abandoned);

    // Still a clock.
    h.clock.set(12, 0);
    h.controller.run_once().await;
    assert_eq!(h.display.last().kind, FrameKind::Clock);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_stops_on_shutdown() {
    let mut h = harness();
    h.controller
        .run_until(tokio::time::sleep(Duration::from_secs(150)))
        .await;
    assert_eq!(h.controller.mode(), Mode::Clock);
    assert_eq!(h.display.count(), 1);
}
