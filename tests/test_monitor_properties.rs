//! Trigger behaviour of the activity monitor, driven with synthetic clocks

mod common;

use common::RecordingSink;
use murmur::monitor::{ActivityMonitor, Mode, MonitorConfig, MonitorState, Trigger};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn monitor(config: MonitorConfig) -> (Arc<RecordingSink>, ActivityMonitor<RecordingSink>, Instant) {
    let start = Instant::now();
    let sink = Arc::new(RecordingSink::default());
    let monitor = ActivityMonitor::new(Arc::clone(&sink), config, start);
    (sink, monitor, start)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_grains_capped_at_rate() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    // 100 chunks in one second, well past 30 grains/s
    for i in 0..100 {
        monitor.process_chunk(b"token ", start + ms(i * 10));
    }
    let grains = sink.grains();
    assert!((29..=31).contains(&grains), "{} grains", grains);
}

#[test]
fn test_throttle_drops_rather_than_queues() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    for _ in 0..50 {
        monitor.process_chunk(b"x", start);
    }
    assert_eq!(sink.grains(), 1);
    // Nothing backlogged fires later
    monitor.tick(start + ms(500));
    assert_eq!(sink.grains(), 1);
}

#[test]
fn test_attention_fires_once_until_activity() {
    let config = MonitorConfig {
        silence_threshold: Duration::from_secs(5),
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);
    monitor.process_chunk(b"working", start);

    monitor.tick(start + ms(4_000));
    assert_eq!(sink.attentions(), 0);

    monitor.tick(start + ms(5_001));
    assert_eq!(sink.attentions(), 1);
    for t in [6_000, 10_000, 60_000] {
        monitor.tick(start + ms(t));
    }
    assert_eq!(sink.attentions(), 1, "latched alert must not repeat");

    monitor.process_chunk(b"more", start + ms(61_000));
    monitor.tick(start + ms(63_000));
    assert_eq!(sink.attentions(), 1);
    monitor.tick(start + ms(66_500));
    assert_eq!(sink.attentions(), 2);
}

#[test]
fn test_attention_after_startup_silence() {
    let config = MonitorConfig {
        silence_threshold: Duration::from_secs(2),
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);
    monitor.tick(start + ms(2_500));
    assert_eq!(sink.triggers(), vec![Trigger::Attention]);
}

#[test]
fn test_escape_only_chunk_does_not_reset_silence() {
    let config = MonitorConfig {
        silence_threshold: Duration::from_secs(5),
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);
    monitor.process_chunk(b"hi", start);
    // Cursor blink and spinner redraw codes, nothing visible
    monitor.process_chunk(b"\x1b[?25h\x1b[1G", start + ms(4_000));
    monitor.tick(start + ms(5_100));
    assert_eq!(sink.attentions(), 1);
}

#[test]
fn test_newline_run_chimes_exactly_once() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    monitor.process_chunk(b"All tests passed.\n\n\n   \n\t\n\n", start);
    assert_eq!(sink.chimes(), 1);
    assert_eq!(sink.grains(), 1);
}

#[test]
fn test_crlf_newlines_chime() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    monitor.process_chunk(b"done\r\n\r\n\r\n", start);
    assert_eq!(sink.chimes(), 1);
}

#[test]
fn test_two_newlines_do_not_chime() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    monitor.process_chunk(b"a\n\nb\n\nc\n", start);
    assert_eq!(sink.chimes(), 0);
}

#[test]
fn test_chime_not_throttled_with_grains() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    monitor.process_chunk(b"first", start);
    monitor.process_chunk(b"second\n\n\n", start);
    assert_eq!(sink.grains(), 1);
    assert_eq!(sink.chimes(), 1);
}

#[test]
fn test_grain_velocity_and_register_follow_text() {
    let (sink, monitor, start) = monitor(MonitorConfig::default());
    monitor.process_chunk(b"Q", start);
    monitor.process_chunk(&[b'x'; 200], start + ms(100));
    let triggers = sink.triggers();
    match (triggers[0], triggers[1]) {
        (
            Trigger::Grain {
                velocity: quiet,
                octave_shift: -1,
            },
            Trigger::Grain {
                velocity: loud,
                octave_shift: 0,
            },
        ) => assert!(loud > quiet),
        other => panic!("unexpected triggers {:?}", other),
    }
}

#[test]
fn test_reverse_mode_inverts_polarity() {
    let config = MonitorConfig {
        mode: Mode::Reverse,
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);

    let fired = monitor.process_chunk(b"lots of output\n\n\n", start);
    assert!(fired.is_empty());
    assert!(sink.triggers().is_empty());

    // Still inside the idle delay
    assert!(monitor.tick(start + ms(1_000)).is_empty());

    let fired = monitor.tick(start + ms(3_000));
    assert_eq!(
        fired,
        vec![
            Trigger::Chime,
            Trigger::Grain {
                velocity: 0.5,
                octave_shift: 0
            }
        ]
    );

    let fired = monitor.tick(start + ms(3_100));
    assert_eq!(fired.len(), 1);
    assert!(matches!(fired[0], Trigger::Grain { .. }));

    // Output silences it again, and the next silence chimes again
    monitor.process_chunk(b"back", start + ms(4_000));
    assert!(monitor.tick(start + ms(4_100)).is_empty());
    let fired = monitor.tick(start + ms(7_000));
    assert_eq!(fired[0], Trigger::Chime);
}

#[test]
fn test_reverse_ticks_respect_throttle() {
    let config = MonitorConfig {
        mode: Mode::Reverse,
        max_grains_per_sec: 5.0,
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);
    // 12 Hz ticks for one second after the idle delay
    for i in 0..12u64 {
        monitor.tick(start + ms(3_000) + Duration::from_secs_f64(i as f64 / 12.0));
    }
    let grains = sink.grains();
    assert!((4..=6).contains(&grains), "{} grains", grains);
}

#[test]
fn test_reverse_mode_never_alerts() {
    let config = MonitorConfig {
        mode: Mode::Reverse,
        silence_threshold: Duration::from_secs(1),
        ..Default::default()
    };
    let (sink, monitor, start) = monitor(config);
    monitor.tick(start + ms(30_000));
    assert_eq!(sink.attentions(), 0);
    assert_eq!(monitor.state(start + ms(30_000)), MonitorState::Idle);
}

#[test]
fn test_streams_are_independent() {
    let start = Instant::now();
    let sink = Arc::new(RecordingSink::default());
    let a = ActivityMonitor::new(Arc::clone(&sink), MonitorConfig::default(), start);
    let b = ActivityMonitor::new(Arc::clone(&sink), MonitorConfig::default(), start);
    a.process_chunk(b"one\n\n", start);
    b.process_chunk(b"\n", start);
    // b's newline does not extend a's run
    assert_eq!(sink.chimes(), 0);
    assert_eq!(b.state(start), MonitorState::Active);
}

#[test]
fn test_concurrent_chunks_and_ticks() {
    let sink = Arc::new(RecordingSink::default());
    let monitor = Arc::new(ActivityMonitor::new(
        Arc::clone(&sink),
        MonitorConfig::default(),
        Instant::now(),
    ));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    monitor.process_chunk(b"abc\n", Instant::now());
                    monitor.tick(Instant::now());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(sink.grains() >= 1);
    assert_eq!(sink.attentions(), 0);
}
