//! Test fixtures: a synthetic calibration rig and scratch files.

use std::path::{Path, PathBuf};

use ledcal::models::AppConfig;

/// Configuration matching the synthetic rig.
pub const RIG_CONFIG: &str = r#"
sync:
  black_threshold: 13.0
  green_trigger_threshold: 500.0
red:
  threshold: 300.0
"#;

pub fn rig_config() -> AppConfig {
    AppConfig::from_yaml(RIG_CONFIG).expect("rig config parses")
}

/// Sensor reading as (R, G, B, L).
pub type Channels = (f64, f64, f64, f64);

const BLACK: Channels = (1.0, 2.0, 1.0, 0.5);

/// Response of the synthetic rig under `led` (0 red, 1 green, 2 blue) at
/// drive current `c`.
///
/// The red reference channel is noise below current 3, red crosses the 300
/// calibration threshold at current 3, and the blue LED is the dimmest, so
/// a capture up to current `n` has a brightness limit of `1.2 * n`.
pub fn rig_response(led: usize, c: u32) -> Channels {
    let c = c as f64;
    match led {
        0 => {
            let reference = if c < 3.0 { 9.0 } else { 1.5 * c };
            (120.0 * c, 5.0 * c, 2.0 * c, reference)
        }
        1 => (20.0 + c, 600.0 + 40.0 * c, 30.0, 2.0 * c),
        _ => (10.0, 50.0, 400.0 + 30.0 * c, 1.2 * c),
    }
}

fn log_line(index: usize, (r, g, b, l): Channels) -> String {
    let ms = index * 250;
    format!(
        "[00:{:02}:{:02}.{:03},{:03}] <inf> sensors: OPT4060: R={:.6}, G={:.6}, B={:.6}, L={:.6}",
        ms / 60_000,
        (ms / 1000) % 60,
        ms % 1000,
        index % 1000,
        r,
        g,
        b,
        l
    )
}

/// Log lines of a capture driving currents `1..=max`.
///
/// Two dark samples precede the seeded first series, and unrelated firmware
/// chatter is mixed in.
pub fn rig_log_lines(max: u32) -> Vec<String> {
    let mut readings = vec![BLACK, BLACK];
    for led in 0..3 {
        readings.extend(std::iter::repeat(rig_response(led, 1)).take(4));
    }
    for c in 2..=max {
        readings.extend(std::iter::repeat(BLACK).take(4));
        for led in 0..3 {
            readings.extend(std::iter::repeat(rig_response(led, c)).take(4));
        }
    }

    let mut lines = vec![
        "*** Booting Zephyr OS build v3.6.0 ***".to_string(),
        "[00:00:00.001,000] <inf> main: calibration firmware ready".to_string(),
    ];
    for (i, reading) in readings.into_iter().enumerate() {
        lines.push(log_line(i, reading));
        if i % 50 == 49 {
            lines.push(format!("[00:00:00.000,000] <dbg> main: heartbeat {i}"));
        }
    }
    lines
}

pub fn rig_log(max: u32) -> String {
    let mut text = rig_log_lines(max).join("\n");
    text.push('\n');
    text
}

/// Number of sensor samples in `rig_log(max)`.
pub fn rig_sample_count(max: u32) -> usize {
    2 + 12 + (max as usize - 1) * 16
}

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}
