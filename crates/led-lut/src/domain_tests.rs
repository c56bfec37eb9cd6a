//! Cross-stage regression tests for led-lut.
//!
//! Each test documents the failure it guards against. The capture generator
//! below produces log text with the same block structure as the real rig.

#[cfg(test)]
mod domain_tests {
    use crate::api::{Calibrator, StageObserver};
    use crate::curve::LuminanceCurve;
    use crate::join::{join_triplets, JoinDiagnostic, JoinReport};
    use crate::model::{Led, RawSample, Reading, Rgb, SyncedRow};
    use crate::parse::LogParser;
    use crate::red::RedApproximation;
    use crate::solve::{solve, solve_curves, CalibrationTable, PwmMode, SolveOptions};
    use crate::sync::{SyncOptions, SyncReport, Synchronizer};

    const BLACK: f64 = 13.0;
    const GREEN_TRIGGER: f64 = 500.0;
    const RED_THRESHOLD: f64 = 300.0;

    /// Small deterministic generator so property tests need no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    /// Sensor response under one LED at current `c`.
    fn response(led: Led, c: u32) -> Reading {
        let c = c as f64;
        match led {
            Led::Red => {
                // The reference channel under red is noise below current 3.
                let reference = if c < 3.0 { 9.0 } else { 1.5 * c };
                Reading::new(120.0 * c, 5.0 * c, 2.0 * c, reference)
            }
            Led::Green => Reading::new(20.0 + c, 600.0 + 40.0 * c, 30.0, 2.0 * c),
            Led::Blue => Reading::new(10.0, 50.0, 400.0 + 30.0 * c, 1.2 * c),
        }
    }

    fn log_line(index: usize, reading: &Reading) -> String {
        let ms = index * 250;
        format!(
            "[00:{:02}:{:02}.{:03},000] sensors: [main/0x20007568/0] OPT4060: R={:.6}, G={:.6}, B={:.6}, L={:.6}",
            ms / 60_000,
            (ms / 1000) % 60,
            ms % 1000,
            reading.r,
            reading.g,
            reading.b,
            reading.reference
        )
    }

    /// Log of a capture running currents `1..=max`, preceded by two dark
    /// samples and a boot message.
    fn capture(max: u32) -> Vec<String> {
        let black = Reading::new(1.0, 2.0, 1.0, 0.5);
        let mut readings = vec![black, black];
        for led in Led::ALL {
            readings.extend(std::iter::repeat(response(led, 1)).take(4));
        }
        for c in 2..=max {
            readings.extend(std::iter::repeat(black).take(4));
            for led in Led::ALL {
                readings.extend(std::iter::repeat(response(led, c)).take(4));
            }
        }

        let mut lines = vec!["*** Booting firmware ***".to_string()];
        lines.extend(readings.iter().enumerate().map(|(i, r)| log_line(i, r)));
        lines
    }

    fn calibrator() -> Calibrator {
        Calibrator::new(SyncOptions::new(BLACK, GREEN_TRIGGER), RED_THRESHOLD)
    }

    // ========================================================================
    // End-to-end capture
    // ========================================================================

    /// If this breaks, it means: a stage boundary lost or reordered data. A
    /// clean capture of 20 currents must give 20 triplets and a table whose
    /// full-brightness row drives the weakest LED (blue) at its maximum.
    #[test]
    fn test_clean_capture_end_to_end() {
        let result = calibrator().run(capture(20)).unwrap();

        assert_eq!(result.samples.len(), 2 + 12 + 19 * 16);
        assert_eq!(result.sync.data_start, 2);
        assert_eq!(result.sync.rows.len(), 60);
        assert!(result.sync.truncated.is_none());
        assert_eq!(result.sync.last_current(), 20);

        assert!(result.join.diagnostics.is_empty());
        assert_eq!(result.join.triplets.len(), 20);

        // Red crosses 300 at current 3 (360); currents 1 and 2 are replaced.
        assert_eq!(result.red.calibration.current, 3);
        assert_eq!(result.red.replacements.len(), 2);
        assert!((result.red.triplets[0].red.reference - 1.5).abs() < 1e-12);
        assert!((result.red.triplets[1].red.reference - 3.0).abs() < 1e-12);

        let table = &result.table;
        assert_eq!(table.len(), 101);
        assert!((table.brightness_limit() - 24.0).abs() < 1e-9);

        let full = table.rows()[100];
        assert_eq!(full.percent, 100);
        assert_eq!(full.drive.b, 20);
        assert_eq!(full.pwm.b, 255);
        assert_eq!(full.drive.r, 16);
        assert_eq!(full.drive.g, 12);
    }

    /// If this breaks, it means: the noisy low-current red reference values
    /// leaked into the curve. With them, the red curve would jump to 9.0 at
    /// current 1 and the exact red current of dim rows would collapse to a
    /// fraction of the linear response.
    #[test]
    fn test_red_noise_does_not_reach_the_table() {
        let result = calibrator().steps(241).run(capture(20)).unwrap();
        // Step 10 of 240: target 1.0; red needs 1.0 / 1.5 of a unit.
        let row = result.table.rows()[10];
        assert!((row.exact_current.r - 0.6667).abs() < 1e-9);
        assert_eq!(row.drive.r, 1);
    }

    /// If this breaks, it means: parsing or synchronization depends on state
    /// outside its input.
    #[test]
    fn test_synchronization_is_idempotent() {
        let lines = capture(8);
        let samples: Vec<_> = LogParser::default().samples(&lines).collect();
        let sync = Synchronizer::new(SyncOptions::new(BLACK, GREEN_TRIGGER));

        let first = sync.synchronize(&samples).unwrap();
        let second = sync.synchronize(&samples).unwrap();
        assert_eq!(first, second);
    }

    /// If this breaks, it means: output is not reproducible between runs,
    /// which would change compiled firmware on every rebuild.
    #[test]
    fn test_runs_are_deterministic() {
        let a = calibrator().pwm_mode(PwmMode::Current).run(capture(12)).unwrap();
        let b = calibrator().pwm_mode(PwmMode::Current).run(capture(12)).unwrap();
        assert_eq!(a, b);
    }

    /// If this breaks, it means: a truncated capture is silently accepted in
    /// strict mode, or rejected in lenient mode.
    #[test]
    fn test_truncated_capture_policy() {
        let mut lines = capture(6);
        lines.truncate(lines.len() - 5);

        let lenient = calibrator().run(&lines).unwrap();
        assert_eq!(lenient.sync.last_current(), 5);
        assert!(lenient.sync.truncated.is_some());

        assert!(calibrator().strict_series(true).run(&lines).is_err());
    }

    #[derive(Default)]
    struct StageLog(Vec<&'static str>);

    impl StageObserver for StageLog {
        fn parsed(&mut self, _: &[RawSample]) {
            self.0.push("parsed");
        }
        fn synchronized(&mut self, _: &SyncReport) {
            self.0.push("synchronized");
        }
        fn joined(&mut self, _: &JoinReport) {
            self.0.push("joined");
        }
        fn red_approximated(&mut self, _: &RedApproximation) {
            self.0.push("red");
        }
        fn solved(&mut self, _: &CalibrationTable) {
            self.0.push("solved");
        }
    }

    /// If this breaks, it means: a failing late stage hides what the earlier
    /// stages found. Stages that completed must have been reported even when
    /// red extrapolation fails, and a strict series failure must still report
    /// the lenient sync result.
    #[test]
    fn test_completed_stages_are_reported_before_a_failure() {
        let mut stages = StageLog::default();
        let result = Calibrator::new(SyncOptions::new(BLACK, GREEN_TRIGGER), 1e9)
            .run_observed(capture(6), &mut stages);
        assert!(result.is_err());
        assert_eq!(stages.0, vec!["parsed", "synchronized", "joined"]);

        let mut lines = capture(6);
        lines.truncate(lines.len() - 5);
        let mut stages = StageLog::default();
        let result = calibrator()
            .strict_series(true)
            .run_observed(&lines, &mut stages);
        assert!(result.is_err());
        assert_eq!(stages.0, vec!["parsed", "synchronized"]);

        let mut stages = StageLog::default();
        calibrator().run_observed(capture(4), &mut stages).unwrap();
        assert_eq!(stages.0, vec!["parsed", "synchronized", "joined", "red", "solved"]);
    }

    // ========================================================================
    // Curve properties
    // ========================================================================

    fn random_curve(rng: &mut Lcg) -> LuminanceCurve {
        let n = 1 + (rng.next_f64() * 30.0) as usize;
        let points: Vec<(f64, f64)> = (0..n)
            .map(|_| {
                let current = 1.0 + (rng.next_f64() * 60.0).floor();
                (current, rng.next_f64() * 500.0)
            })
            .collect();
        LuminanceCurve::from_points(&points).unwrap()
    }

    /// If this breaks, it means: curve normalization let a dip or a repeated
    /// current through, so inversion can pick the wrong segment.
    #[test]
    fn test_curves_are_monotone() {
        let mut rng = Lcg(7);
        for _ in 0..200 {
            let curve = random_curve(&mut rng);
            for pair in curve.points().windows(2) {
                assert!(pair[0].0 < pair[1].0, "currents must increase: {:?}", pair);
                assert!(pair[0].1 <= pair[1].1, "luminance must not drop: {:?}", pair);
            }
        }
    }

    /// If this breaks, it means: inversion and evaluation disagree, so the
    /// luminance-mode PWM corrects for the wrong overshoot.
    #[test]
    fn test_inversion_round_trips_through_evaluation() {
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let curve = random_curve(&mut rng);
            let last = curve.last_luminance();
            for k in 0..=20 {
                let target = last * k as f64 / 20.0;
                let current = curve.invert(target);
                let back = curve.evaluate(current);
                assert!(
                    (back - target).abs() <= 1e-9 * last.max(1.0),
                    "target {} -> current {} -> {}",
                    target,
                    current,
                    back
                );
            }
            assert_eq!(curve.invert(-1.0), curve.points()[0].0);
            assert_eq!(curve.invert(last + 1.0), curve.points().last().unwrap().0);
        }
    }

    // ========================================================================
    // Solver contracts
    // ========================================================================

    fn random_curves(rng: &mut Lcg) -> Rgb<LuminanceCurve> {
        Rgb::new(random_curve(rng), random_curve(rng), random_curve(rng))
    }

    /// If this breaks, it means: a step was rounded down and the LED would be
    /// darker than the requested brightness.
    #[test]
    fn test_drive_is_never_below_exact_current() {
        let mut rng = Lcg(99);
        for _ in 0..50 {
            let curves = random_curves(&mut rng);
            for mode in [PwmMode::Luminance, PwmMode::Current] {
                let table = solve_curves(&curves, &SolveOptions::new().pwm_mode(mode)).unwrap();
                for row in &table.rows()[1..] {
                    for led in Led::ALL {
                        assert!(
                            row.drive[led] as f64 >= row.exact_current[led] - 5e-5,
                            "{:?} drive {} below exact {}",
                            led,
                            row.drive[led],
                            row.exact_current[led]
                        );
                    }
                }
            }
        }
    }

    /// If this breaks, it means: brightness steps are no longer ordered, so
    /// raising the brightness could dim an LED.
    #[test]
    fn test_brighter_steps_never_need_less_current() {
        let mut rng = Lcg(5);
        for _ in 0..50 {
            let curves = random_curves(&mut rng);
            let table = solve_curves(&curves, &SolveOptions::new()).unwrap();
            for pair in table.rows().windows(2) {
                assert!(pair[0].percent <= pair[1].percent);
                for led in Led::ALL {
                    assert!(pair[0].exact_current[led] <= pair[1].exact_current[led]);
                    assert!(pair[0].drive[led] <= pair[1].drive[led]);
                }
            }
        }
    }

    /// If this breaks, it means: the reference three-curve example no longer
    /// balances at half brightness (limit 140, red exact 12, PWM 255).
    #[test]
    fn test_three_curve_reference_scenario() {
        let curves = Rgb::new(
            LuminanceCurve::from_points(&[(0.0, 0.0), (10.0, 50.0), (20.0, 150.0)]).unwrap(),
            LuminanceCurve::from_points(&[(0.0, 0.0), (10.0, 80.0), (20.0, 160.0)]).unwrap(),
            LuminanceCurve::from_points(&[(0.0, 0.0), (10.0, 40.0), (20.0, 140.0)]).unwrap(),
        );
        let table = solve_curves(&curves, &SolveOptions::new()).unwrap();
        assert_eq!(table.brightness_limit(), 140.0);

        let row = table.rows()[50];
        assert_eq!(row.percent, 50);
        assert_eq!(row.exact_current.r, 12.0);
        assert_eq!(row.drive.r, 12);
        assert_eq!(row.pwm.r, 255);

        let off = table.rows()[0];
        assert_eq!(off.drive, Rgb::new(0, 0, 0));
        assert_eq!(off.pwm, Rgb::new(0, 0, 0));
    }

    // ========================================================================
    // Stage scenarios
    // ========================================================================

    /// If this breaks, it means: the black test became inclusive or ignores
    /// a channel.
    #[test]
    fn test_black_classification_scenario() {
        assert!(Reading::new(12.0, 10.0, 11.0, 9.0).is_black(13.0));
        assert!(!Reading::new(14.0, 10.0, 11.0, 9.0).is_black(13.0));
    }

    /// If this breaks, it means: a current with a missing LED reached the
    /// table as a half-empty row.
    #[test]
    fn test_incomplete_current_is_dropped_before_solving() {
        let mut rows = Vec::new();
        for c in [4, 5, 6] {
            for led in Led::ALL {
                if c == 5 && led == Led::Green {
                    continue;
                }
                rows.push(SyncedRow::single(format!("t{c}{led}"), led, c, response(led, c + 1)));
            }
        }

        let join = join_triplets(&rows);
        assert_eq!(join.diagnostics.len(), 1);
        assert!(matches!(
            &join.diagnostics[0],
            JoinDiagnostic::Incomplete { current: 5, missing } if missing == &vec![Led::Green]
        ));
        let currents: Vec<u32> = join.triplets.iter().map(|t| t.current).collect();
        assert_eq!(currents, vec![4, 6]);

        let table = solve(&join.triplets, &SolveOptions::new().steps(5)).unwrap();
        assert_eq!(table.len(), 5);
    }
}
