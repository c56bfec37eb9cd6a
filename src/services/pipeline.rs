//! The `run` command: log in, C sources out.

use std::path::{Path, PathBuf};

use led_lut::emit::LutArrays;
use led_lut::{Calibration, Calibrator};
use serde::Serialize;

use crate::error::PipelineError;
use crate::models::{AppConfig, JoinedRecord, SampleRecord, SolverRecord, SyncedRecord};
use crate::services::stages::{self, EmittedFiles, StageLogger};
use crate::services::tabular::write_table;

/// Intermediate tables written to the work directory.
pub const SAMPLES_CSV: &str = "samples.csv";
pub const SYNCED_CSV: &str = "synced.csv";
pub const JOINED_CSV: &str = "joined.csv";
pub const JOINED_RED_CSV: &str = "joined_red.csv";
pub const LUT_CSV: &str = "lut.csv";

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct RunPaths<'a> {
    pub log: &'a Path,
    pub prefix: &'a Path,
    pub work_dir: Option<&'a Path>,
    pub report: Option<&'a Path>,
}

/// Counts per stage, written as JSON by `run --report`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub log_lines: usize,
    pub samples: usize,
    pub sync: SyncSummary,
    pub join: JoinSummary,
    pub red: RedSummary,
    pub solve: SolveSummary,
    pub header: PathBuf,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub rows: usize,
    pub data_start: usize,
    pub incomplete_samples: usize,
    pub last_current: u32,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSummary {
    pub triplets: usize,
    pub rejected_rows: usize,
    pub dropped_currents: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedSummary {
    pub calibration_index: usize,
    pub calibration_current: u32,
    pub approximated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveSummary {
    pub steps: usize,
    pub pwm_mode: String,
    pub brightness_limit: f64,
}

impl RunReport {
    fn new(log_lines: usize, calibration: &Calibration, files: EmittedFiles) -> Self {
        let Calibration {
            samples,
            sync,
            join,
            red,
            table,
        } = calibration;
        let duplicates = join
            .diagnostics
            .iter()
            .filter(|d| matches!(d, led_lut::JoinDiagnostic::Duplicate { .. }))
            .count();

        Self {
            log_lines,
            samples: samples.len(),
            sync: SyncSummary {
                rows: sync.rows.len(),
                data_start: sync.data_start,
                incomplete_samples: sync.incomplete.len(),
                last_current: sync.last_current(),
                truncated: sync.truncated.is_some(),
            },
            join: JoinSummary {
                triplets: join.triplets.len(),
                rejected_rows: join.rejected_rows(),
                dropped_currents: join.dropped_currents(),
                duplicates,
            },
            red: RedSummary {
                calibration_index: red.calibration.index,
                calibration_current: red.calibration.current,
                approximated: red.replacements.len(),
            },
            solve: SolveSummary {
                steps: table.len(),
                pwm_mode: table.pwm_mode().to_string(),
                brightness_limit: table.brightness_limit(),
            },
            header: files.header,
            source: files.source,
        }
    }
}

/// Run every stage over a log file and emit the C sources.
pub fn run(paths: &RunPaths<'_>, config: &AppConfig) -> Result<RunReport, PipelineError> {
    let calibrator: Calibrator = config.calibrator()?;
    let values_per_line = config.values_per_line()?;

    let lines = stages::read_log_lines(paths.log)?;
    tracing::info!(log = %paths.log.display(), lines = lines.len(), "Calibrating");

    let mut logger = StageLogger { lines: lines.len() };
    let calibration = calibrator.run_observed(&lines, &mut logger)?;

    if let Some(dir) = paths.work_dir {
        write_intermediates(dir, &calibration)?;
    }

    let arrays = LutArrays::from_table(&calibration.table);
    let files = stages::write_c_sources(&arrays, paths.prefix, values_per_line)?;

    let report = RunReport::new(lines.len(), &calibration, files);
    if let Some(path) = paths.report {
        write_report(path, &report)?;
    }
    Ok(report)
}

fn write_intermediates(dir: &Path, calibration: &Calibration) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

    let samples: Vec<SampleRecord> = calibration.samples.iter().map(SampleRecord::from).collect();
    write_table(&dir.join(SAMPLES_CSV), &samples)?;

    let synced: Vec<SyncedRecord> = calibration.sync.rows.iter().map(SyncedRecord::from).collect();
    write_table(&dir.join(SYNCED_CSV), &synced)?;

    let joined: Vec<JoinedRecord> = calibration
        .join
        .triplets
        .iter()
        .map(JoinedRecord::from)
        .collect();
    write_table(&dir.join(JOINED_CSV), &joined)?;

    let joined_red: Vec<JoinedRecord> = calibration
        .red
        .triplets
        .iter()
        .map(JoinedRecord::from)
        .collect();
    write_table(&dir.join(JOINED_RED_CSV), &joined_red)?;

    let lut: Vec<SolverRecord> = calibration
        .table
        .rows()
        .iter()
        .map(SolverRecord::from)
        .collect();
    write_table(&dir.join(LUT_CSV), &lut)?;

    tracing::info!(dir = %dir.display(), "Wrote intermediate tables");
    Ok(())
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), PipelineError> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| PipelineError::io(path, e))?;
    tracing::info!(path = %path.display(), "Wrote run report");
    Ok(())
}
