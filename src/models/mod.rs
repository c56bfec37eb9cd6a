pub mod config;
pub mod records;

pub use config::{AppConfig, EmitConfig, LogConfig, RedConfig, SolveConfig, SyncConfig, CONFIG_ENV};
pub use records::{
    solver_columns, JoinedRecord, SampleRecord, SolverRecord, SyncedRecord, TableRecord,
};
