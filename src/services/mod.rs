pub mod pipeline;
pub mod stages;
pub mod tabular;

pub use pipeline::{run, RunPaths, RunReport};
pub use stages::EmittedFiles;
pub use tabular::{read_table, write_table, TableRead};
