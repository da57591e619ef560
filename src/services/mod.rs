//! Service layer separating I/O and progress reporting from workflow logic

pub mod io;
pub mod progress;

pub use io::{default_report_filename, ImageIOService, ReportIOService};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTicker, ProgressUpdate,
};
