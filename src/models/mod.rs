pub mod loaders;
pub mod outcome;
pub mod record;
pub mod unit;

pub use loaders::{load_unit_file, scan_unit_folder};
pub use outcome::{
    FailureCause, OutcomeStatus, RunSummary, StatusCounts, StepId, UploadOutcome,
};
pub use record::{ChangeRecord, DuplicateEntry, EnrollmentAction, ValidationReport};
pub use unit::{BatchReport, PartitionKey, Unit};
