pub mod coordinator;
pub mod domain;
pub mod ports;

pub use coordinator::UpsertCoordinator;
pub use domain::{BatchReport, Difficulty, ProfileSummary, Submission, WriteMode};
pub use ports::{PortError, PortResult, StatsProvider, SummaryStore};
