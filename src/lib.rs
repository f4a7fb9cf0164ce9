pub mod api;
pub mod calculator;
pub mod cli;
pub mod config;
pub mod domain;
pub mod feedback;
pub mod output;
pub mod report;
pub mod submit;

pub use api::ApiClient;
pub use calculator::{LookupFailure, Owed, SplitCalculator, ValidatedParticipant, ValidatedSplit};
pub use config::Config;
pub use submit::{SubmitError, Submitter};
