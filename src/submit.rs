use std::sync::atomic::{AtomicBool, Ordering};

use crate::calculator::{LookupFailure, SplitCalculator};
use crate::domain::{
    CreatedExpense, Error, ExpenseDraft, ExpenseService, Session, UserDirectory, ValidationErrors,
};

pub const ADD_EXPENSE_FAILED: &str = "Failed to add expense.";
pub const EXPENSE_ADDED: &str = "Expense added successfully.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Please fix the errors in the form.")]
    Invalid(ValidationErrors),

    #[error("Please fix the errors related to participants.")]
    Lookup(LookupFailure),

    #[error("{0}")]
    Rejected(String),

    #[error("A submission is already in progress.")]
    InFlight,
}

impl SubmitError {
    /// The field errors to show next to the form.
    pub fn errors(&self) -> ValidationErrors {
        match self {
            SubmitError::Invalid(errors) => errors.clone(),
            SubmitError::Lookup(failure) => failure.errors.clone(),
            SubmitError::Rejected(message) => {
                let mut errors = ValidationErrors::default();
                errors.form.api = Some(message.clone());
                errors
            }
            SubmitError::InFlight => ValidationErrors::default(),
        }
    }
}

/// One user-facing line for a rejected submission: the server's first
/// `non_field_errors` entry, else the transport error, else a fixed default.
pub fn rejection_message(error: &Error) -> String {
    let from_body = error.body_json().and_then(|body| {
        body.get("non_field_errors")
            .and_then(|errors| errors.get(0))
            .and_then(|first| first.as_str())
            .map(str::to_string)
    });
    if let Some(message) = from_body {
        return message;
    }
    let generic = error.to_string();
    if generic.trim().is_empty() {
        ADD_EXPENSE_FAILED.to_string()
    } else {
        generic
    }
}

/// Runs the validate, resolve, post sequence for expense drafts.
///
/// Only one submission may be in flight at a time; a concurrent call fails
/// fast with [`SubmitError::InFlight`].
#[derive(Debug)]
pub struct Submitter<D, S>
where
    D: UserDirectory,
    S: ExpenseService,
{
    calculator: SplitCalculator,
    directory: D,
    service: S,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D, S> Submitter<D, S>
where
    D: UserDirectory,
    S: ExpenseService,
{
    pub fn new(calculator: SplitCalculator, directory: D, service: S) -> Self {
        Self {
            calculator,
            directory,
            service,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submits the draft on behalf of `session`'s user. Nothing is retried;
    /// the draft is left untouched so the caller can fix and resubmit.
    pub async fn submit(
        &self,
        session: &Session,
        draft: &ExpenseDraft,
    ) -> Result<CreatedExpense, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("submission ignored, another one is in flight");
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let split = self.calculator.validate(draft).map_err(SubmitError::Invalid)?;
        let user_ids = self
            .calculator
            .resolve(&split, &self.directory, session)
            .await
            .map_err(SubmitError::Lookup)?;

        let payload = split.payload(session.user_id, &user_ids);
        match self.service.add_expense(session, &payload).await {
            Ok(created) => {
                tracing::info!(expense_id = created.expense_id, "expense added");
                Ok(created)
            }
            Err(e) => {
                tracing::error!(error = %e, "expense rejected");
                Err(SubmitError::Rejected(rejection_message(&e)))
            }
        }
    }
}
