use async_trait::async_trait;

use crate::domain::{CreatedExpense, Error, ExpensePayload, Session, UserId, ValidationErrors};

/// Resolves usernames to user ids.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when no user has that name.
    async fn find_user_id(&self, session: &Session, username: &str)
    -> Result<Option<UserId>, Error>;
}

/// Accepts new expenses.
#[async_trait]
pub trait ExpenseService: Send + Sync {
    async fn add_expense(
        &self,
        session: &Session,
        payload: &ExpensePayload,
    ) -> Result<CreatedExpense, Error>;
}

/// Where the outcome of a submission is reported to the user.
pub trait Feedback {
    fn invalid(&self, errors: &ValidationErrors);
    fn failure(&self, message: &str);
    fn success(&self, message: &str);
}
