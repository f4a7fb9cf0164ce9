pub mod amount;
pub mod error;
pub mod expense;
pub mod session;
pub mod split;
pub mod traits;
pub mod validation;

pub use error::Error;
pub use expense::{
    CreatedExpense, Expense, ExpenseDraft, ExpenseParticipant, ExpensePayload, ParticipantInput,
    ParticipantShare, Registration, User, UserId,
};
pub use session::{Session, TokenResponse};
pub use split::SplitType;
pub use traits::{ExpenseService, Feedback, UserDirectory};
pub use validation::{FormErrors, ParticipantErrors, ParticipantField, ValidationErrors};
