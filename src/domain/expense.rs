use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::SplitType;

/// Primary key of a user on the expense service.
pub type UserId = i64;

/// One participant row of the expense form, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantInput {
    pub username: String,
    pub amount: String,     // only read for EXACT splits
    pub percentage: String, // only read for PERCENTAGE splits
}

impl ParticipantInput {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = amount.into();
        self
    }

    pub fn with_percentage(mut self, percentage: impl Into<String>) -> Self {
        self.percentage = percentage.into();
        self
    }
}

/// Unsubmitted expense form state.
///
/// Every edit returns a new draft; a draft is never mutated behind the back
/// of someone holding it, and a failed submission leaves it intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub name: String,
    pub total_amount: String,
    pub split_type: SplitType,
    pub participants: Vec<ParticipantInput>,
}

impl Default for ExpenseDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseDraft {
    /// A blank form with a single empty participant row.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            total_amount: String::new(),
            split_type: SplitType::Equal,
            participants: vec![ParticipantInput::default()],
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_total_amount(&self, total_amount: impl Into<String>) -> Self {
        Self {
            total_amount: total_amount.into(),
            ..self.clone()
        }
    }

    /// Switching strategy discards every entered amount and percentage.
    pub fn with_split_type(&self, split_type: SplitType) -> Self {
        let participants = self
            .participants
            .iter()
            .map(|p| ParticipantInput::new(p.username.clone()))
            .collect();
        Self {
            split_type,
            participants,
            ..self.clone()
        }
    }

    pub fn with_participants(&self, participants: Vec<ParticipantInput>) -> Self {
        Self {
            participants,
            ..self.clone()
        }
    }

    pub fn with_participant_added(&self) -> Self {
        let mut participants = self.participants.clone();
        participants.push(ParticipantInput::default());
        self.with_participants(participants)
    }

    /// Out-of-range indices leave the draft unchanged.
    pub fn with_participant_removed(&self, index: usize) -> Self {
        let mut participants = self.participants.clone();
        if index < participants.len() {
            participants.remove(index);
        }
        self.with_participants(participants)
    }

    pub fn with_participant(&self, index: usize, input: ParticipantInput) -> Self {
        let mut participants = self.participants.clone();
        if let Some(slot) = participants.get_mut(index) {
            *slot = input;
        }
        self.with_participants(participants)
    }
}

/// Owed obligation of one resolved participant, shaped by split type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParticipantShare {
    Equal {
        user_id: UserId,
    },
    Exact {
        user_id: UserId,
        #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
        amount_owed: Decimal,
    },
    Percentage {
        user_id: UserId,
        #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
        percentage_owed: Decimal,
    },
}

/// Body of `POST /expenses/add/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpensePayload {
    pub name: String,
    pub created_by: UserId,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_amount: Decimal,
    pub split_type: SplitType,
    pub participants: Vec<ParticipantShare>,
}

/// Response of a successful `POST /expenses/add/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedExpense {
    #[serde(default)]
    pub message: String,
    pub expense_id: i64,
}

/// An expense as stored by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub created_by_username: Option<String>,
    pub total_amount: Decimal,
    pub split_type: SplitType,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub participants: Vec<ExpenseParticipant>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpenseParticipant {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub amount_owed: Option<Decimal>,
    #[serde(default)]
    pub percentage_owed: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
}

/// Body of `POST /users/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub mobile_number: String,
}
