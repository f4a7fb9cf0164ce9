pub const NAME_REQUIRED: &str = "Expense name is required.";
pub const TOTAL_NOT_POSITIVE: &str = "Total amount must be greater than zero.";
pub const PARTICIPANTS_REQUIRED: &str = "At least one participant is required.";
pub const USERNAME_REQUIRED: &str = "Username is required.";
pub const AMOUNT_NOT_POSITIVE: &str = "Amount must be greater than zero.";
pub const PERCENTAGE_OUT_OF_RANGE: &str = "Percentage must be between 0 and 100.";
pub const PARTS_OVERFLOW: &str = "The split parts do not add up: their sum is too large.";

pub fn user_not_found(username: &str) -> String {
    format!("User \"{}\" not found.", username)
}

pub fn user_lookup_failed(username: &str) -> String {
    format!("Error fetching user \"{}\".", username)
}

/// Errors attached to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub name: Option<String>,
    pub total_amount: Option<String>,
    pub participants: Option<String>,
    /// Cross-participant check failures (sum of parts vs. total).
    pub split: Option<String>,
    /// Message from a rejected submission.
    pub api: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.total_amount.is_none()
            && self.participants.is_none()
            && self.split.is_none()
            && self.api.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", &self.name),
            ("total_amount", &self.total_amount),
            ("participants", &self.participants),
            ("split", &self.split),
            ("api", &self.api),
        ]
        .into_iter()
        .filter_map(|(field, msg)| msg.as_deref().map(|m| (field, m)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantField {
    Username,
    Amount,
    Percentage,
}

impl ParticipantField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantField::Username => "username",
            ParticipantField::Amount => "amount",
            ParticipantField::Percentage => "percentage",
        }
    }
}

/// Errors for one participant row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantErrors {
    pub username: Option<String>,
    pub amount: Option<String>,
    pub percentage: Option<String>,
}

impl ParticipantErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.amount.is_none() && self.percentage.is_none()
    }

    pub fn get(&self, field: ParticipantField) -> Option<&str> {
        match field {
            ParticipantField::Username => self.username.as_deref(),
            ParticipantField::Amount => self.amount.as_deref(),
            ParticipantField::Percentage => self.percentage.as_deref(),
        }
    }

    pub fn clear(&mut self, field: ParticipantField) {
        match field {
            ParticipantField::Username => self.username = None,
            ParticipantField::Amount => self.amount = None,
            ParticipantField::Percentage => self.percentage = None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticipantField, &str)> {
        [
            ParticipantField::Username,
            ParticipantField::Amount,
            ParticipantField::Percentage,
        ]
        .into_iter()
        .filter_map(|field| self.get(field).map(|m| (field, m)))
    }
}

/// Complete error set of one validation or resolution pass.
///
/// `participants` always has one entry per participant row, in form order,
/// so a renderer can index it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub form: FormErrors,
    pub participants: Vec<ParticipantErrors>,
}

impl ValidationErrors {
    pub fn for_participants(count: usize) -> Self {
        Self {
            form: FormErrors::default(),
            participants: vec![ParticipantErrors::default(); count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.participants.iter().all(ParticipantErrors::is_empty)
    }

    /// Participant rows carrying at least one error, with their index.
    pub fn invalid_participants(&self) -> impl Iterator<Item = (usize, &ParticipantErrors)> {
        self.participants
            .iter()
            .enumerate()
            .filter(|(_, errors)| !errors.is_empty())
    }

    /// Number of individual field messages, form and participants combined.
    pub fn len(&self) -> usize {
        self.form.iter().count()
            + self
                .participants
                .iter()
                .map(|p| p.iter().count())
                .sum::<usize>()
    }

    /// Drops the error on one field, as when the user edits it.
    pub fn clear_participant_field(&mut self, index: usize, field: ParticipantField) {
        if let Some(errors) = self.participants.get_mut(index) {
            errors.clear(field);
        }
    }

    /// `(field path, message)` pairs such as `participants[1].username`.
    pub fn messages(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .form
            .iter()
            .map(|(field, msg)| (field.to_string(), msg.to_string()))
            .collect();
        for (index, errors) in self.invalid_participants() {
            for (field, msg) in errors.iter() {
                out.push((
                    format!("participants[{}].{}", index, field.as_str()),
                    msg.to_string(),
                ));
            }
        }
        out
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let messages = self.messages();
        for (i, (path, msg)) in messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", path, msg)?;
        }
        Ok(())
    }
}
