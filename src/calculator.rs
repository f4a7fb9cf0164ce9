use futures::future::join_all;
use rust_decimal::Decimal;

use crate::domain::{
    ExpenseDraft, ExpensePayload, ParticipantShare, Session, SplitType, UserDirectory, UserId,
    ValidationErrors,
    amount::{ONE_HUNDRED, parse_number, quantize},
    validation,
};

/// What a validated participant owes, before user resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owed {
    /// Share computed by the service (EQUAL).
    Even,
    Amount(Decimal),
    Percentage(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedParticipant {
    pub username: String,
    pub owed: Owed,
}

/// A draft that passed validation, with every number parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSplit {
    pub name: String,
    pub total_amount: Decimal,
    pub split_type: SplitType,
    pub participants: Vec<ValidatedParticipant>,
}

impl ValidatedSplit {
    /// Shapes the request body. `user_ids` must be in participant order.
    pub fn payload(&self, created_by: UserId, user_ids: &[UserId]) -> ExpensePayload {
        let participants = self
            .participants
            .iter()
            .zip(user_ids)
            .map(|(p, &user_id)| match p.owed {
                Owed::Even => ParticipantShare::Equal { user_id },
                Owed::Amount(amount_owed) => ParticipantShare::Exact {
                    user_id,
                    amount_owed,
                },
                Owed::Percentage(percentage_owed) => ParticipantShare::Percentage {
                    user_id,
                    percentage_owed,
                },
            })
            .collect();

        ExpensePayload {
            name: self.name.clone(),
            created_by,
            total_amount: self.total_amount,
            split_type: self.split_type,
            participants,
        }
    }

    /// Per-participant amounts as the service will store them: cents,
    /// half-up, and for EQUAL splits the last participant absorbs the
    /// rounding remainder.
    pub fn owed_amounts(&self) -> Vec<Decimal> {
        let total = quantize(self.total_amount);
        let count = self.participants.len();
        if count == 0 {
            return Vec::new();
        }

        match self.split_type {
            SplitType::Equal => {
                let share = quantize(total / Decimal::from(count as u64));
                let mut shares = vec![share; count];
                let discrepancy = total - share * Decimal::from(count as u64);
                if let Some(last) = shares.last_mut() {
                    *last += discrepancy;
                }
                shares
            }
            SplitType::Exact | SplitType::Percentage => self
                .participants
                .iter()
                .map(|p| match p.owed {
                    Owed::Amount(amount) => amount,
                    Owed::Percentage(pct) => quantize(pct / ONE_HUNDRED * total),
                    Owed::Even => quantize(total / Decimal::from(count as u64)),
                })
                .collect(),
        }
    }
}

/// Resolution failed for at least one participant.
///
/// `resolved` keeps the ids that did resolve, in participant order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub errors: ValidationErrors,
    pub resolved: Vec<Option<UserId>>,
}

/// Validates expense drafts and resolves their participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitCalculator {
    strict_totals: bool,
}

impl SplitCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require EXACT amounts to sum to the total and PERCENTAGE shares
    /// to sum to 100. Off by default.
    pub fn with_strict_totals(mut self, strict_totals: bool) -> Self {
        self.strict_totals = strict_totals;
        self
    }

    /// Checks every field of the draft and reports all problems at once.
    pub fn validate(&self, draft: &ExpenseDraft) -> Result<ValidatedSplit, ValidationErrors> {
        let mut errors = ValidationErrors::for_participants(draft.participants.len());

        let name = draft.name.trim();
        if name.is_empty() {
            errors.form.name = Some(validation::NAME_REQUIRED.to_string());
        }

        let total_amount = parse_number(&draft.total_amount).filter(|t| *t > Decimal::ZERO);
        if total_amount.is_none() {
            errors.form.total_amount = Some(validation::TOTAL_NOT_POSITIVE.to_string());
        }

        if draft.participants.is_empty() {
            errors.form.participants = Some(validation::PARTICIPANTS_REQUIRED.to_string());
        }

        let mut participants = Vec::with_capacity(draft.participants.len());
        for (input, row_errors) in draft.participants.iter().zip(errors.participants.iter_mut()) {
            let username = input.username.trim();
            if username.is_empty() {
                row_errors.username = Some(validation::USERNAME_REQUIRED.to_string());
            }

            let owed = match draft.split_type {
                SplitType::Equal => Some(Owed::Even),
                SplitType::Exact => {
                    let amount = parse_number(&input.amount).filter(|a| *a > Decimal::ZERO);
                    if amount.is_none() {
                        row_errors.amount = Some(validation::AMOUNT_NOT_POSITIVE.to_string());
                    }
                    amount.map(Owed::Amount)
                }
                SplitType::Percentage => {
                    let pct = parse_number(&input.percentage)
                        .filter(|p| *p >= Decimal::ZERO && *p <= ONE_HUNDRED);
                    if pct.is_none() {
                        row_errors.percentage =
                            Some(validation::PERCENTAGE_OUT_OF_RANGE.to_string());
                    }
                    pct.map(Owed::Percentage)
                }
            };

            if let Some(owed) = owed {
                participants.push(ValidatedParticipant {
                    username: username.to_string(),
                    owed,
                });
            }
        }

        if self.strict_totals && errors.is_empty() {
            if let Some(total) = total_amount {
                errors.form.split = check_totals(draft.split_type, total, &participants);
            }
        }

        match total_amount {
            Some(total_amount) if errors.is_empty() => Ok(ValidatedSplit {
                name: name.to_string(),
                total_amount,
                split_type: draft.split_type,
                participants,
            }),
            _ => {
                tracing::debug!(problems = errors.len(), "expense draft rejected");
                Err(errors)
            }
        }
    }

    /// Looks up every participant concurrently and waits for all of them.
    ///
    /// One failed lookup never cancels the others; the failures are folded
    /// into a single error set keyed by participant index.
    pub async fn resolve<D>(
        &self,
        split: &ValidatedSplit,
        directory: &D,
        session: &Session,
    ) -> Result<Vec<UserId>, LookupFailure>
    where
        D: UserDirectory + ?Sized,
    {
        let lookups = split.participants.iter().map(|p| async move {
            directory.find_user_id(session, &p.username).await
        });
        let outcomes = join_all(lookups).await;

        let mut errors = ValidationErrors::for_participants(split.participants.len());
        let mut resolved = Vec::with_capacity(outcomes.len());

        for (index, (participant, outcome)) in split.participants.iter().zip(outcomes).enumerate() {
            let username = participant.username.as_str();
            match outcome {
                Ok(Some(id)) => {
                    tracing::debug!(index, username, user_id = id, "participant resolved");
                    resolved.push(Some(id));
                }
                Ok(None) => {
                    tracing::warn!(index, username, "participant not found");
                    errors.participants[index].username = Some(validation::user_not_found(username));
                    resolved.push(None);
                }
                Err(e) => {
                    tracing::warn!(index, username, error = %e, "participant lookup failed");
                    errors.participants[index].username =
                        Some(validation::user_lookup_failed(username));
                    resolved.push(None);
                }
            }
        }

        if errors.is_empty() {
            Ok(resolved.into_iter().flatten().collect())
        } else {
            Err(LookupFailure { errors, resolved })
        }
    }
}

/// Sum of the entered parts; `None` when the addition overflows.
fn checked_sum<F>(participants: &[ValidatedParticipant], part: F) -> Option<Decimal>
where
    F: Fn(Owed) -> Option<Decimal>,
{
    participants
        .iter()
        .filter_map(|p| part(p.owed))
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

fn check_totals(
    split_type: SplitType,
    total: Decimal,
    participants: &[ValidatedParticipant],
) -> Option<String> {
    match split_type {
        SplitType::Equal => None,
        SplitType::Exact => {
            let sum = checked_sum(participants, |owed| match owed {
                Owed::Amount(a) => Some(a),
                _ => None,
            });
            match sum {
                None => Some(validation::PARTS_OVERFLOW.to_string()),
                Some(sum) => (sum != total).then(|| {
                    format!(
                        "Sum of exact amounts {} does not equal total amount {}.",
                        sum, total
                    )
                }),
            }
        }
        SplitType::Percentage => {
            let sum = checked_sum(participants, |owed| match owed {
                Owed::Percentage(pct) => Some(pct),
                _ => None,
            });
            match sum {
                None => Some(validation::PARTS_OVERFLOW.to_string()),
                Some(sum) => (sum != ONE_HUNDRED)
                    .then(|| format!("Sum of percentages {} does not equal 100%.", sum)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::domain::{Error, ParticipantInput};

    struct FakeDirectory {
        users: HashMap<&'static str, UserId>,
        broken: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn new(users: &[(&'static str, UserId)]) -> Self {
            Self {
                users: users.iter().copied().collect(),
                broken: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn broken_for(mut self, username: &'static str) -> Self {
            self.broken.push(username);
            self
        }
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn find_user_id(
            &self,
            _session: &Session,
            username: &str,
        ) -> Result<Option<UserId>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.broken.iter().any(|b| *b == username) {
                return Err(Error::Api {
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(self.users.get(username).copied())
        }
    }

    fn session() -> Session {
        Session::new("token", 99, "owner")
    }

    fn draft(split_type: SplitType, rows: Vec<ParticipantInput>) -> ExpenseDraft {
        ExpenseDraft::new()
            .with_name("Lunch")
            .with_total_amount("100")
            .with_split_type(split_type)
            .with_participants(rows)
    }

    #[test]
    fn equal_split_emits_user_id_only() {
        let split = SplitCalculator::new()
            .validate(&draft(
                SplitType::Equal,
                vec![
                    ParticipantInput::new("alice").with_amount("5"),
                    ParticipantInput::new("bob"),
                    ParticipantInput::new("carol"),
                ],
            ))
            .unwrap();

        let payload = serde_json::to_value(split.payload(1, &[10, 11, 12])).unwrap();
        assert_eq!(
            payload["participants"],
            json!([{ "user_id": 10 }, { "user_id": 11 }, { "user_id": 12 }])
        );
    }

    #[test]
    fn exact_amount_must_be_positive() {
        let errors = SplitCalculator::new()
            .validate(&draft(
                SplitType::Exact,
                vec![
                    ParticipantInput::new("alice").with_amount("0"),
                    ParticipantInput::new("bob").with_amount(""),
                    ParticipantInput::new("carol").with_amount("10.5"),
                ],
            ))
            .unwrap_err();

        assert_eq!(
            errors.participants[0].amount.as_deref(),
            Some("Amount must be greater than zero.")
        );
        assert_eq!(
            errors.participants[1].amount.as_deref(),
            Some("Amount must be greater than zero.")
        );
        assert!(errors.participants[2].is_empty());
    }

    #[test]
    fn exact_amount_is_forwarded_as_number() {
        let split = SplitCalculator::new()
            .validate(&draft(
                SplitType::Exact,
                vec![ParticipantInput::new("alice").with_amount("10.5")],
            ))
            .unwrap();

        let payload = serde_json::to_value(split.payload(1, &[10])).unwrap();
        assert_eq!(payload["participants"][0]["amount_owed"].as_f64(), Some(10.5));
        assert!(payload["participants"][0].get("percentage_owed").is_none());
    }

    #[test]
    fn percentage_bounds_are_inclusive() {
        let errors = SplitCalculator::new()
            .validate(&draft(
                SplitType::Percentage,
                vec![
                    ParticipantInput::new("a").with_percentage("-1"),
                    ParticipantInput::new("b").with_percentage("101"),
                    ParticipantInput::new("c").with_percentage("0"),
                    ParticipantInput::new("d").with_percentage("100"),
                    ParticipantInput::new("e").with_percentage("abc"),
                    ParticipantInput::new("f").with_percentage(""),
                ],
            ))
            .unwrap_err();

        let invalid: Vec<usize> = errors.invalid_participants().map(|(i, _)| i).collect();
        assert_eq!(invalid, vec![0, 1, 4, 5]);
        assert_eq!(
            errors.participants[0].percentage.as_deref(),
            Some("Percentage must be between 0 and 100.")
        );
    }

    #[test]
    fn percentage_payload_carries_percentage_only() {
        let split = SplitCalculator::new()
            .validate(&draft(
                SplitType::Percentage,
                vec![
                    ParticipantInput::new("a").with_percentage("0"),
                    ParticipantInput::new("b").with_percentage("100"),
                ],
            ))
            .unwrap();

        let payload = serde_json::to_value(split.payload(1, &[1, 2])).unwrap();
        assert_eq!(payload["participants"][1]["percentage_owed"].as_f64(), Some(100.0));
        assert!(payload["participants"][1].get("amount_owed").is_none());
    }

    #[test]
    fn every_participant_is_checked_in_one_pass() {
        let errors = SplitCalculator::new()
            .validate(
                &ExpenseDraft::new()
                    .with_total_amount("-5")
                    .with_participants(vec![ParticipantInput::new(""), ParticipantInput::new("  ")]),
            )
            .unwrap_err();

        assert_eq!(errors.form.name.as_deref(), Some("Expense name is required."));
        assert_eq!(
            errors.form.total_amount.as_deref(),
            Some("Total amount must be greater than zero.")
        );
        assert_eq!(errors.participants.len(), 2);
        assert_eq!(errors.participants[0].username.as_deref(), Some("Username is required."));
        assert_eq!(errors.participants[1].username.as_deref(), Some("Username is required."));
    }

    #[test]
    fn empty_participant_list_is_a_form_error() {
        let errors = SplitCalculator::new()
            .validate(&draft(SplitType::Equal, vec![]))
            .unwrap_err();
        assert_eq!(
            errors.form.participants.as_deref(),
            Some("At least one participant is required.")
        );
    }

    #[test]
    fn validation_is_repeatable() {
        let calculator = SplitCalculator::new();
        let input = draft(
            SplitType::Exact,
            vec![ParticipantInput::new(""), ParticipantInput::new("bob").with_amount("x")],
        );
        assert_eq!(calculator.validate(&input), calculator.validate(&input));
    }

    #[test]
    fn sums_are_not_checked_by_default() {
        let calculator = SplitCalculator::new();
        let exact = draft(
            SplitType::Exact,
            vec![
                ParticipantInput::new("a").with_amount("10"),
                ParticipantInput::new("b").with_amount("10"),
            ],
        );
        assert!(calculator.validate(&exact).is_ok());

        let strict = calculator.with_strict_totals(true);
        let errors = strict.validate(&exact).unwrap_err();
        assert_eq!(
            errors.form.split.as_deref(),
            Some("Sum of exact amounts 20 does not equal total amount 100.")
        );

        let pct = draft(
            SplitType::Percentage,
            vec![
                ParticipantInput::new("a").with_percentage("60"),
                ParticipantInput::new("b").with_percentage("40"),
            ],
        );
        assert!(strict.validate(&pct).is_ok());
        let pct = pct.with_participant(1, ParticipantInput::new("b").with_percentage("30"));
        assert!(strict.validate(&pct).unwrap_err().form.split.is_some());
    }

    #[test]
    fn oversized_parts_are_reported_not_panicked_on() {
        let huge = Decimal::MAX.to_string();
        let input = draft(
            SplitType::Exact,
            vec![
                ParticipantInput::new("a").with_amount(huge.clone()),
                ParticipantInput::new("b").with_amount(huge),
            ],
        );

        let calculator = SplitCalculator::new().with_strict_totals(true);
        let errors = calculator.validate(&input).unwrap_err();

        assert_eq!(errors.form.split.as_deref(), Some(validation::PARTS_OVERFLOW));
        assert!(SplitCalculator::new().validate(&input).is_ok());
    }

    #[test]
    fn owed_amounts_follow_service_rounding() {
        let calculator = SplitCalculator::new();
        let equal = calculator
            .validate(&draft(
                SplitType::Equal,
                vec![
                    ParticipantInput::new("a"),
                    ParticipantInput::new("b"),
                    ParticipantInput::new("c"),
                ],
            ))
            .unwrap();
        let shares: Vec<String> = equal.owed_amounts().iter().map(|d| d.to_string()).collect();
        assert_eq!(shares, vec!["33.33", "33.33", "33.34"]);

        let pct = calculator
            .validate(
                &draft(
                    SplitType::Percentage,
                    vec![
                        ParticipantInput::new("a").with_percentage("33.335"),
                        ParticipantInput::new("b").with_percentage("66.665"),
                    ],
                )
                .with_total_amount("10"),
            )
            .unwrap();
        let shares: Vec<String> = pct.owed_amounts().iter().map(|d| d.to_string()).collect();
        assert_eq!(shares, vec!["3.33", "6.67"]);
    }

    #[tokio::test]
    async fn lookup_failure_does_not_stop_the_others() {
        let directory = FakeDirectory::new(&[("alice", 1), ("bob", 2), ("carol", 3)]).broken_for("bob");
        let calculator = SplitCalculator::new();
        let split = calculator
            .validate(&draft(
                SplitType::Equal,
                vec![
                    ParticipantInput::new("alice"),
                    ParticipantInput::new("bob"),
                    ParticipantInput::new("carol"),
                ],
            ))
            .unwrap();

        let failure = calculator.resolve(&split, &directory, &session()).await.unwrap_err();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
        assert_eq!(failure.errors.len(), 1);
        let invalid: Vec<usize> = failure.errors.invalid_participants().map(|(i, _)| i).collect();
        assert_eq!(invalid, vec![1]);
        assert_eq!(
            failure.errors.participants[1].username.as_deref(),
            Some("Error fetching user \"bob\".")
        );
        assert_eq!(failure.resolved, vec![Some(1), None, Some(3)]);
    }

    #[tokio::test]
    async fn unknown_user_is_reported_by_name() {
        let directory = FakeDirectory::new(&[("alice", 1)]);
        let calculator = SplitCalculator::new();
        let split = calculator
            .validate(&draft(
                SplitType::Equal,
                vec![ParticipantInput::new("alice"), ParticipantInput::new(" zed ")],
            ))
            .unwrap();

        let failure = calculator.resolve(&split, &directory, &session()).await.unwrap_err();
        assert_eq!(
            failure.errors.participants[1].username.as_deref(),
            Some("User \"zed\" not found.")
        );
    }

    #[tokio::test]
    async fn lunch_round_trip() {
        let directory = FakeDirectory::new(&[("alice", 1), ("bob", 2)]);
        let calculator = SplitCalculator::new();
        let split = calculator
            .validate(&draft(
                SplitType::Equal,
                vec![ParticipantInput::new("alice"), ParticipantInput::new("bob")],
            ))
            .unwrap();

        let ids = calculator.resolve(&split, &directory, &session()).await.unwrap();
        let payload = serde_json::to_value(split.payload(99, &ids)).unwrap();

        assert_eq!(payload["name"], "Lunch");
        assert_eq!(payload["created_by"], 99);
        assert!(payload["total_amount"].is_number());
        assert_eq!(payload["total_amount"].as_f64(), Some(100.0));
        assert_eq!(payload["split_type"], "EQUAL");
        assert_eq!(
            payload["participants"],
            json!([{ "user_id": 1 }, { "user_id": 2 }])
        );
    }
}
