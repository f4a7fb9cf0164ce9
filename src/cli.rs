//! Command-line interface for the expense service.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::api::{ApiClient, login_failure_message};
use crate::calculator::SplitCalculator;
use crate::config::{Config, normalize_url};
use crate::domain::{
    Error, ExpenseDraft, Feedback, ParticipantInput, Registration, Session, SplitType, UserId,
};
use crate::feedback::StdErrFeedback;
use crate::output;
use crate::report::read_sheet;
use crate::submit::{EXPENSE_ADDED, SubmitError, Submitter};

/// Exit status for input rejected before anything was sent.
const EXIT_INVALID: u8 = 2;

/// Shared-expense client: add split expenses and export summaries.
#[derive(Parser, Debug)]
#[command(name = "expense-split")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the expense API (default: http://localhost:8000/api)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Access token from `login`
    #[arg(long, env = "EXPENSE_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the logged-in user
    #[arg(long, env = "EXPENSE_USER_ID", global = true)]
    pub user_id: Option<UserId>,

    /// Name of the logged-in user
    #[arg(long, env = "EXPENSE_USERNAME", global = true)]
    pub username: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account.
    Register {
        username: String,
        email: String,
        mobile_number: String,
        #[arg(long, env = "EXPENSE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and print the session as shell exports.
    Login {
        username: String,
        #[arg(long, env = "EXPENSE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Add an expense.
    Add {
        /// Expense name
        name: String,

        /// Total amount
        total: String,

        /// EQUAL, EXACT or PERCENTAGE
        #[arg(short, long, default_value = "EQUAL")]
        split: SplitType,

        /// Participant as `username` or `username=value`; the value is the
        /// amount (EXACT) or percentage (PERCENTAGE)
        #[arg(short, long = "participant", required = true)]
        participants: Vec<String>,

        /// Also require parts to add up to the total (or to 100%)
        #[arg(long)]
        strict_totals: bool,
    },

    /// List expenses of the logged-in user.
    Expenses,

    /// Show the latest expense of the logged-in user.
    Latest,

    /// Fetch the balance sheet CSV for the given expenses (all when omitted).
    BalanceSheet {
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Write the raw CSV here instead of printing a table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch the latest expense of the logged-in user as CSV.
    DownloadLatest {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Turns `--participant` values into form rows for the given split type.
pub fn participant_inputs(split: SplitType, raw: &[String]) -> Vec<ParticipantInput> {
    raw.iter()
        .map(|entry| {
            let (username, value) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
            let input = ParticipantInput::new(username);
            match split {
                SplitType::Equal => input,
                SplitType::Exact => input.with_amount(value),
                SplitType::Percentage => input.with_percentage(value),
            }
        })
        .collect()
}

impl Cli {
    fn config(&self) -> Result<Config, Error> {
        let mut config = Config::from_env()?;
        if let Some(url) = &self.api_url {
            config.api_url = normalize_url(url)?;
        }
        Ok(config)
    }

    fn session(&self) -> Result<Session, Error> {
        match (&self.token, self.user_id) {
            (Some(token), Some(user_id)) => Ok(Session::new(
                token.clone(),
                user_id,
                self.username.clone().unwrap_or_default(),
            )),
            _ => Err(Error::Session(
                "not logged in; run `expense-split login` and export EXPENSE_ACCESS_TOKEN and EXPENSE_USER_ID"
                    .to_string(),
            )),
        }
    }
}

/// Run the CLI.
pub async fn run(cli: Cli) -> Result<ExitCode, Error> {
    let config = cli.config()?;
    let feedback = StdErrFeedback::default();

    match &cli.command {
        Commands::Register {
            username,
            email,
            mobile_number,
            password,
        } => {
            let client = ApiClient::new(&config)?;
            let registration = Registration {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
                mobile_number: mobile_number.clone(),
            };
            match client.register(&registration).await {
                Ok(_) => {
                    feedback.success("Registration successful!");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report_field_errors(&feedback, &e, "Registration failed.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Login { username, password } => {
            let client = ApiClient::new(&config)?;
            match client.login(username, password).await {
                Ok(session) => {
                    println!("export EXPENSE_ACCESS_TOKEN={}", session.access_token());
                    if let Some(refresh) = session.refresh_token() {
                        println!("export EXPENSE_REFRESH_TOKEN={}", refresh);
                    }
                    println!("export EXPENSE_USER_ID={}", session.user_id);
                    println!("export EXPENSE_USERNAME={}", session.username);
                    feedback.success("Logged in successfully!");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    feedback.failure(&login_failure_message(&e));
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Add {
            name,
            total,
            split,
            participants,
            strict_totals,
        } => {
            let calculator =
                SplitCalculator::new().with_strict_totals(*strict_totals || config.strict_totals);
            let draft = ExpenseDraft::new()
                .with_name(name.clone())
                .with_total_amount(total.clone())
                .with_split_type(*split)
                .with_participants(participant_inputs(*split, participants));

            // reject bad input before asking for a session or touching the network
            if let Err(errors) = calculator.validate(&draft) {
                feedback.invalid(&errors);
                return Ok(ExitCode::from(EXIT_INVALID));
            }

            let session = cli.session()?;
            let client = ApiClient::new(&config)?;
            let submitter = Submitter::new(calculator, client.clone(), client);
            match submitter.submit(&session, &draft).await {
                Ok(created) => {
                    feedback.success(EXPENSE_ADDED);
                    println!("{}", created.expense_id);
                    Ok(ExitCode::SUCCESS)
                }
                // a rejection has no field errors; its message is the whole story
                Err(SubmitError::Rejected(message)) => {
                    feedback.failure(&message);
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => {
                    feedback.invalid(&e.errors());
                    feedback.failure(&e.to_string());
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Expenses => {
            let session = cli.session()?;
            let client = ApiClient::new(&config)?;
            let expenses = client.user_expenses(&session, session.user_id).await?;
            output::write_expenses(&mut std::io::stdout().lock(), &expenses)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Latest => {
            let session = cli.session()?;
            let client = ApiClient::new(&config)?;
            match client.latest_expense(&session, session.user_id).await? {
                Some(expense) => output::write_expense(&mut std::io::stdout().lock(), &expense)?,
                None => println!("No expenses found."),
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::BalanceSheet { ids, output: path } => {
            let session = cli.session()?;
            let client = ApiClient::new(&config)?;
            let csv = client.balance_sheet(&session, ids).await?;
            emit_csv(&csv, path.as_ref()).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::DownloadLatest { output: path } => {
            let session = cli.session()?;
            let client = ApiClient::new(&config)?;
            match client.download_latest(&session, session.user_id).await? {
                Some(csv) => {
                    emit_csv(&csv, path.as_ref()).await?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    feedback.failure("No expense found.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn emit_csv(csv: &[u8], path: Option<&PathBuf>) -> Result<(), Error> {
    match path {
        Some(path) => {
            tokio::fs::write(path, csv).await?;
            tracing::info!(path = %path.display(), bytes = csv.len(), "csv saved");
        }
        None => {
            let rows = read_sheet(csv)?;
            output::write_sheet(&mut std::io::stdout().lock(), &rows)?;
        }
    }
    Ok(())
}

/// Prints a structured `{field: [messages]}` error body, or a single fallback line.
fn report_field_errors(feedback: &StdErrFeedback, error: &Error, fallback: &str) {
    let fields = error.body_json().and_then(|body| body.as_object().cloned());
    let Some(fields) = fields else {
        feedback.failure(&format!("{} {}", fallback, error));
        return;
    };
    for (field, messages) in fields {
        let text = match &messages {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect::<Vec<_>>()
                .join(" "),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        feedback.failure(&format!("{}: {}", field, text));
    }
}
