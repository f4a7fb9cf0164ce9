use std::io::Write;

use crate::domain::{Expense, amount::format_currency};
use crate::report::SheetRow;

/// Renders one expense with its participants.
pub fn write_expense<W: Write>(out: &mut W, expense: &Expense) -> std::io::Result<()> {
    writeln!(
        out,
        "#{} {} total={} split={}",
        expense.id,
        expense.name,
        format_currency(expense.total_amount),
        expense.split_type
    )?;
    if let Some(created_at) = &expense.created_at {
        writeln!(out, "  created_at={}", created_at)?;
    }
    if let Some(creator) = &expense.created_by_username {
        writeln!(out, "  created_by={}", creator)?;
    }
    for participant in &expense.participants {
        // amount wins when the service filled in both
        let owed = match (participant.amount_owed, participant.percentage_owed) {
            (Some(amount), _) => format_currency(amount),
            (None, Some(pct)) => format!("{}%", pct),
            (None, None) => "-".to_string(),
        };
        writeln!(out, "  {} {}", participant.username, owed)?;
    }
    Ok(())
}

pub fn write_expenses<W: Write>(out: &mut W, expenses: &[Expense]) -> std::io::Result<()> {
    if expenses.is_empty() {
        return writeln!(out, "No expenses found.");
    }
    for expense in expenses {
        write_expense(out, expense)?;
    }
    Ok(())
}

/// Renders exported CSV rows as a plain table.
pub fn write_sheet<W: Write>(out: &mut W, rows: &[SheetRow]) -> std::io::Result<()> {
    writeln!(out, "expense,name,total,split,participant,amount_owed,percentage_owed")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            row.expense_id.map(|id| id.to_string()).unwrap_or_default(),
            row.name,
            row.total_amount.round_dp(2),
            row.split_type,
            row.participant,
            row.amount_owed.map(|a| a.round_dp(2).to_string()).unwrap_or_default(),
            row.percentage_owed.map(|p| p.round_dp(2).to_string()).unwrap_or_default(),
        )?;
    }
    Ok(())
}
