use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Error, SplitType, amount::parse_number};

/// One participant line of a CSV export, from either the balance sheet or
/// the latest-expense download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// Absent in the latest-expense download.
    pub expense_id: Option<i64>,
    pub name: String,
    pub total_amount: Decimal,
    pub split_type: SplitType,
    pub created_at: String,
    pub participant: String,
    pub amount_owed: Option<Decimal>,
    pub percentage_owed: Option<Decimal>,
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Expense ID", default)]
    expense_id: Option<i64>,
    #[serde(rename = "Name", alias = "Expense Name")]
    name: String,
    #[serde(rename = "Total Amount")]
    total_amount: String,
    #[serde(rename = "Split Type")]
    split_type: String,
    #[serde(rename = "Created At")]
    created_at: String,
    #[serde(rename = "Participant Username", alias = "Participant")]
    participant: String,
    #[serde(rename = "Amount Owed", default)]
    amount_owed: String,
    #[serde(rename = "Percentage Owed", default)]
    percentage_owed: String,
}

fn optional_decimal(field: &str, value: &str) -> Result<Option<Decimal>, Error> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_number(value)
        .map(Some)
        .ok_or_else(|| Error::Decode(format!("Invalid {}: {}", field, value)))
}

impl TryFrom<CsvRow> for SheetRow {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let total_amount = parse_number(&row.total_amount)
            .ok_or_else(|| Error::Decode(format!("Invalid total amount: {}", row.total_amount)))?;
        let split_type = row.split_type.parse::<SplitType>().map_err(Error::Decode)?;

        Ok(SheetRow {
            expense_id: row.expense_id,
            name: row.name,
            total_amount,
            split_type,
            created_at: row.created_at,
            participant: row.participant,
            amount_owed: optional_decimal("amount owed", &row.amount_owed)?,
            percentage_owed: optional_decimal("percentage owed", &row.percentage_owed)?,
        })
    }
}

pub struct SheetReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SheetReader<R> {
    pub fn new(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Self { reader }
    }

    /// Rows in file order; a malformed row yields an error without ending
    /// the iteration.
    pub fn rows(self) -> impl Iterator<Item = Result<SheetRow, Error>> {
        self.reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => SheetRow::try_from(row),
                Err(e) => Err(Error::Csv(e)),
            })
    }
}

/// Parses a whole export, stopping at the first bad row.
pub fn read_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, Error> {
    SheetReader::new(bytes).rows().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_balance_sheet_export() {
        let csv = "Expense ID,Name,Total Amount,Split Type,Created At,Participant Username,Amount Owed,Percentage Owed\r\n\
                   1,Lunch,100.00,EQUAL,2024-10-20 12:00:00,alice,50.00,\r\n\
                   2,Taxi,30.00,PERCENTAGE,2024-10-21 08:30:00,bob,9.00,30.00\r\n";

        let rows = read_sheet(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].expense_id, Some(1));
        assert_eq!(rows[0].amount_owed, Some(Decimal::new(5000, 2)));
        assert_eq!(rows[0].percentage_owed, None);
        assert_eq!(rows[1].split_type, SplitType::Percentage);
        assert_eq!(rows[1].percentage_owed, Some(Decimal::from(30)));
    }

    #[test]
    fn reads_latest_expense_export() {
        let csv = "Expense Name,Total Amount,Split Type,Created At,Participant,Amount Owed,Percentage Owed\n\
                   Trip,1000.00,EXACT,2024-10-22 09:00:00,carol,400.00,\n";

        let rows = read_sheet(csv.as_bytes()).unwrap();

        assert_eq!(rows[0].expense_id, None);
        assert_eq!(rows[0].name, "Trip");
        assert_eq!(rows[0].participant, "carol");
        assert_eq!(rows[0].total_amount, Decimal::from(1000));
    }

    #[test]
    fn bad_row_does_not_hide_good_ones() {
        let csv = "Expense Name,Total Amount,Split Type,Created At,Participant,Amount Owed,Percentage Owed\n\
                   Trip,lots,EXACT,2024-10-22 09:00:00,carol,400.00,\n\
                   Trip,1000.00,EXACT,2024-10-22 09:00:00,dave,600.00,\n";

        let rows: Vec<_> = SheetReader::new(csv.as_bytes()).rows().collect();

        assert!(rows[0].is_err());
        assert_eq!(rows[1].as_ref().unwrap().participant, "dave");
        assert!(read_sheet(csv.as_bytes()).is_err());
    }
}
