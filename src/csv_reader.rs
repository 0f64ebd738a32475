use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;

/// One row of the transaction table. `is_fraud` is absent in unlabeled
/// (evaluation) files, `card1` may be empty. A blank or unparseable
/// `TransactionAmt` reads as `None` instead of failing the whole file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransactionRecord {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "isFraud", default)]
    pub is_fraud: Option<u8>,
    #[serde(rename = "card1", default)]
    pub card_id: Option<String>,
    #[serde(rename = "TransactionAmt", default, deserialize_with = "csv::invalid_option")]
    pub amount: Option<f64>,
    #[serde(rename = "ProductCD", default)]
    pub product: Option<String>,
}

impl TransactionRecord {
    pub fn new(transaction_id: impl Into<String>, card_id: Option<&str>, amount: f64, product: &str) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            is_fraud: None,
            card_id: card_id.map(str::to_string),
            amount: Some(amount),
            product: Some(product.to_string()),
        }
    }

    pub fn with_label(mut self, is_fraud: bool) -> Self {
        self.is_fraud = Some(u8::from(is_fraud));
        self
    }

    /// Card identifier, treating blank cells as missing.
    pub fn card(&self) -> Option<&str> {
        self.card_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Product category, treating blank cells as missing.
    pub fn category(&self) -> Option<&str> {
        self.product
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn label(&self) -> Option<bool> {
        self.is_fraud.map(|flag| flag != 0)
    }
}

pub fn read_transactions<P: AsRef<Path>>(file_path: P) -> Result<Vec<TransactionRecord>> {
    let file = File::open(file_path.as_ref())?;
    let transactions = read_transactions_from(file)?;
    info!(
        "Loaded {} transactions from {}",
        transactions.len(),
        file_path.as_ref().display()
    );
    Ok(transactions)
}

pub fn read_transactions_from<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let transactions: Vec<TransactionRecord> = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<TransactionRecord>, csv::Error>>()?;

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_labeled_rows() {
        let data = "TransactionID,isFraud,card1,TransactionAmt,ProductCD\n\
                    1,0,13926,68.5,W\n\
                    2,1,,29.0,H\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].card(), Some("13926"));
        assert_eq!(rows[0].label(), Some(false));
        assert_eq!(rows[1].card(), None, "Empty card cell should read as missing");
        assert_eq!(rows[1].label(), Some(true));
        assert_eq!(rows[1].category(), Some("H"));
    }

    #[test]
    fn test_reads_unlabeled_rows() {
        let data = "TransactionID,card1,TransactionAmt,ProductCD\n\
                    3663549,10409,31.95,W\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label(), None, "Missing isFraud column should read as unlabeled");
        assert_eq!(rows[0].amount, Some(31.95));
    }

    #[test]
    fn test_bad_amount_cell_keeps_the_batch() {
        let data = "TransactionID,isFraud,card1,TransactionAmt,ProductCD\n\
                    1,0,13926,68.5,W\n\
                    2,1,2755,,H\n\
                    3,0,4663,n/a,C\n\
                    4,0,4663,10.0,C\n";
        let rows = read_transactions_from(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 4, "One bad amount must not drop the other rows");
        assert_eq!(rows[0].amount, Some(68.5));
        assert_eq!(rows[1].amount, None, "Blank amount should read as missing");
        assert_eq!(rows[1].card(), Some("2755"));
        assert_eq!(rows[2].amount, None, "Unparseable amount should read as missing");
        assert_eq!(rows[3].amount, Some(10.0));
    }
}
