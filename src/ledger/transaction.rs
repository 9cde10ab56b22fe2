use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::recurrence::Recurrence;
use crate::errors::{LedgerError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a stored calendar date. Full timestamps are accepted and truncated
/// to their date component.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(stamp.date_naive());
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(stamp.date());
    }
    Err(LedgerError::InvalidDate(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

/// Transaction exactly as it is persisted.
///
/// Dates and the recurrence value stay as raw strings so that a record which
/// cannot be interpreted still survives a load/save cycle unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to_wallet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_date: Option<String>,
}

impl TransactionRecord {
    /// Recurrence of this record; `None` for concrete transactions and for
    /// values this crate does not recognize.
    pub fn recurrence(&self) -> Option<Recurrence> {
        Recurrence::from_stored(self.recurrence.as_deref())
    }

    pub fn is_template(&self) -> bool {
        self.recurrence().is_some()
    }

    pub fn body(&self) -> TransactionBody {
        TransactionBody {
            kind: self.kind,
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            wallet_id: self.wallet_id.clone(),
            transfer_to_wallet_id: self.transfer_to_wallet_id.clone(),
        }
    }

    /// Interprets the record as either a concrete occurrence or a recurring
    /// template, validating its dates.
    pub fn classify(&self) -> Result<Transaction> {
        match self.recurrence() {
            Some(_) => RecurringTemplate::try_from(self).map(Transaction::Template),
            None => Ok(Transaction::Occurrence(Occurrence {
                id: self.id.clone(),
                date: parse_date(&self.date)?,
                body: self.body(),
            })),
        }
    }
}

/// Fields shared by occurrences and templates.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBody {
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub wallet_id: String,
    pub transfer_to_wallet_id: Option<String>,
}

impl TransactionBody {
    pub fn income(
        wallet_id: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: TransactionKind::Income,
            amount,
            category: category.into(),
            description: description.into(),
            wallet_id: wallet_id.into(),
            transfer_to_wallet_id: None,
        }
    }

    pub fn expense(
        wallet_id: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: TransactionKind::Expense,
            ..Self::income(wallet_id, amount, category, description)
        }
    }

    pub fn transfer(
        from_wallet: impl Into<String>,
        to_wallet: impl Into<String>,
        amount: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            amount,
            category: String::new(),
            description: description.into(),
            wallet_id: from_wallet.into(),
            transfer_to_wallet_id: Some(to_wallet.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(LedgerError::InvalidInput(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        if self.wallet_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("wallet is required".into()));
        }
        match self.kind {
            TransactionKind::Transfer => match self.transfer_to_wallet_id.as_deref() {
                None | Some("") => Err(LedgerError::InvalidInput(
                    "transfer requires a destination wallet".into(),
                )),
                Some(target) if target == self.wallet_id => Err(LedgerError::InvalidInput(
                    "transfer source and destination must differ".into(),
                )),
                Some(_) => Ok(()),
            },
            TransactionKind::Income | TransactionKind::Expense => {
                if self.category.trim().is_empty() {
                    return Err(LedgerError::InvalidInput("category is required".into()));
                }
                if self.transfer_to_wallet_id.is_some() {
                    return Err(LedgerError::InvalidInput(
                        "only transfers may name a destination wallet".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// A concrete, non-generating transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub id: String,
    pub date: NaiveDate,
    pub body: TransactionBody,
}

/// A transaction that generates occurrences every `recurrence` period.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTemplate {
    pub id: String,
    pub date: NaiveDate,
    pub body: TransactionBody,
    pub recurrence: Recurrence,
    pub last_processed: Option<NaiveDate>,
}

impl RecurringTemplate {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        body: TransactionBody,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            body,
            recurrence,
            last_processed: None,
        }
    }

    /// Date the next occurrence is counted from. A watermark older than the
    /// template's own date is ignored.
    pub fn anchor(&self) -> NaiveDate {
        match self.last_processed {
            Some(last) if last >= self.date => last,
            _ => self.date,
        }
    }

    pub fn occurrence(&self, id: String, date: NaiveDate) -> Occurrence {
        Occurrence {
            id,
            date,
            body: self.body.clone(),
        }
    }
}

impl TryFrom<&TransactionRecord> for RecurringTemplate {
    type Error = LedgerError;

    fn try_from(record: &TransactionRecord) -> Result<Self> {
        let recurrence = record.recurrence().ok_or_else(|| {
            LedgerError::InvalidInput(format!("transaction {} does not recur", record.id))
        })?;
        let date = parse_date(&record.date)?;
        let last_processed = record
            .last_processed_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        Ok(Self {
            id: record.id.clone(),
            date,
            body: record.body(),
            recurrence,
            last_processed,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transaction {
    Occurrence(Occurrence),
    Template(RecurringTemplate),
}

impl Transaction {
    pub fn id(&self) -> &str {
        match self {
            Transaction::Occurrence(occurrence) => &occurrence.id,
            Transaction::Template(template) => &template.id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Transaction::Occurrence(occurrence) => occurrence.date,
            Transaction::Template(template) => template.date,
        }
    }

    pub fn body(&self) -> &TransactionBody {
        match self {
            Transaction::Occurrence(occurrence) => &occurrence.body,
            Transaction::Template(template) => &template.body,
        }
    }
}

fn record_from_body(id: String, date: NaiveDate, body: TransactionBody) -> TransactionRecord {
    TransactionRecord {
        id,
        date: format_date(date),
        kind: body.kind,
        amount: body.amount,
        category: body.category,
        description: body.description,
        wallet_id: body.wallet_id,
        transfer_to_wallet_id: body.transfer_to_wallet_id,
        recurrence: None,
        last_processed_date: None,
    }
}

impl From<Occurrence> for TransactionRecord {
    fn from(occurrence: Occurrence) -> Self {
        let mut record = record_from_body(occurrence.id, occurrence.date, occurrence.body);
        record.recurrence = Some(Recurrence::NONE.to_string());
        record
    }
}

impl From<RecurringTemplate> for TransactionRecord {
    fn from(template: RecurringTemplate) -> Self {
        let mut record = record_from_body(template.id, template.date, template.body);
        record.recurrence = Some(template.recurrence.as_str().to_string());
        record.last_processed_date = template.last_processed.map(format_date);
        record
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(transaction: Transaction) -> Self {
        match transaction {
            Transaction::Occurrence(occurrence) => occurrence.into(),
            Transaction::Template(template) => template.into(),
        }
    }
}
