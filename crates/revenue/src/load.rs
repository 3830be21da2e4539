//! CSV row source: reads ledger files and maps configured columns onto the
//! row contracts. Cells stay raw strings; the aggregators own coercion.

use std::io::ErrorKind;
use std::path::Path;

use crate::classify::Classifier;
use crate::config::{NonRecurringColumns, PipelineConfig, RecurringColumns};
use crate::error::{RevenueError, RevenueResult};
use crate::model::{LedgerKind, NonRecurringRow, RecurringRow, RevenueInput};

/// Column positions resolved against a CSV header.
struct HeaderIndex {
    ledger: LedgerKind,
    headers: Vec<String>,
}

impl HeaderIndex {
    fn new(ledger: LedgerKind, reader: &mut csv::Reader<&[u8]>) -> RevenueResult<Self> {
        let headers = reader
            .headers()
            .map_err(|e| csv_error(ledger, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        Ok(Self { ledger, headers })
    }

    fn position(&self, name: &str) -> RevenueResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RevenueError::MissingColumn {
                ledger: self.ledger,
                column: name.into(),
            })
    }
}

fn csv_error(ledger: LedgerKind, err: csv::Error) -> RevenueError {
    RevenueError::Csv {
        ledger,
        message: err.to_string(),
    }
}

fn csv_reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

fn cell(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}

/// Parse recurring-ledger CSV text.
pub fn load_recurring_rows(csv_data: &str, columns: &RecurringColumns) -> RevenueResult<Vec<RecurringRow>> {
    let mut reader = csv_reader(csv_data);
    let index = HeaderIndex::new(LedgerKind::Recurring, &mut reader)?;

    let unit_idx = columns.unit.as_deref().map(|c| index.position(c)).transpose()?;
    let identity_idx = index.position(&columns.identity)?;
    let subscription_idx = index.position(&columns.subscription_id)?;
    let arr_idx = index.position(&columns.arr_amount)?;
    let quarter_idx = index.position(&columns.renewal_quarter)?;
    let intent_idx = index.position(&columns.renewal_intent)?;
    let projected_idx = index.position(&columns.projected_arr)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(LedgerKind::Recurring, e))?;
        rows.push(RecurringRow {
            unit: unit_idx.map(|i| cell(&record, i)),
            identity: cell(&record, identity_idx),
            subscription_id: cell(&record, subscription_idx),
            arr_amount: cell(&record, arr_idx),
            renewal_quarter: cell(&record, quarter_idx),
            renewal_intent: cell(&record, intent_idx),
            projected_arr: cell(&record, projected_idx),
        });
    }

    Ok(rows)
}

/// Parse non-recurring-ledger CSV text.
pub fn load_nonrecurring_rows(
    csv_data: &str,
    columns: &NonRecurringColumns,
) -> RevenueResult<Vec<NonRecurringRow>> {
    let mut reader = csv_reader(csv_data);
    let index = HeaderIndex::new(LedgerKind::NonRecurring, &mut reader)?;

    let identity_idx = index.position(&columns.identity)?;
    let canonical_idx = columns
        .canonical_identity
        .as_deref()
        .map(|c| index.position(c))
        .transpose()?;
    let tag_idx = index.position(&columns.classification_tag)?;
    let [q1, q2, q3, q4] = columns.quarters();
    let quarter_idx = [
        index.position(q1)?,
        index.position(q2)?,
        index.position(q3)?,
        index.position(q4)?,
    ];

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(LedgerKind::NonRecurring, e))?;
        rows.push(NonRecurringRow {
            identity: cell(&record, identity_idx),
            canonical_identity: canonical_idx.map(|i| cell(&record, i)),
            classification_tag: cell(&record, tag_idx),
            quarters: quarter_idx.map(|i| cell(&record, i)),
        });
    }

    Ok(rows)
}

/// Read a ledger file. A missing file is a missing ledger, not an empty one.
fn read_ledger(path: &Path, ledger: LedgerKind) -> RevenueResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => RevenueError::MissingLedger { ledger },
        _ => RevenueError::Io(format!("cannot read {}: {e}", path.display())),
    })
}

/// Load both ledgers named by `config`, resolving paths against `base_dir`.
pub fn load_input(config: &PipelineConfig, base_dir: &Path) -> RevenueResult<RevenueInput> {
    let recurring_cfg = &config.ledgers.recurring;
    let recurring_csv = read_ledger(&base_dir.join(&recurring_cfg.file), LedgerKind::Recurring)?;
    let recurring = load_recurring_rows(&recurring_csv, &recurring_cfg.columns)?;

    let nonrecurring_cfg = &config.ledgers.nonrecurring;
    let nonrecurring_csv =
        read_ledger(&base_dir.join(&nonrecurring_cfg.file), LedgerKind::NonRecurring)?;
    let nonrecurring = load_nonrecurring_rows(&nonrecurring_csv, &nonrecurring_cfg.columns)?;

    log::debug!(
        "loaded {} recurring and {} non-recurring row(s) from {}",
        recurring.len(),
        nonrecurring.len(),
        base_dir.display()
    );

    Ok(RevenueInput {
        recurring: Some(recurring),
        nonrecurring: Some(nonrecurring),
    })
}

/// Classifier for `config`: the configured rule file, or the built-in regions.
pub fn load_classifier(config: &PipelineConfig, base_dir: &Path) -> RevenueResult<Classifier> {
    match config.classifier.rules {
        Some(ref file) => load_rules_file(&base_dir.join(file)),
        None => Classifier::builtin(),
    }
}

pub fn load_rules_file(path: &Path) -> RevenueResult<Classifier> {
    let toml = std::fs::read_to_string(path)
        .map_err(|e| RevenueError::Io(format!("cannot read {}: {e}", path.display())))?;
    Classifier::from_toml(&toml)
}
