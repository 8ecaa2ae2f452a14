use chrono::{Duration, NaiveDate};

use tally_core::{Issue, LedgerRecord};

use crate::extract::Extractor;
use crate::schema::PaystubSchema;
use crate::source::{paystub_identifier, parse_paystub_identifier, DocumentError, DocumentSource};
use crate::types::ExtractedPaystub;

/// Paystubs are issued this many days after the pay period they cover begins.
pub const DEFAULT_PAYSTUB_OFFSET_DAYS: i64 = 25;

/// Everything gathered from one pass over a document source.
#[derive(Debug, Default)]
pub struct PaystubImport {
    pub paystubs: Vec<ExtractedPaystub>,
    pub records: Vec<LedgerRecord>,
    pub issues: Vec<Issue>,
}

/// Orchestrates: identify → fetch → extract → ledger records.
pub struct PaystubPipeline<S: DocumentSource> {
    source: S,
    schema: &'static PaystubSchema,
    offset_days: i64,
}

impl<S: DocumentSource> PaystubPipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            schema: PaystubSchema::standard(),
            offset_days: DEFAULT_PAYSTUB_OFFSET_DAYS,
        }
    }

    pub fn with_offset_days(mut self, days: i64) -> Self {
        self.offset_days = days;
        self
    }

    /// Identifier of the paystub for the pay period beginning `begin`.
    pub fn identifier_for_period(&self, begin: NaiveDate) -> String {
        paystub_identifier(begin + Duration::days(self.offset_days))
    }

    /// Extract one document. A document that cannot be fetched comes back
    /// with every field absent rather than as an error.
    pub fn extract(&self, id: &str) -> ExtractedPaystub {
        match self.source.fetch(id) {
            Ok(text) => {
                tracing::info!("Importing paystub from: {id}");
                Extractor::extract_with(self.schema, id, &text)
            }
            Err(e) => Extractor::unreadable_with(self.schema, id, &e.to_string()),
        }
    }

    pub fn extract_for_period(&self, begin: NaiveDate) -> ExtractedPaystub {
        self.extract(&self.identifier_for_period(begin))
    }

    /// Extract every paystub the source lists. Identifiers that are not
    /// date-derived paystub names are ignored. Records are dated by the pay
    /// date encoded in the identifier.
    pub fn import_all(&self) -> Result<PaystubImport, DocumentError> {
        let mut import = PaystubImport::default();
        for id in self.source.list()? {
            let Some(pay_date) = parse_paystub_identifier(&id) else {
                tracing::debug!("Skipping non-paystub document: {id}");
                continue;
            };
            let paystub = self.extract(&id);
            import.records.extend(paystub.ledger_records(pay_date));
            import.issues.extend(paystub.issues.iter().cloned());
            import.paystubs.push(paystub);
        }
        Ok(import)
    }
}
