pub mod extract;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod types;

pub use extract::{disambiguate_award, Extractor};
pub use pipeline::{PaystubImport, PaystubPipeline, DEFAULT_PAYSTUB_OFFSET_DAYS};
pub use schema::{FieldKind, FieldSpec, PaystubSchema, STANDARD_FIELDS};
pub use source::{
    paystub_identifier, parse_paystub_identifier, DirectoryDocumentSource, DocumentError, DocumentSource,
    MockDocumentSource,
};
pub use types::{Absence, Aggregate, AggregateOutcome, ExtractedField, ExtractedPaystub, FieldOutcome, FieldValue};
