pub mod normalize;
pub mod retirement;
pub mod sheet_csv;

pub use normalize::{normalize, scan_source, Normalized, ScanEnd, SourceLayout, SourceLayouts, SourceScan};
pub use retirement::{
    import_statements, latest_recorded, parse_statement, record_statement, statement_date, statement_files,
    FundColumn, RetirementLayout, RetirementStatement, StatementError, StatementImport,
};
pub use sheet_csv::{read_sheet, write_sheet, SheetCsvError};
