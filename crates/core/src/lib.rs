pub mod bin;
pub mod catalog;
pub mod money;
pub mod period;
pub mod record;
pub mod report;
pub mod sheet;

pub use bin::{bin, bin_total, bin_total_all};
pub use catalog::{CatalogError, CategoryCatalog};
pub use money::Money;
pub use period::{Cadence, DateError, DateFormat, DateRange};
pub use record::{LedgerRecord, RecordSource};
pub use report::{Issue, IssueKind, RunReport};
pub use sheet::{CellRef, CellValue, LedgerStore, Sheet, StoreError, Workbook};
