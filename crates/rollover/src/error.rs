use tally_core::{CellRef, DateError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RolloverError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No period end date at {sheet}!{cell}")]
    MissingPeriodDate { sheet: String, cell: CellRef },
    #[error("Period end date at {sheet}!{cell} is unreadable: {source}")]
    MalformedPeriodDate {
        sheet: String,
        cell: CellRef,
        #[source]
        source: DateError,
    },
    #[error("{due} periods are due, more than the {cap} allowed in one run")]
    CatchUpLimit { due: u64, cap: u64 },
}
