pub mod db;
pub mod runs;
pub mod session;
pub mod workbook;

pub use db::{create_db, DbPool};
pub use runs::{recent_runs, record_run, RunRecord};
pub use session::LedgerSession;
pub use workbook::{load_workbook, save_workbook};
