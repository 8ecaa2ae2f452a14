use std::path::Path;

use tally_core::Workbook;

use crate::db::{create_db, DbPool};
use crate::workbook::{load_workbook, save_workbook};

/// Exclusive handle on the ledger for one run: the store is opened and read
/// once, worked on in memory, and written back only by [`LedgerSession::commit`].
/// Dropping the session without committing persists nothing.
pub struct LedgerSession {
    pool: DbPool,
    workbook: Workbook,
}

impl LedgerSession {
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let pool = create_db(path).await?;
        let workbook = load_workbook(&pool).await?;
        tracing::info!("Opened ledger: {}", path.display());
        Ok(Self { pool, workbook })
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        save_workbook(&self.pool, &self.workbook).await?;
        self.pool.close().await;
        Ok(())
    }
}
