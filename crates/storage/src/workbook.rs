//! Workbook persistence: one row per non-empty cell, plus the sheet names so
//! empty sheets survive a round trip.

use rust_decimal::Decimal;
use std::str::FromStr;

use tally_core::{CellRef, CellValue, Workbook};

use crate::db::DbPool;

fn encode(value: &CellValue) -> Option<(&'static str, String)> {
    match value {
        CellValue::Empty => None,
        CellValue::Number(n) => Some(("number", n.to_string())),
        CellValue::Text(s) => Some(("text", s.clone())),
        CellValue::Formula(f) => Some(("formula", f.clone())),
    }
}

fn decode(kind: &str, value: String) -> Result<CellValue, sqlx::Error> {
    match kind {
        "number" => Decimal::from_str(&value)
            .map(CellValue::Number)
            .map_err(|e| sqlx::Error::Decode(Box::new(e))),
        "text" => Ok(CellValue::Text(value)),
        "formula" => Ok(CellValue::Formula(value)),
        other => Err(sqlx::Error::Decode(format!("unknown cell kind '{other}'").into())),
    }
}

pub async fn load_workbook(pool: &DbPool) -> Result<Workbook, sqlx::Error> {
    let mut workbook = Workbook::new();

    let names = sqlx::query_as::<_, (String,)>("SELECT name FROM sheets ORDER BY name")
        .fetch_all(pool)
        .await?;
    for (name,) in names {
        workbook.add_sheet(&name);
    }

    let rows = sqlx::query_as::<_, (String, i64, i64, String, String)>(
        "SELECT sheet, row, col, kind, value FROM cells ORDER BY sheet, row, col",
    )
    .fetch_all(pool)
    .await?;

    for (sheet, row, col, kind, value) in rows {
        let at = CellRef::new(to_index(row)?, to_index(col)?);
        let value = decode(&kind, value)?;
        workbook.add_sheet(&sheet).set(at, value);
    }

    Ok(workbook)
}

fn to_index(n: i64) -> Result<u32, sqlx::Error> {
    u32::try_from(n).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Replace everything stored with `workbook`, atomically.
pub async fn save_workbook(pool: &DbPool, workbook: &Workbook) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM cells").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sheets").execute(&mut *tx).await?;

    let mut written = 0usize;
    for (name, sheet) in workbook.sheets() {
        sqlx::query("INSERT INTO sheets (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        for (at, value) in sheet.cells() {
            let Some((kind, text)) = encode(value) else { continue };
            sqlx::query("INSERT INTO cells (sheet, row, col, kind, value) VALUES (?, ?, ?, ?, ?)")
                .bind(name)
                .bind(i64::from(at.row))
                .bind(i64::from(at.col))
                .bind(kind)
                .bind(text)
                .execute(&mut *tx)
                .await?;
            written += 1;
        }
    }

    tx.commit().await?;
    tracing::debug!("Saved {written} cells");
    Ok(())
}
