//! Moving a whole sheet between CSV and the ledger store. Cells are classified
//! on the way in the way a spreadsheet classifies typed input.

use std::io::{Read, Write};
use thiserror::Error;

use tally_core::{CellRef, CellValue, Sheet};

#[derive(Error, Debug)]
pub enum SheetCsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn read_sheet<R: Read>(data: R) -> Result<Sheet, SheetCsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut sheet = Sheet::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        for (col, field) in record.iter().enumerate() {
            sheet.set(CellRef::new(row as u32, col as u32), CellValue::from_input(field));
        }
    }
    Ok(sheet)
}

/// Dense rows over the used area; formulas are written as their `=` text.
pub fn write_sheet<W: Write>(sheet: &Sheet, out: W) -> Result<(), SheetCsvError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    let (rows, cols) = sheet.extent();
    for row in 0..rows {
        let fields: Vec<String> = (0..cols)
            .map(|col| sheet.get(CellRef::new(row, col)).to_string())
            .collect();
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}
