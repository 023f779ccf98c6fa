use std::path::PathBuf;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::model::{CellUpdate, CellValue, Grid};
use crate::remote::{SheetSession, apply_updates};

/// Session backed by a single worksheet inside an `.xlsx` workbook file.
///
/// A missing file or missing worksheet reads as an empty grid, so a fresh
/// target path works without any setup step. Each batched write rewrites the
/// whole workbook in one save, which keeps the write all-or-nothing at the
/// file level.
#[derive(Debug)]
pub struct XlsxSession {
    path: PathBuf,
    sheet_name: String,
}

impl XlsxSession {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
        }
    }

    fn write_grid(&self, grid: &Grid) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (row_idx, row) in grid.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                match cell {
                    CellValue::Text(value) => {
                        worksheet.write_string(row_idx as u32, col_idx as u16, value)?;
                    }
                    CellValue::Int(value) => {
                        worksheet.write_number(row_idx as u32, col_idx as u16, *value as f64)?;
                    }
                    CellValue::Number(value) => {
                        worksheet.write_number(row_idx as u32, col_idx as u16, *value)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }

        workbook.save(&self.path)?;
        Ok(())
    }
}

impl SheetSession for XlsxSession {
    fn read_all_values(&mut self) -> Result<Grid> {
        if !self.path.exists() {
            return Ok(Grid::new());
        }

        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let range = match workbook.worksheet_range(&self.sheet_name) {
            Some(range) => range?,
            None => return Ok(Grid::new()),
        };

        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();
        Ok(grid)
    }

    fn clear(&mut self) -> Result<()> {
        self.write_grid(&Grid::new())
    }

    fn batched_write(&mut self, updates: &[CellUpdate]) -> Result<()> {
        let mut grid = self.read_all_values()?;
        apply_updates(&mut grid, updates);
        self.write_grid(&grid)
    }
}

/// Integral floats come back as `Int` so that key columns written as numbers
/// cast cleanly on the next run.
fn cell_from_data(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) if value.is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Int(value) => CellValue::Int(*value),
        DataType::Float(value) if value.fract() == 0.0 => CellValue::Int(*value as i64),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}
