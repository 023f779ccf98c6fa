pub mod xlsx;

use crate::error::Result;
use crate::model::{CellUpdate, Grid};

pub use xlsx::XlsxSession;

/// Low-level access to the remote document holding the worksheet grid.
///
/// All three operations are blocking and all-or-nothing. The core performs no
/// retry; a session failure propagates out of the current operation. Batching
/// happens above this trait: one committed batch maps to exactly one
/// [`batched_write`](SheetSession::batched_write) call.
pub trait SheetSession {
    /// Reads the entire current grid, header row included.
    fn read_all_values(&mut self) -> Result<Grid>;

    /// Removes every cell from the worksheet.
    fn clear(&mut self) -> Result<()>;

    /// Applies the queued mutations as a single write.
    fn batched_write(&mut self, updates: &[CellUpdate]) -> Result<()>;
}

/// Session backed by an in-memory grid.
///
/// Used by the test suite (it counts write calls, which the batching
/// properties assert on) and for dry runs that should never touch a real
/// document.
#[derive(Debug, Default)]
pub struct MemorySession {
    grid: Grid,
    /// Number of `batched_write` calls observed so far.
    pub write_calls: usize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the session from an existing grid.
    pub fn with_grid(grid: Grid) -> Self {
        Self {
            grid,
            write_calls: 0,
        }
    }

    /// Direct view of the backing grid, for assertions.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

impl SheetSession for MemorySession {
    fn read_all_values(&mut self) -> Result<Grid> {
        Ok(self.grid.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.grid.clear();
        Ok(())
    }

    fn batched_write(&mut self, updates: &[CellUpdate]) -> Result<()> {
        self.write_calls += 1;
        apply_updates(&mut self.grid, updates);
        Ok(())
    }
}

/// Grows the grid as needed and applies each mutation in order.
pub(crate) fn apply_updates(grid: &mut Grid, updates: &[CellUpdate]) {
    use crate::model::CellValue;

    for update in updates {
        if grid.len() <= update.row {
            grid.resize_with(update.row + 1, Vec::new);
        }
        let row = &mut grid[update.row];
        if row.len() <= update.col {
            row.resize(update.col + 1, CellValue::Empty);
        }
        row[update.col] = update.value.clone();
    }
}
