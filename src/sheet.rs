//! The reconciliation engine: local mirror, scoped write batches, and the
//! public worksheet surface (`get_data_list`, `write_rows`, `write_cells`,
//! `clear_worksheet`).
//!
//! The mirror only ever reflects confirmed remote state. Every high-level
//! operation follows the same discipline: refresh the mirror, queue cell
//! mutations into a [`Batch`], commit the batch as one remote write, resync.
//! Reading the mirror between queueing and committing will not show the
//! queued mutation.

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::header;
use crate::model::{CellUpdate, CellValue, Grid, Record};
use crate::reconcile;
use crate::remote::SheetSession;

/// A scoped set of pending cell mutations.
///
/// A batch is opened, filled, and then handed to [`SheetClient::commit`],
/// which flushes it as exactly one remote write and resyncs the mirror.
/// Dropping an uncommitted batch discards its mutations; nothing is ever
/// flushed implicitly.
#[derive(Debug, Default)]
#[must_use = "a batch does nothing until committed"]
pub struct Batch {
    updates: Vec<CellUpdate>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one cell mutation.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        self.updates.push(CellUpdate { row, col, value });
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Options for [`SheetClient::write_rows`].
#[derive(Debug, Clone)]
pub struct WriteRowsOptions {
    /// Clear the worksheet before writing.
    pub empty_sheet: bool,
    /// Column headers to write; defaults to the headers already stored.
    pub headers: Option<Vec<String>>,
    /// Write (or merge) the header row before the data rows.
    pub write_headers: bool,
    /// Row index the write starts at. Row 0 is the header row.
    pub start_row_idx: usize,
    /// Rows per committed chunk. Bounds the payload of each remote write.
    pub batch_size: usize,
    /// Align records to existing rows keyed on this column.
    pub key_column: Option<String>,
    /// Replace the header set instead of merging into it.
    pub overwrite_headers: bool,
}

impl Default for WriteRowsOptions {
    fn default() -> Self {
        Self {
            empty_sheet: false,
            headers: None,
            write_headers: true,
            start_row_idx: 0,
            batch_size: 1000,
            key_column: None,
            overwrite_headers: false,
        }
    }
}

/// Header-aware client for one remote worksheet.
pub struct SheetClient<S: SheetSession> {
    session: S,
    local_values: Grid,
    headers: Vec<String>,
}

impl<S: SheetSession> SheetClient<S> {
    /// Wraps a session. The mirror starts empty and is populated on the
    /// first operation that needs remote state.
    pub fn new(session: S) -> Self {
        Self {
            session,
            local_values: Grid::new(),
            headers: Vec::new(),
        }
    }

    /// Invalidates and rebuilds the mirror (and the derived headers) from
    /// the remote document.
    pub fn sync_from_remote(&mut self) -> Result<()> {
        self.local_values = self.session.read_all_values()?;
        self.headers = derive_headers(&self.local_values);
        Ok(())
    }

    /// Current header list, as of the last sync.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Flushes the batch as one remote write, then unconditionally resyncs
    /// the mirror so the next read sees confirmed remote state.
    pub fn commit(&mut self, batch: Batch) -> Result<()> {
        if !batch.is_empty() {
            debug!(cells = batch.len(), "committing batch");
            self.session.batched_write(&batch.updates)?;
        }
        self.sync_from_remote()
    }

    /// Removes every cell from the worksheet.
    #[instrument(level = "info", skip(self))]
    pub fn clear_worksheet(&mut self) -> Result<()> {
        self.session.clear()?;
        self.sync_from_remote()?;
        info!("worksheet cleared");
        Ok(())
    }

    /// Reads the full current table as records, one per data row. Empty
    /// cells are omitted from the produced records.
    #[instrument(level = "info", skip(self))]
    pub fn get_data_list(&mut self) -> Result<Vec<Record>> {
        self.sync_from_remote()?;
        let mut data_list = Vec::new();
        for row in self.local_values.iter().skip(1) {
            let mut record = Record::new();
            for (header, cell) in self.headers.iter().zip(row) {
                if header.is_empty() || cell.is_empty() {
                    continue;
                }
                record.insert(header.clone(), cell.clone());
            }
            data_list.push(record);
        }
        info!(rows = data_list.len(), "retrieved data rows");
        Ok(data_list)
    }

    /// Writes or merges column headers at `start_row_idx`.
    ///
    /// Returns the next usable row index and the full header list after the
    /// write. Queues one mutation per newly written header cell and commits
    /// them as a single batch.
    fn write_headers(
        &mut self,
        names: &[String],
        start_row_idx: usize,
        overwrite: bool,
    ) -> Result<(usize, Vec<String>)> {
        let plan = header::merge(&self.headers, names, overwrite);
        let mut batch = Batch::new();
        for (col_idx, name) in &plan.new_cells {
            batch.set(start_row_idx, *col_idx, CellValue::Text(name.clone()));
        }
        self.commit(batch)?;
        debug!(
            columns = plan.headers.len(),
            row = start_row_idx,
            "headers written"
        );
        Ok((start_row_idx + 1, plan.headers))
    }

    /// Writes one chunk of records starting at `start_row_idx` as a single
    /// committed batch. Headers absent from a record are left untouched;
    /// this is merge-only, never blanking.
    fn write_batch(
        &mut self,
        chunk: &[Record],
        headers: &[String],
        start_row_idx: usize,
    ) -> Result<usize> {
        let mut batch = Batch::new();
        for (offset, record) in chunk.iter().enumerate() {
            for (col_idx, header) in headers.iter().enumerate() {
                if let Some(value) = record.get(header) {
                    batch.set(start_row_idx + offset, col_idx, value.clone());
                }
            }
        }
        self.commit(batch)?;
        debug!(
            rows = chunk.len(),
            row = start_row_idx,
            "batch of rows written"
        );
        Ok(start_row_idx + chunk.len())
    }

    /// Reconciles `records` into the worksheet and returns the next usable
    /// row index.
    ///
    /// Optionally clears the worksheet, writes or merges headers, aligns the
    /// records to existing rows keyed on `key_column`, and writes the data
    /// in chunks of `batch_size` rows, each committed as one remote write.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub fn write_rows(&mut self, records: Vec<Record>, opts: &WriteRowsOptions) -> Result<usize> {
        self.sync_from_remote()?;

        if opts.empty_sheet {
            self.clear_worksheet()?;
            info!("sheet emptied before writing");
        }

        let names = match &opts.headers {
            Some(names) => names.clone(),
            None => self.headers.clone(),
        };

        let (mut current_row_idx, headers) = if opts.write_headers {
            self.write_headers(&names, opts.start_row_idx, opts.overwrite_headers)?
        } else {
            (opts.start_row_idx, names)
        };

        let records = match &opts.key_column {
            Some(key_column) => {
                reconcile::align(records, key_column, &self.headers, &self.local_values)?
            }
            None => records,
        };

        let total_rows = records.len();
        let batch_size = opts.batch_size.max(1);
        for chunk in records.chunks(batch_size) {
            current_row_idx = self.write_batch(chunk, &headers, current_row_idx)?;
        }
        info!(rows = total_rows, "rows written to sheet");
        Ok(current_row_idx)
    }

    /// Updates individual cells of rows matched by conjunctive conditions.
    ///
    /// `where` and `what` are parallel: for each pair, the first row whose
    /// cells equal every condition value receives the target values. A
    /// non-empty cell that differs from its target is skipped (with a
    /// warning) unless `overwrite` is set, in which case the prior value is
    /// logged and replaced. Rows are never inserted.
    #[instrument(level = "info", skip_all, fields(pairs = where_conditions.len()))]
    pub fn write_cells(
        &mut self,
        where_conditions: &[Record],
        what_values: &[Record],
        overwrite: bool,
    ) -> Result<()> {
        self.sync_from_remote()?;

        let mut batch = Batch::new();
        let mut updates_count = 0usize;

        for (condition, values) in where_conditions.iter().zip(what_values) {
            let row_idx = match self.find_matching_row(condition) {
                Some(row_idx) => row_idx,
                None => {
                    warn!(?condition, "no matching row found for conditions");
                    continue;
                }
            };

            for (col_header, value) in values {
                let col_idx = match self.headers.iter().position(|h| h == col_header) {
                    Some(col_idx) => col_idx,
                    None => {
                        warn!(column = %col_header, "column header not found");
                        continue;
                    }
                };

                let current = self.cell_at(row_idx, col_idx);
                if !current.is_empty() && !current.matches(value) {
                    if !overwrite {
                        warn!(
                            row = row_idx,
                            column = %col_header,
                            current = %current,
                            new = %value,
                            "skipping non-empty cell"
                        );
                        continue;
                    }
                    info!(
                        row = row_idx,
                        column = %col_header,
                        old = %current,
                        new = %value,
                        "overwriting cell"
                    );
                }

                batch.set(row_idx, col_idx, value.clone());
                updates_count += 1;
            }
        }

        self.commit(batch)?;
        info!(cells = updates_count, "cells updated in sheet");
        Ok(())
    }

    /// First row (header row included) where every condition column equals
    /// the expected value. Conditions naming unknown columns can never match.
    fn find_matching_row(&self, condition: &Record) -> Option<usize> {
        self.local_values.iter().position(|row| {
            condition.iter().all(|(column, expected)| {
                match self.headers.iter().position(|h| h == column) {
                    Some(col_idx) => row
                        .get(col_idx)
                        .unwrap_or(&CellValue::Empty)
                        .matches(expected),
                    None => false,
                }
            })
        })
    }

    fn cell_at(&self, row_idx: usize, col_idx: usize) -> &CellValue {
        self.local_values
            .get(row_idx)
            .and_then(|row| row.get(col_idx))
            .unwrap_or(&CellValue::Empty)
    }
}

/// Header names come from row 0; trailing blank cells do not count as
/// columns.
fn derive_headers(grid: &Grid) -> Vec<String> {
    let mut headers: Vec<String> = match grid.first() {
        Some(row) => row.iter().map(CellValue::to_cell_string).collect(),
        None => Vec::new(),
    };
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::remote::MemorySession;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn record(pairs: &[(&str, CellValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn client_with_grid(grid: Grid) -> SheetClient<MemorySession> {
        SheetClient::new(MemorySession::with_grid(grid))
    }

    #[test]
    fn merge_only_write_leaves_uncovered_columns_untouched() {
        let grid = vec![
            vec![text("A"), text("B")],
            vec![text("old_a"), text("keep_me")],
        ];
        let mut client = client_with_grid(grid);

        let records = vec![record(&[("A", text("x"))])];
        let opts = WriteRowsOptions {
            start_row_idx: 0,
            write_headers: true,
            ..Default::default()
        };
        let next = client.write_rows(records, &opts).expect("written");

        assert_eq!(next, 2);
        assert_eq!(client.session.grid()[1][0], text("x"));
        assert_eq!(client.session.grid()[1][1], text("keep_me"));
    }

    #[test]
    fn write_rows_returns_next_row_index_and_chunks_batches() {
        let mut client = SheetClient::new(MemorySession::new());
        let records: Vec<Record> = (0..2500)
            .map(|n| record(&[("paper_number", CellValue::Int(n))]))
            .collect();
        let opts = WriteRowsOptions {
            headers: Some(vec!["paper_number".to_string()]),
            batch_size: 1000,
            ..Default::default()
        };

        let next = client.write_rows(records, &opts).expect("written");

        assert_eq!(next, 1 + 2500);
        // One flush for the header row, then exactly three data chunks.
        assert_eq!(client.session.write_calls, 4);
    }

    #[test]
    fn data_chunks_flush_once_each() {
        let mut client = client_with_grid(vec![vec![text("paper_number")]]);
        let records: Vec<Record> = (0..2500)
            .map(|n| record(&[("paper_number", CellValue::Int(n))]))
            .collect();
        let opts = WriteRowsOptions {
            write_headers: false,
            start_row_idx: 1,
            batch_size: 1000,
            ..Default::default()
        };

        let next = client.write_rows(records, &opts).expect("written");

        assert_eq!(next, 1 + 2500);
        assert_eq!(client.session.write_calls, 3);
    }

    #[test]
    fn key_alignment_rewrites_existing_rows_in_place() {
        let grid = vec![
            vec![text("paper_number"), text("paper_title"), text("notes")],
            vec![CellValue::Int(3), text("stale"), text("human note 3")],
            vec![CellValue::Int(1), text("stale"), text("human note 1")],
        ];
        let mut client = client_with_grid(grid);

        let records = vec![
            record(&[("paper_number", CellValue::Int(1)), ("paper_title", text("one"))]),
            record(&[("paper_number", CellValue::Int(3)), ("paper_title", text("three"))]),
        ];
        let opts = WriteRowsOptions {
            key_column: Some("paper_number".to_string()),
            ..Default::default()
        };
        client.write_rows(records, &opts).expect("written");

        let grid = client.session.grid();
        assert_eq!(grid[1][1], text("three"));
        assert_eq!(grid[2][1], text("one"));
        // Human annotations in unrelated columns keep their rows.
        assert_eq!(grid[1][2], text("human note 3"));
        assert_eq!(grid[2][2], text("human note 1"));
    }

    #[test]
    fn alignment_failure_aborts_before_any_data_write() {
        let grid = vec![
            vec![text("paper_number")],
            vec![CellValue::Int(1)],
            vec![CellValue::Int(2)],
        ];
        let mut client = client_with_grid(grid);

        let records = vec![record(&[("paper_number", CellValue::Int(1))])];
        let opts = WriteRowsOptions {
            key_column: Some("paper_number".to_string()),
            ..Default::default()
        };
        let err = client.write_rows(records, &opts).expect_err("must fail");
        assert!(matches!(err, SyncError::MissingRecord { key: 2 }));
        assert_eq!(client.session.grid()[1][0], CellValue::Int(1));
        assert_eq!(client.session.grid()[2][0], CellValue::Int(2));
    }

    #[test]
    fn header_merge_keeps_existing_column_positions() {
        let grid = vec![vec![text("A"), text("C")], vec![text("1"), text("2")]];
        let mut client = client_with_grid(grid);

        let opts = WriteRowsOptions {
            headers: Some(vec!["A".to_string(), "B".to_string()]),
            ..Default::default()
        };
        client.write_rows(Vec::new(), &opts).expect("written");

        assert_eq!(client.headers(), ["A", "C", "B"]);
        // Re-running the same merge is a no-op on the header row.
        let before = client.session.write_calls;
        client.write_rows(Vec::new(), &opts).expect("written");
        assert_eq!(client.headers(), ["A", "C", "B"]);
        assert_eq!(client.session.write_calls, before);
    }

    #[test]
    fn header_overwrite_replaces_prior_set() {
        let grid = vec![vec![text("A"), text("B"), text("C")]];
        let mut client = client_with_grid(grid);

        let opts = WriteRowsOptions {
            headers: Some(vec!["X".to_string(), "Y".to_string()]),
            overwrite_headers: true,
            empty_sheet: true,
            ..Default::default()
        };
        client.write_rows(Vec::new(), &opts).expect("written");
        assert_eq!(client.headers(), ["X", "Y"]);
    }

    #[test]
    fn conditional_update_skips_conflicting_cell_without_overwrite() {
        let grid = vec![
            vec![text("paper_number"), text("decision")],
            vec![CellValue::Int(1), text("5")],
        ];
        let mut client = client_with_grid(grid);

        let where_conditions = vec![record(&[("paper_number", CellValue::Int(1))])];
        let what_values = vec![record(&[("decision", text("7"))])];
        client
            .write_cells(&where_conditions, &what_values, false)
            .expect("updated");

        assert_eq!(client.session.grid()[1][1], text("5"));
        // Nothing was queued, so the only session traffic is mirror reads.
        assert_eq!(client.session.write_calls, 0);
    }

    #[test]
    fn conditional_update_overwrites_when_forced() {
        let grid = vec![
            vec![text("paper_number"), text("decision")],
            vec![CellValue::Int(1), text("5")],
        ];
        let mut client = client_with_grid(grid);

        let where_conditions = vec![record(&[("paper_number", CellValue::Int(1))])];
        let what_values = vec![record(&[("decision", text("7"))])];
        client
            .write_cells(&where_conditions, &what_values, true)
            .expect("updated");

        assert_eq!(client.session.grid()[1][1], text("7"));
        assert_eq!(client.session.write_calls, 1);
    }

    #[test]
    fn conditional_update_fills_empty_cells() {
        let grid = vec![
            vec![text("paper_number"), text("decision")],
            vec![CellValue::Int(1)],
        ];
        let mut client = client_with_grid(grid);

        let where_conditions = vec![record(&[("paper_number", CellValue::Int(1))])];
        let what_values = vec![record(&[("decision", text("accept"))])];
        client
            .write_cells(&where_conditions, &what_values, false)
            .expect("updated");

        assert_eq!(client.session.grid()[1][1], text("accept"));
    }

    #[test]
    fn conditional_update_ignores_unmatched_and_unknown_columns() {
        let grid = vec![
            vec![text("paper_number"), text("decision")],
            vec![CellValue::Int(1), text("ok")],
        ];
        let mut client = client_with_grid(grid);

        let where_conditions = vec![
            record(&[("paper_number", CellValue::Int(99))]),
            record(&[("nonexistent", text("x"))]),
            record(&[("paper_number", CellValue::Int(1))]),
        ];
        let what_values = vec![
            record(&[("decision", text("nope"))]),
            record(&[("decision", text("nope"))]),
            record(&[("no_such_column", text("nope"))]),
        ];
        client
            .write_cells(&where_conditions, &what_values, false)
            .expect("updated");

        assert_eq!(client.session.grid()[1][1], text("ok"));
        assert_eq!(client.session.write_calls, 0);
    }

    #[test]
    fn get_data_list_zips_headers_over_data_rows() {
        let grid = vec![
            vec![text("A"), text("B")],
            vec![text("1"), CellValue::Empty],
            vec![text("2"), text("b2")],
        ];
        let mut client = client_with_grid(grid);

        let data = client.get_data_list().expect("read");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0], record(&[("A", text("1"))]));
        assert_eq!(
            data[1],
            record(&[("A", text("2")), ("B", text("b2"))])
        );
    }

    #[test]
    fn clear_worksheet_resets_mirror_and_headers() {
        let grid = vec![vec![text("A")], vec![text("1")]];
        let mut client = client_with_grid(grid);
        client.sync_from_remote().expect("sync");
        assert_eq!(client.headers(), ["A"]);

        client.clear_worksheet().expect("cleared");
        assert!(client.headers().is_empty());
        assert!(client.get_data_list().expect("read").is_empty());
    }
}
