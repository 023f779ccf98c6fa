//! Core library for the reviewsync command line application.
//!
//! The library reconciles keyed records from a paper-review platform into a
//! header-addressed worksheet without destroying data the document already
//! holds. The modules are structured to keep responsibilities narrow and
//! composable: the document session lives under [`remote`], the grid and
//! record representations inside [`model`], the pure header and row logic in
//! [`header`] and [`reconcile`], the engine itself in [`sheet`], and the
//! review-platform side under [`conference`] and [`report`].

pub mod conference;
pub mod error;
pub mod header;
pub mod model;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod sheet;

pub use error::{Result, SyncError};
pub use model::{CellValue, Grid, Record};
pub use remote::{MemorySession, SheetSession, XlsxSession};
pub use sheet::{Batch, SheetClient, WriteRowsOptions};
