//! Typed diff operations proposed by the generator, and batch reporting.

mod batch_report;
mod diff_kind;
mod operation;
mod parse;

pub use batch_report::{Applied, BatchReport, Rejection};
pub use diff_kind::DiffKind;
pub use operation::{DiffOperation, IndexedOperation};
pub use parse::{DiffParser, ParsedBatch};
