//! Purpose: Define the stable public Rust API boundary for tableio.
//! Exports: Table types, text and binary readers, the transpose routines, errors.
//! Role: Public, additive-only surface used by the CLI and by embedding code.
//! Invariants: Line buffering and tokenizing stay internal details of `core`.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::matfile::{
    Access, Compression, MatClass, MatFile, MatFormat, MatStore, MatVar, MatVersion,
    read_mat_table, read_matrix_sizes, read_real_matrix, resolve_variable, write_real_matrix,
};
pub use crate::core::number::{ParseNumberError, is_number, parse_f64};
pub use crate::core::table::{ReadOptions, Table};
pub use crate::core::text_table::{PartialRead, TableRead, TextTableParser, read_text_table};
pub use crate::core::transpose::{col_major_to_row_major, row_major_to_col_major};
