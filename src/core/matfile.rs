//! Purpose: Binary matrix-file boundary and the matrix operations built on it.
//! Exports: `MatStore`, `MatFile`, `MatVar`, `MatClass`, `MatVersion`, `resolve_variable`,
//! `read_matrix_sizes`, `read_real_matrix`, `read_mat_table`, `write_real_matrix`.
//! Role: The container format itself is provided by an external library behind `MatStore`;
//! this module only resolves variables, validates them, and fixes up storage order.
//! Invariants: Data crossing the trait boundary is column-major; data returned to callers is row-major.
//! Invariants: Handles and descriptors are owned values, released on drop on every path.
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::core::error::{Error, ErrorKind, alloc_error, open_error};
use crate::core::table::{ReadOptions, Table};
use crate::core::transpose::{col_major_to_row_major, row_major_to_col_major};

/// Longest variable name the container format stores, including the terminator slot.
const NAME_LENGTH_MAX: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatClass {
    Empty,
    Cell,
    Struct,
    Object,
    Char,
    Sparse,
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Function,
    Opaque,
}

impl MatClass {
    /// Dense numeric classes; these can all be read as `f64`.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            MatClass::Double
                | MatClass::Single
                | MatClass::Int8
                | MatClass::UInt8
                | MatClass::Int16
                | MatClass::UInt16
                | MatClass::Int32
                | MatClass::UInt32
                | MatClass::Int64
                | MatClass::UInt64
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatFormat {
    Mat4,
    Mat5,
    Mat73,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    None,
    Zlib,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Version tag accepted by the write path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatVersion {
    V4,
    V6,
    V7,
    V73,
}

impl MatVersion {
    pub const ALL: [MatVersion; 4] = [
        MatVersion::V4,
        MatVersion::V6,
        MatVersion::V7,
        MatVersion::V73,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatVersion::V4 => "4",
            MatVersion::V6 => "6",
            MatVersion::V7 => "7",
            MatVersion::V73 => "7.3",
        }
    }

    pub fn format(self) -> MatFormat {
        match self {
            MatVersion::V4 => MatFormat::Mat4,
            MatVersion::V6 | MatVersion::V7 => MatFormat::Mat5,
            MatVersion::V73 => MatFormat::Mat73,
        }
    }

    pub fn compression(self) -> Compression {
        match self {
            MatVersion::V4 | MatVersion::V6 => Compression::None,
            MatVersion::V7 | MatVersion::V73 => Compression::Zlib,
        }
    }
}

impl fmt::Display for MatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatVersion {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Error> {
        MatVersion::ALL
            .into_iter()
            .find(|version| version.as_str() == tag)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid version {tag}"))
                    .with_hint("Use one of 4, 6, 7, 7.3.")
            })
    }
}

/// Descriptor of one variable (or struct field) in a matrix file.
#[derive(Clone, Debug, PartialEq)]
pub struct MatVar {
    /// Dotted path from the file root.
    pub name: String,
    pub class: MatClass,
    pub dims: Vec<usize>,
    pub is_complex: bool,
}

impl MatVar {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// `(rows, cols)` for rank-2 variables.
    pub fn shape(&self) -> Option<(usize, usize)> {
        match self.dims.as_slice() {
            &[rows, cols] => Some((rows, cols)),
            _ => None,
        }
    }

    fn is_scalar_struct(&self) -> bool {
        self.class == MatClass::Struct && self.shape() == Some((1, 1))
    }
}

/// An open matrix file. Dropping it closes the file.
pub trait MatFile {
    /// Looks up a top-level variable without reading its data.
    fn var_info(&mut self, name: &str) -> Option<MatVar>;

    /// Looks up field `field` of the scalar struct `parent`.
    fn struct_field(&mut self, parent: &MatVar, field: &str) -> Option<MatVar>;

    /// Reads all elements of a numeric variable as `f64`, column-major.
    /// `out.len()` equals the product of the variable's dims.
    fn read_f64(&mut self, var: &MatVar, out: &mut [f64]) -> Result<(), Error>;

    fn delete_var(&mut self, name: &str) -> Result<(), Error>;

    /// Writes a real double matrix; `data` is column-major.
    fn write_f64(
        &mut self,
        name: &str,
        dims: [usize; 2],
        data: &[f64],
        compression: Compression,
    ) -> Result<(), Error>;
}

/// Entry point of the binary matrix-file library.
pub trait MatStore {
    type File: MatFile;

    fn open(&self, path: &Path, access: Access) -> io::Result<Self::File>;

    fn create(&self, path: &Path, format: MatFormat) -> io::Result<Self::File>;
}

/// Resolves a dotted path (`a.b.c`) to a real, rank-2, dense numeric variable.
///
/// Every segment before the last must name a 1x1 struct. Empty segments are
/// ignored, so `a..b` behaves like `a.b`.
pub fn resolve_variable<F: MatFile>(file: &mut F, name: &str) -> Result<MatVar, Error> {
    let mut segments = name.split('.').filter(|segment| !segment.is_empty());
    let root = segments.next();

    let Some(mut var) = file.var_info(root.unwrap_or(name)) else {
        let shown = root.map_or_else(|| name.to_string(), truncate_name);
        return Err(Error::new(ErrorKind::NotFound)
            .with_message(format!("variable \"{shown}\" not found"))
            .with_table(name));
    };

    for field in segments {
        let next = if var.is_scalar_struct() {
            file.struct_field(&var, field)
        } else {
            None
        };
        let Some(next) = next else {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("variable \"{name}\" not found"))
                .with_table(name));
        };
        var = next;
    }

    if var.rank() != 2 {
        return Err(Error::new(ErrorKind::Format)
            .with_message(format!("variable \"{name}\" has not the required rank 2"))
            .with_table(name));
    }
    if !var.class.is_numeric() {
        return Err(Error::new(ErrorKind::Format)
            .with_message(format!(
                "matrix \"{name}\" has not the required numeric variable class"
            ))
            .with_table(name));
    }
    if var.is_complex {
        return Err(Error::new(ErrorKind::Format)
            .with_message(format!("matrix \"{name}\" must not be complex"))
            .with_table(name));
    }
    Ok(var)
}

fn truncate_name(segment: &str) -> String {
    let limit = NAME_LENGTH_MAX - 1;
    if segment.chars().count() > limit {
        let head: String = segment.chars().take(limit).collect();
        format!("{head}...")
    } else {
        segment.to_string()
    }
}

fn open_and_resolve<S: MatStore>(
    store: &S,
    path: &Path,
    name: &str,
) -> Result<(S::File, MatVar, (usize, usize)), Error> {
    let mut file = store
        .open(path, Access::ReadOnly)
        .map_err(|err| open_error(err, path).with_table(name))?;
    let var = resolve_variable(&mut file, name).map_err(|err| err.or_path(path))?;
    let shape = var.shape().ok_or_else(|| {
        Error::new(ErrorKind::Internal)
            .with_message("resolved variable lost its rank")
            .with_path(path)
            .with_table(name)
    })?;
    Ok((file, var, shape))
}

/// Declared `(rows, cols)` of a variable.
pub fn read_matrix_sizes<S: MatStore>(
    store: &S,
    path: &Path,
    name: &str,
) -> Result<(usize, usize), Error> {
    let (_file, _var, shape) = open_and_resolve(store, path, name)?;
    Ok(shape)
}

/// Reads a variable that must have exactly `rows` x `cols` elements; returns it row-major.
pub fn read_real_matrix<S: MatStore>(
    store: &S,
    path: &Path,
    name: &str,
    rows: usize,
    cols: usize,
    options: ReadOptions,
) -> Result<Vec<f64>, Error> {
    if options.verbose {
        info!(table = name, path = %path.display(), "loading matrix from file");
    }
    let (mut file, var, (var_rows, var_cols)) = open_and_resolve(store, path, name)?;

    let mismatch = |what: &str, wanted: usize| {
        Error::new(ErrorKind::DimensionMismatch)
            .with_message(format!(
                "cannot read {wanted} {what} of array \"{name}({var_rows},{var_cols})\""
            ))
            .with_path(path)
            .with_table(name)
    };
    if rows != var_rows {
        return Err(mismatch("rows", rows));
    }
    if cols != var_cols {
        return Err(mismatch("columns", cols));
    }

    let mut values = read_data(&mut file, &var, path, name)?;
    col_major_to_row_major(&mut values, var_rows, var_cols);
    Ok(values)
}

/// Reads a variable of any 2-D shape as a row-major table.
pub fn read_mat_table<S: MatStore>(
    store: &S,
    path: &Path,
    name: &str,
    options: ReadOptions,
) -> Result<Table, Error> {
    if options.verbose {
        info!(table = name, path = %path.display(), "loading table from file");
    }
    let (mut file, var, (rows, cols)) = open_and_resolve(store, path, name)?;
    let values = read_data(&mut file, &var, path, name)?;
    Table::from_column_major(name, rows, cols, values).ok_or_else(|| {
        Error::new(ErrorKind::Internal)
            .with_message("matrix data does not match its dimensions")
            .with_path(path)
            .with_table(name)
    })
}

fn read_data<F: MatFile>(
    file: &mut F,
    var: &MatVar,
    path: &Path,
    name: &str,
) -> Result<Vec<f64>, Error> {
    let read_error = || {
        let label = match var.shape() {
            Some((rows, cols)) => format!("\"{name}({rows},{cols})\""),
            None => format!("\"{name}\""),
        };
        Error::new(ErrorKind::Io)
            .with_message(format!("error when reading numeric data of matrix {label}"))
            .with_path(path)
            .with_table(name)
    };

    let len = var
        .dims
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            Error::new(ErrorKind::Alloc)
                .with_message("memory allocation error (matrix size overflows)")
                .with_path(path)
                .with_table(name)
        })?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|err| alloc_error("matrix values", err).with_path(path).with_table(name))?;
    values.resize(len, 0.0);

    file.read_f64(var, &mut values)
        .map_err(|err| read_error().with_source(err))?;
    Ok(values)
}

/// Writes a row-major `rows` x `cols` matrix as variable `name`.
///
/// With `append` the file must exist and any variable of the same name is
/// replaced; otherwise a new file of the requested version is created.
#[allow(clippy::too_many_arguments)]
pub fn write_real_matrix<S: MatStore>(
    store: &S,
    path: &Path,
    name: &str,
    values: &[f64],
    rows: usize,
    cols: usize,
    append: bool,
    version: &str,
) -> Result<(), Error> {
    let version = version
        .parse::<MatVersion>()
        .map_err(|err| err.with_path(path).with_table(name))?;
    if Some(values.len()) != rows.checked_mul(cols) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "{} values do not form a {rows}x{cols} matrix",
                values.len()
            ))
            .with_path(path)
            .with_table(name));
    }

    let mut file = if append {
        store
            .open(path, Access::ReadWrite)
            .map_err(|err| open_error(err, path).with_table(name))?
    } else {
        store.create(path, version.format()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("not possible to newly create file")
                .with_hint(format!(
                    "Check that version {version} files are supported by the matrix-file library."
                ))
                .with_path(path)
                .with_table(name)
                .with_source(err)
        })?
    };

    let mut column_major = Vec::new();
    column_major
        .try_reserve_exact(values.len())
        .map_err(|err| alloc_error("matrix copy", err).with_path(path).with_table(name))?;
    column_major.extend_from_slice(values);
    row_major_to_col_major(&mut column_major, rows, cols);

    if append {
        if let Err(err) = file.delete_var(name) {
            debug!(table = name, error = %err, "no previous variable replaced");
        }
    }

    file.write_f64(name, [rows, cols], &column_major, version.compression())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("cannot write variable \"{name}\""))
                .with_path(path)
                .with_table(name)
                .with_source(err)
        })
}
