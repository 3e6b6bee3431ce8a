//! Purpose: Locate a named matrix in an ASCII table file and read it row-major.
//! Exports: `read_text_table`, `TextTableParser`, `TableRead`, `PartialRead`.
//! Role: Text ingestion path; the only consumer of `LineReader` and the tokenizer.
//! Invariants: One sequential pass over the stream; the file handle lives only for the call.
//! Invariants: On error no table is returned; on success values.len() == rows * cols.
//! Invariants: Overflow detection looks at one content line past the block, no further,
//! and only when the line completing the block carried no trailing comment.
//! Notes: File layout is `#1` on line 1, then blocks of `double|float name(rows,cols)`
//! followed by rows of numbers separated by blanks, commas, or semicolons. `#` starts a comment.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use tracing::{debug, info};

use crate::core::error::{Error, ErrorKind, alloc_error, open_error};
use crate::core::line::LineReader;
use crate::core::number::{is_number, parse_dim, parse_f64};
use crate::core::table::{ReadOptions, Table};
use crate::core::tokens::{DATA_DELIMS, HEADER_DELIMS, Tokens};

/// Required prefix of the first line.
pub const FORMAT_TAG: &[u8] = b"#1";

const TYPE_TAGS: [&[u8]; 2] = [b"double", b"float"];

#[derive(Clone, Debug, PartialEq)]
pub struct TableRead {
    pub table: Table,
    /// Set when more numbers follow the declared block; the table is still complete.
    pub partial: Option<PartialRead>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PartialRead {
    /// Line holding the first number past the declared block.
    pub line: u64,
}

impl PartialRead {
    pub fn message(&self, table: &Table) -> String {
        format!(
            "the table dimensions of matrix {} do not match the actual table size (line {})",
            label(table.name(), table.rows(), table.cols()),
            self.line
        )
    }
}

/// Opens `path` and reads the table called `table_name` from it.
pub fn read_text_table(
    path: &Path,
    table_name: &str,
    options: ReadOptions,
) -> Result<TableRead, Error> {
    if options.verbose {
        info!(table = table_name, path = %path.display(), "loading table from file");
    }
    let file = File::open(path).map_err(|err| open_error(err, path).with_table(table_name))?;
    TextTableParser::new(BufReader::new(file), path, options).read(table_name)
}

#[derive(Debug)]
pub struct TextTableParser<R> {
    lines: LineReader<R>,
    source: PathBuf,
}

#[derive(Clone, Copy, Debug)]
struct BlockHeader<'n> {
    name: &'n str,
    rows: usize,
    cols: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HeaderScan {
    NotHeader,
    OtherTable,
    BadDims,
    Match { rows: usize, cols: usize },
}

impl<R: BufRead> TextTableParser<R> {
    /// `source` only labels diagnostics; nothing is opened.
    pub fn new(reader: R, source: impl Into<PathBuf>, options: ReadOptions) -> Self {
        Self {
            lines: LineReader::with_capacity(options.initial_line_capacity, reader),
            source: source.into(),
        }
    }

    pub fn read(mut self, table_name: &str) -> Result<TableRead, Error> {
        let result = self.read_table(table_name);
        result.map_err(|err| err.or_path(&self.source).with_table(table_name))
    }

    fn read_table(&mut self, table_name: &str) -> Result<TableRead, Error> {
        self.check_format_tag()?;
        let header = self.find_header(table_name)?;
        let (table, ended_clean) = self.read_block(header)?;
        let partial = if ended_clean {
            self.look_ahead()?
        } else {
            None
        };
        if let Some(partial) = partial {
            debug!(
                table = table_name,
                rows = header.rows,
                cols = header.cols,
                line = partial.line,
                path = %self.source.display(),
                "declared table dimensions undercount the data in the file"
            );
        }
        Ok(TableRead { table, partial })
    }

    fn check_format_tag(&mut self) -> Result<(), Error> {
        const CONTEXT: &str = "error reading format and version information in first line";
        let Some(line) = self.lines.read_line()? else {
            return Err(Error::new(ErrorKind::Format)
                .with_message(format!(
                    "{CONTEXT}: \"#1\" expected, but end of file reached"
                ))
                .with_path(&self.source)
                .with_line(1));
        };
        if line.starts_with(FORMAT_TAG) {
            return Ok(());
        }

        let found = &line[..line.len().min(FORMAT_TAG.len())];
        let message = if found.is_empty() {
            format!("{CONTEXT}: \"#1\" expected")
        } else {
            format!("{CONTEXT}: \"#1\" expected, but \"{}\" found", found.to_str_lossy())
        };
        Err(Error::new(ErrorKind::Format)
            .with_message(message)
            .with_hint("The first line of a table file must start with #1.")
            .with_path(&self.source)
            .with_line(1))
    }

    fn find_header<'n>(&mut self, table_name: &'n str) -> Result<BlockHeader<'n>, Error> {
        let mut bad_dims_line = None;
        loop {
            let Some(line) = self.lines.read_line()? else {
                return Err(match bad_dims_line {
                    Some(line_no) => Error::new(ErrorKind::Format)
                        .with_message(format!(
                            "invalid dimensions in header of table matrix \"{table_name}\""
                        ))
                        .with_hint("Declare the table as `double name(rows,cols)`.")
                        .with_line(line_no),
                    None => Error::new(ErrorKind::NotFound).with_message(format!(
                        "table matrix \"{table_name}\" not found in file"
                    )),
                }
                .with_path(&self.source)
                .with_table(table_name));
            };

            match scan_header(line, table_name) {
                HeaderScan::Match { rows, cols } => {
                    debug!(
                        table = table_name,
                        rows,
                        cols,
                        line = self.lines.line_no(),
                        "matched table header"
                    );
                    return Ok(BlockHeader {
                        name: table_name,
                        rows,
                        cols,
                    });
                }
                HeaderScan::BadDims => {
                    bad_dims_line.get_or_insert(self.lines.line_no());
                }
                HeaderScan::NotHeader | HeaderScan::OtherTable => {}
            }
        }
    }

    /// The flag is set when the line completing the block ended without a trailing
    /// comment; only then is the following line checked for overflow.
    fn read_block(&mut self, header: BlockHeader<'_>) -> Result<(Table, bool), Error> {
        let source = &self.source;
        let cells = header
            .rows
            .checked_mul(header.cols)
            .ok_or_else(|| {
                Error::new(ErrorKind::Alloc)
                    .with_message("memory allocation error (table size overflows)")
            })
            .map_err(|err| block_error(err, source, &header))?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(cells)
            .map_err(|err| block_error(alloc_error("table values", err), source, &header))?;

        let mut ended_clean = false;
        while values.len() < cells {
            let line_no = self.lines.line_no() + 1;
            let Some(line) = self.lines.read_line()? else {
                let err = Error::new(ErrorKind::UnexpectedEof).with_message(format!(
                    "end of file reached when reading numeric data of matrix {}",
                    header.label()
                ));
                return Err(block_error(err, source, &header));
            };
            let content = content_of(line);
            if is_skippable(content) {
                continue;
            }

            let mut tokens = Tokens::new(content, DATA_DELIMS);
            while values.len() < cells {
                let Some(token) = tokens.next() else {
                    break;
                };
                if token.starts_with(b"#") {
                    break;
                }
                let value = parse_f64(token).map_err(|err| {
                    let err = Error::new(ErrorKind::Format)
                        .with_message(format!(
                            "error in line {line_no} when reading numeric data of matrix {}",
                            header.label()
                        ))
                        .with_line(line_no)
                        .with_source(err);
                    block_error(err, source, &header)
                })?;
                values.push(value);
            }

            if values.len() == cells {
                match tokens.next() {
                    None => ended_clean = true,
                    Some(token) if token.starts_with(b"#") => {}
                    Some(token) => {
                        let err = if is_number(token) {
                            Error::new(ErrorKind::DimensionMismatch).with_message(format!(
                                "the table dimensions of matrix {} do not match the actual table size (line {line_no})",
                                header.label()
                            ))
                        } else {
                            Error::new(ErrorKind::Format).with_message(format!(
                                "error in line {line_no} when reading numeric data of matrix {}",
                                header.label()
                            ))
                        };
                        return Err(block_error(err.with_line(line_no), source, &header));
                    }
                }
            }
        }

        let table = Table::from_row_major(header.name, header.rows, header.cols, values)
            .ok_or_else(|| {
                block_error(
                    Error::new(ErrorKind::Internal)
                        .with_message("table size changed while reading"),
                    source,
                    &header,
                )
            })?;
        Ok((table, ended_clean))
    }

    // Only the first content line after the block is inspected. A following
    // block of another table starts with a type tag, which is not a number.
    fn look_ahead(&mut self) -> Result<Option<PartialRead>, Error> {
        while let Some(line) = self.lines.read_line()? {
            let content = content_of(line);
            if is_skippable(content) {
                continue;
            }
            let numeric = Tokens::new(content, DATA_DELIMS)
                .next()
                .is_some_and(is_number);
            if !numeric {
                return Ok(None);
            }
            return Ok(Some(PartialRead {
                line: self.lines.line_no(),
            }));
        }
        Ok(None)
    }
}

impl BlockHeader<'_> {
    fn label(&self) -> String {
        label(self.name, self.rows, self.cols)
    }
}

fn label(name: &str, rows: usize, cols: usize) -> String {
    format!("\"{name}({rows},{cols})\"")
}

fn block_error(err: Error, source: &Path, header: &BlockHeader<'_>) -> Error {
    err.with_path(source).with_table(header.name)
}

fn scan_header(line: &[u8], table_name: &str) -> HeaderScan {
    let mut tokens = Tokens::new(line, HEADER_DELIMS);
    match tokens.next() {
        Some(tag) if TYPE_TAGS.contains(&tag) => {}
        _ => return HeaderScan::NotHeader,
    }
    match tokens.next() {
        Some(name) if name == table_name.as_bytes() => {}
        _ => return HeaderScan::OtherTable,
    }
    match (tokens.next().and_then(parse_dim), tokens.next().and_then(parse_dim)) {
        (Some(rows), Some(cols)) => HeaderScan::Match { rows, cols },
        _ => HeaderScan::BadDims,
    }
}

fn content_of(line: &[u8]) -> &[u8] {
    line.trim_start_with(|c| c == ' ' || c == '\t')
}

fn is_skippable(content: &[u8]) -> bool {
    content.is_empty() || content.starts_with(b"#")
}

#[cfg(test)]
mod tests {
    use super::{HeaderScan, PartialRead, TextTableParser, scan_header};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::table::ReadOptions;

    fn parse(input: &str, name: &str) -> Result<super::TableRead, Error> {
        TextTableParser::new(input.as_bytes(), "mem.txt", ReadOptions::default()).read(name)
    }

    const TWO_BY_THREE: &str = "#1\ndouble mytable(2,3)\n1.0 2.0 3.0\n4.0 5.0 6.0\n";

    #[test]
    fn reads_declared_table_row_major() {
        let read = parse(TWO_BY_THREE, "mytable").expect("read");
        assert_eq!(read.table.shape(), (2, 3));
        assert_eq!(read.table.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(read.table.name(), "mytable");
        assert!(read.partial.is_none());
    }

    #[test]
    fn rows_may_span_lines_and_mix_delimiters() {
        let input = "#1\nfloat t(2,3)\n1, 2;\n3\t4\n5 6\n";
        let read = parse(input, "t").expect("read");
        assert_eq!(read.table.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn comments_and_blank_lines_do_not_consume_rows() {
        let input = "#1 my tables\n# leading comment\ndouble t(2,2) # header comment\n\n  # indented comment\n1 2 # first row\n\t\n3 4\n";
        let read = parse(input, "t").expect("read");
        assert_eq!(read.table.values(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn other_tables_are_skipped() {
        let input = "#1\ndouble a(1,2)\n9 9\ndouble b(2,1)\n7\n8\n";
        let read = parse(input, "b").expect("read");
        assert_eq!(read.table.shape(), (2, 1));
        assert_eq!(read.table.values(), &[7.0, 8.0]);
    }

    #[test]
    fn missing_table_is_not_found() {
        let err = parse(TWO_BY_THREE, "other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.table(), Some("other"));
        assert_eq!(err.path(), Some(std::path::Path::new("mem.txt")));
        assert!(err.message().unwrap().contains("\"other\""));
    }

    #[test]
    fn format_tag_errors_echo_what_was_found() {
        let err = parse("\ndouble t(1,1)\n1\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().unwrap().ends_with("\"#1\" expected"));

        let err = parse("X\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().unwrap().ends_with("but \"X\" found"));

        let err = parse("#2 version\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().unwrap().ends_with("but \"#2\" found"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn empty_file_is_format_error() {
        let err = parse("", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().unwrap().contains("end of file"));
    }

    #[test]
    fn bad_token_names_the_line() {
        let err = parse("#1\ndouble t(1,3)\n1.0 2.0 abc\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.line(), Some(3));
        assert!(err.message().unwrap().contains("line 3"));
        assert!(err.message().unwrap().contains("\"t(1,3)\""));
    }

    #[test]
    fn trailing_number_on_last_line_is_dimension_mismatch() {
        let err = parse("#1\ndouble t(1,2)\n1 2 3\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn trailing_garbage_on_last_line_is_format_error() {
        let err = parse("#1\ndouble t(1,2)\n1 2 x\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn trailing_comment_on_last_line_is_fine() {
        let read = parse("#1\ndouble t(1,2)\n1 2 #done\n", "t").expect("read");
        assert_eq!(read.table.values(), &[1.0, 2.0]);
        assert!(read.partial.is_none());
    }

    #[test]
    fn trailing_comment_on_completing_line_skips_overflow_check() {
        let read = parse("#1\ndouble t(1,2)\n1 2 # end\n3 4\n", "t").expect("read");
        assert_eq!(read.table.values(), &[1.0, 2.0]);
        assert!(read.partial.is_none());
    }

    #[test]
    fn empty_table_skips_overflow_check() {
        let read = parse("#1\ndouble t(0,2)\n3 4\n", "t").expect("read");
        assert_eq!(read.table.shape(), (0, 2));
        assert!(read.partial.is_none());
    }

    struct BrokenAfter {
        data: &'static [u8],
    }

    impl std::io::Read for BrokenAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::other("device gone"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_failures_name_file_and_table() {
        let inputs: [&'static [u8]; 3] = [b"", b"#1\n", b"#1\ndouble t(2,2)\n1 2\n"];
        for data in inputs {
            let reader = std::io::BufReader::new(BrokenAfter { data });
            let err = TextTableParser::new(reader, "dev.txt", ReadOptions::default())
                .read("t")
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Io);
            assert_eq!(err.path(), Some(std::path::Path::new("dev.txt")));
            assert_eq!(err.table(), Some("t"));
        }

        let reader = std::io::BufReader::new(BrokenAfter {
            data: b"#1\ndouble t(1,2)\n1 2\n",
        });
        let err = TextTableParser::new(reader, "dev.txt", ReadOptions::default())
            .read("t")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.path(), Some(std::path::Path::new("dev.txt")));
    }

    #[test]
    fn extra_row_is_tolerated_as_partial_read() {
        let input = format!("{TWO_BY_THREE}7.0 8.0 9.0\n");
        let read = parse(&input, "mytable").expect("read");
        assert_eq!(read.table.shape(), (2, 3));
        assert_eq!(read.table.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(read.partial, Some(PartialRead { line: 5 }));
        assert!(read.partial.unwrap().message(&read.table).contains("(line 5)"));
    }

    #[test]
    fn lookahead_skips_blank_lines_and_stops_at_first_content() {
        let input = format!("{TWO_BY_THREE}\n# note\n  7.0\n");
        let read = parse(&input, "mytable").expect("read");
        assert_eq!(read.partial, Some(PartialRead { line: 7 }));

        let input = format!("{TWO_BY_THREE}double next(1,1)\n1\n");
        let read = parse(&input, "mytable").expect("read");
        assert!(read.partial.is_none());
    }

    #[test]
    fn end_of_file_inside_block_is_distinct() {
        let err = parse("#1\ndouble t(2,2)\n1 2\n3\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(err.table(), Some("t"));
    }

    #[test]
    fn next_header_inside_short_block_is_format_error() {
        let err = parse("#1\ndouble t(2,2)\n1 2\ndouble u(1,1)\n1\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn empty_table_reads_without_data() {
        let read = parse("#1\ndouble t(0,3)\n", "t").expect("read");
        assert_eq!(read.table.shape(), (0, 3));
        assert!(read.table.values().is_empty());
    }

    #[test]
    fn header_with_bad_dims_is_skipped_for_a_later_match() {
        let input = "#1\ndouble t(x,2)\ndouble t(1,2)\n5 6\n";
        let read = parse(input, "t").expect("read");
        assert_eq!(read.table.values(), &[5.0, 6.0]);

        let err = parse("#1\ndouble t(2,-1)\n", "t").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn long_lines_grow_the_buffer() {
        let row: Vec<String> = (0..500).map(|i| format!("{i}.5")).collect();
        let input = format!("#1\ndouble wide(1,500)\n{}\n", row.join(" "));
        let options = ReadOptions::default().initial_line_capacity(4);
        let read = TextTableParser::new(input.as_bytes(), "mem.txt", options)
            .read("wide")
            .expect("read");
        assert_eq!(read.table.values().len(), 500);
        assert_eq!(read.table.get(0, 499), Some(499.5));
    }

    #[test]
    fn crlf_files_parse() {
        let input = "#1\r\ndouble t(1,2)\r\n1.5;2.5\r\n";
        let read = parse(input, "t").expect("read");
        assert_eq!(read.table.values(), &[1.5, 2.5]);
    }

    #[test]
    fn header_scan_classifies_lines() {
        assert_eq!(scan_header(b"1 2 3", "t"), HeaderScan::NotHeader);
        assert_eq!(scan_header(b"", "t"), HeaderScan::NotHeader);
        assert_eq!(scan_header(b"double", "t"), HeaderScan::OtherTable);
        assert_eq!(scan_header(b"double u(1,1)", "t"), HeaderScan::OtherTable);
        assert_eq!(scan_header(b"double t(1)", "t"), HeaderScan::BadDims);
        assert_eq!(
            scan_header(b"float t ( 3 , 4 )", "t"),
            HeaderScan::Match { rows: 3, cols: 4 }
        );
        assert_eq!(scan_header(b"int t(1,1)", "t"), HeaderScan::NotHeader);
    }
}
