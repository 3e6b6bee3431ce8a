//! Purpose: Hold top-level CLI command dispatch for `tableio`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Partial reads still print the table; the notice goes to stderr only.

use super::*;

use std::io::Write;
use std::path::Path;

use clap::CommandFactory;
use tableio::api::{ReadOptions, Table, TableRead, read_text_table};

pub(super) fn dispatch_command(
    command: Command,
    verbose: bool,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tableio", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Read {
            file,
            table,
            format,
            column_major,
            line_capacity,
        } => {
            let options = ReadOptions::default()
                .verbose(verbose)
                .initial_line_capacity(line_capacity);
            let read = read_text_table(&file, &table, options)?;
            emit_partial_notice(&read, &file, "read", color_mode);

            let (rows, cols) = read.table.shape();
            let name = read.table.name().to_string();
            let (order, values) = if column_major {
                ("column-major", read.table.into_column_major())
            } else {
                ("row-major", read.table.into_values())
            };
            match format {
                OutputFormat::Json => emit_json(json!({
                    "name": name,
                    "rows": rows,
                    "cols": cols,
                    "order": order,
                    "values": values,
                })),
                OutputFormat::Text => {
                    let width = if column_major { rows } else { cols };
                    write_text_rows(&values, width)?;
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Sizes { file, table } => {
            let options = ReadOptions::default().verbose(verbose);
            let read = read_text_table(&file, &table, options)?;
            emit_partial_notice(&read, &file, "sizes", color_mode);
            let table: &Table = &read.table;
            emit_json(json!({
                "name": table.name(),
                "rows": table.rows(),
                "cols": table.cols(),
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_partial_notice(read: &TableRead, file: &Path, cmd: &str, color_mode: ColorMode) {
    let Some(partial) = read.partial else {
        return;
    };
    let mut details = Map::new();
    details.insert("line".to_string(), json!(partial.line));
    details.insert("rows".to_string(), json!(read.table.rows()));
    details.insert("cols".to_string(), json!(read.table.cols()));
    let notice = Notice {
        kind: "partial_read".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: cmd.to_string(),
        file: file.display().to_string(),
        table: read.table.name().to_string(),
        message: partial.message(&read.table),
        details,
    };
    emit_notice(&notice, color_mode);
}

/// One stored row per line, `width` values each.
fn write_text_rows(values: &[f64], width: usize) -> Result<(), Error> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let write_err = |err: io::Error| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write table")
            .with_source(err)
    };
    if width > 0 {
        for row in values.chunks(width) {
            let line = row
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{line}").map_err(write_err)?;
        }
    }
    out.flush().map_err(write_err)
}
