//! JSON output for the CLI
//!
//! Command results are a single JSON object on stdout. Log lines from the
//! election share stdout, one object per line.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a JSON response to stdout
pub fn write_response(response: Value) -> CliResult<()> {
    write_to(&mut io::stdout(), &response)
}

fn write_to<W: Write>(writer: &mut W, response: &Value) -> CliResult<()> {
    let json_str = serde_json::to_string(response)?;
    writeln!(writer, "{}", json_str)?;
    writer.flush()?;
    Ok(())
}
