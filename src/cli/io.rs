//! JSON I/O handling for CLI
//!
//! - Input: one JSON-AST request on stdin (may span lines)
//! - Output: JSON on stdout, UTF-8 only

use std::io::{Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one JSON request from `input`
pub fn read_request<R: Read>(mut input: R) -> CliResult<Value> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;

    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&text)?;
    Ok(value)
}

/// Write a JSON document followed by a newline
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_multiline_request() {
        let input = "{\n  \"type\": \"cbqast\",\n  \"version\": \"1\"\n}\n";
        let value = read_request(input.as_bytes()).unwrap();
        assert_eq!(value["type"], "cbqast");
    }

    #[test]
    fn test_empty_input() {
        let err = read_request("  \n".as_bytes()).unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_IO_ERROR");
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&mut out, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"a\": 1\n}\n");
    }
}
