//! Stdio I/O for the control plane.
//!
//! # Important
//!
//! - **stdout**: control messages (one JSON line each)
//! - **stderr**: logs, debug output (never parsed by the coordinator)
//! - **Never use `println!`**: It may add `\r\n` on Windows

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;

/// Write a line to stdout (worker side).
///
/// Writes the string followed by a single `\n` and flushes.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

/// Read one control line (coordinator side).
///
/// Blank lines are skipped. Returns `None` if the stream ends first.
pub async fn read_control_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if !trimmed.trim().is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}
