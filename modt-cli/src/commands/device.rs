//! Catalog commands, firmware update and the status loop.

use anyhow::{Context, Result};
use console::style;
use log::{info, warn};
use modt::{Command, Printer, Response, Transport};
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

/// Send a catalog command and print its reply, if any.
pub(crate) fn cmd_send<T: Transport>(printer: &mut Printer<T>, command: Command) -> Result<()> {
    info!("Sending {command}");
    let reply = printer
        .send_command(command)
        .with_context(|| format!("Failed to send {command}"))?;

    if let Some(reply) = reply {
        println!("{}", format_response(&reply));
    }
    Ok(())
}

/// Switch the printer into DFU mode for a firmware update.
///
/// Flashing the DFU image itself is not implemented; the file is only
/// checked for readability so a typo fails before the printer reboots.
pub(crate) fn cmd_firmware_update<T: Transport>(
    printer: &mut Printer<T>,
    file: &Path,
    quiet: bool,
) -> Result<()> {
    let size = fs::metadata(file)
        .with_context(|| format!("Failed to read firmware file {}", file.display()))?
        .len();
    info!("Firmware image {} ({size} bytes)", file.display());

    cmd_send(printer, Command::EnterDfu)?;

    warn!("DFU flashing is not implemented, flash the image with an external DFU tool");
    if !quiet {
        eprintln!(
            "{} Printer switched to DFU mode. Flash {} with a DFU tool (e.g. dfu-util).",
            style("!").yellow().bold(),
            file.display()
        );
    }
    Ok(())
}

/// Print the printer status once, or every `interval` when `repeat` is set.
pub(crate) fn run_status_loop<T: Transport>(
    printer: &mut Printer<T>,
    repeat: bool,
    interval: Duration,
) -> Result<usize> {
    let polls = printer.poll_status(repeat, interval, |status| {
        println!("{}", format_response(status));
        ControlFlow::Continue(())
    })?;
    Ok(polls)
}

/// Render a response for stdout, pretty-printing it when it is JSON.
pub(crate) fn format_response(response: &Response) -> String {
    response
        .json()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| response.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_response_plain_text() {
        let response = Response::new(b"OK".to_vec());
        assert_eq!(format_response(&response), "OK");
    }

    #[test]
    fn test_format_response_pretty_json() {
        let response = Response::new(br#"{"status":{"state":"STATE_IDLE"}};"#.to_vec());
        let formatted = format_response(&response);
        assert!(formatted.contains('\n'));
        assert!(formatted.contains("\"state\": \"STATE_IDLE\""));
    }
}
