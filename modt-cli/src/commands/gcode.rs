//! G-code upload command.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use modt::protocol::TransferWindow;
use modt::{Printer, Transport, UploadEvent, UploadJob};
use std::path::Path;

use crate::commands::device::format_response;
use crate::use_fancy_output;

/// What to echo to stdout while uploading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UploadOptions {
    /// Print a header and the contents of every block.
    pub print_blocks: bool,
    /// Print the status replies interleaved between blocks.
    pub print_status: bool,
    /// Suppress progress and summary output.
    pub quiet: bool,
}

/// Read a g-code file and prepare it for upload.
pub(crate) fn load_job(file: &Path, job_id: Option<&str>) -> Result<UploadJob> {
    let job = UploadJob::from_file(file)
        .with_context(|| format!("Failed to read g-code file {}", file.display()))?;
    debug!(
        "Loaded {} ({} bytes, adler32 {})",
        file.display(),
        job.size(),
        job.checksum()
    );
    Ok(match job_id {
        Some(id) => job.with_job_id(id),
        None => job,
    })
}

/// Push a prepared job to the printer.
pub(crate) fn cmd_send_gcode<T: Transport>(
    printer: &mut Printer<T>,
    job: &UploadJob,
    options: UploadOptions,
) -> Result<()> {
    if !options.quiet {
        eprintln!(
            "{} Uploading {} (adler32 {:#010x})",
            style("▶").cyan(),
            human_size(job.size()),
            job.checksum()
        );
    }

    let pb = if options.quiet || options.print_blocks || !use_fancy_output() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(job.size() as u64);
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb
    };

    let result = printer.upload(job, |event| match event {
        UploadEvent::Metadata { .. } => pb.set_message("sending"),
        UploadEvent::Status(status) => {
            if options.print_status {
                pb.suspend(|| {
                    println!("# printer-status:");
                    println!("{}", format_response(status));
                });
            }
        },
        UploadEvent::Block { window, data, .. } => {
            if options.print_blocks {
                println!("{}", format_block(window, data));
            }
            pb.inc(window.len as u64);
        },
    });

    match result {
        Ok(summary) => {
            pb.finish_with_message("done");
            if !options.quiet {
                eprintln!(
                    "{} Sent {} in {} blocks",
                    style("✓").green(),
                    human_size(summary.bytes_sent),
                    summary.blocks
                );
            }
            Ok(())
        },
        Err(err) => {
            pb.abandon();
            Err(err).context("G-code upload failed")
        },
    }
}

/// Block header followed by the raw bytes, non-ASCII escaped.
///
/// Blocks are cut at fixed offsets, so a block may end inside a multi-byte
/// character.
fn format_block(window: TransferWindow, data: &[u8]) -> String {
    format!(
        "# block: {}-{}, block-size: {}\n{}",
        window.offset,
        window.end(),
        window.len,
        data.escape_ascii()
    )
}

/// Format a byte count in a human-readable way.
#[allow(clippy::cast_precision_loss)]
fn human_size(size: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;
    if size >= MB {
        format!("{:.1} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else {
        format!("{size} B")
    }
}
