use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use volmetrics_core::eval::report::{final_lines, interim_lines};
use volmetrics_core::eval::{EvalSummary, ProgressReporter, SliceRecord, Snapshot};

const SEPARATOR_WIDTH: usize = 54;

/// Progress bar with interim averages printed above it, plus optional
/// per-slice CSV.
pub struct ConsoleReporter {
    bar: ProgressBar,
    csv: Option<Mutex<CsvSink>>,
}

struct CsvSink {
    writer: BufWriter<File>,
    /// First write failure; reported once the run ends.
    error: Option<std::io::Error>,
}

impl CsvSink {
    fn write_line(&mut self, line: std::fmt::Arguments<'_>) {
        if self.error.is_none() {
            if let Err(e) = self.writer.write_fmt(line) {
                self.error = Some(e);
            }
        }
    }
}

impl ConsoleReporter {
    pub fn new(per_slice_csv: Option<&Path>) -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len} ({eta})")?
                .progress_chars("=> "),
        );
        bar.set_message("Evaluating slices");

        let csv = match per_slice_csv {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Some(Mutex::new(CsvSink {
                    writer: BufWriter::new(file),
                    error: None,
                }))
            }
            None => None,
        };

        Ok(Self { bar, csv })
    }

    /// Flush the CSV sink and surface any write error from the run.
    pub fn close(self) -> Result<()> {
        self.bar.finish_and_clear();
        if let Some(csv) = self.csv {
            let mut sink = csv
                .into_inner()
                .map_err(|_| anyhow::anyhow!("CSV writer lock poisoned"))?;
            if let Some(e) = sink.error.take() {
                return Err(e).context("Failed to write per-slice CSV");
            }
            sink.writer.flush().context("Failed to flush per-slice CSV")?;
        }
        Ok(())
    }
}

impl ProgressReporter for ConsoleReporter {
    fn begin(&self, total: usize) {
        self.bar.set_length(total as u64);
        if let Some(csv) = &self.csv {
            if let Ok(mut sink) = csv.lock() {
                sink.write_line(format_args!("index,i,j,psnr,ssim\n"));
            }
        }
    }

    fn slice(&self, record: &SliceRecord) {
        self.bar.inc(1);
        if let Some(csv) = &self.csv {
            if let Ok(mut sink) = csv.lock() {
                sink.write_line(format_args!(
                    "{},{},{},{},{}\n",
                    record.index, record.i, record.j, record.score.psnr, record.score.ssim
                ));
            }
        }
    }

    fn interim(&self, snapshot: &Snapshot) {
        for line in interim_lines(snapshot) {
            self.bar.println(line);
        }
        self.bar.println("-".repeat(SEPARATOR_WIDTH));
    }

    fn finish(&self, summary: &EvalSummary) {
        self.bar.finish_and_clear();
        let bold = Style::new().bold().green();
        println!();
        for line in final_lines(summary) {
            println!("{}", bold.apply_to(line));
        }
    }
}
