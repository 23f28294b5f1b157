//! Progress reporting using indicatif progress bars

use avrisp_core::flash::{ReadProgress, UploadProgress, UploadStats};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for upload and verify
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, phase: &'static str) {
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} pages ({{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    pub fn create_spinner(&mut self, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    fn inc(&self) {
        if let Some(pb) = &self.current_bar {
            pb.inc(1);
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadProgress for IndicatifProgress {
    fn erasing(&mut self) {
        self.create_spinner("Erasing chip...".to_string());
    }

    fn programming_fuses(&mut self) {
        self.finish("Erase complete");
        self.create_spinner("Programming fuses...".to_string());
    }

    fn writing(&mut self, total_pages: u32) {
        self.finish("Fuses programmed");
        self.create_bar(total_pages as u64, "Writing");
    }

    fn page_done(&mut self, _address: u32, _written: bool) {
        self.inc();
    }

    fn locking(&mut self) {
        self.finish("Write complete");
        self.create_spinner("Programming lock bits...".to_string());
    }

    fn complete(&mut self, stats: &UploadStats) {
        self.finish("Chip locked");
        println!(
            "{} page(s) written, {} blank page(s) skipped",
            stats.pages_written, stats.pages_skipped
        );
    }
}

impl ReadProgress for IndicatifProgress {
    fn reading(&mut self, total_pages: u32) {
        self.create_bar(total_pages as u64, "Verifying");
    }

    fn page_read(&mut self, _address: u32) {
        self.inc();
    }
}
