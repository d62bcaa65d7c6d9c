//! Stage spinners
//!
//! On a terminal each pipeline stage gets one spinner line. Elsewhere the
//! bars are hidden and log lines carry the progress.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Stage spinners on a shared `MultiProgress`, or nothing off a TTY.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Draws only when stderr is a terminal.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    pub fn hidden() -> Self {
        Self::with_tty(false)
    }

    fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Spinner line labelled `stage`; the message carries the detail
    /// (`NY.GDP.PCAP.CD page 3/12`, `country (217 rows)`). Hidden off a TTY.
    pub fn stage_line(&self, stage: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{spinner:.green} {prefix:<8.cyan.bold} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = self.multi.add(ProgressBar::new_spinner().with_style(style));
        pb.set_prefix(stage.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Print above the spinners, or to stderr when there are none.
    pub fn println(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        if !self.is_tty || self.multi.println(msg).is_err() {
            eprintln!("{msg}");
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `1234567` → `1,234,567`
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
