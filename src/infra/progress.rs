// ============================================================
// Layer 6 — Progress Bars
// ============================================================
// One bar per epoch, cleared when the epoch ends. The message
// carries the previous epoch's metrics so the latest numbers
// stay on screen while the next epoch runs.

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>5}/{len:5} {msg}";

pub fn epoch_bar(batches: usize, epoch: usize, epochs: usize, postfix: &str) -> ProgressBar {
    let pb = ProgressBar::new(batches as u64);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_prefix(format!("Epoch [{epoch}/{epochs}]"));
    pb.set_message(postfix.to_string());
    pb
}
