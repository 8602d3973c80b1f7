use std::sync::{Mutex, MutexGuard, PoisonError};

use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];
const TEMPLATE: &str = "{spinner:.blue} {msg} [{bar:30.green/bright_black}] {pos}/{len} ({elapsed})";

/// Progress bar of the host being scanned. Backed by a span so that log
/// lines printed meanwhile are drawn above it.
pub struct ScanProgress {
    current: Mutex<Option<Span>>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    pub fn start(&self, label: &str, total: usize) {
        let span: Span = info_span!("scan");
        span.pb_set_style(&style());
        span.pb_set_length(total as u64);
        span.pb_set_message(label);
        span.pb_start();
        *self.current() = Some(span);
    }

    /// Called from the workers, once per finished task.
    pub fn advance(&self) {
        if let Some(span) = self.current().as_ref() {
            span.pb_inc(1);
        }
    }

    /// Closes the span, which clears the bar.
    pub fn finish(&self) {
        self.current().take();
    }

    fn current(&self) -> MutexGuard<'_, Option<Span>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(TICKS)
}
