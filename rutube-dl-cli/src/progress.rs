use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use vodl_engine::ProgressSink;

const TEMPLATE: &str =
    "{span_child_prefix}{spinner:.yellow} [{bar:30.yellow/white}] {pos}/{len} segments {msg}";

/// Segment counter rendered as an indicatif bar on a tracing span.
///
/// Without an `IndicatifLayer` installed every call is a no-op.
pub struct SpanProgress {
    span: Span,
    label: String,
}

impl SpanProgress {
    pub fn new(span: Span, label: impl Into<String>) -> Self {
        Self {
            span,
            label: label.into(),
        }
    }
}

impl ProgressSink for SpanProgress {
    fn start(&self, total: u64) {
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            self.span.pb_set_style(&style.progress_chars("=> "));
        }
        self.span.pb_set_message(&self.label);
        self.span.pb_set_length(total);
        self.span.pb_set_position(0);
    }

    fn tick(&self) {
        self.span.pb_inc(1);
    }

    fn finish(&self) {
        self.span.pb_set_finish_message(&self.label);
    }
}
