//! Span and event helpers for fusion stages.
//!
//! Call sites are written once, `let _span = trace_span!("fuse", views = n).entered();`
//! and `trace_event!("chunks_planned", chunks = k);`, and the `tracing`
//! feature decides at expansion time whether anything is recorded. Without
//! the feature spans become `DisabledSpan` and event fields are evaluated
//! and dropped.

macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {{
        #[cfg(feature = "tracing")]
        let span = ::tracing::info_span!($name $(, $($field)*)?);
        #[cfg(not(feature = "tracing"))]
        let span = $crate::trace::DisabledSpan;
        span
    }};
}

macro_rules! trace_event {
    ($name:expr) => {{
        #[cfg(feature = "tracing")]
        ::tracing::info!(name: $name);
    }};
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        #[cfg(feature = "tracing")]
        ::tracing::info!(name: $name, $($key = $value),+);
        #[cfg(not(feature = "tracing"))]
        let _ = ($($value,)+);
    }};
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Stage span when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    /// Stands in for `tracing::Span::entered`; the guard does nothing.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
