// SYNOID Forge Progress
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Fractional completion callback. Values are clamped to [0, 1] and may
// arrive out of order; callers only render them.

use std::sync::Arc;
use tokio::sync::mpsc;

type Sink = Arc<dyn Fn(f32) + Send + Sync>;

#[derive(Clone)]
pub struct Progress {
    sink: Option<Sink>,
    offset: f32,
    span: f32,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("attached", &self.sink.is_some())
            .field("offset", &self.offset)
            .field("span", &self.span)
            .finish()
    }
}

impl Progress {
    /// Drops every report.
    pub fn silent() -> Self {
        Self { sink: None, offset: 0.0, span: 1.0 }
    }

    pub fn new(callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self { sink: Some(Arc::new(callback)), offset: 0.0, span: 1.0 }
    }

    /// Bridge reports onto another task: the receiver is drained on the caller's side.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<f32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Self::new(move |value| {
            let _ = tx.send(value);
        });
        (progress, rx)
    }

    pub fn report(&self, fraction: f32) {
        if let Some(sink) = &self.sink {
            let local = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
            sink((self.offset + self.span * local).clamp(0.0, 1.0));
        }
    }

    /// A reporter whose [0, 1] maps onto [start, end] of this one.
    pub fn scoped(&self, start: f32, end: f32) -> Self {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(start, 1.0);
        Self {
            sink: self.sink.clone(),
            offset: self.offset + self.span * start,
            span: self.span * (end - start),
        }
    }
}
