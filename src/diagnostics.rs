//! Injectable diagnostics.
//!
//! Everything the pipeline has to say (rejected parameters, ambiguity warnings,
//! stage timings) goes through a [`DiagnosticsSink`] instead of a global logger,
//! so embedding code and tests can observe it directly.

use log::Level;
use std::time::Instant;

pub const TARGET: &str = "fringes";

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub level: Level,
    pub stage: &'static str,
    pub message: String,
}

pub trait DiagnosticsSink: Send {
    fn record(&mut self, event: Event);

    fn warn(&mut self, stage: &'static str, message: String) {
        self.record(Event { level: Level::Warn, stage, message });
    }

    fn info(&mut self, stage: &'static str, message: String) {
        self.record(Event { level: Level::Info, stage, message });
    }

    fn debug(&mut self, stage: &'static str, message: String) {
        self.record(Event { level: Level::Debug, stage, message });
    }
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn record(&mut self, event: Event) {
        log::log!(target: TARGET, event.level, "{}: {}", event.stage, event.message);
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.level == Level::Warn)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.events.iter().any(|e| e.stage == stage)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl DiagnosticsSink for EventLog {
    fn record(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Hands each event to a user closure.
pub struct CallbackSink<F>(pub F);

impl<F> DiagnosticsSink for CallbackSink<F>
where
    F: FnMut(&Event) + Send,
{
    fn record(&mut self, event: Event) {
        (self.0)(&event);
    }
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn record(&mut self, event: Event) {
        (**self).record(event);
    }
}

/// Wall time of a pipeline stage, reported as a debug event.
pub(crate) struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    pub(crate) fn start(stage: &'static str) -> Self {
        Self { stage, start: Instant::now() }
    }

    pub(crate) fn finish(self, sink: &mut dyn DiagnosticsSink) {
        let ms = self.start.elapsed().as_secs_f64() * 1e3;
        sink.debug(self.stage, format!("{ms:.2} ms"));
    }
}
