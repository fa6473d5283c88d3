use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::emitter::Emitter;
use crate::ToolEvent;

/// Target of the crate's own diagnostics, and of its modules with `::`.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// A `tracing` [`Layer`] that turns events into `log` / `log.error` events.
#[derive(Debug, Clone)]
pub struct ReporterLayer {
    emitter: Emitter,
    level: Level,
}

/// Creates a [`ReporterLayer`] forwarding `INFO` and above into `emitter`.
pub fn reporter_layer(emitter: Emitter) -> ReporterLayer {
    ReporterLayer::new(emitter)
}

impl ReporterLayer {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            level: Level::INFO,
        }
    }

    /// Most verbose level still forwarded.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl<S> Layer<S> for ReporterLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) || *metadata.level() > self.level {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.finish();

        if *metadata.level() == Level::ERROR {
            self.emitter.emit(ToolEvent::LogError(message));
        } else {
            self.emitter.emit(ToolEvent::Log(message));
        }
    }
}

/// Collects the `message` field followed by `key=value` for the rest.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields.join(" "),
            (false, false) => format!("{} {}", self.message, self.fields.join(" ")),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
