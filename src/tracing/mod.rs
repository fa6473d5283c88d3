//! Forwarding `tracing` events into reporter logs.
//!
//! Install [`ReporterLayer`] next to your usual subscriber layers and every
//! event recorded during a run lands in the reporters' captured logs:
//! `ERROR` events in the error logs, everything else up to the configured
//! level in the regular logs. Events from this crate itself are ignored.
//!
//! ```rust,ignore
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let tool = Tool::new(ToolOptions::new("deploy"), Environment::detect());
//! tracing_subscriber::registry()
//!     .with(reporter_layer(tool.emitter()))
//!     .init();
//!
//! tool.run(pipeline)?;
//! ```

mod layer;

pub use layer::{ReporterLayer, reporter_layer};
