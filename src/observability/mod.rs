//! Observability for the election
//!
//! Structured JSON-lines logging of typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails or blocks the election
//! 3. One event per line, deterministic field order
//!
//! # Usage
//!
//! ```ignore
//! use podlock::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::BecameLeader, &[("lock", "my-lock")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a lifecycle event at WARN
pub fn warn_event(event: Event, fields: &[(&str, &str)]) {
    Logger::warn(event.as_str(), fields);
}

/// Log a lifecycle event at ERROR
pub fn error_event(event: Event, fields: &[(&str, &str)]) {
    Logger::error(event.as_str(), fields);
}
