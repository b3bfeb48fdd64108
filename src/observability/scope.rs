//! Begin/complete event pairs around bulk work
//!
//! A scope logs `{name}_BEGIN` when opened and `{name}_COMPLETE` with a
//! `duration_ms` field when completed. A scope that is dropped first (a
//! panic during a frozen build, say) logs `{name}_INCOMPLETE` at WARN.

use std::time::Instant;

use super::logger::{Logger, Severity};

/// Paired begin/complete logging for one operation.
///
/// ```ignore
/// let scope = ObservationScope::with_fields("FROZEN_BUILD", &[("objects", "1000")]);
/// let indexes = build_all();
/// scope.complete_with_fields(&[("distinct_values", "73")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    /// Repeated on the closing event so it can be read on its own
    fields: Vec<(&'a str, String)>,
    timer: Timer,
    open: bool,
}

impl<'a> ObservationScope<'a> {
    /// Open a scope carrying `fields`
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        if Logger::enabled(Severity::Info) {
            Logger::info(&format!("{}_BEGIN", name), fields);
        }
        Self {
            name,
            fields: fields.iter().map(|&(k, v)| (k, v.to_owned())).collect(),
            timer: Timer::new(),
            open: true,
        }
    }

    /// Close the scope, adding fields known only at the end
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.open = false;
        if !Logger::enabled(Severity::Info) {
            return;
        }
        let duration = self.timer.elapsed_ms();
        let fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(extra_fields.iter().copied())
            .chain([("duration_ms", duration.as_str())])
            .collect();
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if self.open {
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &[]);
        }
    }
}

/// Wall-clock stopwatch for `duration_ms`
#[derive(Debug, Clone, Copy)]
struct Timer {
    start: Instant,
}

impl Timer {
    /// Start timing now
    fn new() -> Self {
        Self { start: Instant::now() }
    }

    /// Whole milliseconds since creation, formatted for a log field
    fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_closes_scope() {
        let scope = ObservationScope::with_fields("FROZEN_BUILD", &[("objects", "3")]);
        assert!(scope.open);
        assert_eq!(scope.fields, vec![("objects", "3".to_string())]);
        scope.complete_with_fields(&[("attributes", "2")]);
    }

    #[test]
    fn test_dropped_scope_is_open() {
        let scope = ObservationScope::with_fields("FROZEN_BUILD", &[]);
        assert!(scope.open);
        drop(scope);
    }

    #[test]
    fn test_timer_advances() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 5);
    }
}
