//! Per-operation request statistics (spec §4.8 step 4): the dispatcher
//! counts every request against the endpoint's operation name and
//! records latency. No metrics/OpenTelemetry exporter is wired up here
//! (see `logging.rs`); this is a plain in-memory counter queryable by
//! an operator, the same ambient-observability shape the rest of this
//! crate uses `tracing` for.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct OperationStat {
    pub count: u64,
    pub total_duration: Duration,
}

impl OperationStat {
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_duration.as_secs_f64() * 1000.0 / self.count as f64
        }
    }
}

#[derive(Default)]
pub struct OperationStats {
    by_operation: Mutex<HashMap<String, OperationStat>>,
}

impl OperationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: &str, elapsed: Duration) {
        let mut by_operation = self.by_operation.lock().expect("operation stats poisoned");
        let entry = by_operation.entry(operation.to_string()).or_default();
        entry.count += 1;
        entry.total_duration += elapsed;
    }

    pub fn snapshot(&self) -> HashMap<String, OperationStat> {
        self.by_operation.lock().expect("operation stats poisoned").clone()
    }
}

/// Derive the operation name the dispatcher should count a request
/// against from its path tail, e.g. `/CodeSystem/$lookup` -> `$lookup`,
/// `/ValueSet/123` -> `ValueSet/read`, `/CodeSystem` -> `CodeSystem/search`.
pub fn operation_name(method: &str, path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if let Some(op_start) = trimmed.rfind('$') {
        return trimmed[op_start..].to_string();
    }
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    match segments.len() {
        0 => "metadata".to_string(),
        1 => format!("{}/search", segments[0]),
        _ => format!("{}/{}", segments[0], method.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_operation_name_from_dollar_path() {
        assert_eq!(operation_name("GET", "/CodeSystem/$lookup"), "$lookup");
        assert_eq!(operation_name("POST", "/CodeSystem/123/$validate-code"), "$validate-code");
    }

    #[test]
    fn falls_back_to_resource_and_verb() {
        assert_eq!(operation_name("GET", "/CodeSystem"), "CodeSystem/search");
        assert_eq!(operation_name("GET", "/CodeSystem/123"), "CodeSystem/get");
    }

    #[test]
    fn records_and_averages() {
        let stats = OperationStats::new();
        stats.record("$lookup", Duration::from_millis(10));
        stats.record("$lookup", Duration::from_millis(20));
        let snapshot = stats.snapshot();
        let stat = snapshot.get("$lookup").unwrap();
        assert_eq!(stat.count, 2);
        assert!((stat.average_ms() - 15.0).abs() < 0.001);
    }
}
