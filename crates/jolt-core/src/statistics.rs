use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated wait times as reported by `/api/v1/statistics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Statistics {
    #[serde(default)]
    pub tasks: Metrics,
    #[serde(default)]
    pub routing_keys: BTreeMap<String, Metrics>,
    #[serde(default)]
    pub workers: BTreeMap<String, BaseMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct WaitTime {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub median: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct BaseMetrics {
    #[serde(default)]
    pub wait_time: WaitTime,
    #[serde(default)]
    pub running: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub passed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Metrics {
    #[serde(flatten)]
    pub base: BaseMetrics,
    #[serde(default)]
    pub queued: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_statistics_payload() {
        let raw = r#"{
            "Tasks": {
                "WaitTime": {"Min": 0.5, "Max": 12.0, "Mean": 4.25, "Median": 3.0},
                "Running": 2, "Failed": 1, "Passed": 5, "Queued": 3
            },
            "RoutingKeys": {
                "linux": {"WaitTime": {"Min": 1, "Max": 2, "Mean": 1.5, "Median": 1.5},
                          "Running": 1, "Failed": 0, "Passed": 1, "Queued": 0}
            },
            "Workers": {
                "w1": {"WaitTime": {"Min": 0, "Max": 0, "Mean": 0, "Median": 0},
                       "Running": 1, "Failed": 0, "Passed": 2}
            }
        }"#;
        let stats: Statistics = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.tasks.queued, 3);
        assert_eq!(stats.tasks.base.running, 2);
        assert_eq!(stats.tasks.base.wait_time.mean, 4.25);
        assert_eq!(stats.routing_keys["linux"].base.passed, 1);
        assert_eq!(stats.workers["w1"].passed, 2);
    }

    #[test]
    fn missing_sections_default_to_zero() {
        let stats: Statistics = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, Statistics::default());
    }
}
