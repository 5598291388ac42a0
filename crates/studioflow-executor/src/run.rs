//! Run values and the records they leave behind.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Final outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
  Success,
  Failed,
}

/// A single execution of a graph, threaded through the orchestrator.
#[derive(Debug)]
pub struct Run {
  pub id: Uuid,
  pub started_at: DateTime<Utc>,
  started: tokio::time::Instant,
  /// Node outputs in completion order.
  pub results: Map<String, Value>,
  pub errors: BTreeMap<String, String>,
}

impl Run {
  pub fn start() -> Self {
    Self {
      id: Uuid::new_v4(),
      started_at: Utc::now(),
      started: tokio::time::Instant::now(),
      results: Map::new(),
      errors: BTreeMap::new(),
    }
  }

  /// Close the run.
  pub fn finish(self, status: RunOutcome) -> RunRecord {
    RunRecord {
      id: self.id,
      started_at: self.started_at,
      duration: self.started.elapsed(),
      status,
      results: self.results,
      errors: self.errors,
    }
  }
}

/// Summary of a finished run, kept in the execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
  pub id: Uuid,
  pub started_at: DateTime<Utc>,
  #[serde(with = "duration_ms")]
  pub duration: Duration,
  pub status: RunOutcome,
  pub results: Map<String, Value>,
  pub errors: BTreeMap<String, String>,
}

mod duration_ms {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test(start_paused = true)]
  async fn test_record_serialization() {
    let mut run = Run::start();
    run.results.insert("p".to_string(), json!("a cat"));
    run.errors.insert("gen".to_string(), "bad prompt".to_string());
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let record = run.finish(RunOutcome::Failed);
    assert_eq!(record.duration, Duration::from_millis(1500));

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["duration"], 1500);
    assert_eq!(value["status"], "failed");
    assert_eq!(value["results"]["p"], "a cat");
    assert!(value.get("startedAt").is_some());

    let back: RunRecord = serde_json::from_value(value).unwrap();
    assert_eq!(back, record);
  }
}
