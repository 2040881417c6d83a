use crate::app::ports::CalendarAdapter;
use crate::config::ParserConfig;
use crate::error::{Result, ScraperError};
use crate::metrics::PipelineMetrics;
use crate::pipeline::analysis::{event_to_stored, reconcile, Decision};
use crate::types::{Event, StoredCalendarEvent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// File-backed calendar: one pretty-printed JSON array of stored entries.
///
/// Each incoming event is reconciled against what is already on disk, so
/// re-running a job updates entries in place instead of duplicating them.
pub struct JsonCalendarStore {
    path: PathBuf,
    // Serializes load-modify-save cycles
    lock: Mutex<()>,
}

impl JsonCalendarStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored entries; a missing file is an empty calendar
    pub async fn load(&self) -> Result<Vec<StoredCalendarEvent>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &[StoredCalendarEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CalendarAdapter for JsonCalendarStore {
    async fn add_to_calendar(&self, events: &[Event], config: &ParserConfig) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut stored = self.load().await?;
        let mut written = 0;

        for candidate in events {
            let reconciled = reconcile(candidate, &stored);
            match (reconciled.analysis.decision, reconciled.analysis.existing) {
                (Decision::Merge, Some(index)) => {
                    let id = stored[index].id.clone();
                    let Some(entry) = event_to_stored(&reconciled.event, id) else {
                        warn!("Merged \"{}\" has no start date; keeping stored entry", candidate.title);
                        continue;
                    };
                    debug!(
                        "Merged \"{}\": {} added, {} updated, {} preserved",
                        candidate.title,
                        reconciled.diff.added.len(),
                        reconciled.diff.updated.len(),
                        reconciled.diff.preserved.len()
                    );
                    stored[index] = entry;
                    PipelineMetrics::record_reconcile("merge");
                }
                (decision, _) => {
                    let Some(entry) = event_to_stored(&reconciled.event, Uuid::new_v4().to_string()) else {
                        warn!("Skipping \"{}\": no start date", candidate.title);
                        continue;
                    };
                    stored.push(entry);
                    PipelineMetrics::record_reconcile(if decision == Decision::Conflict { "conflict" } else { "new" });
                }
            }
            written += 1;
        }

        self.save(&stored).await.map_err(|e| {
            ScraperError::Calendar(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        info!(
            "📅 {}: wrote {} event(s) to {} ({} stored)",
            config.name,
            written,
            self.path.display(),
            stored.len()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candidate(title: &str, venue: &str, description: Option<&str>) -> Event {
        let mut event = Event::new(title, "generic");
        event.start_date = Some(Utc.with_ymd_and_hms(2031, 5, 2, 21, 0, 0).unwrap());
        event.end_date = Some(Utc.with_ymd_and_hms(2031, 5, 3, 2, 0, 0).unwrap());
        event.venue = Some(venue.to_string());
        event.description = description.map(str::to_string);
        event.address = Some("4219 Santa Monica Blvd, Los Angeles, CA 90029".to_string());
        event.city = Some("la".to_string());
        event.key = Some(crate::pipeline::dedup::create_event_key(&event));
        event
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCalendarStore::new(dir.path().join("nested/calendar.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_merges_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCalendarStore::new(dir.path().join("nested/calendar.json"));
        let config = ParserConfig::new("eagle", "generic", vec![]);

        let first = candidate("Bear Happy Hour", "Eagle LA", None);
        assert_eq!(store.add_to_calendar(&[first], &config).await.unwrap(), 1);
        let stored = store.load().await.unwrap();
        assert_eq!(stored.len(), 1);
        let id = stored[0].id.clone();

        let second = candidate("Bear Happy Hour", "Eagle LA", Some("Two for one drinks"));
        assert_eq!(store.add_to_calendar(&[second], &config).await.unwrap(), 1);
        let stored = store.load().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert!(stored[0].notes.contains("Two for one drinks"));
    }

    #[tokio::test]
    async fn test_unrelated_events_are_added() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCalendarStore::new(dir.path().join("calendar.json"));
        let config = ParserConfig::new("eagle", "generic", vec![]);

        let mut later = candidate("Cub Night", "Eagle LA", None);
        later.start_date = later.start_date.map(|d| d + Duration::days(7));
        later.end_date = later.end_date.map(|d| d + Duration::days(7));
        later.key = Some(crate::pipeline::dedup::create_event_key(&later));

        let written = store
            .add_to_calendar(&[candidate("Bear Happy Hour", "Eagle LA", None), later], &config)
            .await
            .unwrap();
        assert_eq!(written, 2);
        let stored = store.load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }
}
