//! Ledger of banners that have already been announced.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{BannerRecord, StableId};

/// One announced banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncedBanner {
    pub stable_id: StableId,
    pub display_name: String,
    pub announced_at: DateTime<Utc>,
}

/// Announced banner ids, backed by an append-only JSONL file.
pub struct AnnouncementLedger {
    writer: JsonlWriter<AnnouncedBanner>,
    seen: HashSet<StableId>,
}

impl AnnouncementLedger {
    /// Load the ledger from the configured state directory.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let path = config.announced_path();
        let entries = JsonlReader::<AnnouncedBanner>::new(path.clone()).read_all()?;
        let seen = entries.into_iter().map(|entry| entry.stable_id).collect();

        Ok(Self {
            writer: JsonlWriter::new(path),
            seen,
        })
    }

    pub fn is_announced(&self, id: &StableId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Banners from `banners` whose ids are not in the ledger, deduplicated.
    pub fn unannounced<'a>(&self, banners: impl IntoIterator<Item = &'a BannerRecord>) -> Vec<&'a BannerRecord> {
        let mut batch = HashSet::new();
        banners
            .into_iter()
            .filter(|banner| !self.is_announced(&banner.stable_id))
            .filter(|banner| batch.insert(banner.stable_id.clone()))
            .collect()
    }

    /// Record banners as announced. Already-known ids are skipped.
    pub fn record(&mut self, banners: &[&BannerRecord], at: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut entries = Vec::new();
        for banner in banners {
            if self.seen.insert(banner.stable_id.clone()) {
                entries.push(AnnouncedBanner {
                    stable_id: banner.stable_id.clone(),
                    display_name: banner.display_name.clone(),
                    announced_at: at,
                });
            }
        }

        self.writer.append_batch(&entries)
    }
}
