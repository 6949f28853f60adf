//! Verse reference resolver
//!
//! **Responsibilities:**
//! - Cache `SurahAudioData` per surah for the lifetime of a session
//! - Guarantee a single in-flight fetch per surah; concurrent loads share it
//! - Turn a `VerseRef` plus reciter into a concrete `PlaybackUnit`
//!
//! A fetch settles its own cache entry when it completes: success stores
//! the data, failure removes the entry so the next load retries. Entries
//! dropped by [`SurahCache::clear_except`] while a fetch is in flight are
//! not resurrected when that fetch completes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tilawah_common::{SurahAudioData, VerseRef};
use tracing::debug;

use super::state::PlaybackUnit;
use crate::provider::{FetchError, SurahDataProvider};

/// Result of a surah load, shareable between waiters
pub type SurahLoad = Result<Arc<SurahAudioData>, FetchError>;

/// Future of a surah load; clones all resolve to the same result
pub type SharedLoad = Shared<BoxFuture<'static, SurahLoad>>;

enum CacheEntry {
    Ready(Arc<SurahAudioData>),
    InFlight { id: u64, load: SharedLoad },
}

#[derive(Default)]
struct Entries {
    map: HashMap<u16, CacheEntry>,
    next_id: u64,
}

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session cache of surah audio data
#[derive(Clone)]
pub struct SurahCache {
    provider: Arc<dyn SurahDataProvider>,
    entries: Arc<Mutex<Entries>>,
}

impl SurahCache {
    pub fn new(provider: Arc<dyn SurahDataProvider>) -> Self {
        Self {
            provider,
            entries: Arc::new(Mutex::new(Entries::default())),
        }
    }

    /// Data for a surah if it is already loaded
    pub fn get(&self, surah_number: u16) -> Option<Arc<SurahAudioData>> {
        match lock(&self.entries).map.get(&surah_number) {
            Some(CacheEntry::Ready(data)) => Some(Arc::clone(data)),
            _ => None,
        }
    }

    pub fn is_loading(&self, surah_number: u16) -> bool {
        matches!(
            lock(&self.entries).map.get(&surah_number),
            Some(CacheEntry::InFlight { .. })
        )
    }

    /// Number of loaded surahs
    pub fn len(&self) -> usize {
        lock(&self.entries)
            .map
            .values()
            .filter(|e| matches!(e, CacheEntry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a surah, joining an in-flight fetch or starting a new one.
    ///
    /// The returned future must be polled for the fetch to make progress.
    pub fn load(&self, surah_number: u16) -> SharedLoad {
        let mut entries = lock(&self.entries);

        match entries.map.get(&surah_number) {
            Some(CacheEntry::Ready(data)) => {
                debug!("Surah {} served from cache", surah_number);
                let data = Arc::clone(data);
                return futures::future::ready(Ok(data)).boxed().shared();
            }
            Some(CacheEntry::InFlight { load, .. }) => {
                debug!("Joining in-flight fetch for surah {}", surah_number);
                return load.clone();
            }
            None => {}
        }

        let id = entries.next_id;
        entries.next_id += 1;

        let provider = Arc::clone(&self.provider);
        let weak: Weak<Mutex<Entries>> = Arc::downgrade(&self.entries);

        let load = async move {
            let result = provider
                .fetch_surah_detail(surah_number)
                .await
                .map(Arc::new);

            if let Some(entries) = weak.upgrade() {
                let mut entries = lock(&entries);
                let owned = matches!(
                    entries.map.get(&surah_number),
                    Some(CacheEntry::InFlight { id: current, .. }) if *current == id
                );
                if owned {
                    match &result {
                        Ok(data) => {
                            entries
                                .map
                                .insert(surah_number, CacheEntry::Ready(Arc::clone(data)));
                        }
                        Err(_) => {
                            entries.map.remove(&surah_number);
                        }
                    }
                }
            }

            result
        }
        .boxed()
        .shared();

        entries.map.insert(
            surah_number,
            CacheEntry::InFlight {
                id,
                load: load.clone(),
            },
        );
        debug!("Started fetch for surah {}", surah_number);
        load
    }

    /// Drop every entry except `keep`
    pub fn clear_except(&self, keep: Option<u16>) {
        let mut entries = lock(&self.entries);
        let before = entries.map.len();
        entries.map.retain(|surah, _| Some(*surah) == keep);
        debug!(
            "Surah cache cleared ({} entries dropped, kept {:?})",
            before - entries.map.len(),
            keep
        );
    }
}

/// Outcome of resolving a verse for a reciter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unit(PlaybackUnit),
    /// The reciter has no clip for this verse
    NotFound,
}

/// Resolves verse references to playable units
#[derive(Clone)]
pub struct VerseResolver {
    cache: SurahCache,
}

impl VerseResolver {
    pub fn new(cache: SurahCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &SurahCache {
        &self.cache
    }

    /// Resolve a verse, fetching its surah if needed
    pub async fn resolve(
        &self,
        verse: VerseRef,
        reciter_id: &str,
    ) -> Result<Resolution, FetchError> {
        let data = self.cache.load(verse.surah_number()).await?;
        Ok(Self::resolve_in(&data, verse, reciter_id))
    }

    /// Resolve against already loaded data
    pub fn resolve_in(data: &SurahAudioData, verse: VerseRef, reciter_id: &str) -> Resolution {
        match data.clip_url(verse.verse_in_surah(), reciter_id) {
            Some(url) => Resolution::Unit(PlaybackUnit::Verse {
                verse,
                url: url.to_string(),
            }),
            None => Resolution::NotFound,
        }
    }

    /// Opening formula unit of a surah for a reciter, if it has one
    pub fn opening_formula_in(data: &SurahAudioData, reciter_id: &str) -> Option<PlaybackUnit> {
        data.opening_formula_url(reciter_id)
            .map(|url| PlaybackUnit::OpeningFormula {
                surah_number: data.surah_number,
                url: url.to_string(),
            })
    }
}
