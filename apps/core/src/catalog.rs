use crate::aggregate::{aggregate, DedupPolicy};
use crate::cache_store::{self, CacheStore};
use crate::config::Config;
use crate::loader::{self, DataSource, LoadCompletion};
use crate::model::{CanonicalRecord, RawRecord};
use crate::normalize::Normalizer;
use crate::search::{SearchIndex, SearchLimits, SearchOutcome, SearchTier};

pub const PRICES_CACHE_KEY: &str = "gestock:precios:v1";

/// Everything that differs between the label generator and the price lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProfile {
    pub name: &'static str,
    pub policy: DedupPolicy,
    pub tier: SearchTier,
    pub limits: SearchLimits,
    /// Drop rows whose resolved name is empty.
    pub require_name: bool,
    pub cache_key: Option<&'static str>,
    /// Keep a diagnostic message after a failed load.
    pub surface_errors: bool,
}

impl CatalogProfile {
    pub fn labels(cfg: &Config) -> Self {
        Self {
            name: "labels",
            policy: DedupPolicy::MostRecentByName,
            tier: SearchTier::FuzzyWithFallback {
                threshold: cfg.fuzzy_threshold,
            },
            limits: SearchLimits {
                browse_min_chars: 2,
                browse_limit: cfg.browse_limit,
                display_limit: cfg.display_limit,
            },
            require_name: true,
            cache_key: None,
            surface_errors: false,
        }
    }

    pub fn prices(cfg: &Config) -> Self {
        Self {
            name: "prices",
            policy: DedupPolicy::MaxPrice,
            tier: SearchTier::ExactOnly,
            limits: SearchLimits {
                browse_min_chars: 1,
                browse_limit: cfg.display_limit,
                display_limit: cfg.display_limit,
            },
            require_name: false,
            cache_key: Some(PRICES_CACHE_KEY),
            surface_errors: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOrigin {
    Cache,
    Source,
}

/// Raw rows → canonical records → one record per dedup key.
pub fn build_dataset(
    rows: &[RawRecord],
    profile: &CatalogProfile,
    normalizer: &Normalizer,
) -> Vec<CanonicalRecord> {
    let canonical: Vec<CanonicalRecord> = rows
        .iter()
        .map(|row| CanonicalRecord::from_raw(row, normalizer))
        .filter(|record| !profile.require_name || !record.name().is_empty())
        .collect();
    aggregate(canonical, profile.policy)
}

/// One feature's dataset plus its search index and optional persisted cache.
pub struct Catalog {
    profile: CatalogProfile,
    normalizer: Normalizer,
    index: SearchIndex,
    cache: Option<Box<dyn CacheStore>>,
    last_error: Option<String>,
}

impl Catalog {
    pub fn new(profile: CatalogProfile) -> Self {
        Self::with_normalizer(profile, Normalizer::default())
    }

    pub fn with_normalizer(profile: CatalogProfile, normalizer: Normalizer) -> Self {
        let index = SearchIndex::empty(profile.tier, profile.limits, normalizer);
        Self {
            profile,
            normalizer,
            index,
            cache: None,
            last_error: None,
        }
    }

    pub fn with_cache(mut self, store: Box<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn profile(&self) -> &CatalogProfile {
        &self.profile
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        self.index.records()
    }

    pub fn loaded_count(&self) -> usize {
        self.index.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn cache(&self) -> Option<&dyn CacheStore> {
        self.cache.as_deref()
    }

    /// Restores the cached dataset if there is one, otherwise loads `default_source`.
    pub fn start(&mut self, default_source: &DataSource) -> StartOrigin {
        if self.restore_from_cache() {
            return StartOrigin::Cache;
        }
        self.load(default_source);
        StartOrigin::Source
    }

    /// True when a readable cache entry was installed. Corrupt entries count as absent.
    pub fn restore_from_cache(&mut self) -> bool {
        let (Some(store), Some(key)) = (self.cache.as_deref(), self.profile.cache_key) else {
            return false;
        };

        match cache_store::read_dataset(store, key, &self.normalizer) {
            Ok(Some(records)) => {
                log::info!(
                    "{} restored {} records from cache",
                    self.profile.name,
                    records.len()
                );
                self.replace_index(records);
                true
            }
            Ok(None) => false,
            Err(error) => {
                log::warn!("{} ignoring unreadable cache: {error}", self.profile.name);
                false
            }
        }
    }

    /// Loads synchronously and installs the outcome. Returns the loaded count.
    pub fn load(&mut self, source: &DataSource) -> usize {
        let completion = LoadCompletion {
            origin: source.label(),
            result: loader::load(source),
        };
        self.install(completion)
    }

    /// Installs a finished load. Last completion wins; a failed one leaves an empty dataset.
    pub fn install(&mut self, completion: LoadCompletion) -> usize {
        match completion.result {
            Ok(rows) => {
                let records = build_dataset(&rows, &self.profile, &self.normalizer);
                log::info!(
                    "{} loaded {} rows from {} into {} records",
                    self.profile.name,
                    rows.len(),
                    completion.origin,
                    records.len()
                );
                self.last_error = None;
                self.persist(&records);
                self.replace_index(records);
            }
            Err(error) => {
                log::warn!("{} load failed: {error}", self.profile.name);
                self.last_error = self.profile.surface_errors.then(|| error.to_string());
                self.replace_index(Vec::new());
            }
        }
        self.loaded_count()
    }

    /// Drops the dataset and its cache entry.
    pub fn clear(&mut self) {
        self.replace_index(Vec::new());
        self.last_error = None;
        if let (Some(store), Some(key)) = (self.cache.as_deref_mut(), self.profile.cache_key) {
            if let Err(error) = store.remove(key) {
                log::warn!("{} failed to clear cache: {error}", self.profile.name);
            }
        }
    }

    pub fn search(&self, query: &str) -> SearchOutcome<'_> {
        self.index.search(query)
    }

    fn persist(&mut self, records: &[CanonicalRecord]) {
        let (Some(store), Some(key)) = (self.cache.as_deref_mut(), self.profile.cache_key) else {
            return;
        };
        if let Err(error) = cache_store::write_dataset(store, key, records) {
            log::warn!("{} failed to write cache: {error}", self.profile.name);
        }
    }

    fn replace_index(&mut self, records: Vec<CanonicalRecord>) {
        self.index = SearchIndex::build(
            records,
            self.profile.tier,
            self.profile.limits,
            self.normalizer,
        );
    }
}
