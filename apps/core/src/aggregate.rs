use std::collections::HashMap;

use crate::model::CanonicalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Keyed by normalized name; the latest valid `lastUpdated` wins.
    MostRecentByName,
    /// Keyed by business key; the strictly highest parsed price wins.
    MaxPrice,
}

impl DedupPolicy {
    pub fn dedup_key(&self, record: &CanonicalRecord) -> Option<String> {
        match self {
            Self::MostRecentByName => {
                let key = record.normalized_name();
                (!key.is_empty()).then(|| key.to_string())
            }
            Self::MaxPrice => Some(record.business_key().as_str().to_string()),
        }
    }

    fn rank(&self, record: &CanonicalRecord) -> Rank {
        match self {
            Self::MostRecentByName => Rank::Timestamp(record.timestamp_millis()),
            Self::MaxPrice => Rank::Price(record.price_amount()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rank {
    Timestamp(Option<i64>),
    Price(f64),
}

impl Rank {
    fn replaces(&self, kept: &Rank) -> bool {
        match (self, kept) {
            (Rank::Timestamp(Some(incoming)), Rank::Timestamp(Some(current))) => {
                incoming >= current
            }
            (Rank::Timestamp(Some(_)), Rank::Timestamp(None)) => true,
            (Rank::Timestamp(None), _) => false,
            (Rank::Price(incoming), Rank::Price(current)) => incoming > current,
            _ => false,
        }
    }
}

/// Collapses records sharing a dedup key in one pass. Output keeps the order in
/// which each key was first seen.
pub fn aggregate(records: Vec<CanonicalRecord>, policy: DedupPolicy) -> Vec<CanonicalRecord> {
    let mut slots: Vec<(CanonicalRecord, Rank)> = Vec::new();
    let mut slot_by_key: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let Some(key) = policy.dedup_key(&record) else {
            continue;
        };
        let rank = policy.rank(&record);

        match slot_by_key.get(&key) {
            Some(&slot) => {
                if rank.replaces(&slots[slot].1) {
                    slots[slot] = (record, rank);
                }
            }
            None => {
                slot_by_key.insert(key, slots.len());
                slots.push((record, rank));
            }
        }
    }

    slots.into_iter().map(|(record, _)| record).collect()
}
