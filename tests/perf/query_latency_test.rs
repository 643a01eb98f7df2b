use std::time::Instant;

use crate::model::{CanonicalRecord, PriceValue, ProductFields};
use crate::normalize::Normalizer;
use crate::search::{SearchIndex, SearchLimits, SearchTier};

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

fn catalog(size: usize) -> Vec<CanonicalRecord> {
    let normalizer = Normalizer::default();
    let mut records: Vec<CanonicalRecord> = (0..size)
        .map(|i| {
            CanonicalRecord::from_fields(
                ProductFields {
                    item_code: format!("SKU-{i:05}"),
                    name: format!("Producto genérico {i:05} 500g"),
                    barcode: format!("779{i:010}"),
                    price: PriceValue::Text(format!("{},50", i % 900)),
                    last_updated: "2024-06-01".to_string(),
                },
                &normalizer,
            )
        })
        .collect();

    records.push(CanonicalRecord::from_fields(
        ProductFields {
            item_code: "K-1".to_string(),
            name: "Keto bastoncini 200g".to_string(),
            barcode: "7790000000001".to_string(),
            price: PriceValue::Text("1200".to_string()),
            last_updated: "2024-06-01".to_string(),
        },
        &normalizer,
    ));
    records
}

#[test]
fn warm_fuzzy_query_p95_under_budget() {
    let index = SearchIndex::build(
        catalog(10_000),
        SearchTier::FuzzyWithFallback { threshold: 0.4 },
        SearchLimits {
            browse_min_chars: 2,
            browse_limit: 30,
            display_limit: 50,
        },
        Normalizer::default(),
    );

    for _ in 0..5 {
        let _ = index.search("keto bastoni");
    }

    let mut batch_p95 = Vec::with_capacity(3);
    for _ in 0..3 {
        let mut samples = Vec::with_capacity(20);
        for _ in 0..20 {
            let start = Instant::now();
            let outcome = index.search("keto bastoni");
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
            assert_eq!(outcome.hits[0].name(), "Keto bastoncini 200g");
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 400.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 400.0ms); batches={batch_p95:?}",
    );
}
