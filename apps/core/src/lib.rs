pub mod aggregate;
pub mod cache_store;
pub mod catalog;
pub mod config;
pub mod contract;
pub mod debounce;
pub mod export;
pub mod fuzzy;
pub mod loader;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod runtime;
pub mod search;
pub mod selection;

#[cfg(test)]
mod tests {
    mod query_latency_test {
        include!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../tests/perf/query_latency_test.rs"
        ));
    }
}
