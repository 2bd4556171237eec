//! Worker round-trip properties

use fuzz_harness::prelude::*;
use geometry_pipeline::{GeometryCache, PipelineConfig};
use orbital_mechanics::compute_geometry;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(FuzzConfig::new().cases(16).to_proptest_config())]

    #[test]
    fn recompute_after_clear_is_identical(records in catalog(24)) {
        let inputs: Vec<_> = records.iter().map(|r| r.orbit_input()).collect();
        let cache = GeometryCache::new(PipelineConfig { segments: 32, ..PipelineConfig::default() });

        let rt = runtime();
        let first = rt.block_on(cache.compute(inputs.clone())).unwrap();
        let snapshot: Vec<_> = inputs.iter().map(|i| cache.get(&i.id).unwrap()).collect();

        cache.clear_cache();
        prop_assert!(cache.is_empty());
        let second = rt.block_on(cache.compute(inputs.clone())).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(cache.worker_runs(), 2);
        for (input, before) in inputs.iter().zip(&snapshot) {
            let after = cache.get(&input.id).unwrap();
            prop_assert_eq!(&*after, &**before);
            // worker and render-thread fallback agree bit for bit
            prop_assert_eq!(&*after, &compute_geometry(input, 32));
        }
    }
}
