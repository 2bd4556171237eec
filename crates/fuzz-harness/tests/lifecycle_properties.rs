//! Lifecycle state machine and reveal properties

use fuzz_harness::prelude::*;
use render_sync::draw_range;
use satellite_lifecycle::{
    LifecycleConfig, LifecycleEngine, LifecyclePhase, LifecycleState, TimeScale, MS_PER_DAY,
};

fn in_unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

proptest! {
    #![proptest_config(FuzzConfig::new().cases(200).to_proptest_config())]

    #[test]
    fn phase_never_goes_backwards(record in satellite_record(), offsets in time_offsets_days(24)) {
        let config = LifecycleConfig::default();
        let scale = TimeScale::default();
        let launch = record.launch_ms();

        let mut last = LifecyclePhase::Pending;
        for days in offsets {
            let state = LifecycleState::evaluate(&record, launch + days * MS_PER_DAY, &config, &scale);
            prop_assert!(state.phase >= last, "{:?} after {:?} at +{}d", state.phase, last, days);
            last = state.phase;
        }
    }

    #[test]
    fn progress_values_stay_in_unit_range(
        record in satellite_record(),
        days in -100.0..(50.0 * 365.0),
        animation_secs in 1.0..600.0f64,
    ) {
        let config = LifecycleConfig::default();
        let scale = TimeScale::new(70.0 * 365.0 * MS_PER_DAY, animation_secs * 1000.0);
        let state = LifecycleState::evaluate(&record, record.launch_ms() + days * MS_PER_DAY, &config, &scale);

        prop_assert!(in_unit(state.launch_progress));
        prop_assert!(in_unit(state.launch_opacity));
        prop_assert!(in_unit(state.orbit_progress));
        prop_assert!(in_unit(state.decom_progress));
    }

    #[test]
    fn state_depends_only_on_time(records in catalog(12), a in 0.0..1.0f64, b in 0.0..1.0f64) {
        let engine = LifecycleEngine::default();
        let t = |f: f64| -400_000_000_000.0 + f * 2_300_000_000_000.0;

        let direct = engine.classify(&records, t(b));
        let mut visited = engine.classify(&records, t(a));
        engine.classify_into(&records, t(b), &mut visited);

        prop_assert_eq!(visited.active, direct.active);
        prop_assert_eq!(visited.orbiting, direct.orbiting);
        prop_assert_eq!(visited.phase_counts, direct.phase_counts);
    }

    #[test]
    fn reveal_is_monotonic(total in 2usize..=1024, steps in 2usize..200) {
        let mut last = 0;
        for i in 0..=steps {
            let n = draw_range(i as f64 / steps as f64, total);
            prop_assert!(n >= 2);
            prop_assert!(n >= last);
            prop_assert!(n <= total);
            last = n;
        }
        prop_assert_eq!(last, total);
    }
}
