//! Property-based tests for retention scoring invariants.
//!
//! These tests verify the mathematical invariants the eviction heuristic
//! depends on:
//!
//! - Retention weight is always within [0, 1]
//! - Pruning priority is monotonically decreasing in weight
//! - The lambda controller never leaves its configured bounds
//! - Bridge smoothing keeps correlation strength within [0, 1]
//! - Record identity is deterministic under quantization

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::config::{LinkerConfig, RegistryConfig, RetentionConfig};
    use crate::graph::{CausalGraphNavigator, DomainPair, LatentLinkDiscoverer};
    use crate::registry::{IdentityHasher, MemoryRegistry, SubstrateContext, SubstrateState};
    use crate::retention::engine::{pruning_priority_score, BridgeEdge};
    use crate::retention::weight::LambdaController;

    // Admissible score ranges (above the default thresholds)
    fn coherence() -> impl Strategy<Value = f64> {
        0.72f64..1.0
    }

    fn ethical() -> impl Strategy<Value = f64> {
        0.65f64..1.0
    }

    fn unit() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    fn domain() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("physics"), Just("governance"), Just("social")]
    }

    proptest! {
        /// Retention weight stays within [0, 1] for any admissible record.
        #[test]
        fn weight_is_bounded(
            phi in coherence(),
            beta in ethical(),
            crisis in unit(),
            latency in 0.0f64..20.0,
            age_hours in 0i64..5000,
            domain in domain(),
        ) {
            let mut registry = MemoryRegistry::new(RegistryConfig::default());
            let mut graph = CausalGraphNavigator::new();
            let linker = LatentLinkDiscoverer::new(LinkerConfig::default());
            let mut engine =
                crate::retention::TemporalRetentionEngine::new(RetentionConfig::default());

            let now = Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap();
            let state = SubstrateState::new(phi, beta, 0.9)
                .with_context(
                    SubstrateContext::new(domain)
                        .with_crisis_ratio(crisis)
                        .with_latency_p99(latency),
                )
                .with_timestamp(now - Duration::hours(age_hours));
            let outcome = registry.admit(&state, true).unwrap();
            let id = outcome.id().unwrap().clone();
            graph.insert(&registry.get(&id).unwrap());

            let weight = engine.compute_weight(&id, now, &registry, &graph, &linker);
            prop_assert!((0.0..=1.0).contains(&weight), "weight {} out of bounds", weight);
        }

        /// Pruning priority decreases as weight increases, all else equal.
        #[test]
        fn pruning_score_is_monotone_in_weight(
            w1 in unit(),
            w2 in unit(),
            bridge_score in proptest::option::of(unit()),
            ethical in any::<bool>(),
            linked in any::<bool>(),
        ) {
            let (low, high) = if w1 <= w2 { (w1, w2) } else { (w2, w1) };
            let score_low = pruning_priority_score(low, bridge_score, ethical, linked);
            let score_high = pruning_priority_score(high, bridge_score, ethical, linked);
            prop_assert!(
                score_low >= score_high,
                "score({}) = {} < score({}) = {}",
                low, score_low, high, score_high
            );
        }

        /// Pruning priority is non-negative and never exceeds 1.
        #[test]
        fn pruning_score_is_bounded(
            weight in unit(),
            bridge_score in proptest::option::of(unit()),
            ethical in any::<bool>(),
            linked in any::<bool>(),
        ) {
            let score = pruning_priority_score(weight, bridge_score, ethical, linked);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        /// The decay rate never escapes its configured bounds.
        #[test]
        fn lambda_never_escapes_bounds(
            load in unit(),
            stability in unit(),
            discovery in unit(),
            exploration in any::<bool>(),
            rounds in 1usize..50,
        ) {
            let mut controller = LambdaController::new(0.01, 0.2, 0.05);
            for _ in 0..rounds {
                let lambda = controller.adjust(load, stability, discovery, exploration);
                prop_assert!((0.01..=0.2).contains(&lambda), "lambda {} escaped", lambda);
            }
        }

        /// Exponential smoothing keeps correlation strength within [0, 1].
        #[test]
        fn bridge_correlation_stays_in_unit_interval(
            initial in unit(),
            observations in proptest::collection::vec(unit(), 1..20),
            idle_hours in 0i64..1000,
        ) {
            let now = Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap();
            let mut edge =
                BridgeEdge::new(DomainPair::new("physics", "governance"), initial, now);
            let mut at = now;
            for observation in observations {
                at += Duration::hours(idle_hours);
                edge.touch(observation, at);
                prop_assert!(
                    (0.0..=1.0).contains(&edge.correlation_strength),
                    "correlation {} out of bounds",
                    edge.correlation_strength
                );
                prop_assert!(edge.bridge_score >= 0.0);
            }
        }

        /// Identity assignment is a pure function of quantized inputs.
        #[test]
        fn identity_is_deterministic(
            phi in coherence(),
            beta in ethical(),
            millis in 0i64..4_102_444_800_000,
        ) {
            let hasher = IdentityHasher::new("prop-seed");
            let ts = Utc.timestamp_millis_opt(millis).unwrap();
            let a = hasher.record_id(phi, beta, ts).unwrap();
            let b = hasher.record_id(phi, beta, ts).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
