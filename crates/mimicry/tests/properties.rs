//! Property tests for override resolution and the ledger.

use mimicry::prelude::*;
use proptest::prelude::*;

fn counter() -> DoubleType {
    let double = DoubleType::new("Counter");
    double.declare_singleton(Declaration::new("next").variadic(0).default_value("default"));
    double
}

proptest! {
    #[test]
    fn prop_single_override_is_sticky(value in any::<i64>(), calls in 1usize..20) {
        let double = counter();
        double.will("next", value).unwrap();
        for i in 0..calls {
            prop_assert_eq!(double.call("next", args![i]).unwrap(), Value::Int(value));
        }
    }

    #[test]
    fn prop_queue_then_single(
        queue in prop::collection::vec(any::<i64>(), 0..10),
        single in any::<i64>(),
    ) {
        let double = counter();
        double.will("next", single).unwrap();
        double.will_queue("next", queue.clone()).unwrap();
        for expected in &queue {
            prop_assert_eq!(double.ask("next").unwrap(), Value::Int(*expected));
        }
        prop_assert_eq!(double.ask("next").unwrap(), Value::Int(single));
    }

    #[test]
    fn prop_queue_then_default(queue in prop::collection::vec("[a-z]{1,8}", 0..10)) {
        let double = counter();
        double.will_queue("next", queue.iter().map(String::as_str)).unwrap();
        for expected in &queue {
            prop_assert_eq!(double.ask("next").unwrap(), Value::from(expected.as_str()));
        }
        prop_assert_eq!(double.ask("next").unwrap(), Value::from("default"));
        prop_assert_eq!(double.queued("next"), 0);
    }

    #[test]
    fn prop_times_told_counts_every_call(
        calls in prop::collection::vec(prop::collection::vec(any::<i32>(), 0..4), 0..30),
    ) {
        let double = counter();
        for args in &calls {
            double.call("next", args.iter().copied().map(Value::from).collect()).unwrap();
        }
        prop_assert_eq!(double.times_told("next"), calls.len());
        prop_assert_eq!(double.ledger().len(), calls.len());
    }

    #[test]
    fn prop_told_with_iff_recorded(
        calls in prop::collection::vec(0i64..5, 0..20),
        needle in 0i64..5,
    ) {
        let double = counter();
        for id in &calls {
            double.call("next", args![*id]).unwrap();
        }
        prop_assert_eq!(double.told_with("next", &args![needle]), calls.contains(&needle));
        prop_assert_eq!(
            double.times_told_with("next", &args![needle]),
            calls.iter().filter(|&&id| id == needle).count()
        );
    }

    #[test]
    fn prop_reprises_never_leak(first_calls in 0usize..10, second_calls in 0usize..10) {
        let base = counter();
        let first = base.reprise();
        let second = base.reprise();
        first.will("next", 1).unwrap();
        for _ in 0..first_calls {
            first.ask("next").unwrap();
        }
        for _ in 0..second_calls {
            prop_assert_eq!(second.ask("next").unwrap(), Value::from("default"));
        }
        prop_assert_eq!(first.times_told("next"), first_calls);
        prop_assert_eq!(second.times_told("next"), second_calls);
        prop_assert_eq!(base.times_told("next"), 0);
    }

    #[test]
    fn prop_substitutable_is_reflexive(
        names in prop::collection::btree_set("[a-z]{1,6}", 0..8),
        arity in 0usize..4,
    ) {
        let double = DoubleType::new("Thing");
        let mut candidate = SurfaceDescriptor::new("RealThing");
        for name in &names {
            double.declare_instance(Declaration::new(name).arity(arity));
            candidate.insert(SurfaceKind::Instance, name, Arity::exact(arity));
        }
        prop_assert!(double.is_substitutable_for(&candidate));
        prop_assert!(double.is_substitutable_for(&double.surface()));

        candidate.insert(SurfaceKind::Singleton, "extra", Arity::exact(0));
        prop_assert!(!double.is_substitutable_for(&candidate));
    }
}
