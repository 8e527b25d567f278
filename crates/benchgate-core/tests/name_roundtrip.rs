use benchgate_core::benchmark::name::{has_explicit_threads, parse_name};
use proptest::prelude::*;

fn aggregate() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop::sample::select(vec!["mean", "median", "stddev", "cv"]))
}

proptest! {
    #[test]
    fn test_parsed_name_rebuilds_original(
        base in "[A-Z][A-Za-z0-9]{0,6}/BM_[A-Za-z0-9_]{1,8}(/[a-z]{1,4}:[0-9]{1,3}){0,2}",
        threads in prop::option::of("[1-9][0-9]{0,2}"),
        agg in aggregate(),
    ) {
        let mut name = base.clone();
        if let Some(t) = &threads {
            name.push_str("/threads:");
            name.push_str(t);
        }
        if let Some(a) = agg {
            name.push('_');
            name.push_str(a);
        }

        let parsed = parse_name(&name, agg);
        prop_assert_eq!(&parsed.base_name, &base);
        prop_assert_eq!(parsed.thread_count.as_str(), threads.as_deref().unwrap_or("1"));
        prop_assert_eq!(parsed.aggregate_kind.as_deref(), agg);

        let explicit = has_explicit_threads(&name, agg);
        prop_assert_eq!(explicit, threads.is_some());
        prop_assert_eq!(parsed.to_name(explicit), name);
    }

    #[test]
    fn test_iteration_names_without_threads_are_unchanged(
        name in "[A-Z][a-z]{0,6}/BM_[A-Za-z0-9_]{1,12}",
    ) {
        let parsed = parse_name(&name, None);
        prop_assert_eq!(parsed.base_name, name);
        prop_assert_eq!(parsed.thread_count, "1");
        prop_assert!(parsed.aggregate_kind.is_none());
    }
}
