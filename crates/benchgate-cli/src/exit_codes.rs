//! Exit codes of the `benchgate` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const TEST_FAILED: i32 = 1; // At least one test or threshold sub-test failed
pub const INTERNAL_ERROR: i32 = 2; // Config, policy or output error
pub const CONSISTENCY_ERROR: i32 = 3; // check_result disagrees with what was evaluated

#[cfg(test)]
mod tests {
    use super::*;
    use benchgate_core::GateError;

    #[test]
    fn test_gate_errors_map_onto_exit_codes() {
        let consistency = GateError::Consistency {
            check_result: true,
            has_checked_results: false,
        };
        assert_eq!(consistency.exit_code(), CONSISTENCY_ERROR);

        let policy = GateError::PolicyLoad {
            path: "etc/performance_thresholds.yml".into(),
            message: "missing".into(),
        };
        assert_eq!(policy.exit_code(), INTERNAL_ERROR);

        let dup = GateError::DuplicateMetric {
            base_name: "Suite/BM_X".into(),
            names: vec!["latency_per_op_0".into()],
        };
        assert_eq!(dup.exit_code(), TEST_FAILED);
        assert_ne!(SUCCESS, TEST_FAILED);
    }
}
