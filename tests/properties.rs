// tests/properties.rs

mod common;
use crate::common::fakes::{RecordingSleeper, ScriptedStage};
use crate::common::mock_fs;

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use nightshift::exec::{backoff, RetryPolicy, StageRunner};
use nightshift::pipeline::{Orchestrator, ReportStore};
use nightshift::stage::Stage;
use nightshift::types::RunStatus;

proptest! {
    #[test]
    fn backoff_is_monotonic_and_capped(
        base_ms in 1u64..5_000,
        cap_factor in 1u64..100,
        attempts in 1u32..40,
    ) {
        let base = Duration::from_millis(base_ms);
        let max = base * cap_factor as u32;

        let first = backoff(1, base, max);
        prop_assert_eq!(first, base);

        let mut previous = first;
        for n in 2..=attempts {
            let delay = backoff(n, base, max);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= max);
            // Doubles until the cap kicks in.
            prop_assert_eq!(delay, (previous * 2).min(max));
            previous = delay;
        }
    }

    #[test]
    fn pipeline_runs_exactly_up_to_the_first_failure(
        num_stages in 1usize..8,
        failing in proptest::option::of(0usize..8),
        max_retries in 1u32..4,
    ) {
        let failing = failing.filter(|&k| k < num_stages);
        let stages: Vec<ScriptedStage> = (0..num_stages)
            .map(|i| {
                let name = format!("stage_{i}");
                if Some(i) == failing {
                    ScriptedStage::always_failing(&name, "boom")
                } else {
                    ScriptedStage::succeeding(&name)
                }
            })
            .collect();

        let (_mock, fs) = mock_fs();
        let runner = StageRunner::with_sleeper(
            RetryPolicy::default().with_max_retries(max_retries),
            Arc::new(RecordingSleeper::new()),
        );
        let orch = Orchestrator::new(
            stages.iter().map(ScriptedStage::boxed).collect::<Vec<Box<dyn Stage>>>(),
            runner,
            ReportStore::new("report.json", fs),
        );

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let execution = rt.block_on(orch.execute()).unwrap();

        match failing {
            Some(k) => {
                prop_assert_eq!(execution.status, RunStatus::Failed);
                prop_assert_eq!(execution.steps_executed.len(), k + 1);
                prop_assert_eq!(stages[k].invocations(), max_retries as usize);
                for later in &stages[k + 1..] {
                    prop_assert_eq!(later.invocations(), 0);
                }
            }
            None => {
                prop_assert_eq!(execution.status, RunStatus::Success);
                prop_assert_eq!(execution.steps_executed.len(), num_stages);
                prop_assert!(execution.steps_executed.values().all(|s| s.retry_attempts == 0));
            }
        }
    }
}
