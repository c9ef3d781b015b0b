//! Order-independence of run aggregation and boundedness of the limiter.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use ticker_pulse::{Budget, Run, RunId, SlidingWindowLimiter, SubredditResult};
use tokio::time::Instant;

fn section_result() -> impl Strategy<Value = (String, SubredditResult)> {
    (
        prop::sample::select(vec!["wallstreetbets", "stocks", "investing"]),
        prop::collection::btree_map(
            prop::sample::select(vec!["GME", "AMC", "TSLA", "BB", "NOK"]),
            0u64..50,
            0..5,
        ),
        0u64..100,
    )
        .prop_map(|(section, hits, posts)| {
            let symbol_hits: BTreeMap<String, u64> =
                hits.into_iter().map(|(s, c)| (s.to_string(), c)).collect();
            (
                section.to_string(),
                SubredditResult {
                    symbol_hits,
                    posts_checked: posts,
                },
            )
        })
}

proptest! {
    #[test]
    fn relevant_does_not_depend_on_arrival_order(
        parts in prop::collection::vec(section_result(), 0..12),
        threshold in 0u64..30,
        seed in any::<u64>(),
    ) {
        let started = Utc::now();
        let run_id = RunId::at(started);

        let mut shuffled = parts.clone();
        // deterministic rotation plus reversal stands in for arrival order
        let len = shuffled.len().max(1);
        shuffled.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            shuffled.reverse();
        }

        let a = Run::from_sections(run_id.clone(), started, parts, threshold);
        let b = Run::from_sections(run_id, started, shuffled, threshold);

        prop_assert_eq!(&a.relevant, &b.relevant);
        prop_assert_eq!(a.total_counts(), b.total_counts());
        prop_assert_eq!(a.total_posts_checked, b.total_posts_checked);
        prop_assert!(a.relevant.values().all(|c| *c > threshold));
    }

    #[test]
    fn limiter_never_admits_more_than_budget_in_any_window(
        max_calls in 1usize..6,
        period_ms in 10u64..500,
        callers in 1usize..25,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let admitted = runtime.block_on(async move {
            let period = Duration::from_millis(period_ms);
            let limiter = Arc::new(SlidingWindowLimiter::new(Budget::new(max_calls, period)));
            let start = Instant::now();

            let mut handles = Vec::new();
            for _ in 0..callers {
                let limiter = Arc::clone(&limiter);
                handles.push(tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now().duration_since(start)
                }));
            }

            let mut admitted = Vec::new();
            for handle in handles {
                admitted.push(handle.await.unwrap());
            }
            admitted.sort();
            (admitted, period)
        });

        let (admitted, period) = admitted;
        prop_assert_eq!(admitted.len(), callers);
        for (i, first) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .take_while(|t| t.saturating_sub(*first) < period)
                .count();
            prop_assert!(in_window <= max_calls);
        }
    }
}
