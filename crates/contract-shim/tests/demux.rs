//! Replies answered in arbitrary order still reach the call that asked.

mod common;

use common::*;
use contract_shim::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

async fn shuffled_round(count: usize, seed: u64) {
    let harness = ready_engine().await;
    let peer = &harness.peer;

    for i in 0..count {
        peer.transact(&format!("tx-{i:03}"), "get", &["k"]).await;
    }

    let mut requests = Vec::with_capacity(count);
    for _ in 0..count {
        requests.push(peer.expect(MessageKind::GetState).await);
    }
    assert_eq!(harness.handle.pending_requests(), count);

    requests.shuffle(&mut StdRng::seed_from_u64(seed));
    for req in &requests {
        peer.respond(req, format!("value-for-{}", req.tx_id).into_bytes()).await;
    }

    let mut outcomes = HashMap::new();
    for _ in 0..count {
        match peer.outcome().await {
            Outcome::Completed(tx, response) => {
                outcomes.insert(tx, response.payload);
            }
            Outcome::Error(tx, text) => panic!("{tx} failed: {text}"),
        }
    }

    assert_eq!(outcomes.len(), count);
    for (tx, payload) in outcomes {
        assert_eq!(payload, format!("value-for-{tx}").into_bytes());
    }
    assert_eq!(harness.handle.pending_requests(), 0);
    assert_eq!(harness.handle.state(), EngineState::Ready);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_each_call_gets_its_own_reply(count in 1usize..32, seed in any::<u64>()) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(shuffled_round(count, seed));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wide_fan_in() {
    shuffled_round(128, 7).await;
}
