//! Watcher tests against an in-memory ledger.

use device_verifier::config::MonitorConfig;
use device_verifier::monitor::{ChainWatcher, Cursor};

mod common;

use common::{contract, MockLedger};

fn watcher(ledger: &MockLedger, confirmation_depth: u64) -> ChainWatcher<MockLedger> {
    let config = MonitorConfig {
        confirmation_depth,
        ..Default::default()
    };
    ChainWatcher::new(ledger.clone(), contract(), config)
}

#[tokio::test]
async fn test_confirmation_depth_holds_back_recent_blocks() {
    let ledger = MockLedger::new(100);
    ledger.emit_challenge(&[0x01; 32], 97, 0);
    ledger.emit_challenge(&[0x02; 32], 99, 0);

    let batch = watcher(&ledger, 2).poll(Cursor::new(95)).await.unwrap();

    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].block_number, 97);
    assert_eq!(batch.next_cursor, 98);
    assert_eq!(ledger.state().log_queries, vec![(96, 98)]);
}

#[tokio::test]
async fn test_poll_at_head_is_empty() {
    let ledger = MockLedger::new(100);
    let batch = watcher(&ledger, 0).poll(Cursor::new(100)).await.unwrap();

    assert!(batch.events.is_empty());
    assert_eq!(batch.next_cursor, 100);
}

#[tokio::test]
async fn test_events_from_other_contracts_are_ignored() {
    let ledger = MockLedger::new(100);
    let other = "0x0000000000000000000000000000000000000001".parse().unwrap();
    let data = alloy::sol_types::SolEvent::encode_log_data(
        &device_verifier::blockchain::contract::ChallengeGenerated {
            challenge: vec![0xee; 32].into(),
        },
    );
    ledger.state().logs.push(common::rpc_log(other, data, 100, 0));

    let batch = watcher(&ledger, 0).poll(Cursor::new(99)).await.unwrap();
    assert!(batch.events.is_empty());
    assert_eq!(batch.next_cursor, 100);
}

#[tokio::test]
async fn test_rpc_failure_is_returned() {
    let ledger = MockLedger::new(100);
    ledger.state().fail_get_logs = 1;

    assert!(watcher(&ledger, 0).poll(Cursor::new(99)).await.is_err());
}
