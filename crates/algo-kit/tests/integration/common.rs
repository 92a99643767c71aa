//! Shared fixtures: an in-memory node and canned keys.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use algo_kit::*;
use tracing_subscriber::EnvFilter;

/// Route crate logs to the test writer; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts every transport call and confirms submitted transactions in the
/// next round, attaching whatever logs were registered for them.
#[derive(Default)]
pub struct InMemoryNode {
    pub calls: AtomicUsize,
    last_round: Mutex<u64>,
    submitted: Mutex<Vec<Vec<Vec<u8>>>>,
    confirmed: Mutex<HashMap<TxId, PendingTransactionResponse>>,
    logs: Mutex<HashMap<TxId, Vec<Vec<u8>>>>,
}

impl InMemoryNode {
    pub fn new(last_round: u64) -> Self {
        Self {
            last_round: Mutex::new(last_round),
            ..Default::default()
        }
    }

    pub fn set_logs(&self, tx_id: TxId, logs: Vec<Vec<u8>>) {
        self.logs.lock().unwrap().insert(tx_id, logs);
    }

    pub fn submitted(&self) -> Vec<Vec<Vec<u8>>> {
        self.submitted.lock().unwrap().clone()
    }

    fn pending(stx: SignedTransaction, round: u64, logs: Vec<Vec<u8>>) -> PendingTransactionResponse {
        PendingTransactionResponse {
            pool_error: String::new(),
            txn: stx,
            confirmed_round: Some(round),
            application_index: None,
            asset_index: None,
            asset_closing_amount: None,
            closing_amount: None,
            close_rewards: None,
            receiver_rewards: None,
            sender_rewards: None,
            global_state_delta: Vec::new(),
            local_state_delta: Vec::new(),
            logs,
            inner_txns: Vec::new(),
        }
    }

    fn status_now(&self) -> NodeStatus {
        NodeStatus {
            last_round: *self.last_round.lock().unwrap(),
            time_since_last_round: 0,
            catchup_time: 0,
            last_version: String::new(),
        }
    }
}

impl AlgodTransport for InMemoryNode {
    fn send_raw_transactions<'a>(&'a self, signed: &'a [Vec<u8>]) -> AlgodFuture<'a, TxId> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let round = *self.last_round.lock().unwrap() + 1;
            let mut first = None;
            for blob in signed {
                let stx = SignedTransaction::from_msgpack(blob)?;
                let tx_id = stx.id()?;
                first.get_or_insert(tx_id);
                let logs = self
                    .logs
                    .lock()
                    .unwrap()
                    .get(&tx_id)
                    .cloned()
                    .unwrap_or_default();
                self.confirmed
                    .lock()
                    .unwrap()
                    .insert(tx_id, Self::pending(stx, round, logs));
            }
            self.submitted.lock().unwrap().push(signed.to_vec());
            first.ok_or_else(|| AlgodError::InvalidResponse("empty group".to_string()))
        })
    }

    fn pending_transaction_information<'a>(
        &'a self,
        tx_id: &'a TxId,
    ) -> AlgodFuture<'a, PendingTransactionResponse> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.confirmed
                .lock()
                .unwrap()
                .get(tx_id)
                .cloned()
                .ok_or(AlgodError::Api {
                    status: 404,
                    message: "txn not found".to_string(),
                })
        })
    }

    fn status(&self) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.status_now())
        })
    }

    fn status_after_block(&self, round: u64) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut last = self.last_round.lock().unwrap();
                *last = (*last).max(round + 1);
            }
            Ok(self.status_now())
        })
    }
}

pub fn key(seed: u8) -> SecretKey {
    SecretKey::from_bytes([seed; 32])
}

pub fn params() -> SuggestedParams {
    SuggestedParams::new("testnet-v1.0", [4; 32], 1000, 2000).flat_fee(1000)
}

pub fn payment(sender: &SecretKey, amount: u64) -> Transaction {
    Transaction::builder(sender.address(), &params())
        .payment(key(200).address(), amount, None)
        .build()
        .unwrap()
}
