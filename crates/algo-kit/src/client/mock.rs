//! In-memory node for transport-level tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::algod::{AlgodFuture, AlgodTransport, NodeStatus};
use crate::error::AlgodError;
use crate::types::{PendingTransactionResponse, SignedTransaction, Transaction, TxId};

#[derive(Default)]
struct State {
    last_round: u64,
    submissions: Vec<Vec<Vec<u8>>>,
    scripted: HashMap<TxId, VecDeque<Result<PendingTransactionResponse, AlgodError>>>,
    confirmed: HashMap<TxId, PendingTransactionResponse>,
    logs: HashMap<TxId, Vec<Vec<u8>>>,
    auto_confirm: bool,
}

/// Answers pending lookups from scripted responses, or confirms submitted
/// transactions in the next round when `auto_confirm` is on.
pub(crate) struct MockAlgod {
    state: Mutex<State>,
}

impl MockAlgod {
    pub(crate) fn new(last_round: u64) -> Self {
        Self {
            state: Mutex::new(State {
                last_round,
                ..Default::default()
            }),
        }
    }

    /// Confirm every submitted transaction in the round after submission.
    pub(crate) fn auto_confirm(self) -> Self {
        self.lock().auto_confirm = true;
        self
    }

    /// Queue responses for lookups of `tx_id`, consumed in order.
    pub(crate) fn script(
        &self,
        tx_id: TxId,
        responses: Vec<Result<PendingTransactionResponse, AlgodError>>,
    ) {
        self.lock().scripted.insert(tx_id, responses.into());
    }

    /// Logs attached to `tx_id` when it is auto-confirmed.
    pub(crate) fn set_logs(&self, tx_id: TxId, logs: Vec<Vec<u8>>) {
        self.lock().logs.insert(tx_id, logs);
    }

    pub(crate) fn last_round(&self) -> u64 {
        self.lock().last_round
    }

    pub(crate) fn submissions(&self) -> Vec<Vec<Vec<u8>>> {
        self.lock().submissions.clone()
    }

    pub(crate) fn pending(
        txn: &Transaction,
        confirmed_round: Option<u64>,
        pool_error: &str,
    ) -> PendingTransactionResponse {
        PendingTransactionResponse {
            pool_error: pool_error.to_string(),
            txn: SignedTransaction::new(txn.clone()),
            confirmed_round,
            application_index: None,
            asset_index: None,
            asset_closing_amount: None,
            closing_amount: None,
            close_rewards: None,
            receiver_rewards: None,
            sender_rewards: None,
            global_state_delta: Vec::new(),
            local_state_delta: Vec::new(),
            logs: Vec::new(),
            inner_txns: Vec::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlgodTransport for MockAlgod {
    fn send_raw_transactions<'a>(&'a self, signed: &'a [Vec<u8>]) -> AlgodFuture<'a, TxId> {
        Box::pin(async move {
            let decoded = signed
                .iter()
                .map(|bytes| SignedTransaction::from_msgpack(bytes))
                .collect::<Result<Vec<_>, _>>()?;
            let first = decoded
                .first()
                .ok_or_else(|| AlgodError::Api {
                    status: 400,
                    message: "empty transaction group".to_string(),
                })?
                .id()?;

            let mut state = self.lock();
            state.submissions.push(signed.to_vec());
            if state.auto_confirm {
                let round = state.last_round + 1;
                for stx in decoded {
                    let tx_id = stx.id()?;
                    let mut info = Self::pending(stx.txn(), Some(round), "");
                    info.logs = state.logs.get(&tx_id).cloned().unwrap_or_default();
                    info.txn = stx;
                    state.confirmed.insert(tx_id, info);
                }
            }
            Ok(first)
        })
    }

    fn pending_transaction_information<'a>(
        &'a self,
        tx_id: &'a TxId,
    ) -> AlgodFuture<'a, PendingTransactionResponse> {
        Box::pin(async move {
            let mut state = self.lock();
            if let Some(response) = state.scripted.get_mut(tx_id).and_then(|q| q.pop_front()) {
                return response;
            }
            state.confirmed.get(tx_id).cloned().ok_or(AlgodError::Api {
                status: 404,
                message: "txn not found".to_string(),
            })
        })
    }

    fn status(&self) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(async move { Ok(status(self.lock().last_round)) })
    }

    fn status_after_block(&self, round: u64) -> AlgodFuture<'_, NodeStatus> {
        Box::pin(async move {
            let mut state = self.lock();
            state.last_round = state.last_round.max(round + 1);
            Ok(status(state.last_round))
        })
    }
}

fn status(last_round: u64) -> NodeStatus {
    NodeStatus {
        last_round,
        time_since_last_round: 0,
        catchup_time: 0,
        last_version: String::new(),
    }
}
