//! Waiting for transaction confirmation.

use tracing::debug;

use super::algod::AlgodTransport;
use crate::error::AlgodError;
use crate::types::{PendingTransactionResponse, TxId};

/// Poll until `tx_id` is confirmed, rejected, or `wait_rounds` rounds pass.
///
/// Lookup failures are treated as transient (the request may have reached a
/// node that has not seen the transaction yet) and retried next round. A
/// non-empty pool error means the transaction was rejected and fails
/// immediately.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example(tx_id: algo_kit::TxId) -> Result<(), algo_kit::AlgodError> {
/// use algo_kit::{AlgodClient, LOCALNET, wait_for_confirmation};
///
/// let client = AlgodClient::from_network(&LOCALNET);
/// let info = wait_for_confirmation(&client, &tx_id, 4).await?;
/// println!("confirmed in round {:?}", info.confirmed_round);
/// # Ok(())
/// # }
/// ```
pub async fn wait_for_confirmation<T: AlgodTransport + ?Sized>(
    client: &T,
    tx_id: &TxId,
    wait_rounds: u64,
) -> Result<PendingTransactionResponse, AlgodError> {
    let start_round = client.status().await?.last_round + 1;
    let mut current_round = start_round;

    while current_round < start_round + wait_rounds {
        match client.pending_transaction_information(tx_id).await {
            Ok(info) if info.is_confirmed() => {
                debug!(%tx_id, round = ?info.confirmed_round, "transaction confirmed");
                return Ok(info);
            }
            Ok(info) if !info.pool_error.is_empty() => {
                return Err(AlgodError::PoolError {
                    tx_id: tx_id.to_string(),
                    message: info.pool_error,
                });
            }
            Ok(_) => debug!(%tx_id, current_round, "transaction still pending"),
            Err(e) => debug!(%tx_id, current_round, error = %e, "pending lookup failed"),
        }

        client.status_after_block(current_round).await?;
        current_round += 1;
    }

    Err(AlgodError::NotConfirmed {
        tx_id: tx_id.to_string(),
        rounds: wait_rounds,
    })
}
