//! End-to-end composer scenarios against an in-memory node.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use algo_kit::abi::RETURN_PREFIX;
use algo_kit::*;
use tokio_test::{assert_err, assert_ok};

use crate::common::{InMemoryNode, init_tracing, key, params, payment};

fn basic(seed: u8) -> Arc<dyn TransactionSigner> {
    Arc::new(BasicAccountSigner::new(key(seed)))
}

fn app_args(txn: &Transaction) -> Vec<Vec<u8>> {
    match txn.params() {
        TransactionParams::ApplicationCall(fields) => fields.args.clone(),
        other => panic!("expected an application call, got {:?}", other),
    }
}

/// Fails every request.
struct RefusingSigner;

impl TransactionSigner for RefusingSigner {
    fn sign_transactions<'a>(
        &'a self,
        _group: &'a [Transaction],
        _indexes: &'a [usize],
    ) -> SignFuture<'a> {
        Box::pin(async { Err(SignerError::SigningFailed("device locked".to_string())) })
    }
}

// =============================================================================
// Argument packing
// =============================================================================

#[test]
fn test_sixteen_arguments_pack_into_fifteen_slots() {
    let signature = format!("many({})void", vec!["uint64"; 16].join(","));
    let method = Method::from_signature(&signature).unwrap();
    let selector = method.selector();
    let args: Vec<MethodArgValue> = (0u64..16).map(|i| AbiValue::from(i).into()).collect();

    let mut composer = AtomicTransactionComposer::new();
    composer
        .add_method_call(
            MethodCallParams::new(9, method, key(1).address(), params(), basic(1)).args(args),
        )
        .unwrap();

    let group = composer.build_group().unwrap();
    let args = app_args(&group[0].txn);
    assert_eq!(args.len(), 16);
    assert_eq!(args[0], selector.to_vec());
    assert_eq!(args[14], 13u64.to_be_bytes().to_vec());
    assert_eq!(args[15], [14u64.to_be_bytes(), 15u64.to_be_bytes()].concat());
}

// =============================================================================
// Limits and lifecycle
// =============================================================================

#[tokio::test]
async fn test_oversized_group_fails_before_network() {
    let node = InMemoryNode::new(10);
    let sender = key(1);
    let mut composer = AtomicTransactionComposer::new();
    for amount in 1..=15 {
        composer
            .add_transaction(TransactionWithSigner::new(payment(&sender, amount), basic(1)))
            .unwrap();
    }

    let method = Method::from_signature("deposit(pay)void").unwrap();
    let pay = TransactionWithSigner::new(payment(&sender, 99), basic(1));
    let err = composer
        .add_method_call(
            MethodCallParams::new(9, method, sender.address(), params(), basic(1)).arg(pay),
        )
        .unwrap_err();
    assert!(matches!(err, ComposerError::GroupTooLarge { adding: 2, max: 16 }));
    assert_eq!(composer.count(), 15);

    composer
        .add_transaction(TransactionWithSigner::new(payment(&sender, 100), basic(1)))
        .unwrap();
    let err = composer
        .add_transaction(TransactionWithSigner::new(payment(&sender, 101), basic(1)))
        .unwrap_err();
    assert!(matches!(err, ComposerError::GroupTooLarge { adding: 1, .. }));
    assert_eq!(node.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signer_failure_aborts_submission() {
    init_tracing();
    let node = InMemoryNode::new(10);
    let mut composer = AtomicTransactionComposer::new();
    composer
        .add_transaction(TransactionWithSigner::new(payment(&key(1), 1), basic(1)))
        .unwrap();
    composer
        .add_transaction(TransactionWithSigner::new(
            payment(&key(2), 2),
            Arc::new(RefusingSigner),
        ))
        .unwrap();

    let err = assert_err!(composer.execute(&node, 5).await);
    assert!(matches!(
        err,
        ComposerError::Signer(SignerError::SigningFailed(_))
    ));
    assert_eq!(composer.status(), ComposerStatus::Built);
    assert!(node.submitted().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle() {
    init_tracing();
    let node = InMemoryNode::new(500);
    let alice = key(1);
    let bob = key(2);

    let method = Method::from_signature("swap(pay,string)(uint64,string)").unwrap();
    let pay = TransactionWithSigner::new(payment(&bob, 250), basic(2));

    let mut composer = AtomicTransactionComposer::new();
    composer
        .add_transaction(TransactionWithSigner::new(payment(&alice, 1), basic(1)))
        .unwrap();
    composer
        .add_method_call(
            MethodCallParams::new(9, method, alice.address(), params(), basic(1))
                .args(vec![pay.into(), AbiValue::from("hi").into()]),
        )
        .unwrap();
    assert_eq!(composer.count(), 3);

    let signed = composer.gather_signatures().await.unwrap();
    assert_eq!(signed.len(), 3);
    let stxs: Vec<SignedTransaction> = signed
        .iter()
        .map(|b| SignedTransaction::from_msgpack(b).unwrap())
        .collect();

    // The pay argument sits between the plain payment and the call.
    assert_eq!(stxs[1].txn().sender(), bob.address());
    assert_eq!(stxs[2].txn().transaction_type(), TransactionType::ApplicationCall);
    let group = stxs[0].txn().group().copied().unwrap();
    assert!(stxs.iter().all(|s| s.txn().group() == Some(&group)));

    let unsigned: Vec<Transaction> = stxs
        .iter()
        .map(|s| {
            let mut t = s.txn().clone();
            t.clear_group();
            t
        })
        .collect();
    assert_eq!(compute_group_id(&unsigned).unwrap(), group);

    let returns: AbiType = "(uint64,string)".parse().unwrap();
    let value = AbiValue::Array(vec![7u64.into(), "ok".into()]);
    let encoded = returns.encode(&value).unwrap();
    let call_id = stxs[2].id().unwrap();
    node.set_logs(call_id, vec![[&RETURN_PREFIX[..], &encoded].concat()]);

    let result = assert_ok!(composer.execute(&node, 5).await);
    assert_eq!(result.confirmed_round, 501);
    assert_eq!(result.tx_ids[2], call_id);
    assert_eq!(result.method_results.len(), 1);

    let call = &result.method_results[0];
    assert_eq!(call.method.name(), "swap");
    assert_eq!(call.raw_return_value, encoded);
    assert_eq!(call.return_value, Some(value));
    assert!(call.decode_error.is_none());

    assert_eq!(node.submitted().len(), 1);
    assert!(matches!(
        composer.execute(&node, 5).await,
        Err(ComposerError::AlreadyExecuted)
    ));
}

#[tokio::test]
async fn test_rebuild_after_execution() {
    let node = InMemoryNode::new(1);
    let mut composer = AtomicTransactionComposer::new();
    for amount in [1, 2] {
        composer
            .add_transaction(TransactionWithSigner::new(payment(&key(1), amount), basic(1)))
            .unwrap();
    }
    let first = composer.execute(&node, 3).await.unwrap();

    let mut rebuilt = composer.clone_for_rebuild();
    assert_eq!(rebuilt.status(), ComposerStatus::Building);
    rebuilt
        .add_transaction(TransactionWithSigner::new(payment(&key(1), 3), basic(1)))
        .unwrap();
    let second = rebuilt.execute(&node, 3).await.unwrap();

    assert_eq!(second.tx_ids.len(), 3);
    assert_ne!(first.tx_ids[0], second.tx_ids[0]);
    assert!(second.method_results.is_empty());
}
