//! Byte-exact wire vectors for transactions, signatures and groups.

use algo_kit::*;
use base64::{Engine as _, engine::general_purpose::STANDARD};

const RECEIVER: &str = "SGNKBMWAOCJQGSOIGQLRQMNUJ5NU4I56PXH6OJJJQNQPZ5G5G3IOVLI5VM";
const TESTNET_GENESIS_HASH: &str = "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=";

/// Payment of 847 signed by the key with seed `0, 1, ..., 31`.
const SIGNED_PAYMENT: &str = "gqNzaWfEQFJEaS388K9MQl2Y2d3HVfur/fRkAePInPsRioZ1bEgrp6mQtALIDtFvGMI85d/DM/dzBgvab5h3T7wCpmzBuAajdHhuiaNhbXTNA0+jZmVlzQPoomZ2M6NnZW6sdGVzdG5ldC12MS4womdoxCBIY7UYpLPITsgQ8i1PEIHLD3HwWaesIN7GL39w5Qk6IqJsdj2jcmN2xCCRmqCywHCTA0nINBcYMbRPW04jvn3P5yUpg2D89N020KNzbmTEIAOhB7/zzhC+HXDdGOdLwJln5NYwm6UNXx3chmQSVTG4pHR5cGWjcGF5";

/// A signed devnet payment with a close-to address and a note.
const DEVNET_SIGNED: &str = "gqNzaWfEQPhUAZ3xkDDcc8FvOVo6UinzmKBCqs0woYSfodlmBMfQvGbeUx3Srxy3dyJDzv7rLm26BRv9FnL2/AuT7NYfiAWjdHhui6NhbXTNA+ilY2xvc2XEIEDpNJKIJWTLzpxZpptnVCaJ6aHDoqnqW2Wm6KRCH/xXo2ZlZc0EmKJmds0wsqNnZW6sZGV2bmV0LXYzMy4womdoxCAmCyAJoJOohot5WHIvpeVG7eftF+TYXEx4r7BFJpDt0qJsds00mqRub3RlxAjqABVHQ2y/lqNyY3bEIHts4k/rW6zAsWTinCIsV/X2PcOH1DkEglhBHF/hD3wCo3NuZMQg5/D4TQaBHfnzHI2HixFV9GcdUaGFwgCQhmf0SVhwaKGkdHlwZaNwYXk=";

fn b64(s: &str) -> Vec<u8> {
    STANDARD.decode(s).unwrap()
}

fn seed_key() -> SecretKey {
    let seed: [u8; 32] = std::array::from_fn(|i| i as u8);
    SecretKey::from_bytes(seed)
}

fn testnet_params() -> SuggestedParams {
    let genesis_hash: [u8; 32] = b64(TESTNET_GENESIS_HASH).try_into().unwrap();
    SuggestedParams::new("testnet-v1.0", genesis_hash, 51, 61).flat_fee(1000)
}

fn seed_payment() -> Transaction {
    Transaction::builder(seed_key().address(), &testnet_params())
        .payment(RECEIVER.parse().unwrap(), 847, None)
        .build()
        .unwrap()
}

// =============================================================================
// Signed transactions
// =============================================================================

#[test]
fn test_signed_payment_matches_vector() {
    let key = seed_key();
    assert_eq!(
        key.address().to_string(),
        "AOQQPP7TZYIL4HLQ3UMOOS6ATFT6JVRQTOSQ2XY53SDGIESVGG4MPFYUMQ"
    );

    let signed = seed_payment().sign(&key).unwrap();
    assert_eq!(signed.to_msgpack().unwrap(), b64(SIGNED_PAYMENT));
    assert_eq!(
        signed.id().unwrap().to_string(),
        "KUQJXMMCHHM6SUZDC6SETOT2O6W47KJKWNLUF7AFYWLUCO4JK5KQ"
    );
    assert_eq!(signed.auth_address(), None);
}

#[test]
fn test_decode_devnet_signed_payment() {
    let bytes = b64(DEVNET_SIGNED);
    let signed = SignedTransaction::from_msgpack(&bytes).unwrap();
    let txn = signed.txn();

    assert_eq!(
        txn.sender().to_string(),
        "47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU"
    );
    assert_eq!(txn.fee(), 1176);
    assert_eq!(txn.first_valid(), 12466);
    assert_eq!(txn.last_valid(), 13466);
    assert_eq!(txn.genesis_id(), "devnet-v33.0");
    assert_eq!(
        signed.id().unwrap().to_string(),
        "5FJDJD5LMZC3EHUYYJNH5I23U4X6H2KXABNDGPIL557ZMJ33GZHQ"
    );

    let signature = signed.signature().unwrap();
    assert!(signature.verify(&txn.bytes_to_sign().unwrap(), &txn.sender()));

    assert_eq!(signed.to_msgpack().unwrap(), bytes);
}

#[test]
fn test_tampered_signature_fails_verification() {
    let key = seed_key();
    let txn = seed_payment();
    let signed = txn.sign(&key).unwrap();

    let mut forged = *signed.signature().unwrap().as_bytes();
    forged[0] ^= 1;
    assert!(!Signature::from_bytes(forged).verify(&txn.bytes_to_sign().unwrap(), &key.address()));
}

// =============================================================================
// JSON projection
// =============================================================================

#[test]
fn test_payment_json_projection() {
    let txn = seed_payment();
    let json = encode_json(&txn).unwrap();

    assert_eq!(json["amt"], 847);
    assert_eq!(json["rcv"], RECEIVER);
    assert_eq!(json["gh"], TESTNET_GENESIS_HASH);
    assert_eq!(json["type"], "pay");
    assert!(json.get("close").is_none());
    assert!(json.get("note").is_none());

    let decoded: Transaction = decode_json(json).unwrap();
    assert_eq!(decoded, txn);
}

// =============================================================================
// Groups
// =============================================================================

#[test]
fn test_group_id_depends_on_order() {
    let first = seed_payment();
    let second = Transaction::builder(seed_key().address(), &testnet_params())
        .payment(RECEIVER.parse().unwrap(), 1, None)
        .note(b"second".to_vec())
        .build()
        .unwrap();

    let forward = compute_group_id(&[first.clone(), second.clone()]).unwrap();
    let backward = compute_group_id(&[second.clone(), first.clone()]).unwrap();
    assert_ne!(forward, backward);

    let mut group = vec![first, second];
    let assigned = assign_group_id(&mut group).unwrap();
    assert_eq!(assigned, forward);
    assert!(group.iter().all(|t| t.group() == Some(&forward)));

    // Grouping changes the ids, and the group id is computed from the
    // ungrouped ones.
    assert_ne!(group[0].id().unwrap(), seed_payment().id().unwrap());
}

#[test]
fn test_group_limits() {
    assert!(matches!(
        compute_group_id(&[]),
        Err(TransactionError::EmptyGroup)
    ));
    let group = vec![seed_payment(); MAX_TX_GROUP_SIZE + 1];
    assert!(matches!(
        compute_group_id(&group),
        Err(TransactionError::GroupTooLarge { size: 17, max: 16 })
    ));
}
