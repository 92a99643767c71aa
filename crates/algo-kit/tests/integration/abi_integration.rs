//! ABI encoding and contract description tests.

use algo_kit::*;

fn parse(t: &str) -> AbiType {
    t.parse().unwrap()
}

#[test]
fn test_string_tuple_layout() {
    let t = parse("(string,string)");
    let value = AbiValue::Array(vec!["hello".into(), "world".into()]);

    let bytes = t.encode(&value).unwrap();
    assert_eq!(hex::encode(&bytes), "0004000b000568656c6c6f0005776f726c64");
    assert_eq!(t.decode(&bytes).unwrap(), value);
}

#[test]
fn test_dynamic_uint_array() {
    let t = parse("uint64[]");
    let value = AbiValue::Array((1u64..=5).map(AbiValue::from).collect());

    let bytes = t.encode(&value).unwrap();
    assert_eq!(bytes.len(), 2 + 5 * 8);
    assert_eq!(&bytes[..2], &[0x00, 0x05]);
    assert_eq!(&bytes[34..], &5u64.to_be_bytes());
    assert_eq!(t.decode(&bytes).unwrap(), value);
}

#[test]
fn test_mixed_tuple_with_packed_bools() {
    let t = parse("(bool,bool,uint16,byte[2],address)");
    let address = Address::from_bytes([0xab; 32]);
    let value = AbiValue::Array(vec![
        true.into(),
        true.into(),
        AbiValue::from(513u32),
        AbiValue::bytes([7, 9]),
        address.into(),
    ]);

    let bytes = t.encode(&value).unwrap();
    assert_eq!(bytes.len(), 1 + 2 + 2 + 32);
    assert_eq!(&bytes[..5], &[0xc0, 0x02, 0x01, 0x07, 0x09]);
    assert_eq!(&bytes[5..], address.as_bytes());
    assert_eq!(t.byte_len().unwrap(), 37);
    assert_eq!(t.decode(&bytes).unwrap(), value);
}

#[test]
fn test_decode_rejects_overrun_and_trailing_bytes() {
    // claims 4 uint64 elements but carries one
    let short = hex::decode("00040000000000000001").unwrap();
    assert!(parse("uint64[]").decode(&short).is_err());

    let mut padded = parse("uint32").encode(&AbiValue::from(5u32)).unwrap();
    padded.push(0);
    assert!(parse("uint32").decode(&padded).is_err());
}

#[test]
fn test_out_of_range_value() {
    let err = parse("uint8").encode(&AbiValue::from(256u32)).unwrap_err();
    assert!(matches!(err, AbiError::OutOfRange { .. }));
}

#[test]
fn test_contract_method_selectors() {
    let contract = Contract::from_json(
        r#"{
            "name": "Calculator",
            "networks": {"SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=": {"appID": 77}},
            "methods": [
                {"name": "add", "desc": "Add two numbers",
                 "args": [{"type": "uint64", "name": "a"}, {"type": "uint64", "name": "b"}],
                 "returns": {"type": "uint128"}},
                {"name": "pay_and_log", "args": [{"type": "pay"}, {"type": "account"}],
                 "returns": {"type": "void"}}
            ]
        }"#,
    )
    .unwrap();

    let add = contract.get_method_by_name("add").unwrap();
    assert_eq!(add.signature(), "add(uint64,uint64)uint128");
    assert_eq!(hex::encode(add.selector()), "8aa3b61f");
    assert_eq!(add.description(), Some("Add two numbers"));
    assert_eq!(add.txn_count(), 1);

    let pay = contract.get_method_by_name("pay_and_log").unwrap();
    assert_eq!(pay.signature(), "pay_and_log(pay,account)void");
    assert_eq!(pay.txn_count(), 2);
    assert!(pay.returns().is_none());

    assert_eq!(
        contract.app_id("SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI="),
        Some(77)
    );
}

#[test]
fn test_invalid_type_strings() {
    for bad in ["uint7", "uint520", "ufixed64x0", "byte[01]", "(uint64", "uint64,", "()[", "foo"] {
        assert!(bad.parse::<AbiType>().is_err(), "{bad} should not parse");
    }
}
