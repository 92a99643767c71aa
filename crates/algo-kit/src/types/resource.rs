//! Application resource references.
//!
//! An application call names the accounts, assets, applications, holdings,
//! locals and boxes it may touch. Callers describe them by value with
//! [`ResourceReference`]; on the wire they become either legacy foreign
//! arrays (`apat`/`apas`/`apfa`/`apbx`) or a single access list (`al`) of
//! [`AccessEntry`] values whose compound entries point at earlier entries by
//! 1-based position.

use std::sync::OnceLock;

use super::Address;
use crate::encoding::{Fields, MapEntry, Schema, Value};
use crate::error::{EncodingError, TransactionError};

/// A box owned by an application. `app_id` 0 means the called application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BoxReference {
    pub app_id: u64,
    pub name: Vec<u8>,
}

impl BoxReference {
    pub fn new(app_id: u64, name: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id,
            name: name.into(),
        }
    }
}

/// An account's holding of an asset. The zero address means the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoldingReference {
    pub address: Address,
    pub asset_id: u64,
}

/// An account's local state in an application. The zero address means the
/// sender and app 0 means the called application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalsReference {
    pub address: Address,
    pub app_id: u64,
}

/// A resource an application call may access, named by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceReference {
    Address(Address),
    Asset(u64),
    App(u64),
    Holding(HoldingReference),
    Locals(LocalsReference),
    Box(BoxReference),
}

/// One entry of the wire access list. Indices are 1-based positions in the
/// same list; 0 stands for the sender or the called application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEntry {
    Address(Address),
    Asset(u64),
    App(u64),
    Holding { address_index: u64, asset_index: u64 },
    Locals { address_index: u64, app_index: u64 },
    Box { app_index: u64, name: Vec<u8> },
}

/// Flatten legacy foreign arrays into one reference list, in the fixed order
/// accounts, assets, apps, holdings, locals, boxes.
pub fn foreign_arrays_to_resource_references(
    accounts: &[Address],
    assets: &[u64],
    apps: &[u64],
    holdings: &[HoldingReference],
    locals: &[LocalsReference],
    boxes: &[BoxReference],
) -> Vec<ResourceReference> {
    accounts
        .iter()
        .map(|a| ResourceReference::Address(*a))
        .chain(assets.iter().map(|id| ResourceReference::Asset(*id)))
        .chain(apps.iter().map(|id| ResourceReference::App(*id)))
        .chain(holdings.iter().map(|h| ResourceReference::Holding(*h)))
        .chain(locals.iter().map(|l| ResourceReference::Locals(*l)))
        .chain(boxes.iter().cloned().map(ResourceReference::Box))
        .collect()
}

// ============================================================================
// Access list construction
// ============================================================================

/// Check references that cannot be expressed in an access list for a call
/// to `app_id`.
pub fn validate_resource_references(
    app_id: u64,
    references: &[ResourceReference],
) -> Result<(), TransactionError> {
    for reference in references {
        let problem = match reference {
            ResourceReference::Holding(h) if h.asset_id == 0 => {
                "holding reference requires a nonzero asset id"
            }
            ResourceReference::Locals(l)
                if l.address.is_zero() && (l.app_id == 0 || l.app_id == app_id) =>
            {
                "the sender's local state in the called application is always available"
            }
            ResourceReference::Box(b) if b.name.is_empty() => "box reference requires a name",
            _ => continue,
        };
        return Err(TransactionError::InvalidApplicationCall(problem.to_string()));
    }
    Ok(())
}

/// Build the deduplicated access list for a call to `app_id`.
///
/// Address, asset and app entries are deduplicated by value and keep
/// first-seen order. Holdings, locals and boxes are always appended, after
/// pulling in the address/asset/app entries they point to. Zero-valued plain
/// references (sender, asset 0, this app) add nothing.
pub fn resource_references_to_access_list(
    app_id: u64,
    references: &[ResourceReference],
) -> Result<Vec<AccessEntry>, TransactionError> {
    validate_resource_references(app_id, references)?;

    let mut list = AccessList::default();
    for reference in references {
        match reference {
            ResourceReference::Address(address) => {
                if !address.is_zero() {
                    list.ensure(AccessEntry::Address(*address));
                }
            }
            ResourceReference::Asset(id) => {
                if *id != 0 {
                    list.ensure(AccessEntry::Asset(*id));
                }
            }
            ResourceReference::App(id) => {
                if *id != 0 {
                    list.ensure(AccessEntry::App(*id));
                }
            }
            ResourceReference::Holding(h) => {
                let address_index = list.address_index(&h.address);
                let asset_index = list.ensure(AccessEntry::Asset(h.asset_id));
                list.push(AccessEntry::Holding {
                    address_index,
                    asset_index,
                });
            }
            ResourceReference::Locals(l) => {
                let address_index = list.address_index(&l.address);
                let app_index = list.app_index(app_id, l.app_id);
                list.push(AccessEntry::Locals {
                    address_index,
                    app_index,
                });
            }
            ResourceReference::Box(b) => {
                let app_index = list.app_index(app_id, b.app_id);
                list.push(AccessEntry::Box {
                    app_index,
                    name: b.name.clone(),
                });
            }
        }
    }
    Ok(list.entries)
}

/// Resolve an access list back into references, one per entry.
///
/// Index 0 resolves to the zero address (sender) or app 0 (this app).
pub fn access_list_to_resource_references(
    entries: &[AccessEntry],
) -> Result<Vec<ResourceReference>, EncodingError> {
    let address_at = |index: u64| -> Result<Address, EncodingError> {
        if index == 0 {
            return Ok(Address::ZERO);
        }
        match entry_at(entries, index)? {
            AccessEntry::Address(a) => Ok(*a),
            other => Err(EncodingError::invalid(format!(
                "access list index {index} is not an address: {other:?}"
            ))),
        }
    };
    let app_at = |index: u64| -> Result<u64, EncodingError> {
        if index == 0 {
            return Ok(0);
        }
        match entry_at(entries, index)? {
            AccessEntry::App(id) => Ok(*id),
            other => Err(EncodingError::invalid(format!(
                "access list index {index} is not an application: {other:?}"
            ))),
        }
    };

    entries
        .iter()
        .map(|entry| {
            Ok(match entry {
                AccessEntry::Address(a) => ResourceReference::Address(*a),
                AccessEntry::Asset(id) => ResourceReference::Asset(*id),
                AccessEntry::App(id) => ResourceReference::App(*id),
                AccessEntry::Holding {
                    address_index,
                    asset_index,
                } => {
                    let asset_id = match entry_at(entries, *asset_index)? {
                        AccessEntry::Asset(id) => *id,
                        other => {
                            return Err(EncodingError::invalid(format!(
                                "access list index {asset_index} is not an asset: {other:?}"
                            )));
                        }
                    };
                    ResourceReference::Holding(HoldingReference {
                        address: address_at(*address_index)?,
                        asset_id,
                    })
                }
                AccessEntry::Locals {
                    address_index,
                    app_index,
                } => ResourceReference::Locals(LocalsReference {
                    address: address_at(*address_index)?,
                    app_id: app_at(*app_index)?,
                }),
                AccessEntry::Box { app_index, name } => ResourceReference::Box(BoxReference {
                    app_id: app_at(*app_index)?,
                    name: name.clone(),
                }),
            })
        })
        .collect()
}

fn entry_at(entries: &[AccessEntry], index: u64) -> Result<&AccessEntry, EncodingError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| entries.get(i))
        .ok_or_else(|| {
            EncodingError::invalid(format!(
                "access list index {index} out of range for {} entries",
                entries.len()
            ))
        })
}

#[derive(Default)]
struct AccessList {
    entries: Vec<AccessEntry>,
}

impl AccessList {
    /// 1-based position of `entry`, appending it if absent.
    fn ensure(&mut self, entry: AccessEntry) -> u64 {
        let position = match self.entries.iter().position(|e| *e == entry) {
            Some(i) => i,
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        position as u64 + 1
    }

    fn push(&mut self, entry: AccessEntry) {
        self.entries.push(entry);
    }

    fn address_index(&mut self, address: &Address) -> u64 {
        if address.is_zero() {
            0
        } else {
            self.ensure(AccessEntry::Address(*address))
        }
    }

    fn app_index(&mut self, called: u64, app_id: u64) -> u64 {
        if app_id == 0 || app_id == called {
            0
        } else {
            self.ensure(AccessEntry::App(app_id))
        }
    }
}

// ============================================================================
// Legacy box references
// ============================================================================

/// Wire index of a box's application: its 1-based position in
/// `foreign_apps`, or 0 for the called application.
pub fn box_reference_index(
    reference: &BoxReference,
    foreign_apps: &[u64],
    app_id: u64,
) -> Result<u64, TransactionError> {
    if let Some(i) = foreign_apps.iter().position(|id| *id == reference.app_id) {
        return Ok(i as u64 + 1);
    }
    if reference.app_id == 0 || reference.app_id == app_id {
        return Ok(0);
    }
    Err(TransactionError::BoxReferenceNotInForeignApps(
        reference.app_id,
    ))
}

/// Inverse of [`box_reference_index`].
pub(crate) fn box_reference_app(index: u64, foreign_apps: &[u64]) -> Result<u64, EncodingError> {
    if index == 0 {
        return Ok(0);
    }
    usize::try_from(index - 1)
        .ok()
        .and_then(|i| foreign_apps.get(i))
        .copied()
        .ok_or_else(|| {
            EncodingError::invalid(format!(
                "box reference index {index} out of range for {} foreign apps",
                foreign_apps.len()
            ))
        })
}

// ============================================================================
// Wire schemas
// ============================================================================

pub(crate) fn box_reference_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::field("i", Schema::Uint64),
            MapEntry::field("n", Schema::ByteArray),
        ])
    })
}

pub(crate) fn access_entry_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::field("b", Schema::Ref(box_reference_schema)),
            MapEntry::field("d", Schema::Address),
            MapEntry::field(
                "h",
                Schema::named_map(vec![
                    MapEntry::field("d", Schema::Uint64),
                    MapEntry::field("s", Schema::Uint64),
                ]),
            ),
            MapEntry::field(
                "l",
                Schema::named_map(vec![
                    MapEntry::field("d", Schema::Uint64),
                    MapEntry::field("p", Schema::Uint64),
                ]),
            ),
            MapEntry::field("p", Schema::Uint64),
            MapEntry::field("s", Schema::Uint64),
        ])
    })
}

impl AccessEntry {
    pub(crate) fn to_encoding_data(&self) -> Value {
        let fields = match self {
            AccessEntry::Address(a) => Fields::new().with("d", *a),
            AccessEntry::Asset(id) => Fields::new().with("s", *id),
            AccessEntry::App(id) => Fields::new().with("p", *id),
            AccessEntry::Holding {
                address_index,
                asset_index,
            } => Fields::new().with(
                "h",
                Fields::new()
                    .with("d", *address_index)
                    .with("s", *asset_index),
            ),
            AccessEntry::Locals {
                address_index,
                app_index,
            } => Fields::new().with(
                "l",
                Fields::new()
                    .with("d", *address_index)
                    .with("p", *app_index),
            ),
            AccessEntry::Box { app_index, name } => Fields::new().with(
                "b",
                Fields::new().with("i", *app_index).with("n", name.clone()),
            ),
        };
        fields.into()
    }

    /// Decode one entry. Exactly one of the keys must be set.
    pub(crate) fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let schema = access_entry_schema();
        let mut f = data.into_fields()?;
        let mut found = Vec::new();

        let d = f.take_address("d")?;
        if !d.is_zero() {
            found.push(AccessEntry::Address(d));
        }
        let s = f.take_u64("s")?;
        if s != 0 {
            found.push(AccessEntry::Asset(s));
        }
        let p = f.take_u64("p")?;
        if p != 0 {
            found.push(AccessEntry::App(p));
        }
        let h = f.take("h")?;
        if !entry_schema(schema, "h").is_default(&h) {
            let mut h = h.into_fields()?;
            found.push(AccessEntry::Holding {
                address_index: h.take_u64("d")?,
                asset_index: h.take_u64("s")?,
            });
        }
        let l = f.take("l")?;
        if !entry_schema(schema, "l").is_default(&l) {
            let mut l = l.into_fields()?;
            found.push(AccessEntry::Locals {
                address_index: l.take_u64("d")?,
                app_index: l.take_u64("p")?,
            });
        }
        let b = f.take("b")?;
        if !box_reference_schema().is_default(&b) {
            let mut b = b.into_fields()?;
            found.push(AccessEntry::Box {
                app_index: b.take_u64("i")?,
                name: b.take_bytes("n")?,
            });
        }

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(EncodingError::invalid("empty access list entry")),
            n => Err(EncodingError::invalid(format!(
                "access list entry sets {n} resources"
            ))),
        }
    }
}

fn entry_schema<'a>(schema: &'a Schema, key: &str) -> &'a Schema {
    match schema {
        Schema::NamedMap(map) => map
            .entries()
            .into_iter()
            .find(|e| e.key == key)
            .map(|e| &e.schema)
            .unwrap_or(schema),
        _ => schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_foreign_array_order() {
        let refs = foreign_arrays_to_resource_references(
            &[addr(1)],
            &[7],
            &[9],
            &[HoldingReference {
                address: addr(1),
                asset_id: 7,
            }],
            &[],
            &[BoxReference::new(9, "n")],
        );
        assert_eq!(
            refs,
            vec![
                ResourceReference::Address(addr(1)),
                ResourceReference::Asset(7),
                ResourceReference::App(9),
                ResourceReference::Holding(HoldingReference {
                    address: addr(1),
                    asset_id: 7
                }),
                ResourceReference::Box(BoxReference::new(9, "n")),
            ]
        );
    }

    #[test]
    fn test_dedup_by_value() {
        let refs = vec![
            ResourceReference::Address(addr(1)),
            ResourceReference::Address(Address::from_bytes([1; 32])),
            ResourceReference::Asset(7),
            ResourceReference::Asset(7),
            ResourceReference::Holding(HoldingReference {
                address: addr(1),
                asset_id: 7,
            }),
        ];
        let list = resource_references_to_access_list(100, &refs).unwrap();
        assert_eq!(
            list,
            vec![
                AccessEntry::Address(addr(1)),
                AccessEntry::Asset(7),
                AccessEntry::Holding {
                    address_index: 1,
                    asset_index: 2
                },
            ]
        );
    }

    #[test]
    fn test_compound_entries_are_not_deduplicated() {
        let holding = HoldingReference {
            address: addr(4),
            asset_id: 8,
        };
        let refs = vec![
            ResourceReference::Box(BoxReference::new(55, "key")),
            ResourceReference::Box(BoxReference::new(55, "key")),
            ResourceReference::Holding(holding),
            ResourceReference::Holding(holding),
        ];
        let list = resource_references_to_access_list(100, &refs).unwrap();
        let box_entry = AccessEntry::Box {
            app_index: 1,
            name: b"key".to_vec(),
        };
        let holding_entry = AccessEntry::Holding {
            address_index: 4,
            asset_index: 5,
        };
        assert_eq!(
            list,
            vec![
                AccessEntry::App(55),
                box_entry.clone(),
                box_entry,
                AccessEntry::Address(addr(4)),
                AccessEntry::Asset(8),
                holding_entry.clone(),
                holding_entry,
            ]
        );
    }

    #[test]
    fn test_dependents_pull_in_targets() {
        let refs = vec![
            ResourceReference::Locals(LocalsReference {
                address: addr(2),
                app_id: 55,
            }),
            ResourceReference::Box(BoxReference::new(55, "key")),
            ResourceReference::Box(BoxReference::new(100, "own")),
            ResourceReference::Holding(HoldingReference {
                address: Address::ZERO,
                asset_id: 3,
            }),
        ];
        let list = resource_references_to_access_list(100, &refs).unwrap();
        assert_eq!(
            list,
            vec![
                AccessEntry::Address(addr(2)),
                AccessEntry::App(55),
                AccessEntry::Locals {
                    address_index: 1,
                    app_index: 2
                },
                AccessEntry::Box {
                    app_index: 2,
                    name: b"key".to_vec()
                },
                AccessEntry::Box {
                    app_index: 0,
                    name: b"own".to_vec()
                },
                AccessEntry::Asset(3),
                AccessEntry::Holding {
                    address_index: 0,
                    asset_index: 6
                },
            ]
        );
    }

    #[test]
    fn test_zero_plain_references_skipped() {
        let refs = vec![
            ResourceReference::Address(Address::ZERO),
            ResourceReference::Asset(0),
            ResourceReference::App(0),
        ];
        assert!(resource_references_to_access_list(1, &refs).unwrap().is_empty());
    }

    #[test]
    fn test_holding_requires_asset() {
        let refs = vec![ResourceReference::Holding(HoldingReference {
            address: addr(1),
            asset_id: 0,
        })];
        assert!(resource_references_to_access_list(1, &refs).is_err());
    }

    #[test]
    fn test_resolve_access_list() {
        let refs = vec![
            ResourceReference::Holding(HoldingReference {
                address: addr(1),
                asset_id: 7,
            }),
            ResourceReference::Locals(LocalsReference {
                address: Address::ZERO,
                app_id: 77,
            }),
        ];
        let list = resource_references_to_access_list(5, &refs).unwrap();
        let resolved = access_list_to_resource_references(&list).unwrap();
        assert_eq!(
            resolved,
            vec![
                ResourceReference::Address(addr(1)),
                ResourceReference::Asset(7),
                refs[0].clone(),
                ResourceReference::App(77),
                refs[1].clone(),
            ]
        );
        // resolving is a fixed point of building
        assert_eq!(
            resource_references_to_access_list(5, &resolved).unwrap(),
            list
        );
    }

    #[test]
    fn test_implicit_references_rejected() {
        let sender_locals = ResourceReference::Locals(LocalsReference {
            address: Address::ZERO,
            app_id: 5,
        });
        assert!(resource_references_to_access_list(5, &[sender_locals]).is_err());
        let unnamed = ResourceReference::Box(BoxReference::new(5, Vec::new()));
        assert!(resource_references_to_access_list(5, &[unnamed]).is_err());
    }

    #[test]
    fn test_resolve_rejects_bad_index() {
        let list = vec![
            AccessEntry::Asset(1),
            AccessEntry::Holding {
                address_index: 1,
                asset_index: 1,
            },
        ];
        assert!(access_list_to_resource_references(&list).is_err());
        let list = vec![AccessEntry::Box {
            app_index: 4,
            name: vec![1],
        }];
        assert!(access_list_to_resource_references(&list).is_err());
    }

    #[test]
    fn test_box_reference_index() {
        let foreign = [10, 20];
        assert_eq!(
            box_reference_index(&BoxReference::new(20, "a"), &foreign, 5).unwrap(),
            2
        );
        assert_eq!(
            box_reference_index(&BoxReference::new(5, "a"), &foreign, 5).unwrap(),
            0
        );
        assert_eq!(
            box_reference_index(&BoxReference::new(0, "a"), &foreign, 5).unwrap(),
            0
        );
        assert_eq!(
            box_reference_index(&BoxReference::new(99, "a"), &foreign, 5)
                .unwrap_err()
                .to_string(),
            "Box ref with appId 99 not in foreign-apps"
        );
        assert_eq!(box_reference_app(2, &foreign).unwrap(), 20);
        assert!(box_reference_app(3, &foreign).is_err());
    }

    #[test]
    fn test_access_entry_wire_shape() {
        let schema = access_entry_schema();
        let entry = AccessEntry::Holding {
            address_index: 0,
            asset_index: 2,
        };
        let packed = schema.to_msgpack(&entry.to_encoding_data()).unwrap();
        let Some(pairs) = packed.as_map() else {
            panic!("expected map");
        };
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.as_str(), Some("h"));

        let back = AccessEntry::from_encoding_data(schema.from_msgpack(packed).unwrap()).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_access_entry_rejects_ambiguous() {
        let schema = access_entry_schema();
        let raw = rmpv::Value::Map(vec![
            (rmpv::Value::from("s"), rmpv::Value::from(1u64)),
            (rmpv::Value::from("p"), rmpv::Value::from(2u64)),
        ]);
        let data = schema.from_msgpack(raw).unwrap();
        assert!(AccessEntry::from_encoding_data(data).is_err());
    }

    #[test]
    fn test_schemas_valid() {
        for schema in [access_entry_schema(), box_reference_schema()] {
            let Schema::NamedMap(map) = schema else {
                panic!("expected named map");
            };
            map.validate().unwrap();
        }
    }
}
