//! Atomic transaction composer.
//!
//! Collects transactions and ABI method calls into one group, assigns the
//! group id, gathers signatures from each distinct signer, submits the group
//! and decodes method return values once it is confirmed.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), algo_kit::Error> {
//! use std::sync::Arc;
//! use algo_kit::*;
//!
//! let client = AlgodClient::from_network(&LOCALNET);
//! let params = client.suggested_params().await?;
//! let key = SecretKey::generate();
//! let signer: Arc<dyn TransactionSigner> = Arc::new(BasicAccountSigner::new(key.clone()));
//!
//! let method = Method::from_signature("add(uint64,uint64)uint64")?;
//! let mut composer = AtomicTransactionComposer::new();
//! composer.add_method_call(
//!     MethodCallParams::new(1234, method, key.address(), params, signer)
//!         .args(vec![AbiValue::from(1u64).into(), AbiValue::from(2u64).into()]),
//! )?;
//!
//! let result = composer.execute(&client, 4).await?;
//! println!("{:?}", result.method_results[0].return_value);
//! # Ok(())
//! # }
//! ```
//!
//! A composer assumes a single owner; it is not meant to be shared between
//! tasks while it is being built.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use super::ComposerStatus;
use super::algod::AlgodTransport;
use super::signer::{TransactionSigner, TransactionWithSigner};
use super::wait::wait_for_confirmation;
use crate::abi::{
    self, AbiType, AbiValue, Method, MethodArgType, ReferenceType, find_return_value,
};
use crate::error::{AbiError, ComposerError, TransactionError};
use crate::types::{
    Address, ApplicationCallFields, BoxReference, MAX_TX_GROUP_SIZE, OnApplicationComplete,
    PendingTransactionResponse, ResourceReference, SignedTransaction, StateSchema,
    SuggestedParams, Transaction, TxId, compute_group_id,
};

// ============================================================================
// Method call parameters
// ============================================================================

/// A caller-supplied method argument.
#[derive(Debug, Clone)]
pub enum MethodArgValue {
    /// A value for an ABI-typed or reference argument.
    Abi(AbiValue),
    /// A transaction for a transaction-typed argument.
    Transaction(TransactionWithSigner),
}

impl From<AbiValue> for MethodArgValue {
    fn from(value: AbiValue) -> Self {
        MethodArgValue::Abi(value)
    }
}

impl From<TransactionWithSigner> for MethodArgValue {
    fn from(txn: TransactionWithSigner) -> Self {
        MethodArgValue::Transaction(txn)
    }
}

/// Everything needed to add one ABI method call to a composer.
#[derive(Debug, Clone)]
pub struct MethodCallParams {
    app_id: u64,
    method: Method,
    sender: Address,
    suggested_params: SuggestedParams,
    signer: Arc<dyn TransactionSigner>,
    on_complete: OnApplicationComplete,
    args: Vec<MethodArgValue>,
    approval_program: Vec<u8>,
    clear_program: Vec<u8>,
    global_schema: Option<StateSchema>,
    local_schema: Option<StateSchema>,
    extra_pages: u64,
    boxes: Vec<BoxReference>,
    access: Vec<ResourceReference>,
    note: Vec<u8>,
    lease: Option<Vec<u8>>,
    rekey_to: Option<Address>,
}

impl MethodCallParams {
    /// A NoOp call of `method` on `app_id` (0 creates the application).
    pub fn new(
        app_id: u64,
        method: Method,
        sender: Address,
        suggested_params: SuggestedParams,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        Self {
            app_id,
            method,
            sender,
            suggested_params,
            signer,
            on_complete: OnApplicationComplete::NoOp,
            args: Vec::new(),
            approval_program: Vec::new(),
            clear_program: Vec::new(),
            global_schema: None,
            local_schema: None,
            extra_pages: 0,
            boxes: Vec::new(),
            access: Vec::new(),
            note: Vec::new(),
            lease: None,
            rekey_to: None,
        }
    }

    pub fn on_complete(mut self, on_complete: OnApplicationComplete) -> Self {
        self.on_complete = on_complete;
        self
    }

    /// Arguments in method order.
    pub fn args(mut self, args: Vec<MethodArgValue>) -> Self {
        self.args = args;
        self
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<MethodArgValue>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Programs for application creation or update.
    pub fn programs(mut self, approval: impl Into<Vec<u8>>, clear: impl Into<Vec<u8>>) -> Self {
        self.approval_program = approval.into();
        self.clear_program = clear.into();
        self
    }

    /// State schemas for application creation.
    pub fn schemas(mut self, global: StateSchema, local: StateSchema) -> Self {
        self.global_schema = Some(global);
        self.local_schema = Some(local);
        self
    }

    pub fn extra_pages(mut self, pages: u64) -> Self {
        self.extra_pages = pages;
        self
    }

    pub fn boxes(mut self, boxes: Vec<BoxReference>) -> Self {
        self.boxes = boxes;
        self
    }

    /// Supply resources as an explicit access list instead of foreign arrays.
    pub fn access(mut self, access: Vec<ResourceReference>) -> Self {
        self.access = access;
        self
    }

    pub fn note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.note = note.into();
        self
    }

    pub fn lease(mut self, lease: impl Into<Vec<u8>>) -> Self {
        self.lease = Some(lease.into());
        self
    }

    pub fn rekey_to(mut self, address: Address) -> Self {
        self.rekey_to = Some(address);
        self
    }

    fn validate_app_params(&self) -> Result<(), TransactionError> {
        let has_programs = !self.approval_program.is_empty() || !self.clear_program.is_empty();
        let has_schemas = self.global_schema.is_some() || self.local_schema.is_some();
        let invalid = |msg: &str| Err(TransactionError::InvalidApplicationCall(msg.to_string()));

        if self.app_id == 0 {
            if self.approval_program.is_empty()
                || self.clear_program.is_empty()
                || !has_schemas
            {
                return invalid(
                    "creation requires approval and clear programs and state schemas",
                );
            }
        } else if self.on_complete == OnApplicationComplete::UpdateApplication {
            if self.approval_program.is_empty() || self.clear_program.is_empty() {
                return invalid("update requires approval and clear programs");
            }
            if has_schemas || self.extra_pages != 0 {
                return invalid("state schemas and extra pages can only be set at creation");
            }
        } else if has_programs || has_schemas || self.extra_pages != 0 {
            return invalid("programs, schemas and extra pages are only allowed at creation or update");
        }
        Ok(())
    }
}

/// Foreign arrays filled in while encoding reference arguments.
#[derive(Default)]
struct ForeignArrays {
    accounts: Vec<Address>,
    apps: Vec<u64>,
    assets: Vec<u64>,
}

/// Index of `value` in `array`, appending it if absent. A value equal to
/// `implicit` resolves to 0 without being stored; stored values are offset
/// by `offset`.
fn foreign_index<T: PartialEq + Copy>(
    array: &mut Vec<T>,
    value: T,
    implicit: Option<T>,
    offset: usize,
) -> usize {
    if implicit == Some(value) {
        return 0;
    }
    let position = match array.iter().position(|v| *v == value) {
        Some(position) => position,
        None => {
            array.push(value);
            array.len() - 1
        }
    };
    position + offset
}

// ============================================================================
// Results
// ============================================================================

/// The outcome of one method call in an executed group.
#[derive(Debug)]
pub struct AbiResult {
    pub tx_id: TxId,
    /// Encoded return value, empty for `void` methods.
    pub raw_return_value: Vec<u8>,
    pub method: Method,
    pub return_value: Option<AbiValue>,
    /// Why the return value is missing. Does not fail the execution.
    pub decode_error: Option<ComposerError>,
    pub tx_info: Option<PendingTransactionResponse>,
}

/// The outcome of [`AtomicTransactionComposer::execute`].
#[derive(Debug)]
pub struct ExecuteResult {
    pub confirmed_round: u64,
    pub tx_ids: Vec<TxId>,
    pub method_results: Vec<AbiResult>,
}

// ============================================================================
// Composer
// ============================================================================

/// Builds, signs, submits and executes an atomic transaction group.
#[derive(Debug, Default)]
pub struct AtomicTransactionComposer {
    status: ComposerStatus,
    transactions: Vec<TransactionWithSigner>,
    method_calls: BTreeMap<usize, Method>,
    signed: Vec<Vec<u8>>,
    tx_ids: Vec<TxId>,
}

impl AtomicTransactionComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ComposerStatus {
        self.status
    }

    /// Number of transactions added so far.
    pub fn count(&self) -> usize {
        self.transactions.len()
    }

    /// A new composer in the building state with the same transactions and
    /// method calls, group ids erased.
    pub fn clone_for_rebuild(&self) -> Self {
        let transactions = self
            .transactions
            .iter()
            .map(|entry| {
                let mut txn = entry.txn.clone();
                txn.clear_group();
                TransactionWithSigner::new(txn, entry.signer.clone())
            })
            .collect();
        Self {
            transactions,
            method_calls: self.method_calls.clone(),
            ..Self::default()
        }
    }

    fn ensure_building(&self, operation: &'static str) -> Result<(), ComposerError> {
        if self.status != ComposerStatus::Building {
            return Err(ComposerError::InvalidStatus {
                operation,
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_room(&self, adding: usize) -> Result<(), ComposerError> {
        if self.transactions.len() + adding > MAX_TX_GROUP_SIZE {
            return Err(ComposerError::GroupTooLarge {
                adding,
                max: MAX_TX_GROUP_SIZE,
            });
        }
        Ok(())
    }

    /// Add a plain transaction. It must not already belong to a group.
    pub fn add_transaction(&mut self, txn: TransactionWithSigner) -> Result<(), ComposerError> {
        self.ensure_building("add transactions")?;
        self.ensure_room(1)?;
        if txn.txn.group().is_some() {
            return Err(ComposerError::NonZeroGroup);
        }
        self.transactions.push(txn);
        Ok(())
    }

    /// Add an ABI method call.
    ///
    /// Transaction arguments are placed in the group ahead of the
    /// application call, in argument order.
    pub fn add_method_call(&mut self, params: MethodCallParams) -> Result<(), ComposerError> {
        self.ensure_building("add method calls")?;
        self.ensure_room(params.method.txn_count())?;
        params.validate_app_params()?;

        let declared = params.method.args();
        if declared.len() != params.args.len() {
            return Err(ComposerError::ArgumentCount {
                expected: declared.len(),
                actual: params.args.len(),
            });
        }

        let mut txn_args = Vec::new();
        let mut types = Vec::new();
        let mut values = Vec::new();
        let mut foreign = ForeignArrays::default();

        for (index, (arg, value)) in declared.iter().zip(&params.args).enumerate() {
            let invalid = |message: String| ComposerError::InvalidArgument { index, message };
            match (&arg.arg_type, value) {
                (MethodArgType::Transaction(kind), MethodArgValue::Transaction(txn)) => {
                    let actual = txn.txn.transaction_type();
                    if !kind.accepts(actual) {
                        return Err(invalid(format!(
                            "expected a {} transaction, got {}",
                            kind.as_str(),
                            actual
                        )));
                    }
                    if txn.txn.group().is_some() {
                        return Err(ComposerError::NonZeroGroup);
                    }
                    txn_args.push(txn.clone());
                }
                (MethodArgType::Transaction(kind), MethodArgValue::Abi(_)) => {
                    return Err(invalid(format!(
                        "expected a {} transaction with signer",
                        kind.as_str()
                    )));
                }
                (_, MethodArgValue::Transaction(_)) => {
                    return Err(invalid("unexpected transaction argument".to_string()));
                }
                (MethodArgType::Reference(reference), MethodArgValue::Abi(value)) => {
                    let position = match reference {
                        ReferenceType::Account => {
                            let address = value
                                .as_address()
                                .ok_or_else(|| invalid("expected an address".to_string()))?;
                            foreign_index(&mut foreign.accounts, address, Some(params.sender), 1)
                        }
                        ReferenceType::Application => {
                            let id = value
                                .as_u64()
                                .ok_or_else(|| invalid("expected an application id".to_string()))?;
                            foreign_index(&mut foreign.apps, id, Some(params.app_id), 1)
                        }
                        ReferenceType::Asset => {
                            let id = value
                                .as_u64()
                                .ok_or_else(|| invalid("expected an asset id".to_string()))?;
                            foreign_index(&mut foreign.assets, id, None, 0)
                        }
                    };
                    types.push(AbiType::Uint(8));
                    values.push(AbiValue::from(position as u64));
                }
                (MethodArgType::Value(abi_type), MethodArgValue::Abi(value)) => {
                    types.push(abi_type.clone());
                    values.push(value.clone());
                }
            }
        }

        let (types, values) = abi::pack_trailing_args(types, values);
        let mut app_args = Vec::with_capacity(types.len() + 1);
        app_args.push(params.method.selector().to_vec());
        for (abi_type, value) in types.iter().zip(&values) {
            app_args.push(abi_type.encode(value)?);
        }

        let fields = ApplicationCallFields {
            app_id: params.app_id,
            on_complete: params.on_complete,
            approval_program: params.approval_program,
            clear_program: params.clear_program,
            global_schema: params.global_schema.unwrap_or_default(),
            local_schema: params.local_schema.unwrap_or_default(),
            extra_pages: params.extra_pages,
            args: app_args,
            accounts: foreign.accounts,
            foreign_apps: foreign.apps,
            foreign_assets: foreign.assets,
            boxes: params.boxes,
            access: params.access,
        };
        let mut builder = Transaction::builder(params.sender, &params.suggested_params)
            .application_call(fields)
            .note(params.note);
        if let Some(lease) = params.lease {
            builder = builder.lease(lease);
        }
        if let Some(rekey_to) = params.rekey_to {
            builder = builder.rekey_to(rekey_to);
        }
        let call = builder.build()?;

        self.transactions.extend(txn_args);
        self.transactions
            .push(TransactionWithSigner::new(call, params.signer));
        self.method_calls
            .insert(self.transactions.len() - 1, params.method);
        Ok(())
    }

    /// Finalize the group and assign the group id.
    ///
    /// A single transaction is left without a group id.
    pub fn build_group(&mut self) -> Result<&[TransactionWithSigner], ComposerError> {
        if self.status == ComposerStatus::Building {
            if self.transactions.is_empty() {
                return Err(TransactionError::EmptyGroup.into());
            }
            if self.transactions.len() > 1 {
                let txns: Vec<Transaction> =
                    self.transactions.iter().map(|t| t.txn.clone()).collect();
                let group = compute_group_id(&txns)?;
                for entry in &mut self.transactions {
                    entry.txn.assign_group(group);
                }
                debug!(
                    size = self.transactions.len(),
                    group = %hex::encode(group),
                    "built transaction group"
                );
            }
            self.status = ComposerStatus::Built;
        }
        Ok(&self.transactions)
    }

    /// Collect signatures, calling each distinct signer once with every index
    /// it is responsible for. Cached after the first success.
    pub async fn gather_signatures(&mut self) -> Result<Vec<Vec<u8>>, ComposerError> {
        if self.status >= ComposerStatus::Signed {
            return Ok(self.signed.clone());
        }
        self.build_group()?;

        let group: Vec<Transaction> = self.transactions.iter().map(|t| t.txn.clone()).collect();
        let mut batches: Vec<(Arc<dyn TransactionSigner>, Vec<usize>)> = Vec::new();
        for (index, entry) in self.transactions.iter().enumerate() {
            let existing = batches.iter_mut().find(|(signer, _)| {
                std::ptr::addr_eq(Arc::as_ptr(signer), Arc::as_ptr(&entry.signer))
            });
            match existing {
                Some((_, indexes)) => indexes.push(index),
                None => batches.push((entry.signer.clone(), vec![index])),
            }
        }

        let results = try_join_all(batches.iter().map(|(signer, indexes)| {
            debug!(count = indexes.len(), "requesting signatures");
            signer.sign_transactions(&group, indexes)
        }))
        .await?;

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; group.len()];
        for ((_, indexes), signed) in batches.iter().zip(results) {
            if signed.len() != indexes.len() {
                return Err(crate::error::SignerError::SignatureCountMismatch {
                    expected: indexes.len(),
                    actual: signed.len(),
                }
                .into());
            }
            for (&index, blob) in indexes.iter().zip(signed) {
                slots[index] = Some(blob);
            }
        }

        let missing: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect();
        if !missing.is_empty() {
            return Err(ComposerError::MissingSignatures(missing));
        }
        let signed: Vec<Vec<u8>> = slots.into_iter().flatten().collect();

        let tx_ids = signed
            .iter()
            .enumerate()
            .map(|(index, blob)| {
                SignedTransaction::from_msgpack(blob)
                    .and_then(|stx| stx.id())
                    .map_err(|source| ComposerError::DecodeSignedTransaction { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.signed = signed;
        self.tx_ids = tx_ids;
        self.status = ComposerStatus::Signed;
        Ok(self.signed.clone())
    }

    /// Send the signed group to the node. Returns the transaction ids.
    ///
    /// A group is sent at most once; later calls fail.
    pub async fn submit<T: AlgodTransport + ?Sized>(
        &mut self,
        client: &T,
    ) -> Result<Vec<TxId>, ComposerError> {
        if self.status >= ComposerStatus::Submitted {
            return Err(ComposerError::AlreadySubmitted);
        }
        let signed = self.gather_signatures().await?;
        let bytes: usize = signed.iter().map(Vec::len).sum();
        debug!(count = signed.len(), bytes, "submitting transaction group");
        client.send_raw_transactions(&signed).await?;
        self.status = ComposerStatus::Submitted;
        Ok(self.tx_ids.clone())
    }

    /// Submit the group unless already submitted, wait up to `wait_rounds`
    /// rounds for it to be confirmed, then decode each method call's return
    /// value.
    pub async fn execute<T: AlgodTransport + ?Sized>(
        &mut self,
        client: &T,
        wait_rounds: u64,
    ) -> Result<ExecuteResult, ComposerError> {
        if self.status == ComposerStatus::Committed {
            return Err(ComposerError::AlreadyExecuted);
        }
        if self.status < ComposerStatus::Submitted {
            self.submit(client).await?;
        }

        let wait_index = self.method_calls.keys().next().copied().unwrap_or(0);
        let confirmed = wait_for_confirmation(client, &self.tx_ids[wait_index], wait_rounds).await?;
        self.status = ComposerStatus::Committed;
        let confirmed_round = confirmed.confirmed_round.unwrap_or_default();
        debug!(confirmed_round, "transaction group committed");

        let mut method_results = Vec::with_capacity(self.method_calls.len());
        for (&index, method) in &self.method_calls {
            let tx_id = self.tx_ids[index];
            let info = if index == wait_index {
                Ok(confirmed.clone())
            } else {
                client.pending_transaction_information(&tx_id).await
            };
            method_results.push(method_result(tx_id, method, info));
        }

        Ok(ExecuteResult {
            confirmed_round,
            tx_ids: self.tx_ids.clone(),
            method_results,
        })
    }
}

fn method_result(
    tx_id: TxId,
    method: &Method,
    info: Result<PendingTransactionResponse, crate::error::AlgodError>,
) -> AbiResult {
    let mut result = AbiResult {
        tx_id,
        raw_return_value: Vec::new(),
        method: method.clone(),
        return_value: None,
        decode_error: None,
        tx_info: None,
    };
    let info = match info {
        Ok(info) => info,
        Err(e) => {
            result.decode_error = Some(e.into());
            return result;
        }
    };

    if let Some(returns) = method.returns() {
        match find_return_value(&info.logs) {
            None => {
                result.decode_error = Some(
                    AbiError::decode("app call transaction did not log a return value").into(),
                );
            }
            Some(raw) => {
                result.raw_return_value = raw.to_vec();
                match returns.decode(raw) {
                    Ok(value) => result.return_value = Some(value),
                    Err(e) => result.decode_error = Some(e.into()),
                }
            }
        }
    }
    result.tx_info = Some(info);
    result
}
