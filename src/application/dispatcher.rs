use super::engine::LedgerEngine;
use crate::domain::account::Account;
use crate::domain::item::Item;
use crate::domain::money::{Balance, Price};
use crate::error::{LedgerError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, warn};

/// Every operation the ledger accepts, by invocation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitLedger,
    CreateItem,
    QueryItem,
    QueryAllItems,
    UpdateItemName,
    UpdateCategory,
    UpdatePrice,
    UpdateOwner,
    TransferOwnership,
    DeleteItem,
    CreateAccount,
    QueryAccount,
    QueryAllAccounts,
    UpdateAccountName,
    UpdateEmail,
    UpdateBalance,
    DeleteAccount,
}

/// Alternative names kept for callers of the older chaincode.
const ALIASES: [(&str, Operation); 2] = [
    ("changeItemOwner", Operation::UpdateOwner),
    ("queryAllUsers", Operation::QueryAllAccounts),
];

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::InitLedger,
        Operation::CreateItem,
        Operation::QueryItem,
        Operation::QueryAllItems,
        Operation::UpdateItemName,
        Operation::UpdateCategory,
        Operation::UpdatePrice,
        Operation::UpdateOwner,
        Operation::TransferOwnership,
        Operation::DeleteItem,
        Operation::CreateAccount,
        Operation::QueryAccount,
        Operation::QueryAllAccounts,
        Operation::UpdateAccountName,
        Operation::UpdateEmail,
        Operation::UpdateBalance,
        Operation::DeleteAccount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::InitLedger => "initLedger",
            Operation::CreateItem => "createItem",
            Operation::QueryItem => "queryItem",
            Operation::QueryAllItems => "queryAllItems",
            Operation::UpdateItemName => "updateItemName",
            Operation::UpdateCategory => "updateCategory",
            Operation::UpdatePrice => "updatePrice",
            Operation::UpdateOwner => "updateOwner",
            Operation::TransferOwnership => "transferOwnership",
            Operation::DeleteItem => "deleteItem",
            Operation::CreateAccount => "createAccount",
            Operation::QueryAccount => "queryAccount",
            Operation::QueryAllAccounts => "queryAllAccounts",
            Operation::UpdateAccountName => "updateAccountName",
            Operation::UpdateEmail => "updateEmail",
            Operation::UpdateBalance => "updateBalance",
            Operation::DeleteAccount => "deleteAccount",
        }
    }

    /// Exact number of arguments the operation takes.
    pub fn arity(self) -> usize {
        match self {
            Operation::InitLedger | Operation::QueryAllItems | Operation::QueryAllAccounts => 0,
            Operation::QueryItem
            | Operation::DeleteItem
            | Operation::QueryAccount
            | Operation::DeleteAccount => 1,
            Operation::UpdateItemName
            | Operation::UpdateCategory
            | Operation::UpdatePrice
            | Operation::UpdateOwner
            | Operation::TransferOwnership
            | Operation::UpdateAccountName
            | Operation::UpdateEmail
            | Operation::UpdateBalance => 2,
            Operation::CreateAccount => 4,
            Operation::CreateItem => 5,
        }
    }

    pub fn check_arity(self, given: usize) -> Result<()> {
        let expected = self.arity();
        if given == expected {
            Ok(())
        } else {
            Err(LedgerError::invalid(format!(
                "incorrect number of arguments for {self}: expecting {expected}, got {given}"
            )))
        }
    }
}

impl FromStr for Operation {
    type Err = LedgerError;

    fn from_str(name: &str) -> Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .or_else(|| {
                ALIASES
                    .into_iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, op)| op)
            })
            .ok_or_else(|| LedgerError::invalid("unknown operation"))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one invocation, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub ok: bool,
    /// JSON bytes on success; empty when the operation has nothing to return.
    pub payload: Vec<u8>,
    pub message: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            ok: true,
            payload,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// Payload decoded as JSON, `None` when empty or not JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        if self.payload.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.payload).ok()
    }

    /// Renders the envelope as a single line of JSON.
    pub fn to_json_line(&self) -> String {
        let payload = if self.payload.is_empty() {
            None
        } else {
            Some(self.json().unwrap_or_else(|| {
                serde_json::Value::String(String::from_utf8_lossy(&self.payload).into_owned())
            }))
        };
        let envelope = Envelope {
            ok: self.ok,
            payload,
            message: self.message.as_deref(),
        };
        serde_json::to_string(&envelope).unwrap_or_else(|_| String::from("{\"ok\":false}"))
    }
}

/// One row of a `queryAll*` result.
#[derive(Serialize)]
struct QueryResult<'a, E> {
    #[serde(rename = "Key")]
    key: &'a str,
    #[serde(rename = "Record")]
    record: &'a E,
}

fn render_all<E: Serialize>(records: &[(String, E)]) -> Result<Vec<u8>> {
    let rows: Vec<QueryResult<'_, E>> = records
        .iter()
        .map(|(key, record)| QueryResult { key, record })
        .collect();
    to_json(&rows)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LedgerError::StoreFailure(Box::new(e)))
}

/// Routes named invocations to the [`LedgerEngine`].
///
/// Arity is checked before the engine runs, and every engine error is turned
/// into a failure [`Response`], so `invoke` itself never fails.
pub struct Dispatcher {
    engine: LedgerEngine,
}

impl Dispatcher {
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    pub async fn invoke<S: AsRef<str> + Sync>(&self, operation: &str, args: &[S]) -> Response {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        match self.execute(operation, &args).await {
            Ok(payload) => {
                debug!(operation, bytes = payload.len(), "invocation succeeded");
                Response::success(payload)
            }
            Err(err) => {
                match &err {
                    LedgerError::PartialCommit { .. } => {
                        error!(operation, error = %err, "invocation left a partial commit")
                    }
                    LedgerError::StoreFailure(_) | LedgerError::Corrupt { .. } => {
                        warn!(operation, error = %err, "invocation failed")
                    }
                    _ => debug!(operation, error = %err, "invocation rejected"),
                }
                Response::failure(err.to_string())
            }
        }
    }

    async fn execute(&self, operation: &str, args: &[&str]) -> Result<Vec<u8>> {
        let op: Operation = operation.parse()?;
        op.check_arity(args.len())?;
        let engine = &self.engine;

        match op {
            Operation::InitLedger => {
                engine.init_ledger().await?;
                Ok(Vec::new())
            }
            Operation::CreateItem => {
                let price: Price = args[3].parse()?;
                let item = Item::new(args[1], args[2], price, args[4])?;
                engine.create_item(args[0], item).await?;
                Ok(Vec::new())
            }
            Operation::QueryItem => Ok(engine.query_item(args[0]).await?.unwrap_or_default()),
            Operation::QueryAllItems => render_all(&engine.query_all_items().await?),
            Operation::UpdateItemName => {
                engine.update_item_name(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::UpdateCategory => {
                engine.update_category(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::UpdatePrice => {
                engine.update_price(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::UpdateOwner => {
                engine.update_owner(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::TransferOwnership => {
                let settlement = engine.transfer_ownership(args[0], args[1]).await?;
                to_json(&settlement)
            }
            Operation::DeleteItem => {
                engine.delete_item(args[0]).await?;
                Ok(Vec::new())
            }
            Operation::CreateAccount => {
                let balance: Balance = args[3].parse()?;
                let account = Account::new(args[1], args[2], balance)?;
                engine.create_account(args[0], account).await?;
                Ok(Vec::new())
            }
            Operation::QueryAccount => Ok(engine.query_account(args[0]).await?.unwrap_or_default()),
            Operation::QueryAllAccounts => render_all(&engine.query_all_accounts().await?),
            Operation::UpdateAccountName => {
                engine.update_account_name(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::UpdateEmail => {
                engine.update_email(args[0], args[1]).await?;
                Ok(Vec::new())
            }
            Operation::UpdateBalance => {
                let delta: Balance = args[1].parse()?;
                let balance = engine.update_balance(args[0], delta).await?;
                to_json(&serde_json::json!({ "balance": balance }))
            }
            Operation::DeleteAccount => {
                let dangling = engine.delete_account(args[0]).await?;
                to_json(&serde_json::json!({ "danglingItems": dangling }))
            }
        }
    }
}
