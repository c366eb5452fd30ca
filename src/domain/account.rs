use super::codec::Record;
use super::key::KeySpace;
use super::money::Balance;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// A marketplace participant that can own items and hold a balance.
///
/// The balance is allowed to go negative: buyers are not checked for funds
/// before a transfer settles.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub balance: Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Name,
    Email,
}

fn check_email(email: &str) -> Result<()> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| LedgerError::invalid(format!("email {email:?} is missing '@'")))?;
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(LedgerError::invalid(format!("email {email:?} is malformed")));
    }
    Ok(())
}

impl Account {
    pub fn new(name: impl Into<String>, email: impl Into<String>, balance: Balance) -> Result<Self> {
        let account = Self {
            name: name.into(),
            email: email.into(),
            balance,
        };
        account.validate()?;
        Ok(account)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::invalid("account name must not be empty"));
        }
        check_email(&self.email)
    }

    /// Adds funds to the balance. Leaves the balance untouched on overflow.
    pub fn credit(&mut self, amount: Balance) -> Result<()> {
        self.balance = self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Removes funds from the balance, with no overdraft floor
    pub fn debit(&mut self, amount: Balance) -> Result<()> {
        self.balance = self.balance.checked_sub(amount)?;
        Ok(())
    }

    pub fn set(&mut self, field: AccountField, value: &str) -> Result<()> {
        match field {
            AccountField::Name => {
                if value.trim().is_empty() {
                    return Err(LedgerError::invalid("account name must not be empty"));
                }
                self.name = value.to_string();
            }
            AccountField::Email => {
                check_email(value)?;
                self.email = value.to_string();
            }
        }
        Ok(())
    }
}

impl Record for Account {
    const KEY_SPACE: KeySpace = KeySpace::Account;
}
