use super::codec::Record;
use super::key::KeySpace;
use super::money::Price;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A tradeable item listed on the ledger.
///
/// `owner_key` is a plain foreign key into the account namespace; an empty
/// string marks an item nobody owns yet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    #[serde(alias = "type")]
    pub category: String,
    pub price: Price,
    #[serde(alias = "owner", default)]
    pub owner_key: String,
}

/// Mutable fields of an [`Item`], addressed by name from `updateField`-style calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Category,
    Price,
    Owner,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Price,
        owner_key: impl Into<String>,
    ) -> Result<Self> {
        let item = Self {
            name: name.into(),
            category: category.into(),
            price,
            owner_key: owner_key.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::invalid("item name must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(LedgerError::invalid("item category must not be empty"));
        }
        if !self.owner_key.is_empty() {
            KeySpace::Account.check(&self.owner_key)?;
        }
        Ok(())
    }

    pub fn is_owned(&self) -> bool {
        !self.owner_key.is_empty()
    }

    /// Applies a raw string value to one field, checking the field's domain.
    ///
    /// The item is left untouched when the value is rejected.
    pub fn set(&mut self, field: ItemField, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match field {
            ItemField::Name => updated.name = value.to_string(),
            ItemField::Category => updated.category = value.to_string(),
            ItemField::Price => updated.price = Price::from_str(value)?,
            ItemField::Owner => updated.owner_key = value.to_string(),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

impl Record for Item {
    const KEY_SPACE: KeySpace = KeySpace::Item;
}
