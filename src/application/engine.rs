use super::repository::Repository;
use crate::domain::account::{Account, AccountField};
use crate::domain::item::{Item, ItemField};
use crate::domain::key::KeySpace;
use crate::domain::money::{Balance, Price};
use crate::domain::ports::{RecordStoreRef, WriteSet};
use crate::error::{LedgerError, Result};
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of a successful [`LedgerEngine::transfer_ownership`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub item: String,
    /// Previous owner, credited with the price. Empty for a primary sale.
    pub from: String,
    /// New owner, debited with the price.
    pub to: String,
    pub price: Price,
}

/// The ledger transaction engine.
///
/// Each public method is one ledger transaction: it reads the records it
/// needs, validates every precondition, and only then writes. Operations
/// touching more than one record stage their writes in a [`WriteSet`] and
/// hand it to the store in a single commit.
pub struct LedgerEngine {
    store: RecordStoreRef,
    items: Repository<Item>,
    accounts: Repository<Account>,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` over `store`.
    pub fn new(store: RecordStoreRef) -> Self {
        if !store.atomic_commit() {
            warn!("record store has no atomic batch commit; multi-record writes may partially apply");
        }
        Self {
            items: Repository::new(store.clone()),
            accounts: Repository::new(store.clone()),
            store,
        }
    }

    pub fn items(&self) -> &Repository<Item> {
        &self.items
    }

    pub fn accounts(&self) -> &Repository<Account> {
        &self.accounts
    }

    async fn require_owner(&self, owner_key: &str) -> Result<()> {
        if !owner_key.is_empty() && !self.accounts.exists(owner_key).await? {
            return Err(LedgerError::not_found(owner_key));
        }
        Ok(())
    }

    /// Seeds the demo catalogue together with the accounts that own it.
    ///
    /// Written as one commit; refuses to overwrite any existing seed key.
    pub async fn init_ledger(&self) -> Result<()> {
        let owners = [
            ("Tom", "tom@market.example"),
            ("Jack", "jack@market.example"),
            ("Mike", "mike@market.example"),
        ];
        let catalogue = [
            ("RTX2080", "Computer accessories", dec!(2000)),
            ("Toyota Prius blue", "Car", dec!(40000)),
            ("Coke", "Drinks", dec!(10)),
        ];

        let mut writes = WriteSet::new();
        for (seq, ((owner, email), (name, category, price))) in
            owners.into_iter().zip(catalogue).enumerate()
        {
            let seq = seq as u32;
            let account_key = KeySpace::Account.sequence_key(seq);
            let item_key = KeySpace::Item.sequence_key(seq);
            if self.accounts.exists(&account_key).await? {
                return Err(LedgerError::invalid(format!("{account_key} already exists")));
            }
            if self.items.exists(&item_key).await? {
                return Err(LedgerError::invalid(format!("{item_key} already exists")));
            }

            let account = Account::new(owner, email, Balance::ZERO)?;
            let item = Item::new(name, category, Price::new(price)?, account_key.clone())?;
            self.accounts.stage_put(&mut writes, &account_key, &account)?;
            self.items.stage_put(&mut writes, &item_key, &item)?;
        }

        let total = writes.len();
        self.store.commit(writes).await?;
        info!(records = total, "ledger seeded");
        Ok(())
    }

    /// Lists a new item under `key`.
    ///
    /// Refuses to replace an existing record, and a non-empty owner must be an
    /// existing account.
    pub async fn create_item(&self, key: &str, item: Item) -> Result<()> {
        KeySpace::Item.check(key)?;
        item.validate()?;
        if self.items.exists(key).await? {
            return Err(LedgerError::invalid(format!("{key} already exists")));
        }
        self.require_owner(&item.owner_key).await?;

        self.items.put(key, &item).await?;
        info!(key, owner = %item.owner_key, price = %item.price, "item created");
        Ok(())
    }

    pub async fn create_account(&self, key: &str, account: Account) -> Result<()> {
        KeySpace::Account.check(key)?;
        account.validate()?;
        if self.accounts.exists(key).await? {
            return Err(LedgerError::invalid(format!("{key} already exists")));
        }

        self.accounts.put(key, &account).await?;
        info!(key, balance = %account.balance, "account created");
        Ok(())
    }

    /// Raw stored bytes of an item, `None` when the key is unused.
    pub async fn query_item(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.items.get_raw(key).await
    }

    pub async fn query_account(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.accounts.get_raw(key).await
    }

    pub async fn query_all_items(&self) -> Result<Vec<(String, Item)>> {
        self.items.list().await?.collect()
    }

    pub async fn query_all_accounts(&self) -> Result<Vec<(String, Account)>> {
        self.accounts.list().await?.collect()
    }

    /// Read-modify-write of a single item field.
    ///
    /// Owner changes are checked against the account namespace but do not
    /// settle any balance; use [`LedgerEngine::transfer_ownership`] for sales.
    pub async fn update_item_field(&self, key: &str, field: ItemField, value: &str) -> Result<()> {
        let mut item = self.items.get(key).await?;
        item.set(field, value)?;
        if field == ItemField::Owner {
            self.require_owner(&item.owner_key).await?;
        }

        self.items.put(key, &item).await?;
        info!(key, ?field, value, "item updated");
        Ok(())
    }

    pub async fn update_item_name(&self, key: &str, name: &str) -> Result<()> {
        self.update_item_field(key, ItemField::Name, name).await
    }

    pub async fn update_category(&self, key: &str, category: &str) -> Result<()> {
        self.update_item_field(key, ItemField::Category, category).await
    }

    pub async fn update_price(&self, key: &str, price: &str) -> Result<()> {
        self.update_item_field(key, ItemField::Price, price).await
    }

    pub async fn update_owner(&self, key: &str, owner_key: &str) -> Result<()> {
        self.update_item_field(key, ItemField::Owner, owner_key).await
    }

    pub async fn update_account_field(
        &self,
        key: &str,
        field: AccountField,
        value: &str,
    ) -> Result<()> {
        let mut account = self.accounts.get(key).await?;
        account.set(field, value)?;

        self.accounts.put(key, &account).await?;
        info!(key, ?field, value, "account updated");
        Ok(())
    }

    pub async fn update_account_name(&self, key: &str, name: &str) -> Result<()> {
        self.update_account_field(key, AccountField::Name, name)
            .await
    }

    pub async fn update_email(&self, key: &str, email: &str) -> Result<()> {
        self.update_account_field(key, AccountField::Email, email)
            .await
    }

    /// Applies `balance += delta`. There is no overdraft floor.
    pub async fn update_balance(&self, key: &str, delta: Balance) -> Result<Balance> {
        let mut account = self.accounts.get(key).await?;
        account.credit(delta)?;

        self.accounts.put(key, &account).await?;
        info!(key, %delta, balance = %account.balance, "balance updated");
        Ok(account.balance)
    }

    /// Sells `item_key` to `new_owner_key` at the item's current price.
    ///
    /// The buyer is debited and the previous owner (if any) credited by the
    /// same amount, so the pair's combined balance is unchanged. The buyer,
    /// the seller and the item are written in one commit.
    pub async fn transfer_ownership(&self, item_key: &str, new_owner_key: &str) -> Result<Settlement> {
        let mut item = self.items.get(item_key).await?;
        KeySpace::Account.check(new_owner_key)?;
        let previous_owner_key = item.owner_key.clone();
        if previous_owner_key == new_owner_key {
            return Err(LedgerError::invalid(format!(
                "{item_key} is already owned by {new_owner_key}"
            )));
        }

        let previous_owner = if item.is_owned() {
            Some(self.accounts.get(&previous_owner_key).await?)
        } else {
            None
        };
        let mut new_owner = self.accounts.get(new_owner_key).await?;
        let price = item.price;

        let seller = match previous_owner {
            Some(mut seller) => {
                seller.credit(price.into())?;
                Some(seller)
            }
            None => None,
        };
        new_owner.debit(price.into())?;

        let mut writes = WriteSet::new();
        if let Some(seller) = &seller {
            self.accounts
                .stage_put(&mut writes, &previous_owner_key, seller)?;
        }
        self.accounts
            .stage_put(&mut writes, new_owner_key, &new_owner)?;
        item.owner_key = new_owner_key.to_string();
        self.items.stage_put(&mut writes, item_key, &item)?;

        debug!(item = item_key, writes = writes.len(), "committing transfer");
        self.store.commit(writes).await?;
        info!(
            item = item_key,
            seller = %previous_owner_key,
            buyer = new_owner_key,
            %price,
            "ownership transferred"
        );

        Ok(Settlement {
            item: item_key.to_string(),
            from: previous_owner_key,
            to: new_owner_key.to_string(),
            price,
        })
    }

    pub async fn delete_item(&self, key: &str) -> Result<()> {
        self.items.delete(key).await?;
        info!(key, "item deleted");
        Ok(())
    }

    /// Deletes an account, returning the keys of items that still name it as
    /// owner. Those references are left dangling.
    ///
    /// The item scan runs before the delete, so a failed scan leaves the
    /// account in place.
    pub async fn delete_account(&self, key: &str) -> Result<Vec<String>> {
        if !self.accounts.exists(key).await? {
            return Err(LedgerError::not_found(key));
        }

        let mut dangling = Vec::new();
        for entry in self.items.list().await? {
            let (item_key, item) = entry?;
            if item.owner_key == key {
                dangling.push(item_key);
            }
        }

        self.accounts.delete(key).await?;
        if dangling.is_empty() {
            info!(key, "account deleted");
        } else {
            warn!(key, items = ?dangling, "account deleted while still owning items");
        }
        Ok(dangling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::RecordStore;
    use crate::infrastructure::in_memory::InMemoryRecordStore;
    use std::sync::Arc;

    async fn setup() -> (LedgerEngine, InMemoryRecordStore) {
        let store = InMemoryRecordStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()));
        (engine, store)
    }

    fn account(name: &str, balance: Balance) -> Account {
        Account::new(name, format!("{}@example.com", name.to_lowercase()), balance).unwrap()
    }

    fn item(price: &str, owner: &str) -> Item {
        Item::new("RTX2080", "Computer accessories", price.parse().unwrap(), owner).unwrap()
    }

    #[tokio::test]
    async fn test_transfer_scenario() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_account("USER2", account("Jack", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("100", "USER1")).await.unwrap();

        let settlement = engine.transfer_ownership("ITEM0", "USER2").await.unwrap();
        assert_eq!(settlement.from, "USER1");
        assert_eq!(settlement.to, "USER2");

        let seller = engine.accounts().get("USER1").await.unwrap();
        let buyer = engine.accounts().get("USER2").await.unwrap();
        assert_eq!(seller.balance, Balance::new(dec!(100)));
        assert_eq!(buyer.balance, Balance::new(dec!(-100)));
        assert_eq!(engine.items().get("ITEM0").await.unwrap().owner_key, "USER2");
    }

    #[tokio::test]
    async fn test_transfer_conserves_pair_balance() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::new(dec!(12.34)))).await.unwrap();
        engine.create_account("USER2", account("Jack", Balance::new(dec!(-7.5)))).await.unwrap();
        engine.create_item("ITEM0", item("19.99", "USER1")).await.unwrap();

        engine.transfer_ownership("ITEM0", "USER2").await.unwrap();
        engine.transfer_ownership("ITEM0", "USER1").await.unwrap();
        engine.transfer_ownership("ITEM0", "USER2").await.unwrap();

        let tom = engine.accounts().get("USER1").await.unwrap().balance;
        let jack = engine.accounts().get("USER2").await.unwrap().balance;
        assert_eq!(tom.checked_add(jack).unwrap(), Balance::new(dec!(4.84)));
        assert_eq!(jack, Balance::new(dec!(-27.49)));
    }

    #[tokio::test]
    async fn test_transfer_of_unowned_item_only_debits_buyer() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("10", "")).await.unwrap();

        let settlement = engine.transfer_ownership("ITEM0", "USER1").await.unwrap();
        assert_eq!(settlement.from, "");
        let tom = engine.accounts().get("USER1").await.unwrap();
        assert_eq!(tom.balance, Balance::new(dec!(-10)));
    }

    #[tokio::test]
    async fn test_transfer_failures_write_nothing() {
        let (engine, store) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("100", "USER1")).await.unwrap();
        let before = store.snapshot().await;

        assert!(matches!(
            engine.transfer_ownership("ITEM9", "USER1").await,
            Err(LedgerError::NotFound { ref key }) if key == "ITEM9"
        ));
        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER2").await,
            Err(LedgerError::NotFound { ref key }) if key == "USER2"
        ));
        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER1").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_missing_item_is_reported_before_buyer_key() {
        let (engine, store) = setup().await;

        assert!(matches!(
            engine.transfer_ownership("ITEM9", "ITEM3").await,
            Err(LedgerError::NotFound { ref key }) if key == "ITEM9"
        ));
        engine.create_item("ITEM0", item("1", "")).await.unwrap();
        assert!(matches!(
            engine.transfer_ownership("ITEM0", "ITEM3").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_balance_overflow_is_rejected_without_writes() {
        let (engine, store) = setup().await;
        let max = Balance::new(rust_decimal::Decimal::MAX);
        engine.create_account("USER1", account("Tom", max)).await.unwrap();
        engine.create_account("USER2", account("Jack", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("1", "USER1")).await.unwrap();
        let before = store.snapshot().await;

        assert!(matches!(
            engine.update_balance("USER1", Balance::new(dec!(1))).await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER2").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.snapshot().await, before);
        assert_eq!(engine.accounts().get("USER1").await.unwrap().balance, max);
    }

    #[tokio::test]
    async fn test_buyer_overflow_leaves_seller_untouched() {
        let (engine, store) = setup().await;
        let min = Balance::new(rust_decimal::Decimal::MIN);
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_account("USER2", account("Jack", min)).await.unwrap();
        engine.create_item("ITEM0", item("5", "USER1")).await.unwrap();
        let before = store.snapshot().await;

        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER2").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_delete_account_keeps_account_when_scan_fails() {
        let (engine, store) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("3", "USER1")).await.unwrap();
        store.put(b"ITEM5", b"{broken".to_vec()).await.unwrap();

        assert!(matches!(
            engine.delete_account("USER1").await,
            Err(LedgerError::Corrupt { ref key, .. }) if key == "ITEM5"
        ));
        assert!(engine.accounts().exists("USER1").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_and_recategorize() {
        let (engine, store) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("3", "USER1")).await.unwrap();

        engine.update_item_name("ITEM0", "RTX3080").await.unwrap();
        engine.update_category("ITEM0", "GPU").await.unwrap();
        engine.update_account_name("USER1", "Thomas").await.unwrap();

        let stored = engine.items().get("ITEM0").await.unwrap();
        assert_eq!((stored.name.as_str(), stored.category.as_str()), ("RTX3080", "GPU"));
        assert_eq!(engine.accounts().get("USER1").await.unwrap().name, "Thomas");

        let before = store.snapshot().await;
        assert!(matches!(
            engine.update_item_name("ITEM0", " ").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.update_account_name("USER1", "").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_transfer_from_deleted_seller_is_not_found() {
        let (engine, store) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_account("USER2", account("Jack", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("100", "USER1")).await.unwrap();
        let dangling = engine.delete_account("USER1").await.unwrap();
        assert_eq!(dangling, vec!["ITEM0".to_string()]);
        let before = store.snapshot().await;

        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER2").await,
            Err(LedgerError::NotFound { ref key }) if key == "USER1"
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_create_guards() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();

        assert!(matches!(
            engine.create_account("USER1", account("Tom", Balance::ZERO)).await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.create_item("ITEM0", item("5", "USER7")).await,
            Err(LedgerError::NotFound { ref key }) if key == "USER7"
        ));
        engine.create_item("ITEM0", item("5", "USER1")).await.unwrap();
        assert!(matches!(
            engine.create_item("ITEM0", item("6", "USER1")).await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(
            engine.items().get("ITEM0").await.unwrap().price.value(),
            dec!(5)
        );
    }

    #[tokio::test]
    async fn test_update_price_rejects_negative() {
        let (engine, store) = setup().await;
        engine.create_item("ITEM0", item("100", "")).await.unwrap();
        let before = store.snapshot().await;

        assert!(matches!(
            engine.update_price("ITEM0", "-5").await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(store.snapshot().await, before);

        engine.update_price("ITEM0", "75.5").await.unwrap();
        assert_eq!(
            engine.items().get("ITEM0").await.unwrap().price.value(),
            dec!(75.5)
        );
    }

    #[tokio::test]
    async fn test_update_owner_checks_reference() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        engine.create_item("ITEM0", item("100", "")).await.unwrap();

        assert!(matches!(
            engine.update_owner("ITEM0", "USER2").await,
            Err(LedgerError::NotFound { .. })
        ));
        engine.update_owner("ITEM0", "USER1").await.unwrap();
        let tom = engine.accounts().get("USER1").await.unwrap();
        assert_eq!(tom.balance, Balance::ZERO);
        assert_eq!(engine.items().get("ITEM0").await.unwrap().owner_key, "USER1");
    }

    #[tokio::test]
    async fn test_updates_on_missing_keys_are_not_found() {
        let (engine, store) = setup().await;

        assert!(matches!(
            engine.update_price("ITEM0", "1").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            engine.update_email("USER0", "a@b.c").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            engine.update_balance("USER0", Balance::new(dec!(1))).await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            engine.delete_item("ITEM0").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            engine.delete_account("USER0").await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_balance_has_no_floor() {
        let (engine, _) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::new(dec!(5)))).await.unwrap();

        let balance = engine
            .update_balance("USER1", Balance::new(dec!(-20.25)))
            .await
            .unwrap();
        assert_eq!(balance, Balance::new(dec!(-15.25)));
    }

    #[tokio::test]
    async fn test_init_ledger_seeds_owned_catalogue() {
        let (engine, store) = setup().await;
        engine.init_ledger().await.unwrap();
        assert_eq!(store.len().await, 6);

        let items = engine.query_all_items().await.unwrap();
        assert_eq!(items.len(), 3);
        for (_, item) in &items {
            assert!(engine.accounts().exists(&item.owner_key).await.unwrap());
        }
        assert_eq!(items[2].1.name, "Coke");

        assert!(matches!(
            engine.init_ledger().await,
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_item_blocks_transfer() {
        let (engine, store) = setup().await;
        engine.create_account("USER1", account("Tom", Balance::ZERO)).await.unwrap();
        store
            .put(b"ITEM0", br#"{"name":"x","category":"y","price":"abc","ownerKey":""}"#.to_vec())
            .await
            .unwrap();

        assert!(matches!(
            engine.transfer_ownership("ITEM0", "USER1").await,
            Err(LedgerError::Corrupt { .. })
        ));
        let tom = engine.accounts().get("USER1").await.unwrap();
        assert_eq!(tom.balance, Balance::ZERO);
    }
}
