/// Catalog Store - relational persistence for the marketplace
use crate::{
    catalog::{
        FileUpload, ItemDraft, NewPurchase, VoteDirection, REPUTATION_MAX, REPUTATION_MIN,
    },
    db::models::{Item, ItemSummary, Purchase, Shop, User, Vote},
    error::{ShopError, ShopResult},
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Catalog store over the shop database
#[derive(Clone)]
pub struct CatalogStore {
    db: SqlitePool,
}

impl CatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ========== Users & shops ==========

    /// Create the user and their shop if either is missing
    pub async fn ensure_user(&self, user_id: &str) -> ShopResult<()> {
        let mut tx = self.db.begin().await?;
        ensure_user_on(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> ShopResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, card_code, created_at FROM users WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Link a ledger card to the user for later purchases
    pub async fn set_card_code(&self, user_id: &str, card_code: &str) -> ShopResult<()> {
        let card_code = card_code.trim();
        if card_code.is_empty() {
            return Err(ShopError::Validation("Card code cannot be empty.".to_string()));
        }

        let mut tx = self.db.begin().await?;
        ensure_user_on(&mut tx, user_id).await?;
        sqlx::query("UPDATE users SET card_code = ?2 WHERE user_id = ?1")
            .bind(user_id)
            .bind(card_code)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user = %user_id, "Linked ledger card");
        Ok(())
    }

    pub async fn get_shop(&self, owner_id: &str) -> ShopResult<Option<Shop>> {
        let shop = sqlx::query_as::<_, Shop>(
            r#"
            SELECT user_id, reputation, total_sales, total_earned_sats
            FROM shops
            WHERE user_id = ?1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(shop)
    }

    /// Apply a reputation change, clamped into [-1000, 1000]; returns the new value
    pub async fn adjust_reputation(&self, owner_id: &str, delta: i64) -> ShopResult<i64> {
        let mut tx = self.db.begin().await?;
        let reputation = adjust_reputation_on(&mut tx, owner_id, delta).await?;
        tx.commit().await?;
        Ok(reputation)
    }

    /// Count one sale of `price_sats` towards the seller's totals
    pub async fn bump_sales_stats(&self, owner_id: &str, price_sats: i64) -> ShopResult<()> {
        let mut conn = self.db.acquire().await?;
        bump_sales_stats_on(&mut conn, owner_id, price_sats).await
    }

    // ========== Items ==========

    /// One page of an owner's items in creation order
    pub async fn list_items(
        &self,
        owner_id: &str,
        offset: i64,
        limit: i64,
    ) -> ShopResult<Vec<ItemSummary>> {
        let items = sqlx::query_as::<_, ItemSummary>(
            r#"
            SELECT id, owner_id, name, original_filename, price_sats, size_bytes, amount, created_at
            FROM items
            WHERE owner_id = ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn count_items(&self, owner_id: &str) -> ShopResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    pub async fn get_item(&self, item_id: &str) -> ShopResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, owner_id, name, original_filename, price_sats, size_bytes, amount, file, created_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    /// Resolve what a buyer typed.
    ///
    /// A positive integer is a 1-based position in the creation-order
    /// listing; anything else is matched against item names ignoring case.
    pub async fn find_item_by_name_or_index(
        &self,
        owner_id: &str,
        token: &str,
    ) -> ShopResult<Option<Item>> {
        let token = token.trim();

        if let Ok(position) = token.parse::<i64>() {
            if position <= 0 {
                return Ok(None);
            }
            return self.item_at_position(owner_id, position).await;
        }

        let wanted = token.to_lowercase();
        let names: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, name
            FROM items
            WHERE owner_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        match names.into_iter().find(|(_, name)| name.to_lowercase() == wanted) {
            Some((id, _)) => self.get_item(&id).await,
            None => Ok(None),
        }
    }

    async fn item_at_position(&self, owner_id: &str, position: i64) -> ShopResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, owner_id, name, original_filename, price_sats, size_bytes, amount, file, created_at
            FROM items
            WHERE owner_id = ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1 OFFSET ?2
            "#,
        )
        .bind(owner_id)
        .bind(position - 1)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    /// List a new item with its file
    pub async fn add_item(
        &self,
        owner_id: &str,
        draft: &ItemDraft,
        upload: FileUpload,
    ) -> ShopResult<Item> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ShopError::Validation("Item name cannot be empty.".to_string()));
        }
        if draft.price_sats <= 0 || draft.amount <= 0 {
            return Err(ShopError::Validation("Invalid price or amount.".to_string()));
        }

        let item = Item {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            original_filename: upload.filename,
            price_sats: draft.price_sats,
            size_bytes: upload.bytes.len() as i64,
            amount: draft.amount,
            file: upload.bytes,
            created_at: now_millis(),
        };

        let mut tx = self.db.begin().await?;
        ensure_user_on(&mut tx, owner_id).await?;
        sqlx::query(
            r#"
            INSERT INTO items
            (id, owner_id, name, original_filename, price_sats, size_bytes, amount, file, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.owner_id)
        .bind(&item.name)
        .bind(&item.original_filename)
        .bind(item.price_sats)
        .bind(item.size_bytes)
        .bind(item.amount)
        .bind(&item.file)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(owner = %owner_id, item = %item.id, name = %item.name, "Item listed");
        Ok(item)
    }

    /// Delete the item at a 1-based position in the owner's listing
    pub async fn remove_item_by_position(
        &self,
        owner_id: &str,
        position: i64,
    ) -> ShopResult<ItemSummary> {
        if position <= 0 {
            return Err(ShopError::Validation("Invalid item number.".to_string()));
        }

        let item = sqlx::query_as::<_, ItemSummary>(
            r#"
            SELECT id, owner_id, name, original_filename, price_sats, size_bytes, amount, created_at
            FROM items
            WHERE owner_id = ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1 OFFSET ?2
            "#,
        )
        .bind(owner_id)
        .bind(position - 1)
        .fetch_optional(&self.db)
        .await?;

        let Some(item) = item else {
            if self.count_items(owner_id).await? == 0 {
                return Err(ShopError::NotFound("Your shop is empty.".to_string()));
            }
            return Err(ShopError::NotFound("Item number not found.".to_string()));
        };

        let result = sqlx::query("DELETE FROM items WHERE id = ?1 AND owner_id = ?2")
            .bind(&item.id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ShopError::NotFound("Failed to remove item.".to_string()));
        }

        info!(owner = %owner_id, item = %item.id, position, "Item removed");
        Ok(item)
    }

    // ========== Stock ==========

    /// Take one unit if any is left and hold it as a reservation.
    ///
    /// A single conditional UPDATE, so two buyers racing for the last unit
    /// cannot both win. The reservation is settled by `complete_sale` or
    /// returned by `release_stock`.
    pub async fn decrement_stock_if_available(&self, item_id: &str) -> ShopResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET amount = amount - 1,
                reserved = reserved + 1
            WHERE id = ?1 AND amount > 0
            "#,
        )
        .bind(item_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Give back a unit reserved by `decrement_stock_if_available`
    pub async fn release_stock(&self, item_id: &str) -> ShopResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET amount = amount + 1,
                reserved = reserved - 1
            WHERE id = ?1 AND reserved > 0
            "#,
        )
        .bind(item_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove the item row once its stock is gone and no reservation is open
    pub async fn delete_if_exhausted(&self, item_id: &str) -> ShopResult<bool> {
        let mut conn = self.db.acquire().await?;
        delete_if_exhausted_on(&mut conn, item_id).await
    }

    // ========== Purchases ==========

    pub async fn record_purchase(&self, purchase: NewPurchase) -> ShopResult<Purchase> {
        let mut conn = self.db.acquire().await?;
        insert_purchase_on(&mut conn, purchase).await
    }

    /// Record the sale, credit the seller and drop an exhausted item, atomically
    pub async fn complete_sale(&self, purchase: NewPurchase) -> ShopResult<Purchase> {
        let mut tx = self.db.begin().await?;

        let purchase = insert_purchase_on(&mut tx, purchase).await?;
        ensure_shop_on(&mut tx, &purchase.seller_id).await?;
        bump_sales_stats_on(&mut tx, &purchase.seller_id, purchase.price_sats).await?;
        settle_reservation_on(&mut tx, &purchase.item_id).await?;
        let exhausted = delete_if_exhausted_on(&mut tx, &purchase.item_id).await?;

        tx.commit().await?;

        if exhausted {
            debug!(item = %purchase.item_id, "Last unit sold, item delisted");
        }
        Ok(purchase)
    }

    /// Purchases made in a shop, newest first
    pub async fn purchases_for_seller(&self, seller_id: &str) -> ShopResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, buyer_id, seller_id, item_id, price_sats, tx_id, created_at
            FROM purchases
            WHERE seller_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(seller_id)
        .fetch_all(&self.db)
        .await?;

        Ok(purchases)
    }

    // ========== Votes ==========

    /// Vote on a specific purchase made by `voter_id`
    pub async fn record_vote(
        &self,
        purchase_id: &str,
        voter_id: &str,
        direction: VoteDirection,
    ) -> ShopResult<Vote> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO votes (purchase_id, voter_id, vote)
            SELECT id, buyer_id, ?3
            FROM purchases
            WHERE id = ?1 AND buyer_id = ?2
            "#,
        )
        .bind(purchase_id)
        .bind(voter_id)
        .bind(direction.delta())
        .execute(&mut *tx)
        .await?;

        let seller: Option<(String,)> =
            sqlx::query_as("SELECT seller_id FROM purchases WHERE id = ?1 AND buyer_id = ?2")
                .bind(purchase_id)
                .bind(voter_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((seller_id,)) = seller else {
            tx.rollback().await?;
            return Err(ShopError::NoEligiblePurchase);
        };

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ShopError::AlreadyVoted);
        }

        adjust_reputation_on(&mut tx, &seller_id, direction.delta()).await?;
        tx.commit().await?;

        Ok(Vote {
            purchase_id: purchase_id.to_string(),
            voter_id: voter_id.to_string(),
            vote: direction.delta(),
        })
    }

    /// Vote on the voter's most recent unvoted purchase from `seller_id`
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        seller_id: &str,
        direction: VoteDirection,
    ) -> ShopResult<Vote> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (purchase_id, voter_id, vote)
            SELECT p.id, p.buyer_id, ?3
            FROM purchases p
            LEFT JOIN votes v ON v.purchase_id = p.id
            WHERE p.buyer_id = ?1
              AND p.seller_id = ?2
              AND v.purchase_id IS NULL
            ORDER BY p.created_at DESC, p.rowid DESC
            LIMIT 1
            "#,
        )
        .bind(voter_id)
        .bind(seller_id)
        .bind(direction.delta())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let (bought,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM purchases WHERE buyer_id = ?1 AND seller_id = ?2",
            )
            .bind(voter_id)
            .bind(seller_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;

            return Err(if bought > 0 {
                ShopError::AlreadyVoted
            } else {
                ShopError::NoEligiblePurchase
            });
        }

        let (purchase_id,): (String,) =
            sqlx::query_as("SELECT purchase_id FROM votes WHERE rowid = ?1")
                .bind(inserted.last_insert_rowid())
                .fetch_one(&mut *tx)
                .await?;

        adjust_reputation_on(&mut tx, seller_id, direction.delta()).await?;
        tx.commit().await?;

        info!(
            voter = %voter_id,
            seller = %seller_id,
            purchase = %purchase_id,
            direction = direction.as_str(),
            "Vote recorded"
        );

        Ok(Vote {
            purchase_id,
            voter_id: voter_id.to_string(),
            vote: direction.delta(),
        })
    }

    // ========== Cooldowns ==========

    /// Millisecond timestamp of the user's last panel post
    pub async fn panel_cooldown(&self, user_id: &str) -> ShopResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT panel_ts FROM cooldowns WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|(ts,)| ts))
    }

    pub async fn touch_panel_cooldown(&self, user_id: &str, at_ms: i64) -> ShopResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cooldowns (user_id, panel_ts)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET panel_ts = excluded.panel_ts
            "#,
        )
        .bind(user_id)
        .bind(at_ms)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Cheap round trip used by health checks
    pub async fn ping(&self) -> ShopResult<()> {
        crate::db::test_connection(&self.db).await
    }
}

async fn ensure_user_on(conn: &mut SqliteConnection, user_id: &str) -> ShopResult<()> {
    sqlx::query("INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?1, ?2)")
        .bind(user_id)
        .bind(now_millis())
        .execute(&mut *conn)
        .await?;

    ensure_shop_on(conn, user_id).await
}

async fn ensure_shop_on(conn: &mut SqliteConnection, user_id: &str) -> ShopResult<()> {
    sqlx::query("INSERT OR IGNORE INTO shops (user_id) VALUES (?1)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn adjust_reputation_on(
    conn: &mut SqliteConnection,
    owner_id: &str,
    delta: i64,
) -> ShopResult<i64> {
    ensure_shop_on(conn, owner_id).await?;

    sqlx::query("UPDATE shops SET reputation = MAX(?3, MIN(?4, reputation + ?2)) WHERE user_id = ?1")
        .bind(owner_id)
        .bind(delta)
        .bind(REPUTATION_MIN)
        .bind(REPUTATION_MAX)
        .execute(&mut *conn)
        .await?;

    let (reputation,): (i64,) = sqlx::query_as("SELECT reputation FROM shops WHERE user_id = ?1")
        .bind(owner_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(reputation)
}

async fn bump_sales_stats_on(
    conn: &mut SqliteConnection,
    owner_id: &str,
    price_sats: i64,
) -> ShopResult<()> {
    sqlx::query(
        r#"
        UPDATE shops
        SET total_sales = total_sales + 1,
            total_earned_sats = total_earned_sats + ?2
        WHERE user_id = ?1
        "#,
    )
    .bind(owner_id)
    .bind(price_sats)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Close one reservation on a sold unit
async fn settle_reservation_on(conn: &mut SqliteConnection, item_id: &str) -> ShopResult<()> {
    sqlx::query("UPDATE items SET reserved = reserved - 1 WHERE id = ?1 AND reserved > 0")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn delete_if_exhausted_on(conn: &mut SqliteConnection, item_id: &str) -> ShopResult<bool> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?1 AND amount <= 0 AND reserved = 0")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_purchase_on(
    conn: &mut SqliteConnection,
    purchase: NewPurchase,
) -> ShopResult<Purchase> {
    let purchase = Purchase {
        id: Uuid::new_v4().to_string(),
        buyer_id: purchase.buyer_id,
        seller_id: purchase.seller_id,
        item_id: purchase.item_id,
        price_sats: purchase.price_sats,
        tx_id: purchase.tx_id,
        created_at: now_millis(),
    };

    sqlx::query(
        r#"
        INSERT INTO purchases (id, buyer_id, seller_id, item_id, price_sats, tx_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.buyer_id)
    .bind(&purchase.seller_id)
    .bind(&purchase.item_id)
    .bind(purchase.price_sats)
    .bind(&purchase.tx_id)
    .bind(purchase.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(purchase)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, DatabaseOptions};
    use std::sync::Arc;

    async fn create_test_store() -> CatalogStore {
        let pool = db::migrated_in_memory().await.unwrap();
        CatalogStore::new(pool)
    }

    fn draft(name: &str, price_sats: i64, amount: i64) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            price_sats,
            amount,
        }
    }

    fn upload(filename: &str) -> FileUpload {
        FileUpload {
            filename: filename.to_string(),
            bytes: b"payload".to_vec(),
        }
    }

    fn sale(buyer: &str, item: &Item) -> NewPurchase {
        NewPurchase {
            buyer_id: buyer.to_string(),
            seller_id: item.owner_id.clone(),
            item_id: item.id.clone(),
            price_sats: item.price_sats,
            tx_id: Some("tx-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let store = create_test_store().await;

        store.ensure_user("alice").await.unwrap();
        store.ensure_user("alice").await.unwrap();

        let shop = store.get_shop("alice").await.unwrap().unwrap();
        assert_eq!(shop.reputation, 0);
        assert_eq!(shop.total_sales, 0);
        assert!(store.get_user("alice").await.unwrap().unwrap().card_code.is_none());
    }

    #[tokio::test]
    async fn test_listing_follows_creation_order() {
        let store = create_test_store().await;
        for name in ["One", "Two", "Three", "Four"] {
            store.add_item("seller", &draft(name, 100, 1), upload("f.bin")).await.unwrap();
        }

        let page: Vec<String> = store
            .list_items("seller", 1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(page, vec!["Two", "Three"]);
        assert!(store.list_items("seller", 10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_item_by_position_or_name() {
        let store = create_test_store().await;
        store.add_item("seller", &draft("Widget", 100, 1), upload("w.zip")).await.unwrap();
        store.add_item("seller", &draft("Gadget", 200, 1), upload("g.zip")).await.unwrap();

        let second = store.find_item_by_name_or_index("seller", "2").await.unwrap().unwrap();
        assert_eq!(second.name, "Gadget");
        assert_eq!(second.file, b"payload".to_vec());

        let by_name = store.find_item_by_name_or_index("seller", " wIdGeT ").await.unwrap().unwrap();
        assert_eq!(by_name.original_filename, "w.zip");

        assert!(store.find_item_by_name_or_index("seller", "3").await.unwrap().is_none());
        assert!(store.find_item_by_name_or_index("seller", "0").await.unwrap().is_none());
        assert!(store.find_item_by_name_or_index("seller", "Widg").await.unwrap().is_none());
        assert!(store.find_item_by_name_or_index("other", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_item_rejects_empty_stock() {
        let store = create_test_store().await;

        let result = store.add_item("seller", &draft("Widget", 100, 0), upload("w")).await;
        assert!(matches!(result, Err(ShopError::Validation(_))));

        let result = store.add_item("seller", &draft("Widget", 0, 1), upload("w")).await;
        assert!(matches!(result, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_by_position_renumbers() {
        let store = create_test_store().await;
        for name in ["A", "B", "C"] {
            store.add_item("seller", &draft(name, 100, 1), upload("f")).await.unwrap();
        }

        let removed = store.remove_item_by_position("seller", 2).await.unwrap();
        assert_eq!(removed.name, "B");

        let names: Vec<String> = store
            .list_items("seller", 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);

        let second = store.find_item_by_name_or_index("seller", "2").await.unwrap().unwrap();
        assert_eq!(second.name, "C");
    }

    #[tokio::test]
    async fn test_remove_reports_missing_positions() {
        let store = create_test_store().await;

        let empty = store.remove_item_by_position("seller", 1).await.unwrap_err();
        assert_eq!(empty.to_string(), "Your shop is empty.");

        store.add_item("seller", &draft("A", 100, 1), upload("f")).await.unwrap();
        let missing = store.remove_item_by_position("seller", 5).await.unwrap_err();
        assert_eq!(missing.to_string(), "Item number not found.");

        assert!(matches!(
            store.remove_item_by_position("seller", 0).await,
            Err(ShopError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 100, 2), upload("f")).await.unwrap();

        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        assert!(!store.decrement_stock_if_available(&item.id).await.unwrap());

        let item = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(item.amount, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_decrement_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("race.sqlite"), DatabaseOptions::default())
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store = Arc::new(CatalogStore::new(pool));

        let item = store.add_item("seller", &draft("Last", 100, 1), upload("f")).await.unwrap();

        let attempts = (0..16).map(|_| {
            let store = Arc::clone(&store);
            let item_id = item.id.clone();
            tokio::spawn(async move { store.decrement_stock_if_available(&item_id).await.unwrap() })
        });

        let winners = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|won| *won.as_ref().unwrap())
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().amount, 0);
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 100, 1), upload("f")).await.unwrap();

        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        assert!(store.release_stock(&item.id).await.unwrap());
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().amount, 1);
        assert!(!store.release_stock("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_complete_sale_updates_stats_and_delists() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 250, 1), upload("f")).await.unwrap();

        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        let purchase = store.complete_sale(sale("buyer", &item)).await.unwrap();
        assert_eq!(purchase.price_sats, 250);
        assert_eq!(purchase.tx_id.as_deref(), Some("tx-1"));

        assert!(store.get_item(&item.id).await.unwrap().is_none());
        let shop = store.get_shop("seller").await.unwrap().unwrap();
        assert_eq!(shop.total_sales, 1);
        assert_eq!(shop.total_earned_sats, 250);

        let purchases = store.purchases_for_seller("seller").await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].item_id, item.id);
    }

    #[tokio::test]
    async fn test_complete_sale_keeps_item_with_stock() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 250, 3), upload("f")).await.unwrap();

        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        store.complete_sale(sale("buyer", &item)).await.unwrap();

        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().amount, 2);
    }

    #[tokio::test]
    async fn test_open_reservation_keeps_sold_out_item() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("Two", 100, 2), upload("f")).await.unwrap();

        // Buyers A and B both hold a unit, B settles first
        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        store.complete_sale(sale("buyer-b", &item)).await.unwrap();
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().amount, 0);

        // A's payment fails, the unit goes back on sale
        assert!(store.release_stock(&item.id).await.unwrap());
        let remaining = store.get_item(&item.id).await.unwrap().map(|item| item.amount);
        assert_eq!(remaining, Some(1));

        let shop = store.get_shop("seller").await.unwrap().unwrap();
        assert_eq!(shop.total_sales, 1);
    }

    #[tokio::test]
    async fn test_last_open_reservation_settling_delists() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("Two", 100, 2), upload("f")).await.unwrap();

        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        assert!(store.decrement_stock_if_available(&item.id).await.unwrap());
        store.complete_sale(sale("buyer-a", &item)).await.unwrap();
        assert!(!store.delete_if_exhausted(&item.id).await.unwrap());

        store.complete_sale(sale("buyer-b", &item)).await.unwrap();
        assert!(store.get_item(&item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_without_reservation_is_refused() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 100, 1), upload("f")).await.unwrap();

        assert!(!store.release_stock(&item.id).await.unwrap());
        assert_eq!(store.get_item(&item.id).await.unwrap().unwrap().amount, 1);
    }

    #[tokio::test]
    async fn test_vote_requires_purchase() {
        let store = create_test_store().await;
        store.ensure_user("seller").await.unwrap();

        let result = store.cast_vote("stranger", "seller", VoteDirection::Up).await;
        assert!(matches!(result, Err(ShopError::NoEligiblePurchase)));
        assert_eq!(store.get_shop("seller").await.unwrap().unwrap().reputation, 0);
    }

    #[tokio::test]
    async fn test_one_vote_per_purchase() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 100, 5), upload("f")).await.unwrap();
        let first = store.record_purchase(sale("buyer", &item)).await.unwrap();
        let second = store.record_purchase(sale("buyer", &item)).await.unwrap();

        let vote = store.cast_vote("buyer", "seller", VoteDirection::Up).await.unwrap();
        assert_eq!(vote.vote, 5);
        let vote = store.cast_vote("buyer", "seller", VoteDirection::Down).await.unwrap();
        assert_eq!(vote.vote, -5);

        let mut voted = vec![
            store
                .record_vote(&first.id, "buyer", VoteDirection::Up)
                .await
                .unwrap_err()
                .to_string(),
            store
                .record_vote(&second.id, "buyer", VoteDirection::Up)
                .await
                .unwrap_err()
                .to_string(),
        ];
        voted.dedup();
        assert_eq!(voted, vec![ShopError::AlreadyVoted.to_string()]);

        assert!(matches!(
            store.cast_vote("buyer", "seller", VoteDirection::Up).await,
            Err(ShopError::AlreadyVoted)
        ));
        assert_eq!(store.get_shop("seller").await.unwrap().unwrap().reputation, 0);
    }

    #[tokio::test]
    async fn test_record_vote_checks_voter() {
        let store = create_test_store().await;
        let item = store.add_item("seller", &draft("A", 100, 5), upload("f")).await.unwrap();
        let purchase = store.record_purchase(sale("buyer", &item)).await.unwrap();

        assert!(matches!(
            store.record_vote(&purchase.id, "someone-else", VoteDirection::Up).await,
            Err(ShopError::NoEligiblePurchase)
        ));

        store.record_vote(&purchase.id, "buyer", VoteDirection::Up).await.unwrap();
        assert_eq!(store.get_shop("seller").await.unwrap().unwrap().reputation, 5);
    }

    #[tokio::test]
    async fn test_reputation_is_clamped() {
        let store = create_test_store().await;

        assert_eq!(store.adjust_reputation("seller", 995).await.unwrap(), 995);
        assert_eq!(store.adjust_reputation("seller", 10).await.unwrap(), 1000);
        assert_eq!(store.adjust_reputation("seller", -5000).await.unwrap(), -1000);
        assert_eq!(store.adjust_reputation("seller", 5).await.unwrap(), -995);
    }

    #[tokio::test]
    async fn test_panel_cooldown_upsert() {
        let store = create_test_store().await;

        assert_eq!(store.panel_cooldown("seller").await.unwrap(), None);
        store.touch_panel_cooldown("seller", 1_000).await.unwrap();
        store.touch_panel_cooldown("seller", 2_000).await.unwrap();
        assert_eq!(store.panel_cooldown("seller").await.unwrap(), Some(2_000));
    }

    #[tokio::test]
    async fn test_set_card_code_creates_user() {
        let store = create_test_store().await;

        store.set_card_code("buyer", " CARD-1 ").await.unwrap();
        let user = store.get_user("buyer").await.unwrap().unwrap();
        assert_eq!(user.card_code.as_deref(), Some("CARD-1"));
        assert!(store.get_shop("buyer").await.unwrap().is_some());
        assert!(store.set_card_code("buyer", "  ").await.is_err());
    }
}
