//! User-record operations: the rows segment filters are evaluated against.

use crate::domain::{Decimal, TimeMs, UserId};
use crate::filter::sql::count_users_query;
use crate::filter::{Filter, UserRecord};
use sqlx::Row;

use super::Repository;

impl Repository {
    /// Insert a user idempotently. Returns whether a row was added.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_user(
        &self,
        id: &UserId,
        email: Option<&str>,
        created_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(id.as_str())
        .bind(email)
        .bind(created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record an order for a user. The amount is stored in cents.
    ///
    /// # Errors
    /// Returns an error if the amount does not fit in cents or the insert fails
    /// (including an unknown `user_id`).
    pub async fn insert_order(
        &self,
        order_id: &str,
        user_id: &UserId,
        amount: Decimal,
        created_at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let amount_cents = amount.to_minor_units().ok_or_else(|| {
            sqlx::Error::Protocol(format!("order amount {} out of range", amount))
        })?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, amount_cents, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(user_id.as_str())
        .bind(amount_cents)
        .bind(created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a design for a user.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_design(
        &self,
        design_id: &str,
        user_id: &UserId,
        created_at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO designs (id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(design_id)
            .bind(user_id.as_str())
            .bind(created_at.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a user with its orders and designs in a single transaction.
    ///
    /// Related record ids are derived from the user id.
    ///
    /// # Errors
    /// Returns an error if any insert fails; nothing is written in that case.
    pub async fn insert_user_record(&self, record: &UserRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, NULL, ?)")
            .bind(record.id.as_str())
            .bind(record.created_at.as_ms())
            .execute(&mut *tx)
            .await?;

        for (i, amount) in record.order_amounts.iter().enumerate() {
            let amount_cents = amount.to_minor_units().ok_or_else(|| {
                sqlx::Error::Protocol(format!("order amount {} out of range", amount))
            })?;
            sqlx::query(
                "INSERT INTO orders (id, user_id, amount_cents, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(format!("{}:order:{}", record.id, i))
            .bind(record.id.as_str())
            .bind(amount_cents)
            .bind(record.created_at.as_ms())
            .execute(&mut *tx)
            .await?;
        }

        for i in 0..record.design_count {
            sqlx::query("INSERT INTO designs (id, user_id, created_at) VALUES (?, ?, ?)")
                .bind(format!("{}:design:{}", record.id, i))
                .bind(record.id.as_str())
                .bind(record.created_at.as_ms())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Count users for which `filter` holds.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_matching_users(&self, filter: &Filter) -> Result<i64, sqlx::Error> {
        let mut query = count_users_query(filter);
        let row = query.build().fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("user_count"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;
    use crate::filter::compile_value;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_user_idempotent() {
        let (repo, _temp) = setup_test_db().await;
        let id = UserId::new("u1".to_string());

        assert!(repo
            .insert_user(&id, Some("a@example.com"), TimeMs::new(1))
            .await
            .unwrap());
        assert!(!repo.insert_user(&id, None, TimeMs::new(2)).await.unwrap());
        assert_eq!(repo.count_matching_users(&Filter::always()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_order_for_unknown_user_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let result = repo
            .insert_order("o1", &UserId::new("ghost".to_string()), d("10"), TimeMs::new(0))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_oversized_order_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let id = UserId::new("u1".to_string());
        repo.insert_user(&id, None, TimeMs::new(0)).await.unwrap();

        let huge = d("1000000000000000000000000000");
        let result = repo.insert_order("o1", &id, huge, TimeMs::new(0)).await;
        assert!(matches!(result, Err(sqlx::Error::Protocol(_))));

        let record = UserRecord::new("u2", TimeMs::new(0)).with_order(huge);
        assert!(repo.insert_user_record(&record).await.is_err());

        assert_eq!(repo.count_matching_users(&Filter::always()).await.unwrap(), 1);
        let has_orders = compile_value(&json!({ "has_orders": true }));
        assert_eq!(repo.count_matching_users(&has_orders).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_min_order_amount_against_cents() {
        let (repo, _temp) = setup_test_db().await;
        let id = UserId::new("u1".to_string());
        repo.insert_user(&id, None, TimeMs::new(0)).await.unwrap();
        repo.insert_order("o1", &id, d("199.99"), TimeMs::new(0))
            .await
            .unwrap();

        let at_200 = compile_value(&json!({ "min_order_amount": 200 }));
        let at_199_99 = compile_value(&json!({ "min_order_amount": "199.99" }));
        let at_199_985 = compile_value(&json!({ "min_order_amount": "199.985" }));

        assert_eq!(repo.count_matching_users(&at_200).await.unwrap(), 0);
        assert_eq!(repo.count_matching_users(&at_199_99).await.unwrap(), 1);
        assert_eq!(repo.count_matching_users(&at_199_985).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_user_record_and_count() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_user_record(
            &UserRecord::new("a", TimeMs::new(100))
                .with_order(d("50"))
                .with_order(d("75"))
                .with_designs(2),
        )
        .await
        .unwrap();
        repo.insert_user_record(&UserRecord::new("b", TimeMs::new(200)))
            .await
            .unwrap();

        let two_orders = compile_value(&json!({ "order_count_min": 2 }));
        let designers = compile_value(&json!({ "has_designs": true, "design_count_min": 2 }));
        let late = compile_value(&json!({ "created_after": 150 }));

        assert_eq!(repo.count_matching_users(&two_orders).await.unwrap(), 1);
        assert_eq!(repo.count_matching_users(&designers).await.unwrap(), 1);
        assert_eq!(repo.count_matching_users(&late).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_user_record_is_atomic() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_user_record(&UserRecord::new("a", TimeMs::new(0)))
            .await
            .unwrap();

        // Duplicate user id fails the first insert; no orders may leak in.
        let dup = UserRecord::new("a", TimeMs::new(0)).with_order(d("10"));
        assert!(repo.insert_user_record(&dup).await.is_err());

        let has_orders = compile_value(&json!({ "has_orders": true }));
        assert_eq!(repo.count_matching_users(&has_orders).await.unwrap(), 0);
    }
}
