use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::notification::{Acknowledgement, NewNotification, Notification, Owner};
use crate::infra::db::Db;

/// Persistence for notifications, injected into handlers through `AppState`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> Result<Notification>;

    /// Unread notifications for one owner, oldest first.
    async fn list_unread(&self, owner: &Owner) -> Result<Vec<Notification>>;

    async fn get(&self, id: i64) -> Result<Option<Notification>>;

    /// The stored `delete_after_read` flag, or `None` if the id is unknown.
    async fn get_policy(&self, id: i64) -> Result<Option<bool>>;

    /// Delete or mark read according to the stored policy, as one mutation.
    async fn acknowledge(&self, id: i64) -> Result<Acknowledgement>;

    /// Remove retained notifications that were read before `before`.
    async fn purge_read(&self, before: OffsetDateTime) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}

const COLUMNS: &str =
    "id, user_id, session_id, message, fadeout, delete_after_read, is_read, created_at, read_at";

#[derive(Clone)]
pub struct PgNotificationStore {
    db: Db,
}

impl PgNotificationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<Notification> {
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (user_id, session_id, message, fadeout, delete_after_read) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            COLUMNS
        ))
        .bind(new.owner.user_id())
        .bind(new.owner.session_id())
        .bind(&new.message)
        .bind(new.fadeout.to_string())
        .bind(new.delete_after_read)
        .fetch_one(self.db.pool())
        .await?;

        notification_from_row(&row)
    }

    async fn list_unread(&self, owner: &Owner) -> Result<Vec<Notification>> {
        let rows = match owner {
            Owner::User(user_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM notifications \
                     WHERE user_id = $1 AND is_read = FALSE \
                     ORDER BY id ASC",
                    COLUMNS
                ))
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?
            }
            Owner::Session(token) => {
                sqlx::query(&format!(
                    "SELECT {} FROM notifications \
                     WHERE session_id = $1 AND is_read = FALSE \
                     ORDER BY id ASC",
                    COLUMNS
                ))
                .bind(token.as_str())
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            notifications.push(notification_from_row(&row)?);
        }

        Ok(notifications)
    }

    async fn get(&self, id: i64) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!("SELECT {} FROM notifications WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn get_policy(&self, id: i64) -> Result<Option<bool>> {
        let policy: Option<bool> = sqlx::query_scalar("SELECT delete_after_read FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(policy)
    }

    async fn acknowledge(&self, id: i64) -> Result<Acknowledgement> {
        // Both branches see the same snapshot and their predicates are disjoint,
        // so exactly one of them can touch an existing row.
        let row = sqlx::query(
            "WITH deleted AS ( \
                 DELETE FROM notifications \
                 WHERE id = $1 AND delete_after_read = TRUE \
                 RETURNING id \
             ), updated AS ( \
                 UPDATE notifications \
                 SET is_read = TRUE, read_at = COALESCE(read_at, now()) \
                 WHERE id = $1 AND delete_after_read = FALSE \
                 RETURNING id \
             ) \
             SELECT (SELECT count(*) FROM deleted) AS deleted, \
                    (SELECT count(*) FROM updated) AS updated",
        )
        .bind(id)
        .fetch_one(self.db.pool())
        .await?;

        let deleted: i64 = row.get("deleted");
        let updated: i64 = row.get("updated");

        Ok(match (deleted, updated) {
            (0, 0) => Acknowledgement::NotFound,
            (_, 0) => Acknowledgement::Deleted,
            _ => Acknowledgement::MarkedRead,
        })
    }

    async fn purge_read(&self, before: OffsetDateTime) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE is_read = TRUE AND read_at IS NOT NULL AND read_at < $1",
        )
        .bind(before)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let id: i64 = row.get("id");
    let owner = Owner::from_columns(row.get("user_id"), row.get("session_id"))
        .map_err(|err| anyhow!("notification {}: {}", id, err))?;
    let fadeout: String = row.get("fadeout");

    Ok(Notification {
        id,
        owner,
        message: row.get("message"),
        fadeout: fadeout
            .parse()
            .map_err(|err| anyhow!("notification {}: {}", id, err))?,
        delete_after_read: row.get("delete_after_read"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
        read_at: row.get("read_at"),
    })
}
