use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::knowledge::{
    DiaryEntrySource, FavoriteSource, GoalSource, ProfileSource, ScheduleItemSource,
};

use super::{Store, StoreError};

// Read-only queries feeding the knowledge-context assembler. The CRUD
// surface for these tables lives outside this service.
impl Store {
    pub async fn recent_diary_entries(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<DiaryEntrySource>, StoreError> {
        let rows = sqlx::query(
            "SELECT title, content, entry_date
             FROM diary_entries
             WHERE user_id = $1
             ORDER BY entry_date DESC, created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DiaryEntrySource {
                    title: row.try_get("title")?,
                    content: row.try_get("content")?,
                    entry_date: row.try_get::<NaiveDate, _>("entry_date")?,
                })
            })
            .collect()
    }

    pub async fn active_goals(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<GoalSource>, StoreError> {
        let rows = sqlx::query(
            "SELECT title, description, target_value, current_value
             FROM goals
             WHERE user_id = $1 AND status = 'active'
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GoalSource {
                    title: row.try_get("title")?,
                    description: row.try_get("description")?,
                    target_value: row.try_get("target_value")?,
                    current_value: row.try_get("current_value")?,
                })
            })
            .collect()
    }

    pub async fn schedule_items_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ScheduleItemSource>, StoreError> {
        let rows = sqlx::query(
            "SELECT title, detail, starts_at
             FROM schedule_items
             WHERE user_id = $1 AND starts_at >= $2 AND starts_at < $3
             ORDER BY starts_at ASC
             LIMIT $4",
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ScheduleItemSource {
                    title: row.try_get("title")?,
                    detail: row.try_get("detail")?,
                    starts_at: row.try_get("starts_at")?,
                })
            })
            .collect()
    }

    pub async fn favorite_entertainment(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<FavoriteSource>, StoreError> {
        let rows = sqlx::query(
            "SELECT title, category, rating, notes
             FROM entertainment_favorites
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(FavoriteSource {
                    title: row.try_get("title")?,
                    category: row.try_get("category")?,
                    rating: row.try_get("rating")?,
                    notes: row.try_get("notes")?,
                })
            })
            .collect()
    }

    pub async fn user_profile(&self, user_id: Uuid) -> Result<Option<ProfileSource>, StoreError> {
        let row = sqlx::query(
            "SELECT username, full_name
             FROM users
             WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ProfileSource {
                username: row.try_get("username")?,
                full_name: row.try_get("full_name")?,
            })
        })
        .transpose()
    }
}
