use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::models::{
    AssistantConfigDraft, AssistantConfigPatch, AssistantConfigResponse, ProviderOverride,
    ProviderOverrideSummary,
};

use super::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct AssistantConfigRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: String,
    pub temperature: String,
    pub max_tokens: i32,
    pub top_p: String,
    pub frequency_penalty: String,
    pub presence_penalty: String,
    pub icon: String,
    pub is_default: bool,
    pub is_active: bool,
    pub provider_override: Option<ProviderOverride>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssistantConfigRecord {
    pub fn into_response(self) -> AssistantConfigResponse {
        AssistantConfigResponse {
            id: self.id,
            name: self.name,
            description: self.description,
            system_prompt: self.system_prompt,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            icon: self.icon,
            is_default: self.is_default,
            is_active: self.is_active,
            provider_override: self
                .provider_override
                .as_ref()
                .map(ProviderOverrideSummary::from_override),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Store {
    pub async fn create_assistant_config(
        &self,
        user_id: Uuid,
        draft: &AssistantConfigDraft,
    ) -> Result<AssistantConfigRecord, StoreError> {
        let provider_override = override_to_json(draft.provider_override.as_ref())?;
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assistant_configs WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        // The first config a user creates always becomes their default.
        let is_default = draft.is_default || existing == 0;
        if is_default {
            sqlx::query(
                "UPDATE assistant_configs SET is_default = FALSE
                 WHERE user_id = $1 AND is_default",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(
            "INSERT INTO assistant_configs (
                id, user_id, name, description, system_prompt, model, temperature,
                max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                is_default, is_active, provider_override, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING id, user_id, name, description, system_prompt, model, temperature,
                       max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                       is_default, is_active, provider_override, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.system_prompt)
        .bind(&draft.model)
        .bind(&draft.temperature)
        .bind(draft.max_tokens)
        .bind(&draft.top_p)
        .bind(&draft.frequency_penalty)
        .bind(&draft.presence_penalty)
        .bind(&draft.icon)
        .bind(is_default)
        .bind(draft.is_active)
        .bind(provider_override)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let record = row_to_config(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn update_assistant_config(
        &self,
        user_id: Uuid,
        config_id: Uuid,
        patch: &AssistantConfigPatch,
    ) -> Result<AssistantConfigRecord, StoreError> {
        // Nullable columns take a provided flag plus a value so an
        // explicit null in the patch clears them, while an absent field
        // leaves them unchanged.
        let description_provided = patch.description.is_some();
        let description = patch.description.clone().flatten();
        let provider_override_provided = patch.provider_override.is_some();
        let provider_override =
            override_to_json(patch.provider_override.as_ref().and_then(Option::as_ref))?;
        let mut tx = self.pool.begin().await?;

        if patch.is_default == Some(true) {
            sqlx::query(
                "UPDATE assistant_configs SET is_default = FALSE
                 WHERE user_id = $1 AND id <> $2 AND is_default",
            )
            .bind(user_id)
            .bind(config_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(
            "UPDATE assistant_configs SET
                name = COALESCE($3, name),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                system_prompt = COALESCE($6, system_prompt),
                model = COALESCE($7, model),
                temperature = COALESCE($8, temperature),
                max_tokens = COALESCE($9, max_tokens),
                top_p = COALESCE($10, top_p),
                frequency_penalty = COALESCE($11, frequency_penalty),
                presence_penalty = COALESCE($12, presence_penalty),
                icon = COALESCE($13, icon),
                is_default = COALESCE($14, is_default),
                is_active = COALESCE($15, is_active),
                provider_override = CASE WHEN $16 THEN $17 ELSE provider_override END,
                updated_at = $18
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, name, description, system_prompt, model, temperature,
                       max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                       is_default, is_active, provider_override, created_at, updated_at",
        )
        .bind(config_id)
        .bind(user_id)
        .bind(&patch.name)
        .bind(description_provided)
        .bind(description)
        .bind(&patch.system_prompt)
        .bind(&patch.model)
        .bind(&patch.temperature)
        .bind(patch.max_tokens)
        .bind(&patch.top_p)
        .bind(&patch.frequency_penalty)
        .bind(&patch.presence_penalty)
        .bind(&patch.icon)
        .bind(patch.is_default)
        .bind(patch.is_active)
        .bind(provider_override_provided)
        .bind(provider_override)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        // Wrong id and wrong owner are indistinguishable on purpose.
        let row = row.ok_or(StoreError::NotFound)?;
        let record = row_to_config(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn set_default_assistant_config(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> Result<AssistantConfigRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE assistant_configs SET is_default = FALSE
             WHERE user_id = $1 AND id <> $2 AND is_default",
        )
        .bind(user_id)
        .bind(config_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            "UPDATE assistant_configs SET is_default = TRUE, updated_at = $3
             WHERE id = $2 AND user_id = $1
             RETURNING id, user_id, name, description, system_prompt, model, temperature,
                       max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                       is_default, is_active, provider_override, created_at, updated_at",
        )
        .bind(user_id)
        .bind(config_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or(StoreError::NotFound)?;
        let record = row_to_config(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn get_assistant_config(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> Result<AssistantConfigRecord, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, description, system_prompt, model, temperature,
                    max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                    is_default, is_active, provider_override, created_at, updated_at
             FROM assistant_configs
             WHERE id = $1 AND user_id = $2",
        )
        .bind(config_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_config).ok_or(StoreError::NotFound)?
    }

    pub async fn get_default_assistant_config(
        &self,
        user_id: Uuid,
    ) -> Result<Option<AssistantConfigRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, description, system_prompt, model, temperature,
                    max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                    is_default, is_active, provider_override, created_at, updated_at
             FROM assistant_configs
             WHERE user_id = $1 AND is_default",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_config).transpose()
    }

    pub async fn list_assistant_configs(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AssistantConfigRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, description, system_prompt, model, temperature,
                    max_tokens, top_p, frequency_penalty, presence_penalty, icon,
                    is_default, is_active, provider_override, created_at, updated_at
             FROM assistant_configs
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_config).collect()
    }

    /// Deleting the current default is refused while other configs remain;
    /// the caller must designate a new default first. Deleting the sole
    /// config is allowed and leaves the user with zero configs.
    pub async fn delete_assistant_config(
        &self,
        user_id: Uuid,
        config_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT is_default FROM assistant_configs
             WHERE id = $1 AND user_id = $2
             FOR UPDATE",
        )
        .bind(config_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or(StoreError::NotFound)?;
        let is_default: bool = row.try_get("is_default")?;

        if is_default {
            let others: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM assistant_configs
                 WHERE user_id = $1 AND id <> $2",
            )
            .bind(user_id)
            .bind(config_id)
            .fetch_one(&mut *tx)
            .await?;

            if others > 0 {
                return Err(StoreError::Conflict(
                    "cannot delete the default assistant config while others exist; \
                     set a new default first"
                        .to_string(),
                ));
            }
        }

        sqlx::query("DELETE FROM assistant_configs WHERE id = $1 AND user_id = $2")
            .bind(config_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn override_to_json(value: Option<&ProviderOverride>) -> Result<Option<Value>, StoreError> {
    value
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| StoreError::InvalidData(format!("provider override invalid: {err}")))
}

fn row_to_config(row: &PgRow) -> Result<AssistantConfigRecord, StoreError> {
    let provider_override_raw: Option<Value> = row.try_get("provider_override")?;
    let provider_override = provider_override_raw
        .map(serde_json::from_value::<ProviderOverride>)
        .transpose()
        .map_err(|err| StoreError::InvalidData(format!("provider override invalid: {err}")))?;

    Ok(AssistantConfigRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        system_prompt: row.try_get("system_prompt")?,
        model: row.try_get("model")?,
        temperature: row.try_get("temperature")?,
        max_tokens: row.try_get("max_tokens")?,
        top_p: row.try_get("top_p")?,
        frequency_penalty: row.try_get("frequency_penalty")?,
        presence_penalty: row.try_get("presence_penalty")?,
        icon: row.try_get("icon")?,
        is_default: row.try_get("is_default")?,
        is_active: row.try_get("is_active")?,
        provider_override,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
