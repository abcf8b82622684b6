mod support;

use serial_test::serial;
use shared::models::{AssistantConfigDraft, AssistantConfigPatch, ProviderOverride};
use shared::repos::{Store, StoreError};
use uuid::Uuid;

fn draft(name: &str) -> AssistantConfigDraft {
    AssistantConfigDraft {
        name: name.to_string(),
        description: None,
        system_prompt: "You are concise.".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        temperature: "0.7".to_string(),
        max_tokens: 2000,
        top_p: "1".to_string(),
        frequency_penalty: "0".to_string(),
        presence_penalty: "0".to_string(),
        icon: "🤖".to_string(),
        is_default: false,
        is_active: true,
        provider_override: None,
    }
}

async fn count_defaults(store: &Store, user_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM assistant_configs WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .fetch_one(store.pool())
    .await
    .expect("default count query should succeed")
}

#[tokio::test]
#[serial]
async fn first_config_becomes_default_and_defaults_stay_single() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;

    let first = store
        .create_assistant_config(user_id, &draft("First"))
        .await
        .expect("first config should create");
    assert!(first.is_default, "first config must become the default");

    let second = store
        .create_assistant_config(user_id, &draft("Second"))
        .await
        .expect("second config should create");
    assert!(!second.is_default);
    assert_eq!(count_defaults(&store, user_id).await, 1);

    let mut third_draft = draft("Third");
    third_draft.is_default = true;
    let third = store
        .create_assistant_config(user_id, &third_draft)
        .await
        .expect("third config should create");
    assert!(third.is_default);
    assert_eq!(count_defaults(&store, user_id).await, 1);

    let default = store
        .get_default_assistant_config(user_id)
        .await
        .expect("default lookup should succeed")
        .expect("a default should exist");
    assert_eq!(default.id, third.id);
}

#[tokio::test]
#[serial]
async fn set_default_is_idempotent() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;

    let first = store
        .create_assistant_config(user_id, &draft("First"))
        .await
        .expect("first config should create");
    let second = store
        .create_assistant_config(user_id, &draft("Second"))
        .await
        .expect("second config should create");

    for _ in 0..2 {
        let updated = store
            .set_default_assistant_config(user_id, second.id)
            .await
            .expect("set-default should succeed");
        assert!(updated.is_default);
        assert_eq!(count_defaults(&store, user_id).await, 1);
    }

    let reloaded_first = store
        .get_assistant_config(user_id, first.id)
        .await
        .expect("first config should still exist");
    assert!(!reloaded_first.is_default);
}

#[tokio::test]
#[serial]
async fn deleting_the_default_conflicts_while_others_remain() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;

    let default_config = store
        .create_assistant_config(user_id, &draft("Default"))
        .await
        .expect("default config should create");
    let other = store
        .create_assistant_config(user_id, &draft("Other"))
        .await
        .expect("other config should create");

    let refused = store
        .delete_assistant_config(user_id, default_config.id)
        .await;
    assert!(matches!(refused, Err(StoreError::Conflict(_))));

    store
        .delete_assistant_config(user_id, other.id)
        .await
        .expect("non-default config should delete");

    store
        .delete_assistant_config(user_id, default_config.id)
        .await
        .expect("sole remaining config should delete");
    assert_eq!(count_defaults(&store, user_id).await, 0);
    assert!(
        store
            .list_assistant_configs(user_id)
            .await
            .expect("list should succeed")
            .is_empty()
    );
}

#[tokio::test]
#[serial]
async fn explicit_null_patch_clears_nullable_fields() {
    let store = support::test_store().await;
    support::reset_database(store.pool()).await;
    let user_id = support::create_user(store.pool()).await;

    let mut initial = draft("Overridden");
    initial.description = Some("routes to a local endpoint".to_string());
    initial.provider_override = Some(ProviderOverride {
        vendor_url: Some("https://llm.example.com/v1".to_string()),
        api_key: Some("sk-test".to_string()),
        model: Some("local-llama".to_string()),
    });
    let created = store
        .create_assistant_config(user_id, &initial)
        .await
        .expect("config should create");
    assert!(created.provider_override.is_some());

    // An absent field leaves the stored value alone.
    let rename_only = AssistantConfigPatch {
        name: Some("Renamed".to_string()),
        ..AssistantConfigPatch::default()
    };
    let renamed = store
        .update_assistant_config(user_id, created.id, &rename_only)
        .await
        .expect("rename patch should apply");
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(
        renamed.description.as_deref(),
        Some("routes to a local endpoint")
    );
    assert!(renamed.provider_override.is_some());

    // An explicit null clears it.
    let clear = AssistantConfigPatch {
        description: Some(None),
        provider_override: Some(None),
        ..AssistantConfigPatch::default()
    };
    let cleared = store
        .update_assistant_config(user_id, created.id, &clear)
        .await
        .expect("clearing patch should apply");
    assert!(cleared.description.is_none());
    assert!(cleared.provider_override.is_none());
}
