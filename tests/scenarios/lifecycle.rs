//! Document lifecycle walkthroughs: create, update, paginate, batch, transfer.

use crate::common::*;
use bazaar::{fields, Error, QueryOptions, StoreCode, StoreError, Value};
use std::time::Duration;

#[tokio::test]
async fn test_create_stamps_both_timestamps() {
    let (client, _store) = setup();
    let items = items(&client);

    let doc = items.create(&ctx(), &fields! { "name" => "Foo", "value" => 1 }).await.unwrap();

    assert!(!doc.id.is_empty());
    assert_eq!(doc.created_at, doc.updated_at);
    assert_eq!(doc.get("name"), Some(&Value::from("Foo")));
    assert_eq!(doc.get("value"), Some(&Value::Int(1)));
    assert_eq!(doc.len(), 2);

    let fetched = items.get_by_id(&ctx(), &doc.id).await.unwrap().unwrap();
    assert_eq!(fetched, doc);
}

#[tokio::test]
async fn test_update_keeps_untouched_fields() {
    let (client, _store) = setup();
    let items = items(&client);
    let created = items.create(&ctx(), &fields! { "name" => "Foo", "value" => 1 }).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = items.update(&ctx(), &created.id, fields! { "name" => "Bar" }).await.unwrap();

    assert_eq!(updated.get("name"), Some(&Value::from("Bar")));
    assert_eq!(updated.get("value"), Some(&Value::Int(1)));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.created_at);
}

#[tokio::test]
async fn test_pagination_reports_has_more() {
    let (client, _store) = setup();
    let items = items(&client);
    for i in 0..7 {
        items.create(&ctx(), &fields! { "value" => i }).await.unwrap();
    }

    let page = items.query_paginated(&ctx(), &QueryOptions::new().limit(5)).await.unwrap();
    assert_eq!(page.data.len(), 5);
    assert!(page.has_more);

    let (client, _store) = setup();
    let items = crate::common::items(&client);
    for i in 0..3 {
        items.create(&ctx(), &fields! { "value" => i }).await.unwrap();
    }

    let page = items.query_paginated(&ctx(), &QueryOptions::new().limit(5)).await.unwrap();
    assert_eq!(page.data.len(), 3);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_failed_batch_create_leaves_store_untouched() {
    let (client, store) = setup();
    let items = items(&client);
    items.create_with_id(&ctx(), "existing", &fields! { "value" => 0 }).await.unwrap();
    let before = dump(&store, "items").await;

    store.fail_next_commit(StoreError::unavailable("simulated commit failure"));
    let err = items
        .batch_create(&ctx(), &[fields! { "name" => "d1" }, fields! { "name" => "d2" }])
        .await
        .unwrap_err();

    assert_eq!(err.store_code(), Some(StoreCode::Unavailable));
    assert_eq!(dump(&store, "items").await, before);
}

#[tokio::test]
async fn test_transfer_preserves_sum() {
    let (client, _store) = setup();
    let items = items(&client);
    items.create_with_id(&ctx(), "a", &fields! { "value" => 500 }).await.unwrap();
    items.create_with_id(&ctx(), "b", &fields! { "value" => 200 }).await.unwrap();
    let a = items.doc_path("a").unwrap();
    let b = items.doc_path("b").unwrap();

    client
        .run_transaction(&ctx(), move |tx| {
            Box::pin(async move {
                let from = tx.get::<bazaar::Fields>(&a).await?.ok_or_else(|| Error::not_found(&a))?;
                let to = tx.get::<bazaar::Fields>(&b).await?.ok_or_else(|| Error::not_found(&b))?;
                let from_value = from.get("value").and_then(Value::as_int).unwrap_or(0);
                let to_value = to.get("value").and_then(Value::as_int).unwrap_or(0);
                tx.update(&a, fields! { "value" => from_value - 100 })?;
                tx.update(&b, fields! { "value" => to_value + 100 })?;
                Ok(())
            })
        })
        .await
        .unwrap();

    let a = items.get_by_id(&ctx(), "a").await.unwrap().unwrap();
    let b = items.get_by_id(&ctx(), "b").await.unwrap().unwrap();
    assert_eq!(a.get("value"), Some(&Value::Int(400)));
    assert_eq!(b.get("value"), Some(&Value::Int(300)));
}
