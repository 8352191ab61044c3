//! Property tests over the facade.

use crate::common::*;
use bazaar::codec::{decode, encode};
use bazaar::{fields, Fields, QueryOptions, StoreError, Value};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

fn body() -> impl Strategy<Value = Fields> {
    prop::collection::btree_map("[a-z]{1,8}", scalar(), 0..6)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_create_then_get_returns_input(data in body()) {
        let fetched = block_on(async {
            let (client, _store) = setup();
            let items = items(&client);
            let doc = items.create(&ctx(), &data).await.unwrap();
            items.get_by_id(&ctx(), &doc.id).await.unwrap().unwrap()
        });
        prop_assert_eq!(fetched.data, data);
    }

    #[test]
    fn prop_update_changes_only_given_fields(data in body(), patch in body()) {
        let (before, after) = block_on(async {
            let (client, _store) = setup();
            let items = items(&client);
            let doc = items.create(&ctx(), &data).await.unwrap();
            let updated = items.update(&ctx(), &doc.id, patch.clone()).await.unwrap();
            (doc, updated)
        });

        prop_assert!(after.updated_at >= before.updated_at);
        for (key, value) in &before.data {
            if !patch.contains_key(key) {
                prop_assert_eq!(after.data.get(key), Some(value));
            }
        }
        for (key, value) in &patch {
            prop_assert_eq!(after.data.get(key), Some(value));
        }
    }

    #[test]
    fn prop_delete_is_idempotent(data in body(), repeats in 1usize..4) {
        let found = block_on(async {
            let (client, _store) = setup();
            let items = items(&client);
            let doc = items.create(&ctx(), &data).await.unwrap();
            for _ in 0..repeats {
                items.delete(&ctx(), &doc.id).await.unwrap();
            }
            items.get_by_id(&ctx(), &doc.id).await.unwrap()
        });
        prop_assert!(found.is_none());
    }

    #[test]
    fn prop_page_size_bounds_results(n in 0usize..25, page_size in 1usize..10) {
        let (len, has_more) = block_on(async {
            let (client, _store) = setup();
            let items = items(&client);
            let batch: Vec<Fields> = (0..n as i64).map(|i| fields! { "value" => i }).collect();
            items.batch_create(&ctx(), &batch).await.unwrap();
            let page = items
                .query_paginated(&ctx(), &QueryOptions::new().limit(page_size))
                .await
                .unwrap();
            (page.data.len(), page.has_more)
        });
        prop_assert_eq!(len, n.min(page_size));
        prop_assert_eq!(has_more, n > page_size);
    }

    #[test]
    fn prop_failed_batch_applies_nothing(seed in body(), batch in prop::collection::vec(body(), 1..8)) {
        let (before, after) = block_on(async {
            let (client, store) = setup();
            let items = items(&client);
            items.create_with_id(&ctx(), "seed", &seed).await.unwrap();
            let before = dump(&store, "items").await;

            store.fail_next_commit(StoreError::unavailable("injected"));
            assert!(items.batch_create(&ctx(), &batch).await.is_err());
            (before, dump(&store, "items").await)
        });
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_transfer_conserves_sum(a in 0i64..1_000, b in 0i64..1_000, amount in 0i64..1_000, fail in any::<bool>()) {
        let (new_a, new_b) = block_on(async {
            let (client, store) = setup();
            let items = items(&client);
            items.create_with_id(&ctx(), "a", &fields! { "value" => a }).await.unwrap();
            items.create_with_id(&ctx(), "b", &fields! { "value" => b }).await.unwrap();
            let pa = items.doc_path("a").unwrap();
            let pb = items.doc_path("b").unwrap();

            if fail {
                store.fail_next_commit(StoreError::aborted("forced"));
            }
            let result = client
                .run_transaction(&ctx(), move |tx| {
                    Box::pin(async move {
                        let from = tx.get::<Fields>(&pa).await?.and_then(|d| d.get("value").and_then(Value::as_int));
                        let to = tx.get::<Fields>(&pb).await?.and_then(|d| d.get("value").and_then(Value::as_int));
                        tx.update(&pa, fields! { "value" => from.unwrap_or(0) - amount })?;
                        tx.update(&pb, fields! { "value" => to.unwrap_or(0) + amount })?;
                        Ok(())
                    })
                })
                .await;
            assert_eq!(result.is_err(), fail);

            let read = |id: &'static str| {
                let items = items.clone();
                async move {
                    items
                        .get_by_id(&ctx(), id)
                        .await
                        .unwrap()
                        .and_then(|d| d.get("value").and_then(Value::as_int))
                        .unwrap()
                }
            };
            (read("a").await, read("b").await)
        });

        prop_assert_eq!(new_a + new_b, a + b);
        if fail {
            prop_assert_eq!((new_a, new_b), (a, b));
        } else {
            prop_assert_eq!((new_a, new_b), (a - amount, b + amount));
        }
    }

    #[test]
    fn prop_stored_date_round_trips_within_a_millisecond(
        millis in 0i64..4_102_444_800_000,
        extra_nanos in 0u32..1_000_000,
    ) {
        let date = Utc.timestamp_millis_opt(millis).unwrap() + chrono::Duration::nanoseconds(extra_nanos as i64);
        let back = block_on(async {
            let (client, _store) = setup();
            let items = items(&client);
            let doc = items.create(&ctx(), &fields! { "when" => date }).await.unwrap();
            doc.get("when").and_then(Value::as_date).unwrap()
        });
        prop_assert!((back - date).num_microseconds().unwrap().abs() < 1_000);
        prop_assert_eq!(decode(&encode(&Value::Date(back))), Value::Date(back));
    }
}
