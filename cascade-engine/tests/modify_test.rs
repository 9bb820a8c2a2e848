mod common;

use std::sync::Arc;

use cascade_engine::CascadeError;
use cascade_models::keys;
use common::*;

async fn setup(groups: &[(&str, &[&str])]) -> Arc<RecordingStore> {
    let store = Arc::new(RecordingStore::new());
    seed_catalog(&store.inner, groups).await;
    store
}

#[tokio::test]
async fn test_two_groups_two_windows_make_six_pages() {
    let store = setup(&[("g1", &["p1", "p2"]), ("g2", &["p3"])]).await;
    let router = router(store.clone(), config());
    let before = campaign(&[], &[]);
    let after = campaign(&["g1", "g2"], &[JAN, FEB]);

    router.campaigns().on_modify(&before, &after).await.unwrap();

    assert_eq!(
        page_ids(&store.inner).await,
        pages(&[
            ("p1", JAN_ID),
            ("p1", FEB_ID),
            ("p2", JAN_ID),
            ("p2", FEB_ID),
            ("p3", JAN_ID),
            ("p3", FEB_ID),
        ])
    );
    let page = display_pages(&store.inner)
        .await
        .into_iter()
        .find(|p| p.product_id == "p3" && p.window_id == FEB_ID)
        .unwrap();
    assert_eq!(page.campaign_id, "c1");
    assert_eq!(page.product_group_id, "g2");
    assert_eq!(page.landing_page_id, "lp2");

    assert_eq!(
        sort_keys(&store.inner, keys::PRODUCT_GROUP_LINK_PREFIX).await,
        [
            keys::product_group_link_sort_key("g1", "c1"),
            keys::product_group_link_sort_key("g2", "c1"),
        ]
    );
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX).await,
        [
            keys::landing_page_link_sort_key("lp1", "c1"),
            keys::landing_page_link_sort_key("lp2", "c1"),
        ]
    );
}

#[tokio::test]
async fn test_repeated_modify_is_idempotent() {
    let store = setup(&[("g1", &["p1", "p2"]), ("g2", &["p3"])]).await;
    let router = router(store.clone(), config());
    let before = campaign(&["g1"], &[JAN]);
    let after = campaign(&["g2"], &[JAN, FEB]);

    router.campaigns().on_modify(&before, &after).await.unwrap();
    let first = store.inner.items(TABLE).await;
    router.campaigns().on_modify(&before, &after).await.unwrap();
    assert_eq!(store.inner.items(TABLE).await, first);
}

#[tokio::test]
async fn test_identical_snapshots_write_nothing() {
    let store = setup(&[("g1", &["p1"])]).await;
    let router = router(store.clone(), config());
    let snapshot = campaign(&["g1"], &[JAN]);

    let outcome = router
        .campaigns()
        .on_modify(&snapshot, &snapshot)
        .await
        .unwrap();

    assert!(outcome.is_noop());
    assert_eq!(store.total_writes(), 0);
    assert_eq!(store.query_count(), 0);
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_display_only_fields_write_nothing() {
    let store = setup(&[("g1", &["p1"])]).await;
    let router = router(store.clone(), config());
    let before = campaign(&["g1"], &[JAN]);
    let mut after = before.clone();
    let group = &mut after.campaign_product_groups[0];
    group.product_group_name = "Renamed group".into();
    after.campaign_product_groups[0].product_group_count = 40;
    after.campaign_landing_pages[0].landing_page_name = "Renamed page".into();

    let outcome = router.campaigns().on_modify(&before, &after).await.unwrap();
    assert!(outcome.is_noop());
    assert_eq!(store.total_writes(), 0);
}

#[tokio::test]
async fn test_group_swap() {
    let store = setup(&[("g1", &["p1", "p2"]), ("g2", &["p3"])]).await;
    let router = router(store.clone(), config());
    let empty = campaign(&[], &[]);
    let with_g1 = campaign(&["g1"], &[JAN]);
    let with_g2 = campaign(&["g2"], &[JAN]);

    router.campaigns().on_modify(&empty, &with_g1).await.unwrap();
    assert_eq!(
        page_ids(&store.inner).await,
        pages(&[("p1", JAN_ID), ("p2", JAN_ID)])
    );

    router.campaigns().on_modify(&with_g1, &with_g2).await.unwrap();
    assert_eq!(page_ids(&store.inner).await, pages(&[("p3", JAN_ID)]));
    assert_eq!(
        sort_keys(&store.inner, keys::PRODUCT_GROUP_LINK_PREFIX).await,
        [keys::product_group_link_sort_key("g2", "c1")]
    );
    // the landing page link is untouched by a group-only change
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX).await,
        [keys::landing_page_link_sort_key("lp1", "c1")]
    );
}

#[tokio::test]
async fn test_added_window_leaves_existing_pages_untouched() {
    let store = setup(&[("g1", &["p1", "p2"])]).await;
    let router = router(store.clone(), config());
    let january = campaign(&["g1"], &[JAN]);
    let both = campaign(&["g1"], &[JAN, FEB]);
    router
        .campaigns()
        .on_modify(&campaign(&[], &[]), &january)
        .await
        .unwrap();
    let group_links =
        sort_keys(&store.inner, keys::PRODUCT_GROUP_LINK_PREFIX)
            .await;
    let january_pages = display_pages(&store.inner).await;
    store.reset_counters();

    let outcome = router.campaigns().on_modify(&january, &both).await.unwrap();

    // two FEB pages and the lp2 link
    assert_eq!(outcome.writes, 3);
    assert_eq!(store.total_writes(), 3);
    assert_eq!(
        page_ids(&store.inner).await,
        pages(&[
            ("p1", JAN_ID),
            ("p1", FEB_ID),
            ("p2", JAN_ID),
            ("p2", FEB_ID),
        ])
    );
    let still_january: Vec<_> = display_pages(&store.inner)
        .await
        .into_iter()
        .filter(|p| p.window_id == JAN_ID)
        .collect();
    assert_eq!(still_january, january_pages);
    assert_eq!(
        sort_keys(&store.inner, keys::PRODUCT_GROUP_LINK_PREFIX)
            .await,
        group_links
    );
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX)
            .await,
        [
            keys::landing_page_link_sort_key("lp1", "c1"),
            keys::landing_page_link_sort_key("lp2", "c1"),
        ]
    );
}

#[tokio::test]
async fn test_window_lengthened_in_place() {
    let store = setup(&[("g1", &["p1", "p2"])]).await;
    let router = router(store.clone(), config());
    let empty = campaign(&[], &[]);
    let january = campaign(&["g1"], &[JAN]);
    let extended = campaign(&["g1"], &[("lp1", "2024-01-01", "2024-02-29")]);

    router.campaigns().on_modify(&empty, &january).await.unwrap();
    router.campaigns().on_modify(&january, &extended).await.unwrap();

    assert_eq!(
        page_ids(&store.inner).await,
        pages(&[("p1", "2024010120240229"), ("p2", "2024010120240229")])
    );
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX).await,
        [keys::landing_page_link_sort_key("lp1", "c1")]
    );
}

#[tokio::test]
async fn test_removed_group_spares_products_of_retained_group() {
    let store =
        setup(&[("g1", &["p1", "shared"]), ("g2", &["shared", "p2"])]).await;
    let router = router(store.clone(), config());
    let empty = campaign(&[], &[]);
    let both = campaign(&["g1", "g2"], &[JAN]);
    let only_g2 = campaign(&["g2"], &[JAN]);

    router.campaigns().on_modify(&empty, &both).await.unwrap();
    router.campaigns().on_modify(&both, &only_g2).await.unwrap();

    assert_eq!(
        page_ids(&store.inner).await,
        pages(&[("p2", JAN_ID), ("shared", JAN_ID)])
    );
    // the kept page now belongs to the group that still holds the product
    let shared = display_pages(&store.inner)
        .await
        .into_iter()
        .find(|p| p.product_id == "shared")
        .unwrap();
    assert_eq!(shared.product_group_id, "g2");
    assert_eq!(shared.campaign_id, "c1");
}

#[tokio::test]
async fn test_removed_group_sweeps_pages_at_unlisted_windows() {
    let store = setup(&[("g1", &["p1"])]).await;
    let router = router(store.clone(), config());
    let live = campaign(&["g1"], &[JAN]);
    router
        .campaigns()
        .on_modify(&campaign(&[], &[]), &live)
        .await
        .unwrap();
    let stale = [
        image(&stored_page("p1", FEB_ID, "c1", "g1")),
        image(&stored_page("p1", "2024030120240331", "c2", "g9")),
    ];
    store.inner.seed(TABLE, stale).await.unwrap();

    router
        .campaigns()
        .on_modify(&live, &campaign(&[], &[JAN]))
        .await
        .unwrap();

    assert_eq!(
        page_owners(&store.inner).await,
        [(
            "p1".to_string(),
            "2024030120240331".to_string(),
            "c2".to_string()
        )]
    );
}

#[tokio::test]
async fn test_rename_propagates_to_current_groups() {
    let store = setup(&[("g1", &["p1"]), ("g2", &["p2"])]).await;
    let router = router(store.clone(), config());
    let before = named_campaign("Summer", &["g1", "g2"], &[JAN]);
    let after = named_campaign("Winter", &["g1", "g2"], &[JAN]);

    let outcome = router.campaigns().on_modify(&before, &after).await.unwrap();

    assert_eq!(outcome.groups_renamed, 2);
    assert_eq!(outcome.writes, 0);
    for group in ["g1", "g2"] {
        let group = product_group(&store.inner, group).await;
        assert_eq!(group.assigned_campaign_name.as_deref(), Some("Winter"));
        assert_eq!(group.assigned_campaign_id.as_deref(), Some("c1"));
    }
}

#[tokio::test]
async fn test_large_group_is_fully_paginated() {
    let products: Vec<String> = (0..60).map(|i| format!("p{i:02}")).collect();
    let refs: Vec<&str> = products.iter().map(String::as_str).collect();
    let store = setup(&[("big", refs.as_slice())]).await;
    let router = router(store.clone(), config());

    router
        .campaigns()
        .on_modify(&campaign(&[], &[]), &campaign(&["big"], &[JAN]))
        .await
        .unwrap();

    assert_eq!(display_pages(&store.inner).await.len(), 60);
    // page size 2: 30 full pages plus none left over
    assert_eq!(store.query_count(), 30);
    assert!(store.batch_sizes().iter().all(|size| *size <= 25));
}

#[tokio::test]
async fn test_failure_aborts_remaining_phases() {
    let store = setup(&[("g1", &["p1", "p2"]), ("g2", &["p3"])]).await;
    let router = router(store.clone(), config());
    let before = named_campaign("Summer", &["g1"], &[JAN]);
    let after = named_campaign("Winter", &["g2"], &[FEB]);
    router
        .campaigns()
        .on_modify(&named_campaign("Summer", &[], &[]), &before)
        .await
        .unwrap();

    store.fail_batches_touching(keys::LANDING_PAGE_LINK_PREFIX);
    let result = router.campaigns().on_modify(&before, &after).await;
    assert!(matches!(result, Err(CascadeError::Store(_))));

    // the group phase landed; the window phase and the rename did not
    assert_eq!(page_ids(&store.inner).await, pages(&[("p3", FEB_ID)]));
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX).await,
        [keys::landing_page_link_sort_key("lp1", "c1")]
    );
    let g2 = product_group(&store.inner, "g2").await;
    assert!(g2.assigned_campaign_name.is_none());
}

#[tokio::test]
async fn test_malformed_window_is_skipped() {
    let store = setup(&[("g1", &["p1"])]).await;
    let router = router(store.clone(), config());
    let after = campaign(&["g1"], &[JAN, ("lp2", "whenever", "2024-02-29")]);

    router
        .campaigns()
        .on_modify(&campaign(&[], &[]), &after)
        .await
        .unwrap();

    assert_eq!(page_ids(&store.inner).await, pages(&[("p1", JAN_ID)]));
    // the association itself does not depend on the dates
    assert_eq!(
        sort_keys(&store.inner, keys::LANDING_PAGE_LINK_PREFIX).await.len(),
        2
    );
}
