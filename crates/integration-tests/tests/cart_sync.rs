//! Cart synchronization against the fake marketplace backend.
//!
//! Every mutation must be followed by a re-fetch, and a failed call must leave
//! the previous snapshot on screen marked stale.
//!
//! Run with: cargo test -p agromat-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use agromat_core::{PricingPolicy, ProductId, Quantity};
use agromat_integration_tests::FakeMarketplace;
use agromat_storefront::backend::{BackendError, CartApi, UserAuth};
use agromat_storefront::models::{CartSnapshot, NoticeLevel};
use agromat_storefront::services::CartSync;
use rust_decimal::Decimal;

async fn market_with_buyer() -> (FakeMarketplace, UserAuth) {
    let market = FakeMarketplace::spawn().await;
    market.add_product("tomato", "Tomatoes", "5.99", 10);
    market.add_product("spinach", "Spinach", "3.49", 3);
    let buyer = market.register("Ada Obi", "ada@example.com", "harvest123", "buyer");
    let auth = market.auth_for(&buyer);
    (market, auth)
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn count(requests: &[String], prefix: &str) -> usize {
    requests.iter().filter(|r| r.starts_with(prefix)).count()
}

// ============================================================================
// Mutate then re-fetch
// ============================================================================

#[tokio::test]
async fn test_add_refetches_and_prices_the_cart() {
    let (market, auth) = market_with_buyer().await;
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let state = sync
        .add(
            &auth,
            CartSnapshot::default(),
            &ProductId::new("tomato"),
            Quantity::new(2).unwrap(),
        )
        .await;
    let state = sync
        .add(&auth, state.snapshot, &ProductId::new("spinach"), Quantity::new(1).unwrap())
        .await;

    assert!(!state.stale);
    assert_eq!(state.notice.unwrap().level, NoticeLevel::Success);
    assert_eq!(state.snapshot.item_count(), 3);
    assert_eq!(state.totals.subtotal.amount, dec("15.47"));
    assert_eq!(state.totals.tax.amount, dec("1.24"));
    assert_eq!(state.totals.shipping.amount, dec("5.99"));
    assert_eq!(state.totals.total.amount, dec("22.70"));

    let requests = market.requests();
    assert_eq!(count(&requests, "POST /api/cart/add/"), 2);
    assert_eq!(count(&requests, "GET /api/cart"), 2, "one re-fetch per mutation");
}

#[tokio::test]
async fn test_adding_the_same_product_accumulates() {
    let (market, auth) = market_with_buyer().await;
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);
    let tomato = ProductId::new("tomato");

    let state = sync
        .add(&auth, CartSnapshot::default(), &tomato, Quantity::new(2).unwrap())
        .await;
    let state = sync
        .add(&auth, state.snapshot, &tomato, Quantity::new(3).unwrap())
        .await;

    assert_eq!(state.snapshot.lines.len(), 1);
    assert_eq!(state.snapshot.quantity_of(&tomato), Some(5));
    assert_eq!(market.cart_of(&auth.user_id), vec![("tomato".to_string(), 5)]);
}

#[tokio::test]
async fn test_set_quantity_and_remove() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 1);
    market.put_in_cart(&auth.user_id, "spinach", 1);
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let loaded = sync.load(&auth, CartSnapshot::default()).await;
    assert_eq!(loaded.snapshot.item_count(), 2);

    let state = sync
        .set_quantity(&auth, loaded.snapshot, &ProductId::new("tomato"), 4)
        .await;
    assert!(!state.stale);
    assert_eq!(state.snapshot.quantity_of(&ProductId::new("tomato")), Some(4));

    let state = sync
        .remove(&auth, state.snapshot, &ProductId::new("spinach"))
        .await;
    assert_eq!(state.snapshot.lines.len(), 1);
    assert_eq!(state.snapshot.lines[0].name, "Tomatoes");
    assert!(
        market
            .requests()
            .iter()
            .any(|r| r == "PUT /api/cart/update/user-1/tomato/4")
    );
}

#[tokio::test]
async fn test_quantity_below_one_never_reaches_the_backend() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 2);
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let loaded = sync.load(&auth, CartSnapshot::default()).await;
    let state = sync
        .set_quantity(&auth, loaded.snapshot.clone(), &ProductId::new("tomato"), 0)
        .await;

    assert_eq!(state.snapshot, loaded.snapshot);
    assert_eq!(state.notice.unwrap().level, NoticeLevel::Info);
    assert_eq!(count(&market.requests(), "PUT "), 0);
    assert_eq!(market.cart_of(&auth.user_id), vec![("tomato".to_string(), 2)]);
}

#[tokio::test]
async fn test_clear_empties_the_cart() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 2);
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let loaded = sync.load(&auth, CartSnapshot::default()).await;
    let state = sync.clear(&auth, loaded.snapshot).await;

    assert!(state.snapshot.is_empty());
    assert!(state.totals.subtotal.is_zero());
    assert!(market.cart_of(&auth.user_id).is_empty());
}

// ============================================================================
// Failures keep the last known cart
// ============================================================================

#[tokio::test]
async fn test_rejected_add_keeps_previous_snapshot_with_backend_message() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "spinach", 2);
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let loaded = sync.load(&auth, CartSnapshot::default()).await;
    let state = sync
        .add(
            &auth,
            loaded.snapshot.clone(),
            &ProductId::new("spinach"),
            Quantity::new(2).unwrap(),
        )
        .await;

    assert!(state.stale);
    assert_eq!(state.snapshot, loaded.snapshot);
    let notice = state.notice.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Insufficient stock");
}

#[tokio::test]
async fn test_backend_outage_uses_generic_message_and_skips_refetch() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 1);
    let client = market.client();
    let pricing = PricingPolicy::default();
    let sync = CartSync::new(&client, &pricing);

    let loaded = sync.load(&auth, CartSnapshot::default()).await;
    let fetches_before = count(&market.requests(), "GET /api/cart");

    market.fail_cart_mutations(true);
    let state = sync
        .remove(&auth, loaded.snapshot.clone(), &ProductId::new("tomato"))
        .await;

    assert!(state.stale);
    assert_eq!(state.snapshot, loaded.snapshot);
    assert_eq!(state.notice.unwrap().message, "We couldn't remove that item.");
    assert_eq!(count(&market.requests(), "GET /api/cart"), fetches_before);
    assert_eq!(market.cart_of(&auth.user_id).len(), 1);
}

#[tokio::test]
async fn test_deleted_product_drops_out_of_the_snapshot() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 1);
    market.put_in_cart(&auth.user_id, "spinach", 1);
    market.remove_product("spinach");
    let client = market.client();
    let pricing = PricingPolicy::default();

    let state = CartSync::new(&client, &pricing)
        .load(&auth, CartSnapshot::default())
        .await;

    assert_eq!(state.snapshot.lines.len(), 1);
    assert_eq!(state.totals.subtotal.amount, dec("5.99"));
}

// ============================================================================
// Client
// ============================================================================

#[tokio::test]
async fn test_wrong_token_is_unauthorized() {
    let (market, auth) = market_with_buyer().await;
    let intruder = market.register("Eve", "eve@example.com", "password1", "buyer");
    let forged = UserAuth {
        user_id: auth.user_id.clone(),
        token: market.auth_for(&intruder).token,
    };

    let err = market.client().fetch_cart(&forged).await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized));
}

#[tokio::test]
async fn test_server_cart_total_matches_subtotal() {
    let (market, auth) = market_with_buyer().await;
    market.put_in_cart(&auth.user_id, "tomato", 2);
    market.put_in_cart(&auth.user_id, "spinach", 1);

    let total = market.client().cart_total(&auth).await.unwrap();
    assert_eq!(total, dec("15.47"));
}

#[tokio::test]
async fn test_product_listing_is_cached_until_invalidated() {
    let (market, _auth) = market_with_buyer().await;
    let client = market.client();

    assert_eq!(client.products().await.unwrap().len(), 2);
    market.add_product("okra", "Okra", "2.50", 8);
    assert_eq!(client.products().await.unwrap().len(), 2, "served from cache");

    client.invalidate_catalog();
    assert_eq!(client.products().await.unwrap().len(), 3);
    assert_eq!(count(&market.requests(), "GET /api/products"), 2);
}
