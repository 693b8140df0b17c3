//! Integration tests for anonymous (device storage) carts and wishlists.

#![allow(clippy::unwrap_used)]

use attar_core::{CartItem, WishlistItem};
use attar_integration_tests::TestContext;
use attar_storefront::notice::NoticeLevel;
use rust_decimal::Decimal;

fn rose() -> CartItem {
    CartItem::new("p1", "Rose", Decimal::from(20))
}

// =============================================================================
// Add / contains
// =============================================================================

#[tokio::test]
async fn test_add_then_contains() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;

    let item = rose().with_size("50ml");
    assert!(ctx.storefront.cart().add(item).await);
    assert!(ctx.storefront.cart().is_in_collection("p1", Some("50ml")));

    let wish = WishlistItem::new("w1", "Oud", Decimal::from(45));
    assert!(ctx.storefront.wishlist().add(wish).await);
    assert!(ctx.storefront.wishlist().is_in_collection("w1", None));
}

#[tokio::test]
async fn test_duplicate_add_keeps_one_entry() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    let cart = ctx.storefront.cart();

    assert!(cart.add(rose()).await);
    assert!(!cart.add(rose()).await);

    let matching = cart.items().iter().filter(|item| item.id == "p1").count();
    assert_eq!(matching, 1);
    let notices = ctx.drain_notices();
    assert_eq!(notices.last().unwrap().level, NoticeLevel::Warning);
}

#[tokio::test]
async fn test_count_scenario() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    let cart = ctx.storefront.cart();

    cart.add(rose()).await;
    assert_eq!(cart.count(), 1);

    cart.add(CartItem::new("p2", "Musk", Decimal::from(15)).with_quantity(2))
        .await;
    assert_eq!(cart.count(), 3);
    assert_eq!(cart.subtotal(), Decimal::from(50));
}

// =============================================================================
// Remove / update / clear
// =============================================================================

#[tokio::test]
async fn test_remove_nonexistent_is_harmless() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    let cart = ctx.storefront.cart();
    cart.add(rose()).await;

    assert!(cart.remove("does-not-exist", None).await);
    assert_eq!(cart.items().len(), 1);
}

#[tokio::test]
async fn test_zero_quantity_is_noop() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    let cart = ctx.storefront.cart();
    cart.add(rose()).await;
    let before = ctx.snapshot("cart").unwrap();

    assert!(!cart.update_quantity("p1", 0).await);
    assert_eq!(cart.count(), 1);
    assert_eq!(ctx.snapshot("cart").unwrap(), before);
}

#[tokio::test]
async fn test_clear_empties_device_snapshot() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    ctx.storefront.cart().add(rose()).await;

    assert!(ctx.storefront.cart().clear().await);
    assert!(ctx.storefront.cart().is_empty());
    assert_eq!(ctx.snapshot("cart").unwrap(), "[]");
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_malformed_snapshot_loads_empty() {
    let ctx = TestContext::new().await;
    ctx.seed("cart", "{ not json");
    ctx.seed("wishlist", r#"[{"id":"w1","name":"Oud","price":45}]"#);

    ctx.storefront.initialize().await;

    assert!(ctx.storefront.cart().is_initialized());
    assert!(ctx.storefront.cart().is_empty());
    assert_eq!(ctx.storefront.wishlist().count(), 1);
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    ctx.storefront.cart().add(rose().with_quantity(2)).await;

    let saved = ctx.snapshot("cart").unwrap();
    let restarted = TestContext::new().await;
    restarted.seed("cart", &saved);
    restarted.storefront.initialize().await;

    assert_eq!(restarted.storefront.cart().count(), 2);
}

#[tokio::test]
async fn test_anonymous_move_asks_for_manual_add() {
    let ctx = TestContext::new().await;
    ctx.storefront.initialize().await;
    ctx.storefront
        .wishlist()
        .add(WishlistItem::new("w1", "Oud", Decimal::from(45)))
        .await;
    ctx.drain_notices();

    assert!(ctx.storefront.move_to_cart("w1").await);
    assert!(ctx.storefront.wishlist().is_empty());
    assert!(ctx.storefront.cart().is_empty());
    assert_eq!(ctx.drain_notices()[0].level, NoticeLevel::Info);
}
