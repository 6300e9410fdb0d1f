use super::*;

fn item(id: i64, name: &str, price: u64) -> CartItem {
    CartItem::new(id, name, price)
}

#[test]
fn add_then_remove_tracks_total() {
    let mut cart = CartStore::new();
    cart.add(item(1, "A", 10));
    cart.add(item(2, "B", 20));
    assert_eq!(cart.total(), 30);

    assert!(cart.remove(0));
    assert_eq!(cart.items(), &[item(2, "B", 20)]);
    assert_eq!(cart.total(), 20);

    assert!(!cart.remove(5));
    assert_eq!(cart.items(), &[item(2, "B", 20)]);
    assert_eq!(cart.total(), 20);
}

#[test]
fn remove_keeps_relative_order_and_matches_remaining_sum() {
    let prices = [398, 115, 799, 99, 1795, 280];
    for victim in 0..prices.len() {
        let mut cart = CartStore::new();
        for (i, price) in prices.iter().enumerate() {
            cart.add(item(i as i64, "x", *price));
        }

        assert!(cart.remove(victim));

        let expected: Vec<i64> = (0..prices.len() as i64)
            .filter(|id| *id != victim as i64)
            .collect();
        let ids: Vec<i64> = cart.items().iter().map(|item| item.id.0).collect();
        assert_eq!(ids, expected);

        let expected_total: u64 = prices
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != victim)
            .map(|(_, price)| *price)
            .sum();
        assert_eq!(cart.total(), expected_total);
    }
}

#[test]
fn remove_on_empty_cart_is_a_no_op() {
    let mut cart = CartStore::new();
    assert!(!cart.remove(0));
    assert!(cart.is_empty());
    assert_eq!(cart.total(), 0);
}

#[test]
fn duplicate_items_are_kept_as_separate_lines() {
    let mut cart = CartStore::new();
    cart.add(item(1, "A", 10));
    cart.add(item(1, "A", 10));
    assert_eq!(cart.len(), 2);

    assert!(cart.remove(1));
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.total(), 10);
}

#[test]
fn snapshot_is_detached_from_later_mutation() {
    let mut cart = CartStore::new();
    cart.add(item(1, "A", 10));
    let snapshot = cart.snapshot();
    cart.add(item(2, "B", 20));

    assert_eq!(snapshot.len(), 1);
    assert_eq!(cart.len(), 2);
}

#[test]
fn summary_defaults_category_and_pluralizes() {
    let one = CartSummary::from_items(&[item(1, "A", 10)]);
    assert_eq!(one.count_label(), "1 item in your cart");
    assert_eq!(one.lines[0].category, "Product");

    let two = CartSummary::from_items(&[
        item(1, "A", 10),
        item(2, "B", 1795).with_category("Furniture"),
    ]);
    assert_eq!(two.count_label(), "2 items in your cart");
    assert_eq!(two.lines[1].category, "Furniture");
    assert_eq!(two.total, 1805);
}

#[test]
fn empty_summary_renders_empty_message() {
    let rendered = CartSummary::from_items(&[]).to_string();
    assert!(rendered.contains("0 items in your cart"));
    assert!(rendered.contains("Your cart is empty"));
}

#[test]
fn formats_prices_with_thousands_separators() {
    assert_eq!(format_price(0), "$0");
    assert_eq!(format_price(999), "$999");
    assert_eq!(format_price(1795), "$1,795");
    assert_eq!(format_price(1_234_567), "$1,234,567");
}
