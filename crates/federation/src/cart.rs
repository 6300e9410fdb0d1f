use std::{fmt, sync::Arc};

use shared::domain::CartItem;

/// Read-only view of the cart handed down to remotes.
pub type CartSnapshot = Arc<[CartItem]>;

/// Ordered, append/filter-only cart sequence.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: CartItem) {
        self.items.push(item);
    }

    /// Drops the item at `index`, keeping the order of the rest.
    ///
    /// Stale indices from a re-render race land here, so out-of-range is a
    /// no-op that returns `false`.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        true
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> u64 {
        total_of(&self.items)
    }

    pub fn snapshot(&self) -> CartSnapshot {
        Arc::from(self.items.as_slice())
    }
}

pub fn total_of(items: &[CartItem]) -> u64 {
    items.iter().map(|item| item.price).sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub index: usize,
    pub name: String,
    pub category: String,
    pub price: u64,
}

/// What the cart view shows: lines plus the derived order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub subtotal: u64,
    pub total: u64,
}

impl CartSummary {
    pub fn from_items(items: &[CartItem]) -> Self {
        let lines = items
            .iter()
            .enumerate()
            .map(|(index, item)| CartLine {
                index,
                name: item.name.clone(),
                category: item
                    .category
                    .clone()
                    .unwrap_or_else(|| "Product".to_string()),
                price: item.price,
            })
            .collect();
        let subtotal = total_of(items);
        Self {
            lines,
            subtotal,
            total: subtotal,
        }
    }

    pub fn count_label(&self) -> String {
        let noun = if self.lines.len() == 1 { "item" } else { "items" };
        format!("{} {noun} in your cart", self.lines.len())
    }
}

impl fmt::Display for CartSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shopping Cart")?;
        writeln!(f, "{}", self.count_label())?;
        if self.lines.is_empty() {
            return writeln!(f, "Your cart is empty");
        }
        for line in &self.lines {
            writeln!(
                f,
                "  [{}] {} ({}) {}",
                line.index,
                line.name,
                line.category,
                format_price(line.price)
            )?;
        }
        writeln!(f, "Subtotal {}", format_price(self.subtotal))?;
        writeln!(f, "Total {}", format_price(self.total))
    }
}

/// `$1,795` style formatting.
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
