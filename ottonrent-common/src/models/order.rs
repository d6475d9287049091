// File: ottonrent-common/src/models/order.rs

use std::collections::BTreeMap;

use crate::error::ValidationError;

/// order id -> already redeemed
pub type UsedOrderIds = BTreeMap<String, bool>;

/// Order ids are pasted in from payment receipts; surrounding whitespace and
/// empty input are the usual mistakes.
pub fn normalize_order_id(raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ValidationError::MissingField("order_id"));
    }
    if id.contains(['/', '.', '#', '$', '[', ']']) {
        return Err(ValidationError::Invalid {
            field: "order_id",
            reason: format!("'{id}' contains a character not allowed in a key"),
        });
    }
    Ok(id.to_string())
}

/// Refuses an order that was already redeemed.
pub fn ensure_unused(orders: &UsedOrderIds, order_id: &str) -> Result<(), ValidationError> {
    match orders.get(order_id) {
        Some(true) => Err(ValidationError::OrderAlreadyUsed(order_id.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_characters() {
        assert_eq!(normalize_order_id("  ORD-1 "), Ok("ORD-1".to_string()));
        assert!(normalize_order_id("a/b").is_err());
        assert!(normalize_order_id("").is_err());
    }

    #[test]
    fn used_orders_cannot_be_redeemed_twice() {
        let mut orders = UsedOrderIds::new();
        orders.insert("ORD-1".into(), true);
        orders.insert("ORD-2".into(), false);
        assert!(ensure_unused(&orders, "ORD-1").is_err());
        assert!(ensure_unused(&orders, "ORD-2").is_ok());
        assert!(ensure_unused(&orders, "ORD-3").is_ok());
    }
}
