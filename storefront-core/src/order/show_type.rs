//! Mapping from the list tab (`showType`) to persisted statuses.

use super::OrderStatus;

/// Statuses listed under a show type. An empty slice means "all orders";
/// `None` means the show type is unknown.
pub fn statuses_for_show_type(show_type: i64) -> Option<&'static [OrderStatus]> {
    const ALL: &[OrderStatus] = &[];
    const WAIT_PAY: &[OrderStatus] = &[OrderStatus::Create];
    const WAIT_DELIVERY: &[OrderStatus] = &[OrderStatus::Pay];
    const WAIT_RECEIPT: &[OrderStatus] = &[OrderStatus::Ship];
    const WAIT_COMMENT: &[OrderStatus] = &[OrderStatus::Confirm, OrderStatus::AutoConfirm];

    match show_type {
        0 => Some(ALL),
        1 => Some(WAIT_PAY),
        2 => Some(WAIT_DELIVERY),
        3 => Some(WAIT_RECEIPT),
        4 => Some(WAIT_COMMENT),
        _ => None,
    }
}
