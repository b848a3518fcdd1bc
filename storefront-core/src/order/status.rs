//! The order status machine.

use storefront_sdk::objects::HandleOption;

/// Persisted order status, stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum OrderStatus {
    Create = 101,
    Cancel = 102,
    AutoCancel = 103,
    AdminCancel = 104,
    Pay = 201,
    Refund = 202,
    RefundConfirm = 203,
    GrouponTimeout = 204,
    Ship = 301,
    Confirm = 401,
    AutoConfirm = 402,
}

impl OrderStatus {
    #[cfg(test)]
    const ALL: [OrderStatus; 11] = [
        OrderStatus::Create,
        OrderStatus::Cancel,
        OrderStatus::AutoCancel,
        OrderStatus::AdminCancel,
        OrderStatus::Pay,
        OrderStatus::Refund,
        OrderStatus::RefundConfirm,
        OrderStatus::GrouponTimeout,
        OrderStatus::Ship,
        OrderStatus::Confirm,
        OrderStatus::AutoConfirm,
    ];

    pub fn code(self) -> i16 {
        self as i16
    }

    /// Text shown to the user.
    pub fn text(self) -> &'static str {
        match self {
            OrderStatus::Create => "unpaid",
            OrderStatus::Cancel => "cancelled",
            OrderStatus::AutoCancel => "cancelled (timeout)",
            OrderStatus::AdminCancel => "cancelled (by admin)",
            OrderStatus::Pay => "paid",
            OrderStatus::Refund => "cancelled, refund pending",
            OrderStatus::RefundConfirm => "refunded",
            OrderStatus::GrouponTimeout => "group-buy timed out",
            OrderStatus::Ship => "shipped",
            OrderStatus::Confirm => "received",
            OrderStatus::AutoConfirm => "received (auto)",
        }
    }

    /// Actions available to the user in this status.
    pub fn handle_option(self) -> HandleOption {
        let mut option = HandleOption::default();
        match self {
            OrderStatus::Create => {
                option.cancel = true;
                option.pay = true;
            }
            OrderStatus::Cancel
            | OrderStatus::AutoCancel
            | OrderStatus::AdminCancel
            | OrderStatus::RefundConfirm => {
                option.delete = true;
            }
            OrderStatus::Pay => {
                option.refund = true;
            }
            OrderStatus::Refund | OrderStatus::GrouponTimeout => {}
            OrderStatus::Ship => {
                option.confirm = true;
            }
            OrderStatus::Confirm | OrderStatus::AutoConfirm => {
                option.delete = true;
                option.comment = true;
                option.rebuy = true;
                option.aftersale = true;
            }
        }
        option
    }

    /// Whether a payment has been recorded for an order in this status.
    pub fn has_paid(self) -> bool {
        !matches!(
            self,
            OrderStatus::Create
                | OrderStatus::Cancel
                | OrderStatus::AutoCancel
                | OrderStatus::AdminCancel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes: std::collections::HashSet<i16> =
            OrderStatus::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), OrderStatus::ALL.len());
        assert_eq!(OrderStatus::Create.code(), 101);
        assert_eq!(OrderStatus::AutoConfirm.code(), 402);
    }

    #[test]
    fn test_unpaid_order_can_cancel_and_pay() {
        let option = OrderStatus::Create.handle_option();
        assert!(option.cancel && option.pay);
        assert!(!option.refund && !option.delete && !option.confirm);
    }

    #[test]
    fn test_only_paid_order_can_refund() {
        for status in OrderStatus::ALL {
            assert_eq!(status.handle_option().refund, status == OrderStatus::Pay);
        }
    }

    #[test]
    fn test_only_shipped_order_can_confirm() {
        for status in OrderStatus::ALL {
            assert_eq!(status.handle_option().confirm, status == OrderStatus::Ship);
        }
    }

    #[test]
    fn test_refund_in_progress_allows_nothing() {
        assert_eq!(OrderStatus::Refund.handle_option(), HandleOption::default());
        assert_eq!(
            OrderStatus::GrouponTimeout.handle_option(),
            HandleOption::default()
        );
    }

    #[test]
    fn test_received_order_options() {
        let option = OrderStatus::AutoConfirm.handle_option();
        assert!(option.delete && option.comment && option.rebuy && option.aftersale);
        assert!(!option.pay);
    }

    #[test]
    fn test_has_paid() {
        assert!(!OrderStatus::Create.has_paid());
        assert!(!OrderStatus::AutoCancel.has_paid());
        assert!(OrderStatus::Pay.has_paid());
        assert!(OrderStatus::Ship.has_paid());
        assert!(OrderStatus::Refund.has_paid());
    }
}
