//! Order price computation.

use rust_decimal::Decimal;

/// A cart line being checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine {
    pub goods_id: i64,
    pub product_id: i64,
    pub price: Decimal,
    pub number: i16,
}

/// A group-buy rule applied to the order: `discount` off each unit of
/// `goods_id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrouponDiscount {
    pub goods_id: i64,
    pub discount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// Goods total after group-buy discounts.
    pub goods_price: Decimal,
    pub groupon_price: Decimal,
    pub freight_price: Decimal,
    pub coupon_price: Decimal,
    pub integral_price: Decimal,
    pub order_price: Decimal,
    pub actual_price: Decimal,
}

impl PriceBreakdown {
    /// Compute the price of an order.
    ///
    /// `freight` receives the discounted goods total. Neither the order price
    /// nor the actual price go below zero.
    pub fn compute(
        lines: &[CheckoutLine],
        groupon: Option<GrouponDiscount>,
        coupon_price: Decimal,
        freight: impl FnOnce(Decimal) -> Decimal,
    ) -> Self {
        let mut goods_price = Decimal::ZERO;
        let mut groupon_price = Decimal::ZERO;
        for line in lines {
            let number = Decimal::from(line.number);
            match groupon {
                Some(rule) if rule.goods_id == line.goods_id => {
                    let unit = (line.price - rule.discount).max(Decimal::ZERO);
                    goods_price += unit * number;
                    groupon_price += (line.price - unit) * number;
                }
                _ => goods_price += line.price * number,
            }
        }

        let freight_price = freight(goods_price);
        let integral_price = Decimal::ZERO;
        let order_price = (goods_price + freight_price - coupon_price).max(Decimal::ZERO);
        let actual_price = (order_price - integral_price).max(Decimal::ZERO);

        Self {
            goods_price,
            groupon_price,
            freight_price,
            coupon_price,
            integral_price,
            order_price,
            actual_price,
        }
    }
}

/// Convert a yuan amount to whole cents, as WeChat Pay expects.
///
/// Returns `None` for negative amounts or amounts with sub-cent precision.
pub fn yuan_to_cents(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    let cents = amount * Decimal::ONE_HUNDRED;
    if cents.fract() != Decimal::ZERO {
        return None;
    }
    i64::try_from(cents.trunc()).ok()
}

/// Format a yuan amount with exactly two decimals, as Alipay expects.
pub fn format_yuan(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}
