//! Order services: reads, submission, user actions, payment and timeouts.

use std::collections::HashSet;

use itertools::Itertools;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use storefront_sdk::objects::{
    ListOrdersQuery, OrderDetail, OrderGoodsItem, OrderInfo, OrderListGoods, OrderListItem,
    Paginated, ResponseCode, SubmitOrder, SubmitResult, clamp_pagination, page_offset,
};
use tracing::{info, warn};
use url::Url;

use super::error::{ServiceError, ServiceResult};
use super::groupon::{GrouponLink, check_participation, on_order_paid_tx};
use crate::config::MallConfig;
use crate::entities::address::Address;
use crate::entities::cart::Cart;
use crate::entities::coupon::UsableCoupon;
use crate::entities::groupon::{Groupon, GrouponInsert, GrouponRule, GetGrouponOrderIds};
use crate::entities::order::{GetUserOrder, ListUserOrders, Order, OrderInsert, OrderPage};
use crate::entities::order_goods::{
    GetOrderGoods, GetOrderGoodsByOrderIds, OrderGoods, OrderGoodsInsert,
};
use crate::entities::product::GoodsProduct;
use crate::events::{EventSenders, OrderEvent};
use crate::framework::{DatabaseProcessor, Tx, now_utc};
use crate::order::{
    CheckoutLine, GrouponDiscount, OrderStatus, PriceBreakdown, generate_order_sn,
    statuses_for_show_type,
};
use crate::payment::{AlipayGateway, PaidNotice, PayOrder, WechatGateway};

const MAX_SN_ATTEMPTS: usize = 10;

/// Result of reconciling a payment notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order moved to paid.
    Paid { order_id: i64 },
    /// The order had already been paid; nothing changed.
    AlreadyPaid { order_id: i64 },
}

#[derive(Clone)]
pub struct OrderServices {
    db: DatabaseProcessor,
    events: EventSenders,
}

impl OrderServices {
    pub fn new(db: DatabaseProcessor, events: EventSenders) -> Self {
        Self { db, events }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn detail(&self, user_id: i64, order_id: i64) -> ServiceResult<OrderDetail> {
        let order = self
            .db
            .process(GetUserOrder { user_id, order_id })
            .await?
            .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;
        let goods = self.db.process(GetOrderGoods { order_id }).await?;

        Ok(OrderDetail {
            order_info: cover_order(&order),
            order_goods: goods.iter().map(cover_order_goods).collect(),
        })
    }

    pub async fn list(
        &self,
        user_id: i64,
        query: ListOrdersQuery,
    ) -> ServiceResult<Paginated<OrderListItem>> {
        let statuses = statuses_for_show_type(query.show_type)
            .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;
        let (page, limit) = clamp_pagination(query.page, query.limit);
        let offset = page_offset(page, limit)
            .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;

        let OrderPage { orders, total } = self
            .db
            .process(ListUserOrders {
                user_id,
                statuses: statuses.to_vec(),
                offset,
                limit,
                sort: query.sort,
                direction: query.order,
            })
            .await?;
        if orders.is_empty() {
            return Ok(Paginated::new(Vec::new(), total, page, limit));
        }

        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let groupon_orders: HashSet<i64> = self
            .db
            .process(GetGrouponOrderIds {
                order_ids: order_ids.clone(),
            })
            .await?
            .into_iter()
            .collect();
        let mut goods_by_order = self
            .db
            .process(GetOrderGoodsByOrderIds { order_ids })
            .await?
            .into_iter()
            .into_group_map_by(|g| g.order_id);

        let list = orders
            .iter()
            .map(|order| {
                cover_list_item(
                    order,
                    groupon_orders.contains(&order.id),
                    goods_by_order.remove(&order.id).unwrap_or_default(),
                )
            })
            .collect();
        Ok(Paginated::new(list, total, page, limit))
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Create an order from the user's cart.
    #[tracing::instrument(skip(self, submit, mall))]
    pub async fn submit(
        &self,
        user_id: i64,
        submit: &SubmitOrder,
        mall: &MallConfig,
    ) -> ServiceResult<SubmitResult> {
        let mut tx = self.db.pool.begin().await?;
        let now = now_utc();

        let groupon_rule = if submit.groupon_rules_id > 0 {
            let rule = GrouponRule::get_tx(&mut tx, submit.groupon_rules_id)
                .await?
                .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;
            let link = if submit.groupon_link_id > 0 {
                let link = GrouponLink::load_tx(&mut tx, submit.groupon_link_id, user_id)
                    .await?
                    .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;
                Some(link)
            } else {
                None
            };
            check_participation(&rule, link.as_ref(), user_id, now)?;
            Some((rule, link))
        } else {
            None
        };

        let address = Address::get_for_user_tx(&mut tx, user_id, submit.address_id)
            .await?
            .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;

        let carts = if submit.cart_id == 0 {
            Cart::checked_for_user_tx(&mut tx, user_id).await?
        } else {
            Cart::get_for_user_tx(&mut tx, user_id, submit.cart_id)
                .await?
                .into_iter()
                .collect()
        };
        if carts.is_empty() {
            return Err(ServiceError::business(ResponseCode::ParamValueIllegal));
        }

        let lines: Vec<CheckoutLine> = carts
            .iter()
            .map(|c| CheckoutLine {
                goods_id: c.goods_id,
                product_id: c.product_id,
                price: c.price,
                number: c.number,
            })
            .collect();
        let discount = groupon_rule.as_ref().map(|(rule, _)| GrouponDiscount {
            goods_id: rule.goods_id,
            discount: rule.discount,
        });
        let goods_total =
            PriceBreakdown::compute(&lines, discount, Decimal::ZERO, |_| Decimal::ZERO).goods_price;

        let coupon = if submit.coupon_id > 0 {
            let coupon = UsableCoupon::find_tx(
                &mut tx,
                user_id,
                submit.coupon_id,
                submit.user_coupon_id,
            )
            .await?
            .filter(|c| c.applies_to(goods_total))
            .ok_or_else(|| ServiceError::business(ResponseCode::CouponUnavailable))?;
            Some(coupon)
        } else {
            None
        };
        let coupon_price = coupon.as_ref().map(|c| c.discount).unwrap_or_default();
        let price = PriceBreakdown::compute(&lines, discount, coupon_price, |total| {
            mall.freight_for(total)
        });

        let order_sn = unique_order_sn(&mut tx, now.date()).await?;
        let order_id = Order::insert_tx(
            &mut tx,
            &OrderInsert {
                user_id,
                order_sn,
                consignee: address.name.clone(),
                mobile: address.tel.clone(),
                address: address.full_address(),
                message: submit.message.clone(),
                goods_price: price.goods_price,
                freight_price: price.freight_price,
                coupon_price: price.coupon_price,
                integral_price: price.integral_price,
                groupon_price: price.groupon_price,
                order_price: price.order_price,
                actual_price: price.actual_price,
            },
        )
        .await?;

        let goods: Vec<OrderGoodsInsert> = carts
            .iter()
            .map(|c| OrderGoodsInsert {
                goods_id: c.goods_id,
                goods_name: c.goods_name.clone(),
                goods_sn: c.goods_sn.clone(),
                product_id: c.product_id,
                number: c.number,
                price: c.price,
                specifications: c.specifications.clone(),
                pic_url: c.pic_url.clone(),
            })
            .collect();
        OrderGoods::insert_many_tx(&mut tx, order_id, &goods).await?;

        let cart_ids: Vec<i64> = carts.iter().map(|c| c.id).collect();
        Cart::delete_many_tx(&mut tx, user_id, &cart_ids).await?;

        for cart in &carts {
            if GoodsProduct::reduce_stock_tx(&mut tx, cart.product_id, cart.number).await? == 0 {
                return Err(ServiceError::business_with(
                    ResponseCode::GoodsNoStock,
                    format!("insufficient stock: {}", cart.goods_name),
                ));
            }
        }

        if let Some(coupon) = &coupon {
            if UsableCoupon::mark_used_tx(&mut tx, coupon.user_coupon_id, order_id).await? == 0 {
                return Err(ServiceError::business(ResponseCode::CouponUnavailable));
            }
        }

        let groupon_link_id = match &groupon_rule {
            Some((rule, link)) => {
                let (groupon_id, creator_user_id) = match link {
                    Some(link) => (link.link_id, link.creator_user_id),
                    None => (0, user_id),
                };
                let record_id = Groupon::insert_tx(
                    &mut tx,
                    &GrouponInsert {
                        order_id,
                        groupon_id,
                        rules_id: rule.id,
                        user_id,
                        creator_user_id,
                    },
                )
                .await?;
                if groupon_id == 0 { record_id } else { groupon_id }
            }
            None => 0,
        };

        tx.commit().await?;
        info!(order_id, actual_price = %price.actual_price, "Order submitted");

        Ok(SubmitResult {
            order_id,
            groupon_link_id,
        })
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Cancel an unpaid order, returning its stock and coupon.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: i64, order_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.pool.begin().await?;
        let order = lock_user_order(&mut tx, user_id, order_id).await?;
        if !order.order_status.handle_option().cancel {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalidOperation,
                "order cannot be cancelled",
            ));
        }
        release_order_tx(&mut tx, &order, OrderStatus::Cancel).await?;
        tx.commit().await?;
        info!(order_id, "Order cancelled by user");
        Ok(())
    }

    /// Ask for a refund of a paid order.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, user_id: i64, order_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.pool.begin().await?;
        let order = lock_user_order(&mut tx, user_id, order_id).await?;
        if !order.order_status.handle_option().refund {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalidOperation,
                "order cannot be refunded",
            ));
        }
        transition(&mut tx, order.id, order.order_status, OrderStatus::Refund).await?;
        tx.commit().await?;

        info!(order_id, "Refund requested");
        self.events
            .emit(OrderEvent::RefundRequested { order_id })
            .await;
        Ok(())
    }

    /// Confirm receipt of a shipped order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, user_id: i64, order_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.pool.begin().await?;
        let order = lock_user_order(&mut tx, user_id, order_id).await?;
        if !order.order_status.handle_option().confirm {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalidOperation,
                "order cannot be confirmed",
            ));
        }
        confirm_tx(&mut tx, order.id, OrderStatus::Confirm).await?;
        tx.commit().await?;
        info!(order_id, "Order confirmed by user");
        Ok(())
    }

    /// Hide a finished order from the user.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: i64, order_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.pool.begin().await?;
        let order = lock_user_order(&mut tx, user_id, order_id).await?;
        if !order.order_status.handle_option().delete {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalidOperation,
                "order cannot be deleted",
            ));
        }
        if Order::soft_delete_tx(&mut tx, order.id).await? == 0 {
            return Err(ServiceError::business(ResponseCode::UpdatedDataFailed));
        }
        OrderGoods::soft_delete_for_order_tx(&mut tx, order.id).await?;
        tx.commit().await?;
        info!(order_id, "Order deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Payment
    // -----------------------------------------------------------------------

    /// The payable amount of an unpaid order.
    pub async fn pay_order(&self, user_id: i64, order_id: i64) -> ServiceResult<PayOrder> {
        let order = self
            .db
            .process(GetUserOrder { user_id, order_id })
            .await?
            .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))?;
        if !order.order_status.handle_option().pay {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalidOperation,
                "order cannot be paid",
            ));
        }
        Ok(PayOrder::new(order.order_sn, order.actual_price))
    }

    /// Start a WeChat mobile-web payment and return the checkout page.
    pub async fn wechat_h5_pay(
        &self,
        user_id: i64,
        order_id: i64,
        gateway: &WechatGateway,
    ) -> ServiceResult<Url> {
        let pay_order = self.pay_order(user_id, order_id).await?;
        gateway.create_wap_payment(&pay_order).await.map_err(|e| {
            warn!(order_id, error = %e, "WeChat payment could not be created");
            ServiceError::business(ResponseCode::OrderPayFail)
        })
    }

    /// Build the Alipay mobile-web checkout URL of an order.
    pub async fn alipay_h5_pay(
        &self,
        user_id: i64,
        order_id: i64,
        gateway: &AlipayGateway,
    ) -> ServiceResult<Url> {
        let pay_order = self.pay_order(user_id, order_id).await?;
        gateway
            .wap_pay_url(&pay_order, time::OffsetDateTime::now_utc())
            .map_err(|e| {
                warn!(order_id, error = %e, "Alipay payment could not be created");
                ServiceError::business(ResponseCode::OrderPayFail)
            })
    }

    /// Verify and reconcile a WeChat payment notification.
    pub async fn wechat_notify(
        &self,
        body: &str,
        gateway: &WechatGateway,
    ) -> ServiceResult<PaymentOutcome> {
        let notice = gateway.parse_notify(body)?;
        info!(order_sn = %notice.order_sn, pay_id = %notice.pay_id, amount = %notice.amount, "WeChat payment notification");
        self.pay_success(&notice).await
    }

    /// Verify and reconcile an Alipay payment notification.
    pub async fn alipay_notify(
        &self,
        params: &std::collections::BTreeMap<String, String>,
        gateway: &AlipayGateway,
    ) -> ServiceResult<PaymentOutcome> {
        let notice = gateway.parse_notify(params)?;
        info!(order_sn = %notice.order_sn, pay_id = %notice.pay_id, amount = %notice.amount, "Alipay payment notification");
        self.pay_success(&notice).await
    }

    /// Mark the order of a verified notification as paid.
    #[tracing::instrument(skip_all, fields(order_sn = %notice.order_sn))]
    pub async fn pay_success(&self, notice: &PaidNotice) -> ServiceResult<PaymentOutcome> {
        let mut tx = self.db.pool.begin().await?;
        let order = Order::lock_by_sn_tx(&mut tx, &notice.order_sn)
            .await?
            .ok_or_else(|| ServiceError::business(ResponseCode::OrderUnknown))?;

        if order.order_status.has_paid() {
            info!(order_id = order.id, "Order already paid");
            return Ok(PaymentOutcome::AlreadyPaid { order_id: order.id });
        }
        if order.order_status != OrderStatus::Create {
            return Err(ServiceError::business_with(
                ResponseCode::OrderInvalid,
                format!("order {} is no longer payable", order.order_sn),
            ));
        }
        if notice.amount != order.actual_price {
            return Err(ServiceError::business_with(
                ResponseCode::OrderPayFail,
                format!(
                    "paid amount {} does not match order amount {}",
                    notice.amount, order.actual_price
                ),
            ));
        }

        if Order::mark_paid_tx(&mut tx, order.id, &notice.pay_id).await? == 0 {
            return Err(ServiceError::business(ResponseCode::UpdatedDataFailed));
        }
        on_order_paid_tx(&mut tx, order.id).await?;
        tx.commit().await?;

        info!(order_id = order.id, pay_id = %notice.pay_id, "Order paid");
        self.events
            .emit(OrderEvent::Paid { order_id: order.id })
            .await;
        Ok(PaymentOutcome::Paid { order_id: order.id })
    }

    // -----------------------------------------------------------------------
    // Timeouts
    // -----------------------------------------------------------------------

    /// Cancel an order that was not paid in time. Returns `false` if the
    /// order is no longer unpaid.
    pub async fn cancel_unpaid(&self, order_id: i64) -> ServiceResult<bool> {
        let mut tx = self.db.pool.begin().await?;
        let Some(order) = Order::lock_by_id_tx(&mut tx, order_id).await? else {
            return Ok(false);
        };
        if order.order_status != OrderStatus::Create {
            return Ok(false);
        }
        release_order_tx(&mut tx, &order, OrderStatus::AutoCancel).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Confirm a shipped order the user never confirmed. Returns `false` if
    /// the order is no longer shipped.
    pub async fn confirm_unreceived(&self, order_id: i64) -> ServiceResult<bool> {
        let mut tx = self.db.pool.begin().await?;
        let Some(order) = Order::lock_by_id_tx(&mut tx, order_id).await? else {
            return Ok(false);
        };
        if order.order_status != OrderStatus::Ship {
            return Ok(false);
        }
        confirm_tx(&mut tx, order.id, OrderStatus::AutoConfirm).await?;
        tx.commit().await?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

async fn lock_user_order(tx: &mut Tx<'_>, user_id: i64, order_id: i64) -> ServiceResult<Order> {
    Order::lock_user_order_tx(tx, user_id, order_id)
        .await?
        .ok_or_else(|| ServiceError::business(ResponseCode::ParamValueIllegal))
}

async fn transition(
    tx: &mut Tx<'_>,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> ServiceResult<()> {
    if Order::transition_tx(tx, order_id, from, to).await? == 0 {
        return Err(ServiceError::business(ResponseCode::UpdatedDataFailed));
    }
    Ok(())
}

async fn confirm_tx(tx: &mut Tx<'_>, order_id: i64, to: OrderStatus) -> ServiceResult<()> {
    let goods = OrderGoods::list_for_order_tx(tx, order_id).await?;
    let comments = i16::try_from(goods.len()).unwrap_or(i16::MAX);
    if Order::confirm_tx(tx, order_id, to, comments).await? == 0 {
        return Err(ServiceError::business(ResponseCode::UpdatedDataFailed));
    }
    Ok(())
}

/// Cancel an unpaid order: put its goods back in stock and free its coupon.
async fn release_order_tx(tx: &mut Tx<'_>, order: &Order, to: OrderStatus) -> ServiceResult<()> {
    transition(tx, order.id, order.order_status, to).await?;
    for goods in OrderGoods::list_for_order_tx(tx, order.id).await? {
        GoodsProduct::add_stock_tx(tx, goods.product_id, goods.number).await?;
    }
    UsableCoupon::release_for_order_tx(tx, order.id).await?;
    Ok(())
}

async fn unique_order_sn(tx: &mut Tx<'_>, date: time::Date) -> ServiceResult<String> {
    for _ in 0..MAX_SN_ATTEMPTS {
        let order_sn = generate_order_sn(date, &mut rand::rng());
        if !Order::sn_exists_tx(tx, &order_sn).await? {
            return Ok(order_sn);
        }
    }
    Err(ServiceError::business_with(
        ResponseCode::SystemError,
        "could not allocate an order number",
    ))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn unix(at: time::PrimitiveDateTime) -> i64 {
    at.assume_utc().unix_timestamp()
}

pub fn cover_order(order: &Order) -> OrderInfo {
    OrderInfo {
        id: order.id,
        order_sn: order.order_sn.clone(),
        message: order.message.clone(),
        add_time: unix(order.add_time),
        consignee: order.consignee.clone(),
        mobile: order.mobile.clone(),
        address: order.address.clone(),
        goods_price: order.goods_price,
        freight_price: order.freight_price,
        coupon_price: order.coupon_price,
        groupon_price: order.groupon_price,
        actual_price: order.actual_price,
        order_status: order.order_status.code(),
        order_status_text: order.order_status.text().to_string(),
        handle_option: order.order_status.handle_option(),
        ship_channel: order.ship_channel.clone(),
        ship_sn: order.ship_sn.clone(),
        pay_time: order.pay_time.map(unix),
    }
}

pub fn cover_order_goods(goods: &OrderGoods) -> OrderGoodsItem {
    OrderGoodsItem {
        id: goods.id,
        order_id: goods.order_id,
        goods_id: goods.goods_id,
        goods_name: goods.goods_name.clone(),
        goods_sn: goods.goods_sn.clone(),
        product_id: goods.product_id,
        number: goods.number,
        price: goods.price,
        specifications: goods.specifications.clone(),
        pic_url: goods.pic_url.clone(),
    }
}

pub fn cover_list_item(order: &Order, is_groupon: bool, goods: Vec<OrderGoods>) -> OrderListItem {
    OrderListItem {
        id: order.id,
        order_sn: order.order_sn.clone(),
        actual_price: order.actual_price,
        order_status: order.order_status.code(),
        order_status_text: order.order_status.text().to_string(),
        handle_option: order.order_status.handle_option(),
        is_groupin: is_groupon,
        goods_list: goods
            .into_iter()
            .map(|g| OrderListGoods {
                id: g.id,
                goods_name: g.goods_name,
                number: g.number,
                pic_url: g.pic_url,
                specifications: g.specifications,
                price: g.price,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 1,
            user_id: 2,
            order_sn: "20240307000001".to_string(),
            order_status: status,
            consignee: "Han Meimei".to_string(),
            mobile: "13900000000".to_string(),
            address: "Beijing 1 Main St".to_string(),
            message: String::new(),
            goods_price: Decimal::new(100, 0),
            freight_price: Decimal::ZERO,
            coupon_price: Decimal::new(10, 0),
            integral_price: Decimal::ZERO,
            groupon_price: Decimal::ZERO,
            order_price: Decimal::new(90, 0),
            actual_price: Decimal::new(90, 0),
            pay_id: None,
            pay_time: None,
            ship_sn: None,
            ship_channel: None,
            ship_time: None,
            refund_amount: None,
            refund_time: None,
            confirm_time: None,
            comments: 0,
            end_time: None,
            add_time: datetime!(2024-03-07 00:00),
            update_time: datetime!(2024-03-07 00:00),
        }
    }

    fn goods(id: i64) -> OrderGoods {
        OrderGoods {
            id,
            order_id: 1,
            goods_id: 10,
            goods_name: "Tea".to_string(),
            goods_sn: "T-1".to_string(),
            product_id: 100,
            number: 2,
            price: Decimal::new(50, 0),
            specifications: vec!["500g".to_string()],
            pic_url: "https://img.example.com/tea.png".to_string(),
        }
    }

    #[test]
    fn test_cover_unpaid_order() {
        let info = cover_order(&order(OrderStatus::Create));
        assert_eq!(info.order_status, 101);
        assert_eq!(info.order_status_text, "unpaid");
        assert!(info.handle_option.pay);
        assert_eq!(info.add_time, 1_709_769_600);
        assert_eq!(info.pay_time, None);
    }

    #[test]
    fn test_cover_paid_order() {
        let mut paid = order(OrderStatus::Pay);
        paid.pay_time = Some(datetime!(2024-03-07 00:01));
        let info = cover_order(&paid);
        assert_eq!(info.pay_time, Some(1_709_769_660));
        assert!(info.handle_option.refund);
    }

    #[test]
    fn test_cover_list_item() {
        let item = cover_list_item(&order(OrderStatus::Ship), true, vec![goods(5), goods(6)]);
        assert!(item.is_groupin);
        assert!(item.handle_option.confirm);
        assert_eq!(item.goods_list.len(), 2);
        assert_eq!(item.goods_list[0].id, 5);
        assert_eq!(item.goods_list[1].specifications, vec!["500g".to_string()]);
    }

    #[test]
    fn test_list_item_json_shape() {
        let item = cover_list_item(&order(OrderStatus::Create), false, vec![goods(5)]);
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["orderStatusText"], "unpaid");
        assert_eq!(json["isGroupin"], false);
        assert_eq!(json["goodsList"][0]["goodsName"], "Tea");
        assert_eq!(json["handleOption"]["cancel"], true);
    }

    // -----------------------------------------------------------------------
    // Against the database
    // -----------------------------------------------------------------------

    use crate::test_fixtures::{
        address, cart, coupon, coupon_status, groupon_rule, mall, order_row, product, services,
        stock,
    };
    use sqlx::PgPool;

    const BUYER: i64 = 7;

    fn is_business(result: &ServiceError, code: ResponseCode) -> bool {
        matches!(result, ServiceError::Business(e) if e.code == code)
    }

    async fn groupon_status(pool: &PgPool, order_id: i64) -> i16 {
        sqlx::query_scalar("SELECT status FROM groupons WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn notice_for(order: &Order, pay_id: &str) -> PaidNotice {
        PaidNotice {
            order_sn: order.order_sn.clone(),
            pay_id: pay_id.to_string(),
            amount: order.actual_price,
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_cancel_returns_stock_and_coupon(pool: PgPool) {
        let (services, _rx) = services(&pool);
        let product_id = product(&pool, 10, Decimal::new(10, 0), 5).await;
        cart(&pool, BUYER, product_id, 2).await;
        let (coupon_id, user_coupon_id) = coupon(&pool, BUYER, Decimal::new(5, 0)).await;
        let submit = SubmitOrder {
            address_id: address(&pool, BUYER).await,
            coupon_id,
            user_coupon_id,
            ..SubmitOrder::default()
        };

        let result = services.submit(BUYER, &submit, &mall()).await.unwrap();
        let order = order_row(&pool, result.order_id).await;
        assert_eq!(order.order_status, OrderStatus::Create);
        assert_eq!(order.actual_price, Decimal::new(15, 0));
        assert_eq!(stock(&pool, product_id).await, 3);
        assert_eq!(
            coupon_status(&pool, user_coupon_id).await,
            (1, Some(result.order_id))
        );

        services.cancel(BUYER, result.order_id).await.unwrap();
        let order = order_row(&pool, result.order_id).await;
        assert_eq!(order.order_status, OrderStatus::Cancel);
        assert!(order.end_time.is_some());
        assert_eq!(stock(&pool, product_id).await, 5);
        assert_eq!(coupon_status(&pool, user_coupon_id).await, (0, None));

        let again = services.cancel(BUYER, result.order_id).await.unwrap_err();
        assert!(is_business(&again, ResponseCode::OrderInvalidOperation));
        assert_eq!(stock(&pool, product_id).await, 5);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_stock_shortfall_rolls_back_submit(pool: PgPool) {
        let (services, _rx) = services(&pool);
        let plenty = product(&pool, 10, Decimal::new(10, 0), 50).await;
        let scarce = product(&pool, 11, Decimal::new(30, 0), 1).await;
        cart(&pool, BUYER, plenty, 2).await;
        cart(&pool, BUYER, scarce, 2).await;
        let (coupon_id, user_coupon_id) = coupon(&pool, BUYER, Decimal::new(5, 0)).await;
        let submit = SubmitOrder {
            address_id: address(&pool, BUYER).await,
            coupon_id,
            user_coupon_id,
            ..SubmitOrder::default()
        };

        let err = services.submit(BUYER, &submit, &mall()).await.unwrap_err();
        assert!(is_business(&err, ResponseCode::GoodsNoStock));

        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orders, 0);
        let carts_left: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE user_id = $1 AND NOT deleted")
                .bind(BUYER)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(carts_left, 2);
        assert_eq!(stock(&pool, plenty).await, 50);
        assert_eq!(stock(&pool, scarce).await, 1);
        assert_eq!(coupon_status(&pool, user_coupon_id).await, (0, None));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_repeated_payment_leaves_order_unchanged(pool: PgPool) {
        let (services, mut rx) = services(&pool);
        let product_id = product(&pool, 10, Decimal::new(1250, 2), 5).await;
        cart(&pool, BUYER, product_id, 1).await;
        let submit = SubmitOrder {
            address_id: address(&pool, BUYER).await,
            ..SubmitOrder::default()
        };
        let order_id = services.submit(BUYER, &submit, &mall()).await.unwrap().order_id;
        let order = order_row(&pool, order_id).await;

        assert_eq!(
            services.pay_success(&notice_for(&order, "wx-1")).await.unwrap(),
            PaymentOutcome::Paid { order_id }
        );
        assert_eq!(rx.recv().await, Some(OrderEvent::Paid { order_id }));
        let paid = order_row(&pool, order_id).await;
        assert_eq!(paid.order_status, OrderStatus::Pay);
        assert_eq!(paid.pay_id.as_deref(), Some("wx-1"));

        assert_eq!(
            services.pay_success(&notice_for(&order, "wx-2")).await.unwrap(),
            PaymentOutcome::AlreadyPaid { order_id }
        );
        assert_eq!(order_row(&pool, order_id).await, paid);
        assert!(rx.try_recv().is_err());

        // The timeout sweep leaves a paid order alone.
        assert!(!services.cancel_unpaid(order_id).await.unwrap());
        assert_eq!(stock(&pool, product_id).await, 4);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_payment_with_wrong_amount_is_refused(pool: PgPool) {
        let (services, mut rx) = services(&pool);
        let product_id = product(&pool, 10, Decimal::new(1250, 2), 5).await;
        cart(&pool, BUYER, product_id, 2).await;
        let submit = SubmitOrder {
            address_id: address(&pool, BUYER).await,
            ..SubmitOrder::default()
        };
        let order_id = services.submit(BUYER, &submit, &mall()).await.unwrap().order_id;
        let order = order_row(&pool, order_id).await;

        let mut short = notice_for(&order, "wx-1");
        short.amount = Decimal::new(1, 2);
        let err = services.pay_success(&short).await.unwrap_err();
        assert!(is_business(&err, ResponseCode::OrderPayFail));

        let mut unknown = notice_for(&order, "wx-1");
        unknown.order_sn = "19990101000000".to_string();
        let err = services.pay_success(&unknown).await.unwrap_err();
        assert!(is_business(&err, ResponseCode::OrderUnknown));

        assert_eq!(order_row(&pool, order_id).await, order);
        assert!(rx.try_recv().is_err());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_group_succeeds_when_enough_members_paid(pool: PgPool) {
        let (services, _rx) = services(&pool);
        let product_id = product(&pool, 10, Decimal::new(30, 0), 10).await;
        let rules_id = groupon_rule(&pool, 10, Decimal::new(5, 0), 2).await;

        let creator = 1;
        cart(&pool, creator, product_id, 1).await;
        let opened = services
            .submit(
                creator,
                &SubmitOrder {
                    address_id: address(&pool, creator).await,
                    groupon_rules_id: rules_id,
                    ..SubmitOrder::default()
                },
                &mall(),
            )
            .await
            .unwrap();
        assert!(opened.groupon_link_id > 0);
        let creator_order = order_row(&pool, opened.order_id).await;
        assert_eq!(creator_order.groupon_price, Decimal::new(5, 0));
        assert_eq!(creator_order.actual_price, Decimal::new(25, 0));
        services
            .pay_success(&notice_for(&creator_order, "wx-1"))
            .await
            .unwrap();
        assert_eq!(groupon_status(&pool, opened.order_id).await, 1);

        let member = 2;
        cart(&pool, member, product_id, 1).await;
        let joined = services
            .submit(
                member,
                &SubmitOrder {
                    address_id: address(&pool, member).await,
                    groupon_rules_id: rules_id,
                    groupon_link_id: opened.groupon_link_id,
                    ..SubmitOrder::default()
                },
                &mall(),
            )
            .await
            .unwrap();
        assert_eq!(joined.groupon_link_id, opened.groupon_link_id);
        assert_eq!(groupon_status(&pool, joined.order_id).await, 0);

        let member_order = order_row(&pool, joined.order_id).await;
        services
            .pay_success(&notice_for(&member_order, "wx-2"))
            .await
            .unwrap();
        assert_eq!(groupon_status(&pool, opened.order_id).await, 2);
        assert_eq!(groupon_status(&pool, joined.order_id).await, 2);

        let late = 3;
        cart(&pool, late, product_id, 1).await;
        let err = services
            .submit(
                late,
                &SubmitOrder {
                    address_id: address(&pool, late).await,
                    groupon_rules_id: rules_id,
                    groupon_link_id: opened.groupon_link_id,
                    ..SubmitOrder::default()
                },
                &mall(),
            )
            .await
            .unwrap_err();
        assert!(is_business(&err, ResponseCode::GrouponFull));
    }
}
