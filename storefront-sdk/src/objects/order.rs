//! Order API request and response types.
//!
//! Field names are camelCase on the wire.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{default_limit, default_page};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `?orderId=` query parameter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdQuery {
    pub order_id: Option<i64>,
}

/// `{"orderId": ..}` JSON body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdBody {
    pub order_id: Option<i64>,
}

/// Column used to sort the order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    AddTime,
    Id,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for `GET /wx/order/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub show_type: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort: OrderSort,
    #[serde(default)]
    pub order: SortDirection,
}

impl Default for ListOrdersQuery {
    fn default() -> Self {
        Self {
            show_type: 0,
            page: default_page(),
            limit: default_limit(),
            sort: OrderSort::default(),
            order: SortDirection::default(),
        }
    }
}

/// Body of `POST /wx/order/submit`.
///
/// A `cartId` of `0` checks out every checked cart line of the user.
/// Zero ids for coupon and group-buy fields mean "not used".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrder {
    pub address_id: i64,
    #[serde(default)]
    pub cart_id: i64,
    #[serde(default)]
    pub coupon_id: i64,
    #[serde(default)]
    pub user_coupon_id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub groupon_rules_id: i64,
    #[serde(default)]
    pub groupon_link_id: i64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub order_id: i64,
    pub groupon_link_id: i64,
}

/// The actions a user may take on an order in its current status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleOption {
    pub cancel: bool,
    pub delete: bool,
    pub pay: bool,
    pub comment: bool,
    pub confirm: bool,
    pub refund: bool,
    pub rebuy: bool,
    pub aftersale: bool,
}

/// A line item as shown in the order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListGoods {
    pub id: i64,
    pub goods_name: String,
    pub number: i16,
    pub pic_url: String,
    pub specifications: Vec<String>,
    pub price: Decimal,
}

/// One row of the order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListItem {
    pub id: i64,
    pub order_sn: String,
    pub actual_price: Decimal,
    pub order_status: i16,
    pub order_status_text: String,
    pub handle_option: HandleOption,
    pub is_groupin: bool,
    pub goods_list: Vec<OrderListGoods>,
}

/// Order header in the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub id: i64,
    pub order_sn: String,
    pub message: String,
    pub add_time: i64,
    pub consignee: String,
    pub mobile: String,
    pub address: String,
    pub goods_price: Decimal,
    pub freight_price: Decimal,
    pub coupon_price: Decimal,
    pub groupon_price: Decimal,
    pub actual_price: Decimal,
    pub order_status: i16,
    pub order_status_text: String,
    pub handle_option: HandleOption,
    pub ship_channel: Option<String>,
    pub ship_sn: Option<String>,
    pub pay_time: Option<i64>,
}

/// A line item in the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderGoodsItem {
    pub id: i64,
    pub order_id: i64,
    pub goods_id: i64,
    pub goods_name: String,
    pub goods_sn: String,
    pub product_id: i64,
    pub number: i16,
    pub price: Decimal,
    pub specifications: Vec<String>,
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order_info: OrderInfo,
    pub order_goods: Vec<OrderGoodsItem>,
}
