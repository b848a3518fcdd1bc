//! Wire types shared between the storefront server and its clients.
//!
//! Every JSON response is wrapped in an [`Envelope`]: `errno` is `0` on
//! success and a [`ResponseCode`] value otherwise.

pub mod notify;
pub mod order;

pub use order::{
    HandleOption, ListOrdersQuery, OrderDetail, OrderGoodsItem, OrderIdBody, OrderIdQuery,
    OrderInfo, OrderListGoods, OrderListItem, OrderSort, SortDirection, SubmitOrder, SubmitResult,
};

use serde::{Deserialize, Serialize};

/// Business response codes carried in the `errno` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    Fail,
    ParamIllegal,
    ParamValueIllegal,
    UnLogin,
    SystemError,
    UpdatedDataFailed,
    GoodsNoStock,
    OrderUnknown,
    OrderInvalid,
    OrderPayFail,
    OrderInvalidOperation,
    GrouponExpired,
    GrouponFull,
    GrouponJoin,
    GrouponOffline,
    CouponUnavailable,
}

impl ResponseCode {
    pub fn errno(self) -> i32 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::Fail => -1,
            ResponseCode::ParamIllegal => 401,
            ResponseCode::ParamValueIllegal => 402,
            ResponseCode::UnLogin => 501,
            ResponseCode::SystemError => 502,
            ResponseCode::UpdatedDataFailed => 505,
            ResponseCode::GoodsNoStock => 711,
            ResponseCode::OrderUnknown => 720,
            ResponseCode::OrderInvalid => 721,
            ResponseCode::OrderPayFail => 724,
            ResponseCode::OrderInvalidOperation => 725,
            ResponseCode::GrouponExpired => 730,
            ResponseCode::GrouponFull => 732,
            ResponseCode::GrouponJoin => 733,
            ResponseCode::GrouponOffline => 734,
            ResponseCode::CouponUnavailable => 740,
        }
    }

    /// Default human-readable message for the code.
    pub fn message(self) -> &'static str {
        match self {
            ResponseCode::Success => "success",
            ResponseCode::Fail => "error",
            ResponseCode::ParamIllegal => "illegal parameter",
            ResponseCode::ParamValueIllegal => "illegal parameter value",
            ResponseCode::UnLogin => "please log in",
            ResponseCode::SystemError => "system internal error",
            ResponseCode::UpdatedDataFailed => "failed to update data",
            ResponseCode::GoodsNoStock => "insufficient stock",
            ResponseCode::OrderUnknown => "order does not exist",
            ResponseCode::OrderInvalid => "order is invalid",
            ResponseCode::OrderPayFail => "order payment failed",
            ResponseCode::OrderInvalidOperation => "operation not allowed for this order",
            ResponseCode::GrouponExpired => "group-buy has expired",
            ResponseCode::GrouponFull => "group-buy is full",
            ResponseCode::GrouponJoin => "already joined this group-buy",
            ResponseCode::GrouponOffline => "group-buy is offline",
            ResponseCode::CouponUnavailable => "coupon is not available",
        }
    }
}

/// The uniform JSON response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub errno: i32,
    pub errmsg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A success envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            errno: ResponseCode::Success.errno(),
            errmsg: ResponseCode::Success.message().to_string(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    /// A success envelope without data.
    pub fn ok_empty() -> Self {
        Self {
            errno: ResponseCode::Success.errno(),
            errmsg: ResponseCode::Success.message().to_string(),
            data: None,
        }
    }

    /// A failure envelope with an explicit message.
    pub fn fail(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            errno: code.errno(),
            errmsg: message.into(),
            data: None,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub list: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(list: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            list,
            total,
            page,
            limit,
            pages,
        }
    }
}

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

pub(crate) fn default_page() -> i64 {
    DEFAULT_PAGE
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp page and limit to safe bounds.
pub fn clamp_pagination(page: i64, limit: i64) -> (i64, i64) {
    (page.max(1), limit.clamp(1, MAX_LIMIT))
}

/// Row offset of a clamped page, or `None` when it does not fit in an `i64`.
pub fn page_offset(page: i64, limit: i64) -> Option<i64> {
    (page - 1).checked_mul(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let json = serde_json::to_value(Envelope::ok(serde_json::json!({"orderId": 7}))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"errno": 0, "errmsg": "success", "data": {"orderId": 7}})
        );
    }

    #[test]
    fn test_fail_envelope_omits_data() {
        let json =
            serde_json::to_value(Envelope::fail(ResponseCode::Fail, "duplicate request")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"errno": -1, "errmsg": "duplicate request"})
        );
    }

    #[test]
    fn test_pages_round_up() {
        let page = Paginated::new(vec![1, 2, 3], 21, 1, 10);
        assert_eq!(page.pages, 3);
        let empty: Paginated<i32> = Paginated::new(vec![], 0, 1, 10);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn test_clamp_pagination() {
        assert_eq!(clamp_pagination(0, 0), (1, 1));
        assert_eq!(clamp_pagination(3, 1000), (3, 100));
        assert_eq!(clamp_pagination(2, 20), (2, 20));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10), Some(0));
        assert_eq!(page_offset(3, 20), Some(40));
        let (page, limit) = clamp_pagination(i64::MAX, 100);
        assert_eq!(page_offset(page, limit), None);
    }
}
