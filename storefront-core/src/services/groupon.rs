//! Group-buy participation rules.

use storefront_sdk::objects::ResponseCode;

use super::error::BusinessError;
use crate::entities::groupon::{Groupon, GrouponRule, GrouponRuleStatus, GrouponStatus};
use crate::framework::Tx;

/// Paid members of a link: they count towards `discount_member`.
const PAID: [GrouponStatus; 2] = [GrouponStatus::On, GrouponStatus::Succeed];

/// State of an existing group the user wants to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrouponLink {
    pub link_id: i64,
    pub rules_id: i64,
    pub creator_user_id: i64,
    /// Paid members so far, including the creator.
    pub paid_members: i64,
    /// Whether the user already takes part in this group.
    pub user_joined: bool,
}

impl GrouponLink {
    /// Load the group led by record `link_id`. Returns `None` if there is no
    /// such group.
    pub async fn load_tx(
        tx: &mut Tx<'_>,
        link_id: i64,
        user_id: i64,
    ) -> Result<Option<GrouponLink>, sqlx::Error> {
        let Some(creator) = Groupon::get_tx(tx, link_id).await? else {
            return Ok(None);
        };
        if creator.groupon_id != 0 {
            return Ok(None);
        }
        let paid_members = Groupon::count_in_link_tx(tx, link_id, &PAID).await?;
        let user_joined = Groupon::user_in_link_tx(tx, user_id, link_id).await?;
        Ok(Some(GrouponLink {
            link_id,
            rules_id: creator.rules_id,
            creator_user_id: creator.creator_user_id,
            paid_members,
            user_joined,
        }))
    }
}

/// Check that `user_id` may open a group under `rule`, or join `link`.
pub fn check_participation(
    rule: &GrouponRule,
    link: Option<&GrouponLink>,
    user_id: i64,
    now: time::PrimitiveDateTime,
) -> Result<(), BusinessError> {
    match rule.status {
        GrouponRuleStatus::Expired => return Err(BusinessError::new(ResponseCode::GrouponExpired)),
        GrouponRuleStatus::Offline => return Err(BusinessError::new(ResponseCode::GrouponOffline)),
        GrouponRuleStatus::Online => {}
    }
    if rule.expire_time <= now {
        return Err(BusinessError::new(ResponseCode::GrouponExpired));
    }

    let Some(link) = link else {
        return Ok(());
    };
    if link.rules_id != rule.id {
        return Err(BusinessError::new(ResponseCode::ParamValueIllegal));
    }
    if link.paid_members >= i64::from(rule.discount_member) {
        return Err(BusinessError::new(ResponseCode::GrouponFull));
    }
    if link.user_joined || link.creator_user_id == user_id {
        return Err(BusinessError::new(ResponseCode::GrouponJoin));
    }
    Ok(())
}

/// Update group-buy records after the order was paid.
///
/// The order's record becomes "on"; when the group has enough paid members
/// every waiting record of the group succeeds.
pub async fn on_order_paid_tx(
    tx: &mut Tx<'_>,
    order_id: i64,
) -> Result<Option<GrouponStatus>, sqlx::Error> {
    let Some(record) = Groupon::lock_by_order_tx(tx, order_id).await? else {
        return Ok(None);
    };
    Groupon::set_status_tx(tx, record.id, GrouponStatus::On).await?;

    let Some(rule) = GrouponRule::get_tx(tx, record.rules_id).await? else {
        return Ok(Some(GrouponStatus::On));
    };
    let link_id = record.link_id();
    let paid = Groupon::count_in_link_tx(tx, link_id, &PAID).await?;
    if paid >= i64::from(rule.discount_member) {
        Groupon::update_link_status_tx(tx, link_id, GrouponStatus::On, GrouponStatus::Succeed)
            .await?;
        tracing::info!(link_id, paid, "Group-buy succeeded");
        return Ok(Some(GrouponStatus::Succeed));
    }
    Ok(Some(GrouponStatus::On))
}
