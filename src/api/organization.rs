use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    membership::Membership,
    model::{
        api::{
            auth::{Admin, AuthToken, Member},
            organization::OrganizationOverview,
            user::{MemberStatusChange, UserDescription},
        },
        common::user::{MemberStatus, UserId},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_organization, get_members, set_member_status]
}

#[get("/organization")]
async fn get_organization(
    token: AuthToken<Member>,
    membership: Membership,
) -> Result<Json<OrganizationOverview>> {
    Ok(Json(membership.organization(&token.caller()).await?))
}

#[get("/members?<status>")]
async fn get_members(
    token: AuthToken<Admin>,
    status: Option<&str>,
    membership: Membership,
) -> Result<Json<Vec<UserDescription>>> {
    let status = status.map(str::parse::<MemberStatus>).transpose()?;
    Ok(Json(membership.members(&token.caller(), status).await?))
}

#[put("/members/<user_id>/status", data = "<change>", format = "json")]
async fn set_member_status(
    token: AuthToken<Admin>,
    user_id: UserId,
    change: Json<MemberStatusChange>,
    membership: Membership,
) -> Result<Json<UserDescription>> {
    Ok(Json(
        membership
            .set_member_status(&token.caller(), user_id, change.status()?)
            .await?,
    ))
}
