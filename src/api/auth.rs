use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::Result,
    membership::Membership,
    model::api::{
        auth::{AuthToken, Member, AUTH_TOKEN_COOKIE},
        user::{AdminRegistration, Credentials, MemberRegistration, UserDescription},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        authenticate,
        current_user,
        logout,
        register_admin,
        register_member
    ]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    membership: Membership,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    let user = membership.authenticate(credentials.0).await?;

    let token = AuthToken::<Member>::new(&user);
    cookies.add(token.into_cookie(config));

    Ok(Json(user.into()))
}

#[get("/auth")]
async fn current_user(
    token: AuthToken<Member>,
    membership: Membership,
) -> Result<Json<UserDescription>> {
    Ok(Json(membership.user(&token.caller()).await?))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

/// Register a new organization and log its admin in.
#[post("/register/admin", data = "<registration>", format = "json")]
async fn register_admin(
    cookies: &CookieJar<'_>,
    registration: Json<AdminRegistration>,
    membership: Membership,
    config: &State<Config>,
) -> Result<(Status, Json<UserDescription>)> {
    let admin = membership.register_admin(registration.0).await?;

    let token = AuthToken::<Member>::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok((Status::Created, Json(admin.into())))
}

/// Register a member, who can't log in until an admin approves them.
#[post("/register/member", data = "<registration>", format = "json")]
async fn register_member(
    registration: Json<MemberRegistration>,
    membership: Membership,
) -> Result<(Status, Json<UserDescription>)> {
    let member = membership.register_member(registration.0).await?;
    Ok((Status::Created, Json(member.into())))
}
