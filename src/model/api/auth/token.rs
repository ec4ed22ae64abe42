use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::{
        caller::Caller,
        user::{MemberStatus, OrganizationId, UserId},
    },
    db::user::User,
};
use crate::store::SharedStore;

use super::rights::{Audience, Rights};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific rights.
///
/// The type parameter names the audience a route is open to; extracting an
/// `AuthToken<Admin>` from a member's cookie fails with `403 Forbidden`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<A> {
    pub id: UserId,
    #[serde(rename = "org")]
    pub organization_id: OrganizationId,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<A>,
}

impl<A> AuthToken<A> {
    /// Create a new [`AuthToken`] for the given user.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id.clone(),
            rights: user.role.into(),
            phantom: PhantomData,
        }
    }

    /// The explicit caller context to hand to services.
    pub fn caller(&self) -> Caller {
        Caller::new(self.id, self.organization_id.clone(), self.rights.into())
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<A>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<A> {
    #[serde(flatten, bound = "")]
    token: AuthToken<A>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, A> FromRequest<'r> for AuthToken<A>
where
    A: Audience + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that its rights admit it to this route.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Not logged in"),
                ))
            }
        };

        // Decode the token.
        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        // Check the user still exists, is active, and still holds these rights.
        // Unwrap is safe as the store is always managed.
        let store = req.guard::<&State<SharedStore>>().await.unwrap();
        let user = match store.user(token.id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized(format!("User {} no longer exists", token.id)),
                ))
            }
            Err(e) => return Outcome::Failure((Status::InternalServerError, e)),
        };
        if user.status != MemberStatus::Active
            || Rights::from(user.role) != token.rights
            || user.organization_id != token.organization_id
        {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Session no longer valid; please log in again"),
            ));
        }

        if !A::admits(token.rights) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::forbidden("Admin access required"),
            ));
        }

        Outcome::Success(token)
    }
}
