use argon2::Config;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::user::{MemberStatus, OrganizationId, Role, UserId},
    db::user::{NewUser, User},
};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MIN_ORGANIZATION_NAME_LENGTH: usize = 3;
pub const MIN_MEMBER_ID_LENGTH: usize = 3;

/// Raw login credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up form for a new organization and its first admin.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub organization_name: String,
}

/// Sign-up form for a member joining an existing organization.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub organization_id: OrganizationId,
    pub member_id: String,
}

/// Check the fields every registration form shares.
fn validate_account(name: &str, email: &str, password: &str, confirm: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_argument("Name must not be empty"));
    }
    if !is_plausible_email(email) {
        return Err(Error::invalid_argument(format!(
            "Invalid email address '{email}'"
        )));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::invalid_argument(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm {
        return Err(Error::invalid_argument("Passwords don't match"));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Config::default(),
    )?)
}

impl AdminRegistration {
    pub fn validate(&self) -> Result<()> {
        validate_account(
            &self.name,
            &self.email,
            &self.password,
            &self.confirm_password,
        )?;
        if self.organization_name.trim().len() < MIN_ORGANIZATION_NAME_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Organization name must be at least {MIN_ORGANIZATION_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Convert into an active admin of the given organization, hashing the password.
    pub fn into_user(self, organization_id: OrganizationId) -> Result<NewUser> {
        self.validate()?;
        Ok(NewUser {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password_hash: hash_password(&self.password)?,
            role: Role::Admin,
            organization_id,
            member_id: None,
            status: MemberStatus::Active,
            created_at: Utc::now(),
        })
    }
}

impl MemberRegistration {
    pub fn validate(&self) -> Result<()> {
        validate_account(
            &self.name,
            &self.email,
            &self.password,
            &self.confirm_password,
        )?;
        if self.member_id.trim().len() < MIN_MEMBER_ID_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Member ID must be at least {MIN_MEMBER_ID_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Convert into a member awaiting approval, hashing the password.
    pub fn into_user(self) -> Result<NewUser> {
        self.validate()?;
        Ok(NewUser {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password_hash: hash_password(&self.password)?,
            role: Role::Member,
            organization_id: self.organization_id,
            member_id: Some(self.member_id.trim().to_string()),
            status: MemberStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

/// A user as shown to clients: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub organization_id: OrganizationId,
    pub member_id: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.user.name,
            email: user.user.email,
            role: user.user.role,
            organization_id: user.user.organization_id,
            member_id: user.user.member_id,
            status: user.user.status,
            created_at: user.user.created_at,
        }
    }
}

/// An admin's decision on a member account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatusChange {
    pub status: String,
}

impl MemberStatusChange {
    pub fn status(&self) -> Result<MemberStatus> {
        self.status.parse()
    }
}
