use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::common::user::Role;

/// Different privilege levels, as carried inside an auth token.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Member = 0,
    Admin = 1,
}

impl From<Role> for Rights {
    fn from(role: Role) -> Self {
        match role {
            Role::Member => Self::Member,
            Role::Admin => Self::Admin,
        }
    }
}

impl From<Rights> for Role {
    fn from(rights: Rights) -> Self {
        match rights {
            Rights::Member => Self::Member,
            Rights::Admin => Self::Admin,
        }
    }
}

/// Who a route is open to. Used as the type parameter of [`super::AuthToken`].
pub trait Audience {
    /// Does a token with these rights get in?
    fn admits(rights: Rights) -> bool;
}

/// Organization admins only.
pub struct Admin;

impl Audience for Admin {
    fn admits(rights: Rights) -> bool {
        rights == Rights::Admin
    }
}

/// Any signed-in user, admins included.
pub struct Member;

impl Audience for Member {
    fn admits(_rights: Rights) -> bool {
        true
    }
}
