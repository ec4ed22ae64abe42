//! Organizations and their members: registration, login, and approval.

use chrono::Utc;
use log::{debug, info, warn};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        organization::{OrganizationCounts, OrganizationOverview},
        user::{AdminRegistration, Credentials, MemberRegistration, UserDescription},
    },
    common::{
        caller::Caller,
        election::ElectionStatus,
        user::{MemberStatus, OrganizationId, Role, UserId},
    },
    db::{organization::Organization, user::User},
};
use crate::store::SharedStore;

/// How many times to draw a fresh organization code before giving up.
const ORGANIZATION_ID_ATTEMPTS: usize = 5;

/// A handle on the membership service.
#[derive(Clone)]
pub struct Membership {
    store: SharedStore,
}

impl Membership {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn ensure_email_unused(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(Error::conflict("Email address already in use"));
        }
        Ok(())
    }

    async fn unused_organization_id(&self) -> Result<String> {
        for _ in 0..ORGANIZATION_ID_ATTEMPTS {
            let id = Organization::generate_id();
            if self.store.organization(&id).await?.is_none() {
                return Ok(id);
            }
            debug!("Organization code {id} already taken, drawing another");
        }
        Err(Error::conflict("Could not allocate an organization code"))
    }

    /// Insert the admin, then the organization they own.
    ///
    /// If the organization can't be stored, the admin is removed again so
    /// that no user is left pointing at a missing organization.
    async fn create_organization(
        &self,
        organization_id: OrganizationId,
        registration: AdminRegistration,
    ) -> Result<User> {
        let organization_name = registration.organization_name.trim().to_string();
        let admin = self
            .store
            .insert_user(registration.into_user(organization_id.clone())?)
            .await?;
        let organization = Organization {
            id: organization_id,
            name: organization_name,
            admin_id: admin.id,
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.insert_organization(organization).await {
            warn!("Could not store organization for admin {}: {err}", admin.id);
            self.store.delete_user(admin.id).await?;
            return Err(err);
        }
        Ok(admin)
    }

    /// Register a new organization together with its first admin.
    pub async fn register_admin(&self, registration: AdminRegistration) -> Result<User> {
        registration.validate()?;
        self.ensure_email_unused(&registration.email).await?;

        let organization_id = self.unused_organization_id().await?;
        let admin = self
            .create_organization(organization_id, registration)
            .await?;

        info!(
            "Registered organization {} with admin {}",
            admin.organization_id, admin.id
        );
        Ok(admin)
    }

    /// Register a member of an existing organization, pending admin approval.
    pub async fn register_member(&self, registration: MemberRegistration) -> Result<User> {
        registration.validate()?;
        if self
            .store
            .organization(&registration.organization_id)
            .await?
            .is_none()
        {
            return Err(Error::invalid_argument(format!(
                "Invalid organization ID '{}'",
                registration.organization_id
            )));
        }
        self.ensure_email_unused(&registration.email).await?;

        let member = self.store.insert_user(registration.into_user()?).await?;
        info!(
            "Registered member {} of {}, pending approval",
            member.id, member.organization_id
        );
        Ok(member)
    }

    /// Check login credentials, returning the user they belong to.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<User> {
        let email = credentials.email.trim().to_lowercase();
        let user = match self.store.user_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email");
                return Err(Error::unauthorized("Invalid credentials"));
            }
        };
        if !user.verify_password(&credentials.password)? {
            warn!("Failed login for user {}", user.id);
            return Err(Error::unauthorized("Invalid credentials"));
        }
        if user.status != MemberStatus::Active {
            return Err(Error::unauthorized(
                "Your account is pending approval by the organization admin",
            ));
        }
        Ok(user)
    }

    /// The caller's own account.
    pub async fn user(&self, caller: &Caller) -> Result<UserDescription> {
        let user = self
            .store
            .user(caller.user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User {}", caller.user_id)))?;
        Ok(user.into())
    }

    /// Members of the caller's organization, optionally only those with the given status.
    pub async fn members(
        &self,
        caller: &Caller,
        status: Option<MemberStatus>,
    ) -> Result<Vec<UserDescription>> {
        caller.require_admin()?;
        let members = self
            .store
            .users(&caller.organization_id, status)
            .await?
            .into_iter()
            .filter(|user| user.role == Role::Member)
            .map(UserDescription::from)
            .collect();
        Ok(members)
    }

    /// Approve or reject a member of the caller's organization.
    pub async fn set_member_status(
        &self,
        caller: &Caller,
        user_id: UserId,
        status: MemberStatus,
    ) -> Result<UserDescription> {
        caller.require_admin()?;
        let mut member = self
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Member {user_id}")))?;
        caller.require_organization(&member.organization_id, format!("member {user_id}"))?;
        if member.role != Role::Member {
            return Err(Error::invalid_argument(format!(
                "User {user_id} is not a member"
            )));
        }

        self.store.set_user_status(user_id, status).await?;
        info!(
            "User {} set member {user_id} to {status}",
            caller.user_id
        );
        member.status = status;
        Ok(member.into())
    }

    /// The caller's organization with member and election counts.
    pub async fn organization(&self, caller: &Caller) -> Result<OrganizationOverview> {
        let organization = self
            .store
            .organization(&caller.organization_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Organization {}", caller.organization_id)))?;

        let mut counts = OrganizationCounts::default();
        for member in self.store.users(&organization.id, None).await? {
            if member.role != Role::Member {
                continue;
            }
            match member.status {
                MemberStatus::Active => counts.active_members += 1,
                MemberStatus::Pending => counts.pending_members += 1,
                MemberStatus::Rejected => continue,
            }
            counts.total_members += 1;
        }
        for election in self.store.elections(&organization.id, None).await? {
            match election.status {
                ElectionStatus::Upcoming => counts.upcoming_elections += 1,
                ElectionStatus::Ongoing => counts.ongoing_elections += 1,
                ElectionStatus::Completed => counts.completed_elections += 1,
            }
            counts.total_elections += 1;
        }

        Ok(OrganizationOverview::new(organization, counts))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Membership {
    type Error = ();

    /// Panics iff the store is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<SharedStore>>().await.unwrap();
        request::Outcome::Success(Membership::new(store.inner().clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::ErrorKind;
    use crate::model::db::{election::ElectionCore, user::UserCore};
    use crate::store::{MemoryStore, Store};

    use super::*;

    fn membership() -> (Membership, MemoryStore) {
        let store = MemoryStore::new();
        (Membership::new(Arc::new(store.clone())), store)
    }

    #[rocket::async_test]
    async fn register_admin_creates_organization() {
        let (membership, store) = membership();

        let admin = membership
            .register_admin(AdminRegistration::example())
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.status, MemberStatus::Active);

        let organization = store
            .organization(&admin.organization_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(organization.name, "Initech");
        assert_eq!(organization.admin_id, admin.id);

        // Same email again, even with different case.
        let mut again = AdminRegistration::example();
        again.email = again.email.to_uppercase();
        let err = membership.register_admin(again).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[rocket::async_test]
    async fn failed_organization_insert_removes_admin() {
        let (membership, store) = membership();
        store
            .insert_organization(Organization::example())
            .await
            .unwrap();
        let registration = AdminRegistration::example();
        let email = registration.email.clone();

        let err = membership
            .create_organization(Organization::example().id, registration)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.user_by_email(&email).await.unwrap(), None);

        // The email is free again.
        membership
            .register_admin(AdminRegistration::example())
            .await
            .unwrap();
    }

    #[rocket::async_test]
    async fn member_waits_for_approval() {
        let (membership, _) = membership();
        let admin = membership
            .register_admin(AdminRegistration::example())
            .await
            .unwrap();
        let registration = MemberRegistration::example(&admin.organization_id);
        let credentials = Credentials {
            email: registration.email.clone(),
            password: registration.password.clone(),
        };

        let member = membership.register_member(registration).await.unwrap();
        assert_eq!(member.status, MemberStatus::Pending);
        let err = membership
            .authenticate(credentials.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.to_string().contains("pending approval"));

        let caller = Caller::new(admin.id, admin.organization_id.clone(), Role::Admin);
        let pending = membership
            .members(&caller, Some(MemberStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let approved = membership
            .set_member_status(&caller, member.id, MemberStatus::Active)
            .await
            .unwrap();
        assert_eq!(approved.status, MemberStatus::Active);
        let user = membership.authenticate(credentials).await.unwrap();
        assert_eq!(user.id, member.id);
    }

    #[rocket::async_test]
    async fn register_member_needs_real_organization() {
        let (membership, _) = membership();
        let err = membership
            .register_member(MemberRegistration::example("NOPE0000"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[rocket::async_test]
    async fn authenticate_rejects_bad_credentials() {
        let (membership, store) = membership();
        store.insert_user(UserCore::admin_example()).await.unwrap();

        let mut wrong_password = Credentials::admin_example();
        wrong_password.password = "incorrect horse".to_string();
        let err = membership.authenticate(wrong_password).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let mut unknown = Credentials::admin_example();
        unknown.email = "nobody@acme.test".to_string();
        let err = membership.authenticate(unknown).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let admin = membership
            .authenticate(Credentials::admin_example())
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[rocket::async_test]
    async fn member_management_is_admin_only_and_scoped() {
        let (membership, store) = membership();
        store.insert_user(UserCore::admin_example()).await.unwrap();
        let member = store.insert_user(UserCore::member_example()).await.unwrap();
        let pending = store
            .insert_user(UserCore::pending_member_example())
            .await
            .unwrap();

        let err = membership
            .members(&Caller::member_example(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = membership
            .set_member_status(&Caller::outsider_example(), pending.id, MemberStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = membership
            .set_member_status(&Caller::admin_example(), 404, MemberStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Admins aren't listed as members.
        let all = membership
            .members(&Caller::admin_example(), None)
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![member.id, pending.id]);

        let rejected = membership
            .set_member_status(&Caller::admin_example(), pending.id, MemberStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(rejected.status, MemberStatus::Rejected);
    }

    #[rocket::async_test]
    async fn organization_overview_counts() {
        let (membership, store) = membership();
        let admin = membership
            .register_admin(AdminRegistration::example())
            .await
            .unwrap();
        let org = admin.organization_id.clone();
        membership
            .register_member(MemberRegistration::example(&org))
            .await
            .unwrap();

        let now = Utc::now();
        for status in [
            ElectionStatus::Ongoing,
            ElectionStatus::Ongoing,
            ElectionStatus::Completed,
        ] {
            store
                .insert_election(ElectionCore {
                    title: "Vote".to_string(),
                    description: None,
                    organization_id: org.clone(),
                    start_date: now,
                    end_date: now,
                    status,
                    created_at: now,
                })
                .await
                .unwrap();
        }

        let caller = Caller::new(admin.id, org, Role::Admin);
        let overview = membership.organization(&caller).await.unwrap();
        assert_eq!(overview.name, "Initech");
        assert_eq!(
            overview.counts,
            OrganizationCounts {
                active_members: 0,
                pending_members: 1,
                total_members: 1,
                upcoming_elections: 0,
                ongoing_elections: 2,
                completed_elections: 1,
                total_elections: 3,
            }
        );
    }
}
