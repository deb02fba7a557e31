//! Admin roster actions (super admins only, enforced by row-level security).
//!
//! Adding an admin resolves the email to an auth account first. When no
//! account exists and a password was given, the account is created with the
//! service credential; otherwise the email is recorded as a pending admin and
//! promoted the first time that person signs in.

use secrecy::ExposeSecret;
use tracing::instrument;

use opal_core::{AdminRole, ContentKind, PendingAdminId, UserId};

use super::{ActionError, actor, settle};
use crate::models::{Identity, NewAdmin, PendingAdmin};
use crate::services::auth::{AuthError, validate_password};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Admin;

/// What `add_admin` created.
#[derive(Debug, Clone)]
pub enum AddAdminOutcome {
    /// The email has an auth account, which is now an admin.
    Admin(UserId),
    /// No account yet; the admin is pending until first sign-in.
    Pending(PendingAdmin),
}

/// The admins page.
#[must_use]
pub fn invalidation_paths() -> Vec<String> {
    vec!["/admin/admins".to_string()]
}

/// Add an admin by email.
///
/// Exactly one of "admin record" or "pending admin" is created.
///
/// # Errors
///
/// Returns an `ActionError` with a `Conflict` failure if the email is already
/// an admin or already pending, or if a lookup, account creation or insert fails.
#[instrument(skip(state, identity, new_admin), fields(user_id = %identity.user_id, email = %new_admin.email))]
pub async fn add_admin(
    state: &AppState,
    identity: &Identity,
    new_admin: &NewAdmin,
) -> Result<AddAdminOutcome, ActionError> {
    let admins = state.admins();
    let actor = actor(identity);

    let mut user_id = admins
        .find_user_id_by_email(&new_admin.email)
        .await
        .map_err(ActionError::repo(KIND, "add"))?;

    if user_id.is_none()
        && let Some(password) = &new_admin.password
    {
        user_id = create_account(state, new_admin, password).await?;
    }

    let outcome = if let Some(user_id) = user_id {
        admins
            .insert_admin(&actor, user_id, new_admin)
            .await
            .map_err(ActionError::repo(KIND, "add"))?;
        tracing::info!(new_admin = %user_id, role = %new_admin.role, "Admin added");
        AddAdminOutcome::Admin(user_id)
    } else {
        let pending = admins
            .insert_pending(&actor, new_admin)
            .await
            .map_err(ActionError::repo(KIND, "add"))?;
        tracing::info!(pending_id = %pending.id, role = %new_admin.role, "Pending admin added");
        AddAdminOutcome::Pending(pending)
    };

    settle(state, KIND, "add", &invalidation_paths()).await;
    Ok(outcome)
}

/// Create an auth account for a new admin.
///
/// Returns `None` when the server has no service credential, in which case
/// the caller falls back to a pending admin.
async fn create_account(
    state: &AppState,
    new_admin: &NewAdmin,
    password: &secrecy::SecretString,
) -> Result<Option<UserId>, ActionError> {
    if password.expose_secret().is_empty() {
        return Ok(None);
    }
    validate_password(password.expose_secret()).map_err(|e| ActionError::new(KIND, "add", e))?;

    match state
        .sessions()
        .create_user(&new_admin.email, password)
        .await
    {
        Ok(user) => {
            tracing::info!(new_user = %user.id, "Auth account created for new admin");
            Ok(Some(user.id))
        }
        Err(AuthError::MissingServiceCredential) => {
            tracing::info!("No service credential; recording a pending admin instead");
            Ok(None)
        }
        Err(e) => Err(ActionError::new(KIND, "add", e)),
    }
}

/// Remove an admin record. The auth account is left alone.
///
/// # Errors
///
/// Returns an `ActionError` if `target` is the caller or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn remove_admin(
    state: &AppState,
    identity: &Identity,
    target: UserId,
) -> Result<(), ActionError> {
    if target == identity.user_id {
        return Err(ActionError::invalid(
            KIND,
            "remove",
            "you cannot remove your own admin account",
        ));
    }

    state
        .admins()
        .delete_admin(&actor(identity), target)
        .await
        .map_err(ActionError::repo(KIND, "remove"))?;

    settle(state, KIND, "remove", &invalidation_paths()).await;
    Ok(())
}

/// Withdraw a pending invitation.
///
/// # Errors
///
/// Returns an `ActionError` if the invitation does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn remove_pending_admin(
    state: &AppState,
    identity: &Identity,
    id: PendingAdminId,
) -> Result<(), ActionError> {
    state
        .admins()
        .delete_pending(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "remove"))?;

    settle(state, KIND, "remove", &invalidation_paths()).await;
    Ok(())
}

/// Change an admin's role.
///
/// # Errors
///
/// Returns an `ActionError` if `target` is the caller or the update fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn update_admin_role(
    state: &AppState,
    identity: &Identity,
    target: UserId,
    role: AdminRole,
) -> Result<(), ActionError> {
    if target == identity.user_id {
        return Err(ActionError::invalid(
            KIND,
            "update",
            "you cannot change your own role",
        ));
    }

    state
        .admins()
        .update_role(&actor(identity), target, role)
        .await
        .map_err(ActionError::repo(KIND, "update"))?;

    settle(state, KIND, "update", &invalidation_paths()).await;
    Ok(())
}
