//! Admin roster pages (super admins only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use opal_core::{AdminRole, ContentKind, Email, PendingAdminId, UserId};

use super::{AdminChrome, fragment, page, required};
use crate::actions::admins::{
    AddAdminOutcome, add_admin, remove_admin, remove_pending_admin, update_admin_role,
};
use crate::actions::{ActionError, admin_list_path};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireSuperAdmin, set_flash};
use crate::models::{Admin, NewAdmin, PendingAdmin};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::Admin);
const ROLES: [AdminRole; 2] = [AdminRole::Admin, AdminRole::SuperAdmin];

#[derive(Template)]
#[template(path = "admin/admins/table.html")]
struct AdminsTable {
    admins: Vec<Admin>,
    pending: Vec<PendingAdmin>,
    roles: [AdminRole; 2],
}

#[derive(Template)]
#[template(path = "admin/admins/index.html")]
struct AdminsIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/admins/new.html")]
pub struct NewAdminTemplate {
    chrome: AdminChrome,
    roles: [AdminRole; 2],
}

/// Add-admin form. A blank password records a pending admin.
#[derive(Deserialize)]
pub struct NewAdminForm {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(default)]
    pub password: String,
}

impl NewAdminForm {
    fn into_new_admin(self) -> std::result::Result<NewAdmin, ActionError> {
        let email = Email::parse(&self.email).map_err(|_| {
            ActionError::invalid(ContentKind::Admin, "add", "invalid email address")
        })?;
        Ok(NewAdmin {
            email,
            first_name: required(self.first_name),
            last_name: required(self.last_name),
            role: self.role,
            password: (!self.password.is_empty()).then(|| SecretString::from(self.password)),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: AdminRole,
}

/// `GET /admin/admins`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let table = fragment(&state, &admin, LIST_PATH, async {
        let (admins, pending) = tokio::try_join!(
            state.admins().list_admins(),
            state.admins().list_pending(),
        )?;
        Ok(AdminsTable {
            admins,
            pending,
            roles: ROLES,
        }
        .render()?)
    })
    .await?;

    page(&AdminsIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/admins/new`
pub async fn new(RequireSuperAdmin(admin): RequireSuperAdmin, session: Session) -> NewAdminTemplate {
    NewAdminTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        roles: ROLES,
    }
}

/// `POST /admin/admins`
pub async fn create(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<NewAdminForm>,
) -> std::result::Result<Redirect, ActionError> {
    let new_admin = form.into_new_admin()?;
    let notice = match add_admin(&state, &admin.identity(), &new_admin).await? {
        AddAdminOutcome::Admin(_) => format!("{} is now an admin", new_admin.email),
        AddAdminOutcome::Pending(_) => format!(
            "{} will become an admin after signing in for the first time",
            new_admin.email
        ),
    };
    set_flash(&session, notice).await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/admins/{id}/role`
pub async fn update_role(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> std::result::Result<Redirect, ActionError> {
    update_admin_role(&state, &admin.identity(), id, form.role).await?;
    set_flash(&session, "Role updated").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/admins/{id}/delete`
pub async fn delete(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<UserId>,
) -> std::result::Result<Redirect, ActionError> {
    remove_admin(&state, &admin.identity(), id).await?;
    set_flash(&session, "Admin removed").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/admins/pending/{id}/delete`
pub async fn delete_pending(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<PendingAdminId>,
) -> std::result::Result<Redirect, ActionError> {
    remove_pending_admin(&state, &admin.identity(), id).await?;
    set_flash(&session, "Invitation withdrawn").await;
    Ok(Redirect::to(LIST_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str) -> NewAdminForm {
        NewAdminForm {
            email: email.to_string(),
            first_name: " Ada ".to_string(),
            last_name: String::new(),
            role: AdminRole::SuperAdmin,
            password: password.to_string(),
        }
    }

    #[test]
    fn test_blank_password_means_pending() {
        let new_admin = form("ada@opal.studio", "").into_new_admin().unwrap();
        assert!(new_admin.password.is_none());
        assert_eq!(new_admin.first_name.as_deref(), Some("Ada"));
        assert_eq!(new_admin.last_name, None);
        assert_eq!(new_admin.role, AdminRole::SuperAdmin);
    }

    #[test]
    fn test_password_kept() {
        let new_admin = form("ada@opal.studio", "hunter22!").into_new_admin().unwrap();
        assert!(new_admin.password.is_some());
    }

    #[test]
    fn test_bad_email_rejected() {
        let err = form("not-an-email", "").into_new_admin().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
