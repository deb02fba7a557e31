//! Admin service pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use opal_core::{ContentKind, ServiceId};

use super::{AdminChrome, fragment, number, optional, page, required};
use crate::actions::services::{delete_service, save_service};
use crate::actions::{ActionError, admin_list_path};
use crate::db::ServiceRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, set_flash};
use crate::models::{Service, ServiceInput};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::Service);

#[derive(Template)]
#[template(path = "admin/services/table.html")]
struct ServicesTable {
    services: Vec<Service>,
}

#[derive(Template)]
#[template(path = "admin/services/index.html")]
struct ServicesIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceForm {
    pub title: String,
    pub description: String,
    pub icon_url: String,
    pub order_index: String,
}

impl From<&Service> for ServiceForm {
    fn from(service: &Service) -> Self {
        Self {
            title: service.title.clone(),
            description: service.description.clone(),
            icon_url: service.icon_url.clone().unwrap_or_default(),
            order_index: service.order_index.to_string(),
        }
    }
}

impl ServiceForm {
    fn into_input(self) -> std::result::Result<ServiceInput, ActionError> {
        Ok(ServiceInput {
            order_index: number(&self.order_index)
                .map_err(|e| ActionError::invalid(ContentKind::Service, "save", e))?,
            title: required(self.title),
            description: required(self.description),
            icon_url: optional(self.icon_url),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/services/form.html")]
pub struct ServiceFormTemplate {
    chrome: AdminChrome,
    form: ServiceForm,
    id: Option<ServiceId>,
}

/// `GET /admin/services`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let table = fragment(&state, &admin, LIST_PATH, async {
        let services = ServiceRepository::new(state.pool()).list().await?;
        Ok(ServicesTable { services }.render()?)
    })
    .await?;

    page(&ServicesIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/services/new`
pub async fn new(RequireAdmin(admin): RequireAdmin, session: Session) -> ServiceFormTemplate {
    ServiceFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: ServiceForm::default(),
        id: None,
    }
}

/// `GET /admin/services/{id}`
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ServiceId>,
) -> Result<Html<String>> {
    let service = ServiceRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;

    page(&ServiceFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: ServiceForm::from(&service),
        id: Some(id),
    })
}

/// `POST /admin/services`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ServiceForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_service(&state, &admin.identity(), None, &form.into_input()?).await?;
    set_flash(&session, "Service created").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/services/{id}`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ServiceId>,
    Form(form): Form<ServiceForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_service(&state, &admin.identity(), Some(id), &form.into_input()?).await?;
    set_flash(&session, "Service saved").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/services/{id}/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ServiceId>,
) -> std::result::Result<Redirect, ActionError> {
    delete_service(&state, &admin.identity(), id).await?;
    set_flash(&session, "Service deleted").await;
    Ok(Redirect::to(LIST_PATH))
}
