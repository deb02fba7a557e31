//! Admin project pages.

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

use opal_core::{ContentKind, ProjectId};

use super::{AdminChrome, fragment, number, optional, page, required};
use crate::actions::projects::{delete_project, save_project};
use crate::actions::{ActionError, admin_list_path};
use crate::db::ProjectRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, set_flash};
use crate::models::{Project, ProjectInput};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::Project);

#[derive(Template)]
#[template(path = "admin/projects/table.html")]
struct ProjectsTable {
    projects: Vec<Project>,
}

#[derive(Template)]
#[template(path = "admin/projects/index.html")]
struct ProjectsIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

/// Form values as strings, for both new and existing projects.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub featured_image_url: String,
    pub client_name: String,
    pub results: String,
    /// Comma-separated.
    pub technologies: String,
    pub order_index: String,
}

impl From<&Project> for ProjectForm {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            category: project.category.clone(),
            image_url: project.image_url.clone().unwrap_or_default(),
            featured_image_url: project.featured_image_url.clone().unwrap_or_default(),
            client_name: project.client_name.clone().unwrap_or_default(),
            results: project.results.clone().unwrap_or_default(),
            technologies: project.technologies.join(", "),
            order_index: project.order_index.to_string(),
        }
    }
}

impl ProjectForm {
    fn into_input(self) -> std::result::Result<ProjectInput, ActionError> {
        let order_index = number(&self.order_index)
            .map_err(|e| ActionError::invalid(ContentKind::Project, "save", e))?;
        let technologies = self
            .technologies
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ProjectInput {
            title: required(self.title),
            description: required(self.description),
            category: required(self.category),
            image_url: optional(self.image_url),
            featured_image_url: optional(self.featured_image_url),
            client_name: optional(self.client_name),
            results: optional(self.results),
            technologies: Some(technologies),
            order_index,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/projects/form.html")]
pub struct ProjectFormTemplate {
    chrome: AdminChrome,
    form: ProjectForm,
    /// `None` for a new project.
    id: Option<ProjectId>,
}

/// `GET /admin/projects`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let table = fragment(&state, &admin, LIST_PATH, async {
        let projects = ProjectRepository::new(state.pool()).list().await?;
        Ok(ProjectsTable { projects }.render()?)
    })
    .await?;

    page(&ProjectsIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/projects/new`
pub async fn new(RequireAdmin(admin): RequireAdmin, session: Session) -> ProjectFormTemplate {
    ProjectFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: ProjectForm::default(),
        id: None,
    }
}

/// `GET /admin/projects/{id}`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProjectId>,
) -> Result<Html<String>> {
    let project = ProjectRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;

    page(&ProjectFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: ProjectForm::from(&project),
        id: Some(id),
    })
}

/// `POST /admin/projects`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProjectForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_project(&state, &admin.identity(), None, &form.into_input()?).await?;
    set_flash(&session, "Project created").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/projects/{id}`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProjectId>,
    Form(form): Form<ProjectForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_project(&state, &admin.identity(), Some(id), &form.into_input()?).await?;
    set_flash(&session, "Project saved").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/projects/{id}/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProjectId>,
) -> std::result::Result<Redirect, ActionError> {
    delete_project(&state, &admin.identity(), id).await?;
    set_flash(&session, "Project deleted").await;
    Ok(Redirect::to(LIST_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_into_input() {
        let form = ProjectForm {
            title: " Atlas ".to_string(),
            description: String::new(),
            category: "Branding".to_string(),
            image_url: String::new(),
            technologies: "Figma, , Rust ,".to_string(),
            order_index: "2".to_string(),
            ..ProjectForm::default()
        };
        let input = form.into_input().unwrap();

        assert_eq!(input.title.as_deref(), Some("Atlas"));
        assert_eq!(input.description, None);
        assert_eq!(input.image_url.as_deref(), Some(""));
        assert_eq!(input.technologies.unwrap(), vec!["Figma", "Rust"]);
        assert_eq!(input.order_index, Some(2));
    }

    #[test]
    fn test_form_rejects_bad_order() {
        let form = ProjectForm {
            order_index: "first".to_string(),
            ..ProjectForm::default()
        };
        assert!(form.into_input().is_err());
    }
}
