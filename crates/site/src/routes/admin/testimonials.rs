//! Admin testimonial pages.

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

use opal_core::{ContentKind, TestimonialId};

use super::{AdminChrome, fragment, number, optional, page, required};
use crate::actions::testimonials::{delete_testimonial, save_testimonial};
use crate::actions::{ActionError, admin_list_path};
use crate::db::TestimonialRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, set_flash};
use crate::models::{Testimonial, TestimonialInput};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::Testimonial);

#[derive(Template)]
#[template(path = "admin/testimonials/table.html")]
struct TestimonialsTable {
    testimonials: Vec<Testimonial>,
}

#[derive(Template)]
#[template(path = "admin/testimonials/index.html")]
struct TestimonialsIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestimonialForm {
    pub client_name: String,
    pub client_title: String,
    pub company_name: String,
    pub content: String,
    pub rating: String,
    pub image_url: String,
    pub order_index: String,
}

impl From<&Testimonial> for TestimonialForm {
    fn from(t: &Testimonial) -> Self {
        Self {
            client_name: t.client_name.clone(),
            client_title: t.client_title.clone().unwrap_or_default(),
            company_name: t.company_name.clone().unwrap_or_default(),
            content: t.content.clone(),
            rating: t.rating.to_string(),
            image_url: t.image_url.clone().unwrap_or_default(),
            order_index: t.order_index.to_string(),
        }
    }
}

impl TestimonialForm {
    fn into_input(self) -> std::result::Result<TestimonialInput, ActionError> {
        let invalid = |e| ActionError::invalid(ContentKind::Testimonial, "save", e);
        Ok(TestimonialInput {
            rating: number(&self.rating).map_err(invalid)?,
            order_index: number(&self.order_index).map_err(invalid)?,
            client_name: required(self.client_name),
            client_title: optional(self.client_title),
            company_name: optional(self.company_name),
            content: required(self.content),
            image_url: optional(self.image_url),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/testimonials/form.html")]
pub struct TestimonialFormTemplate {
    chrome: AdminChrome,
    form: TestimonialForm,
    id: Option<TestimonialId>,
}

/// `GET /admin/testimonials`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let table = fragment(&state, &admin, LIST_PATH, async {
        let testimonials = TestimonialRepository::new(state.pool()).list().await?;
        Ok(TestimonialsTable { testimonials }.render()?)
    })
    .await?;

    page(&TestimonialsIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/testimonials/new`
pub async fn new(RequireAdmin(admin): RequireAdmin, session: Session) -> TestimonialFormTemplate {
    TestimonialFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: TestimonialForm {
            rating: "5".to_string(),
            ..TestimonialForm::default()
        },
        id: None,
    }
}

/// `GET /admin/testimonials/{id}`
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<TestimonialId>,
) -> Result<Html<String>> {
    let testimonial = TestimonialRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("testimonial {id}")))?;

    page(&TestimonialFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: TestimonialForm::from(&testimonial),
        id: Some(id),
    })
}

/// `POST /admin/testimonials`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<TestimonialForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_testimonial(&state, &admin.identity(), None, &form.into_input()?).await?;
    set_flash(&session, "Testimonial created").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/testimonials/{id}`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<TestimonialId>,
    Form(form): Form<TestimonialForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_testimonial(&state, &admin.identity(), Some(id), &form.into_input()?).await?;
    set_flash(&session, "Testimonial saved").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/testimonials/{id}/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<TestimonialId>,
) -> std::result::Result<Redirect, ActionError> {
    delete_testimonial(&state, &admin.identity(), id).await?;
    set_flash(&session, "Testimonial deleted").await;
    Ok(Redirect::to(LIST_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parses() {
        let form = TestimonialForm {
            client_name: "Mara".to_string(),
            content: "Great work".to_string(),
            rating: "4".to_string(),
            ..TestimonialForm::default()
        };
        let input = form.into_input().unwrap();
        assert_eq!(input.rating, Some(4));
        assert_eq!(input.order_index, None);
        assert_eq!(input.company_name.as_deref(), Some(""));
    }
}
