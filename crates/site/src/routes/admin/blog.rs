//! Admin blog pages.
//!
//! Unlike the public blog, these list drafts too, so reads go through the
//! admin's row-level security scope.

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

use opal_core::{BlogPostId, ContentKind};

use super::{AdminChrome, fragment, optional, page, required};
use crate::actions::blog::{delete_blog_post, save_blog_post};
use crate::actions::{ActionError, admin_list_path};
use crate::db::{Actor, BlogPostRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, set_flash};
use crate::models::{BlogPost, BlogPostInput};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::BlogPost);

#[derive(Template)]
#[template(path = "admin/blog/table.html")]
struct PostsTable {
    posts: Vec<BlogPost>,
}

#[derive(Template)]
#[template(path = "admin/blog/index.html")]
struct BlogIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogPostForm {
    pub title: String,
    /// Blank derives the slug from the title.
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image_url: String,
    /// Checkbox: present when ticked.
    pub published: Option<String>,
}

impl From<&BlogPost> for BlogPostForm {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone().unwrap_or_default(),
            featured_image_url: post.featured_image_url.clone().unwrap_or_default(),
            published: post.published.then(|| "on".to_string()),
        }
    }
}

impl BlogPostForm {
    fn is_published(&self) -> bool {
        self.published.is_some()
    }

    fn into_input(self) -> BlogPostInput {
        BlogPostInput {
            published: Some(self.is_published()),
            title: required(self.title),
            slug: required(self.slug),
            content: optional(self.content),
            excerpt: optional(self.excerpt),
            featured_image_url: optional(self.featured_image_url),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/blog/form.html")]
pub struct BlogPostFormTemplate {
    chrome: AdminChrome,
    form: BlogPostForm,
    id: Option<BlogPostId>,
}

/// `GET /admin/blog`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let actor = Actor::Authenticated(admin.identity());

    let table = fragment(&state, &admin, LIST_PATH, async {
        let posts = BlogPostRepository::new(state.pool()).list_all(&actor).await?;
        Ok(PostsTable { posts }.render()?)
    })
    .await?;

    page(&BlogIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/blog/new`
pub async fn new(RequireAdmin(admin): RequireAdmin, session: Session) -> BlogPostFormTemplate {
    BlogPostFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: BlogPostForm::default(),
        id: None,
    }
}

/// `GET /admin/blog/{id}`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BlogPostId>,
) -> Result<Html<String>> {
    let post = BlogPostRepository::new(state.pool())
        .get(&Actor::Authenticated(admin.identity()), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("blog post {id}")))?;

    page(&BlogPostFormTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        form: BlogPostForm::from(&post),
        id: Some(id),
    })
}

/// `POST /admin/blog`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<BlogPostForm>,
) -> std::result::Result<Redirect, ActionError> {
    let notice = if form.is_published() {
        "Post published"
    } else {
        "Draft saved"
    };
    save_blog_post(&state, &admin.identity(), None, &form.into_input()).await?;
    set_flash(&session, notice).await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/blog/{id}`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BlogPostId>,
    Form(form): Form<BlogPostForm>,
) -> std::result::Result<Redirect, ActionError> {
    save_blog_post(&state, &admin.identity(), Some(id), &form.into_input()).await?;
    set_flash(&session, "Post saved").await;
    Ok(Redirect::to(LIST_PATH))
}

/// `POST /admin/blog/{id}/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BlogPostId>,
) -> std::result::Result<Redirect, ActionError> {
    delete_blog_post(&state, &admin.identity(), id).await?;
    set_flash(&session, "Post deleted").await;
    Ok(Redirect::to(LIST_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unticked_checkbox_unpublishes() {
        let form = BlogPostForm {
            title: "Launch notes".to_string(),
            ..BlogPostForm::default()
        };
        let input = form.into_input();
        assert_eq!(input.published, Some(false));
        assert_eq!(input.slug, None);
    }

    #[test]
    fn test_ticked_checkbox_publishes() {
        let form = BlogPostForm {
            published: Some("on".to_string()),
            ..BlogPostForm::default()
        };
        assert_eq!(form.into_input().published, Some(true));
    }
}
