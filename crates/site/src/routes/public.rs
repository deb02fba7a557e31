//! Public page handlers.
//!
//! Every page is rendered once and served from the [`PageCache`] under its
//! own path until an action invalidates it or the TTL expires.
//!
//! [`PageCache`]: crate::cache::PageCache

use askama::Template;
use axum::{
    extract::{Path, State},
    response::Html,
};
use comrak::{Options, markdown_to_html};
use tracing::instrument;

use opal_core::ProjectId;

use crate::db::{
    BlogPostRepository, ProjectRepository, ServiceRepository, SettingsRepository, TeamRepository,
    TestimonialRepository,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{BlogPost, Project, Service, SettingKey, TeamMember, Testimonial};
use crate::state::AppState;

/// Projects shown on the home page.
const FEATURED_PROJECTS: i64 = 6;

/// Fallback for the about page before the text has been set.
const DEFAULT_ABOUT: &str = "Opal is an independent design studio building brands, \
     products and digital experiences for ambitious teams.";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "public/home.html")]
struct HomeTemplate {
    hero_images: Vec<String>,
    services: Vec<Service>,
    projects: Vec<Project>,
    testimonials: Vec<Testimonial>,
}

#[derive(Template)]
#[template(path = "public/about.html")]
struct AboutTemplate {
    paragraphs: Vec<String>,
    services: Vec<Service>,
}

#[derive(Template)]
#[template(path = "public/services.html")]
struct ServicesTemplate {
    services: Vec<Service>,
}

#[derive(Template)]
#[template(path = "public/work/index.html")]
struct WorkIndexTemplate {
    categories: Vec<String>,
    projects: Vec<Project>,
}

#[derive(Template)]
#[template(path = "public/work/show.html")]
struct WorkShowTemplate {
    project: Project,
}

#[derive(Template)]
#[template(path = "public/blog/index.html")]
struct BlogIndexTemplate {
    posts: Vec<BlogPost>,
}

#[derive(Template)]
#[template(path = "public/blog/show.html")]
struct BlogShowTemplate {
    post: BlogPost,
    content_html: String,
}

#[derive(Template)]
#[template(path = "public/team.html")]
struct TeamTemplate {
    members: Vec<TeamMember>,
}

#[derive(Template)]
#[template(path = "public/contact.html")]
struct ContactTemplate {
    contact_email: Option<String>,
    contact_phone: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve `path` from the page cache, rendering it with `render` on a miss.
async fn cached<F>(state: &AppState, path: &str, render: F) -> Result<Html<String>>
where
    F: Future<Output = Result<String>>,
{
    let page = state.pages().get_or_render(path, render).await?;
    Ok(Html(page.as_ref().clone()))
}

/// `GET /`
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/", async {
        let pool = state.pool();
        let services = ServiceRepository::new(pool);
        let projects = ProjectRepository::new(pool);
        let testimonials = TestimonialRepository::new(pool);
        let settings = SettingsRepository::new(pool);
        let (services, projects, testimonials, settings) = tokio::try_join!(
            services.list(),
            projects.list_featured(FEATURED_PROJECTS),
            testimonials.list(),
            settings.load(),
        )?;

        Ok(HomeTemplate {
            hero_images: settings.hero_images(),
            services,
            projects,
            testimonials,
        }
        .render()?)
    })
    .await
}

/// `GET /about`
#[instrument(skip(state))]
pub async fn about(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/about", async {
        let pool = state.pool();
        let settings = SettingsRepository::new(pool);
        let services = ServiceRepository::new(pool);
        let (settings, services) = tokio::try_join!(settings.load(), services.list())?;

        let about = settings.get(SettingKey::AboutText).unwrap_or(DEFAULT_ABOUT);
        Ok(AboutTemplate {
            paragraphs: paragraphs(about),
            services,
        }
        .render()?)
    })
    .await
}

/// `GET /services`
#[instrument(skip(state))]
pub async fn services(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/services", async {
        let services = ServiceRepository::new(state.pool()).list().await?;
        Ok(ServicesTemplate { services }.render()?)
    })
    .await
}

/// `GET /work`
#[instrument(skip(state))]
pub async fn work_index(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/work", async {
        let projects = ProjectRepository::new(state.pool()).list().await?;
        Ok(WorkIndexTemplate {
            categories: categories(&projects),
            projects,
        }
        .render()?)
    })
    .await
}

/// `GET /work/{id}`
///
/// # Errors
///
/// Returns 404 for a malformed or unknown id.
#[instrument(skip(state))]
pub async fn work_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id: ProjectId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("project {id}")))?;

    cached(&state, &format!("/work/{id}"), async {
        let project = ProjectRepository::new(state.pool())
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;
        Ok(WorkShowTemplate { project }.render()?)
    })
    .await
}

/// `GET /blog`
#[instrument(skip(state))]
pub async fn blog_index(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/blog", async {
        let posts = BlogPostRepository::new(state.pool()).list_published().await?;
        Ok(BlogIndexTemplate { posts }.render()?)
    })
    .await
}

/// `GET /blog/{slug}`
///
/// # Errors
///
/// Returns 404 if the post does not exist or is a draft.
#[instrument(skip(state))]
pub async fn blog_show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>> {
    cached(&state, &format!("/blog/{slug}"), async {
        let post = BlogPostRepository::new(state.pool())
            .get_published_by_slug(&slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {slug}")))?;

        let content_html = render_markdown(&post.content);
        Ok(BlogShowTemplate { post, content_html }.render()?)
    })
    .await
}

/// `GET /team`
#[instrument(skip(state))]
pub async fn team(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/team", async {
        let members = TeamRepository::new(state.pool()).list().await?;
        Ok(TeamTemplate { members }.render()?)
    })
    .await
}

/// `GET /contact`
#[instrument(skip(state))]
pub async fn contact(State(state): State<AppState>) -> Result<Html<String>> {
    cached(&state, "/contact", async {
        let settings = SettingsRepository::new(state.pool()).load().await?;
        Ok(ContactTemplate {
            contact_email: settings.get(SettingKey::ContactEmail).map(str::to_string),
            contact_phone: settings.get(SettingKey::ContactPhone).map(str::to_string),
        }
        .render()?)
    })
    .await
}

// =============================================================================
// Helpers
// =============================================================================

/// Render blog markdown with GitHub-flavoured extensions.
///
/// Raw HTML in the source is escaped.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(content, &options)
}

/// Distinct project categories in first-seen order.
fn categories(projects: &[Project]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for project in projects {
        if !seen.iter().any(|c| c == &project.category) {
            seen.push(project.category.clone());
        }
    }
    seen
}

/// Split stored text into paragraphs on blank lines.
fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn project(category: &str) -> Project {
        Project {
            id: ProjectId::generate(),
            title: "Atlas".to_string(),
            description: "Rebrand".to_string(),
            category: category.to_string(),
            image_url: None,
            featured_image_url: None,
            client_name: None,
            results: None,
            technologies: vec![],
            order_index: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_categories_dedupes_in_order() {
        let projects = [project("Branding"), project("Web"), project("Branding")];
        assert_eq!(categories(&projects), vec!["Branding", "Web"]);
    }

    #[test]
    fn test_render_markdown_escapes_raw_html() {
        let html = render_markdown("# Hello\n\n<script>alert(1)</script>\n\n~~old~~");
        assert!(html.contains("<h1>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(
            paragraphs("First.\n\n\n  Second line.  \n\n"),
            vec!["First.", "Second line."]
        );
    }
}
