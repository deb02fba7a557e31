//! Blog post actions.
//!
//! A save may change a post's slug, so both the old and the new public
//! detail pages are invalidated.

use tracing::instrument;

use opal_core::{BlogPostId, ContentKind};

use super::{ActionError, DASHBOARD_PATH, actor, require, settle};
use crate::db::BlogPostRepository;
use crate::models::{BlogPostInput, Identity};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::BlogPost;

/// Pages that show a post, before and after a slug change.
#[must_use]
pub fn invalidation_paths(previous_slug: Option<&str>, current_slug: &str) -> Vec<String> {
    let mut paths = vec!["/blog".to_string(), format!("/blog/{current_slug}")];
    if let Some(previous) = previous_slug.filter(|p| *p != current_slug) {
        paths.push(format!("/blog/{previous}"));
    }
    paths.push("/admin/blog".to_string());
    paths.push(DASHBOARD_PATH.to_string());
    paths
}

/// Update the post `id`, or insert a new one when `id` is `None`.
///
/// # Errors
///
/// Returns an `ActionError` if the title is missing on insert, the slug is
/// taken, or the write fails.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn save_blog_post(
    state: &AppState,
    identity: &Identity,
    id: Option<BlogPostId>,
    input: &BlogPostInput,
) -> Result<BlogPostId, ActionError> {
    let repo = BlogPostRepository::new(state.pool());
    let actor = actor(identity);

    let (id, paths) = if let Some(id) = id {
        let change = repo
            .update(&actor, id, input)
            .await
            .map_err(ActionError::repo(KIND, "save"))?;
        (
            id,
            invalidation_paths(change.previous.as_deref(), &change.current),
        )
    } else {
        require(KIND, &[("title", input.title.as_deref())])?;
        let (id, slug) = repo
            .insert(&actor, input)
            .await
            .map_err(ActionError::repo(KIND, "save"))?;
        (id, invalidation_paths(None, &slug))
    };

    settle(state, KIND, "save", &paths).await;
    Ok(id)
}

/// Delete a post.
///
/// # Errors
///
/// Returns an `ActionError` if the post does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_blog_post(
    state: &AppState,
    identity: &Identity,
    id: BlogPostId,
) -> Result<(), ActionError> {
    let slug = BlogPostRepository::new(state.pool())
        .delete(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "delete"))?;

    settle(state, KIND, "delete", &invalidation_paths(None, &slug)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_change_invalidates_both_slugs() {
        let paths = invalidation_paths(Some("old-title"), "new-title");
        assert!(paths.iter().any(|p| p == "/blog/old-title"));
        assert!(paths.iter().any(|p| p == "/blog/new-title"));
        assert!(paths.iter().any(|p| p == "/admin/blog"));
    }

    #[test]
    fn test_unchanged_slug_listed_once() {
        let paths = invalidation_paths(Some("same"), "same");
        assert_eq!(paths.iter().filter(|p| *p == "/blog/same").count(), 1);
    }
}
