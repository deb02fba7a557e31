//! Project actions.

use tracing::instrument;

use opal_core::{ContentKind, ProjectId};

use super::{ActionError, DASHBOARD_PATH, actor, require, settle};
use crate::db::ProjectRepository;
use crate::models::{Identity, ProjectInput};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Project;

/// Pages that show a project.
#[must_use]
pub fn invalidation_paths(id: ProjectId) -> Vec<String> {
    vec![
        "/".to_string(),
        "/work".to_string(),
        format!("/work/{id}"),
        "/admin/projects".to_string(),
        DASHBOARD_PATH.to_string(),
    ]
}

/// Update the project `id`, or insert a new one when `id` is `None`.
///
/// # Errors
///
/// Returns an `ActionError` if required fields are missing on insert or the write fails.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn save_project(
    state: &AppState,
    identity: &Identity,
    id: Option<ProjectId>,
    input: &ProjectInput,
) -> Result<ProjectId, ActionError> {
    let repo = ProjectRepository::new(state.pool());
    let actor = actor(identity);

    let id = match id {
        Some(id) => {
            repo.update(&actor, id, input)
                .await
                .map_err(ActionError::repo(KIND, "save"))?;
            id
        }
        None => {
            require(
                KIND,
                &[
                    ("title", input.title.as_deref()),
                    ("description", input.description.as_deref()),
                    ("category", input.category.as_deref()),
                ],
            )?;
            repo.insert(&actor, input)
                .await
                .map_err(ActionError::repo(KIND, "save"))?
        }
    };

    settle(state, KIND, "save", &invalidation_paths(id)).await;
    Ok(id)
}

/// Delete a project.
///
/// # Errors
///
/// Returns an `ActionError` if the project does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_project(
    state: &AppState,
    identity: &Identity,
    id: ProjectId,
) -> Result<(), ActionError> {
    ProjectRepository::new(state.pool())
        .delete(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "delete"))?;

    settle(state, KIND, "delete", &invalidation_paths(id)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_cover_public_detail_and_admin_list() {
        let id = ProjectId::generate();
        let paths = invalidation_paths(id);
        assert!(paths.contains(&format!("/work/{id}")));
        assert!(paths.iter().any(|p| p == "/admin/projects"));
        assert!(paths.iter().any(|p| p == "/"));
    }
}
