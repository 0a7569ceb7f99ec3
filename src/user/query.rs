//! Read-side helpers for the user aggregate.

use serde::Serialize;
use uuid::Uuid;

use crate::bus::{Context, HandlerError};
use crate::error::RepositoryError;

use super::repository::{User, UserRepository};

/// Smallest page size `list_users` will use.
pub const MIN_PAGE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

pub fn get_user(repo: &dyn UserRepository, id: Uuid) -> Result<User, HandlerError> {
    repo.get(id)?
        .ok_or_else(|| HandlerError::NotFound(format!("user {}", id)))
}

/// The user the context's identity belongs to.
pub fn me(ctx: &Context, repo: &dyn UserRepository) -> Result<User, HandlerError> {
    let identity = ctx
        .identity()
        .ok_or_else(|| HandlerError::Unauthorized("missing identity in context".into()))?;
    get_user(repo, identity.id)
}

/// One page of users. `page` counts from 1 (0 is treated as 1) and `limit`
/// never drops below `MIN_PAGE_LIMIT`. A page past the end is empty but
/// still reports the total.
pub fn list_users(
    repo: &dyn UserRepository,
    page: usize,
    limit: usize,
) -> Result<UserPage, RepositoryError> {
    let page = page.max(1);
    let limit = limit.max(MIN_PAGE_LIMIT);
    let total = repo.count()?;
    let offset = (page - 1).saturating_mul(limit);

    let users = if total == 0 || offset >= total {
        Vec::new()
    } else {
        repo.find_all(limit, offset)?
    };

    Ok(UserPage {
        users,
        page,
        limit,
        total,
    })
}
