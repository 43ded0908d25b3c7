use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::User;
use crate::error::RepoError;

/// User account repository.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user. Fails with a constraint error if the email is taken.
    async fn insert(&self, user: User) -> Result<User, RepoError>;
}
