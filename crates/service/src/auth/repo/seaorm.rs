use chrono::Utc;
use models::user::{self, Role};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

#[derive(Clone)]
pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_auth_user(u: user::Model) -> AuthUser {
    AuthUser { id: u.id, username: u.username, email: u.email, role: u.role }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = user::find_by_email(&self.db, email).await?;
        Ok(res.map(to_auth_user))
    }

    async fn create_user(&self, username: &str, email: &str, password_hash: String, role: Role) -> Result<AuthUser, AuthError> {
        let created = user::create(&self.db, user::NewUser { username, email, password_hash, role }).await?;
        Ok(to_auth_user(created))
    }

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
        let res = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|u| Credentials { user_id: u.id, password_hash: u.password_hash }))
    }

    async fn update_password(&self, user_id: i32, password_hash: String) -> Result<(), AuthError> {
        let found = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?
            .ok_or(AuthError::NotFound)?;
        let mut am: user::ActiveModel = found.into();
        am.password_hash = Set(password_hash);
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await.map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn second_account_with_same_email_is_a_conflict() {
        let repo = SeaOrmAuthRepository::new(get_db().await.unwrap());
        repo.create_user("ann", "ann@example.com", "h".into(), Role::Buyer).await.unwrap();
        let again = repo.create_user("ann2", "ann@example.com", "h".into(), Role::Buyer).await;
        assert!(matches!(again, Err(AuthError::Conflict)));
    }
}
