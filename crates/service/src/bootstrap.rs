use tracing::{info, instrument};

use models::user::Role;

use crate::auth::{domain::RegisterInput, repository::AuthRepository, AuthService};
use crate::errors::ServiceError;

/// Create the configured admin account unless its email is already registered.
/// Returns the new user id when an account was created.
#[instrument(skip(auth, repo, admin), fields(email = %admin.email))]
pub async fn ensure_admin<R: AuthRepository>(
    auth: &AuthService<R>,
    repo: &R,
    admin: &configs::AdminBootstrap,
) -> Result<Option<i32>, ServiceError> {
    if repo.find_user_by_email(&admin.email).await?.is_some() {
        info!("admin account already present");
        return Ok(None);
    }
    let created = auth
        .create_account(
            RegisterInput { username: admin.username.clone(), email: admin.email.clone(), password: admin.password.clone() },
            Role::Admin,
        )
        .await?;
    info!(user_id = created.id, "admin_bootstrapped");
    Ok(Some(created.id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{repository::mock::MockAuthRepository, service::AuthConfig};

    #[tokio::test]
    async fn creates_once() {
        let repo = Arc::new(MockAuthRepository::default());
        let auth = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "s".into(), token_ttl_hours: 1 });
        let cfg = configs::AdminBootstrap { username: "root".into(), email: "root@example.com".into(), password: "RootPass1".into() };
        let id = ensure_admin(&auth, repo.as_ref(), &cfg).await.unwrap();
        assert!(id.is_some());
        let again = ensure_admin(&auth, repo.as_ref(), &cfg).await.unwrap();
        assert!(again.is_none());
        let u = repo.find_user_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(u.role, Role::Admin);
    }
}
