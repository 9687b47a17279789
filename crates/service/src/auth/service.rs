use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use models::user::{self, Role};
use tracing::{debug, info, instrument};

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::password::{hash_password, validate_password, verify_password};
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl From<&configs::AuthConfig> for AuthConfig {
    fn from(c: &configs::AuthConfig) -> Self {
        Self { jwt_secret: c.jwt_secret.clone(), token_ttl_hours: c.token_ttl_hours }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.cfg.token_ttl_hours)
    }

    /// Register a new buyer with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 24 });
    /// let input = RegisterInput { username: "Test".into(), email: "user@example.com".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        self.create_account(input, Role::Buyer).await
    }

    /// Same as [`register`](Self::register) with an explicit role; used for the bootstrap admin.
    pub async fn create_account(&self, input: RegisterInput, role: Role) -> Result<AuthUser, AuthError> {
        if input.username.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("username, email and password must be required".into()));
        }
        user::validate_email(&input.email)?;
        user::validate_username(&input.username)?;
        validate_password(&input.password)?;
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let hash = hash_password(&input.password)?;
        let user = self.repo.create_user(&input.username, &input.email, hash, role).await?;
        info!(user_id = user.id, email = %user.email, role = %user.role, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 24 });
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { username: "N".into(), email: "u@e.com".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("email and password must be required".into()));
        }
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(&input.password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }

        let token = self.issue_token(&user)?;
        info!(user_id = user.id, "user_logged_in");
        Ok(AuthSession { user, token, expires_in: self.token_ttl().num_seconds() })
    }

    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (Utc::now() + self.token_ttl()).timestamp() as usize;
        let claims = Claims { sub: user.id.to_string(), username: user.username.clone(), role: user.role, exp };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Decode and validate signature and expiry of an HS256 token.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::Unauthorized
        })?;
        Ok(data.claims)
    }

    /// Replace the password after checking the current one.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(&self, user_id: i32, old_password: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let cred = self.repo.get_credentials(user_id).await?.ok_or(AuthError::NotFound)?;
        if !verify_password(old_password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        self.repo.update_password(user_id, hash_password(new_password)?).await?;
        info!(user_id, "password_changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> AuthService<MockAuthRepository> {
        AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 24 })
    }

    fn reg(email: &str, password: &str) -> RegisterInput {
        RegisterInput { username: "tester".into(), email: email.into(), password: password.into() }
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let s = svc();
        assert!(matches!(s.register(reg("bad-email", "Passw0rd!")).await, Err(AuthError::Validation(_))));
        assert!(matches!(s.register(reg("a@b.com", "short")).await, Err(AuthError::Validation(_))));
        assert!(matches!(s.register(reg("", "Passw0rd!")).await, Err(AuthError::Validation(_))));
        let u = s.register(reg("a@b.com", "Passw0rd!")).await.unwrap();
        assert_eq!(u.role, Role::Buyer);
        assert!(matches!(s.register(reg("A@B.com", "Passw0rd!")).await, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let s = svc();
        let u = s.register(reg("a@b.com", "Passw0rd!")).await.unwrap();
        let session = s.login(LoginInput { email: "a@b.com".into(), password: "Passw0rd!".into() }).await.unwrap();
        assert_eq!(session.expires_in, 24 * 3600);
        let claims = s.verify_token(&session.token).unwrap();
        assert_eq!(claims.user_id(), Some(u.id));
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.username, "tester");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let s = svc();
        s.register(reg("a@b.com", "Passw0rd!")).await.unwrap();
        let wrong = s.login(LoginInput { email: "a@b.com".into(), password: "nope-nope".into() }).await;
        let unknown = s.login(LoginInput { email: "x@b.com".into(), password: "Passw0rd!".into() }).await;
        assert!(matches!(wrong, Err(AuthError::Unauthorized)));
        assert!(matches!(unknown, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn tampered_or_foreign_tokens_rejected() {
        let s = svc();
        let other = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig { jwt_secret: "other".into(), token_ttl_hours: 24 });
        let user = AuthUser { id: 7, username: "u".into(), email: "u@e.com".into(), role: Role::Seller };
        let token = other.issue_token(&user).unwrap();
        assert!(matches!(s.verify_token(&token), Err(AuthError::Unauthorized)));
        assert!(matches!(s.verify_token("garbage"), Err(AuthError::Unauthorized)));

        let expired = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: -2 });
        let token = expired.issue_token(&user).unwrap();
        assert!(matches!(s.verify_token(&token), Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn change_password_requires_old_one() {
        let s = svc();
        let u = s.register(reg("a@b.com", "Passw0rd!")).await.unwrap();
        assert!(matches!(s.change_password(u.id, "wrong-old", "NewPassw0rd").await, Err(AuthError::Unauthorized)));
        assert!(matches!(s.change_password(u.id, "Passw0rd!", "short").await, Err(AuthError::Validation(_))));
        s.change_password(u.id, "Passw0rd!", "NewPassw0rd").await.unwrap();
        assert!(s.login(LoginInput { email: "a@b.com".into(), password: "NewPassw0rd".into() }).await.is_ok());
    }
}
