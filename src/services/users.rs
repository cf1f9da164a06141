//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::user::{
        AccessToken, CreateGroup, Group, Permission, RegisterUser, TokenPair, TokenType, User, UserClaims,
        UserDetail,
    },
    repository::{users::NewUser, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Signing secret for bearer tokens
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }

    /// Register a new account with no permissions
    pub async fn register(&self, data: RegisterUser) -> AppResult<User> {
        if self.repository.users.username_exists(&data.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password(&data.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                username: &data.username,
                email: &data.email,
                first_name: data.first_name.as_deref(),
                last_name: data.last_name.as_deref(),
                password_hash: &password_hash,
                is_superuser: false,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Current user with effective permissions
    pub async fn me(&self, user_id: i32) -> AppResult<UserDetail> {
        let user = self.repository.users.get_by_id(user_id).await?;
        let permissions = if user.is_superuser {
            Vec::new()
        } else {
            self.repository.users.get_permissions(user.id).await?
        };

        Ok(UserDetail {
            id: user.id,
            username: user.username,
            email: user.email,
            is_superuser: user.is_superuser,
            permissions,
        })
    }

    /// Authenticate by username and password and issue a token pair
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self.repository.users.get_by_username(username).await?;

        let verified = verify_login(user.as_ref().map(|u| u.password.as_str()), password)?;
        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::warn!(username = %username, "Failed login attempt");
                return Err(AppError::Authentication("Invalid username or password".to_string()));
            }
        };
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        let access = self.issue(&user, TokenType::Access).await?;
        let refresh = self.issue(&user, TokenType::Refresh).await?;

        tracing::info!(user_id = user.id, username = %user.username, "User logged in");
        Ok(TokenPair { access, refresh })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The user is read again so deactivation and permission changes apply.
    pub async fn refresh(&self, token: &str) -> AppResult<AccessToken> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired refresh token".to_string()))?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("Not a refresh token".to_string()));
        }

        let user = self
            .repository
            .users
            .get_by_id(claims.user_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Authentication("User no longer exists".to_string()),
                other => other,
            })?;
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        Ok(AccessToken {
            access: self.issue(&user, TokenType::Access).await?,
        })
    }

    async fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let permissions = if user.is_superuser || token_type == TokenType::Refresh {
            Vec::new()
        } else {
            self.repository.users.get_permissions(user.id).await?
        };

        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => Duration::hours(self.config.refresh_token_hours),
        };
        let now = Utc::now();

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            is_superuser: user.is_superuser,
            permissions,
            token_type,
            jti: Uuid::new_v4(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Replace the direct permissions of a user
    pub async fn set_user_permissions(&self, user_id: i32, permissions: &[Permission]) -> AppResult<UserDetail> {
        self.repository.users.set_permissions(user_id, permissions).await?;
        tracing::info!(user_id, count = permissions.len(), "User permissions replaced");
        self.me(user_id).await
    }

    /// Replace the group memberships of a user
    pub async fn set_user_groups(&self, user_id: i32, group_ids: &[i32]) -> AppResult<UserDetail> {
        self.repository.users.set_groups(user_id, group_ids).await?;
        tracing::info!(user_id, count = group_ids.len(), "User groups replaced");
        self.me(user_id).await
    }

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        self.repository.users.list_groups().await
    }

    pub async fn create_group(&self, data: CreateGroup) -> AppResult<Group> {
        let id = self
            .repository
            .users
            .create_group(&data.name, &data.permissions)
            .await?;
        tracing::info!(group_id = id, name = %data.name, "Group created");
        self.repository.users.get_group(id).await
    }

    pub async fn set_group_permissions(&self, group_id: i32, permissions: &[Permission]) -> AppResult<Group> {
        self.repository
            .users
            .set_group_permissions(group_id, permissions)
            .await?;
        tracing::info!(group_id, count = permissions.len(), "Group permissions replaced");
        self.repository.users.get_group(group_id).await
    }

    /// Create the configured superuser when the database has none
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<Option<User>> {
        let (Some(username), Some(password)) = (
            bootstrap.admin_username.as_deref(),
            bootstrap.admin_password.as_deref(),
        ) else {
            return Ok(None);
        };

        if self.repository.users.superuser_exists().await? {
            return Ok(None);
        }
        if self.repository.users.username_exists(username).await? {
            tracing::warn!(username = %username, "Bootstrap admin name is taken by a regular user");
            return Ok(None);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                username,
                email: bootstrap.admin_email.as_deref().unwrap_or(""),
                first_name: None,
                last_name: None,
                password_hash: &password_hash,
                is_superuser: true,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap superuser created");
        Ok(Some(user))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Verify a login attempt. Unknown users are checked against a dummy hash so
/// both paths cost one Argon2 verification.
fn verify_login(stored_hash: Option<&str>, password: &str) -> AppResult<bool> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    match stored_hash {
        Some(hash) => verify_password(hash, password),
        None => {
            let dummy = DUMMY_HASH.get_or_init(|| hash_password("toolcrib-unknown-user").ok());
            if let Some(hash) = dummy {
                verify_password(hash, password)?;
            }
            Ok(false)
        }
    }
}
