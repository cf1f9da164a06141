//! User model, permissions and token claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Capabilities that can be granted to users directly or through groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "inventory.dashboard")]
    Dashboard,
    #[serde(rename = "inventory.manage_tools")]
    ManageTools,
    #[serde(rename = "inventory.virtual_warehouse")]
    VirtualWarehouse,
    #[serde(rename = "inventory.register_loan")]
    RegisterLoan,
    #[serde(rename = "inventory.active_loans")]
    ActiveLoans,
    #[serde(rename = "inventory.history")]
    History,
    #[serde(rename = "inventory.analytics")]
    Analytics,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::Dashboard,
        Permission::ManageTools,
        Permission::VirtualWarehouse,
        Permission::RegisterLoan,
        Permission::ActiveLoans,
        Permission::History,
        Permission::Analytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Dashboard => "inventory.dashboard",
            Permission::ManageTools => "inventory.manage_tools",
            Permission::VirtualWarehouse => "inventory.virtual_warehouse",
            Permission::RegisterLoan => "inventory.register_loan",
            Permission::ActiveLoans => "inventory.active_loans",
            Permission::History => "inventory.history",
            Permission::Analytics => "inventory.analytics",
        }
    }

    /// Parse stored codenames, skipping any this build does not know
    pub fn parse_all<I, S>(codenames: I) -> Vec<Permission>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codenames
            .into_iter()
            .filter_map(|c| c.as_ref().parse().ok())
            .collect()
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Invalid permission: {}", s))
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Current user with effective permissions
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDetail {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    /// Direct grants and group grants, deduplicated. Empty for superusers.
    pub permissions: Vec<Permission>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Group row
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            permissions: Permission::parse_all(&row.permissions),
        }
    }
}

/// Permission group
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<Permission>,
}

/// Create group request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 150, message = "Group name must be 1-150 characters"))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Replace a permission set
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPermissions {
    pub permissions: Vec<Permission>,
}

/// Replace group memberships
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetGroups {
    pub group_ids: Vec<i32>,
}

/// Token request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Access and refresh tokens issued at login
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Access token issued on refresh
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessToken {
    pub access: String,
}

/// Kind of bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub token_type: TokenType,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_superuser || self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Missing permission {}",
                permission
            )))
        }
    }

    /// Require at least one of the given permissions
    pub fn require_any(&self, permissions: &[Permission]) -> Result<(), AppError> {
        if permissions.iter().any(|p| self.has_permission(*p)) {
            return Ok(());
        }
        let names: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
        Err(AppError::Authorization(format!(
            "Missing one of permissions {}",
            names.join(", ")
        )))
    }

    /// Require superuser privileges
    pub fn require_superuser(&self) -> Result<(), AppError> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}
