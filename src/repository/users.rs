//! Users, groups and permission grants

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{Group, GroupRow, Permission, User},
};

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name,
           COALESCE(
               array_agg(gp.permission::text ORDER BY gp.permission)
                   FILTER (WHERE gp.permission IS NOT NULL),
               ARRAY[]::text[]
           ) AS permissions
    FROM groups g
    LEFT JOIN group_permissions gp ON gp.group_id = g.id
"#;

/// Fields of a user about to be inserted
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub password_hash: &'a str,
    pub is_superuser: bool,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Get user by username, case-insensitive
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn superuser_exists(&self) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE is_superuser)")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a user
    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::unique_violation(e, format!("Username {} already exists", user.username))
        })?;
        Ok(created)
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Effective permissions: direct grants united with grants of every group
    /// the user belongs to
    pub async fn get_permissions(&self, user_id: i32) -> AppResult<Vec<Permission>> {
        let codenames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT permission::text FROM user_permissions WHERE user_id = $1
            UNION
            SELECT gp.permission::text
            FROM group_permissions gp
            JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Permission::parse_all(codenames))
    }

    /// Replace the direct permission grants of a user
    pub async fn set_permissions(&self, user_id: i32, permissions: &[Permission]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for permission in permissions {
            sqlx::query(
                "INSERT INTO user_permissions (user_id, permission) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(permission.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace the group memberships of a user
    pub async fn set_groups(&self, user_id: i32, group_ids: &[i32]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE id = ANY($1)")
            .bind(group_ids)
            .fetch_one(&mut *tx)
            .await?;
        let mut requested = group_ids.to_vec();
        requested.sort_unstable();
        requested.dedup();
        if known != requested.len() as i64 {
            return Err(AppError::NotFound("One or more groups not found".to_string()));
        }

        sqlx::query("DELETE FROM user_groups WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for group_id in requested {
            sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List groups with their permissions
    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(&format!("{} GROUP BY g.id ORDER BY g.name", GROUP_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    /// Get group by ID
    pub async fn get_group(&self, id: i32) -> AppResult<Group> {
        sqlx::query_as::<_, GroupRow>(&format!("{} WHERE g.id = $1 GROUP BY g.id", GROUP_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Group::from)
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))
    }

    /// Create a group with an initial permission set
    pub async fn create_group(&self, name: &str, permissions: &[Permission]) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE name = $1)")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        if exists {
            return Err(AppError::Conflict(format!("Group {} already exists", name)));
        }

        let id: i32 = sqlx::query_scalar("INSERT INTO groups (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::unique_violation(e, format!("Group {} already exists", name)))?;

        for permission in permissions {
            sqlx::query(
                "INSERT INTO group_permissions (group_id, permission) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(permission.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Replace the permissions of a group
    pub async fn set_group_permissions(&self, group_id: i32, permissions: &[Permission]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE id = $1)")
            .bind(group_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Group {} not found", group_id)));
        }

        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        for permission in permissions {
            sqlx::query(
                "INSERT INTO group_permissions (group_id, permission) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(group_id)
            .bind(permission.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
