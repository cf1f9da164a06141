//! Tools repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    ledger,
    models::tool::{Tool, ToolDraft, ToolRow},
};

const TOOL_SELECT: &str = r#"
    SELECT t.*,
           COALESCE((
               SELECT SUM(l.quantity)
               FROM loans l
               WHERE l.tool_id = t.id AND l.returned_date IS NULL
           ), 0)::bigint AS borrowed_quantity
    FROM tools t
"#;

/// Lock a tool row for the rest of the transaction and read its stock.
///
/// Every loan mutation that consumes stock goes through this lock, so two
/// borrow requests on the same tool are serialized.
pub(crate) async fn lock_tool(conn: &mut PgConnection, id: i32) -> AppResult<Tool> {
    let mut row = sqlx::query_as::<_, ToolRow>("SELECT * FROM tools WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tool {} not found", id)))?;

    row.borrowed_quantity = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::bigint FROM loans WHERE tool_id = $1 AND returned_date IS NULL",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

#[derive(Clone)]
pub struct ToolsRepository {
    pool: Pool<Postgres>,
}

impl ToolsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all tools
    pub async fn list(&self) -> AppResult<Vec<Tool>> {
        let rows = sqlx::query_as::<_, ToolRow>(&format!("{} ORDER BY t.name, t.id", TOOL_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Tool::from).collect())
    }

    /// Get tool by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Tool> {
        sqlx::query_as::<_, ToolRow>(&format!("{} WHERE t.id = $1", TOOL_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Tool::from)
            .ok_or_else(|| AppError::NotFound(format!("Tool {} not found", id)))
    }

    /// Create a tool from a checked draft
    pub async fn create(&self, draft: &ToolDraft) -> AppResult<Tool> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            INSERT INTO tools (
                name, description, total_quantity, condition, unit_value,
                acquisition_date, maintenance_cost, last_maintenance_date,
                next_maintenance_date, supplier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *, 0::bigint AS borrowed_quantity
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.total_quantity)
        .bind(draft.condition)
        .bind(draft.unit_value)
        .bind(draft.acquisition_date)
        .bind(draft.maintenance_cost)
        .bind(draft.last_maintenance_date)
        .bind(draft.next_maintenance_date)
        .bind(&draft.supplier)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Update a tool under its row lock.
    ///
    /// `build` receives the locked tool (with its current borrowed quantity)
    /// and returns the draft to store. The new total must still cover the
    /// units on loan.
    pub async fn update_with<F>(&self, id: i32, build: F) -> AppResult<Tool>
    where
        F: FnOnce(&Tool) -> AppResult<ToolDraft>,
    {
        let mut tx = self.pool.begin().await?;

        let current = lock_tool(&mut *tx, id).await?;
        let draft = build(&current)?;
        ledger::ensure_capacity(draft.total_quantity, current.borrowed_quantity)?;

        let mut row = sqlx::query_as::<_, ToolRow>(
            r#"
            UPDATE tools SET
                name = $1, description = $2, total_quantity = $3, condition = $4,
                unit_value = $5, acquisition_date = $6, maintenance_cost = $7,
                last_maintenance_date = $8, next_maintenance_date = $9, supplier = $10
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.total_quantity)
        .bind(draft.condition)
        .bind(draft.unit_value)
        .bind(draft.acquisition_date)
        .bind(draft.maintenance_cost)
        .bind(draft.last_maintenance_date)
        .bind(draft.next_maintenance_date)
        .bind(&draft.supplier)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.borrowed_quantity = current.borrowed_quantity;
        Ok(row.into())
    }

    /// Delete a tool and, through the foreign key, its loans
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tool {} not found", id)));
        }
        Ok(())
    }
}
