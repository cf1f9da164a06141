//! Loans repository for database operations
//!
//! Writes that consume stock run in one transaction holding the row lock of
//! the target tool, so the availability check and the write cannot race.
//! Tool rows are always locked before loan rows, the order a tool delete
//! takes through its cascade.

use chrono::NaiveDate;
use sqlx::{Executor, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    ledger,
    models::loan::{Loan, LoanFilter, NewLoan, UpdateLoan},
};

use super::tools::lock_tool;

const LOAN_SELECT: &str = r#"
    SELECT l.id, l.tool_id, l.borrower_id, l.quantity, l.borrowed_date,
           l.due_date, l.returned_date,
           t.name AS tool_name, u.username AS borrower_username
    FROM loans l
    JOIN tools t ON t.id = l.tool_id
    JOIN users u ON u.id = l.borrower_id
"#;

async fn fetch_loan<'e, E>(executor: E, id: i32) -> AppResult<Loan>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
}

async fn lock_loan(conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1 FOR UPDATE OF l", LOAN_SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
}

async fn ensure_borrower(conn: &mut PgConnection, user_id: i32) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }
    Ok(())
}

/// Tools touched by a loan edit, in the order their rows are locked
fn tool_lock_order(current_tool_id: i32, target_tool_id: i32) -> Vec<i32> {
    let mut ids = vec![current_tool_id, target_tool_id];
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        fetch_loan(&self.pool, id).await
    }

    /// List loans, oldest first
    pub async fn list(&self, filter: LoanFilter) -> AppResult<Vec<Loan>> {
        let condition = match filter {
            LoanFilter::All => "",
            LoanFilter::Active => "WHERE l.returned_date IS NULL",
            LoanFilter::Overdue(_) => "WHERE l.returned_date IS NULL AND l.due_date < $1",
            LoanFilter::History => "WHERE l.returned_date IS NOT NULL",
        };
        let query = format!(
            "{} {} ORDER BY l.borrowed_date, l.id",
            LOAN_SELECT, condition
        );

        let mut builder = sqlx::query_as::<_, Loan>(&query);
        if let LoanFilter::Overdue(today) = filter {
            builder = builder.bind(today);
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    /// Create a loan if the tool has enough units available
    pub async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let tool = lock_tool(&mut *tx, loan.tool_id).await?;
        ensure_borrower(&mut *tx, loan.borrower_id).await?;
        ledger::ensure_available(loan.quantity, tool.available_quantity)?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (tool_id, borrower_id, quantity, borrowed_date, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(loan.tool_id)
        .bind(loan.borrower_id)
        .bind(loan.quantity)
        .bind(loan.borrowed_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        let created = fetch_loan(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Change quantity, tool, borrower or due date of a loan.
    ///
    /// The loan's own reservation goes back to the pool before the new
    /// quantity is checked against the target tool.
    pub async fn update(&self, id: i32, data: &UpdateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let snapshot = fetch_loan(&mut *tx, id).await?;
        let tool_id = data.tool_id.unwrap_or(snapshot.tool_id);

        let mut target = None;
        for lock_id in tool_lock_order(snapshot.tool_id, tool_id) {
            let locked = lock_tool(&mut *tx, lock_id).await?;
            if lock_id == tool_id {
                target = Some(locked);
            }
        }
        let tool = target.ok_or_else(|| AppError::NotFound(format!("Tool {} not found", tool_id)))?;

        let current = lock_loan(&mut *tx, id).await?;
        // moving a loan needs its old tool's lock, which is held here
        if current.tool_id != snapshot.tool_id {
            return Err(AppError::Conflict(format!(
                "Loan {} was changed concurrently",
                id
            )));
        }
        let quantity = data.quantity.unwrap_or(current.quantity);
        let borrower_id = data.borrower_id.unwrap_or(current.borrower_id);
        let due_date = data.due_date.unwrap_or(current.due_date);

        if borrower_id != current.borrower_id {
            ensure_borrower(&mut *tx, borrower_id).await?;
        }

        // A returned loan holds no stock
        if current.is_active() {
            let effective = ledger::effective_availability(
                tool.available_quantity,
                ledger::own_reservation(&current, tool_id),
            );
            ledger::ensure_available(quantity, effective)?;
        }

        sqlx::query(
            r#"
            UPDATE loans
            SET tool_id = $1, borrower_id = $2, quantity = $3, due_date = $4
            WHERE id = $5
            "#,
        )
        .bind(tool_id)
        .bind(borrower_id)
        .bind(quantity)
        .bind(due_date)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = fetch_loan(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Mark a loan returned on `today`
    pub async fn return_loan(&self, id: i32, today: NaiveDate) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let current = lock_loan(&mut *tx, id).await?;
        ledger::ensure_returnable(&current)?;

        sqlx::query("UPDATE loans SET returned_date = $1 WHERE id = $2")
            .bind(today)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let returned = fetch_loan(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(returned)
    }

    /// Delete a loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan {} not found", id)));
        }
        Ok(())
    }
}
