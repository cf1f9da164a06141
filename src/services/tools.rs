//! Tool management service

use crate::{
    context::RequestContext,
    error::AppResult,
    ledger,
    models::tool::{ConditionChange, CreateTool, Tool, ToolDraft, UpdateTool},
    repository::Repository,
};

#[derive(Clone)]
pub struct ToolsService {
    repository: Repository,
}

impl ToolsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Tool>> {
        self.repository.tools.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Tool> {
        self.repository.tools.get_by_id(id).await
    }

    pub async fn create(&self, ctx: &RequestContext, data: CreateTool) -> AppResult<Tool> {
        let mut draft = ToolDraft::from(data);
        ledger::apply_condition_rules(&mut draft, ctx.today)?;

        let tool = self.repository.tools.create(&draft).await?;
        tracing::info!(
            user = %ctx.username,
            tool_id = tool.id,
            total_quantity = tool.total_quantity,
            "Tool created"
        );
        Ok(tool)
    }

    /// Replace every writable field; omitted fields take their defaults
    pub async fn replace(&self, ctx: &RequestContext, id: i32, data: CreateTool) -> AppResult<Tool> {
        let today = ctx.today;
        let tool = self
            .repository
            .tools
            .update_with(id, move |_| {
                let mut draft = ToolDraft::from(data);
                ledger::apply_condition_rules(&mut draft, today)?;
                Ok(draft)
            })
            .await?;

        tracing::info!(user = %ctx.username, tool_id = id, "Tool replaced");
        Ok(tool)
    }

    pub async fn update(&self, ctx: &RequestContext, id: i32, data: UpdateTool) -> AppResult<Tool> {
        let today = ctx.today;
        let tool = self
            .repository
            .tools
            .update_with(id, move |current| {
                let mut draft = ToolDraft::from(current).merge(data);
                ledger::apply_condition_rules(&mut draft, today)?;
                Ok(draft)
            })
            .await?;

        tracing::info!(user = %ctx.username, tool_id = id, "Tool updated");
        Ok(tool)
    }

    /// Change the condition of a tool; maintenance zeroes its stock
    pub async fn set_condition(
        &self,
        ctx: &RequestContext,
        id: i32,
        change: ConditionChange,
    ) -> AppResult<Tool> {
        let today = ctx.today;
        let condition = change.condition;
        let tool = self
            .repository
            .tools
            .update_with(id, move |current| {
                let mut draft = ToolDraft::from(current).with_condition(change);
                ledger::apply_condition_rules(&mut draft, today)?;
                Ok(draft)
            })
            .await?;

        tracing::info!(
            user = %ctx.username,
            tool_id = id,
            condition = %condition,
            "Tool condition changed"
        );
        Ok(tool)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> AppResult<()> {
        self.repository.tools.delete(id).await?;
        tracing::info!(user = %ctx.username, tool_id = id, "Tool deleted");
        Ok(())
    }
}
