use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::tasks;

#[derive(Debug, Clone)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub status: String,
    pub priority: String,
    pub account_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            date: model.date,
            status: model.status,
            priority: model.priority,
            account_id: model.account_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct TaskRepository {
    conn: DatabaseConnection,
}

impl TaskRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        account_id: i32,
        title: &str,
        description: Option<&str>,
        date: &str,
        priority: &str,
    ) -> Result<Task> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = tasks::ActiveModel {
            title: Set(title.to_string()),
            description: Set(description.map(ToString::to_string)),
            date: Set(date.to_string()),
            status: Set("in_progress".to_string()),
            priority: Set(priority.to_string()),
            account_id: Set(account_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert task")?;

        Ok(Task::from(model))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Task>> {
        let task = tasks::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query task by ID")?;

        Ok(task.map(Task::from))
    }

    pub async fn update(
        &self,
        id: i32,
        title: &str,
        description: Option<&str>,
        date: &str,
        priority: &str,
    ) -> Result<Option<Task>> {
        let task = tasks::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query task for update")?;

        let Some(task) = task else {
            return Ok(None);
        };

        let mut active: tasks::ActiveModel = task.into();
        active.title = Set(title.to_string());
        active.description = Set(description.map(ToString::to_string));
        active.date = Set(date.to_string());
        active.priority = Set(priority.to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Some(Task::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = tasks::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete task")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_account(&self, account_id: i32) -> Result<Vec<Task>> {
        let rows = tasks::Entity::find()
            .filter(tasks::Column::AccountId.eq(account_id))
            .order_by_desc(tasks::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list tasks for account")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<Task>> {
        let rows = tasks::Entity::find()
            .order_by_desc(tasks::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list tasks")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Tasks inside an inclusive date range, oldest first. Dates are
    /// YYYY-MM-DD strings so string comparison orders them.
    pub async fn list_in_range(&self, from: &str, to: &str) -> Result<Vec<Task>> {
        let rows = tasks::Entity::find()
            .filter(tasks::Column::Date.gte(from))
            .filter(tasks::Column::Date.lte(to))
            .order_by_asc(tasks::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list tasks in date range")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }
}
