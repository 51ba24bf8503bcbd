//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Forms are
//! always looked up together with their owning organization so one tenant can
//! never read or change another tenant's data.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::form::{Answer, Document};
use crate::models::{
    CreateOrganizationRequest, Form, FormSummary, Organization, ResponseMetadata, SenderInfo,
    StoredResponse, UpdateFormRequest,
};

/// Prefix of organization API keys.
const API_KEY_PREFIX: &str = "bay_";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== ORGANIZATION OPERATIONS ====================

    /// Create an organization with a freshly generated API key.
    pub async fn create_organization(
        &self,
        request: &CreateOrganizationRequest,
    ) -> Result<Organization, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let api_key = format!(
            "{}{}{}",
            API_KEY_PREFIX,
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO organizations (id, name, api_key, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&request.name)
            .bind(&api_key)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        Ok(Organization {
            id,
            name: request.name.clone(),
            api_key,
            created_at: now,
        })
    }

    /// Get an organization by ID.
    pub async fn get_organization(&self, id: &str) -> Result<Option<Organization>, AppError> {
        let row =
            sqlx::query("SELECT id, name, api_key, created_at FROM organizations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(organization_from_row))
    }

    /// Find the organization an API key belongs to. Keys are unique.
    pub async fn get_organization_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<Organization>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, api_key, created_at FROM organizations WHERE api_key = ?",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(organization_from_row))
    }

    // ==================== FORM OPERATIONS ====================

    /// List an organization's forms, most recently updated first.
    pub async fn list_forms(&self, organization_id: &str) -> Result<Vec<FormSummary>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.name, f.published, f.updated_at, f.version,
                   (SELECT COUNT(*) FROM responses r WHERE r.form_id = f.id) AS response_count
            FROM forms f
            WHERE f.organization_id = ?
            ORDER BY f.updated_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let published: i32 = row.get("published");
                FormSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    published: published != 0,
                    updated_at: row.get("updated_at"),
                    version: row.get("version"),
                    response_count: row.get("response_count"),
                }
            })
            .collect())
    }

    /// Get a form owned by `organization_id`.
    pub async fn get_form(
        &self,
        organization_id: &str,
        id: &str,
    ) -> Result<Option<Form>, AppError> {
        let row = sqlx::query(
            "SELECT id, organization_id, name, published, content, created_at, updated_at, version FROM forms WHERE id = ? AND organization_id = ?"
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(form_from_row).transpose()
    }

    /// Get a form reachable through its share link.
    pub async fn get_published_form(&self, id: &str) -> Result<Option<Form>, AppError> {
        let row = sqlx::query(
            "SELECT id, organization_id, name, published, content, created_at, updated_at, version FROM forms WHERE id = ? AND published = 1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(form_from_row).transpose()
    }

    /// Create a new form with an already validated document.
    pub async fn create_form(
        &self,
        organization_id: &str,
        name: &str,
        document: &Document,
        published: bool,
    ) -> Result<Form, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let content = document_json(document)?;

        sqlx::query(
            "INSERT INTO forms (id, organization_id, name, content, published, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(organization_id)
        .bind(name)
        .bind(&content)
        .bind(published as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Form {
            id,
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            published,
            content: document.clone(),
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a form with optimistic concurrency control. `document` replaces
    /// the content when present.
    pub async fn update_form(
        &self,
        organization_id: &str,
        id: &str,
        request: &UpdateFormRequest,
        document: Option<&Document>,
    ) -> Result<Form, AppError> {
        let existing = self
            .get_form(organization_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let published = request.published.unwrap_or(existing.published);
        let document = document.cloned().unwrap_or(existing.content);
        let content = document_json(&document)?;

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE forms SET name = ?, content = ?, published = ?, updated_at = ?, version = ? WHERE id = ? AND organization_id = ? AND version = ?"
        )
        .bind(name)
        .bind(&content)
        .bind(published as i32)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(organization_id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_form(organization_id, id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|f| f.version).unwrap_or(0),
            });
        }

        Ok(Form {
            id: id.to_string(),
            organization_id: organization_id.to_string(),
            name: name.clone(),
            published,
            content: document,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a form and all of its responses.
    pub async fn delete_form(&self, organization_id: &str, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM forms WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Form {} not found", id)));
        }

        sqlx::query("DELETE FROM responses WHERE form_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== RESPONSE OPERATIONS ====================

    /// Persist verified answers for a form.
    pub async fn create_response(
        &self,
        form_id: &str,
        answers: &[Answer],
        metadata: &ResponseMetadata,
    ) -> Result<StoredResponse, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let answers_json = serde_json::to_string(answers)
            .map_err(|e| AppError::Internal(format!("Failed to encode answers: {}", e)))?;

        sqlx::query(
            "INSERT INTO responses (id, form_id, answers, user_id, sender_ip, sender_user_agent, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(form_id)
        .bind(&answers_json)
        .bind(&metadata.user_id)
        .bind(&metadata.sender.ip)
        .bind(&metadata.sender.user_agent)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(StoredResponse {
            id,
            form_id: form_id.to_string(),
            answers: answers.to_vec(),
            user_id: metadata.user_id.clone(),
            sender: metadata.sender.clone(),
            created_at: now,
        })
    }

    /// List a form's responses, newest first.
    pub async fn list_responses(&self, form_id: &str) -> Result<Vec<StoredResponse>, AppError> {
        let rows = sqlx::query(
            "SELECT id, form_id, answers, user_id, sender_ip, sender_user_agent, created_at FROM responses WHERE form_id = ? ORDER BY created_at DESC"
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(response_from_row).collect()
    }

    /// Number of responses stored for a form.
    pub async fn count_responses(&self, form_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM responses WHERE form_id = ?")
            .bind(form_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }

    /// Get a single response of a form.
    pub async fn get_response(
        &self,
        form_id: &str,
        id: &str,
    ) -> Result<Option<StoredResponse>, AppError> {
        let row = sqlx::query(
            "SELECT id, form_id, answers, user_id, sender_ip, sender_user_agent, created_at FROM responses WHERE id = ? AND form_id = ?"
        )
        .bind(id)
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(response_from_row).transpose()
    }

    /// Delete a single response.
    pub async fn delete_response(&self, form_id: &str, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM responses WHERE id = ? AND form_id = ?")
            .bind(id)
            .bind(form_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Response {} not found", id)));
        }

        Ok(())
    }

    /// Delete several responses of a form in one transaction. Unknown ids are
    /// skipped; the number actually deleted is returned.
    pub async fn delete_responses(&self, form_id: &str, ids: &[String]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for id in ids {
            let result = sqlx::query("DELETE FROM responses WHERE id = ? AND form_id = ?")
                .bind(id)
                .bind(form_id)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }
}

// Helper functions for row conversion

fn document_json(document: &Document) -> Result<String, AppError> {
    document
        .to_json()
        .map_err(|e| AppError::Internal(format!("Failed to encode form content: {}", e)))
}

fn organization_from_row(row: &sqlx::sqlite::SqliteRow) -> Organization {
    Organization {
        id: row.get("id"),
        name: row.get("name"),
        api_key: row.get("api_key"),
        created_at: row.get("created_at"),
    }
}

/// Content is checked on every save, so a parse failure means the row was
/// changed outside the API.
fn form_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Form, AppError> {
    let id: String = row.get("id");
    let published: i32 = row.get("published");
    let content: String = row.get("content");
    let content = Document::parse(&content).map_err(|e| {
        tracing::error!(form_id = %id, "Stored form content is unreadable: {}", e);
        AppError::Internal(format!("Form {} content is unreadable", id))
    })?;

    Ok(Form {
        id,
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        published: published != 0,
        content,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

fn response_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResponse, AppError> {
    let id: String = row.get("id");
    let answers: String = row.get("answers");
    let answers = serde_json::from_str(&answers).map_err(|e| {
        tracing::error!(response_id = %id, "Stored answers are unreadable: {}", e);
        AppError::Internal(format!("Response {} answers are unreadable", id))
    })?;

    Ok(StoredResponse {
        id,
        form_id: row.get("form_id"),
        answers,
        user_id: row.get("user_id"),
        sender: SenderInfo {
            ip: row.get("sender_ip"),
            user_agent: row.get("sender_user_agent"),
        },
        created_at: row.get("created_at"),
    })
}
