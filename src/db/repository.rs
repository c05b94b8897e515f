//! Database repository for guest responses.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{AggregateStats, GuestRecord, SubmitResponseRequest, UpdateResponseRequest};

const RESPONSE_COLUMNS: &str = "id, invitation_id, name, email, phone, attending, companions, \
     dietary_notes, music_suggestion, message, custom_answers, created_at";

/// Database repository for all response operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List responses for one invitation, most recent first.
    pub async fn list_responses(&self, invitation_id: &str) -> Result<Vec<GuestRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM responses WHERE invitation_id = ? ORDER BY created_at DESC, rowid DESC",
            RESPONSE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(invitation_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Aggregates computed by the store for one invitation.
    pub async fn response_stats(&self, invitation_id: &str) -> Result<AggregateStats, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN attending = 1 THEN 1 ELSE 0 END), 0) AS attending,
                COALESCE(SUM(CASE WHEN attending = 0 THEN 1 ELSE 0 END), 0) AS declined,
                COALESCE(SUM(CASE WHEN attending IS NULL THEN 1 ELSE 0 END), 0) AS awaiting,
                COALESCE(SUM(CASE WHEN attending = 1 THEN companions ELSE 0 END), 0) AS total_guests,
                COALESCE(SUM(CASE WHEN TRIM(dietary_notes) <> '' THEN 1 ELSE 0 END), 0) AS with_dietary,
                COALESCE(SUM(CASE WHEN TRIM(music_suggestion) <> '' THEN 1 ELSE 0 END), 0) AS with_music
            FROM responses
            WHERE invitation_id = ?
            "#,
        )
        .bind(invitation_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AggregateStats {
            attending: count(&row, "attending"),
            declined: count(&row, "declined"),
            awaiting: count(&row, "awaiting"),
            total_guests: row.get::<i64, _>("total_guests").max(0) as u64,
            with_dietary_notes: count(&row, "with_dietary"),
            with_music_suggestion: count(&row, "with_music"),
        })
    }

    /// Get a response by ID.
    pub async fn get_response(&self, id: &str) -> Result<Option<GuestRecord>, AppError> {
        let sql = format!("SELECT {} FROM responses WHERE id = ?", RESPONSE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    /// Store a new guest response.
    pub async fn create_response(
        &self,
        invitation_id: &str,
        request: &SubmitResponseRequest,
    ) -> Result<GuestRecord, AppError> {
        let now = Utc::now().to_rfc3339();
        let record = GuestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            invitation_id: invitation_id.to_string(),
            name: request.name.trim().to_string(),
            email: request.email.clone().unwrap_or_default(),
            phone: request.phone.clone().unwrap_or_default(),
            attending: request.attending,
            companions: request.companions.unwrap_or(0),
            dietary_notes: request.dietary_notes.clone().unwrap_or_default(),
            music_suggestion: request.music_suggestion.clone().unwrap_or_default(),
            message: request.message.clone().unwrap_or_default(),
            custom_answers: request.custom_answers.clone().unwrap_or_default(),
            created_at: now.clone(),
        };

        sqlx::query(
            "INSERT INTO responses (id, invitation_id, name, email, phone, attending, companions, dietary_notes, music_suggestion, message, custom_answers, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&record.id)
        .bind(&record.invitation_id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.attending.map(i32::from))
        .bind(record.companions as i64)
        .bind(&record.dietary_notes)
        .bind(&record.music_suggestion)
        .bind(&record.message)
        .bind(serde_json::to_string(&record.custom_answers)?)
        .bind(&record.created_at)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Apply a host edit to an existing response.
    pub async fn update_response(
        &self,
        id: &str,
        request: &UpdateResponseRequest,
    ) -> Result<GuestRecord, AppError> {
        let existing = self
            .get_response(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Response {} not found", id)))?;

        let attending = if request.clear_attending {
            None
        } else {
            request.attending.or(existing.attending)
        };

        let record = GuestRecord {
            name: request.name.clone().unwrap_or(existing.name),
            email: request.email.clone().unwrap_or(existing.email),
            phone: request.phone.clone().unwrap_or(existing.phone),
            attending,
            companions: request.companions.unwrap_or(existing.companions),
            dietary_notes: request.dietary_notes.clone().unwrap_or(existing.dietary_notes),
            music_suggestion: request
                .music_suggestion
                .clone()
                .unwrap_or(existing.music_suggestion),
            message: request.message.clone().unwrap_or(existing.message),
            custom_answers: request
                .custom_answers
                .clone()
                .unwrap_or(existing.custom_answers),
            ..existing
        };

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE responses SET name = ?, email = ?, phone = ?, attending = ?, companions = ?, dietary_notes = ?, music_suggestion = ?, message = ?, custom_answers = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.attending.map(i32::from))
        .bind(record.companions as i64)
        .bind(&record.dietary_notes)
        .bind(&record.music_suggestion)
        .bind(&record.message)
        .bind(serde_json::to_string(&record.custom_answers)?)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(AppError::NotFound(format!("Response {} not found", id)));
        }

        Ok(record)
    }

    /// Delete a response, returning the removed record.
    pub async fn delete_response(&self, id: &str) -> Result<GuestRecord, AppError> {
        let existing = self
            .get_response(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Response {} not found", id)))?;

        sqlx::query("DELETE FROM responses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }
}

// Helper functions for row conversion

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> GuestRecord {
    let attending: Option<i32> = row.get("attending");
    let companions: i64 = row.get("companions");
    let custom_answers: String = row.get("custom_answers");
    GuestRecord {
        id: row.get("id"),
        invitation_id: row.get("invitation_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        attending: attending.map(|v| v != 0),
        companions: companions.clamp(0, u32::MAX as i64) as u32,
        dietary_notes: row.get("dietary_notes"),
        music_suggestion: row.get("music_suggestion"),
        message: row.get("message"),
        custom_answers: parse_answers(&custom_answers),
        created_at: row.get("created_at"),
    }
}

fn count(row: &sqlx::sqlite::SqliteRow, column: &str) -> u32 {
    row.get::<i64, _>(column).clamp(0, u32::MAX as i64) as u32
}

fn parse_answers(s: &str) -> BTreeMap<String, String> {
    serde_json::from_str(s).unwrap_or_default()
}
