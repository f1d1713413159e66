use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{fs, path::Path, str::FromStr};

use shared::domain::{CommentId, EventId, ProfileId};

/// Fixed location of the showcase store.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://comments.db";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub profile_id: ProfileId,
    pub name: String,
    pub school: String,
    pub department: String,
    pub picture: Option<Vec<u8>>,
    pub capabilities: String,
}

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub profile_id: ProfileId,
    pub event_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: String,
}

#[derive(Debug, Clone)]
pub struct StoredComment {
    pub comment_id: CommentId,
    pub comment: String,
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        create_store_dir(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a profile row as given; empty strings are stored unchanged.
    pub async fn create_profile(
        &self,
        name: &str,
        school: &str,
        department: &str,
        picture: Option<&[u8]>,
        capabilities: &str,
    ) -> Result<ProfileId> {
        let rec = sqlx::query(
            "INSERT INTO profiles (name, school, department, picture, capabilities)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(name)
        .bind(school)
        .bind(department)
        .bind(picture)
        .bind(capabilities)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert profile")?;
        Ok(ProfileId(rec.get::<i64, _>(0)))
    }

    /// Inserts one event row. The owning profile is not checked.
    pub async fn create_event(
        &self,
        profile_id: ProfileId,
        event_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        points: &str,
    ) -> Result<EventId> {
        let rec = sqlx::query(
            "INSERT INTO events (profile_id, event_name, start_date, end_date, points)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(profile_id.0)
        .bind(event_name)
        .bind(start_date)
        .bind(end_date)
        .bind(points)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert event")?;
        Ok(EventId(rec.get::<i64, _>(0)))
    }

    pub async fn list_profiles(&self) -> Result<Vec<StoredProfile>> {
        let rows = sqlx::query(
            "SELECT id, name, school, department, picture, capabilities FROM profiles",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(profile_from_row).collect())
    }

    pub async fn find_profile(&self, profile_id: ProfileId) -> Result<Option<StoredProfile>> {
        let row = sqlx::query(
            "SELECT id, name, school, department, picture, capabilities FROM profiles WHERE id = ?",
        )
        .bind(profile_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(profile_from_row))
    }

    pub async fn list_events(&self, profile_id: ProfileId) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query(
            "SELECT id, profile_id, event_name, start_date, end_date, points
             FROM events
             WHERE profile_id = ?",
        )
        .bind(profile_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredEvent {
                event_id: EventId(r.get::<i64, _>(0)),
                profile_id: ProfileId(r.get::<i64, _>(1)),
                event_name: r.get::<String, _>(2),
                start_date: r.get::<NaiveDate, _>(3),
                end_date: r.get::<NaiveDate, _>(4),
                points: r.get::<String, _>(5),
            })
            .collect())
    }

    pub async fn list_comments(&self, profile_id: ProfileId) -> Result<Vec<StoredComment>> {
        let rows = sqlx::query(
            "SELECT id, comment, rating, timestamp FROM comments WHERE profile_id = ?",
        )
        .bind(profile_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredComment {
                comment_id: CommentId(r.get::<i64, _>(0)),
                comment: r.get::<String, _>(1),
                rating: r.get::<i64, _>(2),
                created_at: r.get::<DateTime<Utc>, _>(3),
            })
            .collect())
    }

    /// Inserts a comment stamped by the database clock. The rating range is
    /// not checked here.
    pub async fn create_comment(
        &self,
        profile_id: ProfileId,
        comment: &str,
        rating: i64,
    ) -> Result<CommentId> {
        let rec = sqlx::query(
            "INSERT INTO comments (profile_id, comment, rating) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(profile_id.0)
        .bind(comment)
        .bind(rating)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert comment")?;
        Ok(CommentId(rec.get::<i64, _>(0)))
    }

    /// Mean rating across the profile's comments, `0.0` when there are none.
    pub async fn average_rating(&self, profile_id: ProfileId) -> Result<f64> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating) FROM comments WHERE profile_id = ?")
                .bind(profile_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(average.unwrap_or(0.0))
    }
}

fn profile_from_row(r: sqlx::sqlite::SqliteRow) -> StoredProfile {
    StoredProfile {
        profile_id: ProfileId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        school: r.get::<String, _>(2),
        department: r.get::<String, _>(3),
        picture: r.get::<Option<Vec<u8>>, _>(4),
        capabilities: r.get::<String, _>(5),
    }
}

/// Makes the directory of a `sqlite://` file store; other URLs need nothing.
fn create_store_dir(database_url: &str) -> Result<()> {
    let Some(file) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = file.split('?').next().unwrap_or_default();
    match Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("failed to create store directory '{}'", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
