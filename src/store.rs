// Async SQLite store for the directory, with SQLx connection pooling and LRU
// read caches in front of the hot lookups (schools, follower sets).
//
// The storage layer is where the two uniqueness guarantees live:
// reviews(school_id, author_id) and followers(followee_id, follower_id) are
// UNIQUE, and the sequence counter is bumped with a single upsert statement,
// so concurrent requests cannot double-insert or reuse a sequence value even
// though the application-level checks are not atomic with the writes.

use anyhow::Result;
use chrono::Utc;
use lru::LruCache;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::models::{
    Announcement, AuthorSnapshot, EventKind, FanoutEvent, Notification, Program, Review, School,
    SchoolProfile, Semester, User, UserId,
};

pub struct DirectoryStore {
    pool: SqlitePool,
    school_cache: Arc<Mutex<LruCache<i64, School>>>,
    follower_cache: Arc<Mutex<LruCache<i64, Vec<UserId>>>>,
}

impl DirectoryStore {
    pub async fn new(database_url: &str, cache_capacity: usize) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).expect("non-zero capacity");

        Ok(DirectoryStore {
            pool,
            school_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            follower_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                is_school_admin INTEGER NOT NULL DEFAULT 0,
                is_class_admin INTEGER NOT NULL DEFAULT 0,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schools (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                address_1 TEXT,
                address_2 TEXT,
                city TEXT,
                state TEXT,
                zip TEXT,
                phone_number TEXT,
                description TEXT,
                image TEXT,
                rating REAL NOT NULL DEFAULT 0,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // One review per (school, author), enforced by the store rather than
        // the application-level duplicate check alone.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                school_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                author_email TEXT NOT NULL,
                author_name TEXT NOT NULL,
                rating REAL NOT NULL,
                body TEXT NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL,
                UNIQUE(school_id, author_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS programs (
                id INTEGER PRIMARY KEY,
                school_id INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS semesters (
                id INTEGER PRIMARY KEY,
                program_id INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                start_date INTEGER,
                end_date INTEGER,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS announcements (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                author_id INTEGER NOT NULL,
                author_email TEXT NOT NULL,
                author_name TEXT NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS followers (
                followee_id INTEGER NOT NULL,
                follower_id INTEGER NOT NULL,
                created INTEGER NOT NULL,
                UNIQUE(followee_id, follower_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                event_kind TEXT NOT NULL,
                event_id INTEGER NOT NULL,
                event_name TEXT NOT NULL,
                actor_email TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // Single-row counter behind an atomic upsert, see next_sequence().
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS id_sequence (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                next_seq INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_school ON reviews(school_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_programs_school ON programs(school_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_semesters_program ON semesters(program_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_followers_followee ON followers(followee_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- sequence ----

    /// Increment-and-fetch in a single statement. The first call creates the
    /// counter row with value 1 and returns it; later calls return successive
    /// values. Concurrent callers never observe the same value.
    pub async fn next_sequence(&self) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO id_sequence (id, next_seq) VALUES (1, 1)
             ON CONFLICT(id) DO UPDATE SET next_seq = next_seq + 1
             RETURNING next_seq",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>(0))
    }

    // ---- users ----

    /// Returns `None` when the email is already registered.
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        is_school_admin: bool,
        is_class_admin: bool,
    ) -> Result<Option<User>> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO users (email, name, is_school_admin, is_class_admin, created, updated)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(email)
        .bind(name)
        .bind(is_school_admin)
        .bind(is_class_admin)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(User {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            name: name.to_string(),
            is_school_admin,
            is_class_admin,
            created: now,
            updated: now,
        }))
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, name, is_school_admin, is_class_admin, created, updated
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    pub async fn user_exists(&self, id: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ---- schools ----

    pub async fn create_school(
        &self,
        username: &str,
        email: &str,
        profile: &SchoolProfile,
    ) -> Result<School> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO schools
                (username, email, name, address_1, address_2, city, state, zip,
                 phone_number, description, image, rating, created, updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(&profile.name)
        .bind(&profile.address_1)
        .bind(&profile.address_2)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zip)
        .bind(&profile.phone_number)
        .bind(&profile.description)
        .bind(&profile.image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let school = School {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            name: profile.name.clone(),
            address_1: profile.address_1.clone(),
            address_2: profile.address_2.clone(),
            city: profile.city.clone(),
            state: profile.state.clone(),
            zip: profile.zip.clone(),
            phone_number: profile.phone_number.clone(),
            description: profile.description.clone(),
            image: profile.image.clone(),
            rating: 0.0,
            created: now,
            updated: now,
        };

        self.school_cache.lock().await.put(school.id, school.clone());
        Ok(school)
    }

    pub async fn get_school(&self, id: i64) -> Result<Option<School>> {
        {
            let mut cache = self.school_cache.lock().await;
            if let Some(school) = cache.get(&id).cloned() {
                return Ok(Some(school));
            }
        }

        let row = sqlx::query("SELECT * FROM schools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            let school = school_from_row(&row);
            self.school_cache.lock().await.put(id, school.clone());
            Ok(Some(school))
        } else {
            Ok(None)
        }
    }

    pub async fn list_schools(
        &self,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<School>, i64)> {
        let offset = (page.max(1) - 1) as i64 * per_page as i64;

        let (rows, total) = if let Some(search) = search {
            let pattern = like_pattern(search);
            let rows = sqlx::query(
                "SELECT * FROM schools WHERE name LIKE ? ESCAPE '\\'
                 ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(&pattern)
            .bind(per_page as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            let total: i64 =
                sqlx::query("SELECT COUNT(*) FROM schools WHERE name LIKE ? ESCAPE '\\'")
                    .bind(&pattern)
                    .fetch_one(&self.pool)
                    .await?
                    .get(0);
            (rows, total)
        } else {
            let rows =
                sqlx::query("SELECT * FROM schools ORDER BY created DESC, id DESC LIMIT ? OFFSET ?")
                    .bind(per_page as i64)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
            let total: i64 = sqlx::query("SELECT COUNT(*) FROM schools")
                .fetch_one(&self.pool)
                .await?
                .get(0);
            (rows, total)
        };

        Ok((rows.iter().map(school_from_row).collect(), total))
    }

    pub async fn update_school(&self, id: i64, profile: &SchoolProfile) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE schools SET name = ?, address_1 = ?, address_2 = ?, city = ?, state = ?,
                 zip = ?, phone_number = ?, description = ?, image = ?, updated = ?
             WHERE id = ?",
        )
        .bind(&profile.name)
        .bind(&profile.address_1)
        .bind(&profile.address_2)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zip)
        .bind(&profile.phone_number)
        .bind(&profile.description)
        .bind(&profile.image)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.school_cache.lock().await.pop(&id);
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_school_rating(&self, id: i64, rating: f64) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query("UPDATE schools SET rating = ?, updated = ? WHERE id = ?")
            .bind(rating)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.school_cache.lock().await.pop(&id);
        Ok(())
    }

    /// Delete a school together with its reviews, programs and the programs'
    /// semesters. All or nothing.
    pub async fn delete_school(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM semesters
             WHERE program_id IN (SELECT id FROM programs WHERE school_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM programs WHERE school_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM reviews WHERE school_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM schools WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.school_cache.lock().await.pop(&id);
        Ok(result.rows_affected() > 0)
    }

    // ---- reviews ----

    /// Returns `None` when the author already has a review for this school;
    /// the UNIQUE constraint catches submissions racing the duplicate check.
    pub async fn create_review(
        &self,
        school_id: i64,
        author: &AuthorSnapshot,
        rating: f64,
        body: &str,
    ) -> Result<Option<Review>> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO reviews
                (school_id, author_id, author_email, author_name, rating, body, created, updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(school_id)
        .bind(author.id)
        .bind(&author.email)
        .bind(&author.name)
        .bind(rating)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(Review {
            id: result.last_insert_rowid(),
            school_id,
            author: author.clone(),
            rating,
            body: body.to_string(),
            created: now,
            updated: now,
        }))
    }

    pub async fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| review_from_row(&row)))
    }

    pub async fn reviews_for_school(&self, school_id: i64) -> Result<Vec<Review>> {
        let rows =
            sqlx::query("SELECT * FROM reviews WHERE school_id = ? ORDER BY created DESC, id DESC")
                .bind(school_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(review_from_row).collect())
    }

    pub async fn find_review_by_author(
        &self,
        school_id: i64,
        author_id: UserId,
    ) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE school_id = ? AND author_id = ?")
            .bind(school_id)
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| review_from_row(&row)))
    }

    pub async fn update_review(&self, id: i64, rating: f64, body: &str) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query("UPDATE reviews SET rating = ?, body = ?, updated = ? WHERE id = ?")
            .bind(rating)
            .bind(body)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_review(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- programs ----

    /// Returns `None` when the program name is already taken.
    pub async fn create_program(
        &self,
        school_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Program>> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO programs (school_id, name, description, created, updated)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(school_id)
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(Program {
            id: result.last_insert_rowid(),
            school_id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            created: now,
            updated: now,
        }))
    }

    pub async fn get_program(&self, id: i64) -> Result<Option<Program>> {
        let row = sqlx::query("SELECT * FROM programs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| program_from_row(&row)))
    }

    pub async fn programs_for_school(&self, school_id: i64) -> Result<Vec<Program>> {
        let rows =
            sqlx::query("SELECT * FROM programs WHERE school_id = ? ORDER BY created DESC, id DESC")
                .bind(school_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(program_from_row).collect())
    }

    pub async fn update_program(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result =
            sqlx::query("UPDATE programs SET name = ?, description = ?, updated = ? WHERE id = ?")
                .bind(name)
                .bind(description)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a program and its semesters. All or nothing.
    pub async fn delete_program(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM semesters WHERE program_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- semesters ----

    /// Returns `None` when the semester name is already taken.
    pub async fn create_semester(
        &self,
        program_id: i64,
        name: &str,
        description: Option<&str>,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> Result<Option<Semester>> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO semesters (program_id, name, description, start_date, end_date, created, updated)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(program_id)
        .bind(name)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(Semester {
            id: result.last_insert_rowid(),
            program_id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            start_date,
            end_date,
            created: now,
            updated: now,
        }))
    }

    pub async fn get_semester(&self, id: i64) -> Result<Option<Semester>> {
        let row = sqlx::query("SELECT * FROM semesters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| semester_from_row(&row)))
    }

    pub async fn semesters_for_program(&self, program_id: i64) -> Result<Vec<Semester>> {
        let rows = sqlx::query(
            "SELECT * FROM semesters WHERE program_id = ? ORDER BY created DESC, id DESC",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(semester_from_row).collect())
    }

    pub async fn update_semester(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE semesters SET name = ?, description = ?, start_date = ?, end_date = ?, updated = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_semester(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM semesters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- announcements ----

    pub async fn create_announcement(
        &self,
        name: &str,
        description: Option<&str>,
        author: &AuthorSnapshot,
    ) -> Result<Announcement> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO announcements (name, description, author_id, author_email, author_name, created, updated)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(author.id)
        .bind(&author.email)
        .bind(&author.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Announcement {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            author: author.clone(),
            created: now,
            updated: now,
        })
    }

    pub async fn get_announcement(&self, id: i64) -> Result<Option<Announcement>> {
        let row = sqlx::query("SELECT * FROM announcements WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| announcement_from_row(&row)))
    }

    pub async fn list_announcements(
        &self,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Announcement>, i64)> {
        let offset = (page.max(1) - 1) as i64 * per_page as i64;

        let (rows, total) = if let Some(search) = search {
            let pattern = like_pattern(search);
            let rows = sqlx::query(
                "SELECT * FROM announcements WHERE name LIKE ? ESCAPE '\\'
                 ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(&pattern)
            .bind(per_page as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            let total: i64 =
                sqlx::query("SELECT COUNT(*) FROM announcements WHERE name LIKE ? ESCAPE '\\'")
                    .bind(&pattern)
                    .fetch_one(&self.pool)
                    .await?
                    .get(0);
            (rows, total)
        } else {
            let rows = sqlx::query(
                "SELECT * FROM announcements ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(per_page as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            let total: i64 = sqlx::query("SELECT COUNT(*) FROM announcements")
                .fetch_one(&self.pool)
                .await?
                .get(0);
            (rows, total)
        };

        Ok((rows.iter().map(announcement_from_row).collect(), total))
    }

    pub async fn update_announcement(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE announcements SET name = ?, description = ?, updated = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_announcement(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- followers ----

    pub async fn is_follower(&self, followee_id: UserId, follower_id: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM followers WHERE followee_id = ? AND follower_id = ?")
            .bind(followee_id)
            .bind(follower_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Returns `false` when the relation already exists.
    pub async fn add_follower(&self, followee_id: UserId, follower_id: UserId) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO followers (followee_id, follower_id, created) VALUES (?, ?, ?)",
        )
        .bind(followee_id)
        .bind(follower_id)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                self.follower_cache.lock().await.pop(&followee_id);
                Ok(true)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn followers_of(&self, followee_id: UserId) -> Result<Vec<UserId>> {
        {
            let mut cache = self.follower_cache.lock().await;
            if let Some(followers) = cache.get(&followee_id).cloned() {
                return Ok(followers);
            }
        }

        let followers: Vec<UserId> =
            sqlx::query("SELECT follower_id FROM followers WHERE followee_id = ? ORDER BY created")
                .bind(followee_id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| row.get::<i64, _>(0))
                .collect();

        self.follower_cache
            .lock()
            .await
            .put(followee_id, followers.clone());
        Ok(followers)
    }

    // ---- notifications ----

    /// Create one inbox entry for `user_id`. Fails when the recipient does
    /// not exist, so a bad recipient shows up in the fanout report instead of
    /// leaving an orphaned row.
    pub async fn add_notification(
        &self,
        user_id: UserId,
        event: &FanoutEvent,
    ) -> Result<Notification> {
        if !self.user_exists(user_id).await? {
            anyhow::bail!("notification recipient {} does not exist", user_id);
        }

        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, event_kind, event_id, event_name, actor_email, is_read, created)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(event.kind.as_str())
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.actor_email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id,
            event: event.clone(),
            is_read: false,
            created: now,
        })
    }

    pub async fn get_notification(&self, id: i64) -> Result<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| notification_from_row(&row)).transpose()
    }

    /// Most recent first, by insertion order.
    pub async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query("SELECT * FROM notifications WHERE user_id = ? ORDER BY id DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(notification_from_row).collect()
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Escape LIKE metacharacters so user input matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        is_school_admin: row.get("is_school_admin"),
        is_class_admin: row.get("is_class_admin"),
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn school_from_row(row: &SqliteRow) -> School {
    School {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        name: row.get("name"),
        address_1: row.get("address_1"),
        address_2: row.get("address_2"),
        city: row.get("city"),
        state: row.get("state"),
        zip: row.get("zip"),
        phone_number: row.get("phone_number"),
        description: row.get("description"),
        image: row.get("image"),
        rating: row.get("rating"),
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn review_from_row(row: &SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        school_id: row.get("school_id"),
        author: AuthorSnapshot {
            id: row.get("author_id"),
            email: row.get("author_email"),
            name: row.get("author_name"),
        },
        rating: row.get("rating"),
        body: row.get("body"),
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn program_from_row(row: &SqliteRow) -> Program {
    Program {
        id: row.get("id"),
        school_id: row.get("school_id"),
        name: row.get("name"),
        description: row.get("description"),
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn semester_from_row(row: &SqliteRow) -> Semester {
    Semester {
        id: row.get("id"),
        program_id: row.get("program_id"),
        name: row.get("name"),
        description: row.get("description"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn announcement_from_row(row: &SqliteRow) -> Announcement {
    Announcement {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        author: AuthorSnapshot {
            id: row.get("author_id"),
            email: row.get("author_email"),
            name: row.get("author_name"),
        },
        created: row.get("created"),
        updated: row.get("updated"),
    }
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    let kind_str: String = row.get("event_kind");
    let kind = EventKind::parse(&kind_str)
        .ok_or_else(|| anyhow::anyhow!("unknown event kind: {}", kind_str))?;

    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        event: FanoutEvent {
            kind,
            id: row.get("event_id"),
            name: row.get("event_name"),
            actor_email: row.get("actor_email"),
        },
        is_read: row.get("is_read"),
        created: row.get("created"),
    })
}
