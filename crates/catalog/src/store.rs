//! SQLite-backed catalog store.
//!
//! Free-function helpers over a `rusqlite::Connection`. The write side is
//! the boundary used by the offline fetch/classification collaborators (and
//! by tests); the read side is the contract the online pipeline depends on:
//! instructor lookup by identifier, and fragment lookup by owning
//! instructor (+ optional course code) and aspect, ordered by post date.

use crate::types::{Aspect, Course, Instructor, Review, ReviewFragment, Sentiment};
use chrono::{DateTime, Utc};
use ratewise_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;

/// Open the catalog database, creating the schema if needed.
pub fn open_store(db_path: &Path) -> AppResult<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Store(format!("Failed to create data directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("Failed to open catalog database: {}", e)))?;

    init_schema(&conn)?;
    Ok(conn)
}

/// Create the catalog tables. Idempotent.
pub fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS instructors (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            department TEXT NOT NULL,
            overall_rating REAL NOT NULL,
            material_clear REAL NOT NULL,
            student_difficulties REAL NOT NULL,
            num_evals INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS courses (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            department TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            instructor_id TEXT NOT NULL,
            course_code TEXT NOT NULL,
            grade TEXT,
            grade_level TEXT,
            course_type TEXT,
            rating_text TEXT,
            post_date TEXT NOT NULL,
            FOREIGN KEY (instructor_id) REFERENCES instructors (id),
            FOREIGN KEY (course_code) REFERENCES courses (code)
        );

        CREATE TABLE IF NOT EXISTS review_fragments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id TEXT NOT NULL,
            aspect TEXT NOT NULL,
            sentiment TEXT NOT NULL,
            text TEXT NOT NULL,
            token_count INTEGER NOT NULL,
            FOREIGN KEY (review_id) REFERENCES reviews (id)
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_instructor ON reviews(instructor_id);
        CREATE INDEX IF NOT EXISTS idx_fragments_review_aspect
            ON review_fragments(review_id, aspect);
        "#,
    )
    .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized catalog schema");
    Ok(())
}

/// Insert or replace an instructor.
pub fn insert_instructor(conn: &Connection, instructor: &Instructor) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO instructors
         (id, first_name, last_name, department, overall_rating, material_clear,
          student_difficulties, num_evals)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            instructor.id,
            instructor.first_name,
            instructor.last_name,
            instructor.department,
            instructor.overall_rating,
            instructor.material_clear,
            instructor.student_difficulties,
            instructor.num_evals,
        ],
    )
    .map_err(|e| AppError::Store(format!("Failed to insert instructor: {}", e)))?;

    Ok(())
}

/// Insert or replace a course.
pub fn insert_course(conn: &Connection, course: &Course) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO courses (code, name, department) VALUES (?1, ?2, ?3)",
        params![course.code, course.name, course.department],
    )
    .map_err(|e| AppError::Store(format!("Failed to insert course: {}", e)))?;

    Ok(())
}

/// Insert or replace a review.
pub fn insert_review(conn: &Connection, review: &Review) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO reviews
         (id, instructor_id, course_code, grade, grade_level, course_type,
          rating_text, post_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            review.id,
            review.instructor_id,
            review.course_code,
            review.grade,
            review.grade_level,
            review.course_type,
            review.rating_text,
            review.post_date.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Store(format!("Failed to insert review: {}", e)))?;

    Ok(())
}

/// Insert a classified review fragment, validating its labels.
///
/// The offline classifier emits string labels; this is the point where they
/// are checked against the fixed enumerations, so tag drift is caught at
/// the boundary instead of surfacing mid-query.
pub fn insert_fragment(
    conn: &Connection,
    review_id: &str,
    aspect: &str,
    sentiment: &str,
    text: &str,
    token_count: u32,
) -> AppResult<i64> {
    let aspect = Aspect::parse_label(aspect)
        .ok_or_else(|| AppError::Store(format!("Unknown aspect label: {}", aspect)))?;
    let sentiment = Sentiment::parse_label(sentiment)
        .ok_or_else(|| AppError::Store(format!("Unknown sentiment label: {}", sentiment)))?;

    conn.execute(
        "INSERT INTO review_fragments (review_id, aspect, sentiment, text, token_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![review_id, aspect.label(), sentiment.label(), text, token_count],
    )
    .map_err(|e| AppError::Store(format!("Failed to insert fragment: {}", e)))?;

    Ok(conn.last_insert_rowid())
}

/// Load all instructors (the catalog index projection).
pub fn load_instructors(conn: &Connection) -> AppResult<Vec<Instructor>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, first_name, last_name, department, overall_rating,
                    material_clear, student_difficulties, num_evals
             FROM instructors",
        )
        .map_err(|e| AppError::Store(format!("Failed to prepare instructor query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(Instructor {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                department: row.get(3)?,
                overall_rating: row.get(4)?,
                material_clear: row.get(5)?,
                student_difficulties: row.get(6)?,
                num_evals: row.get::<_, i64>(7)? as u32,
            })
        })
        .map_err(|e| AppError::Store(format!("Failed to query instructors: {}", e)))?;

    let instructors: Vec<Instructor> = rows
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::Store(format!("Failed to read instructor row: {}", e)))?;

    tracing::debug!("Loaded {} instructors", instructors.len());
    Ok(instructors)
}

/// Look up a single instructor by identifier.
pub fn get_instructor(conn: &Connection, id: &str) -> AppResult<Option<Instructor>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, first_name, last_name, department, overall_rating,
                    material_clear, student_difficulties, num_evals
             FROM instructors WHERE id = ?1",
        )
        .map_err(|e| AppError::Store(format!("Failed to prepare instructor query: {}", e)))?;

    let mut rows = stmt
        .query_map(params![id], |row| {
            Ok(Instructor {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                department: row.get(3)?,
                overall_rating: row.get(4)?,
                material_clear: row.get(5)?,
                student_difficulties: row.get(6)?,
                num_evals: row.get::<_, i64>(7)? as u32,
            })
        })
        .map_err(|e| AppError::Store(format!("Failed to query instructor: {}", e)))?;

    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| {
            AppError::Store(format!("Failed to read instructor row: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Fetch the fragments eligible for a query, newest review first.
///
/// Ownership and (optional) course matching are enforced here in SQL, so a
/// fragment from another instructor's review can never reach the retriever.
/// An aspect set that is empty or just `overall` places no aspect
/// restriction — general questions draw on all tagged material.
pub fn eligible_fragments(
    conn: &Connection,
    instructor_id: &str,
    course_code: Option<&str>,
    aspects: &[Aspect],
) -> AppResult<Vec<ReviewFragment>> {
    let mut sql = String::from(
        "SELECT f.id, f.review_id, r.instructor_id, r.course_code, f.aspect,
                f.sentiment, f.text, f.token_count, r.post_date
         FROM review_fragments f
         JOIN reviews r ON f.review_id = r.id
         WHERE r.instructor_id = ?",
    );
    let mut params: Vec<String> = vec![instructor_id.to_string()];

    if let Some(course) = course_code {
        sql.push_str(" AND UPPER(r.course_code) = UPPER(?)");
        params.push(course.to_string());
    }

    let unrestricted = aspects.is_empty() || aspects == [Aspect::Overall];
    if !unrestricted {
        let placeholders = vec!["?"; aspects.len()].join(", ");
        sql.push_str(&format!(" AND f.aspect IN ({})", placeholders));
        params.extend(aspects.iter().map(|a| a.label().to_string()));
    }

    sql.push_str(" ORDER BY r.post_date DESC, f.token_count DESC, f.id ASC");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::Store(format!("Failed to prepare fragment query: {}", e)))?;

    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let aspect_label: String = row.get(4)?;
            let sentiment_label: String = row.get(5)?;
            let post_date_raw: String = row.get(8)?;

            let aspect = Aspect::parse_label(&aspect_label).ok_or_else(|| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(AppError::Store(format!(
                    "Unknown aspect label in store: {}",
                    aspect_label
                ))))
            })?;
            let sentiment = Sentiment::parse_label(&sentiment_label).ok_or_else(|| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(AppError::Store(format!(
                    "Unknown sentiment label in store: {}",
                    sentiment_label
                ))))
            })?;
            let post_date = parse_post_date(&post_date_raw)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(ReviewFragment {
                id: row.get(0)?,
                review_id: row.get(1)?,
                instructor_id: row.get(2)?,
                course_code: row.get(3)?,
                aspect,
                sentiment,
                text: row.get(6)?,
                token_count: row.get::<_, i64>(7)? as u32,
                post_date,
            })
        })
        .map_err(|e| AppError::Store(format!("Failed to query fragments: {}", e)))?;

    let fragments: Vec<ReviewFragment> = rows
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::Store(format!("Failed to read fragment row: {}", e)))?;

    tracing::debug!(
        "Found {} eligible fragments for instructor {}",
        fragments.len(),
        instructor_id
    );
    Ok(fragments)
}

/// Get counts for the stats command: (instructors, reviews, fragments).
pub fn store_stats(conn: &Connection) -> AppResult<(u32, u32, u32)> {
    let count = |table: &str| -> AppResult<u32> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Store(format!("Failed to count {}: {}", table, e)))
    };

    Ok((
        count("instructors")?,
        count("reviews")?,
        count("review_fragments")?,
    ))
}

/// Parse an RFC 3339 post date as stored by the ingestion pipeline.
fn parse_post_date(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Store(format!("Invalid post_date {:?}: {}", raw, e)))
}
