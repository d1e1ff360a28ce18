//! Student score record operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Stored student record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudentDetails {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub score: f64,
    pub created_at: String,
}

/// Raw save request; fields are loosely typed so that missing and
/// mistyped values both end up as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveStudentRequest {
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    pub score: Option<Value>,
}

/// Validated student ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub score: f64,
    /// Names as the caller spelled them, for the confirmation message
    pub display_first_name: String,
    pub display_last_name: String,
}

impl SaveStudentRequest {
    pub fn validate(self) -> Result<NewStudent> {
        let missing = || AppError::BadRequest("Missing required fields".to_string());

        let first = required_text(self.first_name.as_ref()).ok_or_else(missing)?;
        let last = required_text(self.last_name.as_ref()).ok_or_else(missing)?;
        let score = match self.score {
            None | Some(Value::Null) => return Err(missing()),
            Some(Value::String(s)) if s.trim().is_empty() => return Err(missing()),
            Some(value) => coerce_score(&value)?,
        };

        Ok(NewStudent {
            first_name: first.to_lowercase(),
            last_name: last.to_lowercase(),
            score,
            display_first_name: first.to_string(),
            display_last_name: last.to_string(),
        })
    }
}

impl NewStudent {
    pub fn confirmation(&self) -> String {
        format!(
            "Student Details saved: {} {} with a score of {}",
            self.display_first_name, self.display_last_name, self.score
        )
    }
}

/// Non-empty string field, or `None`
pub fn required_text(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn coerce_score(value: &Value) -> Result<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    score
        .filter(|s| s.is_finite())
        .ok_or_else(|| AppError::BadRequest(format!("score must be numeric, got {}", value)))
}

/// Student repository
pub struct StudentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StudentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a validated student
    pub async fn save(&self, student: &NewStudent) -> Result<StudentDetails> {
        let record = StudentDetails {
            id: Uuid::new_v4().to_string(),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            score: student.score,
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO student_details (id, first_name, last_name, score, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.score)
        .bind(&record.created_at)
        .execute(self.pool)
        .await?;

        Ok(record)
    }

    /// First stored student whose first name matches, ignoring case
    pub async fn find_by_first_name(&self, name: &str) -> Result<Option<StudentDetails>> {
        let student = sqlx::query_as::<_, StudentDetails>(
            r#"
            SELECT id, first_name, last_name, score, created_at
            FROM student_details
            WHERE first_name = ?
            ORDER BY rowid ASC
            LIMIT 1
            "#,
        )
        .bind(name.to_lowercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use serde_json::json;

    fn request(first: Value, last: Value, score: Value) -> SaveStudentRequest {
        SaveStudentRequest {
            first_name: Some(first),
            last_name: Some(last),
            score: Some(score),
        }
    }

    #[test]
    fn test_validate_lowercases_and_coerces_numeric_string() {
        let student = request(json!("Ada"), json!("Lovelace"), json!("91.5"))
            .validate()
            .unwrap();

        assert_eq!(student.first_name, "ada");
        assert_eq!(student.last_name, "lovelace");
        assert_eq!(student.score, 91.5);
        assert_eq!(
            student.confirmation(),
            "Student Details saved: Ada Lovelace with a score of 91.5"
        );
    }

    #[test]
    fn test_validate_missing_fields() {
        let missing_score = SaveStudentRequest {
            score: None,
            ..request(json!("Ada"), json!("Lovelace"), json!(1))
        };
        assert!(matches!(missing_score.validate(), Err(AppError::BadRequest(_))));

        let empty_name = request(json!(""), json!("Lovelace"), json!(1));
        assert!(matches!(empty_name.validate(), Err(AppError::BadRequest(_))));

        assert!(SaveStudentRequest::default().validate().is_err());
    }

    #[test]
    fn test_validate_blank_score_is_missing() {
        for blank in [json!(""), json!("   ")] {
            match request(json!("Ada"), json!("Lovelace"), blank).validate() {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Missing required fields"),
                other => panic!("expected missing fields, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_validate_zero_score_is_present() {
        let student = request(json!("Ada"), json!("L"), json!(0)).validate().unwrap();
        assert_eq!(student.score, 0.0);
    }

    #[test]
    fn test_validate_rejects_non_numeric_score() {
        let result = request(json!("Ada"), json!("Lovelace"), json!("abc")).validate();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_save_and_find_case_insensitive() {
        let pool = memory_pool().await;
        let repo = StudentRepository::new(&pool);

        let student = request(json!("Ada"), json!("Lovelace"), json!(98))
            .validate()
            .unwrap();
        repo.save(&student).await.unwrap();

        let found = repo.find_by_first_name("ADA").await.unwrap().unwrap();
        assert_eq!(found.first_name, "ada");
        assert_eq!(found.last_name, "lovelace");
        assert_eq!(found.score, 98.0);
    }

    #[tokio::test]
    async fn test_find_unknown_returns_none() {
        let pool = memory_pool().await;
        let repo = StudentRepository::new(&pool);

        assert!(repo.find_by_first_name("grace").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_returns_first_of_duplicates() {
        let pool = memory_pool().await;
        let repo = StudentRepository::new(&pool);

        for last in ["first", "second"] {
            let student = request(json!("Alan"), json!(last), json!(1)).validate().unwrap();
            repo.save(&student).await.unwrap();
        }

        let found = repo.find_by_first_name("alan").await.unwrap().unwrap();
        assert_eq!(found.last_name, "first");
    }
}
