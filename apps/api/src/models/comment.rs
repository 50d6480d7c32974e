use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Reviewer note attached to a candidate. Append-only: never edited or removed
/// except when the candidate itself is erased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub author: String,
    pub text: String,
}

impl NewComment {
    pub fn into_comment(self, candidate_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            candidate_id,
            author: self.author.trim().to_string(),
            text: self.text,
            created_at: Utc::now(),
        }
    }
}
