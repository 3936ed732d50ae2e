use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use errors::CustomError;
use helpers::validations::validations::{CommentContent, StarRating};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::CommentStatus"]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

/// A user comment with an optional star rating. Only approved comments
/// contribute to a game's rating aggregates.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub rating: Option<i32>,
    pub user_id: Uuid,
    pub game_id: Uuid,
    pub status: CommentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
    pub content: String,
    pub rating: Option<i32>,
}

impl CreateCommentBody {
    pub fn validate(self) -> Result<(CommentContent, Option<StarRating>), CustomError> {
        let content = CommentContent::parse(self.content)?;
        let rating = self.rating.map(StarRating::parse).transpose()?;
        Ok((content, rating))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentBody {
    pub content: Option<String>,
    pub rating: Option<i32>,
}

/// Moderation can only land a comment on approved or rejected. A comment
/// never goes back to pending.
#[derive(Debug, Deserialize)]
pub struct ModerationBody {
    pub status: ModerationStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Approved,
    Rejected,
}

impl From<ModerationStatus> for CommentStatus {
    fn from(value: ModerationStatus) -> Self {
        match value {
            ModerationStatus::Approved => CommentStatus::Approved,
            ModerationStatus::Rejected => CommentStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CreateCommentBody;
    use claims::{assert_err, assert_ok};

    #[test]
    fn a_comment_with_a_valid_rating_passes() {
        let body = CreateCommentBody {
            content: "Great game".to_string(),
            rating: Some(5),
        };
        assert_ok!(body.validate());
    }

    #[test]
    fn a_comment_without_a_rating_passes() {
        let body = CreateCommentBody {
            content: "Great game".to_string(),
            rating: None,
        };
        assert_ok!(body.validate());
    }

    #[test]
    fn an_out_of_range_rating_is_rejected() {
        for rating in [0, 6, -1] {
            let body = CreateCommentBody {
                content: "Great game".to_string(),
                rating: Some(rating),
            };
            assert_err!(body.validate());
        }
    }

    #[test]
    fn empty_content_is_rejected() {
        let body = CreateCommentBody {
            content: "   ".to_string(),
            rating: Some(3),
        };
        assert_err!(body.validate());
    }
}
