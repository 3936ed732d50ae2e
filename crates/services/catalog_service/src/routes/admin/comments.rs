use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use errors::CustomError;
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregate;
use crate::db_error::DbError;
use crate::routes::comments::model::{Comment, CommentStatus, ModerationBody};
use crate::routes::games::query::page_window;
use crate::schema::comments;

/******************************************/
// Admin comment moderation
/******************************************/
/**
 * @route   PATCH /api/v1/admin/comments/{id}/moderate
 * @access  Admin
 */
#[instrument(name = "Moderate comment", skip(pool, body))]
pub async fn moderate_comment(
    pool: web::Data<PgPool>,
    comment_id: web::Path<Uuid>,
    body: web::Json<ModerationBody>,
) -> Result<HttpResponse, CustomError> {
    let comment_id = comment_id.into_inner();
    let new_status: CommentStatus = body.into_inner().status.into();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let moderated = conn
        .transaction::<Comment, CustomError, _>(|conn| {
            async move {
                let mut comment: Comment = comments::table
                    .find(comment_id)
                    .first(conn)
                    .await
                    .optional()
                    .map_err(DbError::from)?
                    .ok_or_else(|| CustomError::NotFound("Comment not found".to_string()))?;

                let old_status = comment.status;
                comment.status = new_status;
                comment.updated_at = chrono::Utc::now().naive_utc();

                diesel::update(comments::table.find(comment_id))
                    .set((
                        comments::status.eq(comment.status),
                        comments::updated_at.eq(comment.updated_at),
                    ))
                    .execute(conn)
                    .await
                    .map_err(DbError::from)?;

                // Moving into or out of approved shifts the game's aggregates.
                let (delta_count, delta_score) = aggregate::rating_delta(
                    (old_status, comment.rating),
                    Some((comment.status, comment.rating)),
                );
                aggregate::apply_rating_delta(conn, comment.game_id, delta_count, delta_score)
                    .await?;

                Ok(comment)
            }
            .scope_boxed()
        })
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "comment": moderated }
    })))
}

/**
 * @route   GET /api/v1/admin/comments/pending
 * @access  Admin
 */
#[instrument(name = "Get pending comments", skip(pool, params))]
pub async fn get_pending_comments(
    pool: web::Data<PgPool>,
    params: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let (offset, limit) = page_window(&params);

    let pending: Vec<Comment> = comments::table
        .filter(comments::status.eq(CommentStatus::Pending))
        .order(comments::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    let total: i64 = comments::table
        .filter(comments::status.eq(CommentStatus::Pending))
        .count()
        .get_result(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": pending.len(),
        "total": total,
        "data": { "comments": pending }
    })))
}
