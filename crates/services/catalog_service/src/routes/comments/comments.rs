use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use errors::CustomError;
use helpers::auth_jwt::auth::{Claims, Role};
use helpers::validations::validations::{CommentContent, StarRating};
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregate;
use crate::db_error::DbError;
use crate::routes::comments::model::{Comment, CommentStatus, CreateCommentBody, UpdateCommentBody};
use crate::routes::games::query::page_window;
use crate::schema::{comments, games};

/******************************************/
// Comment routes
/******************************************/
/**
 * @route   POST /api/v1/protected/games/{id}/comments
 * @access  Protected
 */
#[instrument(name = "Create comment", skip(pool, body, claims))]
pub async fn create_comment(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    body: web::Json<CreateCommentBody>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let user_id = claims.into_inner().user_id()?;
    let (content, rating) = body.into_inner().validate()?;

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let game_id = game_id.into_inner();
    let exists: Option<Uuid> = games::table
        .find(game_id)
        .select(games::id)
        .first(&mut conn)
        .await
        .optional()
        .map_err(DbError::from)?;
    if exists.is_none() {
        return Err(CustomError::NotFound("Game not found".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let new_comment = Comment {
        id: Uuid::new_v4(),
        content: content.as_ref().to_string(),
        rating: rating.map(|r| r.value()),
        user_id,
        game_id,
        // New comments wait for moderation and contribute nothing yet.
        status: CommentStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(comments::table)
        .values(&new_comment)
        .execute(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "comment": new_comment }
    })))
}

/**
 * @route   GET /api/v1/games/{id}/comments
 * @access  Public
 */
#[instrument(name = "List game comments", skip(pool, params))]
pub async fn list_game_comments(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    params: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let game_id = game_id.into_inner();
    let (offset, limit) = page_window(&params);

    // Only approved comments are visible to the public.
    let page_rows: Vec<Comment> = comments::table
        .filter(comments::game_id.eq(game_id))
        .filter(comments::status.eq(CommentStatus::Approved))
        .order(comments::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    let total: i64 = comments::table
        .filter(comments::game_id.eq(game_id))
        .filter(comments::status.eq(CommentStatus::Approved))
        .count()
        .get_result(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": page_rows.len(),
        "total": total,
        "data": { "comments": page_rows }
    })))
}

/**
 * @route   GET /api/v1/comments/{id}
 * @access  Public
 */
#[instrument(name = "Get comment", skip(pool))]
pub async fn get_comment(
    pool: web::Data<PgPool>,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let comment: Option<Comment> = comments::table
        .find(comment_id.into_inner())
        .first(&mut conn)
        .await
        .optional()
        .map_err(DbError::from)?;

    let Some(comment) = comment else {
        return Err(CustomError::NotFound("Comment not found".to_string()));
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "comment": comment }
    })))
}

/**
 * @route   PATCH /api/v1/protected/comments/{id}
 * @access  Protected (author or admin)
 */
#[instrument(name = "Update comment", skip(pool, body, claims))]
pub async fn update_comment(
    pool: web::Data<PgPool>,
    comment_id: web::Path<Uuid>,
    body: web::Json<UpdateCommentBody>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let claims = claims.into_inner();
    let caller_id = claims.user_id()?;
    let is_admin = claims.role == Role::Admin;
    let comment_id = comment_id.into_inner();
    let body = body.into_inner();

    let new_content = body.content.map(CommentContent::parse).transpose()?;
    let new_rating = body.rating.map(StarRating::parse).transpose()?;

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let updated = conn
        .transaction::<Comment, CustomError, _>(|conn| {
            async move {
                let mut comment: Comment = comments::table
                    .find(comment_id)
                    .first(conn)
                    .await
                    .optional()
                    .map_err(DbError::from)?
                    .ok_or_else(|| CustomError::NotFound("Comment not found".to_string()))?;

                if comment.user_id != caller_id && !is_admin {
                    return Err(CustomError::AuthorizationError(
                        "You can only update your own comments".to_string(),
                    ));
                }

                let old_rating = comment.rating;
                if let Some(content) = new_content {
                    comment.content = content.as_ref().to_string();
                }
                if let Some(rating) = new_rating {
                    comment.rating = Some(rating.value());
                }
                comment.updated_at = chrono::Utc::now().naive_utc();

                diesel::update(comments::table.find(comment_id))
                    .set((
                        comments::content.eq(comment.content.clone()),
                        comments::rating.eq(comment.rating),
                        comments::updated_at.eq(comment.updated_at),
                    ))
                    .execute(conn)
                    .await
                    .map_err(DbError::from)?;

                // An edited rating on an approved comment moves the aggregates.
                let (delta_count, delta_score) = aggregate::rating_delta(
                    (comment.status, old_rating),
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
        "data": { "comment": updated }
    })))
}

/**
 * @route   DELETE /api/v1/protected/comments/{id}
 * @access  Protected (author or admin)
 */
#[instrument(name = "Delete comment", skip(pool, claims))]
pub async fn delete_comment(
    pool: web::Data<PgPool>,
    comment_id: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let claims = claims.into_inner();
    let caller_id = claims.user_id()?;
    let is_admin = claims.role == Role::Admin;
    let comment_id = comment_id.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    conn.transaction::<(), CustomError, _>(|conn| {
        async move {
            let comment: Comment = comments::table
                .find(comment_id)
                .first(conn)
                .await
                .optional()
                .map_err(DbError::from)?
                .ok_or_else(|| CustomError::NotFound("Comment not found".to_string()))?;

            if comment.user_id != caller_id && !is_admin {
                return Err(CustomError::AuthorizationError(
                    "You can only delete your own comments".to_string(),
                ));
            }

            diesel::delete(comments::table.find(comment_id))
                .execute(conn)
                .await
                .map_err(DbError::from)?;

            let (delta_count, delta_score) =
                aggregate::rating_delta((comment.status, comment.rating), None);
            aggregate::apply_rating_delta(conn, comment.game_id, delta_count, delta_score).await?;

            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
