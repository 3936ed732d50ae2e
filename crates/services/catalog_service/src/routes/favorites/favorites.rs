use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use errors::CustomError;
use helpers::auth_jwt::auth::Claims;
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregate;
use crate::db_error::DbError;
use crate::routes::games::model::{Game, GameStatus};
use crate::routes::games::query::page_window;
use crate::schema::{games, user_favorites};

/******************************************/
// Favorites routes
/******************************************/
/**
 * @route   GET /api/v1/protected/favorites
 * @access  Protected
 */
#[instrument(name = "Get favorites", skip(pool, params, claims))]
pub async fn get_favorites(
    pool: web::Data<PgPool>,
    params: web::Query<HashMap<String, String>>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let user_id = claims.into_inner().user_id()?;
    let (offset, limit) = page_window(&params);

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    // Favorites pointing at games that have since gone inactive are hidden.
    let favorites: Vec<Game> = user_favorites::table
        .inner_join(games::table)
        .filter(user_favorites::user_id.eq(user_id))
        .filter(games::status.eq(GameStatus::Active))
        .order(user_favorites::created_at.desc())
        .offset(offset)
        .limit(limit)
        .select(Game::as_select())
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    let total: i64 = user_favorites::table
        .inner_join(games::table)
        .filter(user_favorites::user_id.eq(user_id))
        .filter(games::status.eq(GameStatus::Active))
        .count()
        .get_result(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": favorites.len(),
        "total": total,
        "data": { "favorites": favorites }
    })))
}

/**
 * @route   POST /api/v1/protected/favorites/{game_id}
 * @access  Protected
 */
#[instrument(name = "Add favorite", skip(pool, claims))]
pub async fn add_to_favorites(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let user_id = claims.into_inner().user_id()?;
    let game_id = game_id.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    conn.transaction::<bool, CustomError, _>(|conn| {
        aggregate::add_favorite(conn, user_id, game_id).scope_boxed()
    })
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Game added to favorites"
    })))
}

/**
 * @route   DELETE /api/v1/protected/favorites/{game_id}
 * @access  Protected
 */
#[instrument(name = "Remove favorite", skip(pool, claims))]
pub async fn remove_from_favorites(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let user_id = claims.into_inner().user_id()?;
    let game_id = game_id.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    conn.transaction::<bool, CustomError, _>(|conn| {
        aggregate::remove_favorite(conn, user_id, game_id).scope_boxed()
    })
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Game removed from favorites"
    })))
}

/**
 * @route   GET /api/v1/protected/favorites/{game_id}/check
 * @access  Protected
 */
#[instrument(name = "Check favorite", skip(pool, claims))]
pub async fn check_favorite(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, CustomError> {
    let user_id = claims.into_inner().user_id()?;
    let game_id = game_id.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let is_favorite: bool = diesel::select(exists(
        user_favorites::table
            .filter(user_favorites::user_id.eq(user_id))
            .filter(user_favorites::game_id.eq(game_id)),
    ))
    .get_result(&mut conn)
    .await
    .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "isFavorite": is_favorite }
    })))
}
