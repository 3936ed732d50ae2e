use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;
use errors::CustomError;
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::db_error::DbError;
use crate::routes::games::model::Game;
use crate::routes::games::query::{project_games, CatalogQuery, Visibility};
use crate::schema::games;

/******************************************/
// Public catalog routes
/******************************************/
/**
 * @route   GET /api/v1/games
 * @access  Public
 */
#[instrument(name = "List games", skip(pool))]
pub async fn list_games(
    pool: web::Data<PgPool>,
    params: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let catalog = CatalogQuery::parse(&params, Visibility::Public);

    let page: Vec<Game> = catalog
        .select_games()
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;
    let total: i64 = catalog
        .count_games()
        .get_result(&mut conn)
        .await
        .map_err(DbError::from)?;

    let games = project_games(&page, catalog.fields.as_deref())
        .context("Failed to serialize game listing")?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": games.len(),
        "total": total,
        "data": { "games": games }
    })))
}

/**
 * @route   GET /api/v1/games/{id}
 * @access  Public
 */
#[instrument(name = "Get game", skip(pool))]
pub async fn get_game(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let game: Option<Game> = games::table
        .find(game_id.into_inner())
        .first(&mut conn)
        .await
        .optional()
        .map_err(DbError::from)?;

    let Some(game) = game else {
        return Err(CustomError::NotFound("Game not found".to_string()));
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "game": game }
    })))
}

/**
 * @route   GET /api/v1/games/categories
 * @access  Public
 */
#[instrument(name = "Get categories", skip(pool))]
pub async fn get_categories(pool: web::Data<PgPool>) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let categories: Vec<String> = games::table
        .select(games::category)
        .distinct()
        .order(games::category.asc())
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "categories": categories }
    })))
}

/**
 * @route   GET /api/v1/games/tags
 * @access  Public
 */
#[instrument(name = "Get tags", skip(pool))]
pub async fn get_tags(pool: web::Data<PgPool>) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    // Tags live in an array column, so distinct values come from unnest.
    let tags: Vec<String> = games::table
        .select(sql::<Text>("DISTINCT unnest(tags)"))
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "tags": tags }
    })))
}
