use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use errors::CustomError;
use helpers::validations::validations::{GameDescription, GameName, GameUrl, Instructions};
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::db_error::DbError;
use crate::routes::games::model::{CreateGameBody, Game, GameChangeset, UpdateGameBody};
use crate::routes::games::query::{project_games, CatalogQuery, Visibility};
use crate::schema::{comments, games, user_favorites};

/******************************************/
// Admin game management
/******************************************/
/**
 * @route   POST /api/v1/admin/games
 * @access  Admin
 */
#[instrument(name = "Create game", skip(pool, body))]
pub async fn create_game(
    pool: web::Data<PgPool>,
    body: web::Json<CreateGameBody>,
) -> Result<HttpResponse, CustomError> {
    let validated = body.into_inner().validate()?;

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let now = chrono::Utc::now().naive_utc();
    let new_game = Game {
        id: Uuid::new_v4(),
        name: validated.name.as_ref().to_string(),
        description: validated.description.as_ref().to_string(),
        category: validated.category,
        tags: validated.tags,
        game_type: validated.game_type,
        url: validated.url.as_ref().to_string(),
        thumbnail: validated.thumbnail,
        instructions: validated.instructions.map(|i| i.as_ref().to_string()),
        embed_width: validated.embed_width,
        embed_height: validated.embed_height,
        allow_fullscreen: validated.allow_fullscreen,
        custom_params: validated.custom_params,
        status: validated.status,
        play_count: 0,
        favorite_count: 0,
        total_ratings: 0,
        total_rating_score: 0,
        average_rating: 0.0,
        last_played: None,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(games::table)
        .values(&new_game)
        .execute(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "game": new_game }
    })))
}

/**
 * @route   GET /api/v1/admin/games
 * @access  Admin
 */
#[instrument(name = "List all games", skip(pool))]
pub async fn list_all_games(
    pool: web::Data<PgPool>,
    params: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let catalog = CatalogQuery::parse(&params, Visibility::Admin);

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
 * @route   PATCH /api/v1/admin/games/{id}
 * @access  Admin
 */
#[instrument(name = "Update game", skip(pool, body))]
pub async fn update_game(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
    body: web::Json<UpdateGameBody>,
) -> Result<HttpResponse, CustomError> {
    let game_id = game_id.into_inner();
    let body = body.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let mut game: Game = games::table
        .find(game_id)
        .first(&mut conn)
        .await
        .optional()
        .map_err(DbError::from)?
        .ok_or_else(|| CustomError::NotFound("Game not found".to_string()))?;

    if let Some(name) = body.name {
        game.name = GameName::parse(name)?.as_ref().to_string();
    }
    if let Some(description) = body.description {
        game.description = GameDescription::parse(description)?.as_ref().to_string();
    }
    if let Some(category) = body.category {
        if category.trim().is_empty() {
            return Err(CustomError::ValidationError(
                "Please specify the game category".to_string(),
            ));
        }
        game.category = category.trim().to_string();
    }
    if let Some(tags) = body.tags {
        game.tags = tags;
    }
    if let Some(game_type) = body.game_type {
        game.game_type = game_type;
    }
    if let Some(url) = body.url {
        game.url = GameUrl::parse(url)?.as_ref().to_string();
    }
    if let Some(thumbnail) = body.thumbnail {
        game.thumbnail = Some(thumbnail);
    }
    if let Some(instructions) = body.instructions {
        game.instructions = Some(Instructions::parse(instructions)?.as_ref().to_string());
    }
    if let Some(embed_width) = body.embed_width {
        if embed_width <= 0 {
            return Err(CustomError::ValidationError(
                "Embed width and height must be positive".to_string(),
            ));
        }
        game.embed_width = embed_width;
    }
    if let Some(embed_height) = body.embed_height {
        if embed_height <= 0 {
            return Err(CustomError::ValidationError(
                "Embed width and height must be positive".to_string(),
            ));
        }
        game.embed_height = embed_height;
    }
    if let Some(allow_fullscreen) = body.allow_fullscreen {
        game.allow_fullscreen = allow_fullscreen;
    }
    if let Some(custom_params) = body.custom_params {
        game.custom_params = Some(custom_params);
    }
    if let Some(status) = body.status {
        game.status = status;
    }
    game.updated_at = chrono::Utc::now().naive_utc();

    diesel::update(games::table.find(game_id))
        .set(GameChangeset::from(&game))
        .execute(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "game": game }
    })))
}

/**
 * @route   DELETE /api/v1/admin/games/{id}
 * @access  Admin
 */
#[instrument(name = "Delete game", skip(pool))]
pub async fn delete_game(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
) -> Result<HttpResponse, CustomError> {
    let game_id = game_id.into_inner();

    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    conn.transaction::<(), CustomError, _>(|conn| {
        async move {
            // Comments and favorites go with the game.
            diesel::delete(comments::table.filter(comments::game_id.eq(game_id)))
                .execute(conn)
                .await
                .map_err(DbError::from)?;
            diesel::delete(user_favorites::table.filter(user_favorites::game_id.eq(game_id)))
                .execute(conn)
                .await
                .map_err(DbError::from)?;

            let deleted = diesel::delete(games::table.find(game_id))
                .execute(conn)
                .await
                .map_err(DbError::from)?;
            if deleted == 0 {
                return Err(CustomError::NotFound("Game not found".to_string()));
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
