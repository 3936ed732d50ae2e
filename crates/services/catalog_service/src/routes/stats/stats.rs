use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use anyhow::Context;
use diesel::dsl::{count_star, sql};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};
use diesel_async::RunQueryDsl;
use errors::CustomError;
use lib_config::db::db::PgPool;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregate;
use crate::db_error::DbError;
use crate::routes::games::model::{Game, GameStats, GameStatus};
use crate::routes::games::query::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::schema::games;

/// Summaries are reported to two decimals; the stored average stays exact.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/******************************************/
// Statistics routes
/******************************************/
/**
 * @route   POST /api/v1/protected/games/{id}/play
 * @access  Protected
 */
#[instrument(name = "Record game play", skip(pool))]
pub async fn record_game_play(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let stats = aggregate::increment_plays(&mut conn, game_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "stats": stats }
    })))
}

/**
 * @route   GET /api/v1/games/{id}/stats
 * @access  Public
 */
#[instrument(name = "Get game stats", skip(pool))]
pub async fn get_game_stats(
    pool: web::Data<PgPool>,
    game_id: web::Path<Uuid>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let stats: Option<GameStats> = games::table
        .find(game_id.into_inner())
        .select(GameStats::as_select())
        .first(&mut conn)
        .await
        .optional()
        .map_err(DbError::from)?;

    let Some(stats) = stats else {
        return Err(CustomError::NotFound("Game not found".to_string()));
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "stats": stats }
    })))
}

/**
 * @route   GET /api/v1/stats/popular
 * @access  Public
 */
#[instrument(name = "Get popular games", skip(pool, params))]
pub async fn get_popular_games(
    pool: web::Data<PgPool>,
    params: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let limit = params
        .get("limit")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let base = games::table
        .filter(games::status.eq(GameStatus::Active))
        .into_boxed();
    let query = match params.get("type").map(String::as_str) {
        Some("favorites") => base.order(games::favorite_count.desc()),
        Some("rating") => base.order(games::average_rating.desc()),
        // Anything else means plays, including the missing parameter.
        _ => base.order(games::play_count.desc()),
    };

    let popular: Vec<Game> = query
        .limit(limit)
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": popular.len(),
        "data": { "games": popular }
    })))
}

/**
 * @route   GET /api/v1/stats/overall
 * @access  Public
 */
#[instrument(name = "Get overall stats", skip(pool))]
pub async fn get_overall_stats(pool: web::Data<PgPool>) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    // The Int8 sums are cast back to int8 so they stay plain integers.
    let row: (i64, Option<i64>, Option<i64>, Option<i64>, Option<f64>, i64) = games::table
        .filter(games::status.eq(GameStatus::Active))
        .select((
            count_star(),
            sql::<Nullable<BigInt>>("SUM(play_count)::int8"),
            sql::<Nullable<BigInt>>("SUM(favorite_count)::int8"),
            sql::<Nullable<BigInt>>("SUM(total_ratings)::int8"),
            sql::<Nullable<Double>>("AVG(average_rating)"),
            sql::<BigInt>("COUNT(DISTINCT category)"),
        ))
        .first(&mut conn)
        .await
        .map_err(DbError::from)?;
    let (total_games, total_plays, total_favorites, total_ratings, average_rating, categories) =
        row;

    let distinct_tags: Vec<String> = games::table
        .filter(games::status.eq(GameStatus::Active))
        .select(sql::<Text>("DISTINCT unnest(tags)"))
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": {
            "stats": {
                "totalGames": total_games,
                "totalPlays": total_plays.unwrap_or(0),
                "totalFavorites": total_favorites.unwrap_or(0),
                "totalRatings": total_ratings.unwrap_or(0),
                "averageRating": round2(average_rating.unwrap_or(0.0)),
                "categoryCount": categories,
                "tagCount": distinct_tags.len(),
            }
        }
    })))
}

/**
 * @route   GET /api/v1/stats/categories
 * @access  Public
 */
#[instrument(name = "Get category stats", skip(pool))]
pub async fn get_category_stats(pool: web::Data<PgPool>) -> Result<HttpResponse, CustomError> {
    let mut conn = pool
        .get()
        .await
        .context("Failed to fetch connection from pool")?;

    let rows: Vec<(String, i64, Option<i64>, Option<i64>, Option<f64>)> = games::table
        .filter(games::status.eq(GameStatus::Active))
        .group_by(games::category)
        .select((
            games::category,
            count_star(),
            sql::<Nullable<BigInt>>("SUM(play_count)::int8"),
            sql::<Nullable<BigInt>>("SUM(favorite_count)::int8"),
            sql::<Nullable<Double>>("AVG(average_rating)"),
        ))
        .order(count_star().desc())
        .load(&mut conn)
        .await
        .map_err(DbError::from)?;

    let stats: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(category, count, plays, favorites, average)| {
            json!({
                "category": category,
                "count": count,
                "totalPlays": plays.unwrap_or(0),
                "totalFavorites": favorites.unwrap_or(0),
                "averageRating": round2(average.unwrap_or(0.0)),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": stats.len(),
        "data": { "stats": stats }
    })))
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn summary_averages_are_rounded_to_two_decimals() {
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(4.567), 4.57);
        assert_eq!(round2(0.0), 0.0);
    }
}
