//! Counter maintenance for the statistics columns on `games`.
//!
//! Every mutation goes through `SET col = col + delta` so concurrent events
//! cannot lose updates, and the stored average is recomputed inside the same
//! statement from the post-update count and score.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use errors::CustomError;
use uuid::Uuid;

use crate::db_error::DbError;
use crate::routes::comments::model::CommentStatus;
use crate::routes::games::model::{GameStats, GameStatus};
use crate::schema::{games, user_favorites};

/// What a comment currently adds to `(total_ratings, total_rating_score)`.
/// Only approved comments that carry a rating count for anything.
pub fn contribution(status: CommentStatus, rating: Option<i32>) -> (i64, i64) {
    match (status, rating) {
        (CommentStatus::Approved, Some(rating)) => (1, i64::from(rating)),
        _ => (0, 0),
    }
}

/// The aggregate delta caused by a comment transition. `after` is `None`
/// when the comment is deleted.
pub fn rating_delta(
    before: (CommentStatus, Option<i32>),
    after: Option<(CommentStatus, Option<i32>)>,
) -> (i64, i64) {
    let (old_count, old_score) = contribution(before.0, before.1);
    let (new_count, new_score) = after
        .map(|(status, rating)| contribution(status, rating))
        .unwrap_or((0, 0));
    (new_count - old_count, new_score - old_score)
}

/// The average the database must hold for a given count and score.
pub fn recompute_average(total_ratings: i64, total_rating_score: i64) -> f64 {
    if total_ratings > 0 {
        total_rating_score as f64 / total_ratings as f64
    } else {
        0.0
    }
}

/// Records one play: bumps the counter and stamps `last_played`, returning
/// the fresh statistics snapshot.
pub async fn increment_plays(
    conn: &mut AsyncPgConnection,
    game_id: Uuid,
) -> Result<GameStats, CustomError> {
    let stats = diesel::update(games::table.filter(games::id.eq(game_id)))
        .set((
            games::play_count.eq(games::play_count + 1),
            games::last_played.eq(diesel::dsl::now.nullable()),
            games::updated_at.eq(diesel::dsl::now),
        ))
        .returning(GameStats::as_returning())
        .get_result(conn)
        .await
        .map_err(DbError::from)?;
    Ok(stats)
}

/// Applies a `(count, score)` delta to a game's rating aggregates. The
/// average is derived from the post-update values in the same statement, so
/// the stored triple can never disagree with itself.
pub async fn apply_rating_delta(
    conn: &mut AsyncPgConnection,
    game_id: Uuid,
    delta_count: i64,
    delta_score: i64,
) -> Result<(), CustomError> {
    if delta_count == 0 && delta_score == 0 {
        return Ok(());
    }

    let updated = diesel::update(games::table.filter(games::id.eq(game_id)))
        .set((
            games::total_ratings.eq(games::total_ratings + delta_count),
            games::total_rating_score.eq(games::total_rating_score + delta_score),
            games::average_rating.eq(sql::<Double>("CASE WHEN total_ratings + ")
                .bind::<BigInt, _>(delta_count)
                .sql(" > 0 THEN (total_rating_score + ")
                .bind::<BigInt, _>(delta_score)
                .sql(")::float8 / (total_ratings + ")
                .bind::<BigInt, _>(delta_count)
                .sql(") ELSE 0 END")),
            games::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .map_err(DbError::from)?;

    if updated == 0 {
        return Err(CustomError::NotFound("Game not found".to_string()));
    }
    Ok(())
}

/// Adds a game to a user's favorites. Returns whether the favorite was
/// newly created; repeated adds are no-ops and leave the counter alone.
pub async fn add_favorite(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    game_id: Uuid,
) -> Result<bool, CustomError> {
    require_active_game(conn, game_id).await?;

    let inserted = diesel::insert_into(user_favorites::table)
        .values((
            user_favorites::user_id.eq(user_id),
            user_favorites::game_id.eq(game_id),
        ))
        .on_conflict_do_nothing()
        .execute(conn)
        .await
        .map_err(DbError::from)?;

    // The counter only moves when a row actually appeared.
    if inserted == 1 {
        diesel::update(games::table.filter(games::id.eq(game_id)))
            .set((
                games::favorite_count.eq(games::favorite_count + 1),
                games::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .map_err(DbError::from)?;
    }
    Ok(inserted == 1)
}

/// Removes a game from a user's favorites. Removing a game that was never
/// favorited is a no-op.
pub async fn remove_favorite(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    game_id: Uuid,
) -> Result<bool, CustomError> {
    let deleted = diesel::delete(
        user_favorites::table
            .filter(user_favorites::user_id.eq(user_id))
            .filter(user_favorites::game_id.eq(game_id)),
    )
    .execute(conn)
    .await
    .map_err(DbError::from)?;

    if deleted == 1 {
        diesel::update(games::table.filter(games::id.eq(game_id)))
            .set((
                games::favorite_count.eq(games::favorite_count - 1),
                games::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .map_err(DbError::from)?;
    }
    Ok(deleted == 1)
}

async fn require_active_game(
    conn: &mut AsyncPgConnection,
    game_id: Uuid,
) -> Result<(), CustomError> {
    let found: Option<Uuid> = games::table
        .filter(games::id.eq(game_id))
        .filter(games::status.eq(GameStatus::Active))
        .select(games::id)
        .first(conn)
        .await
        .optional()
        .map_err(DbError::from)?;

    match found {
        Some(_) => Ok(()),
        None => Err(CustomError::NotFound(
            "Game not found or not available".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_approved_rated_comments_contribute() {
        assert_eq!(contribution(CommentStatus::Approved, Some(4)), (1, 4));
        assert_eq!(contribution(CommentStatus::Approved, None), (0, 0));
        assert_eq!(contribution(CommentStatus::Pending, Some(4)), (0, 0));
        assert_eq!(contribution(CommentStatus::Rejected, Some(4)), (0, 0));
    }

    #[test]
    fn approving_a_rated_comment_adds_its_rating() {
        let delta = rating_delta(
            (CommentStatus::Pending, Some(5)),
            Some((CommentStatus::Approved, Some(5))),
        );
        assert_eq!(delta, (1, 5));
    }

    #[test]
    fn rejecting_an_approved_comment_subtracts_its_rating() {
        let delta = rating_delta(
            (CommentStatus::Approved, Some(3)),
            Some((CommentStatus::Rejected, Some(3))),
        );
        assert_eq!(delta, (-1, -3));
    }

    #[test]
    fn rejecting_a_pending_comment_changes_nothing() {
        let delta = rating_delta(
            (CommentStatus::Pending, Some(3)),
            Some((CommentStatus::Rejected, Some(3))),
        );
        assert_eq!(delta, (0, 0));
    }

    #[test]
    fn deleting_an_approved_comment_subtracts_its_rating() {
        assert_eq!(rating_delta((CommentStatus::Approved, Some(2)), None), (-1, -2));
    }

    #[test]
    fn deleting_a_pending_comment_changes_nothing() {
        assert_eq!(rating_delta((CommentStatus::Pending, Some(2)), None), (0, 0));
    }

    #[test]
    fn editing_the_rating_of_an_approved_comment_moves_the_score_only() {
        let delta = rating_delta(
            (CommentStatus::Approved, Some(2)),
            Some((CommentStatus::Approved, Some(5))),
        );
        assert_eq!(delta, (0, 3));
    }

    #[test]
    fn unrated_comments_never_move_the_aggregates() {
        let delta = rating_delta(
            (CommentStatus::Pending, None),
            Some((CommentStatus::Approved, None)),
        );
        assert_eq!(delta, (0, 0));
    }

    #[test]
    fn a_moderation_sequence_keeps_the_aggregates_consistent() {
        let mut totals = (0i64, 0i64);
        let mut apply = |delta: (i64, i64)| {
            totals.0 += delta.0;
            totals.1 += delta.1;
        };

        // Approve a 4, approve a 5, then reject the 4 again.
        apply(rating_delta(
            (CommentStatus::Pending, Some(4)),
            Some((CommentStatus::Approved, Some(4))),
        ));
        apply(rating_delta(
            (CommentStatus::Pending, Some(5)),
            Some((CommentStatus::Approved, Some(5))),
        ));
        apply(rating_delta(
            (CommentStatus::Approved, Some(4)),
            Some((CommentStatus::Rejected, Some(4))),
        ));

        assert_eq!(totals, (1, 5));
        assert_eq!(recompute_average(totals.0, totals.1), 5.0);
    }

    #[test]
    fn the_average_is_score_over_count_or_zero() {
        assert_eq!(recompute_average(0, 0), 0.0);
        assert_eq!(recompute_average(2, 9), 4.5);
        assert_eq!(recompute_average(3, 10), 10.0 / 3.0);
    }
}
