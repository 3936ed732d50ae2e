use std::collections::HashMap;

use diesel::dsl::sql;
use diesel::expression::expression_types::NotSelectable;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Double, Text};
use serde_json::Value;

use super::model::{Game, GameStatus, GameType};
use crate::schema::games;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
/// Hard ceiling on page size. The listing endpoints refuse to hand out
/// unbounded result windows.
pub const MAX_PAGE_LIMIT: i64 = 100;

pub type BoxedGameQuery = games::BoxedQuery<'static, Pg>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Listing is layered on a non-overridable `status = active` filter.
    Public,
    /// The caller may filter on status explicitly.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    PlayCount,
    FavoriteCount,
    TotalRatings,
    AverageRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// The closed set of predicate kinds a listing request can express. Anything
/// a caller sends that does not translate into one of these is dropped at
/// the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Status(GameStatus),
    Category(String),
    GameType(GameType),
    TagsAnyOf(Vec<String>),
    Range {
        field: RangeField,
        op: RangeOp,
        value: f64,
    },
    TextSearch(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Category,
    CreatedAt,
    UpdatedAt,
    PlayCount,
    FavoriteCount,
    TotalRatings,
    AverageRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub fields: Option<Vec<String>>,
    pub page: i64,
    pub limit: i64,
}

impl CatalogQuery {
    /// Translates raw query parameters into a whitelisted query description.
    /// Malformed values never error: they fall back to defaults or are
    /// dropped, so a hostile query string degrades to a plain listing.
    pub fn parse(params: &HashMap<String, String>, visibility: Visibility) -> Self {
        let mut predicates = Vec::new();
        if visibility == Visibility::Public {
            predicates.push(Predicate::Status(GameStatus::Active));
        }

        for (key, value) in params {
            match key.as_str() {
                // Control parameters, never data filters.
                "page" | "limit" | "sort" | "fields" => continue,
                "category" => {
                    if !value.trim().is_empty() {
                        predicates.push(Predicate::Category(value.trim().to_string()));
                    }
                }
                "type" => {
                    if let Some(game_type) = parse_game_type(value) {
                        predicates.push(Predicate::GameType(game_type));
                    }
                }
                "status" => {
                    if visibility == Visibility::Admin {
                        if let Some(status) = parse_game_status(value) {
                            predicates.push(Predicate::Status(status));
                        }
                    }
                }
                "tags" => {
                    let tags: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect();
                    if !tags.is_empty() {
                        predicates.push(Predicate::TagsAnyOf(tags));
                    }
                }
                "search" => {
                    if !value.trim().is_empty() {
                        predicates.push(Predicate::TextSearch(value.trim().to_string()));
                    }
                }
                other => {
                    if let Some((field, op)) = parse_range_key(other) {
                        if let Ok(value) = value.trim().parse::<f64>() {
                            predicates.push(Predicate::Range { field, op, value });
                        }
                    }
                }
            }
        }

        CatalogQuery {
            predicates,
            sort: parse_sort(params.get("sort").map(String::as_str)),
            fields: parse_fields(params.get("fields").map(String::as_str)),
            page: clamped_number(params.get("page"), 1, 1, i64::MAX),
            limit: clamped_number(params.get("limit"), DEFAULT_PAGE_LIMIT, 1, MAX_PAGE_LIMIT),
        }
    }

    // Saturates so an absurd page number degrades to an empty page instead
    // of overflowing the multiplication.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::TextSearch(term) => Some(term.as_str()),
            _ => None,
        })
    }

    /// The page of rows, filtered, ordered and windowed.
    pub fn select_games(&self) -> BoxedGameQuery {
        let query = apply_predicates(games::table.into_boxed(), &self.predicates);
        apply_ordering(query, self)
            .offset(self.offset())
            .limit(self.limit)
    }

    /// The matching total, over the identical predicate list. Keeping both
    /// queries derived from `self.predicates` is what keeps `total` honest
    /// against the visible pages.
    pub fn count_games(&self) -> diesel::dsl::Select<BoxedGameQuery, diesel::dsl::CountStar> {
        apply_predicates(games::table.into_boxed(), &self.predicates).count()
    }
}

fn parse_game_type(value: &str) -> Option<GameType> {
    match value.trim() {
        "iframe" => Some(GameType::Iframe),
        "api" => Some(GameType::Api),
        "custom" => Some(GameType::Custom),
        _ => None,
    }
}

fn parse_game_status(value: &str) -> Option<GameStatus> {
    match value.trim() {
        "active" => Some(GameStatus::Active),
        "inactive" => Some(GameStatus::Inactive),
        _ => None,
    }
}

/// Accepts `field[op]` keys, e.g. `averageRating[gte]`, for the fixed
/// numeric-filter vocabulary. Anything else is not a range filter.
fn parse_range_key(key: &str) -> Option<(RangeField, RangeOp)> {
    let key = key.strip_suffix(']')?;
    let (field, op) = key.split_once('[')?;
    let field = match field {
        "playCount" | "play_count" => RangeField::PlayCount,
        "favoriteCount" | "favorite_count" => RangeField::FavoriteCount,
        "totalRatings" | "total_ratings" => RangeField::TotalRatings,
        "averageRating" | "average_rating" => RangeField::AverageRating,
        _ => return None,
    };
    let op = match op {
        "gt" => RangeOp::Gt,
        "gte" => RangeOp::Gte,
        "lt" => RangeOp::Lt,
        "lte" => RangeOp::Lte,
        _ => return None,
    };
    Some((field, op))
}

fn parse_sort(sort: Option<&str>) -> Vec<SortKey> {
    let default = vec![SortKey {
        field: SortField::CreatedAt,
        descending: true,
    }];
    let Some(sort) = sort else {
        return default;
    };

    let keys: Vec<SortKey> = sort
        .split(',')
        .filter_map(|token| {
            let token = token.trim();
            let (name, descending) = match token.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (token, false),
            };
            let field = match name {
                "name" => SortField::Name,
                "category" => SortField::Category,
                "createdAt" | "created_at" => SortField::CreatedAt,
                "updatedAt" | "updated_at" => SortField::UpdatedAt,
                "playCount" | "play_count" => SortField::PlayCount,
                "favoriteCount" | "favorite_count" => SortField::FavoriteCount,
                "totalRatings" | "total_ratings" => SortField::TotalRatings,
                "averageRating" | "average_rating" => SortField::AverageRating,
                _ => return None,
            };
            Some(SortKey { field, descending })
        })
        .collect();

    if keys.is_empty() {
        default
    } else {
        keys
    }
}

fn parse_fields(fields: Option<&str>) -> Option<Vec<String>> {
    let fields: Vec<String> = fields?
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn clamped_number(value: Option<&String>, default: i64, min: i64, max: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

/// `(offset, limit)` window for endpoints that paginate without the full
/// query builder (comment lists, favorites). Same defaults, clamping and
/// overflow behavior as listings.
pub fn page_window(params: &HashMap<String, String>) -> (i64, i64) {
    let page = clamped_number(params.get("page"), 1, 1, i64::MAX);
    let limit = clamped_number(params.get("limit"), DEFAULT_PAGE_LIMIT, 1, MAX_PAGE_LIMIT);
    ((page - 1).saturating_mul(limit), limit)
}

fn apply_predicates(mut query: BoxedGameQuery, predicates: &[Predicate]) -> BoxedGameQuery {
    for predicate in predicates {
        query = match predicate {
            Predicate::Status(value) => query.filter(games::status.eq(*value)),
            Predicate::Category(value) => query.filter(games::category.eq(value.clone())),
            Predicate::GameType(value) => query.filter(games::game_type.eq(*value)),
            Predicate::TagsAnyOf(values) => {
                query.filter(games::tags.overlaps_with(values.clone()))
            }
            Predicate::Range { field, op, value } => apply_range(query, *field, *op, *value),
            Predicate::TextSearch(term) => query.filter(
                sql::<Bool>(
                    "to_tsvector('english', name || ' ' || description) @@ plainto_tsquery('english', ",
                )
                .bind::<Text, _>(term.clone())
                .sql(")"),
            ),
        };
    }
    query
}

fn apply_range(query: BoxedGameQuery, field: RangeField, op: RangeOp, value: f64) -> BoxedGameQuery {
    match field {
        RangeField::AverageRating => match op {
            RangeOp::Gt => query.filter(games::average_rating.gt(value)),
            RangeOp::Gte => query.filter(games::average_rating.ge(value)),
            RangeOp::Lt => query.filter(games::average_rating.lt(value)),
            RangeOp::Lte => query.filter(games::average_rating.le(value)),
        },
        RangeField::PlayCount => {
            let value = value as i64;
            match op {
                RangeOp::Gt => query.filter(games::play_count.gt(value)),
                RangeOp::Gte => query.filter(games::play_count.ge(value)),
                RangeOp::Lt => query.filter(games::play_count.lt(value)),
                RangeOp::Lte => query.filter(games::play_count.le(value)),
            }
        }
        RangeField::FavoriteCount => {
            let value = value as i64;
            match op {
                RangeOp::Gt => query.filter(games::favorite_count.gt(value)),
                RangeOp::Gte => query.filter(games::favorite_count.ge(value)),
                RangeOp::Lt => query.filter(games::favorite_count.lt(value)),
                RangeOp::Lte => query.filter(games::favorite_count.le(value)),
            }
        }
        RangeField::TotalRatings => {
            let value = value as i64;
            match op {
                RangeOp::Gt => query.filter(games::total_ratings.gt(value)),
                RangeOp::Gte => query.filter(games::total_ratings.ge(value)),
                RangeOp::Lt => query.filter(games::total_ratings.lt(value)),
                RangeOp::Lte => query.filter(games::total_ratings.le(value)),
            }
        }
    }
}

fn apply_ordering(query: BoxedGameQuery, catalog_query: &CatalogQuery) -> BoxedGameQuery {
    // Relevance wins over any requested sort.
    if let Some(term) = catalog_query.search_term() {
        return query.order(
            sql::<Double>(
                "ts_rank(to_tsvector('english', name || ' ' || description), plainto_tsquery('english', ",
            )
            .bind::<Text, _>(term.to_string())
            .sql(")) DESC"),
        );
    }

    let mut query = query;
    for key in &catalog_query.sort {
        let expr: Box<dyn BoxableExpression<games::table, Pg, SqlType = NotSelectable>> =
            match (key.field, key.descending) {
                (SortField::Name, false) => Box::new(games::name.asc()),
                (SortField::Name, true) => Box::new(games::name.desc()),
                (SortField::Category, false) => Box::new(games::category.asc()),
                (SortField::Category, true) => Box::new(games::category.desc()),
                (SortField::CreatedAt, false) => Box::new(games::created_at.asc()),
                (SortField::CreatedAt, true) => Box::new(games::created_at.desc()),
                (SortField::UpdatedAt, false) => Box::new(games::updated_at.asc()),
                (SortField::UpdatedAt, true) => Box::new(games::updated_at.desc()),
                (SortField::PlayCount, false) => Box::new(games::play_count.asc()),
                (SortField::PlayCount, true) => Box::new(games::play_count.desc()),
                (SortField::FavoriteCount, false) => Box::new(games::favorite_count.asc()),
                (SortField::FavoriteCount, true) => Box::new(games::favorite_count.desc()),
                (SortField::TotalRatings, false) => Box::new(games::total_ratings.asc()),
                (SortField::TotalRatings, true) => Box::new(games::total_ratings.desc()),
                (SortField::AverageRating, false) => Box::new(games::average_rating.asc()),
                (SortField::AverageRating, true) => Box::new(games::average_rating.desc()),
            };
        query = query.then_order_by(expr);
    }
    query
}

/// Serialization-time field projection. Unknown field names simply select
/// nothing; `id` is always kept.
pub fn project_games(
    games: &[Game],
    fields: Option<&[String]>,
) -> Result<Vec<Value>, serde_json::Error> {
    games
        .iter()
        .map(|game| {
            let mut value = serde_json::to_value(game)?;
            if let (Some(keep), Value::Object(map)) = (fields, &mut value) {
                map.retain(|key, _| key == "id" || keep.iter().any(|f| f == key));
            }
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn control_parameters_never_become_predicates() {
        let query = CatalogQuery::parse(
            &params(&[
                ("page", "2"),
                ("limit", "5"),
                ("sort", "-createdAt"),
                ("category", "puzzle"),
            ]),
            Visibility::Public,
        );

        assert_eq!(query.page, 2);
        assert_eq!(query.limit, 5);
        assert_eq!(
            query.predicates,
            vec![
                Predicate::Status(GameStatus::Active),
                Predicate::Category("puzzle".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_filter_keys_are_dropped() {
        let query = CatalogQuery::parse(
            &params(&[("isAdmin", "true"), ("__proto__", "x")]),
            Visibility::Public,
        );
        assert_eq!(query.predicates, vec![Predicate::Status(GameStatus::Active)]);
    }

    #[test]
    fn public_listings_cannot_override_the_active_filter() {
        let query = CatalogQuery::parse(&params(&[("status", "inactive")]), Visibility::Public);
        assert_eq!(query.predicates, vec![Predicate::Status(GameStatus::Active)]);
    }

    #[test]
    fn admin_listings_may_filter_on_status() {
        let query = CatalogQuery::parse(&params(&[("status", "inactive")]), Visibility::Admin);
        assert_eq!(
            query.predicates,
            vec![Predicate::Status(GameStatus::Inactive)]
        );
    }

    #[test]
    fn relational_operators_use_the_fixed_vocabulary() {
        let query = CatalogQuery::parse(
            &params(&[("averageRating[gte]", "4")]),
            Visibility::Admin,
        );
        assert_eq!(
            query.predicates,
            vec![Predicate::Range {
                field: RangeField::AverageRating,
                op: RangeOp::Gte,
                value: 4.0,
            }]
        );
    }

    #[test]
    fn unknown_operators_and_fields_are_dropped() {
        let query = CatalogQuery::parse(
            &params(&[
                ("averageRating[regex]", ".*"),
                ("password[gte]", "1"),
                ("playCount[gt]", "not-a-number"),
            ]),
            Visibility::Admin,
        );
        assert_eq!(query.predicates, vec![]);
    }

    #[test]
    fn multiple_tags_become_a_set_membership_test() {
        let query = CatalogQuery::parse(
            &params(&[("tags", "space, puzzle ,")]),
            Visibility::Admin,
        );
        assert_eq!(
            query.predicates,
            vec![Predicate::TagsAnyOf(vec![
                "space".to_string(),
                "puzzle".to_string(),
            ])]
        );
    }

    #[test]
    fn pagination_defaults_and_clamping() {
        let query = CatalogQuery::parse(&params(&[]), Visibility::Public);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_LIMIT);

        let query = CatalogQuery::parse(
            &params(&[("page", "abc"), ("limit", "99999")]),
            Visibility::Public,
        );
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_LIMIT);

        let query = CatalogQuery::parse(
            &params(&[("page", "0"), ("limit", "-4")]),
            Visibility::Public,
        );
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 1);
    }

    #[test]
    fn the_skip_window_follows_the_page() {
        let query = CatalogQuery::parse(&params(&[("page", "3"), ("limit", "5")]), Visibility::Public);
        assert_eq!(query.offset(), 10);
    }

    #[test]
    fn a_huge_page_number_saturates_instead_of_overflowing() {
        let huge = i64::MAX.to_string();

        let query = CatalogQuery::parse(
            &params(&[("page", &huge), ("limit", "10")]),
            Visibility::Public,
        );
        assert_eq!(query.offset(), i64::MAX);

        let (offset, limit) = page_window(&params(&[("page", &huge), ("limit", "10")]));
        assert_eq!(offset, i64::MAX);
        assert_eq!(limit, 10);
    }

    #[test]
    fn sort_defaults_to_newest_first() {
        let query = CatalogQuery::parse(&params(&[]), Visibility::Public);
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: SortField::CreatedAt,
                descending: true,
            }]
        );
    }

    #[test]
    fn sort_accepts_a_comma_separated_field_list() {
        let query = CatalogQuery::parse(
            &params(&[("sort", "-averageRating,name,bogus")]),
            Visibility::Public,
        );
        assert_eq!(
            query.sort,
            vec![
                SortKey {
                    field: SortField::AverageRating,
                    descending: true,
                },
                SortKey {
                    field: SortField::Name,
                    descending: false,
                },
            ]
        );
    }

    #[test]
    fn search_is_recorded_and_overrides_nothing_else_in_the_predicate_list() {
        let query = CatalogQuery::parse(
            &params(&[("search", "puzzle"), ("sort", "name")]),
            Visibility::Public,
        );
        assert_eq!(query.search_term(), Some("puzzle"));
        assert!(query
            .predicates
            .contains(&Predicate::TextSearch("puzzle".to_string())));
    }

    #[test]
    fn field_projection_keeps_id_and_requested_fields_only() {
        let game = Game {
            id: Uuid::new_v4(),
            name: "Galaxy Puzzle".to_string(),
            description: "Match the stars".to_string(),
            category: "puzzle".to_string(),
            tags: vec!["space".to_string()],
            game_type: GameType::Iframe,
            url: "https://games.example.com/galaxy".to_string(),
            thumbnail: None,
            instructions: None,
            embed_width: 800,
            embed_height: 600,
            allow_fullscreen: true,
            custom_params: None,
            status: GameStatus::Active,
            play_count: 3,
            favorite_count: 1,
            total_ratings: 0,
            total_rating_score: 0,
            average_rating: 0.0,
            last_played: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };

        let fields = vec!["name".to_string(), "category".to_string()];
        let projected = project_games(&[game], Some(&fields)).unwrap();
        let object = projected[0].as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["category", "id", "name"]);
    }
}
