use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use errors::CustomError;
use helpers::validations::validations::{
    GameDescription, GameName, GameUrl, Instructions,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::GameType"]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Iframe,
    Api,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::GameStatus"]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Inactive,
}

/// One catalog entry for an embeddable third-party game. The statistics
/// columns are owned by the aggregator in `crate::aggregate` and must only
/// move through atomic increments.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub game_type: GameType,
    pub url: String,
    pub thumbnail: Option<String>,
    pub instructions: Option<String>,
    pub embed_width: i32,
    pub embed_height: i32,
    pub allow_fullscreen: bool,
    pub custom_params: Option<serde_json::Value>,
    pub status: GameStatus,
    pub play_count: i64,
    pub favorite_count: i64,
    pub total_ratings: i64,
    pub total_rating_score: i64,
    pub average_rating: f64,
    pub last_played: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The descriptive columns an admin edit may touch. The statistics columns
/// are deliberately absent so an update cannot clobber concurrent counter
/// increments.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::schema::games)]
#[diesel(treat_none_as_null = true)]
pub struct GameChangeset {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub game_type: GameType,
    pub url: String,
    pub thumbnail: Option<String>,
    pub instructions: Option<String>,
    pub embed_width: i32,
    pub embed_height: i32,
    pub allow_fullscreen: bool,
    pub custom_params: Option<serde_json::Value>,
    pub status: GameStatus,
    pub updated_at: NaiveDateTime,
}

impl From<&Game> for GameChangeset {
    fn from(game: &Game) -> Self {
        GameChangeset {
            name: game.name.clone(),
            description: game.description.clone(),
            category: game.category.clone(),
            tags: game.tags.clone(),
            game_type: game.game_type,
            url: game.url.clone(),
            thumbnail: game.thumbnail.clone(),
            instructions: game.instructions.clone(),
            embed_width: game.embed_width,
            embed_height: game.embed_height,
            allow_fullscreen: game.allow_fullscreen,
            custom_params: game.custom_params.clone(),
            status: game.status,
            updated_at: game.updated_at,
        }
    }
}

/// The statistics snapshot returned by play/stat endpoints.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::games)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub play_count: i64,
    pub favorite_count: i64,
    pub total_ratings: i64,
    pub total_rating_score: i64,
    pub average_rating: f64,
    pub last_played: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameBody {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub game_type: GameType,
    pub url: String,
    pub thumbnail: Option<String>,
    pub instructions: Option<String>,
    pub embed_width: i32,
    pub embed_height: i32,
    #[serde(default = "default_allow_fullscreen")]
    pub allow_fullscreen: bool,
    pub custom_params: Option<serde_json::Value>,
    pub status: Option<GameStatus>,
}

fn default_allow_fullscreen() -> bool {
    true
}

impl CreateGameBody {
    pub fn validate(self) -> Result<ValidatedGame, CustomError> {
        if self.embed_width <= 0 || self.embed_height <= 0 {
            return Err(CustomError::ValidationError(
                "Embed width and height must be positive".to_string(),
            ));
        }
        let name = GameName::parse(self.name)?;
        let description = GameDescription::parse(self.description)?;
        let url = GameUrl::parse(self.url)?;
        let instructions = self.instructions.map(Instructions::parse).transpose()?;
        if self.category.trim().is_empty() {
            return Err(CustomError::ValidationError(
                "Please specify the game category".to_string(),
            ));
        }
        Ok(ValidatedGame {
            name,
            description,
            category: self.category.trim().to_string(),
            tags: self.tags,
            game_type: self.game_type,
            url,
            thumbnail: self.thumbnail,
            instructions,
            embed_width: self.embed_width,
            embed_height: self.embed_height,
            allow_fullscreen: self.allow_fullscreen,
            custom_params: self.custom_params,
            status: self.status.unwrap_or(GameStatus::Active),
        })
    }
}

#[derive(Debug)]
pub struct ValidatedGame {
    pub name: GameName,
    pub description: GameDescription,
    pub category: String,
    pub tags: Vec<String>,
    pub game_type: GameType,
    pub url: GameUrl,
    pub thumbnail: Option<String>,
    pub instructions: Option<Instructions>,
    pub embed_width: i32,
    pub embed_height: i32,
    pub allow_fullscreen: bool,
    pub custom_params: Option<serde_json::Value>,
    pub status: GameStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub game_type: Option<GameType>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub instructions: Option<String>,
    pub embed_width: Option<i32>,
    pub embed_height: Option<i32>,
    pub allow_fullscreen: Option<bool>,
    pub custom_params: Option<serde_json::Value>,
    pub status: Option<GameStatus>,
}

#[cfg(test)]
mod tests {
    use super::{CreateGameBody, GameType};
    use claims::{assert_err, assert_ok};

    fn body() -> CreateGameBody {
        CreateGameBody {
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
            status: None,
        }
    }

    #[test]
    fn a_well_formed_body_validates() {
        assert_ok!(body().validate());
    }

    #[test]
    fn non_positive_embed_dimensions_are_rejected() {
        let mut b = body();
        b.embed_width = 0;
        assert_err!(b.validate());

        let mut b = body();
        b.embed_height = -5;
        assert_err!(b.validate());
    }

    #[test]
    fn an_empty_category_is_rejected() {
        let mut b = body();
        b.category = "  ".to_string();
        assert_err!(b.validate());
    }

    #[test]
    fn a_non_http_url_is_rejected() {
        let mut b = body();
        b.url = "file:///etc/passwd".to_string();
        assert_err!(b.validate());
    }

    #[test]
    fn status_defaults_to_active() {
        let validated = body().validate().unwrap();
        assert_eq!(validated.status, super::GameStatus::Active);
    }
}
