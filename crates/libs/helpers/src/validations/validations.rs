// An extension trait to provide the `graphemes` method on `String` and `&str`
use unicode_segmentation::UnicodeSegmentation;
use errors::CustomError;
use regex::Regex;

#[derive(Debug)]
pub struct GameName(String);

impl GameName {
    pub fn parse(s: String) -> std::result::Result<GameName, CustomError> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let is_too_long = s.graphemes(true).count() > 100;
        let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
        let contains_forbidden_characters = s.chars().any(|c| forbidden_characters.contains(&c));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
            Err(CustomError::ValidationError(format!("{} is not a valid game name", s)))
        } else {
            Ok(Self(s.trim().to_string()))
        }
    }
}

impl AsRef<str> for GameName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct GameDescription(String);

impl GameDescription {
    pub fn parse(s: String) -> std::result::Result<GameDescription, CustomError> {
        if s.trim().is_empty() {
            return Err(CustomError::ValidationError(
                "Description must not be empty".to_string(),
            ));
        }
        if s.graphemes(true).count() > 1000 {
            return Err(CustomError::ValidationError(
                "Description cannot be more than 1000 characters".to_string(),
            ));
        }
        Ok(Self(s.trim().to_string()))
    }
}

impl AsRef<str> for GameDescription {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct GameUrl(String);

impl GameUrl {
    pub fn parse(s: String) -> std::result::Result<GameUrl, CustomError> {
        let url_regex = Regex::new(r"^https?://\S+$")
            .map_err(|e| CustomError::ValidationError(format!("Invalid regex: {}", e)))?;

        if url_regex.is_match(s.trim()) {
            Ok(Self(s.trim().to_string()))
        } else {
            Err(CustomError::ValidationError(format!("{} is not a valid game URL", s)))
        }
    }
}

impl AsRef<str> for GameUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct Instructions(String);

impl Instructions {
    pub fn parse(s: String) -> std::result::Result<Instructions, CustomError> {
        if s.graphemes(true).count() > 2000 {
            return Err(CustomError::ValidationError(
                "Instructions cannot be more than 2000 characters".to_string(),
            ));
        }
        Ok(Self(s.trim().to_string()))
    }
}

impl AsRef<str> for Instructions {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct CommentContent(String);

impl CommentContent {
    pub fn parse(s: String) -> std::result::Result<CommentContent, CustomError> {
        if s.trim().is_empty() {
            return Err(CustomError::ValidationError(
                "Comment content is required".to_string(),
            ));
        }
        if s.graphemes(true).count() > 1000 {
            return Err(CustomError::ValidationError(
                "Comment cannot be more than 1000 characters".to_string(),
            ));
        }
        Ok(Self(s.trim().to_string()))
    }
}

impl AsRef<str> for CommentContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarRating(i32);

impl StarRating {
    pub fn parse(value: i32) -> std::result::Result<StarRating, CustomError> {
        if !(1..=5).contains(&value) {
            return Err(CustomError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{CommentContent, GameDescription, GameName, GameUrl, Instructions, StarRating};
    use claims::{assert_err, assert_ok};

    #[test]
    fn a_100_grapheme_long_game_name_is_valid() {
        let name = "a".repeat(100);
        assert_ok!(GameName::parse(name));
    }

    #[test]
    fn a_game_name_longer_than_100_graphemes_is_rejected() {
        let name = "a".repeat(101);
        assert_err!(GameName::parse(name));
    }

    #[test]
    fn whitespace_only_game_names_are_rejected() {
        let name = " ".to_string();
        assert_err!(GameName::parse(name));
    }

    #[test]
    fn game_names_containing_an_invalid_character_are_rejected() {
        for name in &['/', '(', ')', '"', '<', '>', '\\', '{', '}'] {
            let name = name.to_string();
            assert_err!(GameName::parse(name));
        }
    }

    #[test]
    fn a_valid_game_name_is_parsed_successfully() {
        let name = "Galaxy Puzzle".to_string();
        assert_ok!(GameName::parse(name));
    }

    #[test]
    fn an_empty_description_is_rejected() {
        assert_err!(GameDescription::parse("".to_string()));
    }

    #[test]
    fn a_description_longer_than_1000_graphemes_is_rejected() {
        assert_err!(GameDescription::parse("d".repeat(1001)));
    }

    #[test]
    fn http_and_https_urls_are_accepted() {
        assert_ok!(GameUrl::parse("https://games.example.com/puzzle".to_string()));
        assert_ok!(GameUrl::parse("http://games.example.com/puzzle".to_string()));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        assert_err!(GameUrl::parse("ftp://games.example.com".to_string()));
        assert_err!(GameUrl::parse("javascript:alert(1)".to_string()));
        assert_err!(GameUrl::parse("".to_string()));
    }

    #[test]
    fn instructions_longer_than_2000_graphemes_are_rejected() {
        assert_err!(Instructions::parse("i".repeat(2001)));
        assert_ok!(Instructions::parse("i".repeat(2000)));
    }

    #[test]
    fn empty_comment_content_is_rejected() {
        assert_err!(CommentContent::parse("   ".to_string()));
    }

    #[test]
    fn comment_content_longer_than_1000_graphemes_is_rejected() {
        assert_err!(CommentContent::parse("c".repeat(1001)));
    }

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert_err!(StarRating::parse(0));
        assert_err!(StarRating::parse(6));
        for value in 1..=5 {
            assert_ok!(StarRating::parse(value));
        }
    }
}
