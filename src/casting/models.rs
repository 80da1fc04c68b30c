//! Actors, movies, and their request/response shapes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Input date format for `release_date`
pub const RELEASE_DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// Rendered date format, e.g. "Friday, 25 July 1997"
pub const RELEASE_DATE_DISPLAY_FORMAT: &str = "%A, %d %B %Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub gender: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub release_date: NaiveDate,
}

impl Movie {
    pub fn formatted_release_date(&self) -> String {
        self.release_date
            .format(RELEASE_DATE_DISPLAY_FORMAT)
            .to_string()
    }
}

/// Actor as listed on a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorSummary {
    pub id: u64,
    pub name: String,
}

impl From<&Actor> for ActorSummary {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name.clone(),
        }
    }
}

/// Movie with its assigned actors, ordered by actor id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieView {
    pub id: u64,
    pub title: String,
    pub release_date: String,
    pub selected_actors: Vec<ActorSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewActor {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
}

/// Partial actor update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorUpdate {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMovie {
    pub title: Option<String>,
    /// "YYYY-MM-DD"
    pub release_date: Option<String>,
}

/// Partial movie update
///
/// `selected_actors`, when present, replaces the movie's assignments
/// (an empty list clears them). When absent, assignments are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub selected_actors: Option<Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_release_date_rendering() {
        let movie = Movie {
            id: 1,
            title: "Air Force One".into(),
            release_date: NaiveDate::from_ymd_opt(1997, 7, 25).unwrap(),
        };
        assert_eq!(movie.formatted_release_date(), "Friday, 25 July 1997");

        let movie = Movie {
            release_date: NaiveDate::from_ymd_opt(2001, 12, 3).unwrap(),
            ..movie
        };
        assert_eq!(movie.formatted_release_date(), "Monday, 03 December 2001");
    }

    #[test]
    fn test_movie_update_distinguishes_absent_and_empty_actors() {
        let update: MovieUpdate = serde_json::from_value(json!({"title": "Heat"})).unwrap();
        assert_eq!(update.selected_actors, None);

        let update: MovieUpdate =
            serde_json::from_value(json!({"selected_actors": []})).unwrap();
        assert_eq!(update.selected_actors, Some(vec![]));
    }

    #[test]
    fn test_actor_serialization() {
        let actor = Actor {
            id: 3,
            name: "Leonardo DiCaprio".into(),
            gender: "Male".into(),
            age: 46,
        };
        assert_eq!(
            serde_json::to_value(&actor).unwrap(),
            json!({"id": 3, "name": "Leonardo DiCaprio", "gender": "Male", "age": 46})
        );
    }
}
