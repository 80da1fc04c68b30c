//! In-memory actor and movie tables

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{
    Actor, ActorSummary, ActorUpdate, Movie, MovieUpdate, MovieView, NewActor, NewMovie,
    RELEASE_DATE_INPUT_FORMAT,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Actor {0} not found")]
    ActorNotFound(u64),

    #[error("Movie {0} not found")]
    MovieNotFound(u64),

    /// A movie assignment names an actor that does not exist
    #[error("Actor {0} does not exist and cannot be assigned")]
    UnknownActor(u64),

    #[error("Invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Default)]
struct Tables {
    actors: BTreeMap<u64, Actor>,
    movies: BTreeMap<u64, Movie>,
    /// (movie_id, actor_id)
    assignments: BTreeSet<(u64, u64)>,
    last_actor_id: u64,
    last_movie_id: u64,
}

impl Tables {
    fn view(&self, movie: &Movie) -> MovieView {
        let selected_actors = self
            .assignments
            .range((movie.id, 0)..=(movie.id, u64::MAX))
            .filter_map(|(_, actor_id)| self.actors.get(actor_id))
            .map(ActorSummary::from)
            .collect();

        MovieView {
            id: movie.id,
            title: movie.title.clone(),
            release_date: movie.formatted_release_date(),
            selected_actors,
        }
    }
}

/// Shared handle to the casting tables
#[derive(Debug, Clone, Default)]
pub struct CastingStore {
    tables: Arc<RwLock<Tables>>,
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, StoreError> {
    match value {
        Some(value) => non_empty(field, value),
        None => Err(StoreError::Invalid {
            field,
            reason: "is required".to_string(),
        }),
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        })
    } else {
        Ok(value)
    }
}

fn parse_release_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, RELEASE_DATE_INPUT_FORMAT).map_err(|e| {
        StoreError::Invalid {
            field: "release_date",
            reason: format!("expected YYYY-MM-DD ({})", e),
        }
    })
}

impl CastingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actors ordered by id
    pub async fn list_actors(&self) -> Vec<Actor> {
        let tables = self.tables.read().await;
        tables.actors.values().cloned().collect()
    }

    /// All movies ordered by id
    pub async fn list_movies(&self) -> Vec<MovieView> {
        let tables = self.tables.read().await;
        tables.movies.values().map(|movie| tables.view(movie)).collect()
    }

    pub async fn create_actor(&self, input: NewActor) -> Result<Actor, StoreError> {
        let name = required_text("name", input.name)?;
        let gender = required_text("gender", input.gender)?;
        let age = input.age.ok_or(StoreError::Invalid {
            field: "age",
            reason: "is required".to_string(),
        })?;

        let mut tables = self.tables.write().await;
        tables.last_actor_id += 1;
        let actor = Actor {
            id: tables.last_actor_id,
            name,
            gender,
            age,
        };
        tables.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    pub async fn update_actor(&self, id: u64, update: ActorUpdate) -> Result<Actor, StoreError> {
        let mut tables = self.tables.write().await;
        let actor = tables
            .actors
            .get_mut(&id)
            .ok_or(StoreError::ActorNotFound(id))?;

        let name = update.name.map(|name| non_empty("name", name)).transpose()?;
        let gender = update
            .gender
            .map(|gender| non_empty("gender", gender))
            .transpose()?;

        if let Some(name) = name {
            actor.name = name;
        }
        if let Some(gender) = gender {
            actor.gender = gender;
        }
        if let Some(age) = update.age {
            actor.age = age;
        }
        Ok(actor.clone())
    }

    /// Delete an actor and every assignment naming it
    pub async fn delete_actor(&self, id: u64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .actors
            .remove(&id)
            .ok_or(StoreError::ActorNotFound(id))?;
        tables.assignments.retain(|(_, actor_id)| *actor_id != id);
        Ok(id)
    }

    pub async fn create_movie(&self, input: NewMovie) -> Result<MovieView, StoreError> {
        let title = required_text("title", input.title)?;
        let release_date = parse_release_date(&required_text("release_date", input.release_date)?)?;

        let mut tables = self.tables.write().await;
        tables.last_movie_id += 1;
        let movie = Movie {
            id: tables.last_movie_id,
            title,
            release_date,
        };
        tables.movies.insert(movie.id, movie.clone());
        Ok(tables.view(&movie))
    }

    /// Apply a partial update; nothing changes unless every field is valid
    pub async fn update_movie(&self, id: u64, update: MovieUpdate) -> Result<MovieView, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&id) {
            return Err(StoreError::MovieNotFound(id));
        }

        let title = update.title.map(|title| non_empty("title", title)).transpose()?;
        let release_date = update
            .release_date
            .as_deref()
            .map(parse_release_date)
            .transpose()?;
        if let Some(actor_ids) = &update.selected_actors {
            let unknown = actor_ids
                .iter()
                .find(|actor_id| !tables.actors.contains_key(*actor_id));
            if let Some(actor_id) = unknown {
                return Err(StoreError::UnknownActor(*actor_id));
            }
        }

        let movie = tables
            .movies
            .get_mut(&id)
            .ok_or(StoreError::MovieNotFound(id))?;
        if let Some(title) = title {
            movie.title = title;
        }
        if let Some(release_date) = release_date {
            movie.release_date = release_date;
        }
        let movie = movie.clone();

        if let Some(actor_ids) = update.selected_actors {
            tables.assignments.retain(|(movie_id, _)| *movie_id != id);
            tables
                .assignments
                .extend(actor_ids.into_iter().map(|actor_id| (id, actor_id)));
        }

        Ok(tables.view(&movie))
    }

    /// Delete a movie and its assignments
    pub async fn delete_movie(&self, id: u64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .movies
            .remove(&id)
            .ok_or(StoreError::MovieNotFound(id))?;
        tables.assignments.retain(|(movie_id, _)| *movie_id != id);
        Ok(id)
    }
}
