//! Movie catalog view with the favorites toggle.
//!
//! Each movie id moves independently through Idle -> Pending -> Idle. An id
//! is Pending while its add/remove request is in flight, and further toggles
//! on it are ignored until the request finishes. The view's mutex is never
//! held across a request.
//!
//! Completion handlers are not tied to the active route: a request that
//! finishes after navigating away still updates this view's state.

use crate::api::MovieApi;
use crate::favorites::{BusySet, FavoriteSet};
use crate::lock;
use crate::models::{DirectorDetail, GenreDetail, Movie, MovieId};
use crate::notice::Notifier;
use crate::session::SessionState;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub movies: Vec<Movie>,
    pub favorites: FavoriteSet,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// A toggle for this id is already in flight
    Ignored,
    /// No logged-in user, or the movie has no identifier
    MissingIdentity,
    Failed(String),
}

/// Genre summary shown from the movie's own record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCard {
    pub title: String,
    pub genres: Vec<String>,
}

/// Director summary shown from the movie's own record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorCard {
    pub title: String,
    pub director: Option<String>,
}

pub struct Catalog {
    api: Arc<dyn MovieApi>,
    session: Arc<SessionState>,
    notices: Arc<dyn Notifier>,
    state: Mutex<CatalogState>,
    busy: BusySet,
}

impl Catalog {
    pub fn new(
        api: Arc<dyn MovieApi>,
        session: Arc<SessionState>,
        notices: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            notices,
            state: Mutex::new(CatalogState::default()),
            busy: BusySet::new(),
        }
    }

    /// Reload the movie list and the favorites, both requests in flight at once
    pub fn activate(&self) {
        lock(&self.state).loading = true;
        thread::scope(|scope| {
            scope.spawn(|| self.load_movies());
            scope.spawn(|| self.load_favorites());
        });
    }

    pub fn load_movies(&self) {
        lock(&self.state).loading = true;
        let result = self.api.movies();
        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(movies) => {
                info!(count = movies.len(), "movies loaded");
                state.movies = movies;
            }
            Err(e) => {
                state.movies.clear();
                drop(state);
                self.notices
                    .error(&format!("Failed to load movies. {}", e.message));
            }
        }
    }

    /// Overwrites the local set; any failure leaves it empty
    pub fn load_favorites(&self) {
        let Some(user) = self.session.current().active_user().map(str::to_string) else {
            lock(&self.state).favorites = FavoriteSet::new();
            return;
        };
        let favorites = match self.api.favorite_movies(&user) {
            Ok(refs) => FavoriteSet::from_refs(&refs),
            Err(e) => {
                debug!(error = %e, "favorites unavailable; showing none");
                FavoriteSet::new()
            }
        };
        lock(&self.state).favorites = favorites;
    }

    pub fn snapshot(&self) -> CatalogState {
        lock(&self.state).clone()
    }

    pub fn movies(&self) -> Vec<Movie> {
        lock(&self.state).movies.clone()
    }

    pub fn favorites(&self) -> FavoriteSet {
        lock(&self.state).favorites.clone()
    }

    pub fn is_favorited(&self, movie: &Movie) -> bool {
        movie
            .id
            .as_ref()
            .is_some_and(|id| lock(&self.state).favorites.contains(id))
    }

    pub fn is_busy(&self, movie: &Movie) -> bool {
        movie.id.as_ref().is_some_and(|id| self.busy.contains(id))
    }

    /// Look a movie up by 1-based list position, id, or title
    pub fn find(&self, key: &str) -> Option<Movie> {
        let state = lock(&self.state);
        if let Ok(position) = key.parse::<usize>() {
            if let Some(movie) = position.checked_sub(1).and_then(|i| state.movies.get(i)) {
                return Some(movie.clone());
            }
        }
        let id = MovieId::new(key);
        state
            .movies
            .iter()
            .find(|m| m.id.as_ref() == Some(&id))
            .or_else(|| {
                state
                    .movies
                    .iter()
                    .find(|m| m.title.eq_ignore_ascii_case(key))
            })
            .cloned()
    }

    pub fn toggle_favorite(&self, movie: &Movie) -> ToggleOutcome {
        let session = self.session.current();
        let (Some(user), Some(id)) = (session.active_user(), movie.id.as_ref()) else {
            self.notices.error("Missing user or movie id.");
            return ToggleOutcome::MissingIdentity;
        };
        let Some(guard) = self.busy.try_acquire(id) else {
            debug!(movie = %id, "favorite toggle already in flight");
            return ToggleOutcome::Ignored;
        };

        let was_favorite = lock(&self.state).favorites.contains(id);
        let result = if was_favorite {
            self.api.remove_favorite(user, id)
        } else {
            self.api.add_favorite(user, id)
        };

        // The id stays busy until the set reflects the answer
        if result.is_ok() {
            let mut state = lock(&self.state);
            if was_favorite {
                state.favorites.remove(id);
            } else {
                state.favorites.insert(id.clone());
            }
        }
        drop(guard);

        match result {
            Ok(()) => {
                info!(movie = %id, added = !was_favorite, "favorites updated");
                if was_favorite {
                    self.notices.info("Removed from favorites.");
                    ToggleOutcome::Removed
                } else {
                    self.notices.info("Added to favorites!");
                    ToggleOutcome::Added
                }
            }
            Err(e) => {
                warn!(movie = %id, error = %e, "favorite toggle failed");
                self.notices.error("Could not update favorites.");
                ToggleOutcome::Failed(e.message)
            }
        }
    }

    pub fn genre_card(movie: &Movie) -> GenreCard {
        GenreCard {
            title: movie.display_title().to_string(),
            genres: movie.genres.clone(),
        }
    }

    pub fn director_card(movie: &Movie) -> DirectorCard {
        DirectorCard {
            title: movie.display_title().to_string(),
            director: movie.director.clone(),
        }
    }

    pub fn lookup_movie(&self, title: &str) -> Option<Movie> {
        self.report(self.api.movie(title))
    }

    pub fn lookup_genre(&self, name: &str) -> Option<GenreDetail> {
        self.report(self.api.genre(name))
    }

    pub fn lookup_director(&self, name: &str) -> Option<DirectorDetail> {
        self.report(self.api.director(name))
    }

    fn report<T>(&self, result: crate::api::ApiResult<T>) -> Option<T> {
        result.map_err(|e| self.notices.error(&e.message)).ok()
    }
}
