//! Records exchanged with the myFlix API.
//!
//! The backend's shapes are loose: identifiers arrive either as bare strings
//! or inside embedded objects, and field names come in capitalised and
//! lowercase spellings. Responses are parsed from `serde_json::Value` once,
//! at the API boundary, so the views only ever see these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A movie identifier, always held as a plain string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reduce a raw identifier to a plain id.
    ///
    /// Accepts a non-empty string or number, or an object whose `_id` is one.
    /// Anything else has no usable identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => map.get("_id").and_then(scalar_id),
            other => scalar_id(other),
        }
    }
}

fn scalar_id(value: &Value) -> Option<MovieId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(MovieId(s.clone())),
        Value::Number(n) => Some(MovieId(n.to_string())),
        _ => None,
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First non-null value among the given field spellings
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(*name))
        .find(|v| !v.is_null())
}

fn text(value: &Value, names: &[&str]) -> Option<String> {
    match field(value, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A name given either directly or as an object with a `Name`/`name` field
fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(_) => text(value, &["Name", "name"]),
        _ => None,
    }
}

/// A movie as listed by the catalog.
///
/// Only the fields the views render are extracted; the full record is kept
/// in `raw` for the details view.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: Option<MovieId>,
    pub title: String,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub image_path: Option<String>,
    pub raw: Value,
}

impl Movie {
    pub fn from_value(raw: Value) -> Self {
        let id = raw.get("_id").and_then(MovieId::from_value);
        let title = text(&raw, &["title", "Title"]).unwrap_or_default();
        let description = text(&raw, &["description", "Description"]);
        let genres = match field(&raw, &["genre", "Genre", "genres", "Genres"]) {
            Some(Value::Array(items)) => items.iter().filter_map(name_of).collect(),
            Some(other) => name_of(other).into_iter().collect(),
            None => Vec::new(),
        };
        let director = field(&raw, &["director", "Director"]).and_then(name_of);
        let image_path = text(&raw, &["imagePath", "ImagePath", "imageUrl", "ImageURL"]);

        Self {
            id,
            title,
            description,
            genres,
            director,
            image_path,
            raw,
        }
    }

    /// Title for display, falling back to the id for untitled records
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if let Some(id) = &self.id {
            id.as_str()
        } else {
            "(untitled)"
        }
    }
}

/// A favorite entry as the backend returns it: a bare identifier, or an
/// embedded movie carrying its identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum MovieRef {
    Identifier(MovieId),
    Reference { id: MovieId, movie: Movie },
}

impl MovieRef {
    /// Entries with no usable identifier yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        if value.is_object() {
            let movie = Movie::from_value(value);
            let id = movie.id.clone()?;
            Some(Self::Reference { id, movie })
        } else {
            MovieId::from_value(&value).map(Self::Identifier)
        }
    }

    /// Resolve a favorites field into entries, dropping unusable ones.
    /// Anything but an array resolves to no favorites.
    pub fn list_from(value: Option<&Value>) -> Vec<Self> {
        match value {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .filter_map(Self::from_value)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn id(&self) -> &MovieId {
        match self {
            Self::Identifier(id) => id,
            Self::Reference { id, .. } => id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Identifier(id) => id.as_str(),
            Self::Reference { movie, .. } => movie.display_title(),
        }
    }
}

/// A user profile, tolerant of the backend's historical field spellings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    /// `YYYY-MM-DD`, cut from whatever timestamp the backend stores
    pub birthday: Option<String>,
    pub favorites: Vec<MovieRef>,
}

impl UserProfile {
    pub fn from_value(value: &Value) -> Self {
        let username = text(value, &["Username", "username", "name"]).unwrap_or_default();
        let email = text(value, &["Email", "email"]).unwrap_or_default();
        let birthday = text(value, &["Birthday", "birthday"])
            .map(|raw| raw.chars().take(10).collect::<String>());
        let favorites = MovieRef::list_from(field(value, &["FavoriteMovies", "favoriteMovies"]));

        Self {
            username,
            email,
            birthday,
            favorites,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreDetail {
    pub name: String,
    pub description: Option<String>,
}

impl GenreDetail {
    pub fn from_value(value: &Value, requested: &str) -> Self {
        Self {
            name: name_of(value).unwrap_or_else(|| requested.to_string()),
            description: text(value, &["Description", "description"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorDetail {
    pub name: String,
    pub bio: Option<String>,
    pub birth: Option<String>,
    pub death: Option<String>,
}

impl DirectorDetail {
    pub fn from_value(value: &Value, requested: &str) -> Self {
        Self {
            name: name_of(value).unwrap_or_else(|| requested.to_string()),
            bio: text(value, &["Bio", "bio"]),
            birth: text(value, &["Birth", "birth", "Birthyear", "birthYear"]),
            death: text(value, &["Death", "death", "Deathyear", "deathYear"]),
        }
    }
}

/// Login payload; the backend expects capitalised keys
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

/// Profile edit payload. `Birthday` is always sent (null clears it);
/// `Password` only when a new one was entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileUpdate {
    pub email: String,
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}
