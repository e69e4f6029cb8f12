//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

/// TMDB rejects popular/search pages beyond this
pub const MAX_PAGE: u32 = 500;

lazy_static! {
    /// Regex for validating usernames (alphanumeric and underscores)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username is too short (min 3 characters)".to_string());
    }

    if username.len() > 32 {
        return Err("Username is too long (max 32 characters)".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err("Username may only contain letters, digits and underscores".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password is too short (min 8 characters)".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

/// Validate a catalog search query
pub fn validate_search_query(query: &str) -> Result<(), String> {
    if query.trim().is_empty() {
        return Err("Search query is required".to_string());
    }

    if query.len() > 256 {
        return Err("Search query is too long (max 256 characters)".to_string());
    }

    Ok(())
}

/// Validate a catalog page number
pub fn validate_page(page: u32) -> Result<(), String> {
    if page == 0 {
        return Err("Page must be at least 1".to_string());
    }

    if page > MAX_PAGE {
        return Err(format!("Page is too high (max {})", MAX_PAGE));
    }

    Ok(())
}

/// Validate a TMDB movie id
pub fn validate_movie_id(movie_id: i64) -> Result<(), String> {
    if movie_id <= 0 {
        return Err("Movie id must be positive".to_string());
    }

    Ok(())
}

/// Validate a movie title carried in a watchlist snapshot
pub fn validate_movie_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Movie title is required".to_string());
    }

    if title.len() > 512 {
        return Err("Movie title is too long (max 512 characters)".to_string());
    }

    Ok(())
}
