use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::MovieId;
use super::{require_text, ValidationError};

pub const TITLE_MAX_LEN: usize = 200;
/// Largest running time the `movies.duration` INTEGER column holds
pub const DURATION_MAX_MINUTES: u32 = i32::MAX as u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in minutes
    pub duration: u32,
}

impl Movie {
    pub fn from_new(id: MovieId, movie: NewMovie) -> Self {
        Self {
            id,
            title: movie.title,
            description: movie.description,
            release_date: movie.release_date,
            duration: movie.duration,
        }
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Movie fields as submitted for create and full update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: u32,
}

impl NewMovie {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, TITLE_MAX_LEN)?;
        if self.duration == 0 {
            return Err(ValidationError::NotPositive { field: "duration" });
        }
        if self.duration > DURATION_MAX_MINUTES {
            return Err(ValidationError::TooLarge {
                field: "duration",
                max: u64::from(DURATION_MAX_MINUTES),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> NewMovie {
        NewMovie {
            title: "Inception".to_string(),
            description: "A mind-bending thriller".to_string(),
            release_date: NaiveDate::from_ymd_opt(2010, 7, 16).unwrap(),
            duration: 148,
        }
    }

    #[test]
    fn test_movie_displays_as_title() {
        let movie = Movie::from_new(MovieId::new(), inception());
        assert_eq!(movie.to_string(), "Inception");
        assert_eq!(movie.duration, 148);
    }

    #[test]
    fn test_duration_bounds() {
        let mut movie = inception();
        movie.duration = 0;
        assert_eq!(movie.validate(), Err(ValidationError::NotPositive { field: "duration" }));

        movie.duration = DURATION_MAX_MINUTES;
        assert!(movie.validate().is_ok());

        movie.duration = DURATION_MAX_MINUTES + 1;
        assert_eq!(
            movie.validate(),
            Err(ValidationError::TooLarge { field: "duration", max: u64::from(DURATION_MAX_MINUTES) })
        );
    }

    #[test]
    fn test_title_length_limit() {
        let mut movie = inception();
        movie.title = "x".repeat(TITLE_MAX_LEN);
        assert!(movie.validate().is_ok());

        movie.title.push('x');
        assert_eq!(
            movie.validate(),
            Err(ValidationError::TooLong { field: "title", max: TITLE_MAX_LEN })
        );
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut movie = inception();
        movie.duration = 0;
        assert!(movie.validate().is_err());
    }
}
