//! Trainer and course lookups.
//!
//! The engine never reaches into ambient storage for reference data: callers
//! build a [`Catalog`] from whatever they persist and pass it in.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// A person who teaches sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trainer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A course whose sessions appear on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Reference data for resolving event foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub trainers: Vec<Trainer>,
    pub courses: Vec<Course>,
}

impl Catalog {
    /// Creates a catalog from trainers and courses.
    pub fn new(trainers: Vec<Trainer>, courses: Vec<Course>) -> Self {
        Self { trainers, courses }
    }

    /// Looks up a trainer by id.
    pub fn trainer(&self, id: &str) -> Option<&Trainer> {
        self.trainers.iter().find(|t| t.id == id)
    }

    /// Looks up a course by id.
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Returns the trainer's display name, falling back to the raw id.
    pub fn trainer_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.trainer(id).map_or(id, |t| t.name.as_str())
    }

    /// Returns the course's display name, falling back to the raw id.
    pub fn course_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.course(id).map_or(id, |c| c.name.as_str())
    }

    /// Colors an event after its course unless it already has a background.
    pub fn apply_course_style(&self, event: &mut Event) {
        if event.background_color.is_some() {
            return;
        }
        let color = event
            .course_id
            .as_deref()
            .and_then(|id| self.course(id))
            .and_then(|c| c.color.clone());
        if color.is_some() {
            event.background_color = color;
        }
    }
}
