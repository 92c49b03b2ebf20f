// src/models/catalog.rs

//! Catalog, Subject, Course, Section and leaf attachment data structures.
//!
//! Siblings are ordered by ascending `id` once [`Catalog::normalize`] has
//! run; the differ relies on that order and compares them by position.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::equality::impl_structural_eq;
use crate::models::topic;
use crate::utils::hash::fingerprint;

/// A university snapshot, the root of the catalog tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub id: i64,
    pub name: String,
    pub abbr: String,
    pub home_page: String,
    pub registration_page: String,
    pub main_color: String,
    pub accent_color: String,

    /// Routing topic, derived from the name
    #[serde(alias = "topic_name")]
    pub topic: String,

    /// Content hash of the scalar fields above
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// A subject offered in one semester (the section-group level).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: i64,
    pub university_id: i64,
    pub name: String,
    pub number: String,
    pub season: String,
    pub year: String,

    #[serde(alias = "topic_name")]
    pub topic: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<Course>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// A course within a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Course {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub number: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    #[serde(alias = "topic_name")]
    pub topic: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// A schedulable section of a course. The finest level the differ prunes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub id: i64,
    pub course_id: i64,
    pub number: String,
    pub call_number: String,

    /// Seat capacity
    pub max: u32,

    /// Seats currently taken
    pub now: u32,

    pub status: String,
    pub credits: String,

    #[serde(alias = "topic_name")]
    pub topic: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meetings: Vec<Meeting>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructors: Vec<Instructor>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub books: Vec<Book>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// A scheduled meeting of a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meeting {
    pub id: i64,
    pub section_id: i64,
    pub room: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub class_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instructor {
    pub id: i64,
    pub section_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub url: String,
}

/// A free-text annotation attached to any level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
}

impl_structural_eq!(Catalog, "Catalog" {
    scalars: [id, fingerprint, name, abbr, home_page, registration_page, main_color, accent_color, topic],
    sequences: [notes],
});

impl_structural_eq!(Subject, "Subject" {
    scalars: [id, fingerprint, university_id, name, number, season, year, topic],
    sequences: [notes],
});

impl_structural_eq!(Course, "Course" {
    scalars: [id, fingerprint, subject_id, name, number, synopsis, topic],
    sequences: [notes],
});

impl_structural_eq!(Section, "Section" {
    scalars: [id, fingerprint, course_id, number, call_number, max, now, status, credits, topic],
    sequences: [meetings, instructors, books, notes],
});

/// Reference to a section with its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct SectionRef<'a> {
    pub subject: &'a Subject,
    pub course: &'a Course,
    pub section: &'a Section,
}

impl Catalog {
    /// Load a catalog snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Sort siblings, link parents, derive topics and fingerprints.
    ///
    /// Run once per snapshot before it is diffed or dispatched.
    pub fn normalize(&mut self) {
        self.topic = topic::university_topic(&self.name);
        self.fingerprint = self.content_fingerprint();
        self.notes.sort_by_key(|n| n.id);
        self.subjects.sort_by_key(|s| s.id);
        for subject in &mut self.subjects {
            subject.normalize(self.id, &self.topic);
        }
    }

    /// Hash of the catalog's own scalar fields.
    pub fn content_fingerprint(&self) -> String {
        fingerprint([
            self.name.as_str(),
            self.abbr.as_str(),
            self.home_page.as_str(),
            self.registration_page.as_str(),
            self.main_color.as_str(),
            self.accent_color.as_str(),
        ])
    }

    /// All sections with their hierarchical context.
    pub fn all_sections(&self) -> Vec<SectionRef<'_>> {
        self.subjects
            .iter()
            .flat_map(|subject| {
                subject.courses.iter().flat_map(move |course| {
                    course
                        .sections
                        .iter()
                        .map(move |section| SectionRef {
                            subject,
                            course,
                            section,
                        })
                })
            })
            .collect()
    }

    /// Count total courses in this catalog.
    pub fn course_count(&self) -> usize {
        self.subjects.iter().map(|s| s.courses.len()).sum()
    }

    /// Count total sections in this catalog.
    pub fn section_count(&self) -> usize {
        self.subjects
            .iter()
            .flat_map(|s| &s.courses)
            .map(|c| c.sections.len())
            .sum()
    }

    /// The catalog's own fields without any subjects.
    pub fn shell(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            abbr: self.abbr.clone(),
            home_page: self.home_page.clone(),
            registration_page: self.registration_page.clone(),
            main_color: self.main_color.clone(),
            accent_color: self.accent_color.clone(),
            topic: self.topic.clone(),
            fingerprint: self.fingerprint.clone(),
            subjects: Vec::new(),
            notes: self.notes.clone(),
        }
    }
}

impl Subject {
    fn normalize(&mut self, university_id: i64, parent_topic: &str) {
        self.university_id = university_id;
        self.topic = topic::child_topic(
            parent_topic,
            &[
                self.number.as_str(),
                self.name.as_str(),
                self.season.as_str(),
                self.year.as_str(),
            ],
        );
        self.fingerprint = self.content_fingerprint();
        self.notes.sort_by_key(|n| n.id);
        self.courses.sort_by_key(|c| c.id);
        for course in &mut self.courses {
            course.normalize(self.id, &self.topic);
        }
    }

    /// Hash of the subject's own scalar fields.
    pub fn content_fingerprint(&self) -> String {
        fingerprint([
            self.name.as_str(),
            self.number.as_str(),
            self.season.as_str(),
            self.year.as_str(),
        ])
    }

    /// The subject's own fields without any courses.
    pub fn shell(&self) -> Self {
        Self {
            id: self.id,
            university_id: self.university_id,
            name: self.name.clone(),
            number: self.number.clone(),
            season: self.season.clone(),
            year: self.year.clone(),
            topic: self.topic.clone(),
            fingerprint: self.fingerprint.clone(),
            courses: Vec::new(),
            notes: self.notes.clone(),
        }
    }
}

impl Course {
    fn normalize(&mut self, subject_id: i64, parent_topic: &str) {
        self.subject_id = subject_id;
        self.topic = topic::child_topic(parent_topic, &[self.number.as_str(), self.name.as_str()]);
        self.fingerprint = self.content_fingerprint();
        self.notes.sort_by_key(|n| n.id);
        self.sections.sort_by_key(|s| s.id);
        for section in &mut self.sections {
            section.normalize(self.id, &self.topic);
        }
    }

    /// Hash of the course's own scalar fields.
    pub fn content_fingerprint(&self) -> String {
        fingerprint([
            self.name.as_str(),
            self.number.as_str(),
            self.synopsis.as_deref().unwrap_or(""),
            if self.synopsis.is_some() { "1" } else { "0" },
        ])
    }

    /// The course's own fields without any sections.
    pub fn shell(&self) -> Self {
        Self {
            id: self.id,
            subject_id: self.subject_id,
            name: self.name.clone(),
            number: self.number.clone(),
            synopsis: self.synopsis.clone(),
            topic: self.topic.clone(),
            fingerprint: self.fingerprint.clone(),
            sections: Vec::new(),
            notes: self.notes.clone(),
        }
    }
}

impl Section {
    fn normalize(&mut self, course_id: i64, parent_topic: &str) {
        self.course_id = course_id;
        self.topic = topic::child_topic(
            parent_topic,
            &[self.number.as_str(), self.call_number.as_str()],
        );
        self.fingerprint = self.content_fingerprint();
        self.meetings.sort_by_key(|m| m.id);
        self.instructors.sort_by_key(|i| i.id);
        self.books.sort_by_key(|b| b.id);
        self.notes.sort_by_key(|n| n.id);

        let section_id = self.id;
        for meeting in &mut self.meetings {
            meeting.section_id = section_id;
        }
        for instructor in &mut self.instructors {
            instructor.section_id = section_id;
        }
        for book in &mut self.books {
            book.section_id = section_id;
        }
    }

    /// Hash of the section's own scalar fields.
    pub fn content_fingerprint(&self) -> String {
        fingerprint([
            self.number.clone(),
            self.call_number.clone(),
            self.max.to_string(),
            self.now.to_string(),
            self.status.clone(),
            self.credits.clone(),
        ])
    }
}
