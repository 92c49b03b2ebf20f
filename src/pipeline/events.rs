// src/pipeline/events.rs

//! Split a pruned catalog into per-section change events.

use crate::models::{Catalog, ChangeEvent, Course, SectionRef, Subject};

/// One event per section retained by a diff.
///
/// Each event carries a partial catalog holding exactly the path from the
/// university down to its section.
pub fn events_from_diff(filtered: &Catalog) -> Vec<ChangeEvent> {
    filtered
        .all_sections()
        .into_iter()
        .map(|path| event_for(filtered, path))
        .collect()
}

fn event_for(catalog: &Catalog, path: SectionRef<'_>) -> ChangeEvent {
    let SectionRef {
        subject,
        course,
        section,
    } = path;

    let course = Course {
        sections: vec![section.clone()],
        ..course.shell()
    };
    let subject = Subject {
        courses: vec![course],
        ..subject.shell()
    };

    ChangeEvent {
        status: section.status.clone(),
        topic: section.topic.clone(),
        university: Catalog {
            subjects: vec![subject],
            ..catalog.shell()
        },
    }
}
