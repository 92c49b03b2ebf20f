//! Structural diff between two catalog snapshots.
//!
//! Reduces a new snapshot to the subtrees that changed relative to the old
//! one. Siblings are compared by position, so both snapshots must order
//! them the same way (see [`Catalog::normalize`]). Identity takes part in
//! equality, which makes a misaligned pair compare unequal and keeps the
//! new entry instead of silently matching unrelated nodes.
//!
//! Pruning stops at sections: a changed section is kept whole.

use serde::{Deserialize, Serialize};

use crate::models::{Catalog, Course, Section, StructuralEq, Subject};

/// Counts of the levels retained by a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub subjects: usize,
    pub courses: usize,
    pub sections: usize,
}

impl DiffSummary {
    /// Summarize a pruned catalog.
    pub fn of(filtered: &Catalog) -> Self {
        Self {
            subjects: filtered.subjects.len(),
            courses: filtered.course_count(),
            sections: filtered.section_count(),
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.subjects > 0
    }
}

/// Return `new` with every unchanged subject, course and section removed.
///
/// Inputs are never modified. An index with no counterpart in `old` is
/// always kept; entries present only in `old` are ignored.
pub fn diff(old: &Catalog, new: &Catalog) -> Catalog {
    let subjects = new
        .subjects
        .iter()
        .enumerate()
        .filter_map(|(i, subject)| diff_subject(&new.topic, old.subjects.get(i), subject))
        .collect();

    Catalog {
        subjects,
        ..new.shell()
    }
}

fn diff_subject(log_key: &str, old: Option<&Subject>, new: &Subject) -> Option<Subject> {
    let Some(old) = old else {
        log::debug!("diff: {log_key}: new subject {}", new.topic);
        return Some(new.clone());
    };
    if old.structural_eq(new) && courses_equal(&old.courses, &new.courses) {
        return None;
    }
    if let Some(mismatch) = new.first_mismatch(old) {
        log::debug!("diff: {log_key}: subject {} differs: {mismatch}", new.topic);
    }

    let courses = new
        .courses
        .iter()
        .enumerate()
        .filter_map(|(i, course)| diff_course(&new.topic, old.courses.get(i), course))
        .collect();

    Some(Subject {
        courses,
        ..new.shell()
    })
}

fn diff_course(log_key: &str, old: Option<&Course>, new: &Course) -> Option<Course> {
    let Some(old) = old else {
        log::debug!("diff: {log_key}: new course {}", new.topic);
        return Some(new.clone());
    };
    if old.structural_eq(new) && sections_equal(&old.sections, &new.sections) {
        return None;
    }
    if let Some(mismatch) = new.first_mismatch(old) {
        log::debug!("diff: {log_key}: course {} differs: {mismatch}", new.topic);
    }

    let sections = new
        .sections
        .iter()
        .enumerate()
        .filter(|(i, section)| section_changed(&new.topic, old.sections.get(*i), section))
        .map(|(_, section)| section.clone())
        .collect();

    Some(Course {
        sections,
        ..new.shell()
    })
}

fn section_changed(log_key: &str, old: Option<&Section>, new: &Section) -> bool {
    let Some(old) = old else {
        log::debug!("diff: {log_key}: new section {}", new.topic);
        return true;
    };
    match new.first_mismatch(old) {
        Some(mismatch) => {
            log::debug!("diff: {log_key}: section {} differs: {mismatch}", new.topic);
            true
        }
        None => false,
    }
}

/// Whole-subtree equality of two course lists.
fn courses_equal(old: &[Course], new: &[Course]) -> bool {
    new.len() <= old.len()
        && new
            .iter()
            .zip(old)
            .all(|(n, o)| n.structural_eq(o) && sections_equal(&o.sections, &n.sections))
}

/// Whole-subtree equality of two section lists.
fn sections_equal(old: &[Section], new: &[Section]) -> bool {
    new.len() <= old.len() && new.iter().zip(old).all(|(n, o)| n.structural_eq(o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equality::{equal, verbose_equal};
    use crate::models::{Instructor, Note};
    use proptest::prelude::*;

    fn make_section(id: i64, status: &str) -> Section {
        Section {
            id,
            number: format!("{:02}", id % 100),
            call_number: format!("{}", 10_000 + id),
            max: 40,
            now: 3,
            status: status.into(),
            credits: "3".into(),
            ..Section::default()
        }
    }

    fn make_course(id: i64, sections: Vec<Section>) -> Course {
        Course {
            id,
            name: format!("Course {id}"),
            number: format!("{id}"),
            sections,
            ..Course::default()
        }
    }

    fn make_subject(id: i64, courses: Vec<Course>) -> Subject {
        Subject {
            id,
            name: format!("Subject {id}"),
            number: format!("{id:03}"),
            season: "fall".into(),
            year: "2024".into(),
            courses,
            ..Subject::default()
        }
    }

    fn make_catalog() -> Catalog {
        let mut catalog = Catalog {
            id: 1,
            name: "Test University".into(),
            subjects: vec![
                make_subject(
                    10,
                    vec![
                        make_course(100, vec![make_section(1000, "OPEN"), make_section(1001, "OPEN")]),
                        make_course(101, vec![make_section(1010, "CLOSED")]),
                    ],
                ),
                make_subject(11, vec![make_course(110, vec![make_section(1100, "OPEN")])]),
            ],
            ..Catalog::default()
        };
        catalog.normalize();
        catalog
    }

    #[test]
    fn test_no_changes() {
        let old = make_catalog();
        let new = old.clone();

        let result = diff(&old, &new);
        assert!(result.subjects.is_empty());
        assert!(!DiffSummary::of(&result).has_changes());
        assert_eq!(result.id, new.id);
    }

    #[test]
    fn test_single_section_status_change() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects[0].courses[0].sections[0].status = "CLOSED".into();

        let result = diff(&old, &new);
        assert_eq!(DiffSummary::of(&result), DiffSummary {
            subjects: 1,
            courses: 1,
            sections: 1
        });
        let section = &result.subjects[0].courses[0].sections[0];
        assert_eq!(section.id, 1000);
        assert_eq!(section.status, "CLOSED");
    }

    #[test]
    fn test_changed_section_is_kept_whole() {
        let mut old = make_catalog();
        old.subjects[1].courses[0].sections[0].instructors = vec![Instructor {
            id: 1,
            section_id: 1100,
            name: "Smith".into(),
        }];
        let mut new = old.clone();
        new.subjects[1].courses[0].sections[0].instructors[0].name = "Jones".into();

        let result = diff(&old, &new);
        assert_eq!(result.subjects.len(), 1);
        assert_eq!(result.subjects[0].id, 11);
        let section = &result.subjects[0].courses[0].sections[0];
        assert_eq!(section.instructors[0].name, "Jones");
    }

    #[test]
    fn test_subject_scalar_change_keeps_subject_without_children() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects[0].notes.push(Note {
            id: 1,
            title: "Moved".into(),
            content: "Now online".into(),
        });

        let result = diff(&old, &new);
        assert_eq!(result.subjects.len(), 1);
        assert!(result.subjects[0].courses.is_empty());
        assert_eq!(result.subjects[0].notes.len(), 1);
    }

    #[test]
    fn test_empty_old_yields_new() {
        let new = make_catalog();
        let result = diff(&Catalog::default(), &new);
        assert_eq!(result, new);
    }

    #[test]
    fn test_appended_section_is_kept() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects[0].courses[1].sections.push(make_section(1011, "OPEN"));

        let result = diff(&old, &new);
        let sections = &result.subjects[0].courses[0].sections;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, 1011);
        assert_eq!(result.subjects[0].courses[0].id, 101);
    }

    #[test]
    fn test_removed_entries_are_dropped() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects[0].courses[0].sections.pop();
        new.subjects.pop();

        let result = diff(&old, &new);
        assert!(result.subjects.is_empty());
    }

    #[test]
    fn test_misaligned_insert_reports_shifted_entries() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects.insert(0, make_subject(5, vec![]));

        let result = diff(&old, &new);
        let ids: Vec<i64> = result.subjects.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![5, 10, 11]);
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let old = make_catalog();
        let mut new = old.clone();
        new.subjects[0].courses[0].sections[1].now = 0;
        let (old_copy, new_copy) = (old.clone(), new.clone());

        let _ = diff(&old, &new);
        assert_eq!(old, old_copy);
        assert_eq!(new, new_copy);
    }

    // --- Property tests ---

    fn arb_section() -> impl Strategy<Value = Section> {
        (0i64..4, "[A-Z]{1,2}", 0u32..3, prop_oneof![Just("OPEN"), Just("CLOSED")]).prop_map(
            |(id, number, now, status)| Section {
                id,
                number,
                now,
                status: status.into(),
                ..Section::default()
            },
        )
    }

    fn arb_course() -> impl Strategy<Value = Course> {
        (0i64..3, "[a-z]{0,2}", prop::collection::vec(arb_section(), 0..3)).prop_map(
            |(id, name, sections)| Course {
                id,
                name,
                sections,
                ..Course::default()
            },
        )
    }

    fn arb_subject() -> impl Strategy<Value = Subject> {
        (0i64..3, "[a-z]{0,2}", prop::collection::vec(arb_course(), 0..3)).prop_map(
            |(id, name, courses)| Subject {
                id,
                name,
                courses,
                ..Subject::default()
            },
        )
    }

    fn arb_catalog() -> impl Strategy<Value = Catalog> {
        prop::collection::vec(arb_subject(), 0..4).prop_map(|subjects| Catalog {
            id: 1,
            subjects,
            ..Catalog::default()
        })
    }

    fn section_kept(old: Option<&Section>, new: &Section) -> bool {
        !equal(old, Some(new))
    }

    /// Subtree equality as seen from `new`: trailing `old` entries are ignored.
    fn course_unchanged(old: &Course, new: &Course) -> bool {
        new.structural_eq(old)
            && new
                .sections
                .iter()
                .enumerate()
                .all(|(k, section)| !section_kept(old.sections.get(k), section))
    }

    fn subject_unchanged(old: &Subject, new: &Subject) -> bool {
        new.structural_eq(old)
            && new
                .courses
                .iter()
                .enumerate()
                .all(|(j, course)| old.courses.get(j).is_some_and(|o| course_unchanged(o, course)))
    }

    fn forms_agree<T: StructuralEq>(a: Option<&T>, b: Option<&T>) -> bool {
        equal(a, b) == verbose_equal(a, b).is_ok()
            && equal(b, a) == verbose_equal(b, a).is_ok()
            && equal(a, a)
            && verbose_equal(a, a).is_ok()
    }

    proptest! {
        #[test]
        fn prop_diff_of_self_is_empty(catalog in arb_catalog()) {
            prop_assert!(diff(&catalog, &catalog).subjects.is_empty());
        }

        #[test]
        fn prop_equal_forms_agree_at_every_level(
            sections in (prop::option::of(arb_section()), prop::option::of(arb_section())),
            courses in (prop::option::of(arb_course()), prop::option::of(arb_course())),
            subjects in (prop::option::of(arb_subject()), prop::option::of(arb_subject())),
            catalogs in (prop::option::of(arb_catalog()), prop::option::of(arb_catalog())),
        ) {
            prop_assert!(forms_agree(sections.0.as_ref(), sections.1.as_ref()));
            prop_assert!(forms_agree(courses.0.as_ref(), courses.1.as_ref()));
            prop_assert!(forms_agree(subjects.0.as_ref(), subjects.1.as_ref()));
            prop_assert!(forms_agree(catalogs.0.as_ref(), catalogs.1.as_ref()));
            prop_assert!(forms_agree(subjects.0.as_ref(), subjects.0.clone().as_ref()));
        }

        #[test]
        fn prop_keeps_exactly_the_changed_entries(old in arb_catalog(), new in arb_catalog()) {
            let result = diff(&old, &new);
            let mut kept_subjects = result.subjects.iter();

            for (i, subject) in new.subjects.iter().enumerate() {
                let old_subject = old.subjects.get(i);
                if old_subject.is_some_and(|o| subject_unchanged(o, subject)) {
                    continue;
                }
                let kept = kept_subjects.next();
                prop_assert!(kept.is_some(), "changed subject {} was dropped", i);
                let kept = kept.unwrap();
                prop_assert!(kept.structural_eq(subject));
                let Some(old_subject) = old_subject else {
                    prop_assert_eq!(kept, subject);
                    continue;
                };

                let mut kept_courses = kept.courses.iter();
                for (j, course) in subject.courses.iter().enumerate() {
                    let old_course = old_subject.courses.get(j);
                    if old_course.is_some_and(|o| course_unchanged(o, course)) {
                        continue;
                    }
                    let kept = kept_courses.next();
                    prop_assert!(kept.is_some(), "changed course {}/{} was dropped", i, j);
                    let kept = kept.unwrap();
                    prop_assert!(kept.structural_eq(course));
                    let Some(old_course) = old_course else {
                        prop_assert_eq!(kept, course);
                        continue;
                    };

                    let changed: Vec<&Section> = course
                        .sections
                        .iter()
                        .enumerate()
                        .filter(|(k, section)| section_kept(old_course.sections.get(*k), section))
                        .map(|(_, section)| section)
                        .collect();
                    prop_assert_eq!(kept.sections.iter().collect::<Vec<_>>(), changed);
                }
                prop_assert!(kept_courses.next().is_none(), "unchanged course kept under subject {}", i);
            }
            prop_assert!(kept_subjects.next().is_none(), "unchanged subject kept");
        }

        #[test]
        fn prop_id_mismatch_is_retained(catalog in arb_catalog(), shift in 1i64..5) {
            prop_assume!(!catalog.subjects.is_empty());
            let mut new = catalog.clone();
            new.subjects[0].id += shift;
            let result = diff(&catalog, &new);
            prop_assert_eq!(result.subjects.first().map(|s| s.id), Some(new.subjects[0].id));
        }
    }
}
