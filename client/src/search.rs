//! Client-side search over lists already fetched from the API.

use crate::models::{Course, Enrollment, Instructor, Student};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchScope {
    #[default]
    Course,
    Student,
    Instructor,
    Enrollment,
}

/// Anything a list view can filter. `search_fields` yields the text compared against the term.
pub trait Searchable {
    const SCOPE: SearchScope;

    fn search_fields(&self) -> Vec<&str>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub scope: SearchScope,
    pub term: String,
}

impl SearchQuery {
    pub fn new(scope: SearchScope, term: impl Into<String>) -> Self {
        SearchQuery {
            scope,
            term: term.into(),
        }
    }

    pub fn matches<T: Searchable>(&self, item: &T) -> bool {
        let term = self.term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        item.search_fields()
            .into_iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Items matching the term. A query scoped to another entity leaves the list untouched.
    pub fn filter<'a, T: Searchable>(&self, items: &'a [T]) -> Vec<&'a T> {
        if T::SCOPE != self.scope {
            return items.iter().collect();
        }
        items.iter().filter(|item| self.matches(*item)).collect()
    }
}

impl Searchable for Course {
    const SCOPE: SearchScope = SearchScope::Course;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.course_code.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.instructor.as_ref().map(|i| i.name.as_str()));
        fields
    }
}

impl Searchable for Student {
    const SCOPE: SearchScope = SearchScope::Student;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.username.as_str(),
            self.email.as_str(),
            self.student_id.as_str(),
        ];
        fields.extend(self.major.as_deref());
        fields
    }
}

impl Searchable for Instructor {
    const SCOPE: SearchScope = SearchScope::Instructor;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.username.as_str()];
        fields.extend(self.specialty.as_deref());
        fields
    }
}

impl Searchable for Enrollment {
    const SCOPE: SearchScope = SearchScope::Enrollment;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.semester.as_str(), self.status.as_str()];
        fields.extend(self.student.as_ref().map(|s| s.username.as_str()));
        fields.extend(self.course.as_ref().map(|c| c.title.as_str()));
        fields.extend(self.grade.as_deref());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn instructor(name: &str, specialty: Option<&str>) -> Instructor {
        Instructor {
            id: 1,
            username: name.to_lowercase(),
            email: format!("{}@uni.edu", name.to_lowercase()),
            name: name.into(),
            specialty: specialty.map(str::to_string),
            created_at: None,
        }
    }

    fn course(id: i64, title: &str, code: &str, instructor: Option<Instructor>) -> Course {
        Course {
            id,
            title: title.into(),
            course_code: code.into(),
            description: None,
            credit_hours: Some(3),
            max_capacity: None,
            instructor_id: instructor.as_ref().map(|i| i.id),
            instructor,
            created_at: None,
        }
    }

    #[fixture]
    fn courses() -> Vec<Course> {
        vec![
            course(1, "Databases", "CS340", Some(instructor("Grace", Some("Systems")))),
            course(2, "Linear Algebra", "MTH201", None),
            course(3, "Compilers", "CS420", Some(instructor("Niklaus", None))),
        ]
    }

    fn ids(found: &[&Course]) -> Vec<i64> {
        found.iter().map(|c| c.id).collect()
    }

    #[rstest]
    #[case("cs", vec![1, 3])]
    #[case("ALGEBRA", vec![2])]
    #[case("grace", vec![1])]
    #[case("", vec![1, 2, 3])]
    #[case("   ", vec![1, 2, 3])]
    #[case("biology", vec![])]
    fn course_search(courses: Vec<Course>, #[case] term: &str, #[case] expected: Vec<i64>) {
        let query = SearchQuery::new(SearchScope::Course, term);
        assert_eq!(ids(&query.filter(&courses)), expected);
    }

    #[rstest]
    fn other_scope_leaves_list_untouched(courses: Vec<Course>) {
        let query = SearchQuery::new(SearchScope::Student, "nothing matches this");
        assert_eq!(query.filter(&courses).len(), courses.len());
    }

    #[test]
    fn instructor_search_covers_specialty() {
        let list = vec![instructor("Grace", Some("Systems")), instructor("Ada", None)];
        let query = SearchQuery::new(SearchScope::Instructor, "system");
        let found = query.filter(&list);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grace");
    }

    #[test]
    fn enrollment_search_uses_embedded_rows() {
        let enrollment = Enrollment {
            id: 1,
            student_id: 1,
            course_id: 1,
            semester: "Fall 2024".into(),
            status: "enrolled".into(),
            grade: None,
            student: Some(Student {
                id: 1,
                username: "jdoe".into(),
                email: "j@example.com".into(),
                student_id: "S001".into(),
                major: None,
                enrollment_year: None,
                created_at: None,
            }),
            course: Some(course(1, "Databases", "CS340", None)),
            enrolled_at: None,
        };
        let list = vec![enrollment];
        for term in ["JDOE", "databases", "fall", "enrolled"] {
            let query = SearchQuery::new(SearchScope::Enrollment, term);
            assert_eq!(query.filter(&list).len(), 1, "{term}");
        }
        assert!(SearchQuery::new(SearchScope::Enrollment, "S001").filter(&list).is_empty());
    }
}
