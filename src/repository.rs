use crate::ids;
use crate::model::{fill_known_subjects, SchoolInfo, Student, StudentDraft};
use crate::store::{KvStore, StorageError};
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;

pub const STUDENTS_KEY: &str = "report-card-students";
pub const SCHOOL_INFO_KEY: &str = "report-card-school-info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Class,
    Date,
    /// Anything else keeps the incoming order.
    Unsorted,
}

impl SortKey {
    pub fn parse(raw: &str) -> SortKey {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => SortKey::Name,
            "class" => SortKey::Class,
            "date" => SortKey::Date,
            _ => SortKey::Unsorted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Class => "class",
            SortKey::Date => "date",
            SortKey::Unsorted => "none",
        }
    }
}

/// Case-insensitive first, then exact, so "amit" and "Amit" sit together.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn parse_date_added(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Sorted copy of `students`. The sort is stable, so equal keys keep input order.
///
/// `Class` compares the class text, not its number: "10" comes before "2".
/// `Date` puts the newest `dateAdded` first; unparseable dates go last.
pub fn sort_students(students: &[Student], key: SortKey) -> Vec<Student> {
    let mut out = students.to_vec();
    match key {
        SortKey::Name => out.sort_by(|a, b| collate(&a.name, &b.name)),
        SortKey::Class => out.sort_by(|a, b| {
            collate(&a.class, &b.class).then_with(|| collate(&a.section, &b.section))
        }),
        SortKey::Date => out.sort_by(|a, b| {
            match (parse_date_added(&a.date_added), parse_date_added(&b.date_added)) {
                (Some(da), Some(db)) => db.cmp(&da),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
        SortKey::Unsorted => {}
    }
    out
}

/// Owns the student collection and the school header inside one key-value store.
///
/// Every mutation reads the whole collection, changes it and writes it back.
/// Mutations refuse to run over a collection that does not decode.
/// Callers must not interleave mutations from several threads.
pub struct StudentRepository<S: KvStore> {
    store: S,
}

impl<S: KvStore> StudentRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(text) = self.store.load(key)? else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.save(key, &text).map_err(|e| {
            tracing::error!(key, error = %e, "failed to persist");
            e
        })
    }

    pub fn try_list(&self) -> Result<Vec<Student>, StorageError> {
        Ok(self.load_json(STUDENTS_KEY)?.unwrap_or_default())
    }

    /// All students, or an empty list when the stored collection cannot be read.
    pub fn list(&self) -> Vec<Student> {
        self.try_list().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "student collection unreadable; treating as empty");
            Vec::new()
        })
    }

    pub fn create(&self, draft: StudentDraft) -> Result<Student, StorageError> {
        let student = draft
            .with_all_subjects()
            .into_student(ids::new_id(), ids::now_timestamp());
        let mut students = self.try_list()?;
        students.push(student.clone());
        self.save_json(STUDENTS_KEY, &students)?;
        tracing::info!(student_id = %student.id, total = students.len(), "student created");
        Ok(student)
    }

    /// Replace the stored record with the same id. The whole record is taken as
    /// given, including `dateAdded`; known subjects it leaves out come back as
    /// zero marks.
    pub fn update(&self, mut student: Student) -> Result<bool, StorageError> {
        fill_known_subjects(&mut student.subjects);
        let mut students = self.try_list()?;
        let Some(slot) = students.iter_mut().find(|s| s.id == student.id) else {
            return Ok(false);
        };
        *slot = student;
        self.save_json(STUDENTS_KEY, &students)?;
        Ok(true)
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut students = self.try_list()?;
        let before = students.len();
        students.retain(|s| s.id != id);
        if students.len() == before {
            return Ok(false);
        }
        self.save_json(STUDENTS_KEY, &students)?;
        tracing::info!(student_id = id, remaining = students.len(), "student deleted");
        Ok(true)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Student> {
        self.list().into_iter().find(|s| s.id == id)
    }

    pub fn create_sample(&self) -> Result<Student, StorageError> {
        let sample = ids::sample_student(&mut rand::thread_rng());
        self.create(StudentDraft::from(sample))
    }

    pub fn school_info(&self) -> SchoolInfo {
        match self.load_json(SCHOOL_INFO_KEY) {
            Ok(Some(info)) => info,
            Ok(None) => SchoolInfo::default(),
            Err(e) => {
                tracing::warn!(error = %e, "school info unreadable; using defaults");
                SchoolInfo::default()
            }
        }
    }

    pub fn save_school_info(&self, info: &SchoolInfo) -> Result<(), StorageError> {
        self.save_json(SCHOOL_INFO_KEY, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SubjectKey, SubjectMarks};
    use crate::store::MemoryStore;

    fn draft(name: &str, class: &str, section: &str) -> StudentDraft {
        StudentDraft {
            name: name.into(),
            father_name: format!("Father of {name}"),
            admission_number: format!("A-{name}"),
            class: class.into(),
            section: section.into(),
            ..StudentDraft::default()
        }
    }

    fn repo() -> StudentRepository<MemoryStore> {
        StudentRepository::new(MemoryStore::new())
    }

    struct FailingWrites(MemoryStore);

    impl KvStore for FailingWrites {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.load(key)
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("disk full".into()))
        }
    }

    #[test]
    fn create_then_find_returns_draft_plus_identity() {
        let repo = repo();
        let d = draft("Neha Singh", "5", "C");
        let created = repo.create(d.clone()).expect("create");
        assert!(!created.id.is_empty());
        assert!(parse_date_added(&created.date_added).is_some());

        let found = repo.find_by_id(&created.id).expect("found");
        assert_eq!(found, created);
        let expected = d
            .with_all_subjects()
            .into_student(created.id.clone(), created.date_added.clone());
        assert_eq!(found, expected);
    }

    #[test]
    fn create_fills_missing_subjects_with_zero() {
        let repo = repo();
        let mut d = draft("Raj", "9", "A");
        d.subjects.insert(
            "english".into(),
            SubjectMarks {
                session1: 9,
                half_yearly: 27,
                session2: 8,
                final_exam: 45,
            },
        );
        let created = repo.create(d).expect("create");
        assert_eq!(created.subjects.len(), SubjectKey::ALL.len());
        assert_eq!(created.subjects["english"].final_exam, 45);
        assert_eq!(created.subjects["hindi"], SubjectMarks::default());
    }

    #[test]
    fn update_unknown_id_leaves_collection_alone() {
        let repo = repo();
        repo.create(draft("A", "1", "A")).expect("create a");
        repo.create(draft("B", "1", "B")).expect("create b");
        let before = repo.list();

        let mut ghost = before[0].clone();
        ghost.id = "missing".into();
        ghost.name = "Ghost".into();
        assert!(!repo.update(ghost).expect("update"));
        assert_eq!(repo.list(), before);
    }

    #[test]
    fn update_replaces_in_place() {
        let repo = repo();
        let a = repo.create(draft("A", "1", "A")).expect("create a");
        let b = repo.create(draft("B", "1", "B")).expect("create b");

        let mut changed = a.clone();
        changed.name = "Alpha".into();
        changed.address = Some("1 Mall Road".into());
        assert!(repo.update(changed.clone()).expect("update"));

        let list = repo.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], changed);
        assert_eq!(list[1], b);
    }

    #[test]
    fn delete_twice() {
        let repo = repo();
        let a = repo.create(draft("A", "1", "A")).expect("create a");
        repo.create(draft("B", "1", "B")).expect("create b");

        assert!(repo.delete(&a.id).expect("first delete"));
        assert_eq!(repo.list().len(), 1);
        assert!(!repo.delete(&a.id).expect("second delete"));
        assert_eq!(repo.list().len(), 1);
        assert!(repo.find_by_id(&a.id).is_none());
    }

    #[test]
    fn corrupt_collection_reads_as_empty() {
        let store = MemoryStore::new();
        store.save(STUDENTS_KEY, "{not json").expect("seed");
        let repo = StudentRepository::new(store);
        assert!(repo.list().is_empty());
        assert!(matches!(
            repo.try_list(),
            Err(StorageError::Corrupt { .. })
        ));
        assert!(repo.find_by_id("anything").is_none());
    }

    #[test]
    fn mutations_refuse_unreadable_collection() {
        let stored = r#"[{"id":"a","name":"A","fatherName":"F","admissionNumber":"1","class":"1","section":"A","dateAdded":"2024-01-01T00:00:00.000Z","subjects":{"hindi":{"session1":7.5}}},{"id":"b","name":"B","fatherName":"F","admissionNumber":"2","class":"1","section":"A","dateAdded":"2024-01-01T00:00:00.000Z","subjects":{}}]"#;
        let store = MemoryStore::new();
        store.save(STUDENTS_KEY, stored).expect("seed");
        let repo = StudentRepository::new(store);

        let err = repo.create(draft("C", "1", "A")).expect_err("create must fail");
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let mut b = draft("B", "1", "A").into_student("b".into(), String::new());
        b.name = "Bee".into();
        assert!(matches!(repo.update(b), Err(StorageError::Corrupt { .. })));
        assert!(matches!(repo.delete("a"), Err(StorageError::Corrupt { .. })));
        assert!(matches!(repo.create_sample(), Err(StorageError::Corrupt { .. })));

        assert_eq!(
            repo.store().load(STUDENTS_KEY).expect("load").as_deref(),
            Some(stored)
        );
    }

    #[test]
    fn update_restores_missing_subjects() {
        let repo = repo();
        let a = repo.create(draft("A", "1", "A")).expect("create a");
        repo.create(draft("B", "1", "B")).expect("create b");

        let mut emptied = a.clone();
        emptied.subjects.clear();
        emptied.subjects.insert(
            "sanskrit".into(),
            SubjectMarks {
                final_exam: 40,
                ..SubjectMarks::default()
            },
        );
        assert!(repo.update(emptied).expect("update"));

        let stored = repo.find_by_id(&a.id).expect("found");
        assert_eq!(stored.subjects.len(), SubjectKey::ALL.len());
        assert_eq!(stored.subjects["sanskrit"].final_exam, 40);
        assert_eq!(stored.subjects["hindi"], SubjectMarks::default());
        assert!(crate::calc::generate_reports(&repo.list()).is_ok());
    }

    #[test]
    fn write_failures_surface() {
        let repo = StudentRepository::new(FailingWrites(MemoryStore::new()));
        let err = repo.create(draft("A", "1", "A")).expect_err("create must fail");
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(repo.list().is_empty());
    }

    #[test]
    fn school_info_defaults_and_round_trips() {
        let repo = repo();
        assert_eq!(repo.school_info(), SchoolInfo::default());

        repo.store()
            .save(SCHOOL_INFO_KEY, "[]")
            .expect("seed corrupt");
        assert_eq!(repo.school_info(), SchoolInfo::default());

        let info = SchoolInfo {
            name: "Kendriya Vidyalaya".into(),
            address: "Sector 8, R.K. Puram".into(),
            logo1: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            logo2: None,
        };
        repo.save_school_info(&info).expect("save");
        assert_eq!(repo.school_info(), info);
    }

    #[test]
    fn sample_creation_goes_through_create() {
        let repo = repo();
        let s = repo.create_sample().expect("sample");
        assert_eq!(repo.list(), vec![s.clone()]);
        assert_eq!(s.subjects.len(), 10);
    }

    #[test]
    fn sort_by_class_is_lexicographic() {
        let students = vec![
            draft("x", "10", "A").into_student("1".into(), "2024-01-01T00:00:00.000Z".into()),
            draft("y", "2", "A").into_student("2".into(), "2024-01-01T00:00:00.000Z".into()),
            draft("z", "10", "A").into_student("3".into(), "2024-01-01T00:00:00.000Z".into()),
        ];
        let sorted = sort_students(&students, SortKey::Class);
        let ids: Vec<&str> = sorted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
        // Input is untouched.
        assert_eq!(students[1].id, "2");
    }

    #[test]
    fn sort_by_class_then_section() {
        let students = vec![
            draft("x", "7", "C").into_student("1".into(), String::new()),
            draft("y", "7", "A").into_student("2".into(), String::new()),
            draft("z", "6", "B").into_student("3".into(), String::new()),
        ];
        let ids: Vec<String> = sort_students(&students, SortKey::Class)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn sort_by_name_ignores_case() {
        let students = vec![
            draft("rahul", "1", "A").into_student("1".into(), String::new()),
            draft("Amit", "1", "A").into_student("2".into(), String::new()),
            draft("neha", "1", "A").into_student("3".into(), String::new()),
        ];
        let names: Vec<String> = sort_students(&students, SortKey::Name)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Amit", "neha", "rahul"]);
    }

    #[test]
    fn sort_by_date_newest_first() {
        let students = vec![
            draft("a", "1", "A").into_student("old".into(), "2023-06-01T08:00:00.000Z".into()),
            draft("b", "1", "A").into_student("bad".into(), "yesterday".into()),
            draft("c", "1", "A").into_student("new".into(), "2024-06-01T08:00:00.000Z".into()),
            draft("d", "1", "A").into_student("mid".into(), "2024-01-15T08:00:00+05:30".into()),
        ];
        let ids: Vec<String> = sort_students(&students, SortKey::Date)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old", "bad"]);
    }

    #[test]
    fn unknown_sort_key_keeps_order() {
        assert_eq!(SortKey::parse("grade"), SortKey::Unsorted);
        assert_eq!(SortKey::parse(" Name "), SortKey::Name);
        let students = vec![
            draft("b", "2", "A").into_student("1".into(), String::new()),
            draft("a", "1", "A").into_student("2".into(), String::new()),
        ];
        assert_eq!(sort_students(&students, SortKey::parse("grade")), students);
    }
}
