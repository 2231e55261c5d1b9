use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The ten subjects every report card carries, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Hindi,
    English,
    Mathematics,
    Science,
    SocialScience,
    EnvironmentalStudies,
    HomeScience,
    ArtMusic,
    Sanskrit,
    Sports,
}

impl SubjectKey {
    pub const ALL: [SubjectKey; 10] = [
        SubjectKey::Hindi,
        SubjectKey::English,
        SubjectKey::Mathematics,
        SubjectKey::Science,
        SubjectKey::SocialScience,
        SubjectKey::EnvironmentalStudies,
        SubjectKey::HomeScience,
        SubjectKey::ArtMusic,
        SubjectKey::Sanskrit,
        SubjectKey::Sports,
    ];

    /// Storage key, as written in the persisted JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKey::Hindi => "hindi",
            SubjectKey::English => "english",
            SubjectKey::Mathematics => "mathematics",
            SubjectKey::Science => "science",
            SubjectKey::SocialScience => "socialScience",
            SubjectKey::EnvironmentalStudies => "environmentalStudies",
            SubjectKey::HomeScience => "homeScience",
            SubjectKey::ArtMusic => "artMusic",
            SubjectKey::Sanskrit => "sanskrit",
            SubjectKey::Sports => "sports",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubjectKey::Hindi => "Hindi",
            SubjectKey::English => "English",
            SubjectKey::Mathematics => "Mathematics",
            SubjectKey::Science => "Science",
            SubjectKey::SocialScience => "Social Science",
            SubjectKey::EnvironmentalStudies => "Environmental Studies",
            SubjectKey::HomeScience => "Home Science / Agriculture",
            SubjectKey::ArtMusic => "Art & Music",
            SubjectKey::Sanskrit => "Sanskrit",
            SubjectKey::Sports => "Sports / Physical Education",
        }
    }
}

pub const SESSION1_MAX: i64 = 10;
pub const HALF_YEARLY_MAX: i64 = 30;
pub const SESSION2_MAX: i64 = 10;
pub const FINAL_MAX: i64 = 50;

/// Highest total a subject can reach; per-subject totals double as percentages
/// only while this stays at 100.
pub const SUBJECT_MAX_TOTAL: i64 = SESSION1_MAX + HALF_YEARLY_MAX + SESSION2_MAX + FINAL_MAX;

/// Raw marks for one subject across the four assessment periods.
///
/// Values are stored as entered. Range checks belong to whoever collects the
/// marks; nothing here clamps or rejects them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectMarks {
    pub session1: i64,
    pub half_yearly: i64,
    pub session2: i64,
    #[serde(rename = "final")]
    pub final_exam: i64,
}

pub type SubjectMap = IndexMap<String, SubjectMarks>;

/// Add zero marks for every known subject missing from `subjects`.
pub fn fill_known_subjects(subjects: &mut SubjectMap) {
    for key in SubjectKey::ALL {
        subjects.entry(key.as_str().to_string()).or_default();
    }
}

/// A student as persisted in the workspace store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub father_name: String,
    pub admission_number: String,
    pub class: String,
    pub section: String,
    pub date_added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub subjects: SubjectMap,
}

/// Student fields supplied by the caller before an id and creation time exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    pub name: String,
    pub father_name: String,
    pub admission_number: String,
    pub class: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub subjects: SubjectMap,
}

impl StudentDraft {
    /// Add zero marks for any known subject the draft leaves out.
    pub fn with_all_subjects(mut self) -> Self {
        fill_known_subjects(&mut self.subjects);
        self
    }

    pub fn into_student(self, id: String, date_added: String) -> Student {
        Student {
            id,
            name: self.name,
            father_name: self.father_name,
            admission_number: self.admission_number,
            class: self.class,
            section: self.section,
            date_added,
            dob: self.dob,
            gender: self.gender,
            address: self.address,
            subjects: self.subjects,
        }
    }
}

impl From<Student> for StudentDraft {
    fn from(s: Student) -> Self {
        StudentDraft {
            name: s.name,
            father_name: s.father_name,
            admission_number: s.admission_number,
            class: s.class,
            section: s.section,
            dob: s.dob,
            gender: s.gender,
            address: s.address,
            subjects: s.subjects,
        }
    }
}

pub const DEFAULT_SCHOOL_NAME: &str = "School Name";

/// School header shown on every report card. Logos are data URLs or bare base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolInfo {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo2: Option<String>,
}

impl Default for SchoolInfo {
    fn default() -> Self {
        SchoolInfo {
            name: DEFAULT_SCHOOL_NAME.to_string(),
            address: String::new(),
            logo1: None,
            logo2: None,
        }
    }
}
