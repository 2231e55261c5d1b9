use crate::model::{SubjectKey, SubjectMarks, Student, SUBJECT_MAX_TOTAL};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower edge of each band, highest first. A score on an edge takes the upper band.
const GRADE_BANDS: [(f64, Grade, &str); 6] = [
    (
        90.0,
        Grade::APlus,
        "Outstanding performance! Keep up the excellent work.",
    ),
    (80.0, Grade::A, "Excellent work throughout the year!"),
    (
        70.0,
        Grade::BPlus,
        "Very good performance. Continue the hard work.",
    ),
    (60.0, Grade::B, "Good performance with room for improvement."),
    (
        50.0,
        Grade::C,
        "Satisfactory performance. Need to focus more on studies.",
    ),
    (
        40.0,
        Grade::D,
        "Fair performance. Significant improvement needed.",
    ),
];

const FAILING_REMARKS: &str = "Needs considerable improvement in all subjects.";

pub fn classify_grade(percentage: f64) -> Grade {
    GRADE_BANDS
        .iter()
        .find(|(floor, _, _)| percentage >= *floor)
        .map(|(_, grade, _)| *grade)
        .unwrap_or(Grade::F)
}

pub fn remarks_for(percentage: f64) -> &'static str {
    GRADE_BANDS
        .iter()
        .find(|(floor, _, _)| percentage >= *floor)
        .map(|(_, _, remarks)| *remarks)
        .unwrap_or(FAILING_REMARKS)
}

/// One-decimal rounding, halves away from zero: `75.45 -> 75.5`, `-0.25 -> -0.3`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    #[serde(flatten)]
    pub marks: SubjectMarks,
    pub total: i64,
    pub grade: Grade,
}

pub fn evaluate_subject(marks: SubjectMarks) -> SubjectResult {
    let total = marks.session1 + marks.half_yearly + marks.session2 + marks.final_exam;
    // Subject maximum is 100, so the raw total is already a percentage.
    SubjectResult {
        marks,
        total,
        grade: classify_grade(total as f64),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamTotals {
    pub session1: i64,
    pub half_yearly: i64,
    pub session2: i64,
    #[serde(rename = "final")]
    pub final_exam: i64,
}

impl ExamTotals {
    fn add(&mut self, marks: &SubjectMarks) {
        self.session1 += marks.session1;
        self.half_yearly += marks.half_yearly;
        self.session2 += marks.session2;
        self.final_exam += marks.final_exam;
    }
}

/// Read-only report snapshot handed to screen and document renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardData {
    pub id: String,
    pub name: String,
    pub father_name: String,
    pub admission_number: String,
    pub roll_no: String,
    pub class: String,
    pub section: String,
    pub date_added: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub subjects: IndexMap<String, SubjectResult>,
    pub total_marks: i64,
    pub total_possible_marks: i64,
    pub percentage: f64,
    pub overall_grade: Grade,
    pub remarks: String,
    pub exam_totals: ExamTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("student {student_id} has no known subjects to grade")]
pub struct InvalidStudentError {
    pub student_id: String,
}

/// Build the report card for one student.
///
/// Only the ten known subjects count; they are evaluated in canonical order
/// regardless of how the stored map is ordered. A student with none of them
/// cannot produce a percentage and is rejected.
pub fn generate_report(student: &Student) -> Result<ReportCardData, InvalidStudentError> {
    let mut subjects = IndexMap::new();
    let mut exam_totals = ExamTotals::default();
    let mut total_marks: i64 = 0;

    for key in SubjectKey::ALL {
        let Some(marks) = student.subjects.get(key.as_str()) else {
            continue;
        };
        let result = evaluate_subject(*marks);
        total_marks += result.total;
        exam_totals.add(&result.marks);
        subjects.insert(key.as_str().to_string(), result);
    }

    if subjects.is_empty() {
        return Err(InvalidStudentError {
            student_id: student.id.clone(),
        });
    }

    let total_possible_marks = subjects.len() as i64 * SUBJECT_MAX_TOTAL;
    let percentage =
        round_off_1_decimal((total_marks as f64) * 100.0 / (total_possible_marks as f64));

    Ok(ReportCardData {
        id: student.id.clone(),
        name: student.name.clone(),
        father_name: student.father_name.clone(),
        admission_number: student.admission_number.clone(),
        roll_no: student.admission_number.clone(),
        class: student.class.clone(),
        section: student.section.clone(),
        date_added: student.date_added.clone(),
        dob: student.dob.clone(),
        gender: student.gender.clone(),
        address: student.address.clone(),
        subjects,
        total_marks,
        total_possible_marks,
        percentage,
        overall_grade: classify_grade(percentage),
        remarks: remarks_for(percentage).to_string(),
        exam_totals,
    })
}

pub fn generate_reports(students: &[Student]) -> Result<Vec<ReportCardData>, InvalidStudentError> {
    students.iter().map(generate_report).collect()
}
