use crate::model::{
    SubjectKey, SubjectMap, SubjectMarks, Student, FINAL_MAX, HALF_YEARLY_MAX, SESSION1_MAX,
    SESSION2_MAX,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Time-prefixed random id: base-36 milliseconds followed by 64 random bits in base 36.
///
/// Ids created later in the same process sort after earlier ones on the prefix.
pub fn new_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = Uuid::new_v4().as_u128() as u64;
    format!("{}{}", to_base36(millis), to_base36(random))
}

/// Current instant in the ISO-8601 form stored as `dateAdded`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

const SAMPLE_NAMES: [(&str, &str); 5] = [
    ("Rahul Sharma", "Mr. Vikram Sharma"),
    ("Priya Patel", "Mr. Rajesh Patel"),
    ("Amit Kumar", "Mr. Suresh Kumar"),
    ("Neha Singh", "Mr. Harish Singh"),
    ("Raj Malhotra", "Mr. Vijay Malhotra"),
];
const SAMPLE_SECTIONS: [&str; 3] = ["A", "B", "C"];
const SAMPLE_ADDRESS: &str = "123 School Lane, New Delhi";

fn sample_marks<R: Rng + ?Sized>(rng: &mut R) -> SubjectMarks {
    SubjectMarks {
        session1: rng.gen_range(0..=SESSION1_MAX),
        half_yearly: rng.gen_range(0..=HALF_YEARLY_MAX),
        session2: rng.gen_range(0..=SESSION2_MAX),
        final_exam: rng.gen_range(0..=FINAL_MAX),
    }
}

/// A fully populated demo student. Every mark lies inside its period's range.
pub fn sample_student<R: Rng + ?Sized>(rng: &mut R) -> Student {
    let (name, father_name) = SAMPLE_NAMES
        .choose(rng)
        .copied()
        .unwrap_or(SAMPLE_NAMES[0]);
    let class_level: i32 = rng.gen_range(1..=12);
    let section = SAMPLE_SECTIONS.choose(rng).copied().unwrap_or("A");
    let admission_number = format!("A{:04}", rng.gen_range(0..10_000));

    let dob = NaiveDate::from_ymd_opt(
        2010 - class_level,
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .map(|d| d.format("%Y-%m-%d").to_string());
    let gender = if rng.gen_bool(0.5) { "Male" } else { "Female" };

    let mut subjects = SubjectMap::new();
    for key in SubjectKey::ALL {
        subjects.insert(key.as_str().to_string(), sample_marks(rng));
    }

    Student {
        id: new_id(),
        name: name.to_string(),
        father_name: father_name.to_string(),
        admission_number,
        class: class_level.to_string(),
        section: section.to_string(),
        date_added: now_timestamp(),
        dob,
        gender: Some(gender.to_string()),
        address: Some(SAMPLE_ADDRESS.to_string()),
        subjects,
    }
}
