#[path = "../src/calc.rs"]
mod calc;
#[path = "../src/ids.rs"]
mod ids;
#[path = "../src/model.rs"]
mod model;

use calc::{classify_grade, evaluate_subject, generate_report, Grade};
use model::{SubjectKey, SubjectMarks, FINAL_MAX, HALF_YEARLY_MAX, SESSION1_MAX, SESSION2_MAX};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn in_range_marks_total_between_0_and_100() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2000 {
        let m = SubjectMarks {
            session1: rng.gen_range(0..=SESSION1_MAX),
            half_yearly: rng.gen_range(0..=HALF_YEARLY_MAX),
            session2: rng.gen_range(0..=SESSION2_MAX),
            final_exam: rng.gen_range(0..=FINAL_MAX),
        };
        let r = evaluate_subject(m);
        assert_eq!(r.total, m.session1 + m.half_yearly + m.session2 + m.final_exam);
        assert!((0..=100).contains(&r.total));
        assert_eq!(r.grade, classify_grade(r.total as f64));
        assert_eq!(r.marks, m);
    }
}

#[test]
fn sample_reports_are_consistent() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let student = ids::sample_student(&mut rng);
        let report = generate_report(&student).expect("sample report");

        let subject_sum: i64 = report.subjects.values().map(|s| s.total).sum();
        assert_eq!(report.total_marks, subject_sum);
        assert_eq!(report.total_possible_marks, 1000);
        assert_eq!(
            report.exam_totals.session1
                + report.exam_totals.half_yearly
                + report.exam_totals.session2
                + report.exam_totals.final_exam,
            report.total_marks
        );
        // Ten subjects out of 100 each: the percentage is exactly total / 10.
        assert_eq!(report.percentage, report.total_marks as f64 / 10.0);
        assert_eq!(report.overall_grade, classify_grade(report.percentage));
        assert_eq!(report.roll_no, student.admission_number);
        assert_eq!(report.subjects.len(), SubjectKey::ALL.len());

        assert_eq!(generate_report(&student).expect("again"), report);
    }
}

#[test]
fn percentage_rounds_to_one_decimal() {
    let mut student = ids::sample_student(&mut StdRng::seed_from_u64(1));
    student.subjects.clear();
    // 3 subjects, 269 / 300 = 89.666.. -> 89.7 -> A
    for (key, fin) in [("hindi", 40), ("english", 39), ("science", 40)] {
        student.subjects.insert(
            key.to_string(),
            SubjectMarks {
                session1: 10,
                half_yearly: 30,
                session2: 10,
                final_exam: fin,
            },
        );
    }
    let report = generate_report(&student).expect("report");
    assert_eq!(report.total_marks, 269);
    assert_eq!(report.total_possible_marks, 300);
    assert_eq!(report.percentage, 89.7);
    assert_eq!(report.overall_grade, Grade::A);
}
