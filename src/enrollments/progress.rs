//! Lesson-completion bookkeeping: a set of (module, lesson) pairs and the
//! derived progress percentage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLesson {
    pub module_id: Uuid,
    pub lesson_id: Uuid,
}

/// Set-union insert: returns false (and leaves the list untouched) when the
/// pair is already recorded.
pub fn insert_completed(lessons: &mut Vec<CompletedLesson>, entry: CompletedLesson) -> bool {
    if lessons.contains(&entry) {
        return false;
    }
    lessons.push(entry);
    true
}

/// `round(100 * completed / total)` clamped to [0, 100]; an empty curriculum
/// pins progress at 0.
pub fn progress_percent(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round() as i32;
    pct.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(m: u128, l: u128) -> CompletedLesson {
        CompletedLesson {
            module_id: Uuid::from_u128(m),
            lesson_id: Uuid::from_u128(l),
        }
    }

    #[test]
    fn insert_is_a_set_union() {
        let mut lessons = Vec::new();
        assert!(insert_completed(&mut lessons, pair(1, 1)));
        assert!(insert_completed(&mut lessons, pair(1, 2)));
        assert!(!insert_completed(&mut lessons, pair(1, 1)));
        assert_eq!(lessons.len(), 2);
    }

    #[test]
    fn same_lesson_id_under_different_modules_is_distinct() {
        let mut lessons = Vec::new();
        assert!(insert_completed(&mut lessons, pair(1, 7)));
        assert!(insert_completed(&mut lessons, pair(2, 7)));
        assert_eq!(lessons.len(), 2);
    }

    #[test]
    fn two_of_four_lessons_is_fifty_percent() {
        assert_eq!(progress_percent(2, 4), 50);
    }

    #[test]
    fn all_lessons_is_one_hundred() {
        assert_eq!(progress_percent(4, 4), 100);
    }

    #[test]
    fn rounding_follows_round_half_away() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 8), 13);
    }

    #[test]
    fn empty_curriculum_is_zero() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(5, 0), 0);
    }

    #[test]
    fn overcount_is_clamped() {
        // Stale completions can outnumber lessons after a curriculum edit.
        assert_eq!(progress_percent(9, 4), 100);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(pair(1, 2)).unwrap();
        assert!(json.get("moduleId").is_some());
        assert!(json.get("lessonId").is_some());
    }
}
