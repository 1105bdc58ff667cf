use crate::result::{CheckResult, Severity};

/// Where navigation landed.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationStop {
    pub index: usize,
    pub time: f64,
    pub reason: String,
    pub severity: Severity,
}

/// Cyclic cursor over [`CheckResult::all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    moved: bool,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_moved(&self) -> bool {
        self.moved
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.moved = false;
    }

    /// Step by `offset` with wraparound. The first call after a reset treats a forward
    /// offset as zero so the user lands on the first flagged object; backward offsets
    /// wrap to the end. Does nothing when `result` is empty.
    pub fn advance(&mut self, offset: i64, result: &CheckResult) -> Option<NavigationStop> {
        let len = result.len();
        if len == 0 {
            return None;
        }
        let mut offset = offset;
        if !self.moved {
            self.moved = true;
            offset = offset.min(0);
        }
        // Reduce first so extreme offsets cannot overflow.
        let len = len as i64;
        let step = offset.rem_euclid(len);
        self.index = ((self.index as i64 + step) % len) as usize;
        let flagged = result.get(self.index)?;
        Some(NavigationStop {
            index: self.index,
            time: flagged.object.time(),
            reason: flagged.reason.clone(),
            severity: flagged.severity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Note, NoteType, ObjectId};
    use crate::result::PendingResult;

    fn result_with(times: &[f64]) -> CheckResult {
        let mut pending = PendingResult::new();
        for (id, time) in times.iter().enumerate() {
            pending.warning(Note::new(ObjectId(id as u64), *time, 0, 0, NoteType::Red), format!("at {time}"));
        }
        pending.commit()
    }

    #[test]
    fn first_forward_step_lands_on_first_object() {
        let result = result_with(&[1.0, 2.0, 3.0]);
        let mut nav = Navigator::new();
        let stop = nav.advance(5, &result).expect("stop");
        assert_eq!(stop.index, 0);
        assert_eq!(stop.time, 1.0);
        assert_eq!(nav.advance(1, &result).map(|s| s.index), Some(1));
    }

    #[test]
    fn first_backward_step_wraps_to_last_object() {
        let result = result_with(&[1.0, 2.0, 3.0]);
        let mut nav = Navigator::new();
        assert_eq!(nav.advance(-1, &result).map(|s| s.index), Some(2));
    }

    #[test]
    fn stepping_is_modular() {
        let result = result_with(&[1.0, 2.0, 3.0, 4.0]);
        let mut nav = Navigator::new();
        let start = nav.advance(1, &result).expect("initial");
        for _ in 0..result.len() {
            nav.advance(1, &result);
        }
        assert_eq!(nav.index(), start.index);
        assert_eq!(nav.advance(-6, &result).map(|s| s.index), Some(2));
    }

    #[test]
    fn zero_offset_is_idempotent() {
        let result = result_with(&[1.0, 2.0]);
        let mut nav = Navigator::new();
        nav.advance(1, &result);
        nav.advance(1, &result);
        let first = nav.advance(0, &result);
        let second = nav.advance(0, &result);
        assert_eq!(first, second);
        assert_eq!(first.map(|s| s.reason), Some("at 2".to_string()));
    }

    #[test]
    fn extreme_offsets_wrap_without_overflow() {
        let result = result_with(&[1.0, 2.0, 3.0]);
        let mut nav = Navigator::new();
        nav.advance(1, &result);
        nav.advance(1, &result);
        // i64::MAX = 3 * k + 1, i64::MIN = 3 * k' + 1 under Euclidean division.
        assert_eq!(nav.advance(i64::MAX, &result).map(|s| s.index), Some(2));
        assert_eq!(nav.advance(i64::MIN, &result).map(|s| s.index), Some(0));

        let mut fresh = Navigator::new();
        assert_eq!(fresh.advance(i64::MIN, &result).map(|s| s.index), Some(1));
    }

    #[test]
    fn empty_result_is_a_no_op() {
        let result = result_with(&[]);
        let mut nav = Navigator::new();
        assert_eq!(nav.advance(1, &result), None);
        assert!(!nav.has_moved());
        assert_eq!(nav.index(), 0);
    }
}
