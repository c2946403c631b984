use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertPhase {
    Idle,
    Active,
}

/// What a single presence update did to the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertTransition {
    /// Idle -> Active. The only transition that produces evidence.
    Rising,
    /// Still active; repeat fires are suppressed.
    Sustained,
    /// Active -> Idle. Re-arms for the next rising edge.
    Falling,
    Quiet,
}

impl AlertTransition {
    pub fn is_rising(self) -> bool {
        self == AlertTransition::Rising
    }
}

/// Edge-triggered presence tracker.
///
/// Fires once when people first appear in the region and stays silent until
/// a tick with nobody in it re-arms it. No timers live here.
#[derive(Clone, Debug)]
pub struct AlertState {
    phase: AlertPhase,
    changed_at: Option<Instant>,
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            phase: AlertPhase::Idle,
            changed_at: None,
        }
    }

    pub fn phase(&self) -> AlertPhase {
        self.phase
    }

    /// When the last transition happened; `None` before the first one.
    pub fn changed_at(&self) -> Option<Instant> {
        self.changed_at
    }

    pub fn update(&mut self, present: bool, now: Instant) -> AlertTransition {
        let transition = match (self.phase, present) {
            (AlertPhase::Idle, true) => AlertTransition::Rising,
            (AlertPhase::Idle, false) => AlertTransition::Quiet,
            (AlertPhase::Active, true) => AlertTransition::Sustained,
            (AlertPhase::Active, false) => AlertTransition::Falling,
        };
        match transition {
            AlertTransition::Rising => {
                self.phase = AlertPhase::Active;
                self.changed_at = Some(now);
            }
            AlertTransition::Falling => {
                self.phase = AlertPhase::Idle;
                self.changed_at = Some(now);
            }
            AlertTransition::Sustained | AlertTransition::Quiet => {}
        }
        transition
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn run(presence: &[bool]) -> Vec<AlertTransition> {
        let mut state = AlertState::new();
        let start = Instant::now();
        presence
            .iter()
            .enumerate()
            .map(|(i, &p)| state.update(p, start + Duration::from_millis(i as u64 * 33)))
            .collect()
    }

    fn rising_count(presence: &[bool]) -> usize {
        run(presence).into_iter().filter(|t| t.is_rising()).count()
    }

    /// Number of maximal runs of `true`.
    fn presence_runs(presence: &[bool]) -> usize {
        presence
            .iter()
            .enumerate()
            .filter(|&(i, &p)| p && (i == 0 || !presence[i - 1]))
            .count()
    }

    #[test]
    fn test_starts_idle() {
        let state = AlertState::new();
        assert_eq!(state.phase(), AlertPhase::Idle);
        assert!(state.changed_at().is_none());
    }

    #[test]
    fn test_transition_table() {
        use AlertTransition::*;
        assert_eq!(
            run(&[false, true, true, false, false, true]),
            vec![Quiet, Rising, Sustained, Falling, Quiet, Rising]
        );
    }

    #[rstest]
    #[case::never(&[false, false, false])]
    #[case::always(&[true; 50])]
    #[case::flicker(&[true, false, true, false, true])]
    #[case::bursts(&[false, true, true, true, false, true, false, false, true, true])]
    fn test_fires_once_per_presence_run(#[case] presence: &[bool]) {
        assert_eq!(rising_count(presence), presence_runs(presence));
    }

    #[test]
    fn test_exhaustive_short_sequences() {
        for bits in 0u32..(1 << 10) {
            let presence: Vec<bool> = (0..10).map(|i| bits & (1 << i) != 0).collect();
            assert_eq!(rising_count(&presence), presence_runs(&presence), "{presence:?}");
        }
    }

    #[test]
    fn test_falling_edge_rearms() {
        let mut state = AlertState::new();
        let now = Instant::now();
        assert!(state.update(true, now).is_rising());
        assert!(!state.update(true, now).is_rising());
        assert_eq!(state.update(false, now), AlertTransition::Falling);
        assert!(state.update(true, now).is_rising());
    }

    #[test]
    fn test_records_transition_time() {
        let mut state = AlertState::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let t2 = t0 + Duration::from_secs(2);
        state.update(true, t0);
        state.update(true, t1);
        assert_eq!(state.changed_at(), Some(t0));
        state.update(false, t2);
        assert_eq!(state.changed_at(), Some(t2));
        assert_eq!(state.phase(), AlertPhase::Idle);
    }
}
