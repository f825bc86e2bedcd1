use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{GatewayError, Result};

/// Round-robin target election.
///
/// The cursor is advanced with a single atomic read-modify-write, so
/// concurrent elections from simultaneous requests observe a strict
/// cyclic sequence. A cursor left out of range by a shrinking target
/// list silently wraps to the front instead of erroring.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elect the next target in rotation.
    pub fn elect<'a>(&self, targets: &'a [String]) -> Result<&'a str> {
        if targets.is_empty() {
            return Err(GatewayError::NoTargetsAvailable);
        }

        // Single target: no rotation, cursor untouched.
        if targets.len() == 1 {
            return Ok(&targets[0]);
        }

        let len = targets.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let index = if current >= len { 0 } else { current };
                Some(index + 1)
            })
            .unwrap_or_else(|current| current);

        let index = if previous >= len { 0 } else { previous };
        Ok(&targets[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_cycles_through_targets_in_order() {
        let rr = RoundRobin::new();
        let targets = targets(&["http://a:8080", "http://b:8080", "http://c:8080"]);

        let mut elected = Vec::new();
        for _ in 0..7 {
            elected.push(rr.elect(&targets).unwrap().to_string());
        }

        assert_eq!(
            elected,
            vec![
                "http://a:8080",
                "http://b:8080",
                "http://c:8080",
                "http://a:8080",
                "http://b:8080",
                "http://c:8080",
                "http://a:8080",
            ]
        );
    }

    #[test]
    fn test_single_target_always_returned() {
        let rr = RoundRobin::new();
        let targets = targets(&["http://only:8080"]);

        for _ in 0..5 {
            assert_eq!(rr.elect(&targets).unwrap(), "http://only:8080");
        }
    }

    #[test]
    fn test_zero_targets_errors() {
        let rr = RoundRobin::new();
        let empty: Vec<String> = vec![];

        for _ in 0..3 {
            assert!(matches!(
                rr.elect(&empty),
                Err(GatewayError::NoTargetsAvailable)
            ));
        }
    }

    #[test]
    fn test_cursor_wraps_when_target_list_shrinks() {
        let rr = RoundRobin::new();
        let three = targets(&["http://a:8080", "http://b:8080", "http://c:8080"]);
        rr.elect(&three).unwrap();
        rr.elect(&three).unwrap();
        rr.elect(&three).unwrap(); // cursor now 3

        let two = targets(&["http://a:8080", "http://b:8080"]);
        // Out-of-range cursor wraps to the front rather than panicking.
        assert_eq!(rr.elect(&two).unwrap(), "http://a:8080");
        assert_eq!(rr.elect(&two).unwrap(), "http://b:8080");
    }

    #[test]
    fn test_concurrent_elections_stay_balanced() {
        use std::sync::Arc;

        let rr = Arc::new(RoundRobin::new());
        let targets = Arc::new(targets(&["http://a:8080", "http://b:8080", "http://c:8080"]));
        let rounds = 4;

        let mut handles = Vec::new();
        for _ in 0..targets.len() * rounds {
            let rr = rr.clone();
            let targets = targets.clone();
            handles.push(std::thread::spawn(move || {
                rr.elect(&targets).unwrap().to_string()
            }));
        }

        let mut counts = std::collections::HashMap::new();
        for handle in handles {
            *counts.entry(handle.join().unwrap()).or_insert(0usize) += 1;
        }

        // Each election is a single atomic step, so the rotation stays exact
        // regardless of interleaving.
        for target in targets.iter() {
            assert_eq!(counts[target], rounds);
        }
    }
}
