use crossbeam_utils::Backoff;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Returned when a spin strategy stops polling before the flag reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinExhausted {
    /// Number of flag loads performed before giving up.
    pub polls: u64,
}

/// Busy-wait primitive used by both roles.
///
/// Implementations must only return `Ok` after an `Acquire` load of `flag`
/// observed `target`, so everything the peer wrote before its `Release` store
/// is visible to the caller.
pub trait SpinWait {
    fn wait_for(&self, flag: &AtomicU32, target: u32) -> Result<u64, SpinExhausted>;
}

/// The spin strategies shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinStrategy {
    /// Tight loop with no yield and no timeout. A dead peer means a hang.
    #[default]
    Unbounded,
    /// Gives up after `max_polls` loads. Meant for tests.
    Bounded { max_polls: u64 },
    /// Exponential backoff that gives up once `timeout` has elapsed.
    Backoff { timeout: Duration },
}

impl SpinWait for SpinStrategy {
    fn wait_for(&self, flag: &AtomicU32, target: u32) -> Result<u64, SpinExhausted> {
        match *self {
            SpinStrategy::Unbounded => {
                let mut polls = 1;
                while flag.load(Ordering::Acquire) != target {
                    std::hint::spin_loop();
                    polls += 1;
                }
                Ok(polls)
            }
            SpinStrategy::Bounded { max_polls } => {
                let mut polls = 0;
                while polls < max_polls {
                    polls += 1;
                    if flag.load(Ordering::Acquire) == target {
                        return Ok(polls);
                    }
                    std::hint::spin_loop();
                }
                Err(SpinExhausted { polls })
            }
            SpinStrategy::Backoff { timeout } => {
                let deadline = Instant::now() + timeout;
                let backoff = Backoff::new();
                let mut polls = 0;
                loop {
                    polls += 1;
                    if flag.load(Ordering::Acquire) == target {
                        return Ok(polls);
                    }
                    if Instant::now() >= deadline {
                        return Err(SpinExhausted { polls });
                    }
                    if backoff.is_completed() {
                        // backoff saturated; keep polling with a yield per round
                        std::thread::yield_now();
                    } else {
                        backoff.snooze();
                    }
                }
            }
        }
    }
}

impl<S: SpinWait + ?Sized> SpinWait for &S {
    fn wait_for(&self, flag: &AtomicU32, target: u32) -> Result<u64, SpinExhausted> {
        (**self).wait_for(flag, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unbounded_returns_immediately_when_already_set() {
        let flag = AtomicU32::new(1);
        assert_eq!(SpinStrategy::Unbounded.wait_for(&flag, 1), Ok(1));
    }

    #[test]
    fn test_bounded_gives_up_after_max_polls() {
        let flag = AtomicU32::new(0);
        let res = SpinStrategy::Bounded { max_polls: 64 }.wait_for(&flag, 1);
        assert_eq!(res, Err(SpinExhausted { polls: 64 }));
    }

    #[test]
    fn test_bounded_with_zero_polls_never_loads() {
        let flag = AtomicU32::new(1);
        let res = SpinStrategy::Bounded { max_polls: 0 }.wait_for(&flag, 1);
        assert_eq!(res, Err(SpinExhausted { polls: 0 }));
    }

    #[test]
    fn test_backoff_times_out() {
        let flag = AtomicU32::new(0);
        let start = Instant::now();
        let res = SpinStrategy::Backoff {
            timeout: Duration::from_millis(20),
        }
        .wait_for(&flag, 1);
        assert!(res.is_err());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_unbounded_observes_store_from_other_thread() {
        let flag = Arc::new(AtomicU32::new(0));
        let setter = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                flag.store(1, Ordering::Release);
            })
        };
        let polls = SpinStrategy::Unbounded.wait_for(&flag, 1).unwrap();
        assert!(polls >= 1);
        setter.join().unwrap();
    }
}
