use crate::types::errors::Error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Probe hit counts collected from one counter session, keyed by unit name
/// and probe id.
#[derive(Debug, Default, Clone)]
pub struct ExecutionData {
    hits: HashMap<String, HashMap<u32, u64>>,
}

impl ExecutionData {
    pub fn probe_hits(&self, unit: &str, probe: u32) -> u64 {
        self.hits
            .get(unit)
            .and_then(|probes| probes.get(&probe))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Created,
    Started,
    Collected,
}

/// The single per-run runtime accumulating probe hits between `start` and
/// `stop_and_collect`. Probes recorded outside the started window are
/// dropped.
#[derive(Debug)]
struct CounterSession {
    state: SessionState,
    hits: HashMap<String, HashMap<u32, u64>>,
}

/// Shared handle to the run's counter session, passed by reference through
/// the instrumentation and execution stages.
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<CounterSession>>);

impl SessionHandle {
    pub fn new() -> Self {
        SessionHandle(Arc::new(Mutex::new(CounterSession {
            state: SessionState::Created,
            hits: HashMap::new(),
        })))
    }

    /// Begins the recording window. Starting twice is a misuse error.
    pub fn start(&self) -> Result<(), Error> {
        let mut session = self.0.lock().unwrap();
        match session.state {
            SessionState::Created => {
                session.state = SessionState::Started;
                Ok(())
            }
            SessionState::Started => Err(Error::Session("session already started".to_string())),
            SessionState::Collected => Err(Error::Session("session already collected".to_string())),
        }
    }

    /// Records one probe execution for a unit.
    pub fn record(&self, unit: &str, probe: u32) {
        let mut session = self.0.lock().unwrap();
        if session.state != SessionState::Started {
            return;
        }
        *session
            .hits
            .entry(unit.to_string())
            .or_default()
            .entry(probe)
            .or_insert(0) += 1;
    }

    /// Ends the recording window and hands out the accumulated counts.
    /// Collecting before `start` is a misuse error.
    pub fn stop_and_collect(&self) -> Result<ExecutionData, Error> {
        let mut session = self.0.lock().unwrap();
        match session.state {
            SessionState::Started => {
                session.state = SessionState::Collected;
                Ok(ExecutionData {
                    hits: std::mem::take(&mut session.hits),
                })
            }
            SessionState::Created => {
                Err(Error::Session("session collected before start".to_string()))
            }
            SessionState::Collected => Err(Error::Session("session already collected".to_string())),
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_start_then_collect() {
        let session = SessionHandle::new();
        session.start().unwrap();
        session.record("a.B", 0);
        session.record("a.B", 0);
        session.record("a.B", 1);

        let data = session.stop_and_collect().unwrap();
        assert_eq!(data.probe_hits("a.B", 0), 2);
        assert_eq!(data.probe_hits("a.B", 1), 1);
        assert_eq!(data.probe_hits("a.B", 2), 0);
    }

    #[test]
    fn double_start_is_an_error() {
        let session = SessionHandle::new();
        session.start().unwrap();
        assert!(matches!(session.start(), Err(Error::Session(_))));
    }

    #[test]
    fn collect_before_start_is_an_error() {
        let session = SessionHandle::new();
        assert!(matches!(session.stop_and_collect(), Err(Error::Session(_))));
    }

    #[test]
    fn records_outside_the_window_are_dropped() {
        let session = SessionHandle::new();
        session.record("a.B", 0);
        session.start().unwrap();
        session.record("a.B", 0);
        let data = session.stop_and_collect().unwrap();
        assert_eq!(data.probe_hits("a.B", 0), 1);
        session.record("a.B", 0);
    }
}
