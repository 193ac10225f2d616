//! One evaluation cycle: load state, evaluate, dedup, save.

use thiserror::Error;
use tracing::{debug, info};

use crate::decision::{Evaluator, Verdict};
use crate::dedup::{SignalIdentity, SignalLedger};
use crate::domain::MarketSnapshot;
use crate::store::{StateStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub verdict: Verdict,
    /// Set when this cycle produced a signal that was not emitted before.
    pub emitted: Option<SignalIdentity>,
}

#[derive(Debug, Error)]
pub enum CycleError {
    /// The verdict was computed but the new state could not be saved.
    #[error("failed to persist cycle state: {source}")]
    Persist {
        #[source]
        source: StoreError,
        outcome: Box<CycleOutcome>,
    },
}

/// Run one cycle against `store`.
///
/// State is loaded once and saved at most once, only if it changed.
pub fn run_cycle(
    evaluator: &Evaluator,
    store: &mut dyn StateStore,
    snapshot: &MarketSnapshot,
) -> Result<CycleOutcome, CycleError> {
    let before = store.load();
    let mut state = before;

    let verdict = evaluator.evaluate(snapshot, &mut state.detector);

    let mut ledger = SignalLedger::new(state.last_emitted);
    let emitted = ledger.admit(&verdict);
    if let Some(identity) = emitted {
        info!(%identity, fingerprint = %identity.fingerprint(), "new signal");
        ledger.record(identity);
    }
    state.last_emitted = ledger.last();

    let outcome = CycleOutcome { verdict, emitted };
    if state == before {
        debug!("state unchanged, skipping save");
        return Ok(outcome);
    }
    match store.save(&state) {
        Ok(()) => Ok(outcome),
        Err(source) => Err(CycleError::Persist {
            source,
            outcome: Box::new(outcome),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluatorConfig;
    use crate::domain::Direction;
    use crate::store::{MemoryStore, PersistedState};
    use crate::testing::ema_scenario;

    struct FailingStore;

    impl StateStore for FailingStore {
        fn load(&self) -> PersistedState {
            PersistedState::default()
        }

        fn save(&mut self, _state: &PersistedState) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "/read-only/state.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn waiting_snapshot() -> MarketSnapshot {
        MarketSnapshot::new().with(ema_scenario(Direction::Long, 11, 10, None))
    }

    #[test]
    fn unchanged_state_is_not_saved() {
        // Base data only: the standard battery's timeframes are missing.
        let evaluator = Evaluator::new(EvaluatorConfig::default());
        let mut store = MemoryStore::default();
        let outcome = run_cycle(&evaluator, &mut store, &waiting_snapshot()).unwrap();
        assert_eq!(outcome.emitted, None);
        assert_eq!(store.saves(), 0);
    }

    #[test]
    fn save_failure_still_returns_the_verdict() {
        let mut config = EvaluatorConfig::default();
        config.enabled.retain(|id| id.number() == 1);
        let evaluator = Evaluator::new(config);
        let err = run_cycle(&evaluator, &mut FailingStore, &waiting_snapshot()).unwrap_err();
        let CycleError::Persist { outcome, .. } = err;
        assert!(!outcome.verdict.ok);
        assert_eq!(outcome.verdict.summary.as_str(), "no_start");
    }
}
