//! Deferral ledger: budget accounting and snooze over the persisted record
//!
//! Every operation reads the persisted record, applies its change, and writes
//! the whole record back before returning. Nothing is cached between calls.

use chrono::{DateTime, Local};
use ddm_config::DeferralPolicy;
use ddm_store::{LedgerLoad, LedgerState, LedgerStore, StoreResult};
use std::cell::Cell;
use tracing::{debug, error, info, warn};

/// A deadline moving by more than this counts as a new deadline
pub const DEADLINE_CHANGE_THRESHOLD_SECS: i64 = 60;

/// What `on_deadline_observed` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineChange {
    /// No deadline was recorded before
    FirstSeen,
    Unchanged,
    /// Deadline moved; `reset` says whether the deferral count was zeroed
    Changed { reset: bool },
}

pub struct DeferralLedger<'a> {
    store: &'a dyn LedgerStore,
    policy: &'a DeferralPolicy,
    corruptions: Cell<u32>,
    quarantine: bool,
}

impl<'a> DeferralLedger<'a> {
    pub fn new(store: &'a dyn LedgerStore, policy: &'a DeferralPolicy) -> Self {
        Self {
            store,
            policy,
            corruptions: Cell::new(0),
            quarantine: true,
        }
    }

    /// Reads only. A damaged ledger still reads as empty but stays in place.
    pub fn read_only(store: &'a dyn LedgerStore, policy: &'a DeferralPolicy) -> Self {
        Self {
            quarantine: false,
            ..Self::new(store, policy)
        }
    }

    /// Times a damaged ledger was discarded by this instance
    pub fn corruption_count(&self) -> u32 {
        self.corruptions.get()
    }

    /// Current persisted state; missing or damaged ledgers read as empty
    pub fn state(&self) -> LedgerState {
        match self.store.load_ledger() {
            Ok(LedgerLoad::Loaded(state)) => state,
            Ok(LedgerLoad::Missing) => {
                debug!("No existing deferral ledger");
                LedgerState::default()
            }
            Ok(LedgerLoad::Corrupt { detail }) => {
                self.discard_damaged(&detail);
                LedgerState::default()
            }
            Err(e) => {
                self.discard_damaged(&e.to_string());
                LedgerState::default()
            }
        }
    }

    /// Fail open: a damaged ledger means "no deferrals used yet". The event is
    /// counted so the loss is visible in health, and the file is moved aside
    /// unless this ledger is read-only.
    fn discard_damaged(&self, detail: &str) {
        error!(detail, "Deferral ledger is damaged, starting from empty state");
        self.corruptions.set(self.corruptions.get() + 1);
        if !self.quarantine {
            return;
        }
        if let Err(e) = self.store.quarantine_ledger() {
            warn!(error = %e, "Failed to quarantine damaged ledger");
        }
    }

    fn persist(&self, state: &LedgerState) -> StoreResult<()> {
        self.store.save_ledger(state).inspect_err(|e| {
            error!(error = %e, "Failed to save deferral ledger");
        })
    }

    /// Record the deadline seen this invocation, resetting the count when it
    /// moved and policy says so. Must run before any budget query.
    pub fn on_deadline_observed(&self, deadline: DateTime<Local>) -> StoreResult<DeadlineChange> {
        let mut state = self.state();

        let change = match state.last_deadline {
            None => DeadlineChange::FirstSeen,
            Some(last) => {
                let moved = (deadline - last).num_seconds().abs();
                if moved > DEADLINE_CHANGE_THRESHOLD_SECS {
                    let reset = self.policy.reset_on_new_deadline;
                    if reset {
                        info!(
                            previous = %last,
                            current = %deadline,
                            discarded = state.deferral_count,
                            "Deadline changed, resetting deferral count"
                        );
                        state.deferral_count = 0;
                    } else {
                        info!(previous = %last, current = %deadline, "Deadline changed, keeping deferral count");
                    }
                    DeadlineChange::Changed { reset }
                } else {
                    DeadlineChange::Unchanged
                }
            }
        };

        state.last_deadline = Some(deadline);
        self.persist(&state)?;
        Ok(change)
    }

    pub fn max_allowed(&self, days_remaining: i64) -> u32 {
        self.policy.max_allowed(days_remaining)
    }

    pub fn deferrals_used(&self) -> u32 {
        self.state().deferral_count
    }

    pub fn remaining(&self, days_remaining: i64) -> u32 {
        self.max_allowed(days_remaining)
            .saturating_sub(self.deferrals_used())
    }

    pub fn can_defer(&self, days_remaining: i64) -> bool {
        self.remaining(days_remaining) > 0
    }

    /// Spend one deferral. Returns the new count.
    pub fn record_deferral(&self, now: DateTime<Local>) -> StoreResult<u32> {
        let mut state = self.state();
        state.deferral_count += 1;
        state.last_deferral_date = Some(now);
        self.persist(&state)?;
        info!(total = state.deferral_count, "Recorded deferral");
        Ok(state.deferral_count)
    }

    pub fn is_snooze_active(&self, now: DateTime<Local>) -> bool {
        self.state().snooze_until.is_some_and(|until| until > now)
    }

    /// Whole minutes until the snooze ends, 0 when none is active
    pub fn snooze_minutes_remaining(&self, now: DateTime<Local>) -> i64 {
        self.state()
            .snooze_until
            .map(|until| (until - now).num_minutes().max(0))
            .unwrap_or(0)
    }

    /// Suppress prompts for `minutes` without spending a deferral
    pub fn record_snooze(&self, minutes: u32, now: DateTime<Local>) -> StoreResult<DateTime<Local>> {
        let mut state = self.state();
        let until = now + chrono::Duration::minutes(i64::from(minutes));
        state.snooze_until = Some(until);
        self.persist(&state)?;
        info!(minutes, until = %until, "Snoozed");
        Ok(until)
    }

    pub fn clear_snooze(&self) -> StoreResult<()> {
        let mut state = self.state();
        state.snooze_until = None;
        self.persist(&state)?;
        info!("Cleared snooze");
        Ok(())
    }

    /// Zero every field
    pub fn reset(&self) -> StoreResult<()> {
        self.persist(&LedgerState::default())?;
        info!("Reset deferral ledger");
        Ok(())
    }
}
