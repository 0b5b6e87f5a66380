// 8.1: the ledger aggregate. all state lives here, behind the operation API;
// nothing outside this module mutates a field directly, so the §3 invariants
// can be checked at every exit point. operations are applied one at a time in
// host order; the reentrancy latch rejects any attempt to re-enter while a
// mutation is partially applied.

use super::config::{LedgerConfig, ProtocolConfig};
use super::liquidity::LiquidityAccount;
use super::results::LedgerError;
use crate::asset::{Asset, AssetRegistry};
use crate::auth::Acl;
use crate::events::{Event, EventId, EventPayload};
use crate::oracle::OracleEngine;
use crate::position::Position;
use crate::types::{AccountId, AssetId, PositionId, Timestamp};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ceiling on positions per owner. Position ids index into the owner's list,
/// so the list only ever grows.
pub const MAX_POSITIONS_PER_OWNER: usize = 1_000;

/// Aggregate totals maintained alongside per-position state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Outstanding borrowed principal plus folded interest, WAD stable units.
    pub total_borrow: u128,
    /// Liquidity base supplied by providers.
    pub total_supplied_liquidity: u128,
    /// Cumulative interest folded into borrower debt.
    pub borrower_interest_accrued: u128,
    /// Cumulative value paid out to providers above their base.
    pub supplier_interest_accrued: u128,
    /// Cumulative flash-loan fees collected.
    pub flash_fees_accrued: u128,
}

#[derive(Debug)]
pub struct Ledger {
    pub(super) config: LedgerConfig,
    pub(super) protocol: ProtocolConfig,
    pub(super) assets: AssetRegistry,
    pub(super) oracle: OracleEngine,
    pub(super) positions: HashMap<AccountId, Vec<Position>>,
    pub(super) providers: HashMap<AccountId, LiquidityAccount>,
    pub(super) gov_balances: HashMap<AccountId, u128>,
    pub(super) acl: Acl,
    pub(super) totals: LedgerTotals,
    /// Reference stable units the protocol currently holds.
    pub(super) stable_balance: u128,
    pub(super) paused: bool,
    pub(super) op_in_progress: bool,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl Ledger {
    pub fn new(config: LedgerConfig, admin: AccountId) -> Self {
        Self {
            config,
            protocol: ProtocolConfig::default(),
            assets: AssetRegistry::default(),
            oracle: OracleEngine::default(),
            positions: HashMap::new(),
            providers: HashMap::new(),
            gov_balances: HashMap::new(),
            acl: Acl::with_admin(admin),
            totals: LedgerTotals::default(),
            stable_balance: 0,
            paused: false,
            op_in_progress: false,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_secs(0),
        }
    }

    // -- clock, host-driven --

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = Timestamp::from_secs(self.current_time.as_secs() + secs);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    // -- operation latch --

    /// Entry gate for caller-initiated mutating operations: rejects while a
    /// mutation is in flight or the protocol is halted.
    pub(super) fn begin_op(&mut self) -> Result<(), LedgerError> {
        if self.op_in_progress {
            return Err(LedgerError::ReentrantCall);
        }
        if self.paused {
            return Err(LedgerError::ProtocolPaused);
        }
        self.op_in_progress = true;
        Ok(())
    }

    /// Entry gate for administrative operations. These must remain callable
    /// while halted (resume, breaker reset), so only the latch is checked.
    pub(super) fn begin_admin_op(&mut self) -> Result<(), LedgerError> {
        if self.op_in_progress {
            return Err(LedgerError::ReentrantCall);
        }
        self.op_in_progress = true;
        Ok(())
    }

    pub(super) fn end_op(&mut self) {
        self.op_in_progress = false;
    }

    // -- events --

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!("[event {}] {:?}", event.id.0, event.payload);

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    // -- accessors --

    pub fn totals(&self) -> &LedgerTotals {
        &self.totals
    }

    pub fn stable_balance(&self) -> u128 {
        self.stable_balance
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn protocol_config(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn asset(&self, id: AssetId) -> Result<&Asset, LedgerError> {
        Ok(self.assets.get(id)?)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn oracle(&self) -> &OracleEngine {
        &self.oracle
    }

    pub fn positions_of(&self, owner: AccountId) -> &[Position] {
        self.positions.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position(
        &self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<&Position, LedgerError> {
        self.positions
            .get(&owner)
            .and_then(|list| list.get(position_id.0 as usize))
            .ok_or(LedgerError::PositionNotFound { owner, position_id })
    }

    pub(super) fn position_mut(
        &mut self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<&mut Position, LedgerError> {
        self.positions
            .get_mut(&owner)
            .and_then(|list| list.get_mut(position_id.0 as usize))
            .ok_or(LedgerError::PositionNotFound { owner, position_id })
    }

    /// Active-position lookup used by every lifecycle operation.
    pub(super) fn active_position(
        &self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<&Position, LedgerError> {
        let position = self.position(owner, position_id)?;
        if !position.is_active() {
            return Err(LedgerError::PositionNotActive { owner, position_id });
        }
        Ok(position)
    }

    pub fn provider(&self, account: AccountId) -> Option<&LiquidityAccount> {
        self.providers.get(&account)
    }

    pub fn gov_balance(&self, account: AccountId) -> u128 {
        self.gov_balances.get(&account).copied().unwrap_or(0)
    }
}
