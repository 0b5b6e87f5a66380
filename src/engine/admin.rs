// 8.7: administrative surface. every entry point takes the caller's account
// and checks it against the capability table before any other validation.
// these remain callable while halted (resume and breaker resets have to be),
// but still respect the operation latch.

use super::config::ProtocolConfig;
use super::core::Ledger;
use super::results::LedgerError;
use crate::asset::Asset;
use crate::auth::Role;
use crate::events::{
    AssetListedEvent, AssetUpdatedEvent, CircuitBreakerResetEvent, CircuitBreakerTrippedEvent,
    EventPayload, OracleConfigUpdatedEvent, PausedSetEvent, ProtocolConfigUpdatedEvent,
};
use crate::oracle::{GlobalOracleConfig, PriceRound};
use crate::types::{AccountId, AssetId, SourceId};

impl Ledger {
    pub fn grant_role(
        &mut self,
        caller: AccountId,
        actor: AccountId,
        role: Role,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.acl.require(caller, Role::Manager).map_err(Into::into);
        if result.is_ok() {
            self.acl.grant(actor, role);
        }
        self.end_op();
        result
    }

    pub fn revoke_role(
        &mut self,
        caller: AccountId,
        actor: AccountId,
        role: Role,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.acl.require(caller, Role::Manager).map_err(Into::into);
        if result.is_ok() {
            self.acl.revoke(actor, role);
        }
        self.end_op();
        result
    }

    pub fn list_asset(&mut self, caller: AccountId, asset: Asset) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.list_asset_inner(caller, asset);
        self.end_op();
        result
    }

    fn list_asset_inner(&mut self, caller: AccountId, asset: Asset) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        let event = AssetListedEvent {
            asset_id: asset.id,
            symbol: asset.symbol.clone(),
            tier: asset.tier,
        };
        self.assets.list(asset)?;
        self.emit_event(EventPayload::AssetListed(event));
        Ok(())
    }

    pub fn update_asset(&mut self, caller: AccountId, asset: Asset) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.update_asset_inner(caller, asset);
        self.end_op();
        result
    }

    fn update_asset_inner(&mut self, caller: AccountId, asset: Asset) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        let event = AssetUpdatedEvent {
            asset_id: asset.id,
            active: asset.active,
        };
        self.assets.update(asset)?;
        self.emit_event(EventPayload::AssetUpdated(event));
        Ok(())
    }

    pub fn deactivate_asset(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.deactivate_asset_inner(caller, asset_id);
        self.end_op();
        result
    }

    fn deactivate_asset_inner(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
    ) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        self.assets.deactivate(asset_id)?;
        self.emit_event(EventPayload::AssetUpdated(AssetUpdatedEvent {
            asset_id,
            active: false,
        }));
        Ok(())
    }

    pub fn update_oracle_config(
        &mut self,
        caller: AccountId,
        config: GlobalOracleConfig,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.update_oracle_config_inner(caller, config);
        self.end_op();
        result
    }

    fn update_oracle_config_inner(
        &mut self,
        caller: AccountId,
        config: GlobalOracleConfig,
    ) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        self.oracle.set_config(config)?;
        self.emit_event(EventPayload::OracleConfigUpdated(OracleConfigUpdatedEvent));
        Ok(())
    }

    /// Replace the economic parameters. The version is bumped by the ledger;
    /// whatever the caller put in the incoming record is ignored.
    pub fn update_protocol_config(
        &mut self,
        caller: AccountId,
        config: ProtocolConfig,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.update_protocol_config_inner(caller, config);
        self.end_op();
        result
    }

    fn update_protocol_config_inner(
        &mut self,
        caller: AccountId,
        mut config: ProtocolConfig,
    ) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        config
            .validate()
            .map_err(|reason| LedgerError::ConfigOutOfBounds { reason })?;
        config.version = self.protocol.version + 1;
        let version = config.version;
        self.protocol = config;
        self.emit_event(EventPayload::ProtocolConfigUpdated(
            ProtocolConfigUpdatedEvent { version },
        ));
        Ok(())
    }

    pub fn set_paused(&mut self, caller: AccountId, paused: bool) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.acl.require(caller, Role::Guardian).map_err(Into::into);
        if result.is_ok() {
            self.paused = paused;
            self.emit_event(EventPayload::PausedSet(PausedSetEvent { paused }));
        }
        self.end_op();
        result
    }

    /// Forcibly engage an asset's circuit breaker; all price reads for the
    /// asset fail until reset.
    pub fn trip_breaker(&mut self, caller: AccountId, asset_id: AssetId) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.trip_breaker_inner(caller, asset_id);
        self.end_op();
        result
    }

    fn trip_breaker_inner(&mut self, caller: AccountId, asset_id: AssetId) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        self.assets.get(asset_id)?;
        self.oracle.trip_breaker(asset_id);
        self.emit_event(EventPayload::CircuitBreakerTripped(
            CircuitBreakerTrippedEvent { asset_id },
        ));
        Ok(())
    }

    /// Clear the breaker flag without altering the last valid price.
    pub fn reset_breaker(&mut self, caller: AccountId, asset_id: AssetId) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.reset_breaker_inner(caller, asset_id);
        self.end_op();
        result
    }

    fn reset_breaker_inner(&mut self, caller: AccountId, asset_id: AssetId) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Manager)?;
        self.assets.get(asset_id)?;
        self.oracle.reset_breaker(asset_id);
        self.emit_event(EventPayload::CircuitBreakerReset(CircuitBreakerResetEvent {
            asset_id,
        }));
        Ok(())
    }

    /// External feed entry point: record a reported round for one of an
    /// asset's configured sources.
    pub fn submit_round(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
        source: SourceId,
        round: PriceRound,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.submit_round_inner(caller, asset_id, source, round);
        self.end_op();
        result
    }

    fn submit_round_inner(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
        source: SourceId,
        round: PriceRound,
    ) -> Result<(), LedgerError> {
        self.acl.require(caller, Role::Protocol)?;
        let asset = self.assets.get(asset_id)?;
        if !asset.sources.iter().any(|s| s.id == source) {
            return Err(LedgerError::UnknownSource {
                asset: asset_id,
                source_id: source,
            });
        }
        self.oracle.submit_round(asset_id, source, round);
        Ok(())
    }

    /// External governance-token feed: record an account's balance for
    /// liquidator eligibility checks.
    pub fn set_governance_balance(
        &mut self,
        caller: AccountId,
        account: AccountId,
        balance: u128,
    ) -> Result<(), LedgerError> {
        self.begin_admin_op()?;
        let result = self.acl.require(caller, Role::Protocol).map_err(Into::into);
        if result.is_ok() {
            self.gov_balances.insert(account, balance);
        }
        self.end_op();
        result
    }
}
