/// Bet Ledger store
///
/// Embedded implementation of the backend contract the dashboard consumes:
///
/// - `insert_bet` / `update_bet` / `update_bet_result` / `delete_bet`
/// - paged, filtered listing of an owner's bets
///
/// Records live in a sled tree keyed by bet id, JSON encoded. The store
/// owns `entry_amount` and `profit_loss`: both are recomputed on every
/// write, the client never sets them.

use chrono::{FixedOffset, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Bet, BetResult, UserSettings};
use crate::query::{BetQuery, Page};
use crate::stake::{amount_from_units, round_amount};
use crate::transitions::{LedgerCommand, ResultUpdate};
use crate::validation::ValidBet;

pub const BETS_TREE: &str = "bets";

/// Currency outcome of a bet, or `None` if it does not fit a `Decimal`.
///
/// - green:   entry * (odd - 1)
/// - red:     -entry
/// - cashout: gross return - entry
/// - pending, refund: 0
pub fn profit_loss(
    result: BetResult,
    entry_amount: Decimal,
    odd: Decimal,
    cashout_return_gross: Option<Decimal>,
) -> Option<Decimal> {
    let raw = match result {
        BetResult::Pending | BetResult::Refund => Decimal::ZERO,
        BetResult::Green => entry_amount.checked_mul(odd.checked_sub(Decimal::ONE)?)?,
        BetResult::Red => -entry_amount,
        BetResult::Cashout => cashout_return_gross.unwrap_or(Decimal::ZERO).checked_sub(entry_amount)?,
    };
    Some(round_amount(raw))
}

#[derive(Clone)]
pub struct LedgerStore {
    db: sled::Db,
    bets: sled::Tree,
}

impl LedgerStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            db: db.clone(),
            bets: db.open_tree(BETS_TREE)?,
        })
    }

    fn read(&self, id: Uuid) -> Result<Option<Bet>, StoreError> {
        match self.bets.get(id.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn write(&self, bet: &Bet) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(bet)?;
        self.bets.insert(bet.id.as_bytes(), raw)?;
        Ok(())
    }

    fn recompute(bet: &mut Bet) -> Result<(), StoreError> {
        bet.profit_loss = profit_loss(bet.result, bet.entry_amount, bet.odd, bet.cashout_return_gross)
            .ok_or(StoreError::AmountOverflow(bet.id))?;
        Ok(())
    }

    /// Fetches a bet of `owner`. Bets of other owners are reported as missing.
    pub fn get_bet(&self, owner: &str, id: Uuid) -> Result<Bet, StoreError> {
        match self.read(id)? {
            Some(bet) if bet.owner_id == owner => Ok(bet),
            _ => Err(StoreError::BetNotFound(id)),
        }
    }

    /// Records a new bet. `entry_amount` is derived from the stake in
    /// `settings` at this moment.
    pub fn insert_bet(&self, owner: &str, valid: ValidBet, settings: &UserSettings) -> Result<Bet, StoreError> {
        let now = Utc::now();
        let mut bet = Bet {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            house: valid.house,
            title: valid.title,
            market: valid.market,
            event_at: valid.event_at,
            odd: valid.odd,
            units: valid.units,
            entry_amount: amount_from_units(valid.units, settings.stake_value),
            result: valid.result.unwrap_or_default(),
            cashout_return_gross: None,
            profit_loss: Decimal::ZERO,
            seq: self.db.generate_id()?,
            created_at: now,
            updated_at: now,
        };
        Self::recompute(&mut bet)?;
        self.write(&bet)?;

        tracing::info!(bet_id = %bet.id, owner, result = %bet.result, "bet inserted");
        Ok(bet)
    }

    /// Edits the descriptive fields of a bet and re-derives its amounts.
    /// The result is left alone; it only moves through `update_bet_result`.
    pub fn update_bet(
        &self,
        owner: &str,
        id: Uuid,
        valid: ValidBet,
        settings: &UserSettings,
    ) -> Result<Bet, StoreError> {
        let mut bet = self.get_bet(owner, id)?;
        bet.house = valid.house;
        bet.title = valid.title;
        bet.market = valid.market;
        bet.event_at = valid.event_at;
        bet.odd = valid.odd;
        bet.units = valid.units;
        bet.entry_amount = amount_from_units(valid.units, settings.stake_value);
        bet.updated_at = Utc::now();
        Self::recompute(&mut bet)?;
        self.write(&bet)?;

        tracing::info!(bet_id = %id, owner, "bet updated");
        Ok(bet)
    }

    pub fn update_bet_result(&self, owner: &str, update: &ResultUpdate) -> Result<Bet, StoreError> {
        let mut bet = self.get_bet(owner, update.bet_id)?;
        let from = bet.result;
        bet.result = update.result;
        bet.cashout_return_gross = match update.result {
            BetResult::Cashout => update.cashout_return_gross,
            _ => None,
        };
        bet.updated_at = Utc::now();
        Self::recompute(&mut bet)?;
        self.write(&bet)?;

        tracing::info!(
            bet_id = %bet.id,
            owner,
            from = %from,
            to = %bet.result,
            profit_loss = %bet.profit_loss,
            "bet result updated"
        );
        Ok(bet)
    }

    /// Removes a bet for good. A missing id is an error.
    pub fn delete_bet(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        self.get_bet(owner, id)?;
        self.bets.remove(id.as_bytes())?;
        tracing::info!(bet_id = %id, owner, "bet deleted");
        Ok(())
    }

    /// Runs a confirmed command. Returns the updated bet, or `None` after a
    /// delete.
    pub fn execute(&self, owner: &str, command: &LedgerCommand) -> Result<Option<Bet>, StoreError> {
        match command {
            LedgerCommand::UpdateResult(update) => self.update_bet_result(owner, update).map(Some),
            LedgerCommand::Delete { bet_id } => self.delete_bet(owner, *bet_id).map(|_| None),
        }
    }

    /// Every bet of `owner`, in storage order.
    pub fn owner_bets(&self, owner: &str) -> Result<Vec<Bet>, StoreError> {
        let mut bets = Vec::new();
        for entry in self.bets.iter() {
            let (_, raw) = entry?;
            let bet: Bet = serde_json::from_slice(&raw)?;
            if bet.owner_id == owner {
                bets.push(bet);
            }
        }
        Ok(bets)
    }

    pub fn list_bets(&self, owner: &str, query: &BetQuery, tz: &FixedOffset) -> Result<Page<Bet>, StoreError> {
        Ok(query.apply(self.owner_bets(owner)?, tz))
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }
}
