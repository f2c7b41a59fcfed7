// ============================================================================
// Result Transitions
// ============================================================================
//
// A bet starts as `pending` and moves to exactly one of the terminal results.
// A terminal result can only be reverted to `pending`; moving between two
// terminal results always goes through `pending` first.
//
//   pending -> green | red | refund | cashout
//   green | red | refund | cashout -> pending
//
// Moving to `cashout` carries the gross amount returned. Deletion is not part
// of the table: it is available from every state.
//
// Every mutating action goes through a confirmation step before it becomes a
// `LedgerCommand` the store can execute.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::BetResult;
use crate::stake::{round_amount, NumericInput};

/// Extra data a transition needs besides the target result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    None,
    CashoutGross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub to: BetResult,
    pub payload: PayloadShape,
}

const FROM_PENDING: [Transition; 4] = [
    Transition { to: BetResult::Green, payload: PayloadShape::None },
    Transition { to: BetResult::Red, payload: PayloadShape::None },
    Transition { to: BetResult::Refund, payload: PayloadShape::None },
    Transition { to: BetResult::Cashout, payload: PayloadShape::CashoutGross },
];

const REVERT: [Transition; 1] = [Transition { to: BetResult::Pending, payload: PayloadShape::None }];

/// The transition table.
pub fn allowed_transitions(from: BetResult) -> &'static [Transition] {
    match from {
        BetResult::Pending => &FROM_PENDING,
        BetResult::Green | BetResult::Red | BetResult::Refund | BetResult::Cashout => &REVERT,
    }
}

pub fn find_transition(from: BetResult, to: BetResult) -> Option<&'static Transition> {
    allowed_transitions(from).iter().find(|t| t.to == to)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("bet is already {0}")]
    Unchanged(BetResult),

    #[error("cannot move a bet from {from} to {to}; revert it to pending first")]
    NotAllowed { from: BetResult, to: BetResult },

    #[error("cashout requires the gross amount returned")]
    MissingCashoutValue,

    #[error("cashout gross return must be a number >= 0")]
    InvalidCashoutValue,

    #[error("action must be confirmed before it is submitted")]
    NotConfirmed,

    #[error("editing a bet cannot change its result from {from} to {to}; use POST /bets/:id/result")]
    ChangedByEdit { from: BetResult, to: BetResult },
}

// ===== ACTIONS =====

/// Something the user can do to a bet from its action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionIntent {
    SetResult { result: BetResult },
    Delete,
}

impl ActionIntent {
    pub fn label(&self) -> String {
        match self {
            ActionIntent::SetResult { result: BetResult::Pending } => "Revert to Pending".to_string(),
            ActionIntent::SetResult { result } => {
                let name = result.as_str();
                let mut chars = name.chars();
                let capitalized = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                };
                format!("Mark as {}", capitalized)
            }
            ActionIntent::Delete => "Delete bet".to_string(),
        }
    }

    pub fn requires_cashout_value(&self) -> bool {
        matches!(self, ActionIntent::SetResult { result: BetResult::Cashout })
    }
}

/// Menu entry rendered for a bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOption {
    #[serde(flatten)]
    pub intent: ActionIntent,
    pub label: String,
    pub requires_cashout_value: bool,
}

/// Actions offered for a bet in `current` state: the table's edges plus delete.
pub fn available_actions(current: BetResult) -> Vec<ActionOption> {
    allowed_transitions(current)
        .iter()
        .map(|t| ActionIntent::SetResult { result: t.to })
        .chain(std::iter::once(ActionIntent::Delete))
        .map(|intent| ActionOption {
            label: intent.label(),
            requires_cashout_value: intent.requires_cashout_value(),
            intent,
        })
        .collect()
}

// ===== PAYLOADS =====

/// Payload of an `update_bet_result` call. `cashout_return_gross` is set
/// if and only if `result` is `Cashout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultUpdate {
    pub bet_id: Uuid,
    pub result: BetResult,
    pub cashout_return_gross: Option<Decimal>,
}

/// Validates a move against the table and packages the payload.
///
/// A gross value sent along with a non-cashout target is dropped.
pub fn plan_transition(
    bet_id: Uuid,
    from: BetResult,
    to: BetResult,
    cashout_input: Option<&NumericInput>,
) -> Result<ResultUpdate, TransitionError> {
    if from == to {
        return Err(TransitionError::Unchanged(from));
    }

    let transition = find_transition(from, to).ok_or(TransitionError::NotAllowed { from, to })?;

    let cashout_return_gross = match transition.payload {
        PayloadShape::None => None,
        PayloadShape::CashoutGross => {
            let input = cashout_input.ok_or(TransitionError::MissingCashoutValue)?;
            let gross = input.to_decimal().ok_or(TransitionError::InvalidCashoutValue)?;
            if gross < Decimal::ZERO {
                return Err(TransitionError::InvalidCashoutValue);
            }
            Some(round_amount(gross))
        }
    };

    Ok(ResultUpdate { bet_id, result: to, cashout_return_gross })
}

// ===== CONFIRMATION =====

/// A confirmed action, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    UpdateResult(ResultUpdate),
    Delete { bet_id: Uuid },
}

/// An action the user picked but has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    bet_id: Uuid,
    current: BetResult,
    intent: ActionIntent,
}

impl PendingConfirmation {
    /// Fails early when the picked result is not reachable from `current`.
    pub fn new(bet_id: Uuid, current: BetResult, intent: ActionIntent) -> Result<Self, TransitionError> {
        if let ActionIntent::SetResult { result } = intent {
            if result == current {
                return Err(TransitionError::Unchanged(current));
            }
            if find_transition(current, result).is_none() {
                return Err(TransitionError::NotAllowed { from: current, to: result });
            }
        }
        Ok(Self { bet_id, current, intent })
    }

    pub fn intent(&self) -> ActionIntent {
        self.intent
    }

    pub fn label(&self) -> String {
        self.intent.label()
    }

    pub fn requires_cashout_value(&self) -> bool {
        self.intent.requires_cashout_value()
    }

    /// Turns the user's answer into a command. Nothing is produced unless
    /// `confirmed` is true; a cashout also needs its gross value here.
    pub fn resolve(
        self,
        confirmed: bool,
        cashout_input: Option<&NumericInput>,
    ) -> Result<LedgerCommand, TransitionError> {
        if !confirmed {
            return Err(TransitionError::NotConfirmed);
        }
        match self.intent {
            ActionIntent::Delete => Ok(LedgerCommand::Delete { bet_id: self.bet_id }),
            ActionIntent::SetResult { result } => {
                plan_transition(self.bet_id, self.current, result, cashout_input)
                    .map(LedgerCommand::UpdateResult)
            }
        }
    }
}
