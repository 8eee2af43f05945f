pub use commands::{ExpenseFilter, ExpenseMeta, NewExpenseCmd, SettleCmd};
pub use error::EngineError;
pub use expenses::Expense;
pub use itemized::ItemizedAllocation;
pub use items::ExpenseItem;
pub use money::Money;
pub use netting::{BalanceDirection, BalanceSummary, FriendBalance, GroupBalance};
pub use ops::{Engine, EngineBuilder};
pub use participants::ExpenseParticipant;
pub use payers::Payer;
pub use reconcile::{ClientShare, Mismatch, Reconciliation, SplitSource};
pub use settlement::{SettleAmount, SettleOutcome, SettlementStatus};
pub use split::{
    ExactInput, LooseParticipant, LooseSplitExtras, OweSide, PercentInput, SharesInput,
    SplitMethod, SplitRule, SplitShare,
};

mod commands;
mod error;
mod expenses;
pub mod itemized;
mod items;
pub mod money;
pub mod netting;
mod ops;
mod participants;
mod payers;
pub mod reconcile;
mod settlement;
pub mod split;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
