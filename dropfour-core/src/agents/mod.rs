//! Built-in agents implementing [`Policy`](crate::policy::Policy)
//!
//! - `simple`: random, sticky-column and preferred-column baselines
//! - `heuristic`: positional weights, defensive blocking, hybrid scoring
//! - `ucb_table`: UCB1 selection with Monte-Carlo value updates
//! - `rollout_value`: short random rollouts with on-policy updates

pub mod heuristic;
pub mod rollout_value;
pub mod simple;
pub mod ucb_table;

pub use heuristic::{winning_columns, HeuristicMode, HeuristicPolicy, CELL_WEIGHTS, CENTER_ORDER};
pub use rollout_value::{RolloutValueConfig, RolloutValuePolicy};
pub use simple::{PreferredColumnPolicy, RandomPolicy, StickyColumnPolicy};
pub use ucb_table::{UcbTableConfig, UcbTablePolicy};
