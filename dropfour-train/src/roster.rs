//! Participant roster and policy factories
//!
//! A roster is a list of named participants, each described by a
//! [`PolicySpec`]. Jobs build fresh policy instances from it, so nothing
//! built here is ever shared between workers.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use dropfour_core::agents::{
    HeuristicMode, HeuristicPolicy, PreferredColumnPolicy, RandomPolicy, RolloutValueConfig,
    RolloutValuePolicy, StickyColumnPolicy, UcbTableConfig, UcbTablePolicy,
};
use dropfour_core::{Column, ConfigError, Perspective, Policy, ValueTable};
use dropfour_mcts::{MctsConfig, MctsPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{RosterParse, TrainError};

fn default_preferred() -> Column {
    3
}

/// Which agent a participant plays with, and its hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySpec {
    Random,
    Sticky,
    Preferred {
        #[serde(default = "default_preferred")]
        column: Column,
    },
    Heuristic {
        #[serde(default)]
        mode: HeuristicMode,
    },
    UcbTable {
        #[serde(default)]
        config: UcbTableConfig,
    },
    RolloutValue {
        #[serde(default)]
        config: RolloutValueConfig,
    },
    Mcts {
        #[serde(default)]
        config: MctsConfig,
    },
}

impl PolicySpec {
    /// Policies that keep a value table worth merging and persisting
    pub fn learns(&self) -> bool {
        matches!(self, PolicySpec::UcbTable { .. } | PolicySpec::RolloutValue { .. })
    }

    /// Hyperparameters every built policy can act on without panicking
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PolicySpec::UcbTable { config } => config.validate(),
            PolicySpec::RolloutValue { config } => config.validate(),
            _ => Ok(()),
        }
    }

    /// Fresh instance. `table` seeds learning policies and is ignored by the rest.
    pub fn build(&self, seed: u64, table: ValueTable) -> Box<dyn Policy> {
        match self {
            PolicySpec::Random => Box::new(RandomPolicy::new(seed)),
            PolicySpec::Sticky => Box::new(StickyColumnPolicy::new(seed)),
            PolicySpec::Preferred { column } => Box::new(PreferredColumnPolicy::new(*column)),
            PolicySpec::Heuristic { mode } => Box::new(HeuristicPolicy::new(*mode, seed)),
            PolicySpec::UcbTable { config } => Box::new(UcbTablePolicy::new(*config, table, seed)),
            PolicySpec::RolloutValue { config } => {
                Box::new(RolloutValuePolicy::new(*config, table, seed))
            }
            PolicySpec::Mcts { config } => Box::new(MctsPolicy::new(config.clone(), seed)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub policy: PolicySpec,
    /// Value table file; learning participants without one fall back to
    /// `<tables_dir>/<name>.json` when a tables directory is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,
}

impl Participant {
    pub fn new(name: impl Into<String>, policy: PolicySpec) -> Self {
        Self { name: name.into(), policy, table: None }
    }

    pub fn with_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.table = Some(path.into());
        self
    }

    /// Where this participant's table lives, if anywhere
    pub fn table_path(&self, tables_dir: Option<&Path>) -> Option<PathBuf> {
        if !self.policy.learns() {
            return None;
        }
        self.table
            .clone()
            .or_else(|| tables_dir.map(|dir| dir.join(format!("{}.json", self.name))))
    }
}

/// Ordered list of uniquely named participants
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    /// Validated roster: non-empty, names unique, hyperparameters in range
    pub fn new(participants: Vec<Participant>) -> Result<Self, TrainError> {
        if participants.is_empty() {
            return Err(TrainError::NoParticipants);
        }
        let mut seen = HashSet::new();
        for p in &participants {
            if !seen.insert(p.name.as_str()) {
                return Err(TrainError::DuplicateParticipant { name: p.name.clone() });
            }
            p.policy
                .validate()
                .map_err(|source| TrainError::InvalidPolicy { name: p.name.clone(), source })?;
        }
        Ok(Self { participants })
    }

    /// Built-in line-up: one participant per built-in agent
    pub fn builtin() -> Self {
        let participants = vec![
            Participant::new("sticky", PolicySpec::Sticky),
            Participant::new("ucb-count", PolicySpec::UcbTable { config: UcbTableConfig::default() }),
            Participant::new(
                "ucb-seat",
                PolicySpec::UcbTable {
                    config: UcbTableConfig::default().with_perspective(Perspective::Seat),
                },
            ),
            Participant::new("rollout", PolicySpec::RolloutValue { config: RolloutValueConfig::default() }),
            Participant::new("random", PolicySpec::Random),
            Participant::new("defensive", PolicySpec::Heuristic { mode: HeuristicMode::Defensive }),
            Participant::new("hybrid", PolicySpec::Heuristic { mode: HeuristicMode::Hybrid }),
            Participant::new("positional", PolicySpec::Heuristic { mode: HeuristicMode::Positional }),
            Participant::new(
                "mcts",
                PolicySpec::Mcts { config: MctsConfig::default().with_simulations(200) },
            ),
        ];
        Self { participants }
    }

    /// Roster from a JSON array of `{name, policy, table?}` objects
    pub fn from_file(path: &Path) -> Result<Self, TrainError> {
        let text = fs::read_to_string(path)
            .map_err(|source| TrainError::RosterIo { path: path.to_path_buf(), source })?;
        Self::from_json(&text).map_err(|e| match e {
            RosterParse::Format(source) => TrainError::RosterFormat { path: path.to_path_buf(), source },
            RosterParse::Invalid(e) => e,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, RosterParse> {
        let participants: Vec<Participant> = serde_json::from_str(text)?;
        Ok(Self::new(participants)?)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name.as_str()).collect()
    }

    /// Keep only the named participants, in roster order
    pub fn select(&self, names: &[String]) -> Result<Self, TrainError> {
        let picked = self
            .participants
            .iter()
            .filter(|p| names.iter().any(|n| *n == p.name))
            .cloned()
            .collect();
        Self::new(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropfour_core::Board;

    #[test]
    fn test_builtin_roster_is_valid() {
        let roster = Roster::builtin();
        assert_eq!(roster.len(), 9);
        assert!(Roster::new(roster.iter().cloned().collect()).is_ok());
        assert!(roster.get("mcts").is_some());
    }

    #[test]
    fn test_every_builtin_policy_plays_a_legal_column() {
        let board = Board::new();
        for (i, p) in Roster::builtin().iter().enumerate() {
            let mut policy = p.policy.build(i as u64, ValueTable::new());
            policy.mount(None);
            assert!(board.is_column_open(policy.act(&board)), "{}", p.name);
        }
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(Roster::new(Vec::new()), Err(TrainError::NoParticipants)));
        assert!(matches!(Roster::from_json("[]"), Err(RosterParse::Invalid(TrainError::NoParticipants))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Roster::new(vec![
            Participant::new("a", PolicySpec::Random),
            Participant::new("a", PolicySpec::Sticky),
        ]);
        assert!(matches!(result, Err(TrainError::DuplicateParticipant { .. })));
    }

    #[test]
    fn test_roster_json_with_defaults() {
        let text = r#"[
            {"name": "p", "policy": {"kind": "preferred"}},
            {"name": "q", "policy": {"kind": "ucb_table", "config": {"alpha": 0.5}}, "table": "q.json"},
            {"name": "h", "policy": {"kind": "heuristic", "mode": "defensive"}}
        ]"#;
        let roster = Roster::from_json(text).unwrap();
        assert_eq!(roster.get("p").unwrap().policy, PolicySpec::Preferred { column: 3 });
        match &roster.get("q").unwrap().policy {
            PolicySpec::UcbTable { config } => {
                assert_eq!(config.alpha, 0.5);
                assert_eq!(config.exploration_constant, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(roster.get("q").unwrap().table, Some(PathBuf::from("q.json")));
    }

    #[test]
    fn test_out_of_range_exploration_rate_rejected() {
        let text = r#"[
            {"name": "ucb", "policy": {"kind": "ucb_table", "config": {"exploration_rate": 1.5}}},
            {"name": "random", "policy": {"kind": "random"}}
        ]"#;
        match Roster::from_json(text) {
            Err(RosterParse::Invalid(TrainError::InvalidPolicy { name, source })) => {
                assert_eq!(name, "ucb");
                assert!(matches!(source, ConfigError::Probability { field: "exploration_rate", .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_step_size_rejected() {
        let result = Roster::new(vec![
            Participant::new("opi", PolicySpec::RolloutValue {
                config: RolloutValueConfig { alpha: 0.0, ..Default::default() },
            }),
        ]);
        assert!(matches!(result, Err(TrainError::InvalidPolicy { .. })));
    }

    #[test]
    fn test_malformed_roster_is_a_format_error() {
        assert!(matches!(Roster::from_json("{"), Err(RosterParse::Format(_))));
    }

    #[test]
    fn test_table_path_only_for_learners() {
        let dir = Path::new("tables");
        let learner = Participant::new("ucb", PolicySpec::UcbTable { config: UcbTableConfig::default() });
        let fixed = Participant::new("rand", PolicySpec::Random);
        assert_eq!(learner.table_path(Some(dir)), Some(dir.join("ucb.json")));
        assert_eq!(learner.table_path(None), None);
        assert_eq!(fixed.table_path(Some(dir)), None);

        let explicit = learner.with_table("elsewhere.json");
        assert_eq!(explicit.table_path(Some(dir)), Some(PathBuf::from("elsewhere.json")));
    }

    #[test]
    fn test_select_keeps_roster_order() {
        let roster = Roster::builtin();
        let picked = roster.select(&["random".to_string(), "sticky".to_string()]).unwrap();
        assert_eq!(picked.names(), vec!["sticky", "random"]);
        assert!(roster.select(&["nobody".to_string()]).is_err());
    }
}
