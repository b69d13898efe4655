//! MCTS Tree structure and node management
//!
//! Uses arena allocation for efficient tree operations.
//!
//! ## Architecture
//! - Level 2: Tree operations (select_leaf, expand, backpropagate)
//! - Level 3: UCB1 calculation, node accessors
//! - Level 4: Statistics, utilities

use dropfour_core::{Column, GameState, Player};

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Statistics for a tree node
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    /// Number of times this node was visited
    pub visits: u32,
    /// Sum of rewards from the perspective of the player who moved TO this node
    pub total_reward: f64,
}

impl NodeStats {
    /// Mean reward in [-1, 1]; 0 before the first visit
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_reward / self.visits as f64
        }
    }
}

/// A node in the MCTS tree
#[derive(Clone, Debug)]
pub struct MctsNode {
    /// Game state at this node
    pub state: GameState,
    /// Parent node (None for root)
    pub parent: Option<NodeId>,
    /// Column that led to this node (None for root)
    pub incoming_move: Option<Column>,
    /// Children: (column, node_id) pairs
    pub children: Vec<(Column, NodeId)>,
    /// Columns not yet expanded; popped from the back
    pub untried_moves: Vec<Column>,
    pub stats: NodeStats,
}

impl MctsNode {
    pub fn new(state: GameState, parent: Option<NodeId>, incoming_move: Option<Column>) -> Self {
        // Highest column first in the vector so pops expand 0, 1, 2, ...
        let mut untried_moves = state.legal_moves();
        untried_moves.reverse();

        Self {
            state,
            parent,
            incoming_move,
            children: Vec::new(),
            untried_moves,
            stats: NodeStats::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.untried_moves.is_empty()
    }

    /// Player whose move produced this node
    pub fn mover(&self) -> Player {
        self.state.current_player().opponent()
    }
}

// ============================================================================
// MCTS TREE (Level 2 - Tree Operations)
// ============================================================================

/// MCTS search tree with arena allocation
#[derive(Debug)]
pub struct MctsTree {
    nodes: Vec<MctsNode>,
    /// Player to move at the root; rollout rewards are relative to it
    root_player: Player,
}

impl MctsTree {
    pub fn new(root_state: GameState) -> Self {
        let root_player = root_state.current_player();
        Self { nodes: vec![MctsNode::new(root_state, None, None)], root_player }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root_player(&self) -> Player {
        self.root_player
    }

    pub fn get(&self, id: NodeId) -> &MctsNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ========================================================================
    // Level 2: Tree Operations
    // ========================================================================

    /// Select a leaf node using tree policy (UCB1)
    ///
    /// Returns the path from root to the selected leaf.
    pub fn select_leaf(&self, exploration: f64) -> Vec<NodeId> {
        let mut path = vec![self.root()];
        let mut current = self.root();

        while self.get(current).is_fully_expanded() && !self.get(current).is_terminal() {
            match self.select_best_child(current, exploration) {
                Some(best_child) => {
                    path.push(best_child);
                    current = best_child;
                }
                None => break,
            }
        }

        path
    }

    /// Expand a node by adding one child
    ///
    /// Returns the new child's NodeId, or None if node is fully expanded.
    pub fn expand(&mut self, node_id: NodeId) -> Option<NodeId> {
        let col = self.get_mut(node_id).untried_moves.pop()?;
        // untried_moves only ever holds legal columns of this state
        let child_state = self.get(node_id).state.apply(col).ok()?;

        let child_id = NodeId(self.nodes.len());
        self.nodes.push(MctsNode::new(child_state, Some(node_id), Some(col)));
        self.get_mut(node_id).children.push((col, child_id));

        Some(child_id)
    }

    /// Add a reward (relative to the root player) along the path to the root
    pub fn backpropagate(&mut self, leaf_id: NodeId, root_reward: f64) {
        let root_player = self.root_player;
        let mut current = Some(leaf_id);

        while let Some(node_id) = current {
            let node = self.get_mut(node_id);
            node.stats.visits += 1;
            node.stats.total_reward += if node.mover() == root_player {
                root_reward
            } else {
                -root_reward
            };
            current = node.parent;
        }
    }

    // ========================================================================
    // Level 3: Selection Helpers
    // ========================================================================

    fn select_best_child(&self, node_id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(node_id);
        let parent_visits = node.stats.visits;

        let mut best: Option<(f64, NodeId)> = None;
        for &(_, child) in &node.children {
            let score = self.ucb1(child, parent_visits, exploration);
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, child));
            }
        }
        best.map(|(_, id)| id)
    }

    /// UCB1 = mean_reward + C * sqrt(ln(parent_visits) / visits)
    pub(crate) fn ucb1(&self, node_id: NodeId, parent_visits: u32, exploration: f64) -> f64 {
        let stats = &self.get(node_id).stats;
        if stats.visits == 0 {
            return f64::INFINITY;
        }
        let parent = (parent_visits.max(1)) as f64;
        stats.mean_reward() + exploration * (parent.ln() / stats.visits as f64).sqrt()
    }

    // ========================================================================
    // Level 3: Best Move Selection
    // ========================================================================

    /// Most visited root child; ties go to the lowest column
    pub fn best_move(&self) -> Option<Column> {
        let mut best: Option<(u32, Column)> = None;
        for &(col, id) in &self.get(self.root()).children {
            let visits = self.get(id).stats.visits;
            let better = match best {
                None => true,
                Some((v, c)) => visits > v || (visits == v && col < c),
            };
            if better {
                best = Some((visits, col));
            }
        }
        best.map(|(_, col)| col)
    }

    /// (column, visits, mean reward) for each root child
    pub fn move_statistics(&self) -> Vec<(Column, u32, f64)> {
        self.get(self.root())
            .children
            .iter()
            .map(|&(col, id)| {
                let stats = &self.get(id).stats;
                (col, stats.visits, stats.mean_reward())
            })
            .collect()
    }

    /// Total simulations run (root visits)
    pub fn total_simulations(&self) -> u32 {
        self.get(self.root()).stats.visits
    }
}

// ============================================================================
// TESTS
// ============================================================================
