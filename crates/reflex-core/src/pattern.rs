use crate::{Fact, VarFrame, WorkingMemory};

#[cfg(feature = "serde")]
use serde::Serialize;

/// One `field -> variable` assignment inside a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FieldBinding {
    pub field: &'static str,
    pub var: &'static str,
}

/// A single fact-pattern: a fact type plus ordered field bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Clause {
    pub fact_type: &'static str,
    pub bindings: Vec<FieldBinding>,
}

impl Clause {
    pub fn new(fact_type: &'static str) -> Self {
        Self {
            fact_type,
            bindings: Vec::new(),
        }
    }

    /// Builder-style binding: assign `field`'s value to `var`.
    pub fn bind(mut self, field: &'static str, var: &'static str) -> Self {
        self.bindings.push(FieldBinding { field, var });
        self
    }
}

/// An ordered conjunction of clauses matched against working memory.
///
/// Clause order is iteration nesting order: the first clause's candidates
/// form the outer loop, the last clause's the innermost. Variables shared
/// between clauses realize implicit equality joins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Precondition {
    pub clauses: Vec<Clause>,
}

impl Precondition {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }
}

/// Find the first tuple of facts satisfying every clause of `pre`.
///
/// Depth-first, left-to-right, short-circuiting: candidates are drawn per
/// clause in working-memory insertion order, and the first fully
/// satisfying combination wins. Variables already present in `seed`
/// (spawn arguments) act as equality constraints. Returns the complete
/// variable table on success, `None` when no combination satisfies all
/// clauses. No-match is a normal outcome, never an error.
pub fn match_first(
    pre: &Precondition,
    memory: &WorkingMemory,
    seed: &VarFrame,
) -> Option<VarFrame> {
    let mut table = seed.clone();
    if solve(&pre.clauses, memory, &mut table) {
        Some(table)
    } else {
        None
    }
}

fn solve(clauses: &[Clause], memory: &WorkingMemory, table: &mut VarFrame) -> bool {
    let Some((clause, rest)) = clauses.split_first() else {
        return true;
    };

    for fact in memory.query(clause.fact_type) {
        let Some(added) = try_clause(clause, fact, table) else {
            continue;
        };

        if solve(rest, memory, table) {
            return true;
        }

        // Inner clauses exhausted for this candidate: roll back its
        // bindings and advance the iterator.
        for var in added {
            table.remove(var);
        }
    }

    false
}

/// Attempt every binding of `clause` against one fact. On success returns
/// the variables newly introduced (for rollback); on the first conflicting
/// or missing field, restores `table` and rejects the fact.
fn try_clause(
    clause: &Clause,
    fact: &Fact,
    table: &mut VarFrame,
) -> Option<Vec<&'static str>> {
    let mut added: Vec<&'static str> = Vec::new();

    for binding in &clause.bindings {
        let value = match fact.get(binding.field) {
            Some(value) => value,
            None => {
                undo(table, &added);
                return None;
            }
        };

        match table.get(binding.var) {
            Some(bound) if bound != value => {
                undo(table, &added);
                return None;
            }
            Some(_) => {}
            None => {
                table.set(binding.var, value.clone());
                added.push(binding.var);
            }
        }
    }

    Some(added)
}

fn undo(table: &mut VarFrame, added: &[&'static str]) {
    for var in added {
        table.remove(var);
    }
}
