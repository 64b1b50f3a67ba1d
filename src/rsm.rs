//! Recursive state machines: one finite automaton per grammar variable,
//! with variable-tagged states.
use ahash::AHashMap;

use crate::automaton::MatrixAutomaton;
use crate::ecfg::Ecfg;
use crate::fsa::{Dfa, Nfa};

/// The tag of one recursive-state-machine state: the owning variable and
/// the state index inside that variable's automaton. Tagging keeps states
/// of different variables apart when the per-variable automata are merged
/// into one state space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RsmStateTag {
    /// The variable owning the state.
    pub variable: String,
    /// The state index within the variable's automaton.
    pub state: usize,
}

/// A recursive state machine: for every variable, a finite automaton
/// recognising the language of the variable's right-hand side.
#[derive(Debug, Clone)]
pub struct Rsm {
    start: String,
    boxes: AHashMap<String, Dfa>,
}

impl Rsm {
    /// Build a recursive state machine from an extended CFG by compiling
    /// every right-hand side down to a minimal DFA.
    pub fn from_ecfg(ecfg: &Ecfg) -> Rsm {
        let boxes = ecfg
            .productions()
            .iter()
            .map(|(variable, regex)| (variable.clone(), regex.to_minimal_dfa()))
            .collect();
        Rsm {
            start: ecfg.start_variable().to_owned(),
            boxes,
        }
    }

    /// Minimise every per-variable automaton.
    pub fn minimize(&self) -> Rsm {
        Rsm {
            start: self.start.clone(),
            boxes: self
                .boxes
                .iter()
                .map(|(variable, dfa)| (variable.clone(), dfa.minimize()))
                .collect(),
        }
    }

    #[inline]
    /// Get the start variable name.
    pub fn start_variable(&self) -> &str {
        &self.start
    }

    /// Get the per-variable automata.
    pub fn boxes(&self) -> &AHashMap<String, Dfa> {
        &self.boxes
    }

    /// Merge the per-variable automata into one matrix automaton over a
    /// shared state space. Returns the automaton together with the tag of
    /// every state; the start and final sets are the unions of the boxes'.
    pub fn to_matrix_automaton(&self) -> (MatrixAutomaton, Vec<RsmStateTag>) {
        let mut variables: Vec<&str> = self.boxes.keys().map(String::as_str).collect();
        variables.sort_unstable();

        let total: usize = variables.iter().map(|v| self.boxes[*v].n_states()).sum();
        let mut nfa = Nfa::with_states(total);
        let mut tags = Vec::with_capacity(total);
        let mut offset = 0;
        for variable in variables {
            let dfa = &self.boxes[variable];
            for state in 0..dfa.n_states() {
                tags.push(RsmStateTag {
                    variable: variable.to_owned(),
                    state,
                });
            }
            for (from, symbol, to) in dfa.transitions() {
                nfa.add_transition(offset + from, Some(symbol), offset + to);
            }
            nfa.add_start_state(offset + dfa.start_state());
            for state in dfa.final_states().ones() {
                nfa.add_final_state(offset + state);
            }
            offset += dfa.n_states();
        }
        (MatrixAutomaton::from_nfa(&nfa), tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Cfg;

    #[test]
    fn boxes_recognise_their_rhs() {
        let cfg = Cfg::parse("S -> a S b\nS -> a b\n", "S").unwrap();
        let rsm = Rsm::from_ecfg(&Ecfg::from_cfg(&cfg)).minimize();
        assert_eq!(rsm.boxes().len(), 1);
        let dfa = &rsm.boxes()["S"];
        assert!(dfa.accepts(&["a", "b"]));
        assert!(dfa.accepts(&["a", "S", "b"]));
        assert!(!dfa.accepts(&["a"]));
    }

    #[test]
    fn merged_automaton_tags_states_per_variable() {
        let ecfg = Ecfg::parse("S -> a B\nB -> b*\n", "S").unwrap();
        let rsm = Rsm::from_ecfg(&ecfg);
        let (automaton, tags) = rsm.to_matrix_automaton();
        assert_eq!(automaton.n_states(), tags.len());
        // One start state per variable.
        assert_eq!(automaton.start_states().count_ones(..), 2);
        // States of one variable never mix with another variable's tags.
        let mut seen = ahash::AHashSet::default();
        for tag in &tags {
            assert!(seen.insert((tag.variable.clone(), tag.state)));
        }
    }
}
