//! The boolean-matrix automaton substrate shared by all reachability
//! engines: one sparse matrix per alphabet symbol over a dense state space.
use std::fmt::Debug;

use ahash::AHashMap;
use fixedbitset::FixedBitSet;

use crate::fsa::{Dfa, Nfa};
use crate::matrix::BoolMatrix;

/// An automaton whose transition relation is stored as one [BoolMatrix] per
/// alphabet symbol, over states `0..n_states`.
///
/// `matrices[s][p, q]` is true iff there is an `s`-labeled transition from
/// `p` to `q`. Symbols without any transition have no matrix.
#[derive(Clone)]
pub struct MatrixAutomaton {
    n_states: usize,
    matrices: AHashMap<String, BoolMatrix>,
    start_states: FixedBitSet,
    final_states: FixedBitSet,
}

impl Debug for MatrixAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<(&str, usize)> = self
            .matrices
            .iter()
            .map(|(symbol, matrix)| (symbol.as_str(), matrix.nnz()))
            .collect();
        symbols.sort_unstable();
        f.debug_struct("MatrixAutomaton")
            .field("n_states", &self.n_states)
            .field("symbols", &symbols)
            .field("start_states", &self.start_states.ones().collect::<Vec<_>>())
            .field("final_states", &self.final_states.ones().collect::<Vec<_>>())
            .finish()
    }
}

impl MatrixAutomaton {
    fn empty(n_states: usize) -> Self {
        Self {
            n_states,
            matrices: AHashMap::default(),
            start_states: FixedBitSet::with_capacity(n_states),
            final_states: FixedBitSet::with_capacity(n_states),
        }
    }

    /// Build the matrix form of an ε-free NFA.
    ///
    /// # Panics
    ///
    /// Panics if the automaton still contains ε-transitions; remove them
    /// with [Nfa::remove_epsilon_transitions] first.
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let mut automaton = Self::empty(nfa.n_states());
        for (from, symbol, to) in nfa.transitions() {
            let symbol = symbol.expect("epsilon transitions must be removed first");
            automaton.add_transition(from, symbol, to);
        }
        automaton.start_states = nfa.start_states().clone();
        automaton.final_states = nfa.final_states().clone();
        automaton
    }

    /// Build the matrix form of a DFA.
    pub fn from_dfa(dfa: &Dfa) -> Self {
        let mut automaton = Self::empty(dfa.n_states());
        for (from, symbol, to) in dfa.transitions() {
            automaton.add_transition(from, symbol, to);
        }
        automaton.start_states.insert(dfa.start_state());
        automaton.final_states = dfa.final_states().clone();
        automaton
    }

    #[inline]
    /// Get the number of states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    #[inline]
    /// Get the start state set.
    pub fn start_states(&self) -> &FixedBitSet {
        &self.start_states
    }

    #[inline]
    /// Get the final state set.
    pub fn final_states(&self) -> &FixedBitSet {
        &self.final_states
    }

    /// Get the transition matrix of a symbol, if the symbol has any
    /// transition.
    pub fn matrix(&self, symbol: &str) -> Option<&BoolMatrix> {
        self.matrices.get(symbol)
    }

    /// Get the alphabet of the automaton, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.matrices.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Add a labeled transition, creating the symbol's matrix if needed.
    ///
    /// # Panics
    ///
    /// Panics if either state is out of bounds.
    pub fn add_transition(&mut self, from: usize, symbol: &str, to: usize) {
        let n = self.n_states;
        self.matrices
            .entry(symbol.to_owned())
            .or_insert_with(|| BoolMatrix::new(n, n))
            .set(from, to);
    }

    /// OR the identity matrix into a symbol's matrix, creating it if
    /// absent. This is how ε-derivations of a grammar variable become
    /// self-loops on every state.
    pub fn add_symbol_identity(&mut self, symbol: &str) {
        let n = self.n_states;
        self.matrices
            .entry(symbol.to_owned())
            .or_insert_with(|| BoolMatrix::new(n, n))
            .or_assign(&BoolMatrix::identity(n));
    }

    /// Intersect two automata.
    ///
    /// The result has `n1 * n2` states; the pair `(p, q)` is encoded as
    /// `p * n2 + q`. For every symbol shared by both alphabets the result's
    /// matrix is the Kronecker product of the operands' matrices; symbols
    /// present on one side only contribute nothing. Start and final sets
    /// are the cartesian products of the operands'.
    pub fn intersect(&self, other: &MatrixAutomaton) -> MatrixAutomaton {
        let mut result = Self::empty(self.n_states * other.n_states);
        for (symbol, matrix) in &self.matrices {
            if let Some(other_matrix) = other.matrices.get(symbol) {
                result
                    .matrices
                    .insert(symbol.clone(), matrix.kron(other_matrix));
            }
        }
        for p in self.start_states.ones() {
            for q in other.start_states.ones() {
                result.start_states.insert(p * other.n_states + q);
            }
        }
        for p in self.final_states.ones() {
            for q in other.final_states.ones() {
                result.final_states.insert(p * other.n_states + q);
            }
        }
        result
    }

    /// Compute the symbol-agnostic transitive closure of the automaton.
    ///
    /// The result has a true entry at `(i, j)` iff some non-empty path of
    /// transitions, of any labels, leads from `i` to `j`. Squaring the
    /// union of all symbol matrices until the number of entries stops
    /// growing converges in logarithmically many rounds.
    pub fn transitive_closure(&self) -> BoolMatrix {
        let mut closure = BoolMatrix::new(self.n_states, self.n_states);
        if self.matrices.is_empty() {
            return closure;
        }
        for matrix in self.matrices.values() {
            closure.or_assign(matrix);
        }
        let mut previous_nnz = closure.nnz();
        let mut rounds = 0usize;
        loop {
            let product = closure.matmul(&closure);
            closure.or_assign(&product);
            rounds += 1;
            let nnz = closure.nnz();
            if nnz == previous_nnz {
                break;
            }
            previous_nnz = nnz;
        }
        log::debug!(
            "transitive closure of {} states converged after {} rounds with {} entries",
            self.n_states,
            rounds,
            previous_nnz
        );
        closure
    }

    /// Convert back into an NFA description with the same states,
    /// transitions, start set and final set.
    pub fn to_nfa(&self) -> Nfa {
        let mut nfa = Nfa::with_states(self.n_states);
        for symbol in self.symbols() {
            for (from, to) in self.matrices[symbol].iter_nonzero() {
                nfa.add_transition(from, Some(symbol), to);
            }
        }
        for state in self.start_states.ones() {
            nfa.add_start_state(state);
        }
        for state in self.final_states.ones() {
            nfa.add_final_state(state);
        }
        nfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::Regex;

    fn automaton_of(regex: &str) -> MatrixAutomaton {
        MatrixAutomaton::from_dfa(&Regex::parse(regex).unwrap().to_minimal_dfa())
    }

    #[test]
    fn intersection_accepts_language_intersection() {
        let left = automaton_of("a* b");
        let right = automaton_of("a b | b");
        let intersection = left.intersect(&right).to_nfa();
        assert!(intersection.accepts(&["b"]));
        assert!(intersection.accepts(&["a", "b"]));
        assert!(!intersection.accepts(&["a", "a", "b"]));
        assert!(!intersection.accepts(&["a"]));
    }

    #[test]
    fn intersection_ignores_one_sided_symbols() {
        let left = automaton_of("a");
        let right = automaton_of("b");
        let intersection = left.intersect(&right);
        assert!(intersection.symbols().is_empty());
    }

    #[test]
    fn closure_reports_nonempty_reachability() {
        // 0 -a-> 1 -b-> 2, plus a c-loop on 2.
        let mut nfa = Nfa::with_states(3);
        nfa.add_transition(0, Some("a"), 1);
        nfa.add_transition(1, Some("b"), 2);
        nfa.add_transition(2, Some("c"), 2);
        let automaton = MatrixAutomaton::from_nfa(&nfa);
        let closure = automaton.transitive_closure();
        assert!(closure.contains(0, 1));
        assert!(closure.contains(0, 2));
        assert!(closure.contains(2, 2));
        assert!(!closure.contains(1, 0));
        assert!(!closure.contains(0, 0));
    }

    #[test]
    fn closure_of_empty_alphabet_is_zero() {
        let automaton = MatrixAutomaton::from_nfa(&Nfa::with_states(4));
        assert_eq!(automaton.transitive_closure().nnz(), 0);
    }

    #[test]
    fn round_trip_preserves_language() {
        let regex = Regex::parse("a (b | c)* d").unwrap();
        let direct = regex.to_minimal_dfa();
        let round_tripped = MatrixAutomaton::from_dfa(&direct).to_nfa();
        for word in [
            vec!["a", "d"],
            vec!["a", "b", "c", "d"],
            vec!["a", "b"],
            vec!["d"],
        ] {
            assert_eq!(direct.accepts(&word), round_tripped.accepts(&word), "{:?}", word);
        }
    }
}
