//! Finite automata over symbolic alphabets: ε-NFAs, subset construction and
//! DFA minimisation.
use ahash::AHashMap;
use fixedbitset::FixedBitSet;

/// A nondeterministic finite automaton whose transitions are labeled by
/// alphabet symbols; a `None` label is an ε-transition.
///
/// States are dense indices assigned in creation order.
#[derive(Debug, Clone)]
pub struct Nfa {
    n_states: usize,
    transitions: Vec<(usize, Option<String>, usize)>,
    start_states: FixedBitSet,
    final_states: FixedBitSet,
}

impl Nfa {
    /// Create an automaton with `n_states` states and no transitions.
    pub fn with_states(n_states: usize) -> Self {
        Self {
            n_states,
            transitions: Vec::new(),
            start_states: FixedBitSet::with_capacity(n_states),
            final_states: FixedBitSet::with_capacity(n_states),
        }
    }

    /// Add a fresh state and return its index.
    pub fn add_state(&mut self) -> usize {
        let state = self.n_states;
        self.n_states += 1;
        self.start_states.grow(self.n_states);
        self.final_states.grow(self.n_states);
        state
    }

    #[inline]
    /// Get the number of states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Add a transition. A `None` symbol denotes ε.
    ///
    /// # Panics
    ///
    /// Panics if either state is out of bounds.
    pub fn add_transition(&mut self, from: usize, symbol: Option<&str>, to: usize) {
        assert!(
            from < self.n_states && to < self.n_states,
            "transition ({}, {:?}, {}) out of bounds for {} states",
            from,
            symbol,
            to,
            self.n_states
        );
        self.transitions
            .push((from, symbol.map(str::to_owned), to));
    }

    /// Mark a state as a start state.
    pub fn add_start_state(&mut self, state: usize) {
        self.start_states.insert(state);
    }

    /// Mark a state as a final state.
    pub fn add_final_state(&mut self, state: usize) {
        self.final_states.insert(state);
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

    /// Iterate over the transitions as `(from, symbol, to)`.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, Option<&str>, usize)> {
        self.transitions
            .iter()
            .map(|(p, s, q)| (*p, s.as_deref(), *q))
    }

    /// Get the alphabet of the automaton, ε excluded, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .transitions
            .iter()
            .filter_map(|(_, s, _)| s.as_deref())
            .collect();
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }

    fn epsilon_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.n_states];
        for (p, symbol, q) in self.transitions.iter() {
            if symbol.is_none() {
                adjacency[*p].push(*q);
            }
        }
        adjacency
    }

    fn epsilon_close(&self, set: &mut FixedBitSet, adjacency: &[Vec<usize>]) {
        let mut stack: Vec<usize> = set.ones().collect();
        while let Some(state) = stack.pop() {
            for &next in &adjacency[state] {
                if !set.contains(next) {
                    set.insert(next);
                    stack.push(next);
                }
            }
        }
    }

    /// Produce an equivalent automaton with no ε-transitions.
    pub fn remove_epsilon_transitions(&self) -> Nfa {
        let adjacency = self.epsilon_adjacency();
        let mut result = Nfa::with_states(self.n_states);
        for state in self.start_states.ones() {
            result.add_start_state(state);
        }
        for state in 0..self.n_states {
            let mut closure = FixedBitSet::with_capacity(self.n_states);
            closure.insert(state);
            self.epsilon_close(&mut closure, &adjacency);
            if closure.ones().any(|s| self.final_states.contains(s)) {
                result.add_final_state(state);
            }
            for (p, symbol, q) in self.transitions.iter() {
                if let Some(symbol) = symbol {
                    if closure.contains(*p) {
                        result.add_transition(state, Some(symbol.as_str()), *q);
                    }
                }
            }
        }
        result
    }

    /// Check whether the automaton accepts the given word of symbols.
    pub fn accepts(&self, word: &[&str]) -> bool {
        let adjacency = self.epsilon_adjacency();
        let mut current = self.start_states.clone();
        self.epsilon_close(&mut current, &adjacency);
        for symbol in word {
            let mut next = FixedBitSet::with_capacity(self.n_states);
            for (p, s, q) in self.transitions.iter() {
                if s.as_deref() == Some(*symbol) && current.contains(*p) {
                    next.insert(*q);
                }
            }
            self.epsilon_close(&mut next, &adjacency);
            current = next;
        }
        current.ones().any(|s| self.final_states.contains(s))
    }
}

/// A deterministic finite automaton. May be partial: a missing transition
/// rejects the rest of the input.
#[derive(Debug, Clone)]
pub struct Dfa {
    transitions: Vec<AHashMap<String, usize>>,
    start_state: usize,
    final_states: FixedBitSet,
}

impl Dfa {
    #[inline]
    /// Get the number of states.
    pub fn n_states(&self) -> usize {
        self.transitions.len()
    }

    #[inline]
    /// Get the start state.
    pub fn start_state(&self) -> usize {
        self.start_state
    }

    #[inline]
    /// Get the final state set.
    pub fn final_states(&self) -> &FixedBitSet {
        &self.final_states
    }

    /// Iterate over the transitions as `(from, symbol, to)`.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, &str, usize)> {
        self.transitions
            .iter()
            .enumerate()
            .flat_map(|(p, row)| row.iter().map(move |(s, q)| (p, s.as_str(), *q)))
    }

    /// Build a DFA from an ε-NFA by subset construction. Only subsets
    /// reachable from the start set become states, so the result is trim on
    /// the left.
    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let alphabet = nfa.symbols();
        let adjacency = nfa.epsilon_adjacency();
        // Per-state, per-symbol successors of the NFA.
        let mut moves: Vec<AHashMap<&str, Vec<usize>>> = vec![AHashMap::default(); nfa.n_states()];
        for (p, symbol, q) in nfa.transitions() {
            if let Some(symbol) = symbol {
                moves[p].entry(symbol).or_default().push(q);
            }
        }

        let mut start_set = nfa.start_states().clone();
        nfa.epsilon_close(&mut start_set, &adjacency);
        let start_key: Vec<usize> = start_set.ones().collect();

        let mut subsets: AHashMap<Vec<usize>, usize> = AHashMap::default();
        let mut transitions: Vec<AHashMap<String, usize>> = Vec::new();
        let mut final_flags: Vec<bool> = Vec::new();
        let mut queue: Vec<Vec<usize>> = Vec::new();

        subsets.insert(start_key.clone(), 0);
        transitions.push(AHashMap::default());
        final_flags.push(start_key.iter().any(|&s| nfa.final_states().contains(s)));
        queue.push(start_key);

        let mut head = 0;
        while head < queue.len() {
            let subset = queue[head].clone();
            let subset_id = subsets[&subset];
            head += 1;
            for &symbol in &alphabet {
                let mut next = FixedBitSet::with_capacity(nfa.n_states());
                for &state in &subset {
                    if let Some(successors) = moves[state].get(symbol) {
                        for &q in successors {
                            next.insert(q);
                        }
                    }
                }
                if next.is_clear() {
                    continue;
                }
                nfa.epsilon_close(&mut next, &adjacency);
                let key: Vec<usize> = next.ones().collect();
                let next_id = match subsets.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = transitions.len();
                        subsets.insert(key.clone(), id);
                        transitions.push(AHashMap::default());
                        final_flags.push(key.iter().any(|&s| nfa.final_states().contains(s)));
                        queue.push(key);
                        id
                    }
                };
                transitions[subset_id].insert(symbol.to_owned(), next_id);
            }
        }

        let mut final_states = FixedBitSet::with_capacity(transitions.len());
        for (state, &is_final) in final_flags.iter().enumerate() {
            if is_final {
                final_states.insert(state);
            }
        }
        Dfa {
            transitions,
            start_state: 0,
            final_states,
        }
    }

    /// Get the canonical minimal DFA: unreachable and dead states are
    /// removed, then equivalent states are merged by partition refinement.
    /// An automaton with the empty language minimises to a single non-final
    /// state.
    pub fn minimize(&self) -> Dfa {
        let n = self.n_states();
        let mut alphabet: Vec<&str> = self
            .transitions
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        alphabet.sort_unstable();
        alphabet.dedup();

        // Reachable from the start state.
        let mut reachable = FixedBitSet::with_capacity(n);
        reachable.insert(self.start_state);
        let mut stack = vec![self.start_state];
        while let Some(state) = stack.pop() {
            for &next in self.transitions[state].values() {
                if !reachable.contains(next) {
                    reachable.insert(next);
                    stack.push(next);
                }
            }
        }
        // Co-reachable: some final state is reachable from here.
        let mut backward = vec![Vec::new(); n];
        for (p, _, q) in self.transitions() {
            backward[q].push(p);
        }
        let mut live = FixedBitSet::with_capacity(n);
        let mut stack: Vec<usize> = self.final_states.ones().collect();
        for &state in &stack {
            live.insert(state);
        }
        while let Some(state) = stack.pop() {
            for &prev in &backward[state] {
                if !live.contains(prev) {
                    live.insert(prev);
                    stack.push(prev);
                }
            }
        }
        live.intersect_with(&reachable);

        if !live.contains(self.start_state) {
            // Empty language.
            return Dfa {
                transitions: vec![AHashMap::default()],
                start_state: 0,
                final_states: FixedBitSet::with_capacity(1),
            };
        }

        // Moore partition refinement over the live states. Transitions into
        // non-live states count as transitions into an implicit sink class.
        let mut class_of: Vec<Option<usize>> = (0..n)
            .map(|state| {
                if live.contains(state) {
                    Some(usize::from(self.final_states.contains(state)))
                } else {
                    None
                }
            })
            .collect();
        loop {
            let mut signatures: AHashMap<(usize, Vec<Option<usize>>), usize> = AHashMap::default();
            let mut next_class_of = class_of.clone();
            for state in live.ones() {
                let signature: Vec<Option<usize>> = alphabet
                    .iter()
                    .map(|&symbol| {
                        self.transitions[state]
                            .get(symbol)
                            .and_then(|&q| class_of[q])
                    })
                    .collect();
                let key = (class_of[state].unwrap(), signature);
                let next_id = signatures.len();
                let class = *signatures.entry(key).or_insert(next_id);
                next_class_of[state] = Some(class);
            }
            let stable = live
                .ones()
                .all(|state| {
                    live.ones().all(|other| {
                        (class_of[state] == class_of[other])
                            == (next_class_of[state] == next_class_of[other])
                    })
                });
            class_of = next_class_of;
            if stable {
                break;
            }
        }

        // Renumber classes in order of first appearance for a deterministic
        // result, then rebuild transitions from any representative.
        let mut renumber: AHashMap<usize, usize> = AHashMap::default();
        let mut representatives: Vec<usize> = Vec::new();
        for state in live.ones() {
            let class = class_of[state].unwrap();
            renumber.entry(class).or_insert_with(|| {
                representatives.push(state);
                representatives.len() - 1
            });
        }
        let mut transitions = vec![AHashMap::default(); representatives.len()];
        let mut final_states = FixedBitSet::with_capacity(representatives.len());
        for (new_id, &representative) in representatives.iter().enumerate() {
            for (symbol, &target) in &self.transitions[representative] {
                if let Some(target_class) = class_of[target] {
                    transitions[new_id].insert(symbol.clone(), renumber[&target_class]);
                }
            }
            if self.final_states.contains(representative) {
                final_states.insert(new_id);
            }
        }
        Dfa {
            transitions,
            start_state: renumber[&class_of[self.start_state].unwrap()],
            final_states,
        }
    }

    /// Check whether the automaton accepts the given word of symbols.
    pub fn accepts(&self, word: &[&str]) -> bool {
        let mut state = self.start_state;
        for symbol in word {
            match self.transitions[state].get(*symbol) {
                Some(&next) => state = next,
                None => return false,
            }
        }
        self.final_states.contains(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nfa() -> Nfa {
        // (a b)* with an ε-shortcut start -> final.
        let mut nfa = Nfa::with_states(3);
        nfa.add_start_state(0);
        nfa.add_final_state(2);
        nfa.add_transition(0, None, 2);
        nfa.add_transition(0, Some("a"), 1);
        nfa.add_transition(1, Some("b"), 2);
        nfa.add_transition(2, Some("a"), 1);
        nfa
    }

    #[test]
    fn nfa_accepts_with_epsilon() {
        let nfa = sample_nfa();
        assert!(nfa.accepts(&[]));
        assert!(nfa.accepts(&["a", "b"]));
        assert!(nfa.accepts(&["a", "b", "a", "b"]));
        assert!(!nfa.accepts(&["a"]));
        assert!(!nfa.accepts(&["b"]));
    }

    #[test]
    fn epsilon_removal_preserves_language() {
        let nfa = sample_nfa();
        let without = nfa.remove_epsilon_transitions();
        assert!(without.transitions().all(|(_, s, _)| s.is_some()));
        for word in [
            vec![],
            vec!["a", "b"],
            vec!["a"],
            vec!["b", "a"],
            vec!["a", "b", "a", "b"],
        ] {
            assert_eq!(nfa.accepts(&word), without.accepts(&word), "{:?}", word);
        }
    }

    #[test]
    fn subset_construction_is_deterministic_and_equivalent() {
        let nfa = sample_nfa();
        let dfa = Dfa::from_nfa(&nfa);
        for word in [vec![], vec!["a", "b"], vec!["a"], vec!["a", "a"]] {
            assert_eq!(nfa.accepts(&word), dfa.accepts(&word), "{:?}", word);
        }
    }

    #[test]
    fn minimize_merges_equivalent_states() {
        // a a* as a four-state chain with a redundant tail state.
        let mut nfa = Nfa::with_states(4);
        nfa.add_start_state(0);
        nfa.add_transition(0, Some("a"), 1);
        nfa.add_transition(1, Some("a"), 2);
        nfa.add_transition(2, Some("a"), 3);
        nfa.add_transition(3, Some("a"), 3);
        nfa.add_final_state(1);
        nfa.add_final_state(2);
        nfa.add_final_state(3);
        let minimal = Dfa::from_nfa(&nfa).minimize();
        assert_eq!(minimal.n_states(), 2);
        assert!(minimal.accepts(&["a"]));
        assert!(minimal.accepts(&["a", "a", "a", "a"]));
        assert!(!minimal.accepts(&[]));
    }

    #[test]
    fn minimize_empty_language() {
        let mut nfa = Nfa::with_states(2);
        nfa.add_start_state(0);
        nfa.add_transition(0, Some("a"), 1);
        // No final states at all.
        let minimal = Dfa::from_nfa(&nfa).minimize();
        assert_eq!(minimal.n_states(), 1);
        assert!(!minimal.accepts(&[]));
        assert!(!minimal.accepts(&["a"]));
    }
}
