//! Regular path querying: the Kronecker/transitive-closure engine and the
//! block-diagonal multi-source BFS engine.
use ahash::AHashSet;

use crate::automaton::MatrixAutomaton;
use crate::graph::LabeledGraph;
use crate::matrix::BoolMatrix;
use crate::regex::Regex;

/// The result of [rpq_bfs]: reachable final vertices for the whole start
/// set, or per-start-vertex pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BfsRpqResult {
    /// Final vertices reachable from any start vertex (whole-set mode).
    Vertices(AHashSet<usize>),
    /// `(start, final)` vertex pairs (per-start mode).
    Pairs(AHashSet<(usize, usize)>),
}

/// Answer a regular path query by intersecting the graph automaton with the
/// minimal DFA of the regex and taking the transitive closure.
///
/// Returns every pair `(u, v)` of graph vertices such that some non-empty
/// path from `u` to `v` spells a word of the regex's language, with `u`
/// restricted to `starts` and `v` to `finals` (both default to all
/// vertices). ε-acceptance is not reported; the closure covers strict
/// reachability only.
///
/// # Panics
///
/// Panics if a start or final index is out of bounds.
pub fn rpq_kron(
    graph: &LabeledGraph,
    regex: &Regex,
    starts: Option<&[usize]>,
    finals: Option<&[usize]>,
) -> AHashSet<(usize, usize)> {
    let graph_automaton = MatrixAutomaton::from_nfa(&graph.to_nfa(starts, finals));
    let regex_automaton = MatrixAutomaton::from_dfa(&regex.to_minimal_dfa());
    let n_regex = regex_automaton.n_states();

    let intersection = graph_automaton.intersect(&regex_automaton);
    let closure = intersection.transitive_closure();

    let mut pairs = AHashSet::default();
    for start in intersection.start_states().ones() {
        for target in intersection.final_states().ones() {
            if closure.contains(start, target) {
                pairs.insert((start / n_regex, target / n_regex));
            }
        }
    }
    pairs
}

/// Answer a regular path query by multi-source BFS over the block-diagonal
/// sum of the regex and graph matrices.
///
/// In whole-set mode (`per_start = false`) the result is the set of final
/// vertices reachable from the start set along a path accepted by the
/// regex; start vertices themselves are reported when the regex accepts ε.
/// In per-start mode each start vertex gets its own front block and the
/// result is a set of `(start, final)` pairs.
///
/// # Panics
///
/// Panics if a start or final index is out of bounds.
pub fn rpq_bfs(
    graph: &LabeledGraph,
    regex: &Regex,
    starts: Option<&[usize]>,
    finals: Option<&[usize]>,
    per_start: bool,
) -> BfsRpqResult {
    let graph_automaton = MatrixAutomaton::from_nfa(&graph.to_nfa(starts, finals));
    let regex_automaton = MatrixAutomaton::from_dfa(&regex.to_minimal_dfa());
    let n_graph = graph_automaton.n_states();
    let n_regex = regex_automaton.n_states();

    // Block-diagonal step matrix per shared symbol; one-sided symbols can
    // never advance both components at once.
    let steps: Vec<BoolMatrix> = regex_automaton
        .symbols()
        .into_iter()
        .filter_map(|symbol| {
            let graph_matrix = graph_automaton.matrix(symbol)?;
            Some(
                regex_automaton
                    .matrix(symbol)
                    .unwrap()
                    .block_diag(graph_matrix),
            )
        })
        .collect();

    let start_vertices: Vec<usize> = graph_automaton.start_states().ones().collect();
    let blocks = if per_start { start_vertices.len() } else { 1 };
    let mut front = BoolMatrix::new(blocks * n_regex, n_regex + n_graph);
    for block in 0..blocks {
        for state in 0..n_regex {
            let row = block * n_regex + state;
            front.set(row, state);
            if regex_automaton.start_states().contains(state) {
                if per_start {
                    front.set(row, n_regex + start_vertices[block]);
                } else {
                    for &vertex in &start_vertices {
                        front.set(row, n_regex + vertex);
                    }
                }
            }
        }
    }

    let mut iterations = 0usize;
    loop {
        let previous_nnz = front.nnz();
        for step in &steps {
            let advanced = front.matmul(step);
            let normalised = normalise_front(&advanced, n_regex);
            front.or_assign(&normalised);
        }
        iterations += 1;
        if front.nnz() == previous_nnz {
            break;
        }
    }
    log::debug!(
        "bfs rpq front stabilised after {} sweeps with {} entries",
        iterations,
        front.nnz()
    );

    let mut vertices = AHashSet::default();
    let mut pairs = AHashSet::default();
    for (row, column) in front.iter_nonzero() {
        if column < n_regex {
            continue;
        }
        let regex_state = row % n_regex;
        let graph_state = column - n_regex;
        if regex_automaton.final_states().contains(regex_state)
            && graph_automaton.final_states().contains(graph_state)
        {
            if per_start {
                pairs.insert((start_vertices[row / n_regex], graph_state));
            } else {
                vertices.insert(graph_state);
            }
        }
    }
    if per_start {
        BfsRpqResult::Pairs(pairs)
    } else {
        BfsRpqResult::Vertices(vertices)
    }
}

/// Re-route the rows of a stepped front by the regex state they now claim.
///
/// A non-zero entry in the left part at column `j` means the row's block
/// advanced to regex state `j`; its graph part belongs to the row
/// `block * n_regex + j` of the new front, together with that row's own
/// identity bit. Rows whose step produced no graph part are dropped: with
/// no live vertex set they cannot make progress.
fn normalise_front(advanced: &BoolMatrix, n_regex: usize) -> BoolMatrix {
    let mut front = BoolMatrix::new(advanced.rows(), advanced.cols());
    for row in 0..advanced.rows() {
        let entries = advanced.row(row);
        let split = entries.partition_point(|&column| (column as usize) < n_regex);
        let (left, right) = entries.split_at(split);
        if right.is_empty() {
            continue;
        }
        let block = row / n_regex;
        for &regex_state in left {
            let target = block * n_regex + regex_state as usize;
            front.set(target, regex_state as usize);
            for &column in right {
                front.set(target, column as usize);
            }
        }
    }
    front
}
