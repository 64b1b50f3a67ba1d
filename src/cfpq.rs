//! Context-free path querying: the Hellings, matrix and tensor engines and
//! the query façade.
use ahash::{AHashMap, AHashSet};
use displaydoc::Display;

use crate::automaton::MatrixAutomaton;
use crate::cfg::{Cfg, CfgSymbol, VariableId};
use crate::ecfg::Ecfg;
use crate::graph::LabeledGraph;
use crate::matrix::BoolMatrix;
use crate::rsm::Rsm;

/// A triple `(u, X, v)`: the grammar variable `X` derives the labels of
/// some path from vertex `u` to vertex `v`.
pub type Triple = (usize, String, usize);

/// Selects the engine run by the [cfpq()] façade.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfpqAlgorithm {
    /// hellings
    Hellings,
    /// matrix
    Matrix,
    /// tensor
    Tensor,
}

/// The productions of a WCNF grammar, partitioned by body shape.
struct WcnfParts {
    epsilon_heads: Vec<VariableId>,
    /// Terminal name to the heads of its unary productions.
    terminal_heads: AHashMap<String, Vec<VariableId>>,
    /// Binary body to its heads.
    binary_heads: AHashMap<(VariableId, VariableId), Vec<VariableId>>,
    /// All binary productions as `(head, left, right)`.
    binary_list: Vec<(VariableId, VariableId, VariableId)>,
}

fn partition_wcnf(wcnf: &Cfg) -> WcnfParts {
    let mut parts = WcnfParts {
        epsilon_heads: Vec::new(),
        terminal_heads: AHashMap::default(),
        binary_heads: AHashMap::default(),
        binary_list: Vec::new(),
    };
    for production in wcnf.productions() {
        match production.body.as_slice() {
            [] => parts.epsilon_heads.push(production.head),
            [CfgSymbol::Terminal(terminal)] => parts
                .terminal_heads
                .entry(wcnf.terminal_name(*terminal).to_owned())
                .or_default()
                .push(production.head),
            [CfgSymbol::Variable(left), CfgSymbol::Variable(right)] => {
                parts
                    .binary_heads
                    .entry((*left, *right))
                    .or_default()
                    .push(production.head);
                parts
                    .binary_list
                    .push((production.head, *left, *right));
            }
            _ => unreachable!("grammar is not in weak Chomsky normal form"),
        }
    }
    parts
}

fn resolve_triples(
    wcnf: &Cfg,
    triples: AHashSet<(usize, VariableId, usize)>,
) -> AHashSet<Triple> {
    triples
        .into_iter()
        .map(|(u, variable, v)| (u, wcnf.variable_name(variable).to_owned(), v))
        .collect()
}

/// Compute the grammar-constrained transitive closure of a graph with
/// Hellings' worklist algorithm.
///
/// Returns every triple `(u, X, v)` such that `X` derives the label word of
/// some path `u → v`, for the variables of the grammar's weak Chomsky
/// normal form.
pub fn hellings_closure(graph: &LabeledGraph, cfg: &Cfg) -> AHashSet<Triple> {
    let wcnf = cfg.to_wcnf();
    let parts = partition_wcnf(&wcnf);

    let mut store: AHashSet<(usize, VariableId, usize)> = AHashSet::default();
    for vertex in 0..graph.n_nodes() {
        for &head in &parts.epsilon_heads {
            store.insert((vertex, head, vertex));
        }
    }
    for (u, label, v) in graph.edges() {
        if let Some(heads) = parts.terminal_heads.get(label) {
            for &head in heads {
                store.insert((u, head, v));
            }
        }
    }

    let mut queue: Vec<(usize, VariableId, usize)> = store.iter().copied().collect();
    while let Some((u1, x1, v1)) = queue.pop() {
        let mut additions = Vec::new();
        for &(u2, x2, v2) in &store {
            if v2 == u1 {
                if let Some(heads) = parts.binary_heads.get(&(x2, x1)) {
                    for &head in heads {
                        let triple = (u2, head, v1);
                        if !store.contains(&triple) {
                            additions.push(triple);
                        }
                    }
                }
            }
            if v1 == u2 {
                if let Some(heads) = parts.binary_heads.get(&(x1, x2)) {
                    for &head in heads {
                        let triple = (u1, head, v2);
                        if !store.contains(&triple) {
                            additions.push(triple);
                        }
                    }
                }
            }
        }
        for triple in additions {
            if store.insert(triple) {
                queue.push(triple);
            }
        }
    }
    resolve_triples(&wcnf, store)
}

/// Compute the grammar-constrained transitive closure of a graph with the
/// boolean-matrix algorithm: one matrix per WCNF variable, swept to a
/// fixed point of the binary-production products.
pub fn matrix_closure(graph: &LabeledGraph, cfg: &Cfg) -> AHashSet<Triple> {
    let wcnf = cfg.to_wcnf();
    let parts = partition_wcnf(&wcnf);
    let n = graph.n_nodes();

    // Every variable gets a matrix, productionless ones included, so the
    // sweep below never misses an operand.
    let mut matrices: AHashMap<VariableId, BoolMatrix> = wcnf
        .variables_in_use()
        .into_iter()
        .map(|variable| (variable, BoolMatrix::new(n, n)))
        .collect();
    for &head in &parts.epsilon_heads {
        let matrix = matrices.get_mut(&head).unwrap();
        for vertex in 0..n {
            matrix.set(vertex, vertex);
        }
    }
    for (u, label, v) in graph.edges() {
        if let Some(heads) = parts.terminal_heads.get(label) {
            for &head in heads {
                matrices.get_mut(&head).unwrap().set(u, v);
            }
        }
    }

    let mut sweeps = 0usize;
    loop {
        let before: usize = matrices.values().map(BoolMatrix::nnz).sum();
        for &(head, left, right) in &parts.binary_list {
            let product = matrices[&left].matmul(&matrices[&right]);
            matrices.get_mut(&head).unwrap().or_assign(&product);
        }
        sweeps += 1;
        let after: usize = matrices.values().map(BoolMatrix::nnz).sum();
        if before == after {
            break;
        }
    }
    log::debug!("matrix cfpq converged after {} sweeps", sweeps);

    let mut triples = AHashSet::default();
    for (&variable, matrix) in &matrices {
        for (u, v) in matrix.iter_nonzero() {
            triples.insert((u, variable, v));
        }
    }
    resolve_triples(&wcnf, triples)
}

/// Compute the grammar-constrained transitive closure of a graph with the
/// tensor algorithm: the grammar's recursive state machine is intersected
/// with the graph automaton, and every completed derivation found by the
/// transitive closure is fed back into the graph as a variable-labeled
/// edge until nothing new appears.
pub fn tensor_closure(graph: &LabeledGraph, cfg: &Cfg) -> AHashSet<Triple> {
    let rsm = Rsm::from_ecfg(&Ecfg::from_cfg(cfg)).minimize();
    let (rsm_automaton, tags) = rsm.to_matrix_automaton();

    let mut graph_automaton = MatrixAutomaton::from_nfa(&graph.to_nfa(None, None));
    let n_graph = graph_automaton.n_states();
    if n_graph == 0 {
        return AHashSet::default();
    }
    // ε-derivations become self-loops, once, before the loop.
    for variable in cfg.nullable_variables() {
        graph_automaton.add_symbol_identity(cfg.variable_name(variable));
    }

    let mut previous_nnz = None;
    let mut iterations = 0usize;
    loop {
        let intersection = rsm_automaton.intersect(&graph_automaton);
        let closure = intersection.transitive_closure();
        let nnz = closure.nnz();
        iterations += 1;
        if previous_nnz == Some(nnz) {
            break;
        }
        previous_nnz = Some(nnz);
        for (i, j) in closure.iter_nonzero() {
            let (rsm_source, graph_source) = (i / n_graph, i % n_graph);
            let (rsm_target, graph_target) = (j / n_graph, j % n_graph);
            if rsm_automaton.start_states().contains(rsm_source)
                && rsm_automaton.final_states().contains(rsm_target)
            {
                graph_automaton.add_transition(
                    graph_source,
                    &tags[rsm_source].variable,
                    graph_target,
                );
            }
        }
    }
    log::debug!("tensor cfpq converged after {} iterations", iterations);

    let mut triples = AHashSet::default();
    for variable in cfg.variables_in_use() {
        let name = cfg.variable_name(variable);
        if let Some(matrix) = graph_automaton.matrix(name) {
            for (u, v) in matrix.iter_nonzero() {
                triples.insert((u, name.to_owned(), v));
            }
        }
    }
    triples
}

/// Answer a context-free path query.
///
/// Runs the chosen engine and keeps the pairs `(u, v)` whose triple
/// `(u, X, v)` has `X` equal to `start_variable`, `u` in `starts` and `v`
/// in `finals`; omitted sets default to all vertices. A start variable the
/// grammar does not define yields the empty set.
pub fn cfpq(
    graph: &LabeledGraph,
    cfg: &Cfg,
    algorithm: CfpqAlgorithm,
    starts: Option<&[usize]>,
    finals: Option<&[usize]>,
    start_variable: &str,
) -> AHashSet<(usize, usize)> {
    log::debug!("running the {} cfpq engine", algorithm);
    let closure = match algorithm {
        CfpqAlgorithm::Hellings => hellings_closure(graph, cfg),
        CfpqAlgorithm::Matrix => matrix_closure(graph, cfg),
        CfpqAlgorithm::Tensor => tensor_closure(graph, cfg),
    };
    let start_set: Option<AHashSet<usize>> = starts.map(|s| s.iter().copied().collect());
    let final_set: Option<AHashSet<usize>> = finals.map(|s| s.iter().copied().collect());
    closure
        .into_iter()
        .filter(|(u, variable, v)| {
            variable == start_variable
                && start_set.as_ref().map_or(true, |s| s.contains(u))
                && final_set.as_ref().map_or(true, |s| s.contains(v))
        })
        .map(|(u, _, v)| (u, v))
        .collect()
}
