/*!
# CFPQ

This crate answers **regular and context-free path queries** over
edge-labeled directed multigraphs: given a graph and a query (a regular
expression or a context-free grammar), it enumerates the pairs of vertices
`(u, v)` joined by a path whose label word belongs to the query's language.

Everything is built on one substrate: a [BoolMatrix] sparse boolean matrix
and a [MatrixAutomaton] keeping one such matrix per alphabet symbol. Regular
queries run either through a Kronecker-product intersection followed by a
transitive closure ([rpq_kron]) or through a block-diagonal multi-source BFS
([rpq_bfs]). Context-free queries run through Hellings' worklist algorithm,
a boolean-matrix fixpoint, or a tensor-product construction over the
grammar's recursive state machine, all behind the [cfpq](cfpq::cfpq) façade.

Here is a quick example of how this crate works:

```rust
use ::cfpq::{cfpq, rpq_kron, Cfg, CfpqAlgorithm, LabeledGraph, Regex};

let mut graph = LabeledGraph::new();
graph.add_edge("0", "a", "1");
graph.add_edge("1", "b", "2");
graph.add_edge("2", "c", "2");

// Which vertices are reachable from "0" along a path spelling `a b c*`?
let regex = Regex::parse("a b c*").unwrap();
let starts = [graph.node_index("0").unwrap()];
let pairs = rpq_kron(&graph, &regex, Some(&starts), None);
assert!(pairs.contains(&(starts[0], graph.node_index("2").unwrap())));

// The same question for the context-free language `a^n b^n`.
let cfg = Cfg::parse("S -> a S b | a b", "S").unwrap();
let pairs = cfpq(&graph, &cfg, CfpqAlgorithm::Hellings, None, None, "S");
assert!(pairs.contains(&(
    graph.node_index("0").unwrap(),
    graph.node_index("2").unwrap(),
)));
```

# Overview

- [LabeledGraph](graph::LabeledGraph) holds the multigraph and its DOT text
  interchange; vertices get dense indices, engines speak indices.
- [Regex](regex::Regex), [Cfg](cfg::Cfg), [Ecfg](ecfg::Ecfg) and
  [Rsm](rsm::Rsm) are the query forms; grammars can be transformed to weak
  Chomsky normal form with [Cfg::to_wcnf](cfg::Cfg::to_wcnf) and compiled
  down to recursive state machines.
- [MatrixAutomaton](automaton::MatrixAutomaton) is the shared engine
  substrate: construction from automata, Kronecker intersection, transitive
  closure.
- [rpq_kron](rpq::rpq_kron) / [rpq_bfs](rpq::rpq_bfs) answer regular path
  queries; [cfpq](cfpq::cfpq) with a [CfpqAlgorithm](cfpq::CfpqAlgorithm)
  answers context-free ones.

Engines never fail on unsatisfiable queries; they return empty sets. Only
malformed input texts produce errors, and inputs are never mutated: every
engine call owns all of its working state.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod automaton;
pub mod cfg;
pub mod cfpq;
pub mod ecfg;
pub mod fsa;
pub mod graph;
pub mod matrix;
pub mod regex;
pub mod rpq;
pub mod rsm;

pub use automaton::MatrixAutomaton;
pub use cfg::Cfg;
pub use cfpq::{cfpq, CfpqAlgorithm};
pub use ecfg::Ecfg;
pub use graph::LabeledGraph;
pub use matrix::BoolMatrix;
pub use regex::Regex;
pub use rpq::{rpq_bfs, rpq_kron, BfsRpqResult};
pub use rsm::Rsm;
