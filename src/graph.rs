//! Edge-labeled directed multigraphs and their DOT text interchange.
use std::fmt::Write as _;
use std::path::Path;

use ahash::AHashMap;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{map, opt, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded, separated_pair};
use nom::IResult;

use crate::fsa::Nfa;

/// The error type for reading a graph from DOT text.
#[derive(Debug, thiserror::Error)]
pub enum DotParseError {
    /// Error due to I/O operations on the underlying file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// The text could not be parsed as a DOT digraph.
    #[error("malformed dot graph near `{0}`")]
    Syntax(String),
    /// An edge statement carried no `label` attribute.
    #[error("edge `{0}` -> `{1}` has no label attribute")]
    MissingLabel(String, String),
}

/// Summary information about a graph: node count, edge count and the set of
/// edge labels, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInfo {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of edges.
    pub edges: usize,
    /// All distinct edge labels, sorted.
    pub labels: Vec<String>,
}

/// A directed multigraph whose edges carry exactly one label each.
///
/// Nodes have opaque string names and dense indices assigned in insertion
/// order; every engine works on the indices and projects back to names only
/// at the API boundary.
#[derive(Debug, Clone, Default)]
pub struct LabeledGraph {
    nodes: Vec<String>,
    node_indices: AHashMap<String, usize>,
    edges: Vec<(usize, String, usize)>,
}

impl LabeledGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Adding an existing node returns the
    /// index it already has.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&index) = self.node_indices.get(name) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(name.to_owned());
        self.node_indices.insert(name.to_owned(), index);
        index
    }

    /// Add an edge, creating its endpoints as needed.
    pub fn add_edge(&mut self, from: &str, label: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.edges.push((from, label.to_owned(), to));
    }

    /// Look up the index of a node by name.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_indices.get(name).copied()
    }

    /// Get the name of a node by index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn node_name(&self, index: usize) -> &str {
        &self.nodes[index]
    }

    #[inline]
    /// Get the number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    /// Get the number of edges.
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over the node names in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Iterate over the edges as `(from, label, to)` index triples.
    pub fn edges(&self) -> impl Iterator<Item = (usize, &str, usize)> {
        self.edges.iter().map(|(u, label, v)| (*u, label.as_str(), *v))
    }

    /// Summarise the graph.
    pub fn info(&self) -> GraphInfo {
        let mut labels: Vec<String> = self.edges.iter().map(|(_, l, _)| l.clone()).collect();
        labels.sort_unstable();
        labels.dedup();
        GraphInfo {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            labels,
        }
    }

    /// Build the labeled two-cycles graph: a cycle `0 → 1 → … → n → 0` with
    /// edges labeled `labels.0` and a cycle `0 → n+1 → … → n+m → 0` labeled
    /// `labels.1`, sharing node `0`.
    pub fn two_cycles(n: usize, m: usize, labels: (&str, &str)) -> Self {
        let mut graph = Self::new();
        let name = |i: usize| i.to_string();
        for i in 0..=n + m {
            graph.add_node(&name(i));
        }
        for i in 0..n {
            graph.add_edge(&name(i), labels.0, &name(i + 1));
        }
        graph.add_edge(&name(n), labels.0, &name(0));
        if m > 0 {
            graph.add_edge(&name(0), labels.1, &name(n + 1));
            for i in 1..m {
                graph.add_edge(&name(n + i), labels.1, &name(n + i + 1));
            }
            graph.add_edge(&name(n + m), labels.1, &name(0));
        }
        graph
    }

    /// Convert the graph into an NFA over its edge labels. Omitted start or
    /// final sets default to all nodes.
    ///
    /// # Panics
    ///
    /// Panics if a start or final index is out of bounds.
    pub fn to_nfa(&self, starts: Option<&[usize]>, finals: Option<&[usize]>) -> Nfa {
        let mut nfa = Nfa::with_states(self.nodes.len());
        for (u, label, v) in self.edges() {
            nfa.add_transition(u, Some(label), v);
        }
        match starts {
            Some(starts) => starts.iter().for_each(|&s| nfa.add_start_state(s)),
            None => (0..self.nodes.len()).for_each(|s| nfa.add_start_state(s)),
        }
        match finals {
            Some(finals) => finals.iter().for_each(|&s| nfa.add_final_state(s)),
            None => (0..self.nodes.len()).for_each(|s| nfa.add_final_state(s)),
        }
        nfa
    }

    /// Parse a graph from DOT text.
    ///
    /// Only the subset produced by common writers is understood: a
    /// `digraph` block of node and `a -> b [label=x]` statements. A node
    /// literally named `\n`, which some writers insert, is dropped.
    ///
    /// # Errors
    ///
    /// Returns a [DotParseError] on malformed text or unlabeled edges.
    pub fn from_dot(text: &str) -> Result<Self, DotParseError> {
        let mut input = dot_header(text).map_err(|_| syntax_error(text))?.0;
        let mut graph = Self::new();
        loop {
            input = multispace0::<_, nom::error::Error<&str>>(input)
                .map_err(|_| syntax_error(input))?
                .0;
            if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('}')(input) {
                input = rest;
                break;
            }
            let (rest, statement) = dot_statement(input).map_err(|_| syntax_error(input))?;
            input = rest;
            match statement {
                DotStatement::Node(name) => {
                    if is_spurious_node(&name) {
                        log::warn!("dropping spurious dot node {:?}", name);
                    } else {
                        graph.add_node(&name);
                    }
                }
                DotStatement::Edge(from, to, attributes) => {
                    let label = attributes
                        .into_iter()
                        .find(|(key, _)| key == "label")
                        .map(|(_, value)| value)
                        .ok_or(DotParseError::MissingLabel(from.clone(), to.clone()))?;
                    graph.add_edge(&from, &label, &to);
                }
                DotStatement::Attribute => {}
            }
            input = multispace0::<_, nom::error::Error<&str>>(input)
                .map_err(|_| syntax_error(input))?
                .0;
            if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>(';')(input) {
                input = rest;
            }
        }
        if !input.trim().is_empty() {
            return Err(syntax_error(input));
        }
        Ok(graph)
    }

    /// Read a graph from a DOT file.
    ///
    /// # Errors
    ///
    /// Returns a [DotParseError] on I/O failure or malformed text.
    pub fn read_dot_file(path: impl AsRef<Path>) -> Result<Self, DotParseError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_dot(&text)
    }

    /// Render the graph as DOT text.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for name in &self.nodes {
            writeln!(out, "  \"{}\";", escape(name)).unwrap();
        }
        for (u, label, v) in self.edges() {
            writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(self.node_name(u)),
                escape(self.node_name(v)),
                escape(label)
            )
            .unwrap();
        }
        out.push_str("}\n");
        out
    }

    /// Write the graph to a DOT file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on failure.
    pub fn write_dot_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_dot())
    }
}

fn is_spurious_node(name: &str) -> bool {
    name == "\n" || name == "\\n"
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn syntax_error(input: &str) -> DotParseError {
    DotParseError::Syntax(input.trim_start().chars().take(32).collect())
}

enum DotStatement {
    Node(String),
    Edge(String, String, Vec<(String, String)>),
    Attribute,
}

fn bare_identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
        str::to_owned,
    )(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(nom::bytes::complete::escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", char('\\')),
                    value("\"", char('"')),
                    value("\n", char('n')),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, String> {
    alt((quoted_identifier, bare_identifier))(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    separated_pair(
        identifier,
        delimited(multispace0, char('='), multispace0),
        identifier,
    )(input)
}

fn attribute_list(input: &str) -> IResult<&str, Vec<(String, String)>> {
    delimited(
        pair(char('['), multispace0),
        separated_list0(
            delimited(multispace0, alt((char(','), char(';'))), multispace0),
            attribute,
        ),
        pair(multispace0, char(']')),
    )(input)
}

fn dot_header(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(pair(tag("strict"), multispace0))(input)?;
    let (input, _) = alt((tag("digraph"), tag("graph")))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(pair(identifier, multispace0))(input)?;
    let (input, _) = char('{')(input)?;
    Ok((input, ()))
}

fn dot_statement(input: &str) -> IResult<&str, DotStatement> {
    let (input, first) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    if let Ok((input, _)) = tag::<_, _, nom::error::Error<&str>>("->")(input) {
        let (input, _) = multispace0(input)?;
        let (input, second) = identifier(input)?;
        let (input, _) = multispace0(input)?;
        let (input, attributes) = opt(attribute_list)(input)?;
        return Ok((
            input,
            DotStatement::Edge(first, second, attributes.unwrap_or_default()),
        ));
    }
    if let Ok((input, _)) = char::<_, nom::error::Error<&str>>('=')(input) {
        let (input, _) = multispace0(input)?;
        let (input, _) = identifier(input)?;
        return Ok((input, DotStatement::Attribute));
    }
    let (input, _) = opt(preceded(multispace0, attribute_list))(input)?;
    Ok((input, DotStatement::Node(first)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edges_and_nodes() {
        let graph = LabeledGraph::from_dot(
            r#"digraph test {
                1;
                1 -> 2 [label=a];
                2 -> 3 [label="b"];
            }"#,
        )
        .unwrap();
        assert_eq!(graph.n_nodes(), 3);
        assert_eq!(graph.n_edges(), 2);
        let info = graph.info();
        assert_eq!(info.labels, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn drops_spurious_newline_node() {
        let graph = LabeledGraph::from_dot(
            "digraph {\n\"\\n\";\n1 -> 2 [label=a];\n}\n",
        )
        .unwrap();
        assert_eq!(graph.n_nodes(), 2);
        assert!(graph.node_index("1").is_some());
    }

    #[test]
    fn rejects_unlabeled_edges() {
        let error = LabeledGraph::from_dot("digraph { 1 -> 2; }").unwrap_err();
        assert!(matches!(error, DotParseError::MissingLabel(_, _)));
    }

    #[test]
    fn dot_round_trip() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("0", "a", "1");
        graph.add_edge("1", "b", "0");
        let reparsed = LabeledGraph::from_dot(&graph.to_dot()).unwrap();
        assert_eq!(reparsed.n_nodes(), graph.n_nodes());
        assert_eq!(
            reparsed.edges().collect::<Vec<_>>(),
            graph.edges().collect::<Vec<_>>()
        );
    }

    #[test]
    fn two_cycles_shape() {
        let graph = LabeledGraph::two_cycles(2, 3, ("a", "b"));
        assert_eq!(graph.n_nodes(), 6);
        assert_eq!(graph.n_edges(), 7);
        let a_edges = graph.edges().filter(|(_, l, _)| *l == "a").count();
        assert_eq!(a_edges, 3);
    }

    #[test]
    fn to_nfa_defaults_to_all_states() {
        let graph = LabeledGraph::two_cycles(1, 1, ("a", "b"));
        let nfa = graph.to_nfa(None, None);
        assert_eq!(nfa.start_states().count_ones(..), graph.n_nodes());
        assert_eq!(nfa.final_states().count_ones(..), graph.n_nodes());
    }
}
