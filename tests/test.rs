#[cfg(test)]
mod tests {
    use ahash::AHashSet;
    use ::cfpq::cfpq::{hellings_closure, matrix_closure, tensor_closure, Triple};
    use ::cfpq::{
        cfpq, rpq_bfs, rpq_kron, BfsRpqResult, Cfg, CfpqAlgorithm, LabeledGraph, MatrixAutomaton,
        Regex,
    };

    fn name_pairs(
        graph: &LabeledGraph,
        pairs: &AHashSet<(usize, usize)>,
    ) -> AHashSet<(String, String)> {
        pairs
            .iter()
            .map(|&(u, v)| {
                (
                    graph.node_name(u).to_owned(),
                    graph.node_name(v).to_owned(),
                )
            })
            .collect()
    }

    fn expect_pairs(pairs: &[(&str, &str)]) -> AHashSet<(String, String)> {
        pairs
            .iter()
            .map(|&(u, v)| (u.to_owned(), v.to_owned()))
            .collect()
    }

    fn indices(graph: &LabeledGraph, names: &[&str]) -> Vec<usize> {
        names
            .iter()
            .map(|name| graph.node_index(name).unwrap())
            .collect()
    }

    /// The bracket chain `1 -(-> 2 -)-> 3 -(-> 4 ... 8 -)-> 9`, read from
    /// its DOT form.
    fn bracket_chain() -> LabeledGraph {
        let text = r#"digraph  {
            "1" -> "2" [label="("];
            "2" -> "3" [label=")"];
            "3" -> "4" [label="("];
            "4" -> "5" [label=")"];
            "5" -> "6" [label="("];
            "6" -> "7" [label=")"];
            "7" -> "8" [label="("];
            "8" -> "9" [label=")"];
        }"#;
        LabeledGraph::from_dot(text).unwrap()
    }

    fn balanced_parentheses() -> Cfg {
        Cfg::parse("S -> $\nS -> S S\nS -> ( S )\n", "S").unwrap()
    }

    #[test]
    fn kron_rpq_scenario() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("0", "a", "1");
        graph.add_edge("1", "b", "2");
        graph.add_edge("2", "c", "2");
        graph.add_edge("2", "d", "3");
        let regex = Regex::parse("a b (c | d)*").unwrap();
        let starts = indices(&graph, &["0"]);
        let finals = indices(&graph, &["2", "3"]);
        let pairs = rpq_kron(&graph, &regex, Some(&starts), Some(&finals));
        assert_eq!(
            name_pairs(&graph, &pairs),
            expect_pairs(&[("0", "2"), ("0", "3")])
        );
    }

    #[test]
    fn bfs_rpq_whole_set_scenario() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("0", "a", "1");
        graph.add_edge("1", "a", "0");
        let regex = Regex::parse("a*").unwrap();
        let starts = indices(&graph, &["0"]);
        let finals = indices(&graph, &["0", "1"]);
        let result = rpq_bfs(&graph, &regex, Some(&starts), Some(&finals), false);
        let expected: AHashSet<usize> = indices(&graph, &["0", "1"]).into_iter().collect();
        assert_eq!(result, BfsRpqResult::Vertices(expected));
    }

    #[test]
    fn bfs_rpq_per_start_scenario() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("0", "a", "1");
        graph.add_edge("1", "a", "2");
        graph.add_edge("2", "d", "2");
        graph.add_edge("1", "c", "1");
        let regex = Regex::parse("a (c* | d*)").unwrap();
        let starts = indices(&graph, &["0", "1"]);
        let finals = indices(&graph, &["1", "2"]);
        match rpq_bfs(&graph, &regex, Some(&starts), Some(&finals), true) {
            BfsRpqResult::Pairs(pairs) => assert_eq!(
                name_pairs(&graph, &pairs),
                expect_pairs(&[("0", "1"), ("1", "2")])
            ),
            BfsRpqResult::Vertices(_) => unreachable!(),
        }
    }

    #[test]
    fn rpq_engines_agree() {
        let graph = LabeledGraph::two_cycles(3, 2, ("a", "b"));
        let regex = Regex::parse("a a b | b b").unwrap();
        let kron = rpq_kron(&graph, &regex, None, None);
        match rpq_bfs(&graph, &regex, None, None, true) {
            BfsRpqResult::Pairs(pairs) => assert_eq!(pairs, kron),
            BfsRpqResult::Vertices(_) => unreachable!(),
        }
    }

    #[test]
    fn balanced_parentheses_all_engines() {
        let graph = bracket_chain();
        let cfg = balanced_parentheses();
        let starts = indices(&graph, &["1"]);
        let finals = indices(&graph, &["2", "3", "4", "5", "6", "7", "8", "9"]);
        let expected = expect_pairs(&[("1", "3"), ("1", "5"), ("1", "7"), ("1", "9")]);
        for algorithm in [
            CfpqAlgorithm::Hellings,
            CfpqAlgorithm::Matrix,
            CfpqAlgorithm::Tensor,
        ] {
            let pairs = cfpq(&graph, &cfg, algorithm, Some(&starts), Some(&finals), "S");
            assert_eq!(name_pairs(&graph, &pairs), expected, "{}", algorithm);
        }
    }

    #[test]
    fn cfpq_engines_produce_equal_triples() {
        let graph = LabeledGraph::two_cycles(2, 1, ("a", "b"));
        let cfg = Cfg::parse("S -> a S | b S | $\n", "S").unwrap();
        let filter = |triples: AHashSet<Triple>| -> AHashSet<Triple> {
            triples
                .into_iter()
                .filter(|(_, variable, _)| variable == "S")
                .collect()
        };
        let hellings = filter(hellings_closure(&graph, &cfg));
        let matrix = filter(matrix_closure(&graph, &cfg));
        let tensor = filter(tensor_closure(&graph, &cfg));
        assert_eq!(hellings, matrix);
        assert_eq!(hellings, tensor);
        // (a | b)* relates every pair of the strongly connected graph.
        let n = graph.n_nodes();
        assert_eq!(hellings.len(), n * n);
    }

    #[test]
    fn wcnf_input_gives_same_answers() {
        let graph = LabeledGraph::two_cycles(2, 3, ("a", "b"));
        let cfg = Cfg::parse("S -> a S b\nS -> a b\n", "S").unwrap();
        let wcnf = cfg.to_wcnf();
        let keep_start = |triples: AHashSet<Triple>| -> AHashSet<Triple> {
            triples
                .into_iter()
                .filter(|(_, variable, _)| variable == "S")
                .collect()
        };
        assert_eq!(
            keep_start(hellings_closure(&graph, &cfg)),
            keep_start(hellings_closure(&graph, &wcnf))
        );
    }

    #[test]
    fn anbn_on_two_cycles() {
        let graph = LabeledGraph::two_cycles(2, 3, ("a", "b"));
        let cfg = Cfg::parse("S -> a S b\nS -> a b\n", "S").unwrap();
        let zero = graph.node_index("0").unwrap();
        for algorithm in [
            CfpqAlgorithm::Hellings,
            CfpqAlgorithm::Matrix,
            CfpqAlgorithm::Tensor,
        ] {
            let pairs = cfpq(&graph, &cfg, algorithm, None, None, "S");
            // a^12 b^12 closes both cycles through the shared node.
            assert!(pairs.contains(&(zero, zero)), "{}", algorithm);
        }
    }

    #[test]
    fn single_edge_start_variable_filter() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("u", "a", "v");
        let cfg = Cfg::parse("S -> a\n", "S").unwrap();
        let pairs = cfpq(&graph, &cfg, CfpqAlgorithm::Matrix, None, None, "S");
        assert_eq!(name_pairs(&graph, &pairs), expect_pairs(&[("u", "v")]));
        assert!(cfpq(&graph, &cfg, CfpqAlgorithm::Matrix, None, None, "T").is_empty());
    }

    #[test]
    fn empty_grammar_yields_empty_result() {
        let graph = bracket_chain();
        // The start variable never generates a terminal word.
        let cfg = Cfg::parse("S -> S S\n", "S").unwrap();
        for algorithm in [
            CfpqAlgorithm::Hellings,
            CfpqAlgorithm::Matrix,
            CfpqAlgorithm::Tensor,
        ] {
            assert!(
                cfpq(&graph, &cfg, algorithm, None, None, "S").is_empty(),
                "{}",
                algorithm
            );
        }
    }

    #[test]
    fn start_and_final_sets_restrict_rpq() {
        let graph = LabeledGraph::two_cycles(3, 2, ("a", "b"));
        let regex = Regex::parse("a a").unwrap();
        let all = rpq_kron(&graph, &regex, None, None);
        let restricted = rpq_kron(
            &graph,
            &regex,
            Some(&indices(&graph, &["0"])),
            Some(&indices(&graph, &["2"])),
        );
        assert!(restricted.is_subset(&all));
        assert_eq!(
            name_pairs(&graph, &restricted),
            expect_pairs(&[("0", "2")])
        );
    }

    #[test]
    fn automaton_round_trip_accepts_same_words() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("0", "a", "1");
        graph.add_edge("1", "b", "0");
        let nfa = graph.to_nfa(Some(&[0]), Some(&[0]));
        let round_tripped = MatrixAutomaton::from_nfa(&nfa).to_nfa();
        for word in [
            vec![],
            vec!["a", "b"],
            vec!["a"],
            vec!["a", "b", "a", "b"],
            vec!["b"],
        ] {
            assert_eq!(nfa.accepts(&word), round_tripped.accepts(&word), "{:?}", word);
        }
    }

    #[test]
    fn graph_info_snapshot() {
        let mut graph = LabeledGraph::new();
        graph.add_edge("u", "a", "v");
        insta::assert_snapshot!(format!("{:#?}", graph.info()), @r###"
        GraphInfo {
            nodes: 2,
            edges: 1,
            labels: [
                "a",
            ],
        }
        "###);
    }

    #[test]
    fn dot_file_round_trip() {
        let graph = LabeledGraph::two_cycles(3, 2, ("a", "b"));
        let path = std::env::temp_dir().join("cfpq_two_cycles_test.dot");
        graph.write_dot_file(&path).unwrap();
        let reparsed = LabeledGraph::read_dot_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(reparsed.n_nodes(), graph.n_nodes());
        assert_eq!(reparsed.info(), graph.info());
    }

    #[test]
    fn dot_round_trip_preserves_query_results() {
        let graph = LabeledGraph::two_cycles(2, 1, ("a", "b"));
        let reparsed = LabeledGraph::from_dot(&graph.to_dot()).unwrap();
        let cfg = balanced_parentheses();
        assert_eq!(
            cfpq(&graph, &cfg, CfpqAlgorithm::Hellings, None, None, "S").len(),
            cfpq(&reparsed, &cfg, CfpqAlgorithm::Hellings, None, None, "S").len()
        );
        let regex = Regex::parse("a b*").unwrap();
        assert_eq!(
            rpq_kron(&graph, &regex, None, None).len(),
            rpq_kron(&reparsed, &regex, None, None).len()
        );
    }
}
