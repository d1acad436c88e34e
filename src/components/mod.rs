pub mod rule_graph;
