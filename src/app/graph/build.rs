use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::kg::GraphPayload;
use crate::util::stable_pair;

use super::super::config::LayoutConfig;
use super::super::{Link, Node};

const SEED_RADIUS: f32 = 10.0;
const SEED_JITTER: f32 = 2.0;
const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// What the adapter had to drop or invent while turning a payload into a layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct BuildReport {
    pub unresolved_relations: usize,
    pub self_loops: usize,
    pub malformed_relations: usize,
    pub synthesized_chain: bool,
}

impl BuildReport {
    pub fn dropped_relations(&self) -> usize {
        self.unresolved_relations + self.self_loops + self.malformed_relations
    }
}

pub(in crate::app) struct BuiltGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// Payload identity of each node, indexed by node id.
    pub keys: Vec<String>,
    pub report: BuildReport,
}

/// Deterministic seed on a sunflower spiral around `center`, nudged by a hash of the
/// entity key so that no two seeds coincide.
pub(in crate::app) fn seed_position(index: usize, key: &str, center: Vec2) -> Vec2 {
    let radius = SEED_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * GOLDEN_ANGLE;
    let (jx, jy) = stable_pair(key);
    center + vec2(angle.cos(), angle.sin()) * radius + vec2(jx, jy) * SEED_JITTER
}

pub(in crate::app) fn build(payload: &GraphPayload, config: &LayoutConfig, center: Vec2) -> BuiltGraph {
    let mut index_by_key = HashMap::with_capacity(payload.entities.len());
    let mut nodes = Vec::with_capacity(payload.entities.len());
    let mut keys = Vec::with_capacity(payload.entities.len());

    for (id, entity) in payload.entities.iter().enumerate() {
        // Duplicate keys keep their own node; relations resolve to the first one.
        index_by_key.entry(entity.key.as_str()).or_insert(id);
        nodes.push(Node {
            id,
            label: entity.text.clone(),
            category: entity.category.clone(),
            value: entity.value.clone(),
            world_pos: seed_position(id, &entity.key, center),
            velocity: Vec2::ZERO,
            fx: None,
            fy: None,
            radius: config.node_radius,
        });
        keys.push(entity.key.clone());
    }

    let mut report = BuildReport {
        malformed_relations: payload.malformed_relations,
        ..BuildReport::default()
    };
    let mut links = Vec::with_capacity(payload.relations.len());

    for relation in &payload.relations {
        let (Some(&source), Some(&target)) = (
            index_by_key.get(relation.source.as_str()),
            index_by_key.get(relation.target.as_str()),
        ) else {
            log::debug!(
                "dropping relation {} -> {}: endpoint not in entity set",
                relation.source,
                relation.target
            );
            report.unresolved_relations += 1;
            continue;
        };

        if source == target {
            log::debug!("dropping self-relation on {}", relation.source);
            report.self_loops += 1;
            continue;
        }

        links.push(Link {
            source,
            target,
            rest_length: config.link_distance,
            relation: relation.relation.clone(),
        });
    }

    let no_relations_supplied = payload.relations.is_empty() && payload.malformed_relations == 0;
    if no_relations_supplied && nodes.len() > 1 {
        log::debug!("no relations supplied; chaining {} entities", nodes.len());
        links.extend((1..nodes.len()).map(|index| Link {
            source: index - 1,
            target: index,
            rest_length: config.link_distance,
            relation: None,
        }));
        report.synthesized_chain = true;
    }

    if report.dropped_relations() > 0 {
        log::info!(
            "dropped {} relation(s): {} unresolved, {} self-loops, {} malformed",
            report.dropped_relations(),
            report.unresolved_relations,
            report.self_loops,
            report.malformed_relations
        );
    }

    BuiltGraph {
        nodes,
        links,
        keys,
        report,
    }
}

#[cfg(test)]
mod tests {
    use crate::kg::parse_graph_payload;

    use super::*;

    const CENTER: Vec2 = vec2(400.0, 300.0);

    fn build_json(raw: &str) -> BuiltGraph {
        let payload = parse_graph_payload(raw).unwrap();
        build(&payload, &LayoutConfig::default(), CENTER)
    }

    #[test]
    fn ids_are_dense_in_input_order() {
        let graph = build_json(
            r#"{"nodes": [
                {"id": "b", "text": "Beta", "type": "ORG"},
                {"id": "a", "text": "Alpha", "type": "PERSON"},
                {"id": "c", "text": "Gamma", "type": "GPE"}
            ], "edges": [{"source": "a", "target": "c", "relation": "lives_in"}]}"#,
        );

        let ids = graph.nodes.iter().map(|node| node.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(graph.keys, vec!["b", "a", "c"]);
        assert_eq!(graph.links.len(), 1);
        assert_eq!((graph.links[0].source, graph.links[0].target), (1, 2));
        assert_eq!(graph.links[0].relation.as_deref(), Some("lives_in"));
        assert_eq!(graph.links[0].rest_length, 150.0);
        assert!(!graph.report.synthesized_chain);
    }

    #[test]
    fn unknown_endpoint_drops_the_relation_without_chaining() {
        let graph = build_json(
            r#"{"nodes": [{"id": 1}, {"id": 2}], "edges": [{"source": 1, "target": 9}]}"#,
        );

        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.links.is_empty());
        assert_eq!(graph.report.unresolved_relations, 1);
        assert!(!graph.report.synthesized_chain);
    }

    #[test]
    fn missing_relations_synthesize_a_chain() {
        let graph = build_json(r#"{"nodes": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}]}"#);

        let pairs = graph
            .links
            .iter()
            .map(|link| (link.source, link.target))
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 3)]);
        assert!(graph.report.synthesized_chain);
    }

    #[test]
    fn single_entity_gets_no_chain() {
        let graph = build_json(r#"{"nodes": [{"id": 1}], "edges": []}"#);
        assert!(graph.links.is_empty());
        assert!(!graph.report.synthesized_chain);
    }

    #[test]
    fn self_loops_are_dropped_and_counted() {
        let graph = build_json(
            r#"{"nodes": [{"id": 1}, {"id": 2}], "edges": [
                {"source": 1, "target": 1},
                {"source": 1, "target": 2}
            ]}"#,
        );
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.report.self_loops, 1);
        assert_eq!(graph.report.dropped_relations(), 1);
    }

    #[test]
    fn duplicate_keys_are_kept_and_resolve_to_first() {
        let graph = build_json(
            r#"{"nodes": [{"id": 7, "text": "A"}, {"id": 7, "text": "B"}, {"id": 8}],
                "edges": [{"source": 8, "target": 7}]}"#,
        );
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!((graph.links[0].source, graph.links[0].target), (2, 0));
    }

    #[test]
    fn seeds_are_distinct_deterministic_and_near_center() {
        let first = build_json(r#"{"nodes": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}]}"#);
        let second = build_json(r#"{"nodes": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}]}"#);

        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert_eq!(a.world_pos, b.world_pos);
            assert!((a.world_pos - CENTER).length() < 40.0);
            assert_eq!(a.radius, 18.0);
            assert!(!a.is_pinned());
        }
        for (index, node) in first.nodes.iter().enumerate() {
            for other in &first.nodes[index + 1..] {
                assert!((node.world_pos - other.world_pos).length() > 1.0);
            }
        }
    }
}
