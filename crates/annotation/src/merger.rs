use std::collections::HashMap;
use tracing::debug;

use crate::schema::{Annotation, Denotation, Relation};
use crate::text;

/// Reassembles chunk-level annotations into one annotation.
///
/// Chunk texts are concatenated in order, with a space appended after any
/// chunk ending in `.`. Denotation ids are renumbered `T1, T2, ...` across
/// all chunks, spans are shifted by the running offset, and relations are
/// remapped through the owning chunk's id map. A relation whose endpoints do
/// not both resolve inside its chunk is dropped.
pub struct AnnotationMerger<'a> {
    chunks: &'a [Annotation],
}

#[derive(Default)]
struct MergeState {
    text: String,
    offset: usize,
    next_id: usize,
    denotations: Vec<Denotation>,
    relations: Vec<Relation>,
}

impl<'a> AnnotationMerger<'a> {
    pub fn new(chunks: &'a [Annotation]) -> Self {
        Self { chunks }
    }

    pub fn merged(&self) -> Annotation {
        let initial = MergeState {
            next_id: 1,
            ..Default::default()
        };
        let state = self
            .chunks
            .iter()
            .enumerate()
            .fold(initial, |state, (index, chunk)| merge_chunk(state, index, chunk));

        Annotation {
            text: state.text,
            denotations: state.denotations,
            relations: state.relations,
        }
    }
}

fn merge_chunk(mut state: MergeState, index: usize, chunk: &Annotation) -> MergeState {
    let mut id_map: HashMap<&str, String> = HashMap::with_capacity(chunk.denotations.len());

    for denotation in &chunk.denotations {
        let new_id = format!("T{}", state.next_id);
        state.next_id += 1;
        id_map.insert(denotation.id.as_str(), new_id.clone());
        state.denotations.push(Denotation {
            id: new_id,
            span: denotation.span.shifted(state.offset),
            obj: denotation.obj.clone(),
        });
    }

    for relation in &chunk.relations {
        match (id_map.get(relation.subj.as_str()), id_map.get(relation.obj.as_str())) {
            (Some(subj), Some(obj)) => state.relations.push(Relation {
                id: relation.id.clone(),
                pred: relation.pred.clone(),
                subj: subj.clone(),
                obj: obj.clone(),
            }),
            _ => debug!(chunk = index, relation = %relation, "Dropping unresolvable relation"),
        }
    }

    state.text.push_str(&chunk.text);
    state.offset += text::char_len(&chunk.text);
    if chunk.text.ends_with('.') {
        state.text.push(' ');
        state.offset += 1;
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_empty_text() {
        let merged = AnnotationMerger::new(&[]).merged();
        assert_eq!(merged, Annotation::new(""));
    }

    #[test]
    fn ids_are_renumbered_across_chunks() {
        let chunks = vec![
            Annotation::new("Alice met Bob.")
                .with_denotations(vec![
                    Denotation::new("T1", 0, 5, "Person"),
                    Denotation::new("T2", 10, 13, "Person"),
                ])
                .with_relations(vec![Relation::new("met", "T1", "T2")]),
            Annotation::new("Carol likes Dave.")
                .with_denotations(vec![
                    Denotation::new("T1", 0, 5, "Person"),
                    Denotation::new("T2", 12, 16, "Person"),
                ])
                .with_relations(vec![Relation::new("likes", "T1", "T2")]),
        ];

        let merged = AnnotationMerger::new(&chunks).merged();

        assert_eq!(merged.text, "Alice met Bob. Carol likes Dave. ");
        let ids: Vec<&str> = merged.denotations.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["T1", "T2", "T3", "T4"]);
        assert_eq!(merged.denotations[2], Denotation::new("T3", 15, 20, "Person"));
        assert_eq!(merged.relations[1], Relation::new("likes", "T3", "T4"));
    }

    #[test]
    fn no_padding_without_trailing_period() {
        let chunks = vec![
            Annotation::new("東京は首都。"),
            Annotation::new("大阪")
                .with_denotations(vec![Denotation::new("X9", 0, 2, "city")]),
        ];

        let merged = AnnotationMerger::new(&chunks).merged();

        assert_eq!(merged.text, "東京は首都。大阪");
        assert_eq!(merged.denotations[0].span.begin, 6);
    }

    #[test]
    fn dangling_relations_are_dropped() {
        let chunks = vec![
            Annotation::new("Elon Musk is a member")
                .with_denotations(vec![Denotation::new("T1", 0, 9, "Person")])
                .with_relations(vec![Relation::new("member_of", "T1", "T2")]),
        ];

        let merged = AnnotationMerger::new(&chunks).merged();

        assert_eq!(merged.denotations.len(), 1);
        assert!(merged.relations.is_empty());
    }

    #[test]
    fn relation_endpoints_do_not_leak_between_chunks() {
        // T1 of the second chunk must not resolve through the first chunk's map
        let chunks = vec![
            Annotation::new("A")
                .with_denotations(vec![Denotation::new("T1", 0, 1, "x")]),
            Annotation::new("B")
                .with_denotations(vec![Denotation::new("T2", 0, 1, "x")])
                .with_relations(vec![Relation::new("r", "T1", "T2")]),
        ];

        let merged = AnnotationMerger::new(&chunks).merged();

        assert!(merged.relations.is_empty());
    }
}
