//! Property tests for vector index search ordering and persistence.

use std::collections::HashMap;

use medibot_rag::document::Chunk;
use medibot_rag::index::VectorIndex;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-3 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn make_chunk(i: usize, text: String) -> Chunk {
    let mut metadata = HashMap::new();
    metadata.insert("page".to_string(), (i % 7).to_string());
    Chunk {
        id: Chunk::make_id(&format!("doc_{}", i % 3), i * 10),
        text,
        start: i * 10,
        end: i * 10 + 10,
        document_id: format!("doc_{}", i % 3),
        metadata,
    }
}

fn arb_entries(dim: usize) -> impl Strategy<Value = Vec<(Chunk, Vec<f32>)>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_normalized_embedding(dim)), 1..20).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (text, embedding))| (make_chunk(i, text), embedding))
                .collect()
        },
    )
}

/// **Property: search ordering**
/// *For any* set of entries and query, results are ordered by descending
/// cosine similarity and there are exactly `min(k, len)` of them.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            entries in arb_entries(DIM),
            query in arb_normalized_embedding(DIM),
            k in 0usize..25,
        ) {
            let count = entries.len();
            let index = VectorIndex::build(entries).unwrap();
            let results = index.query(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));
            for window in results.hits.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

/// **Property: self match**
/// *For any* vector `v`, an index containing only `v` returns `v`'s chunk
/// first with a score of (approximately) one.
mod prop_self_match {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn single_vector_is_its_own_best_match(v in arb_normalized_embedding(DIM)) {
            let chunk = make_chunk(0, "only entry".to_string());
            let index = VectorIndex::build(vec![(chunk.clone(), v.clone())]).unwrap();
            let results = index.query(&v, 1).unwrap();

            prop_assert_eq!(results.len(), 1);
            prop_assert_eq!(&results.hits[0].chunk, &chunk);
            prop_assert!((results.hits[0].score - 1.0).abs() < 1e-4);
        }
    }
}

/// **Property: persistence round-trip**
/// *For any* index, `load(persist(index))` ranks every query identically.
mod prop_persist_round_trip {
    use super::*;

    const DIM: usize = 12;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn reloaded_index_ranks_identically(
            entries in arb_entries(DIM),
            queries in proptest::collection::vec(arb_normalized_embedding(DIM), 1..5),
            k in 1usize..10,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (original, reloaded) = rt.block_on(async {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("index.json");
                let index = VectorIndex::build(entries).unwrap();
                index.persist(&path).await.unwrap();
                let reloaded = VectorIndex::load(&path).await.unwrap();
                (index, reloaded)
            });

            prop_assert_eq!(original.len(), reloaded.len());
            prop_assert_eq!(original.dimensions(), reloaded.dimensions());
            for query in &queries {
                let before = original.query(query, k).unwrap();
                let after = reloaded.query(query, k).unwrap();
                let before_ids: Vec<&str> = before.iter().map(|h| h.chunk.id.as_str()).collect();
                let after_ids: Vec<&str> = after.iter().map(|h| h.chunk.id.as_str()).collect();
                prop_assert_eq!(before_ids, after_ids);
                prop_assert_eq!(&before, &after);
            }
        }
    }
}

#[tokio::test]
async fn empty_index_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    VectorIndex::build(Vec::new()).unwrap().persist(&path).await.unwrap();

    let reloaded = VectorIndex::load(&path).await.unwrap();
    assert!(reloaded.is_empty());
    assert!(reloaded.query(&[1.0, 0.0], 3).unwrap().is_empty());
}

#[tokio::test]
async fn persist_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let index = VectorIndex::build(vec![(make_chunk(0, "a".into()), vec![1.0, 0.0])]).unwrap();
    index.persist(&path).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["index.json"]);
}
