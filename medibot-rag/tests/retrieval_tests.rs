//! Retriever boundary behaviour and chunk coverage properties.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{DIM, FixedEmbedder, FlakyEmbedder};
use medibot_rag::{
    Chunk, Document, Embedder, HashEmbedder, MedibotError, Retriever, TextChunker, VectorIndex,
    chunk,
};
use medibot_rag::chunking::Chunker;
use proptest::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn three_entry_index(embedder: &dyn Embedder) -> Arc<VectorIndex> {
    let docs = [
        Document::new("aspirin", "Aspirin reduces fever."),
        Document::new("ibuprofen", "Ibuprofen reduces inflammation."),
        Document::new("insulin", "Insulin regulates blood sugar."),
    ];
    let mut entries = Vec::new();
    for doc in &docs {
        for c in chunk(doc, 200, 0).unwrap() {
            let v = embedder.embed(&c.text).await.unwrap();
            entries.push((c, v));
        }
    }
    Arc::new(VectorIndex::build(entries).unwrap())
}

#[tokio::test]
async fn k_zero_returns_empty_without_embedding() {
    let embedder = Arc::new(FlakyEmbedder::new());
    let index = three_entry_index(embedder.as_ref()).await;
    embedder.fail.store(true, Ordering::SeqCst);

    let retriever = Retriever::new(index, embedder, TIMEOUT);
    assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn large_k_returns_every_entry_once() {
    let embedder = Arc::new(HashEmbedder::new(DIM).unwrap());
    let index = three_entry_index(embedder.as_ref()).await;
    let retriever = Retriever::new(index, embedder, TIMEOUT);

    let result = retriever.retrieve("What reduces fever?", 1000).await.unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.hits[0].chunk.document_id, "aspirin");
}

#[tokio::test]
async fn retrieval_is_deterministic() {
    let embedder = Arc::new(HashEmbedder::new(DIM).unwrap());
    let index = three_entry_index(embedder.as_ref()).await;
    let retriever = Retriever::new(index, embedder, TIMEOUT);

    let a = retriever.retrieve("blood sugar", 3).await.unwrap();
    let b = retriever.retrieve("blood sugar", 3).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn wrong_dimensionality_is_embedding_unavailable() {
    let index = three_entry_index(&HashEmbedder::new(DIM).unwrap()).await;
    let retriever = Retriever::new(index, Arc::new(FixedEmbedder(vec![1.0; 3])), TIMEOUT);

    let err = retriever.retrieve("What reduces fever?", 3).await.unwrap_err();
    assert!(matches!(err, MedibotError::EmbeddingUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_vector_is_embedding_unavailable() {
    let index = three_entry_index(&HashEmbedder::new(DIM).unwrap()).await;
    let retriever = Retriever::new(index, Arc::new(FixedEmbedder(Vec::new())), TIMEOUT);

    let err = retriever.retrieve("What reduces fever?", 3).await.unwrap_err();
    assert!(matches!(err, MedibotError::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn non_finite_vector_is_embedding_unavailable() {
    let index = three_entry_index(&HashEmbedder::new(DIM).unwrap()).await;
    let mut vector = vec![0.1; DIM];
    vector[7] = f32::NAN;
    let retriever = Retriever::new(index, Arc::new(FixedEmbedder(vector)), TIMEOUT);

    let err = retriever.retrieve("What reduces fever?", 3).await.unwrap_err();
    assert!(matches!(err, MedibotError::EmbeddingUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn tokenless_question_retrieves_nothing() {
    let embedder = Arc::new(HashEmbedder::new(DIM).unwrap());
    let index = three_entry_index(embedder.as_ref()).await;
    let retriever = Retriever::new(index, embedder, TIMEOUT);

    assert!(retriever.retrieve("?!", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn min_score_filters_weak_hits() {
    let embedder = Arc::new(HashEmbedder::new(DIM).unwrap());
    let index = three_entry_index(embedder.as_ref()).await;
    let retriever = Retriever::new(index, embedder, TIMEOUT).with_min_score(Some(0.99));

    let result = retriever.retrieve("Aspirin reduces fever.", 3).await.unwrap();
    let docs: Vec<&str> = result.iter().map(|h| h.chunk.document_id.as_str()).collect();
    assert_eq!(docs, ["aspirin"]);
}

fn covers_without_gaps(chunks: &[Chunk], len: usize) -> bool {
    let mut reached = 0;
    for c in chunks {
        if c.start > reached || c.end <= c.start {
            return false;
        }
        reached = reached.max(c.end);
    }
    reached == len
}

/// **Property: chunk coverage**
/// *For any* document and valid chunk configuration, the chunk spans cover
/// the full text with no gaps, each chunk's text matches its span, and no
/// chunk exceeds `chunk_size` characters.
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_cover_document(
            text in "[a-zA-Z0-9 .,!?\n]{1,400}",
            chunk_size in 1usize..80,
            overlap_fraction in 0.0f32..1.0,
            tolerance in 0.0f32..0.9,
        ) {
            let overlap = ((chunk_size as f32) * overlap_fraction) as usize;
            let overlap = overlap.min(chunk_size - 1);
            let doc = Document::new("doc", text.clone());
            let chunks = TextChunker::new(chunk_size, overlap)
                .unwrap()
                .with_tolerance(tolerance)
                .chunk(&doc);

            let chars: Vec<char> = text.chars().collect();
            prop_assert!(covers_without_gaps(&chunks, chars.len()));
            for c in &chunks {
                let span: String = chars[c.start..c.end].iter().collect();
                prop_assert_eq!(&c.text, &span);
                prop_assert!(c.end - c.start <= chunk_size);
                prop_assert_eq!(&c.id, &Chunk::make_id("doc", c.start));
            }
        }

        #[test]
        fn chunking_is_deterministic(
            text in "[a-z .\n]{0,300}",
            chunk_size in 1usize..60,
        ) {
            let doc = Document::new("doc", text);
            let overlap = chunk_size / 3;
            prop_assert_eq!(
                chunk(&doc, chunk_size, overlap).unwrap(),
                chunk(&doc, chunk_size, overlap).unwrap()
            );
        }
    }
}
