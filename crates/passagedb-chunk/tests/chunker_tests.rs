use passagedb_chunk::{chunk_id, Chunker, ChunkerConfig, WhitespaceTokenizer};
use passagedb_core::error::Error;
use passagedb_core::types::Document;

fn doc(doc_id: &str) -> Document {
    Document {
        doc_id: doc_id.to_string(),
        title: None,
        year: None,
        source_url: None,
        filename: None,
    }
}

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn window_arithmetic_matches_contract() {
    // 1000 tokens with window 512 / overlap 64 must produce exactly
    // [0,512) [448,960) [896,1000).
    let text = words(1000);
    let chunker =
        Chunker::new(ChunkerConfig { window: 512, overlap: 64 }, &WhitespaceTokenizer).expect("chunker");
    let chunks = chunker.chunk(&doc("D1"), &text).expect("chunk");

    let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.token_start, c.token_end)).collect();
    assert_eq!(spans, vec![(0, 512), (448, 960), (896, 1000)]);
}

#[test]
fn coverage_has_no_gaps_and_exact_overlap() {
    let text = words(1234);
    let cfg = ChunkerConfig { window: 100, overlap: 25 };
    let chunker = Chunker::new(cfg, &WhitespaceTokenizer).expect("chunker");
    let chunks = chunker.chunk(&doc("D1"), &text).expect("chunk");

    assert_eq!(chunks[0].token_start, 0);
    assert_eq!(chunks.last().expect("nonempty").token_end, 1234);
    for pair in chunks.windows(2) {
        // consecutive windows overlap by exactly the configured amount
        assert_eq!(pair[1].token_start, pair[0].token_end - cfg.overlap);
        assert!(pair[1].position == pair[0].position + 1);
    }
}

#[test]
fn short_document_is_one_chunk() {
    let text = words(40);
    let chunker =
        Chunker::new(ChunkerConfig { window: 512, overlap: 64 }, &WhitespaceTokenizer).expect("chunker");
    let chunks = chunker.chunk(&doc("D1"), &text).expect("chunk");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].token_start, 0);
    assert_eq!(chunks[0].token_end, 40);
    assert_eq!(chunks[0].chunk_id, chunk_id("D1", 0));
}

#[test]
fn exact_window_is_one_chunk() {
    let text = words(512);
    let chunker =
        Chunker::new(ChunkerConfig { window: 512, overlap: 64 }, &WhitespaceTokenizer).expect("chunker");
    let chunks = chunker.chunk(&doc("D1"), &text).expect("chunk");
    assert_eq!(chunks.len(), 1);
}

#[test]
fn empty_text_yields_no_chunks() {
    let chunker = Chunker::new(ChunkerConfig::default(), &WhitespaceTokenizer).expect("chunker");
    assert!(chunker.chunk(&doc("D1"), "").expect("chunk").is_empty());
    assert!(chunker.chunk(&doc("D1"), "   \n\t ").expect("chunk").is_empty());
}

#[test]
fn char_offsets_slice_back_to_chunk_text() {
    let text = "alpha beta gamma delta epsilon zeta eta theta";
    let chunker =
        Chunker::new(ChunkerConfig { window: 3, overlap: 1 }, &WhitespaceTokenizer).expect("chunker");
    let chunks = chunker.chunk(&doc("D1"), text).expect("chunk");
    for c in &chunks {
        assert_eq!(c.text, &text[c.char_start..c.char_end]);
    }
    assert_eq!(chunks[0].text, "alpha beta gamma");
    assert_eq!(chunks[1].text, "gamma delta epsilon");
}

#[test]
fn chunking_is_deterministic() {
    let text = words(777);
    let cfg = ChunkerConfig { window: 64, overlap: 16 };
    let chunker = Chunker::new(cfg, &WhitespaceTokenizer).expect("chunker");
    let a = chunker.chunk(&doc("D1"), &text).expect("chunk");
    let b = chunker.chunk(&doc("D1"), &text).expect("chunk");
    assert_eq!(a, b);
}

#[test]
fn rejects_degenerate_geometry() {
    assert!(matches!(
        Chunker::new(ChunkerConfig { window: 0, overlap: 0 }, &WhitespaceTokenizer),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        Chunker::new(ChunkerConfig { window: 64, overlap: 64 }, &WhitespaceTokenizer),
        Err(Error::Validation(_))
    ));
}
