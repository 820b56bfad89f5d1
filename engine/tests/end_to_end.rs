//! Browse and search a small concordance laid out on disk

use concordancia_lib::{
    apply_filters, Dataset, DirFetcher, Engine, EngineConfig, FilterSpec, MatchRule, Testament,
    TestamentFilter,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn write(root: &Path, relative: &str, body: serde_json::Value) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body.to_string()).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(root, "concordancia/lista_letras.json", json!({ "a": ["a1", "a2"] }));
    write(
        root,
        "concordancia/a/a1.json",
        json!({ "a": [{
            "palavra": "amor",
            "ocorrencias": 2,
            "concordancias": [
                { "referencia": "João 3:16", "texto": "Deus amou o mundo de tal maneira, esse é o amor" },
                { "referencia": "Cantares 8:7", "texto": "as muitas águas não podem apagar este amor" }
            ]
        }]}),
    );
    write(
        root,
        "concordancia/a/a2.json",
        json!({ "a": [{
            "palavra": "abismo",
            "concordancias": [
                { "referencia": "Gênesis 1:2", "texto": "havia trevas sobre a face do abismo" }
            ]
        }]}),
    );

    dir
}

#[tokio::test]
async fn test_browse_letter() {
    let dir = fixture();
    let engine = Engine::new(Arc::new(DirFetcher::new(dir.path())), Dataset::Concordance, EngineConfig::default());

    let page = engine.page("a", 0).await;
    let words: Vec<&str> = page.entries.iter().map(|e| e.headword.as_str()).collect();
    assert_eq!(words, vec!["amor", "abismo"]);
    assert_eq!(page.total_count, 2);
    assert!(!page.has_more);
    assert!(!page.fallback);

    let again = engine.page("a", 0).await;
    assert_eq!(page, again);
}

#[tokio::test]
async fn test_search_then_filter() {
    let dir = fixture();
    let engine = Engine::new(Arc::new(DirFetcher::new(dir.path())), Dataset::Concordance, EngineConfig::default());

    let results = engine.search("amor").await.unwrap();
    assert_eq!(results.total, 1);
    let hit = &results.hits[0];
    assert_eq!(hit.entry.headword, "amor");
    assert!(hit.exact_match);
    assert_eq!(hit.matched_by, MatchRule::Headword);

    let old_testament = FilterSpec {
        testament: TestamentFilter::Only(Testament::Old),
        ..FilterSpec::default()
    };
    let narrowed = apply_filters(&results.entries(), &old_testament);
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].occurrence_count(), 1);
    assert_eq!(narrowed[0].occurrences[0].reference, "Cantares 8:7");
}

#[tokio::test]
async fn test_missing_data_directory_serves_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(Arc::new(DirFetcher::new(dir.path())), Dataset::Concordance, EngineConfig::default());

    assert!(engine.catalog().await.fallback);
    let page = engine.page("a", 0).await;
    assert!(page.fallback);
    assert_eq!(page.entries[0].headword, "exemplo");
    assert_eq!(engine.stats().cached_pages, 0);
}
