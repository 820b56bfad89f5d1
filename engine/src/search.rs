//! Full-corpus search across every letter partition

use crate::catalog::ShardCatalog;
use crate::entry::{Entry, Occurrence};
use crate::error::{EngineError, Result};
use crate::loader::ShardLoader;
use futures_util::future::join_all;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// Which rule admitted an entry into the results, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Headword,
    Text,
    Source,
    CrossReference,
}

/// Case-insensitive matcher for one search term.
///
/// Substring tests are used for headwords, sources and cross references;
/// verse and definition text require the term as a whole word.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    term: String,
    term_lower: String,
    pattern: Regex,
}

impl WordMatcher {
    pub fn new(term: &str) -> Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EngineError::InvalidQuery("search term is empty".to_string()));
        }

        let pattern = Regex::new(&case_insensitive_pattern(term))
            .map_err(|e| EngineError::InvalidQuery(e.to_string()))?;

        Ok(Self {
            term: term.to_string(),
            term_lower: term.to_lowercase(),
            pattern,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn contained_in(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.term_lower)
    }

    pub fn is_exact(&self, headword: &str) -> bool {
        headword.to_lowercase() == self.term_lower
    }

    /// Whole-word occurrence anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.next_word(text, 0).is_some()
    }

    /// Byte ranges of every whole-word occurrence, for highlighting
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        while let Some(range) = self.next_word(text, start) {
            start = range.end.max(start + 1);
            ranges.push(range);
            if start > text.len() {
                break;
            }
        }
        ranges
    }

    fn next_word(&self, text: &str, mut start: usize) -> Option<Range<usize>> {
        while start <= text.len() {
            let found = self.pattern.find_at(text, start)?;
            if is_word_bounded(text, found.start(), found.end()) {
                return Some(found.start()..found.end());
            }
            // retry from the next character inside the rejected candidate
            start = found.start() + text[found.start()..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }
}

/// Literal pattern matching either case of every cased character
fn case_insensitive_pattern(term: &str) -> String {
    term.chars()
        .map(|c| {
            let lower: Vec<char> = c.to_lowercase().collect();
            let upper: Vec<char> = c.to_uppercase().collect();
            match (lower.as_slice(), upper.as_slice()) {
                ([l], [u]) if l != u => format!("[{}{}]", l, u),
                _ => regex_lite::escape(&c.to_string()),
            }
        })
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: Entry,
    pub exact_match: bool,
    pub matched_by: MatchRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub term: String,
    pub hits: Vec<SearchHit>,
    pub total: usize,
    pub shards_failed: usize,
}

impl SearchResults {
    pub fn entries(&self) -> Vec<Entry> {
        self.hits.iter().map(|h| h.entry.clone()).collect()
    }
}

/// Apply the match rules to one entry. The first rule that yields something
/// to show wins and decides which occurrences come along.
pub fn evaluate(matcher: &WordMatcher, entry: &Entry) -> Option<SearchHit> {
    let hit = |entry: Entry, matched_by: MatchRule| SearchHit {
        exact_match: matcher.is_exact(&entry.headword),
        entry,
        matched_by,
    };

    if matcher.contained_in(&entry.headword) && entry.is_emittable() {
        return Some(hit(entry.clone(), MatchRule::Headword));
    }

    let matching: Vec<Occurrence> = entry
        .occurrences
        .iter()
        .filter(|o| matcher.is_match(&o.text))
        .cloned()
        .collect();
    if !matching.is_empty() {
        return Some(hit(entry.narrowed(matching), MatchRule::Text));
    }

    if let Some(definition) = &entry.definition {
        let in_additional = definition.additional.as_deref().is_some_and(|a| matcher.is_match(a));
        if matcher.is_match(&definition.text) || in_additional {
            return Some(hit(entry.clone(), MatchRule::Text));
        }
    }

    if !entry.is_emittable() {
        return None;
    }

    if entry.source.as_deref().is_some_and(|s| matcher.contained_in(s)) {
        return Some(hit(entry.clone(), MatchRule::Source));
    }

    if entry.cross_references.iter().any(|r| matcher.contained_in(r)) {
        return Some(hit(entry.clone(), MatchRule::CrossReference));
    }

    None
}

/// Exact headword matches first, then by occurrence count. Stable, so ties
/// keep the a-z traversal order.
pub fn rank(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.exact_match
            .cmp(&a.exact_match)
            .then_with(|| b.entry.occurrence_count().cmp(&a.entry.occurrence_count()))
    });
}

pub struct GlobalSearch {
    catalog: Arc<ShardCatalog>,
    loader: ShardLoader,
    batch_width: usize,
}

impl GlobalSearch {
    pub fn new(catalog: Arc<ShardCatalog>, loader: ShardLoader, batch_width: usize) -> Self {
        Self {
            catalog,
            loader,
            batch_width: batch_width.max(1),
        }
    }

    /// Scan every shard of every letter a-z for `term`.
    ///
    /// A headword already admitted from an earlier shard is not admitted
    /// again: the first hit wins.
    pub async fn search(&self, term: &str) -> Result<SearchResults> {
        let matcher = WordMatcher::new(term)?;
        let catalog = self.catalog.get().await;

        let mut hits: Vec<SearchHit> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut shards_failed = 0;

        for letter in ('a'..='z').map(String::from) {
            let files = catalog.files(&letter);
            if files.is_empty() {
                tracing::debug!(%letter, "No shards listed for letter");
                continue;
            }

            for batch in files.chunks(self.batch_width) {
                let results = join_all(batch.iter().map(|file| self.loader.fetch_shard(&letter, file))).await;
                for result in results {
                    let entries = match result {
                        Ok(entries) => entries,
                        Err(e) => {
                            shards_failed += 1;
                            tracing::warn!(error = %e, "Search skipping shard");
                            continue;
                        }
                    };

                    for entry in &entries {
                        let Some(hit) = evaluate(&matcher, entry) else {
                            continue;
                        };
                        if seen.insert(hit.entry.headword.clone()) {
                            hits.push(hit);
                        } else {
                            tracing::debug!(headword = %hit.entry.headword, "Dropping duplicate headword");
                        }
                    }
                }
            }
        }

        rank(&mut hits);
        tracing::info!(term = matcher.term(), hits = hits.len(), shards_failed, "Global search finished");

        Ok(SearchResults {
            term: matcher.term().to_string(),
            total: hits.len(),
            hits,
            shards_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Dataset, Definition};
    use crate::error::FetchError;
    use crate::fetch::StaticFetcher;
    use serde_json::json;

    fn occ(reference: &str, text: &str) -> Occurrence {
        Occurrence::new(reference, text)
    }

    #[test]
    fn test_whole_word_matching() {
        let cat = WordMatcher::new("cat").unwrap();
        assert!(!cat.is_match("the cats sat"));
        let cats = WordMatcher::new("cats").unwrap();
        assert!(cats.is_match("the cats sat"));
        assert!(cats.is_match("The CATS sat"));
    }

    #[test]
    fn test_accented_words_have_boundaries() {
        let fe = WordMatcher::new("fé").unwrap();
        assert!(fe.is_match("pela fé."));
        assert!(fe.is_match("Fé e obras"));
        assert!(!fe.is_match("café"));

        let irmao = WordMatcher::new("irmão").unwrap();
        assert!(!irmao.is_match("os irmãos"));
        assert!(irmao.is_match("o IRMÃO dele"));
    }

    #[test]
    fn test_find_ranges() {
        let amor = WordMatcher::new("amor").unwrap();
        let text = "Amor, amores e amor.";
        let ranges = amor.find_ranges(text);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&text[ranges[0].clone()], "Amor");
        assert_eq!(&text[ranges[1].clone()], "amor");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let m = WordMatcher::new("a.b").unwrap();
        assert!(m.is_match("x a.b y"));
        assert!(!m.is_match("x axb y"));
    }

    #[test]
    fn test_empty_term_is_rejected() {
        assert!(matches!(WordMatcher::new("   "), Err(EngineError::InvalidQuery(_))));
    }

    #[test]
    fn test_rule_priority() {
        let matcher = WordMatcher::new("luz").unwrap();

        let headword = Entry::new("luzeiro", vec![occ("Gênesis 1:16", "dois grandes luzeiros"), occ("Gênesis 1:3", "haja luz")]);
        let hit = evaluate(&matcher, &headword).unwrap();
        assert_eq!(hit.matched_by, MatchRule::Headword);
        assert_eq!(hit.entry.occurrence_count(), 2);
        assert!(!hit.exact_match);

        let text = Entry::new("trevas", vec![occ("Gênesis 1:2", "havia trevas"), occ("João 1:5", "a luz resplandece nas trevas")]);
        let hit = evaluate(&matcher, &text).unwrap();
        assert_eq!(hit.matched_by, MatchRule::Text);
        assert_eq!(hit.entry.occurrences, vec![occ("João 1:5", "a luz resplandece nas trevas")]);

        let source = Entry::new("dia", vec![occ("Gênesis 1:5", "chamou ao dia")]).with_source("Luz e Vida");
        assert_eq!(evaluate(&matcher, &source).unwrap().matched_by, MatchRule::Source);

        let xref = Entry::new("candeia", vec![occ("Mateus 5:15", "acende uma candeia")])
            .with_cross_references(["lâmpada", "luz"]);
        let hit = evaluate(&matcher, &xref).unwrap();
        assert_eq!(hit.matched_by, MatchRule::CrossReference);
        assert_eq!(hit.entry.occurrence_count(), 1);

        let none = Entry::new("mar", vec![occ("Êxodo 14:21", "o mar se abriu")]);
        assert!(evaluate(&matcher, &none).is_none());
    }

    #[test]
    fn test_headword_without_occurrences_is_not_emitted() {
        let matcher = WordMatcher::new("luz").unwrap();
        let bare = Entry::new("luz", Vec::new()).with_source("luz");
        assert!(evaluate(&matcher, &bare).is_none());
    }

    #[test]
    fn test_dictionary_definition_matches() {
        let matcher = WordMatcher::new("pai").unwrap();
        let entry = Entry::new("Abba", Vec::new()).with_definition(Definition {
            text: "Termo aramaico para pai.".to_string(),
            additional: None,
        });
        let hit = evaluate(&matcher, &entry).unwrap();
        assert_eq!(hit.matched_by, MatchRule::Text);
        assert_eq!(hit.entry.headword, "Abba");
    }

    #[test]
    fn test_rank_is_stable() {
        let matcher = WordMatcher::new("Deus").unwrap();
        let ten = |word: &str| Entry::new(word, (0..10).map(|i| occ(&format!("Salmos {}:1", i + 1), "Deus")).collect());
        let mut hits: Vec<SearchHit> = vec![
            evaluate(&matcher, &Entry::new("deuses", vec![occ("Êxodo 20:3", "outros deuses")])).unwrap(),
            evaluate(&matcher, &ten("Deus")).unwrap(),
            evaluate(&matcher, &ten("deus")).unwrap(),
        ];
        rank(&mut hits);

        let order: Vec<&str> = hits.iter().map(|h| h.entry.headword.as_str()).collect();
        assert_eq!(order, vec!["Deus", "deus", "deuses"]);
        assert!(hits[0].exact_match && hits[1].exact_match);
    }

    fn corpus() -> StaticFetcher {
        StaticFetcher::new()
            .with_document(
                "concordancia/lista_letras.json",
                json!({ "a": ["a1", "a2"], "d": ["d1"], "m": ["m1", "m2"] }).to_string(),
            )
            .with_document(
                "concordancia/a/a1.json",
                json!({ "a": [
                    { "palavra": "amor", "concordancias": [
                        { "referencia": "João 3:16", "texto": "Deus amou o mundo, tal é o amor" },
                        { "referencia": "1 Coríntios 13:4", "texto": "O amor é sofredor" }
                    ]},
                    { "palavra": "amado", "concordancias": [
                        { "referencia": "Mateus 3:17", "texto": "Este é o meu Filho amado" }
                    ]}
                ]}).to_string(),
            )
            .with_document(
                "concordancia/a/a2.json",
                json!({ "a": [
                    { "palavra": "abismo", "concordancias": [
                        { "referencia": "Gênesis 1:2", "texto": "trevas sobre a face do abismo" }
                    ]},
                    { "palavra": "amor", "concordancias": [
                        { "referencia": "Cantares 8:7", "texto": "as muitas águas não podem apagar o amor" }
                    ]}
                ]}).to_string(),
            )
            .with_document(
                "concordancia/d/d1.json",
                json!({ "d": [
                    { "palavra": "dileção", "fonte": "Amor fraterno", "concordancias": [
                        { "referencia": "Romanos 12:10", "texto": "com amor fraternal" },
                        { "referencia": "Hebreus 13:1", "texto": "permaneça a caridade" }
                    ]}
                ]}).to_string(),
            )
            .with_failure(
                "concordancia/m/m1.json",
                FetchError::Status { path: "concordancia/m/m1.json".into(), status: 404 },
            )
            .with_document("concordancia/m/m2.json", "not json at all")
    }

    fn engine(fetcher: StaticFetcher) -> GlobalSearch {
        let fetcher: Arc<StaticFetcher> = Arc::new(fetcher);
        let catalog = Arc::new(ShardCatalog::new(fetcher.clone(), Dataset::Concordance));
        GlobalSearch::new(catalog, ShardLoader::new(fetcher, Dataset::Concordance), 5)
    }

    #[tokio::test]
    async fn test_search_across_letters() {
        let results = engine(corpus()).search("  AMOR ").await.unwrap();

        let order: Vec<(&str, MatchRule)> = results
            .hits
            .iter()
            .map(|h| (h.entry.headword.as_str(), h.matched_by))
            .collect();
        assert_eq!(order, vec![("amor", MatchRule::Headword), ("dileção", MatchRule::Text)]);
        assert_eq!(results.total, 2);
        assert_eq!(results.term, "AMOR");
        assert!(results.hits[0].exact_match);

        // first-seen wins: a1's two occurrences, not a2's one
        assert_eq!(results.hits[0].entry.occurrence_count(), 2);
        assert_eq!(results.hits[1].entry.occurrence_count(), 1);
        assert_eq!(results.shards_failed, 2);
    }

    #[tokio::test]
    async fn test_search_without_matches() {
        let results = engine(corpus()).search("leviatã").await.unwrap();
        assert!(results.hits.is_empty());
        assert_eq!(results.total, 0);
    }
}
