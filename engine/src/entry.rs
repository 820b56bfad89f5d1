//! Entry types and the per-dataset shard shape adapters

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One scripture citation under an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub reference: String,
    pub text: String,
}

impl Occurrence {
    pub fn new(reference: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<String>,
}

/// A headword with its occurrences, normalized from either dataset.
///
/// The occurrence count is never stored: it is always the length of
/// `occurrences`, so any narrowing keeps it honest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub headword: String,
    pub occurrences: Vec<Occurrence>,
    pub source: Option<String>,
    pub cross_references: Vec<String>,
    pub definition: Option<Definition>,
}

impl Entry {
    pub fn new(headword: impl Into<String>, occurrences: Vec<Occurrence>) -> Self {
        Self {
            headword: headword.into(),
            occurrences,
            source: None,
            cross_references: Vec::new(),
            definition: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_cross_references<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cross_references = dedup_preserving_order(refs.into_iter().map(Into::into));
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }

    /// Worth showing on its own: has citations or a definition
    pub fn is_emittable(&self) -> bool {
        !self.occurrences.is_empty() || self.definition.is_some()
    }

    /// Copy of this entry carrying only the given occurrences
    pub fn narrowed(&self, occurrences: Vec<Occurrence>) -> Self {
        Self {
            headword: self.headword.clone(),
            occurrences,
            source: self.source.clone(),
            cross_references: self.cross_references.clone(),
            definition: self.definition.clone(),
        }
    }
}

impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Entry", 6)?;
        state.serialize_field("headword", &self.headword)?;
        state.serialize_field("occurrences", &self.occurrences)?;
        state.serialize_field("occurrence_count", &self.occurrence_count())?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("cross_references", &self.cross_references)?;
        state.serialize_field("definition", &self.definition)?;
        state.end()
    }
}

/// The two data partitions sharing the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Concordance,
    Dictionary,
}

impl Dataset {
    fn root(&self) -> &'static str {
        match self {
            Dataset::Concordance => "concordancia",
            Dataset::Dictionary => "dicionario",
        }
    }

    pub fn manifest_path(&self) -> String {
        format!("{}/lista_letras.json", self.root())
    }

    pub fn shard_path(&self, letter: &str, file: &str) -> String {
        format!("{}/{}/{}.json", self.root(), letter.to_lowercase(), file)
    }

    /// Key under which a shard stores its entry array
    pub fn shard_key(&self, letter: &str) -> String {
        match self {
            Dataset::Concordance => letter.to_lowercase(),
            Dataset::Dictionary => letter.to_uppercase(),
        }
    }

    /// Normalize one raw shard object into an entry
    pub fn parse_entry(&self, value: Value) -> Result<Entry, serde_json::Error> {
        match self {
            Dataset::Concordance => serde_json::from_value::<RawConcordanceEntry>(value).map(Entry::from),
            Dataset::Dictionary => serde_json::from_value::<RawDictionaryEntry>(value).map(Entry::from),
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dataset::Concordance => write!(f, "concordance"),
            Dataset::Dictionary => write!(f, "dictionary"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOccurrence {
    referencia: String,
    #[serde(default)]
    texto: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConcordanceEntry {
    palavra: String,
    #[serde(default)]
    concordancias: Option<Vec<RawOccurrence>>,
    #[serde(default)]
    fonte: Option<String>,
    #[serde(rename = "veja tambem", default)]
    veja_tambem: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDictionaryEntry {
    termo: String,
    #[serde(default)]
    definicao: Option<String>,
    #[serde(rename = "definicaoAdicional", default)]
    definicao_adicional: Option<String>,
    #[serde(default)]
    referencias: Option<Vec<String>>,
    #[serde(default)]
    fonte: Option<String>,
    #[serde(rename = "veja tambem", default)]
    veja_tambem: Option<Vec<String>>,
}

impl From<RawConcordanceEntry> for Entry {
    fn from(raw: RawConcordanceEntry) -> Self {
        let occurrences = raw
            .concordancias
            .unwrap_or_default()
            .into_iter()
            .map(|o| Occurrence::new(o.referencia, o.texto.unwrap_or_default()))
            .collect();

        Entry {
            headword: raw.palavra,
            occurrences,
            source: non_empty(raw.fonte),
            cross_references: dedup_preserving_order(raw.veja_tambem.unwrap_or_default()),
            definition: None,
        }
    }
}

impl From<RawDictionaryEntry> for Entry {
    fn from(raw: RawDictionaryEntry) -> Self {
        let occurrences = raw
            .referencias
            .unwrap_or_default()
            .into_iter()
            .map(|r| Occurrence::new(r, ""))
            .collect();

        let definition = non_empty(raw.definicao).map(|text| Definition {
            text,
            additional: non_empty(raw.definicao_adicional),
        });

        Entry {
            headword: raw.termo,
            occurrences,
            source: non_empty(raw.fonte),
            cross_references: dedup_preserving_order(raw.veja_tambem.unwrap_or_default()),
            definition,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
