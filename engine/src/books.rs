//! Canonical book table, reference parsing and testament classification

use crate::entry::{Entry, Occurrence};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Testament {
    #[serde(rename = "Old Testament", alias = "Antigo Testamento")]
    Old,
    #[serde(rename = "New Testament", alias = "Novo Testamento")]
    New,
}

impl std::fmt::Display for Testament {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Testament::Old => write!(f, "Old Testament"),
            Testament::New => write!(f, "New Testament"),
        }
    }
}

impl FromStr for Testament {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_diacritics(s.trim()).as_str() {
            "old testament" | "antigo testamento" | "old" => Ok(Testament::Old),
            "new testament" | "novo testamento" | "new" => Ok(Testament::New),
            other => Err(format!("unknown testament: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: &'static str,
    pub name: &'static str,
    pub testament: Testament,
}

const fn ot(id: &'static str, name: &'static str) -> Book {
    Book { id, name, testament: Testament::Old }
}

const fn nt(id: &'static str, name: &'static str) -> Book {
    Book { id, name, testament: Testament::New }
}

/// Canonical order; position in this table is the display order
pub static BOOKS: [Book; 66] = [
    ot("gn", "Gênesis"),
    ot("ex", "Êxodo"),
    ot("lv", "Levítico"),
    ot("nm", "Números"),
    ot("dt", "Deuteronômio"),
    ot("js", "Josué"),
    ot("jz", "Juízes"),
    ot("rt", "Rute"),
    ot("1sm", "1 Samuel"),
    ot("2sm", "2 Samuel"),
    ot("1rs", "1 Reis"),
    ot("2rs", "2 Reis"),
    ot("1cr", "1 Crônicas"),
    ot("2cr", "2 Crônicas"),
    ot("ed", "Esdras"),
    ot("ne", "Neemias"),
    ot("et", "Ester"),
    ot("jo", "Jó"),
    ot("sl", "Salmos"),
    ot("pv", "Provérbios"),
    ot("ec", "Eclesiastes"),
    ot("ct", "Cantares"),
    ot("is", "Isaías"),
    ot("jr", "Jeremias"),
    ot("lm", "Lamentações"),
    ot("ez", "Ezequiel"),
    ot("dn", "Daniel"),
    ot("os", "Oséias"),
    ot("jl", "Joel"),
    ot("am", "Amós"),
    ot("ob", "Obadias"),
    ot("jn", "Jonas"),
    ot("mq", "Miquéias"),
    ot("na", "Naum"),
    ot("hc", "Habacuque"),
    ot("sf", "Sofonias"),
    ot("ag", "Ageu"),
    ot("zc", "Zacarias"),
    ot("ml", "Malaquias"),
    nt("mt", "Mateus"),
    nt("mc", "Marcos"),
    nt("lc", "Lucas"),
    nt("joa", "João"),
    nt("at", "Atos"),
    nt("rm", "Romanos"),
    nt("1co", "1 Coríntios"),
    nt("2co", "2 Coríntios"),
    nt("gl", "Gálatas"),
    nt("ef", "Efésios"),
    nt("fp", "Filipenses"),
    nt("cl", "Colossenses"),
    nt("1ts", "1 Tessalonicenses"),
    nt("2ts", "2 Tessalonicenses"),
    nt("1tm", "1 Timóteo"),
    nt("2tm", "2 Timóteo"),
    nt("tt", "Tito"),
    nt("fm", "Filemom"),
    nt("hb", "Hebreus"),
    nt("tg", "Tiago"),
    nt("1pe", "1 Pedro"),
    nt("2pe", "2 Pedro"),
    nt("1jo", "1 João"),
    nt("2jo", "2 João"),
    nt("3jo", "3 João"),
    nt("jd", "Judas"),
    nt("ap", "Apocalipse"),
];

/// Lowercase and strip Portuguese diacritics and ordinal markers
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' => Some('e'),
            'í' | 'ì' | 'î' | 'ï' => Some('i'),
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => Some('o'),
            'ú' | 'ù' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            'ñ' => Some('n'),
            'º' | 'ª' | '°' => None,
            _ => Some(c),
        })
        .collect()
}

/// Comparable form of a book name: folded, single-spaced, numeral split off
pub fn normalize_book_name(name: &str) -> String {
    let folded = fold_diacritics(name);
    let mut words: Vec<String> = Vec::new();
    for word in folded.split_whitespace() {
        // "1samuel" -> "1 samuel"
        let digits: String = word.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() && digits.len() < word.len() {
            words.push(digits.clone());
            words.push(word[digits.len()..].to_string());
        } else {
            words.push(word.to_string());
        }
    }
    words.join(" ")
}

fn name_index() -> &'static HashMap<String, usize> {
    static INDEX: OnceLock<HashMap<String, usize>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for (pos, book) in BOOKS.iter().enumerate() {
            index.insert(normalize_book_name(book.name), pos);
            index.insert(book.id.to_string(), pos);
        }
        index
    })
}

fn book_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^([A-Za-zÀ-ÿºª0-9 ]+?)\s*\d+:\d+").expect("book prefix pattern is valid")
    })
}

fn reference_parts() -> &'static Regex {
    static PARTS: OnceLock<Regex> = OnceLock::new();
    PARTS.get_or_init(|| {
        Regex::new(r"^([A-Za-zÀ-ÿºª0-9 ]+?)(\s+\d+:\d+.*)$").expect("reference pattern is valid")
    })
}

/// Book name portion of a reference: "1 Samuel 2:5" -> "1 Samuel"
pub fn extract_book_name(reference: &str) -> String {
    let reference = reference.trim();
    if let Some(caps) = book_prefix().captures(reference) {
        return caps[1].trim().to_string();
    }
    reference.split_whitespace().next().unwrap_or("").to_string()
}

pub fn find_book(id: &str) -> Option<&'static Book> {
    let id = id.trim().to_lowercase();
    BOOKS.iter().find(|b| b.id == id)
}

/// Exact, numeral-aware lookup by name or id. "João" and "1 João" are distinct.
pub fn book_for_name(name: &str) -> Option<&'static Book> {
    name_index().get(&normalize_book_name(name)).map(|&pos| &BOOKS[pos])
}

pub fn book_position(book: &Book) -> usize {
    BOOKS.iter().position(|b| b.id == book.id).unwrap_or(BOOKS.len())
}

/// Testament of a book name. Unknown numbered names fall back to their base
/// name, so a numbered form only ever borrows the testament, never the book.
pub fn testament_of(name: &str) -> Option<Testament> {
    if let Some(book) = book_for_name(name) {
        return Some(book.testament);
    }
    let normalized = normalize_book_name(name);
    let (numeral, base) = normalized.split_once(' ')?;
    if matches!(numeral, "1" | "2" | "3") {
        return name_index().get(base).map(|&pos| BOOKS[pos].testament);
    }
    None
}

pub fn testament_of_reference(reference: &str) -> Option<Testament> {
    testament_of(&extract_book_name(reference))
}

/// Canonical books, optionally restricted to one testament
pub fn books(testament: Option<Testament>) -> Vec<&'static Book> {
    BOOKS
        .iter()
        .filter(|b| testament.map_or(true, |t| b.testament == t))
        .collect()
}

fn format_book_name(name: &str) -> String {
    let mut parts = name.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(n @ ("1" | "2" | "3")), Some(rest)) => format!("{}º {}", n, rest),
        _ => name.to_string(),
    }
}

/// Display form of a reference: "1 Samuel 2:5" -> "1º Samuel 2:5"
pub fn format_reference(reference: &str) -> String {
    match reference_parts().captures(reference.trim()) {
        Some(caps) => format!("{}{}", format_book_name(caps[1].trim()), &caps[2]),
        None => format_book_name(reference.trim()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookGroup<'a> {
    pub book: String,
    pub canonical: Option<&'static Book>,
    pub occurrences: Vec<&'a Occurrence>,
}

/// Occurrences grouped by book: canonical order first, unknown books after in
/// the order they were met
pub fn group_by_book(entry: &Entry) -> Vec<BookGroup<'_>> {
    let mut groups: Vec<(String, BookGroup<'_>)> = Vec::new();

    for occurrence in &entry.occurrences {
        let name = extract_book_name(&occurrence.reference);
        let key = normalize_book_name(&name);
        match groups.iter().position(|(k, _)| *k == key) {
            Some(pos) => groups[pos].1.occurrences.push(occurrence),
            None => {
                let canonical = book_for_name(&name);
                let book = canonical.map(|b| b.name.to_string()).unwrap_or(name);
                groups.push((
                    key,
                    BookGroup {
                        book,
                        canonical,
                        occurrences: vec![occurrence],
                    },
                ));
            }
        }
    }

    let mut groups: Vec<BookGroup<'_>> = groups.into_iter().map(|(_, g)| g).collect();
    // stable: unknown books keep encounter order behind the canonical ones
    groups.sort_by_key(|g| g.canonical.map_or(BOOKS.len(), book_position));
    groups
}
