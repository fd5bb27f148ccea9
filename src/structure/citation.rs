use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Serialize;

pub const DEFAULT_CITATION_BASE_URL: &str = "https://classic.austlii.edu.au";
pub const DEFAULT_JURISDICTION: &str = "cth";

const INSTRUMENT: &str = r"(?P<instrument>\b[A-Z][A-Za-z'’\-]*(?:\s+(?:[A-Z][A-Za-z'’\-]*|\([A-Z][A-Za-z'’\s\-]*\)|of|and|for))*?\s+(?:Act|Regulations?|Rules|Ordinance))";
const JURISDICTION: &str = r"(?:\s*\((?P<jurisdiction>Cth|NSW|Vic|Qld|WA|SA|Tas|ACT|NT)\))?";
const SECTION_NUMBER: &str = r"(?P<section>\d+[A-Z]*(?:[-\u{2010}-\u{2015}]\d+[A-Z]*)?)(?:\((?P<subsection>[0-9A-Za-z]+)\))?";
const SECTION_WORD: &str = r"(?:[Ss]ubsections?|[Ss]ections?|ss?\.?|sec\.)";

const LEADING_NOISE: &[&str] = &["the", "under", "see", "in", "by", "and", "of", "pursuant"];
const INSTRUMENT_KEYWORDS: &[&str] = &["Act", "Regulation", "Regulations", "Rules", "Ordinance"];
const INSTRUMENT_CONNECTORS: &[&str] = &["and", "of", "for"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    ActSection,
    SectionOfAct,
    InternalSection,
}

struct PatternRow {
    kind: CitationKind,
    pattern: fn() -> String,
    template: &'static str,
}

fn act_section_pattern() -> String {
    format!(
        r"{INSTRUMENT}\s+(?P<year>\d{{4}}){JURISDICTION}\s*,?\s*{SECTION_WORD}\s*{SECTION_NUMBER}"
    )
}

fn section_of_act_pattern() -> String {
    format!(
        r"\b{SECTION_WORD}\s*{SECTION_NUMBER}\s+of\s+(?:the\s+)?{INSTRUMENT}\s+(?P<year>\d{{4}}){JURISDICTION}"
    )
}

fn internal_section_pattern() -> String {
    format!(
        r"\b{SECTION_WORD}\s*(?P<section>\d{{1,4}}[A-Z]{{0,2}}[-\u{{2010}}-\u{{2015}}]\d{{1,4}}[A-Z]{{0,2}})(?:\((?P<subsection>[0-9A-Za-z]+)\))?"
    )
}

const PATTERN_TABLE: &[PatternRow] = &[
    PatternRow {
        kind: CitationKind::ActSection,
        pattern: act_section_pattern,
        template: "{base}/au/legis/{jurisdiction}/consol_act/{slug}{year}/s{section}.html",
    },
    PatternRow {
        kind: CitationKind::SectionOfAct,
        pattern: section_of_act_pattern,
        template: "{base}/au/legis/{jurisdiction}/consol_act/{slug}{year}/s{section}.html",
    },
    PatternRow {
        kind: CitationKind::InternalSection,
        pattern: internal_section_pattern,
        template: "{act_url}s{section}.html",
    },
];

#[derive(Debug, Clone)]
pub struct CitationConfig {
    pub base_url: String,
    pub default_jurisdiction: String,
    /// Base URL of the document's own act; enables bare internal references.
    pub act_url: Option<String>,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CITATION_BASE_URL.to_string(),
            default_jurisdiction: DEFAULT_JURISDICTION.to_string(),
            act_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub kind: CitationKind,
    pub instrument: Option<String>,
    pub year: Option<String>,
    pub section: String,
    pub subsection: Option<String>,
    pub url: String,
}

#[derive(Debug)]
struct CompiledPattern {
    kind: CitationKind,
    regex: Regex,
    template: &'static str,
}

#[derive(Debug)]
pub struct CitationRecognizer {
    patterns: Vec<CompiledPattern>,
    config: CitationConfig,
}

impl CitationRecognizer {
    pub fn new(config: CitationConfig) -> Result<Self> {
        let mut patterns = Vec::with_capacity(PATTERN_TABLE.len());
        for row in PATTERN_TABLE {
            if row.kind == CitationKind::InternalSection && config.act_url.is_none() {
                continue;
            }

            let regex = Regex::new(&(row.pattern)())
                .with_context(|| format!("failed to compile {:?} citation regex", row.kind))?;
            patterns.push(CompiledPattern {
                kind: row.kind,
                regex,
                template: row.template,
            });
        }

        Ok(Self { patterns, config })
    }

    /// Matches in order of occurrence. Where patterns overlap the earliest start
    /// wins, then the pattern listed first.
    pub fn recognize(&self, text: &str) -> Vec<CitationMatch> {
        let mut candidates = Vec::<(usize, usize, CitationMatch)>::new();
        for (order, pattern) in self.patterns.iter().enumerate() {
            for captures in pattern.regex.captures_iter(text) {
                if let Some(found) = self.build_match(pattern, &captures) {
                    candidates.push((found.start, order, found));
                }
            }
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut accepted = Vec::<CitationMatch>::new();
        let mut last_end = 0usize;
        for (start, _, found) in candidates {
            if !accepted.is_empty() && start < last_end {
                continue;
            }
            last_end = found.end;
            accepted.push(found);
        }

        accepted
    }

    fn build_match(
        &self,
        pattern: &CompiledPattern,
        captures: &Captures<'_>,
    ) -> Option<CitationMatch> {
        let whole = captures.get(0)?;
        let mut start = whole.start();
        let section = captures.name("section")?.as_str().to_string();
        let subsection = captures.name("subsection").map(|m| m.as_str().to_string());
        let year = captures.name("year").map(|m| m.as_str().to_string());
        let instrument = captures.name("instrument").map(|m| {
            let kept = final_instrument(m.as_str());
            if m.start() == whole.start() {
                start = m.end() - kept.len();
            }
            normalize_instrument(kept)
        });
        if instrument.as_deref() == Some("") {
            return None;
        }

        let jurisdiction = captures
            .name("jurisdiction")
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| self.config.default_jurisdiction.to_ascii_lowercase());

        let url = fill_template(
            pattern.template,
            &[
                ("{base}", self.config.base_url.trim_end_matches('/').to_string()),
                ("{act_url}", act_url_prefix(self.config.act_url.as_deref())),
                ("{jurisdiction}", jurisdiction),
                ("{slug}", instrument.as_deref().map(slugify).unwrap_or_default()),
                ("{year}", year.clone().unwrap_or_default()),
                ("{section}", section_path_segment(&section)),
            ],
        );

        Some(CitationMatch {
            start,
            end: whole.end(),
            text: whole.as_str()[start - whole.start()..].to_string(),
            kind: pattern.kind,
            instrument,
            year,
            section,
            subsection,
            url,
        })
    }
}

fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (placeholder, value) in values {
        out = out.replace(placeholder, value);
    }
    out
}

fn act_url_prefix(act_url: Option<&str>) -> String {
    match act_url {
        Some(url) if url.ends_with('/') => url.to_string(),
        Some(url) => format!("{url}/"),
        None => String::new(),
    }
}

/// The instrument pattern can run back over an earlier name joined by "and"
/// or "of"; only the words after the last inner keyword name this instrument.
/// "Evidence Act and Crimes Act" -> "Crimes Act".
fn final_instrument(raw: &str) -> &str {
    let words = word_spans(raw);
    let Some((_, leading)) = words.split_last() else {
        return raw;
    };
    let Some(cut) = leading
        .iter()
        .rposition(|(_, word)| INSTRUMENT_KEYWORDS.contains(word))
    else {
        return raw;
    };

    words[cut + 1..]
        .iter()
        .find(|(_, word)| !INSTRUMENT_CONNECTORS.contains(word))
        .map(|(offset, _)| &raw[*offset..])
        .unwrap_or(raw)
}

fn word_spans(raw: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut word_start = None;

    for (index, ch) in raw.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = word_start.take() {
                spans.push((begin, &raw[begin..index]));
            }
        } else if word_start.is_none() {
            word_start = Some(index);
        }
    }
    if let Some(begin) = word_start {
        spans.push((begin, &raw[begin..]));
    }
    spans
}

/// Drops the connective words the instrument pattern can swallow at the start
/// of a sentence, e.g. "Under the Crimes Act" -> "Crimes Act".
pub fn normalize_instrument(raw: &str) -> String {
    let mut words = raw.split_whitespace().collect::<Vec<&str>>();
    while words.len() > 1
        && LEADING_NOISE
            .iter()
            .any(|noise| words[0].eq_ignore_ascii_case(noise))
    {
        words.remove(0);
    }
    words.join(" ")
}

pub fn slugify(instrument: &str) -> String {
    instrument
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

fn section_path_segment(section: &str) -> String {
    section
        .chars()
        .map(|ch| match ch {
            '-' | '\u{2010}'..='\u{2015}' => '.',
            other => other,
        })
        .collect()
}
