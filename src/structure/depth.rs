use anyhow::{Context, Result};
use regex::Regex;

/// Visual weight of a heading, inferred from its numbering or keyword prefix.
/// Weights only compare within the same family; headings without a cue all
/// share the `Unknown` weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingWeight {
    Numbered(usize),
    Keyword(usize),
    Unknown,
}

impl HeadingWeight {
    fn comparable(self, other: HeadingWeight) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Numbered(a), Self::Numbered(b)) | (Self::Keyword(a), Self::Keyword(b)) => {
                Some(a.cmp(&b))
            }
            (Self::Unknown, Self::Unknown) => Some(std::cmp::Ordering::Equal),
            _ => None,
        }
    }
}

const KEYWORD_RANKS: &[(&str, usize)] = &[
    ("chapter", 1),
    ("part", 2),
    ("division", 3),
    ("subdivision", 4),
    ("section", 5),
];

fn keyword_rank(keyword: &str) -> Option<usize> {
    let lower = keyword.to_ascii_lowercase();
    KEYWORD_RANKS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rank)| *rank)
}

/// Levels already handed out, per weight, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct HeadingHistory {
    headings: usize,
    levels: Vec<(HeadingWeight, i32)>,
}

impl HeadingHistory {
    pub fn is_empty(&self) -> bool {
        self.headings == 0
    }

    fn level_of(&self, weight: HeadingWeight) -> Option<i32> {
        self.levels
            .iter()
            .find(|(seen, _)| *seen == weight)
            .map(|(_, level)| *level)
    }

    fn shallowest_deeper_than(&self, weight: HeadingWeight) -> Option<i32> {
        self.levels
            .iter()
            .filter(|(seen, _)| weight.comparable(*seen) == Some(std::cmp::Ordering::Less))
            .map(|(_, level)| *level)
            .min()
    }

    /// Records an assignment and forgets entries it contradicts, so that within
    /// a family deeper weights always sit at deeper levels.
    pub fn record(&mut self, weight: HeadingWeight, level: i32) {
        self.headings += 1;

        self.levels
            .retain(|(seen, seen_level)| match weight.comparable(*seen) {
                Some(std::cmp::Ordering::Less) => *seen_level > level,
                Some(std::cmp::Ordering::Greater) => *seen_level < level,
                _ => true,
            });

        match self.levels.iter_mut().find(|(seen, _)| *seen == weight) {
            Some(entry) => entry.1 = level,
            None => self.levels.push((weight, level)),
        }
    }
}

pub trait DepthRule: Sync {
    fn weigh(&self, heading: &str) -> HeadingWeight;

    /// Picks the level for a new heading given the level of the section that is
    /// currently open (-1 for the document root).
    fn assign(&self, weight: HeadingWeight, history: &HeadingHistory, open_level: i32) -> i32;
}

#[derive(Debug)]
pub struct WeightedDepthRule {
    guide: Regex,
    keyword: Regex,
    section_id: Regex,
    numbered: Regex,
}

impl WeightedDepthRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            guide: Regex::new(
                r"^\s*(?i:guide\s+to\s+(chapter|part|division|subdivision))\b",
            )
            .context("failed to compile guide heading regex")?,
            keyword: Regex::new(r"^\s*(?i:(chapter|part|division|subdivision|section))\s+\d")
                .context("failed to compile keyword heading regex")?,
            section_id: Regex::new(r"^\s*\d{1,4}[A-Z]{0,2}[-\u{2010}-\u{2015}]\d{1,4}[A-Z]{0,2}\b")
                .context("failed to compile section id heading regex")?,
            numbered: Regex::new(r"^\s*(\d+(?:\.\d+)*)\.?(?:\s|$)")
                .context("failed to compile numbered heading regex")?,
        })
    }
}

impl DepthRule for WeightedDepthRule {
    fn weigh(&self, heading: &str) -> HeadingWeight {
        if let Some(captures) = self.guide.captures(heading) {
            if let Some(rank) = captures.get(1).and_then(|m| keyword_rank(m.as_str())) {
                return HeadingWeight::Keyword(rank + 1);
            }
        }

        if let Some(captures) = self.keyword.captures(heading) {
            if let Some(rank) = captures.get(1).and_then(|m| keyword_rank(m.as_str())) {
                return HeadingWeight::Keyword(rank);
            }
        }

        if self.section_id.is_match(heading) {
            return HeadingWeight::Keyword(5);
        }

        if let Some(captures) = self.numbered.captures(heading) {
            let segments = captures
                .get(1)
                .map(|m| m.as_str().split('.').count())
                .unwrap_or(1);
            return HeadingWeight::Numbered(segments);
        }

        HeadingWeight::Unknown
    }

    fn assign(&self, weight: HeadingWeight, history: &HeadingHistory, open_level: i32) -> i32 {
        if history.is_empty() {
            return 0;
        }

        let deeper_than_open = open_level + 1;
        let level = history
            .level_of(weight)
            .or_else(|| history.shallowest_deeper_than(weight))
            .unwrap_or(deeper_than_open);

        level.clamp(0, deeper_than_open)
    }
}

/// Every heading opens a top-level section.
#[derive(Debug, Default)]
pub struct FlatDepthRule;

impl DepthRule for FlatDepthRule {
    fn weigh(&self, _heading: &str) -> HeadingWeight {
        HeadingWeight::Unknown
    }

    fn assign(&self, _weight: HeadingWeight, _history: &HeadingHistory, _open_level: i32) -> i32 {
        0
    }
}
