use serde::{Deserialize, Serialize};

pub const ROOT_LEVEL: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub level: i32,
    pub content: Vec<ContentItem>,
    pub char_count: usize,
    pub citations: Vec<String>,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(heading: impl Into<String>, level: i32) -> Self {
        Self {
            heading: heading.into(),
            level,
            content: Vec::new(),
            char_count: 0,
            citations: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new("", ROOT_LEVEL)
    }

    /// Sets `char_count` on this section and every section below it, including
    /// sections scoped to table cells. Only text owned by a section counts
    /// toward it.
    pub fn finalize_char_counts(&mut self) {
        self.char_count = self.content.iter().map(ContentItem::own_char_count).sum();

        for item in &mut self.content {
            item.finalize_cell_sections();
        }
        for child in &mut self.children {
            child.finalize_char_counts();
        }
    }

    pub fn walk<'s>(&'s self, visit: &mut impl FnMut(&'s Section)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        value: String,
    },
    Table {
        rows: Vec<Vec<TableCell>>,
    },
    Image {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl ContentItem {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn own_char_count(&self) -> usize {
        match self {
            Self::Text { value } => value.chars().count(),
            Self::Table { rows } => rows
                .iter()
                .flatten()
                .flat_map(|cell| cell.content.iter())
                .map(ContentItem::own_char_count)
                .sum(),
            Self::Image { .. } => 0,
        }
    }

    fn finalize_cell_sections(&mut self) {
        let Self::Table { rows } = self else {
            return;
        };

        for cell in rows.iter_mut().flatten() {
            for item in &mut cell.content {
                item.finalize_cell_sections();
            }
            for section in &mut cell.sections {
                section.finalize_char_counts();
            }
        }
    }
}

/// `content` holds what the cell carries before any heading of its own;
/// headings inside the cell open sections scoped to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "cell")]
pub struct TableCell {
    pub content: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}
