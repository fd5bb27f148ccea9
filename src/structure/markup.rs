use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::document::{Block, Cell, Document, ImageMarker, Inline, Paragraph, Row, Run, Table};
use super::error::ExtractError;

const SKIPPED_ELEMENTS: &[&str] = &["head", "style", "script", "title"];
const PARAGRAPH_ELEMENTS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "caption"];
const BOLD_ELEMENTS: &[&str] = &["strong", "b", "h1", "h2", "h3", "h4", "h5", "h6"];
const ITALIC_ELEMENTS: &[&str] = &["em", "i"];

/// Slow path for text the strict unescaper rejects. Unknown entities and
/// stray ampersands stay as written.
fn unescape_lenient(raw: &str, unknown: &mut Vec<String>) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        value.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let entity = tail[1..]
            .find(';')
            .map(|end| &tail[1..1 + end])
            .filter(|name| !name.is_empty() && !name.contains(char::is_whitespace));

        let Some(entity) = entity else {
            value.push('&');
            rest = &tail[1..];
            continue;
        };

        match resolve_entity_reference(entity) {
            Some(resolved) => value.push_str(&resolved),
            None => {
                unknown.push(entity.to_string());
                value.push('&');
                value.push_str(entity);
                value.push(';');
            }
        }
        rest = &tail[entity.len() + 2..];
    }

    value.push_str(rest);
    value
}

fn resolve_entity_reference(entity: &str) -> Option<String> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    resolve_html5_entity(entity).map(ToOwned::to_owned)
}

enum Container {
    Flow(Vec<Block>),
    Cell(Vec<Block>),
    Table(Vec<Row>),
    Row(Vec<Cell>),
    Paragraph { inlines: Vec<Inline>, implicit: bool },
}

struct OpenElement {
    name: String,
    container: bool,
    bold: bool,
    italic: bool,
}

struct MarkupState {
    containers: Vec<Container>,
    elements: Vec<OpenElement>,
    /// Name of the element whose content is being skipped, and how many
    /// elements of that name are open inside the skip.
    skipping: Option<(String, usize)>,
    warnings: Vec<String>,
}

impl MarkupState {
    fn new() -> Self {
        Self {
            containers: vec![Container::Flow(Vec::new())],
            elements: Vec::new(),
            skipping: None,
            warnings: Vec::new(),
        }
    }

    fn bold(&self) -> bool {
        self.elements.iter().any(|element| element.bold)
    }

    fn italic(&self) -> bool {
        self.elements.iter().any(|element| element.italic)
    }

    /// Void elements such as `<meta>` have no end tag, so only the element
    /// that started a skip can end it.
    fn open(&mut self, name: &str, start: &BytesStart<'_>) {
        if let Some((root, depth)) = &mut self.skipping {
            if root == name {
                *depth += 1;
            }
            return;
        }
        if SKIPPED_ELEMENTS.contains(&name) {
            self.skipping = Some((name.to_string(), 1));
            return;
        }

        let container = match name {
            "table" => {
                self.close_open_paragraph();
                self.containers.push(Container::Table(Vec::new()));
                true
            }
            "tr" => {
                self.containers.push(Container::Row(Vec::new()));
                true
            }
            "td" | "th" => {
                self.containers.push(Container::Cell(Vec::new()));
                true
            }
            "img" => {
                let marker = image_marker(start);
                self.push_inline(Inline::Image(marker));
                false
            }
            "br" => {
                let run = Run {
                    text: "\n".to_string(),
                    is_bold: self.bold(),
                    is_italic: self.italic(),
                };
                self.push_inline(Inline::Run(run));
                false
            }
            _ if PARAGRAPH_ELEMENTS.contains(&name) => {
                self.close_open_paragraph();
                self.containers.push(Container::Paragraph {
                    inlines: Vec::new(),
                    implicit: false,
                });
                true
            }
            _ => false,
        };

        self.elements.push(OpenElement {
            name: name.to_string(),
            container,
            bold: BOLD_ELEMENTS.contains(&name),
            italic: ITALIC_ELEMENTS.contains(&name),
        });
    }

    /// End tags close back to the most recent element of the same name; stray
    /// end tags are ignored.
    fn close(&mut self, name: &str) {
        if let Some((root, depth)) = &mut self.skipping {
            if root == name {
                *depth -= 1;
                if *depth == 0 {
                    self.skipping = None;
                }
            }
            return;
        }

        let Some(position) = self.elements.iter().rposition(|element| element.name == name) else {
            return;
        };

        while self.elements.len() > position {
            if let Some(element) = self.elements.pop() {
                if element.container {
                    self.close_container();
                }
            }
        }
    }

    fn text(&mut self, value: &str) {
        if self.skipping.is_some() || value.is_empty() {
            return;
        }

        let in_paragraph = matches!(self.containers.last(), Some(Container::Paragraph { .. }));
        if !in_paragraph && value.trim().is_empty() {
            return;
        }

        let run = Run {
            text: value.to_string(),
            is_bold: self.bold(),
            is_italic: self.italic(),
        };
        self.push_inline(Inline::Run(run));
    }

    fn push_inline(&mut self, inline: Inline) {
        if !matches!(self.containers.last(), Some(Container::Paragraph { .. })) {
            self.containers.push(Container::Paragraph {
                inlines: Vec::new(),
                implicit: true,
            });
        }

        if let Some(Container::Paragraph { inlines, .. }) = self.containers.last_mut() {
            inlines.push(inline);
        }
    }

    /// A block starting inside a paragraph (a list nested in `<li>`, say) ends
    /// that paragraph early; its element no longer owns a container.
    fn close_open_paragraph(&mut self) {
        let Some(Container::Paragraph { implicit, .. }) = self.containers.last() else {
            return;
        };

        if !*implicit {
            let owner = self.elements.iter_mut().rev().find(|element| element.container);
            if let Some(element) = owner {
                element.container = false;
            }
        }
        self.pop_container();
    }

    fn close_container(&mut self) {
        while self.containers.len() > 1
            && matches!(
                self.containers.last(),
                Some(Container::Paragraph { implicit: true, .. })
            )
        {
            self.pop_container();
        }

        if self.containers.len() > 1 {
            self.pop_container();
        }
    }

    fn pop_container(&mut self) {
        let Some(container) = self.containers.pop() else {
            return;
        };

        match container {
            Container::Paragraph { inlines, .. } => {
                self.push_block(Block::Paragraph(Paragraph { inlines }));
            }
            Container::Table(rows) => self.push_block(Block::Table(Table { rows })),
            Container::Row(cells) => match self.containers.last_mut() {
                Some(Container::Table(rows)) => rows.push(Row { cells }),
                _ => self.push_block(Block::Table(Table {
                    rows: vec![Row { cells }],
                })),
            },
            Container::Cell(blocks) => match self.containers.last_mut() {
                Some(Container::Row(cells)) => cells.push(Cell { blocks }),
                Some(Container::Table(rows)) => rows.push(Row {
                    cells: vec![Cell { blocks }],
                }),
                _ => {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            },
            Container::Flow(blocks) => {
                for block in blocks {
                    self.push_block(block);
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        let target = self
            .containers
            .iter_mut()
            .rev()
            .find(|container| matches!(container, Container::Flow(_) | Container::Cell(_)));

        if let Some(Container::Flow(blocks) | Container::Cell(blocks)) = target {
            blocks.push(block);
        }
    }

    fn finish(mut self) -> Document {
        while self.containers.len() > 1 {
            self.pop_container();
        }

        let mut document = match self.containers.pop() {
            Some(Container::Flow(blocks)) => Document::new(blocks),
            _ => Document::default(),
        };
        document.warnings = self.warnings;
        document
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).to_ascii_lowercase()
}

fn image_marker(start: &BytesStart<'_>) -> ImageMarker {
    let mut src = None;
    let mut alt = None;

    for attribute in start.attributes().flatten() {
        let value = attribute
            .unescape_value()
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attribute.value).into_owned());

        match attribute.key.local_name().as_ref() {
            b"src" => src = Some(value),
            b"alt" => alt = Some(value),
            _ => {}
        }
    }

    ImageMarker {
        id: src.as_deref().and_then(image_identifier),
        name: alt.filter(|value| !value.trim().is_empty()),
    }
}

/// Embedded images are keyed by a digest of their data URI payload; linked
/// images keep their source path.
pub fn image_identifier(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let Some(rest) = src.strip_prefix("data:") else {
        return Some(src.to_string());
    };

    let payload = rest.split_once(',').map(|(_, data)| data).unwrap_or(rest);
    let digest = format!("{:x}", Sha256::digest(payload.as_bytes()));
    Some(format!("img-{}", &digest[..16]))
}

/// Reads mammoth-style XHTML into a document tree. Formatting comes from
/// `<strong>`/`<b>`, `<em>`/`<i>` and heading elements; lists flatten into
/// paragraphs. Unknown entities are kept as literal text and reported in the
/// document's warnings.
pub fn parse_markup(doc_id: &str, markup: &str) -> Result<Document, ExtractError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut state = MarkupState::new();
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return Err(ExtractError::Markup {
                    doc_id: doc_id.to_string(),
                    position: reader.error_position() as u64,
                    message: err.to_string(),
                });
            }
        };

        match event {
            Event::Start(start) => {
                let name = local_name(&start);
                state.open(&name, &start);
            }
            Event::Empty(start) => {
                let name = local_name(&start);
                state.open(&name, &start);
                state.close(&name);
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).to_ascii_lowercase();
                state.close(&name);
            }
            Event::Text(text) => {
                let value = match text.unescape_with(resolve_html5_entity) {
                    Ok(value) => value.into_owned(),
                    Err(_) => {
                        let raw = String::from_utf8_lossy(&text);
                        let mut unknown = Vec::new();
                        let value = unescape_lenient(&raw, &mut unknown);
                        let position = reader.buffer_position();
                        for entity in unknown {
                            warn!(
                                doc_id,
                                entity = %entity,
                                position,
                                "unknown entity kept as text"
                            );
                            state.warnings.push(format!(
                                "unknown entity &{entity}; at byte {position} kept as text"
                            ));
                        }
                        value
                    }
                };
                state.text(&value);
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                state.text(&value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(state.finish())
}
