use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use scraper::{ElementRef, Html, Node};
use thiserror::Error;
use tracing::debug;

// A4 landscape in points, 1.5cm margins.
const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
const MARGIN: f32 = 42.5;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.5;
const BULLET_INDENT: f32 = 14.0;

/// Average glyph width as a fraction of the font size, close enough for
/// Helvetica to wrap lines without embedding metrics.
const GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("pdf assembly failed: {0}")]
    Assembly(#[from] lopdf::Error),
}

/// Render transcript HTML into a printable PDF.
///
/// The HTML is reduced to a flat sequence of blocks (headings, paragraphs,
/// list items, tables) which are typeset onto landscape A4 pages with the
/// built-in Helvetica faces. Styling beyond structure is ignored.
pub fn html_to_pdf(html: &str) -> Result<Vec<u8>, DocumentError> {
    let blocks = extract_blocks(html);
    debug!("Typesetting {} block(s)", blocks.len());
    compose(&blocks)
}

// ===== HTML BLOCK EXTRACTION =====

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Bullet(String),
    Table { rows: Vec<Vec<String>>, has_header: bool },
}

fn extract_blocks(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    collect_blocks(fragment.root_element(), &mut blocks);
    blocks
}

fn collect_blocks(element: ElementRef, blocks: &mut Vec<Block>) {
    for child in element.children() {
        match child.value() {
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.name() {
                    "head" | "style" | "script" | "title" | "meta" | "link" => {}
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = el.name().as_bytes()[1] - b'0';
                        let text = inline_text(child_ref);
                        if !text.is_empty() {
                            blocks.push(Block::Heading { level, text });
                        }
                    }
                    "p" | "pre" | "blockquote" => {
                        let text = inline_text(child_ref);
                        if !text.is_empty() {
                            blocks.push(Block::Paragraph(text));
                        }
                    }
                    "ul" => collect_list_items(child_ref, blocks, None),
                    "ol" => collect_list_items(child_ref, blocks, Some(1)),
                    "table" => {
                        if let Some(table) = collect_table(child_ref) {
                            blocks.push(table);
                        }
                    }
                    "img" => {
                        // Images are referenced, not embedded.
                        let label = el
                            .attr("alt")
                            .filter(|alt| !alt.trim().is_empty())
                            .or_else(|| el.attr("src"))
                            .unwrap_or("image");
                        blocks.push(Block::Paragraph(format!("[Image: {}]", label.trim())));
                    }
                    "br" | "hr" | "button" | "input" => {}
                    _ if has_block_children(child_ref) => collect_blocks(child_ref, blocks),
                    _ => {
                        let text = inline_text(child_ref);
                        if !text.is_empty() {
                            blocks.push(Block::Paragraph(text));
                        }
                    }
                }
            }
            Node::Text(text) => {
                let trimmed = collapse_whitespace(text);
                if !trimmed.is_empty() {
                    blocks.push(Block::Paragraph(trimmed));
                }
            }
            _ => {}
        }
    }
}

fn collect_list_items(list: ElementRef, blocks: &mut Vec<Block>, numbering: Option<usize>) {
    let mut counter = numbering;
    for child in list.children() {
        let Some(item) = ElementRef::wrap(child) else {
            continue;
        };
        if item.value().name() != "li" {
            continue;
        }
        let text = inline_text(item);
        if text.is_empty() {
            continue;
        }
        match counter.as_mut() {
            Some(n) => {
                blocks.push(Block::Bullet(format!("{}. {}", n, text)));
                *n += 1;
            }
            None => blocks.push(Block::Bullet(format!("- {}", text))),
        }
    }
}

fn collect_table(table: ElementRef) -> Option<Block> {
    let mut rows = Vec::new();
    let mut has_header = false;

    for descendant in table.descendants() {
        let Some(row) = ElementRef::wrap(descendant) else {
            continue;
        };
        if row.value().name() != "tr" {
            continue;
        }

        let mut cells = Vec::new();
        for cell_node in row.children() {
            let Some(cell) = ElementRef::wrap(cell_node) else {
                continue;
            };
            match cell.value().name() {
                "th" => {
                    has_header = true;
                    cells.push(inline_text(cell));
                }
                "td" => cells.push(inline_text(cell)),
                _ => {}
            }
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    if rows.is_empty() {
        None
    } else {
        Some(Block::Table { rows, has_header })
    }
}

fn has_block_children(element: ElementRef) -> bool {
    element.children().any(|child| {
        matches!(
            child.value(),
            Node::Element(el) if matches!(
                el.name(),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "ul" | "ol"
                    | "table" | "div" | "section" | "article" | "blockquote" | "pre"
            )
        )
    })
}

fn inline_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ===== TYPESETTING =====

/// Replace typographic characters the built-in PDF encoding cannot carry.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '-',
            '\u{00A0}' => ' ',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
        // Hard-break words longer than a full line.
        while current.len() > max_chars {
            let head: String = current.chars().take(max_chars).collect();
            current = current.chars().skip(max_chars).collect();
            lines.push(head);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn chars_per_line(size: f32, width: f32) -> usize {
    (width / (size * GLYPH_WIDTH)) as usize
}

/// Accumulates page content streams, breaking to a new page when the cursor
/// runs out of vertical room.
struct Typesetter {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Typesetter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
    }

    /// Emit one line of text at the current cursor, left edge at `x`.
    fn text_line(&mut self, font: &str, size: f32, x: f32, text: &str) {
        let leading = size * 1.4;
        self.ensure_room(leading);
        self.advance(leading);

        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops
            .push(Operation::new("Td", vec![x.into(), self.y.into()]));
        self.ops
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn rule(&mut self, x1: f32, x2: f32) {
        self.ops
            .push(Operation::new("m", vec![x1.into(), self.y.into()]));
        self.ops
            .push(Operation::new("l", vec![x2.into(), self.y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.ops);
        self.pages
    }
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 18.0,
        2 => 14.0,
        3 => 12.0,
        _ => 11.0,
    }
}

fn typeset(blocks: &[Block]) -> Vec<Vec<Operation>> {
    let mut ts = Typesetter::new();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let size = heading_size(*level);
                ts.advance(size * 0.6);
                for line in wrap_text(&sanitize(text), chars_per_line(size, USABLE_WIDTH)) {
                    ts.text_line("F2", size, MARGIN, &line);
                }
                if *level <= 2 {
                    ts.advance(3.0);
                    ts.rule(MARGIN, PAGE_WIDTH - MARGIN);
                }
                ts.advance(4.0);
            }
            Block::Paragraph(text) => {
                for line in wrap_text(&sanitize(text), chars_per_line(BODY_SIZE, USABLE_WIDTH)) {
                    ts.text_line("F1", BODY_SIZE, MARGIN, &line);
                }
                ts.advance(BODY_SIZE * 0.5);
            }
            Block::Bullet(text) => {
                let width = USABLE_WIDTH - BULLET_INDENT;
                for line in wrap_text(&sanitize(text), chars_per_line(BODY_SIZE, width)) {
                    ts.text_line("F1", BODY_SIZE, MARGIN + BULLET_INDENT, &line);
                }
            }
            Block::Table { rows, has_header } => {
                typeset_table(&mut ts, rows, *has_header);
                ts.advance(BODY_SIZE * 0.5);
            }
        }
    }

    ts.finish()
}

fn typeset_table(ts: &mut Typesetter, rows: &[Vec<String>], has_header: bool) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let column_width = USABLE_WIDTH / columns as f32;
    let cell_chars = chars_per_line(TABLE_SIZE, column_width).saturating_sub(1);

    for (index, row) in rows.iter().enumerate() {
        let leading = TABLE_SIZE * 1.5;
        ts.ensure_room(leading);
        ts.advance(leading);

        let header_row = has_header && index == 0;
        let font = if header_row { "F2" } else { "F1" };

        for (col, cell) in row.iter().enumerate() {
            let mut text = sanitize(cell);
            if text.len() > cell_chars {
                text.truncate(cell_chars.saturating_sub(1));
                text.push('~');
            }
            let x = MARGIN + col as f32 * column_width;

            ts.ops.push(Operation::new("BT", vec![]));
            ts.ops
                .push(Operation::new("Tf", vec![font.into(), TABLE_SIZE.into()]));
            ts.ops
                .push(Operation::new("Td", vec![x.into(), ts.y.into()]));
            ts.ops
                .push(Operation::new("Tj", vec![Object::string_literal(text)]));
            ts.ops.push(Operation::new("ET", vec![]));
        }

        if header_row {
            ts.advance(3.0);
            ts.rule(MARGIN, PAGE_WIDTH - MARGIN);
        }
    }
}

// ===== PDF ASSEMBLY =====

fn compose(blocks: &[Block]) -> Result<Vec<u8>, DocumentError> {
    let page_ops = typeset(blocks);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let oblique = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Oblique",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => oblique,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(page_ops.len());
    for operations in page_ops {
        let content = Content { operations };
        let stream = Stream::new(dictionary! {}, content.encode()?);
        let content_id = doc.add_object(stream);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(lopdf::Error::from)?;
    Ok(buffer)
}
