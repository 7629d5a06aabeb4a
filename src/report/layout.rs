//! Pure layout arithmetic: semantic blocks in, positioned elements out.
//! No PDF types appear here, so every pagination rule is testable without
//! rendering a document. Coordinates are millimetres measured from the top
//! left of the page; the PDF backend flips the y axis.

use super::{Align, Block, Column};

const PT_TO_MM: f64 = 25.4 / 72.0;
const LINE_SPACING: f64 = 1.4;

pub const SIZE_H1: f64 = 22.0;
pub const SIZE_H2: f64 = 13.5;
pub const SIZE_BODY: f64 = 10.0;
pub const SIZE_TABLE: f64 = 9.0;
pub const SIZE_SMALL: f64 = 8.0;
pub const SIZE_BANNER: f64 = 24.0;

const KEY_COLUMN_MM: f64 = 55.0;
const CELL_PADDING_MM: f64 = 1.0;
const NOTICE_INDENT_MM: f64 = 4.0;
const HEADING_GAP_MM: f64 = 2.0;
const FOOTER_BASELINE_FROM_BOTTOM_MM: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct PageSpec {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    /// Left-hand footer text. Page numbers go on the right. The first
    /// page (the cover) never gets a footer.
    pub footer_text: Option<String>,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_top_mm: 20.0,
            margin_bottom_mm: 18.0,
            margin_left_mm: 18.0,
            margin_right_mm: 18.0,
            footer_text: None,
        }
    }
}

impl PageSpec {
    pub fn content_width(&self) -> f64 {
        self.width_mm - self.margin_left_mm - self.margin_right_mm
    }

    fn content_bottom(&self) -> f64 {
        self.height_mm - self.margin_bottom_mm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Body,
    Muted,
    Accent,
}

#[derive(Debug, Clone)]
pub struct PlacedText {
    pub x_mm: f64,
    /// Baseline, measured from the page top.
    pub baseline_mm: f64,
    pub size_pt: f64,
    pub style: FontStyle,
    pub tone: Tone,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PlacedRule {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub thickness_pt: f64,
}

#[derive(Debug, Clone)]
pub enum Element {
    Text(PlacedText),
    Rule(PlacedRule),
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub elements: Vec<Element>,
}

/// Approximate advance width of one character, in thousandths of an em,
/// for the built-in Helvetica face. Values from the AFM; anything not
/// listed falls back to an average width, which is close enough for
/// wrapping decisions.
fn char_milliem(c: char) -> u32 {
    match c {
        'i' | 'j' | 'l' => 222,
        '\'' => 191,
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' | 'f' | 't' | 'I' => 278,
        'r' | '(' | ')' | '-' | '`' => 333,
        '{' | '}' => 334,
        '"' => 355,
        '*' => 389,
        '^' => 469,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 500,
        '0'..='9' | '#' | '$' | '?' | '_' | 'a' | 'b' | 'd' | 'e' | 'g' | 'h' | 'n' | 'o' | 'p'
        | 'q' | 'u' | 'L' => 556,
        '+' | '<' | '=' | '>' | '~' => 584,
        '|' => 260,
        'F' | 'T' | 'Z' => 611,
        '&' | 'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
        'w' | 'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722,
        'G' | 'O' | 'Q' => 778,
        'm' | 'M' => 833,
        '%' => 889,
        'W' => 944,
        '@' => 1015,
        '…' => 1000,
        _ => 556,
    }
}

pub fn text_width_mm(text: &str, style: FontStyle, size_pt: f64) -> f64 {
    let milliems: u32 = text.chars().map(char_milliem).sum();
    // Helvetica-Bold runs a little wider; Oblique shares the metrics.
    let factor = match style {
        FontStyle::Bold => 1.08,
        FontStyle::Regular | FontStyle::Oblique => 1.0,
    };
    f64::from(milliems) / 1000.0 * size_pt * PT_TO_MM * factor
}

pub fn line_height_mm(size_pt: f64) -> f64 {
    size_pt * PT_TO_MM * LINE_SPACING
}

/// Greedy line fill. A single word wider than the column is split hard so
/// layout always makes progress.
pub fn wrap_text(text: &str, style: FontStyle, size_pt: f64, max_width_mm: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        loop {
            let candidate = if current.is_empty() {
                word.clone()
            } else {
                format!("{current} {word}")
            };
            if text_width_mm(&candidate, style, size_pt) <= max_width_mm {
                current = candidate;
                break;
            }
            if current.is_empty() {
                let mut head = String::new();
                for c in word.chars() {
                    let mut next = head.clone();
                    next.push(c);
                    if !head.is_empty() && text_width_mm(&next, style, size_pt) > max_width_mm {
                        break;
                    }
                    head = next;
                }
                let rest: String = word.chars().skip(head.chars().count()).collect();
                lines.push(head);
                word = rest;
                if word.is_empty() {
                    break;
                }
            } else {
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate_to_width(text: &str, style: FontStyle, size_pt: f64, max_width_mm: f64) -> String {
    if text_width_mm(text, style, size_pt) <= max_width_mm {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        let mut candidate = out.clone();
        candidate.push(c);
        candidate.push('…');
        if text_width_mm(&candidate, style, size_pt) > max_width_mm {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

struct Paginator<'a> {
    spec: &'a PageSpec,
    pages: Vec<Page>,
    current: Page,
    y: f64,
}

impl<'a> Paginator<'a> {
    fn new(spec: &'a PageSpec) -> Self {
        Self {
            spec,
            pages: Vec::new(),
            current: Page::default(),
            y: spec.margin_top_mm,
        }
    }

    fn remaining(&self) -> f64 {
        self.spec.content_bottom() - self.y
    }

    /// Finishes the current page. A page without any elements is collapsed
    /// instead of emitted, so a break can be requested freely without ever
    /// producing blank pages or looping on oversized blocks.
    fn break_page(&mut self) {
        if self.current.elements.is_empty() {
            self.y = self.spec.margin_top_mm;
            return;
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.spec.margin_top_mm;
    }

    fn ensure(&mut self, needed_mm: f64) {
        if self.remaining() < needed_mm {
            self.break_page();
        }
    }

    fn push_line(&mut self, x_mm: f64, text: String, style: FontStyle, size_pt: f64, tone: Tone) {
        let height = line_height_mm(size_pt);
        if self.remaining() < height {
            self.break_page();
        }
        self.current.elements.push(Element::Text(PlacedText {
            x_mm,
            baseline_mm: self.y + size_pt * PT_TO_MM,
            size_pt,
            style,
            tone,
            text,
        }));
        self.y += height;
    }

    fn heading(&mut self, level: u8, text: &str, follower_mm: f64) {
        let size = if level <= 1 { SIZE_H1 } else { SIZE_H2 };
        let lines = wrap_text(text, FontStyle::Bold, size, self.spec.content_width());
        // A heading is never left alone at the bottom of a page: it needs
        // room for itself plus the start of whatever follows it.
        let needed = lines.len() as f64 * line_height_mm(size) + HEADING_GAP_MM + follower_mm;
        self.ensure(needed);
        for line in lines {
            self.push_line(self.spec.margin_left_mm, line, FontStyle::Bold, size, Tone::Body);
        }
        self.y += HEADING_GAP_MM;
    }

    fn paragraph(&mut self, text: &str) {
        let lines = wrap_text(text, FontStyle::Regular, SIZE_BODY, self.spec.content_width());
        if lines.is_empty() {
            return;
        }
        for line in lines {
            self.push_line(
                self.spec.margin_left_mm,
                line,
                FontStyle::Regular,
                SIZE_BODY,
                Tone::Body,
            );
        }
        self.y += 3.0;
    }

    fn key_values(&mut self, rows: &[(String, String)]) {
        let left = self.spec.margin_left_mm;
        let value_x = left + KEY_COLUMN_MM;
        let value_width = self.spec.content_width() - KEY_COLUMN_MM;

        for (key, value) in rows {
            let mut lines = wrap_text(value, FontStyle::Regular, SIZE_BODY, value_width);
            if lines.is_empty() {
                lines.push(String::new());
            }
            let row_height = lines.len() as f64 * line_height_mm(SIZE_BODY);
            self.ensure(row_height);

            self.current.elements.push(Element::Text(PlacedText {
                x_mm: left,
                baseline_mm: self.y + SIZE_BODY * PT_TO_MM,
                size_pt: SIZE_BODY,
                style: FontStyle::Bold,
                tone: Tone::Body,
                text: key.clone(),
            }));
            for line in lines {
                self.push_line(value_x, line, FontStyle::Regular, SIZE_BODY, Tone::Body);
            }
            self.y += 1.0;
        }
        self.y += 1.0;
    }

    fn value_banner(&mut self, amount: &str, caption: &str) {
        let needed = line_height_mm(SIZE_BANNER) + line_height_mm(SIZE_SMALL) + 2.0;
        self.ensure(needed);
        self.push_line(
            self.spec.margin_left_mm,
            amount.to_string(),
            FontStyle::Bold,
            SIZE_BANNER,
            Tone::Accent,
        );
        self.push_line(
            self.spec.margin_left_mm,
            caption.to_string(),
            FontStyle::Regular,
            SIZE_SMALL,
            Tone::Muted,
        );
        self.y += 4.0;
    }

    fn table(&mut self, columns: &[Column], rows: &[Vec<String>]) {
        let header_height = line_height_mm(SIZE_TABLE) + 1.5;
        let row_height = line_height_mm(SIZE_TABLE);
        // A table never starts with a dangling header: header plus at
        // least one data row, or move to the next page.
        self.ensure(header_height + row_height);
        self.table_header(columns);

        for row in rows {
            if self.remaining() < row_height {
                self.break_page();
                self.table_header(columns);
            }
            self.table_cells(columns, row, FontStyle::Regular);
            self.y += row_height;
        }
        self.y += 3.0;
    }

    fn table_header(&mut self, columns: &[Column]) {
        let headings: Vec<String> = columns.iter().map(|c| c.heading.clone()).collect();
        self.table_cells(columns, &headings, FontStyle::Bold);
        self.y += line_height_mm(SIZE_TABLE);

        let total_width: f64 = columns.iter().map(|c| c.width_mm).sum();
        self.current.elements.push(Element::Rule(PlacedRule {
            x_mm: self.spec.margin_left_mm,
            y_mm: self.y,
            width_mm: total_width,
            thickness_pt: 0.75,
        }));
        self.y += 1.5;
    }

    fn table_cells(&mut self, columns: &[Column], cells: &[String], style: FontStyle) {
        let mut x = self.spec.margin_left_mm;
        let baseline = self.y + SIZE_TABLE * PT_TO_MM;
        for (column, cell) in columns.iter().zip(cells) {
            let available = column.width_mm - 2.0 * CELL_PADDING_MM;
            let text = truncate_to_width(cell, style, SIZE_TABLE, available);
            let text_x = match column.align {
                Align::Left => x + CELL_PADDING_MM,
                Align::Right => {
                    x + column.width_mm
                        - CELL_PADDING_MM
                        - text_width_mm(&text, style, SIZE_TABLE)
                }
            };
            self.current.elements.push(Element::Text(PlacedText {
                x_mm: text_x,
                baseline_mm: baseline,
                size_pt: SIZE_TABLE,
                style,
                tone: Tone::Body,
                text,
            }));
            x += column.width_mm;
        }
    }

    fn notice(&mut self, text: &str) {
        let x = self.spec.margin_left_mm + NOTICE_INDENT_MM;
        let width = self.spec.content_width() - NOTICE_INDENT_MM;
        let lines = wrap_text(text, FontStyle::Oblique, SIZE_BODY, width);
        for line in lines {
            self.push_line(x, line, FontStyle::Oblique, SIZE_BODY, Tone::Muted);
        }
        self.y += 3.0;
    }

    fn rule(&mut self) {
        self.ensure(3.0);
        self.current.elements.push(Element::Rule(PlacedRule {
            x_mm: self.spec.margin_left_mm,
            y_mm: self.y + 1.0,
            width_mm: self.spec.content_width(),
            thickness_pt: 0.75,
        }));
        self.y += 3.0;
    }

    fn spacer(&mut self, height_mm: f64) {
        if self.remaining() >= height_mm {
            self.y += height_mm;
        } else {
            // A spacer that does not fit collapses into the page break.
            self.break_page();
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.elements.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.pages
    }
}

/// Minimum height a block needs to place its first visible piece on a page,
/// mirroring the `ensure` the block performs itself. Used to keep headings
/// on the same page as the start of whatever they introduce.
fn start_height_mm(block: Option<&Block>) -> f64 {
    match block {
        Some(Block::Table { .. }) => 2.0 * line_height_mm(SIZE_TABLE) + 1.5,
        Some(Block::ValueBanner { .. }) => {
            line_height_mm(SIZE_BANNER) + line_height_mm(SIZE_SMALL) + 2.0
        }
        Some(Block::Rule) => 3.0,
        _ => line_height_mm(SIZE_BODY),
    }
}

/// Lays out the block sequence onto pages and numbers them.
pub fn paginate(blocks: &[Block], spec: &PageSpec) -> Vec<Page> {
    let mut paginator = Paginator::new(spec);

    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Heading { level, text } => {
                paginator.heading(*level, text, start_height_mm(blocks.get(index + 1)));
            }
            Block::Paragraph { text } => paginator.paragraph(text),
            Block::KeyValues { rows } => paginator.key_values(rows),
            Block::ValueBanner { amount, caption } => paginator.value_banner(amount, caption),
            Block::Table { columns, rows } => paginator.table(columns, rows),
            Block::Notice { text } => paginator.notice(text),
            Block::Rule => paginator.rule(),
            Block::Spacer { height_mm } => paginator.spacer(*height_mm),
            Block::PageBreak => paginator.break_page(),
        }
    }

    let mut pages = paginator.finish();
    apply_footers(&mut pages, spec);
    pages
}

fn apply_footers(pages: &mut [Page], spec: &PageSpec) {
    let Some(footer) = &spec.footer_text else {
        return;
    };
    let total = pages.len();
    let baseline = spec.height_mm - FOOTER_BASELINE_FROM_BOTTOM_MM;

    for (index, page) in pages.iter_mut().enumerate().skip(1) {
        page.elements.push(Element::Text(PlacedText {
            x_mm: spec.margin_left_mm,
            baseline_mm: baseline,
            size_pt: SIZE_SMALL,
            style: FontStyle::Regular,
            tone: Tone::Muted,
            text: footer.clone(),
        }));

        let number = format!("Page {} of {}", index + 1, total);
        let width = text_width_mm(&number, FontStyle::Regular, SIZE_SMALL);
        page.elements.push(Element::Text(PlacedText {
            x_mm: spec.width_mm - spec.margin_right_mm - width,
            baseline_mm: baseline,
            size_pt: SIZE_SMALL,
            style: FontStyle::Regular,
            tone: Tone::Muted,
            text: number,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_spec() -> PageSpec {
        PageSpec {
            width_mm: 100.0,
            height_mm: 60.0,
            margin_top_mm: 10.0,
            margin_bottom_mm: 10.0,
            margin_left_mm: 10.0,
            margin_right_mm: 10.0,
            footer_text: None,
        }
    }

    fn page_texts(page: &Page) -> Vec<&str> {
        page.elements
            .iter()
            .filter_map(|e| match e {
                Element::Text(t) => Some(t.text.as_str()),
                Element::Rule(_) => None,
            })
            .collect()
    }

    fn sample_table() -> Block {
        let columns = vec![
            Column {
                heading: "Object".to_string(),
                width_mm: 50.0,
                align: Align::Left,
            },
            Column {
                heading: "Price".to_string(),
                width_mm: 30.0,
                align: Align::Right,
            },
        ];
        let rows = (0..12)
            .map(|i| vec![format!("Row {i}"), format!("{i}00")])
            .collect();
        Block::Table { columns, rows }
    }

    #[test]
    fn test_wrap_keeps_lines_within_width() {
        let text = "The quick brown fox jumps over the lazy dog and keeps on running \
                    through the long meadow until evening";
        let lines = wrap_text(text, FontStyle::Regular, SIZE_BODY, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, FontStyle::Regular, SIZE_BODY) <= 60.0);
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_splits_oversized_word() {
        let word = "x".repeat(400);
        let lines = wrap_text(&word, FontStyle::Regular, SIZE_BODY, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, FontStyle::Regular, SIZE_BODY) <= 40.0);
        }
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_empty_text_has_no_lines() {
        assert!(wrap_text("", FontStyle::Regular, SIZE_BODY, 40.0).is_empty());
        assert!(wrap_text("   ", FontStyle::Regular, SIZE_BODY, 40.0).is_empty());
    }

    #[test]
    fn test_width_estimation_orders_narrow_and_wide_glyphs() {
        let narrow = text_width_mm("iiii", FontStyle::Regular, 10.0);
        let wide = text_width_mm("WWWW", FontStyle::Regular, 10.0);
        assert!(narrow < wide);
        let bold = text_width_mm("Valuation", FontStyle::Bold, 10.0);
        let regular = text_width_mm("Valuation", FontStyle::Regular, 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_truncate_to_width_appends_ellipsis() {
        let text = "A rather long comparable object label";
        let truncated = truncate_to_width(text, FontStyle::Regular, SIZE_TABLE, 20.0);
        assert!(truncated.ends_with('…'));
        assert!(text_width_mm(&truncated, FontStyle::Regular, SIZE_TABLE) <= 20.0);

        assert_eq!(
            truncate_to_width("short", FontStyle::Regular, SIZE_TABLE, 20.0),
            "short"
        );
    }

    #[test]
    fn test_empty_blocks_produce_one_empty_page() {
        let pages = paginate(&[], &PageSpec::default());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].elements.is_empty());
    }

    #[test]
    fn test_page_break_starts_a_new_page() {
        let blocks = vec![
            Block::Paragraph {
                text: "cover".to_string(),
            },
            Block::PageBreak,
            Block::Paragraph {
                text: "body".to_string(),
            },
        ];
        let pages = paginate(&blocks, &PageSpec::default());
        assert_eq!(pages.len(), 2);
        assert_eq!(page_texts(&pages[0]), vec!["cover"]);
        assert_eq!(page_texts(&pages[1]), vec!["body"]);
    }

    #[test]
    fn test_long_text_flows_across_pages() {
        let sentence = "Lorem ipsum dolor sit amet consetetur sadipscing elitr sed diam. ";
        let blocks = vec![Block::Paragraph {
            text: sentence.repeat(40),
        }];
        let spec = small_spec();
        let pages = paginate(&blocks, &spec);
        assert!(pages.len() > 1);
        for page in &pages {
            for element in &page.elements {
                if let Element::Text(t) = element {
                    assert!(t.baseline_mm <= spec.height_mm - spec.margin_bottom_mm + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_heading_is_not_orphaned() {
        // Fill the page so the heading would land on the last usable line.
        let spec = small_spec();
        let blocks = vec![
            Block::Paragraph {
                text: "intro".to_string(),
            },
            Block::Spacer { height_mm: 24.0 },
            Block::Heading {
                level: 2,
                text: "Section".to_string(),
            },
            Block::Paragraph {
                text: "first line".to_string(),
            },
        ];
        let pages = paginate(&blocks, &spec);
        assert_eq!(pages.len(), 2);
        assert!(!page_texts(&pages[0]).contains(&"Section"));
        assert!(
            page_texts(&pages[1]).contains(&"Section")
                && page_texts(&pages[1]).contains(&"first line"),
            "heading must share its page with the first following line"
        );
    }

    #[test]
    fn test_heading_breaks_with_the_table_it_introduces() {
        // Space for the heading plus one body line, but not for the
        // table's header and first row.
        let spec = small_spec();
        let blocks = vec![
            Block::Paragraph {
                text: "intro".to_string(),
            },
            Block::Spacer { height_mm: 15.0 },
            Block::Heading {
                level: 2,
                text: "Section".to_string(),
            },
            sample_table(),
        ];
        let pages = paginate(&blocks, &spec);
        assert_eq!(page_texts(&pages[0]), vec!["intro"]);
        let texts = page_texts(&pages[1]);
        assert!(texts.contains(&"Section"));
        assert!(
            texts.contains(&"Object") && texts.contains(&"Row 0"),
            "table start must follow its heading: {texts:?}"
        );
    }

    #[test]
    fn test_heading_breaks_with_the_banner_it_introduces() {
        let spec = small_spec();
        let blocks = vec![
            Block::Paragraph {
                text: "intro".to_string(),
            },
            Block::Spacer { height_mm: 20.0 },
            Block::Heading {
                level: 2,
                text: "Valuation".to_string(),
            },
            Block::ValueBanner {
                amount: "€412,500".to_string(),
                caption: "Estimated market value".to_string(),
            },
        ];
        let pages = paginate(&blocks, &spec);
        assert!(!page_texts(&pages[0]).contains(&"Valuation"));
        let texts = page_texts(&pages[1]);
        assert!(texts.contains(&"Valuation") && texts.contains(&"€412,500"));
    }

    #[test]
    fn test_table_repeats_header_after_break() {
        let pages = paginate(&[sample_table()], &small_spec());
        assert!(pages.len() > 1);
        for page in &pages {
            let texts = page_texts(page);
            if texts.iter().any(|t| t.starts_with("Row ")) {
                assert!(texts.contains(&"Object"), "header missing on {texts:?}");
                assert!(texts.contains(&"Price"));
            }
        }
    }

    #[test]
    fn test_table_needs_header_and_one_row_to_start() {
        let spec = small_spec();
        let blocks = vec![
            Block::Paragraph {
                text: "intro".to_string(),
            },
            Block::Spacer { height_mm: 30.0 },
            sample_table(),
        ];
        let pages = paginate(&blocks, &spec);
        assert!(!page_texts(&pages[0]).contains(&"Object"));
    }

    #[test]
    fn test_right_aligned_cells_end_at_column_edge() {
        let columns = vec![Column {
            heading: "Price".to_string(),
            width_mm: 30.0,
            align: Align::Right,
        }];
        let rows = vec![vec!["1,000".to_string()], vec!["999,000".to_string()]];
        let spec = PageSpec::default();
        let pages = paginate(&[Block::Table { columns, rows }], &spec);

        let right_edges: Vec<f64> = pages[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Text(t) if t.text.contains(',') => {
                    Some(t.x_mm + text_width_mm(&t.text, t.style, t.size_pt))
                }
                _ => None,
            })
            .collect();
        assert_eq!(right_edges.len(), 2);
        assert!((right_edges[0] - right_edges[1]).abs() < 1e-9);
    }

    #[test]
    fn test_oversized_spacer_breaks_without_blank_pages() {
        let blocks = vec![
            Block::Paragraph {
                text: "before".to_string(),
            },
            Block::Spacer { height_mm: 1000.0 },
            Block::Paragraph {
                text: "after".to_string(),
            },
        ];
        let pages = paginate(&blocks, &small_spec());
        assert_eq!(pages.len(), 2);
        assert_eq!(page_texts(&pages[1]), vec!["after"]);
    }

    #[test]
    fn test_footers_skip_the_cover() {
        let spec = PageSpec {
            footer_text: Some("REF-1 · generated 03 Nov 2025".to_string()),
            ..small_spec()
        };
        let sentence = "Lorem ipsum dolor sit amet consetetur sadipscing elitr sed diam. ";
        let blocks = vec![
            Block::Paragraph {
                text: "cover".to_string(),
            },
            Block::PageBreak,
            Block::Paragraph {
                text: sentence.repeat(40),
            },
        ];
        let pages = paginate(&blocks, &spec);
        assert!(pages.len() >= 3);

        assert!(!page_texts(&pages[0]).iter().any(|t| t.starts_with("Page ")));
        for (index, page) in pages.iter().enumerate().skip(1) {
            let expected = format!("Page {} of {}", index + 1, pages.len());
            assert!(
                page_texts(page).contains(&expected.as_str()),
                "page {index} should carry '{expected}'"
            );
            assert!(page_texts(page).contains(&"REF-1 · generated 03 Nov 2025"));
        }
    }
}
