//! Shopping list documents.
//!
//! A [`ShoppingListRenderer`] turns the aggregated list into a downloadable
//! file. [`PdfRenderer`] writes an A4 PDF with an embedded DejaVu Sans font;
//! [`TextRenderer`] writes the same lines as UTF-8 text.

use foodgram_common::{AppError, AppResult, DocumentFormat, config::ExportConfig};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use super::font::{EmbeddedFont, GlyphEncoder};
use super::shopping_list::ShoppingListItem;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 30.0;
const TITLE_X: f32 = 100.0;
const TITLE_Y: f32 = 770.0;
const RULE_Y: f32 = 710.0;
const FIRST_LINE_Y: f32 = 680.0;
const CONTINUATION_LINE_Y: f32 = 800.0;
const BOTTOM_MARGIN: f32 = 50.0;
const LINE_SPACING: f32 = 1.5;

const FONT_NAME: Name<'static> = Name(b"F1");

/// A rendered file ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// MIME type sent as `Content-Type`.
    pub content_type: &'static str,
    /// Suggested download name, extension included.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Renders an aggregated shopping list into a document.
pub trait ShoppingListRenderer: Send + Sync {
    /// Format produced by this renderer.
    fn format(&self) -> DocumentFormat;

    /// Render `items` for the user named `owner_full_name`.
    fn render(&self, owner_full_name: &str, items: &[ShoppingListItem])
    -> AppResult<RenderedDocument>;
}

/// Pick the renderer for a requested format.
pub fn renderer_for(
    format: DocumentFormat,
    config: &ExportConfig,
) -> AppResult<Box<dyn ShoppingListRenderer>> {
    Ok(match format {
        DocumentFormat::Pdf => Box::new(PdfRenderer::new(config)?),
        DocumentFormat::Txt => Box::new(TextRenderer),
    })
}

/// First character upper-cased, the rest lower-cased.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `"{Capitalized name} - {total} {unit}"`
#[must_use]
pub fn item_line(item: &ShoppingListItem) -> String {
    format!(
        "{} - {} {}",
        capitalize(&item.name),
        item.total_amount,
        item.measurement_unit
    )
}

/// Title line naming the list owner.
#[must_use]
pub fn document_title(owner_full_name: &str) -> String {
    format!("Список покупок. Автор {owner_full_name}")
}

fn file_name(owner_full_name: &str, extension: &str) -> String {
    format!("{}.{extension}", document_title(owner_full_name))
}

/// A4 PDF renderer with multi-page output.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    title_font_size: f32,
    item_font_size: f32,
}

impl PdfRenderer {
    /// Create a renderer using the configured font sizes.
    ///
    /// Sizes must be finite and positive.
    pub fn new(config: &ExportConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::Config)?;
        Ok(Self {
            title_font_size: config.title_font_size,
            item_font_size: config.item_font_size,
        })
    }

    fn line_height(&self) -> f32 {
        self.item_font_size * LINE_SPACING
    }

    fn lines_fitting(&self, top: f32) -> usize {
        let usable = (top - BOTTOM_MARGIN).max(0.0);
        (usable / self.line_height()).floor() as usize + 1
    }

    /// Split lines into pages: the first page holds fewer lines because of
    /// the title block.
    fn paginate<'a>(&self, lines: &'a [String]) -> Vec<&'a [String]> {
        let first = self.lines_fitting(FIRST_LINE_Y).min(lines.len());
        let (head, mut rest) = lines.split_at(first);

        let mut pages = vec![head];
        let per_page = self.lines_fitting(CONTINUATION_LINE_Y);
        while !rest.is_empty() {
            let (page, tail) = rest.split_at(per_page.min(rest.len()));
            pages.push(page);
            rest = tail;
        }
        pages
    }

    fn page_content(
        &self,
        encoder: &mut GlyphEncoder<'_>,
        title: Option<&str>,
        lines: &[String],
    ) -> Vec<u8> {
        let mut content = Content::new();

        let top = if let Some(title) = title {
            content.begin_text();
            content.set_font(FONT_NAME, self.title_font_size);
            content.next_line(TITLE_X, TITLE_Y);
            content.show(Str(&encoder.encode(title)));
            content.end_text();

            content.set_line_width(1.0);
            content.move_to(MARGIN_X, RULE_Y);
            content.line_to(PAGE_WIDTH - MARGIN_X, RULE_Y);
            content.stroke();

            FIRST_LINE_Y
        } else {
            CONTINUATION_LINE_Y
        };

        for (i, line) in lines.iter().enumerate() {
            let y = top - self.line_height() * i as f32;
            content.begin_text();
            content.set_font(FONT_NAME, self.item_font_size);
            content.next_line(MARGIN_X, y);
            content.show(Str(&encoder.encode(line)));
            content.end_text();
        }

        content.finish()
    }
}

impl ShoppingListRenderer for PdfRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn render(
        &self,
        owner_full_name: &str,
        items: &[ShoppingListItem],
    ) -> AppResult<RenderedDocument> {
        let title = document_title(owner_full_name);
        let lines: Vec<String> = items.iter().map(item_line).collect();
        let pages = self.paginate(&lines);

        let mut encoder = GlyphEncoder::new(EmbeddedFont::get()?);

        let mut next_id = Ref::new(1);
        let catalog_id = next_id.bump();
        let page_tree_id = next_id.bump();
        let font_id = next_id.bump();
        let info_id = next_id.bump();

        // Each page takes two ids: the page object and its content stream
        let page_ids: Vec<(Ref, Ref)> = pages
            .iter()
            .map(|_| (next_id.bump(), next_id.bump()))
            .collect();
        let page_count = i32::try_from(pages.len())
            .map_err(|_| AppError::Render(format!("too many pages: {}", pages.len())))?;

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.document_info(info_id)
            .title(TextStr(&title))
            .creator(TextStr("Foodgram"));
        pdf.pages(page_tree_id)
            .kids(page_ids.iter().map(|(page_id, _)| *page_id))
            .count(page_count);

        for (index, (lines, (page_id, content_id))) in pages.iter().zip(&page_ids).enumerate() {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
            page.parent(page_tree_id);
            page.contents(*content_id);
            page.resources().fonts().pair(FONT_NAME, font_id);
            page.finish();

            let page_title = (index == 0).then_some(title.as_str());
            let content = self.page_content(&mut encoder, page_title, lines);
            pdf.stream(*content_id, &content);
        }

        encoder.write(&mut pdf, font_id, &mut next_id);

        Ok(RenderedDocument {
            content_type: "application/pdf",
            file_name: file_name(owner_full_name, "pdf"),
            bytes: pdf.finish(),
        })
    }
}

/// UTF-8 plain text renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl ShoppingListRenderer for TextRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Txt
    }

    fn render(
        &self,
        owner_full_name: &str,
        items: &[ShoppingListItem],
    ) -> AppResult<RenderedDocument> {
        let mut text = document_title(owner_full_name);
        text.push_str("\n\n");
        for item in items {
            text.push_str(&item_line(item));
            text.push('\n');
        }

        Ok(RenderedDocument {
            content_type: "text/plain; charset=utf-8",
            file_name: file_name(owner_full_name, "txt"),
            bytes: text.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn item(name: &str, unit: &str, total_amount: u64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount,
        }
    }

    fn renderer() -> PdfRenderer {
        PdfRenderer::new(&ExportConfig::default()).unwrap()
    }

    fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle)
            .count()
    }

    /// `bfchar` entries of the document's `ToUnicode` map.
    fn unicode_map(pdf: &[u8]) -> HashMap<u16, char> {
        pdf.split(|&b| b == b'\n')
            .filter_map(|line| {
                let line = std::str::from_utf8(line).ok()?;
                let (glyph, unicode) = line
                    .strip_prefix('<')?
                    .strip_suffix('>')?
                    .split_once("> <")?;
                let glyph = u16::from_str_radix(glyph, 16).ok()?;
                let unicode = u32::from_str_radix(unicode, 16).ok()?;
                Some((glyph, char::from_u32(unicode)?))
            })
            .collect()
    }

    fn unescape(literal: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut bytes = literal.iter().copied();
        while let Some(b) = bytes.next() {
            if b != b'\\' {
                out.push(b);
                continue;
            }
            match bytes.next() {
                Some(b'n') => out.push(b'\n'),
                Some(b'r') => out.push(b'\r'),
                Some(b't') => out.push(b'\t'),
                Some(b'b') => out.push(0x08),
                Some(b'f') => out.push(0x0c),
                Some(digit @ b'0'..=b'7') => {
                    let mut value = digit - b'0';
                    for next in bytes.by_ref().take(2) {
                        value = value * 8 + (next - b'0');
                    }
                    out.push(value);
                }
                Some(other) => out.push(other),
                None => {}
            }
        }
        out
    }

    /// Operands of every `Tj` operator.
    fn shown_strings(pdf: &[u8]) -> Vec<Vec<u8>> {
        pdf.split(|&b| b == b'\n')
            .filter_map(|line| line.strip_suffix(b" Tj"))
            .filter_map(|operand| match operand {
                [b'<', hex @ .., b'>'] => Some(
                    hex.chunks(2)
                        .map(|pair| {
                            u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap()
                        })
                        .collect(),
                ),
                [b'(', literal @ .., b')'] => Some(unescape(literal)),
                _ => None,
            })
            .collect()
    }

    /// Extract the shown text lines the way a viewer would copy them.
    fn read_back(pdf: &[u8]) -> Vec<String> {
        let map = unicode_map(pdf);
        shown_strings(pdf)
            .iter()
            .map(|bytes| {
                bytes
                    .chunks(2)
                    .map(|pair| {
                        let glyph = u16::from_be_bytes([pair[0], pair[1]]);
                        map.get(&glyph).copied().unwrap_or('\u{fffd}')
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("мука"), "Мука");
        assert_eq!(capitalize("ОЛИВКОВОЕ МАСЛО"), "Оливковое масло");
        assert_eq!(capitalize("flour"), "Flour");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_item_line() {
        assert_eq!(item_line(&item("мука", "г", 300)), "Мука - 300 г");
    }

    #[test]
    fn test_text_render() {
        let items = vec![item("мука", "г", 300), item("соль", "г", 5)];

        let doc = TextRenderer.render("Иван Петров", &items).unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();

        assert_eq!(doc.content_type, "text/plain; charset=utf-8");
        assert_eq!(doc.file_name, "Список покупок. Автор Иван Петров.txt");
        assert_eq!(
            text,
            "Список покупок. Автор Иван Петров\n\nМука - 300 г\nСоль - 5 г\n"
        );
    }

    #[test]
    fn test_pdf_render_cyrillic_reads_back() {
        let items = vec![item("мука", "г", 300), item("соль", "г", 5)];

        let doc = renderer().render("Иван Петров", &items).unwrap();

        assert_eq!(
            read_back(&doc.bytes),
            vec![
                "Список покупок. Автор Иван Петров",
                "Мука - 300 г",
                "Соль - 5 г"
            ]
        );
        assert_eq!(count_occurrences(&doc.bytes, b"/Identity-H"), 1);
        assert_eq!(count_occurrences(&doc.bytes, b"/FontFile2"), 1);
        assert_eq!(count_occurrences(&doc.bytes, b"/ToUnicode"), 1);
    }

    #[test]
    fn test_pdf_render_single_page() {
        let items = vec![item("flour", "g", 300), item("salt", "g", 5)];

        let doc = renderer().render("John Smith", &items).unwrap();

        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.file_name, "Список покупок. Автор John Smith.pdf");
        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(count_occurrences(&doc.bytes, b"/Count 1"), 1);
        assert_eq!(
            read_back(&doc.bytes),
            vec![
                "Список покупок. Автор John Smith",
                "Flour - 300 g",
                "Salt - 5 g"
            ]
        );
    }

    #[test]
    fn test_pdf_render_empty_list() {
        let doc = renderer().render("John Smith", &[]).unwrap();

        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(count_occurrences(&doc.bytes, b"/Count 1"), 1);
        assert_eq!(read_back(&doc.bytes), vec!["Список покупок. Автор John Smith"]);
    }

    #[test]
    fn test_pdf_paginates_long_lists() {
        let items: Vec<ShoppingListItem> = (0..100)
            .map(|i| item(&format!("item {i:03}"), "g", 1))
            .collect();

        let doc = renderer().render("John Smith", &items).unwrap();
        let lines = read_back(&doc.bytes);

        // 31 lines under the title, then 36 per continuation page
        assert_eq!(count_occurrences(&doc.bytes, b"/Count 3"), 1);
        assert_eq!(lines.len(), 101);
        assert_eq!(lines.last().map(String::as_str), Some("Item 099 - 1 g"));
    }

    #[test]
    fn test_paginate_keeps_every_line() {
        let lines: Vec<String> = (0..80).map(|i| i.to_string()).collect();

        let renderer = renderer();
        let pages = renderer.paginate(&lines);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), 80);
        assert_eq!(pages[0].len(), 31);
        assert_eq!(pages[1].len(), 36);
    }

    #[test]
    fn test_pdf_renderer_rejects_non_positive_font_size() {
        for size in [0.0, -14.0, f32::NAN] {
            let config = ExportConfig {
                item_font_size: size,
                ..ExportConfig::default()
            };

            assert!(matches!(
                PdfRenderer::new(&config),
                Err(AppError::Config(_))
            ));
            assert!(renderer_for(DocumentFormat::Pdf, &config).is_err());
            assert!(renderer_for(DocumentFormat::Txt, &config).is_ok());
        }
    }

    #[test]
    fn test_renderer_for() {
        let config = ExportConfig::default();

        assert_eq!(
            renderer_for(DocumentFormat::Pdf, &config).unwrap().format(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            renderer_for(DocumentFormat::Txt, &config).unwrap().format(),
            DocumentFormat::Txt
        );
    }
}
