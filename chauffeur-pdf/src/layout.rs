use chauffeur_core::Company;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::{PdfError, PdfResult};

pub(crate) const PAGE_WIDTH: f32 = 210.0;
pub(crate) const PAGE_HEIGHT: f32 = 297.0;
pub(crate) const MARGIN: f32 = 18.0;
pub(crate) const RIGHT: f32 = PAGE_WIDTH - MARGIN;

pub(crate) const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
pub(crate) const GREY: (f32, f32, f32) = (0.42, 0.45, 0.5);
pub(crate) const ACCENT: (f32, f32, f32) = (0.72, 0.56, 0.18);

/// Points to millimetres.
const PT: f32 = 0.3528;

fn render_err(e: impl std::fmt::Display) -> PdfError {
    PdfError::Render(e.to_string())
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Rough Helvetica advance width. Builtin fonts carry no metrics we can query,
/// so right alignment is approximate.
pub(crate) fn text_width(text: &str, size: f32) -> f32 {
    let ems: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.28,
            'f' | 't' | 'r' | ' ' | '-' | '(' | ')' | '/' => 0.33,
            'm' | 'w' | 'M' | 'W' | '@' => 0.85,
            c if c.is_ascii_uppercase() => 0.67,
            c if c.is_ascii_digit() => 0.556,
            _ => 0.52,
        })
        .sum();
    ems * size * PT
}

/// Shortens `text` to at most `max` characters, marking the cut with "...".
pub(crate) fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// A cursor over an A4 document that writes top-down and starts a new page
/// whenever the next block would run into the bottom margin.
pub(crate) struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    color: (f32, f32, f32),
    /// Baseline of the next line, measured from the page bottom.
    y: f32,
    pages: usize,
}

impl PageWriter {
    pub(crate) fn new(title: &str) -> PdfResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            color: BLACK,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    pub(crate) fn pages(&self) -> usize {
        self.pages
    }

    pub(crate) fn color(&mut self, color: (f32, f32, f32)) {
        self.color = color;
        self.layer.set_fill_color(rgb(color));
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    /// Writes at `x` on the current line without advancing.
    pub(crate) fn text(&self, x: f32, size: f32, bold: bool, text: &str) {
        self.layer
            .use_text(text, size, Mm(x), Mm(self.y), self.font(bold));
    }

    /// Writes so the text ends at `right`.
    pub(crate) fn text_right(&self, right: f32, size: f32, bold: bool, text: &str) {
        let x = (right - text_width(text, size)).max(MARGIN);
        self.text(x, size, bold, text);
    }

    pub(crate) fn advance(&mut self, mm: f32) {
        self.y -= mm;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    /// Starts a new page unless `mm` still fits above the bottom margin.
    pub(crate) fn ensure(&mut self, mm: f32) {
        if self.y - mm < MARGIN {
            self.new_page();
        }
    }

    pub(crate) fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.layer.set_fill_color(rgb(self.color));
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    /// Horizontal rule across the printable width, a little below the cursor.
    pub(crate) fn rule(&mut self, thickness: f32, color: (f32, f32, f32)) {
        let y = self.y + 2.0;
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(RIGHT), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Outlined box whose top edge sits `top_gap` above the cursor.
    pub(crate) fn frame(&self, x: f32, width: f32, height: f32, top_gap: f32) {
        let top = self.y + top_gap;
        let bottom = top - height;
        self.layer.set_outline_color(rgb(GREY));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(bottom)), false),
                (Point::new(Mm(x), Mm(bottom)), false),
            ],
            is_closed: true,
        });
    }

    pub(crate) fn finish(self) -> PdfResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(render_err)
    }
}

/// Company block on the left, document title and `meta` lines on the right.
pub(crate) fn letterhead(page: &mut PageWriter, company: &Company, title: &str, meta: &[String]) {
    page.color(ACCENT);
    page.text(MARGIN, 18.0, true, &company.name);
    page.text_right(RIGHT, 20.0, true, title);
    page.advance(7.0);

    page.color(GREY);
    let contact = [company.phone.as_deref(), company.email.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("  |  ");
    let mut left: Vec<&str> = Vec::new();
    if let Some(reg) = &company.registration {
        left.push(reg);
    }
    left.extend(company.address.iter().map(String::as_str));
    if !contact.is_empty() {
        left.push(&contact);
    }

    let rows = left.len().max(meta.len());
    for i in 0..rows {
        if let Some(line) = left.get(i) {
            page.text(MARGIN, 9.0, false, line);
        }
        if let Some(line) = meta.get(i) {
            page.text_right(RIGHT, 9.0, false, line);
        }
        page.advance(4.5);
    }

    page.advance(2.0);
    page.rule(1.0, ACCENT);
    page.color(BLACK);
    page.advance(8.0);
}

/// Bold section heading followed by a thin rule.
pub(crate) fn section(page: &mut PageWriter, title: &str) {
    page.ensure(20.0);
    page.color(ACCENT);
    page.text(MARGIN, 12.0, true, title);
    page.advance(2.0);
    page.rule(0.3, GREY);
    page.color(BLACK);
    page.advance(5.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("a very long customer name", 10), "a very ...");
    }

    #[test]
    fn test_wider_text_measures_wider() {
        assert!(text_width("WWW", 10.0) > text_width("iii", 10.0));
        assert_eq!(text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_writer_breaks_pages() {
        let mut page = PageWriter::new("test").unwrap();
        for _ in 0..100 {
            page.text(MARGIN, 10.0, false, "line");
            page.advance(6.0);
        }
        assert!(page.pages() > 1);
        let bytes = page.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
