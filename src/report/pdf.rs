//! printpdf backend. All layout decisions happen in [`super::layout`];
//! this module only walks placed elements and issues drawing calls, flipping
//! the y axis into PDF coordinates on the way. Layout math is f64; printpdf
//! speaks f32, so the narrowing happens here and nowhere else.

use std::fs;
use std::path::Path;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::error::AppResult;

use super::layout::{Element, FontStyle, Page, PageSpec, Tone};

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, printpdf::Error> {
        Ok(Self {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            oblique: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
        })
    }

    fn for_style(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Oblique => &self.oblique,
        }
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Body => Color::Rgb(Rgb::new(0.12, 0.12, 0.14, None)),
        Tone::Muted => Color::Rgb(Rgb::new(0.45, 0.45, 0.48, None)),
        Tone::Accent => Color::Rgb(Rgb::new(0.05, 0.28, 0.55, None)),
    }
}

fn draw_page(layer: &PdfLayerReference, page: &Page, spec: &PageSpec, fonts: &Fonts) {
    for element in &page.elements {
        match element {
            Element::Text(text) => {
                layer.set_fill_color(tone_color(text.tone));
                layer.use_text(
                    text.text.as_str(),
                    text.size_pt as f32,
                    Mm(text.x_mm as f32),
                    Mm((spec.height_mm - text.baseline_mm) as f32),
                    fonts.for_style(text.style),
                );
            }
            Element::Rule(rule) => {
                layer.set_outline_color(Color::Rgb(Rgb::new(0.60, 0.60, 0.63, None)));
                layer.set_outline_thickness(rule.thickness_pt as f32);
                let y = (spec.height_mm - rule.y_mm) as f32;
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(rule.x_mm as f32), Mm(y)), false),
                        (Point::new(Mm((rule.x_mm + rule.width_mm) as f32), Mm(y)), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }
}

/// Draws the laid-out pages into a PDF document and returns its bytes.
pub fn render_pdf(pages: &[Page], spec: &PageSpec, title: &str) -> AppResult<Vec<u8>> {
    let width = Mm(spec.width_mm as f32);
    let height = Mm(spec.height_mm as f32);
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "content");
    let fonts = Fonts::load(&doc)?;

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(width, height, "content");
            doc.get_page(page_index).get_layer(layer_index)
        };
        draw_page(&layer, page, spec, &fonts);
    }

    Ok(doc.save_to_bytes()?)
}

/// Like [`render_pdf`], but writes the document straight to disk.
pub fn render_pdf_file(path: &Path, pages: &[Page], spec: &PageSpec, title: &str) -> AppResult<()> {
    let bytes = render_pdf(pages, spec, title)?;
    fs::write(path, bytes)?;
    Ok(())
}
