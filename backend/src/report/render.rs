use image::RgbImage;
use printpdf::{
    BuiltinFont, Color, Image as PdfImage, ImageTransform, IndirectFontRef, Line, Mm,
    PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Rgb as PdfRgb, image_crate,
};
use std::io::BufWriter;

use super::ReportError;
use super::document::{Block, Cell, ReportDocument};

// US Letter, 36pt margins.
const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const MARGIN_PT: f32 = 36.0;
const CONTENT_WIDTH_PT: f32 = PAGE_WIDTH_PT - 2.0 * MARGIN_PT;

const IMAGE_DPI: f32 = 300.0;
const IMAGE_BOX_PT: f32 = 220.0;
const IMAGE_COLUMN_PT: f32 = 260.0;
const LOGO_SIZE_PT: (f32, f32) = (130.0, 70.0);
const TABLE_KEY_COLUMN_PT: f32 = 160.0;
const TABLE_VALUE_COLUMN_PT: f32 = 360.0;
const CELL_PADDING_PT: f32 = 6.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

struct TextStyle {
    size: f32,
    leading: f32,
    bold: bool,
    color: (f32, f32, f32),
    align: Align,
}

const TITLE: TextStyle = TextStyle {
    size: 20.0,
    leading: 24.0,
    bold: true,
    color: (0.0, 0.0, 0.0),
    align: Align::Center,
};
const SUBTITLE: TextStyle = TextStyle {
    size: 10.0,
    leading: 12.0,
    bold: false,
    color: (0.5, 0.5, 0.5),
    align: Align::Center,
};
const SECTION: TextStyle = TextStyle {
    size: 16.0,
    leading: 20.0,
    bold: true,
    color: (0.043, 0.239, 0.569),
    align: Align::Center,
};
const BODY: TextStyle = TextStyle {
    size: 10.0,
    leading: 14.0,
    bold: false,
    color: (0.0, 0.0, 0.0),
    align: Align::Left,
};
const BODY_BOLD: TextStyle = TextStyle {
    bold: true,
    ..BODY
};

fn max_chars(width_pt: f32, font_size: f32) -> usize {
    ((width_pt / (font_size * AVG_GLYPH_WIDTH)) as usize).max(1)
}

fn text_width_pt(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_GLYPH_WIDTH
}

/// Word wrap on character count; builtin fonts carry no metrics.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Builtin PDF fonts only cover WinAnsi; map the few typographic characters
/// that show up in reference text and drop anything outside Latin-1.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{2013}' | '\u{2014}' => Some('-'),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{2022}' | '\u{00B7}' => Some('-'),
            c if c.is_ascii() || ('\u{00A0}'..='\u{00FF}').contains(&c) => Some(c),
            _ => None,
        })
        .collect()
}

fn to_pdf_image(image: &RgbImage) -> Result<PdfImage, ReportError> {
    let (width, height) = image.dimensions();
    let buffer = image_crate::RgbImage::from_raw(width, height, image.as_raw().clone())
        .ok_or_else(|| ReportError::Render("image buffer size mismatch".into()))?;
    Ok(PdfImage::from_dynamic_image(
        &image_crate::DynamicImage::ImageRgb8(buffer),
    ))
}

/// Largest size with the image's aspect ratio that fits in the box.
fn fit(image: &RgbImage, box_w: f32, box_h: f32) -> (f32, f32) {
    let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = (box_w / w).min(box_h / h);
    (w * scale, h * scale)
}

struct PdfRenderer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance from the page bottom, in points.
    cursor: f32,
    page_has_content: bool,
    pages: usize,
}

impl PdfRenderer {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, pt(PAGE_WIDTH_PT), pt(PAGE_HEIGHT_PT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?;
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: PAGE_HEIGHT_PT - MARGIN_PT,
            page_has_content: false,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(pt(PAGE_WIDTH_PT), pt(PAGE_HEIGHT_PT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT_PT - MARGIN_PT;
        self.page_has_content = false;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < MARGIN_PT && self.page_has_content {
            self.new_page();
        }
    }

    fn set_fill(&self, (r, g, b): (f32, f32, f32)) {
        self.layer
            .set_fill_color(Color::Rgb(PdfRgb::new(r, g, b, None)));
    }

    fn stroke(&self, points: &[(f32, f32)], closed: bool, gray: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(PdfRgb::new(gray, gray, gray, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: points
                .iter()
                .map(|&(x, y)| (Point::new(pt(x), pt(y)), false))
                .collect(),
            is_closed: closed,
        });
    }

    fn draw_rect(&self, x: f32, top: f32, width: f32, height: f32, gray: f32, thickness: f32) {
        let bottom = top - height;
        self.stroke(
            &[(x, top), (x + width, top), (x + width, bottom), (x, bottom)],
            true,
            gray,
            thickness,
        );
    }

    fn text_line(&self, text: &str, style: &TextStyle, x: f32, baseline: f32) {
        let font = if style.bold { &self.bold } else { &self.regular };
        self.set_fill(style.color);
        self.layer
            .use_text(text, style.size, pt(x), pt(baseline), font);
    }

    /// Wrapped text block within `[x, x + width]`, starting at the cursor.
    fn paragraph(&mut self, text: &str, style: &TextStyle, x: f32, width: f32) {
        let text = pdf_safe(text);
        for line in wrap_text(&text, max_chars(width, style.size)) {
            self.ensure_space(style.leading);
            let line_x = match style.align {
                Align::Left => x,
                Align::Center => x + ((width - text_width_pt(&line, style.size)) / 2.0).max(0.0),
            };
            self.text_line(&line, style, line_x, self.cursor - style.size);
            self.cursor -= style.leading;
            self.page_has_content = true;
        }
    }

    fn labeled_paragraph(&mut self, label: &str, text: &str) {
        if text.is_empty() {
            self.paragraph(label, &BODY_BOLD, MARGIN_PT, CONTENT_WIDTH_PT);
            return;
        }
        let label = pdf_safe(label);
        let label_width = text_width_pt(&label, BODY.size) + BODY.size * AVG_GLYPH_WIDTH;
        let first_chars = max_chars(CONTENT_WIDTH_PT - label_width, BODY.size);
        let text = pdf_safe(text);

        let mut words = text.split_whitespace().peekable();
        let mut first = String::new();
        while let Some(word) = words.peek() {
            if !first.is_empty() && first.len() + word.len() + 1 > first_chars {
                break;
            }
            if !first.is_empty() {
                first.push(' ');
            }
            first.push_str(word);
            words.next();
        }

        self.ensure_space(BODY.leading);
        let baseline = self.cursor - BODY.size;
        self.text_line(&label, &BODY_BOLD, MARGIN_PT, baseline);
        self.text_line(&first, &BODY, MARGIN_PT + label_width, baseline);
        self.cursor -= BODY.leading;
        self.page_has_content = true;

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            self.paragraph(&rest.join(" "), &BODY, MARGIN_PT, CONTENT_WIDTH_PT);
        }
    }

    fn image_at(&self, image: &RgbImage, x: f32, bottom: f32, width: f32) -> Result<(), ReportError> {
        let natural_width = image.width().max(1) as f32 / IMAGE_DPI * 72.0;
        let scale = width / natural_width;
        to_pdf_image(image)?.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(pt(x)),
                translate_y: Some(pt(bottom)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn logo(&mut self, logo: &RgbImage) -> Result<(), ReportError> {
        let (w, h) = fit(logo, LOGO_SIZE_PT.0, LOGO_SIZE_PT.1);
        self.ensure_space(h);
        let x = MARGIN_PT + (CONTENT_WIDTH_PT - w) / 2.0;
        self.image_at(logo, x, self.cursor - h, w)?;
        self.cursor -= h;
        self.page_has_content = true;
        Ok(())
    }

    fn image_pair(&mut self, left: &Cell, right: &Cell) -> Result<(), ReportError> {
        let caption_height = BODY.leading;
        let row_height = CELL_PADDING_PT + IMAGE_BOX_PT + caption_height + 2.0 * CELL_PADDING_PT;
        self.ensure_space(row_height);

        let top = self.cursor;
        let table_x = MARGIN_PT + (CONTENT_WIDTH_PT - 2.0 * IMAGE_COLUMN_PT) / 2.0;
        for (column, cell) in [left, right].into_iter().enumerate() {
            let column_x = table_x + column as f32 * IMAGE_COLUMN_PT;
            let cell_top = top - CELL_PADDING_PT;
            match cell {
                Cell::Image { image, caption } => {
                    let (w, h) = fit(image, IMAGE_BOX_PT, IMAGE_BOX_PT);
                    let x = column_x + (IMAGE_COLUMN_PT - w) / 2.0;
                    self.image_at(image, x, cell_top - h, w)?;
                    let caption = pdf_safe(caption);
                    let caption_x =
                        column_x + (IMAGE_COLUMN_PT - text_width_pt(&caption, SUBTITLE.size)) / 2.0;
                    self.text_line(
                        &caption,
                        &SUBTITLE,
                        caption_x,
                        cell_top - IMAGE_BOX_PT - SUBTITLE.leading,
                    );
                }
                Cell::Placeholder(text) => {
                    let lines = wrap_text(
                        &pdf_safe(text),
                        max_chars(IMAGE_COLUMN_PT - 2.0 * CELL_PADDING_PT, BODY.size),
                    );
                    for (i, line) in lines.iter().enumerate() {
                        self.text_line(
                            line,
                            &BODY,
                            column_x + CELL_PADDING_PT,
                            cell_top - BODY.size - i as f32 * BODY.leading,
                        );
                    }
                }
            }
        }
        self.draw_rect(table_x, top, 2.0 * IMAGE_COLUMN_PT, row_height, 0.83, 0.5);
        self.cursor -= row_height;
        self.page_has_content = true;
        Ok(())
    }

    fn table(&mut self, rows: &[(String, String)]) {
        let table_x = MARGIN_PT + (CONTENT_WIDTH_PT - TABLE_KEY_COLUMN_PT - TABLE_VALUE_COLUMN_PT) / 2.0;
        for (key, value) in rows {
            let key_lines = wrap_text(
                &pdf_safe(key),
                max_chars(TABLE_KEY_COLUMN_PT - 2.0 * CELL_PADDING_PT, BODY.size),
            );
            let value_lines = wrap_text(
                &pdf_safe(value),
                max_chars(TABLE_VALUE_COLUMN_PT - 2.0 * CELL_PADDING_PT, BODY.size),
            );
            let line_count = key_lines.len().max(value_lines.len()) as f32;
            let row_height = line_count * BODY.leading + 2.0 * CELL_PADDING_PT;
            self.ensure_space(row_height);

            let top = self.cursor;
            for (i, line) in key_lines.iter().enumerate() {
                self.text_line(
                    line,
                    &BODY_BOLD,
                    table_x + CELL_PADDING_PT,
                    top - CELL_PADDING_PT - BODY.size - i as f32 * BODY.leading,
                );
            }
            for (i, line) in value_lines.iter().enumerate() {
                self.text_line(
                    line,
                    &BODY,
                    table_x + TABLE_KEY_COLUMN_PT + CELL_PADDING_PT,
                    top - CELL_PADDING_PT - BODY.size - i as f32 * BODY.leading,
                );
            }
            self.draw_rect(table_x, top, TABLE_KEY_COLUMN_PT, row_height, 0.5, 0.5);
            self.draw_rect(
                table_x + TABLE_KEY_COLUMN_PT,
                top,
                TABLE_VALUE_COLUMN_PT,
                row_height,
                0.5,
                0.5,
            );
            self.cursor -= row_height;
            self.page_has_content = true;
        }
    }

    fn rule(&mut self) {
        self.ensure_space(1.0);
        self.stroke(
            &[
                (MARGIN_PT, self.cursor),
                (MARGIN_PT + CONTENT_WIDTH_PT, self.cursor),
            ],
            false,
            0.5,
            0.75,
        );
        self.cursor -= 1.0;
        self.page_has_content = true;
    }

    fn block(&mut self, block: &Block) -> Result<(), ReportError> {
        match block {
            Block::Logo(image) => self.logo(image)?,
            Block::Title(text) => self.paragraph(text, &TITLE, MARGIN_PT, CONTENT_WIDTH_PT),
            Block::Subtitle(text) => self.paragraph(text, &SUBTITLE, MARGIN_PT, CONTENT_WIDTH_PT),
            Block::SectionHeading(text) => {
                // Keep a heading together with at least a few lines of its section.
                self.ensure_space(SECTION.leading + 4.0 * BODY.leading);
                self.paragraph(text, &SECTION, MARGIN_PT, CONTENT_WIDTH_PT)
            }
            Block::Paragraph(text) => self.paragraph(text, &BODY, MARGIN_PT, CONTENT_WIDTH_PT),
            Block::LabeledParagraph { label, text } => self.labeled_paragraph(label, text),
            Block::Bullet(text) => {
                let indent = 12.0;
                self.paragraph(
                    &format!("- {text}"),
                    &BODY,
                    MARGIN_PT + indent,
                    CONTENT_WIDTH_PT - indent,
                )
            }
            Block::Spacer(points) => {
                if self.page_has_content {
                    self.cursor = (self.cursor - points).max(MARGIN_PT);
                }
            }
            Block::Rule => self.rule(),
            Block::ImagePair { left, right } => self.image_pair(left, right)?,
            Block::Table(rows) => self.table(rows),
            Block::PageBreak => {
                if self.page_has_content {
                    self.new_page();
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportError::Render(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ReportError::Render(format!("PDF buffer error: {e}")))
    }
}

/// Lays out the blocks on US Letter pages and returns the PDF bytes with the
/// number of pages produced.
pub fn render_pdf(document: &ReportDocument) -> Result<(Vec<u8>, usize), ReportError> {
    let mut renderer = PdfRenderer::new(&document.title)?;
    for block in &document.blocks {
        renderer.block(block)?;
    }
    let pages = renderer.pages;
    Ok((renderer.finish()?, pages))
}
