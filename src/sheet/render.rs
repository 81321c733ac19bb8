//! Sheet → PDF rendering with printpdf
//!
//! printpdf only places text and shapes at absolute positions, so this module
//! keeps a top-down cursor and provides the handful of layout primitives the
//! sheet needs (cells, wrapped cells, page breaks, header and footer).

use anyhow::{anyhow, Context, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use super::markdown::{parse, Block};
use super::style::{BaseTemplate, Palette, PdfStyle, Rgb};
use crate::prompts::Audience;

/// Bottom margin that triggers a page break
const BREAK_MARGIN: f32 = 15.0;
/// Width of the phase-duration column (teal template)
const GUTTER_W: f32 = 22.0;
/// Width of the label column of key/value lines
const LABEL_W: f32 = 45.0;
/// Average glyph advance as a fraction of the font size
const AVG_ADVANCE: f32 = 0.52;
const PT_TO_MM: f32 = 25.4 / 72.0;

const GRAY_FOOTER: Rgb = (130, 130, 130);
const GRAY_WATERMARK: Rgb = (200, 200, 200);
const GRAY_COVER: Rgb = (120, 120, 120);
const BLACK: Rgb = (0, 0, 0);

/// Details printed on the optional cover page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverMeta {
    pub title: String,
    pub class_level: String,
    pub duration: String,
    pub author: String,
    pub date: String,
}

impl CoverMeta {
    /// Cover details derived from the export file name, dated today
    pub fn for_file(file_base: &str) -> Self {
        Self {
            title: file_base.replace('_', " "),
            class_level: String::new(),
            duration: "45 min".to_string(),
            author: String::new(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// Fill blank fields from [`CoverMeta::for_file`]
    pub fn or_defaults(self, file_base: &str) -> Self {
        let defaults = Self::for_file(file_base);
        let pick = |value: String, fallback: String| {
            if value.trim().is_empty() {
                fallback
            } else {
                value
            }
        };
        Self {
            title: pick(self.title, defaults.title),
            class_level: self.class_level,
            duration: pick(self.duration, defaults.duration),
            author: self.author,
            date: pick(self.date, defaults.date),
        }
    }
}

/// TrueType font data; empty means the PDF built-in Helvetica is used
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    regular: Option<Vec<u8>>,
    bold: Option<Vec<u8>>,
}

impl FontSet {
    /// Built-in Helvetica only
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load TTF files, falling back to the built-in font when the regular
    /// face is missing. A missing bold face reuses the regular one.
    pub fn load(regular: &Path, bold: &Path) -> Self {
        let read = |path: &Path| match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Font {:?} not loaded: {}", path, e);
                None
            }
        };

        let regular = read(regular);
        if regular.is_none() {
            warn!("DejaVu fonts not found, falling back to Helvetica (limited unicode)");
            return Self::builtin();
        }
        Self {
            bold: read(bold),
            regular,
        }
    }

    pub fn is_unicode(&self) -> bool {
        self.regular.is_some()
    }
}

/// Render the sheet `markdown` to PDF bytes.
pub fn render_sheet(
    markdown: &str,
    audience: Audience,
    style: &PdfStyle,
    cover: &CoverMeta,
    fonts: &FontSet,
) -> Result<Vec<u8>> {
    let blocks = parse(markdown);
    debug!("Rendering {} blocks with {:?} template", blocks.len(), style.base_template);

    let mut writer = SheetWriter::new(audience, style, fonts)?;
    writer.add_content(&blocks, cover);
    writer.finish()
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    unicode: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

/// Text run attributes
#[derive(Clone, Copy)]
struct Ink {
    size: f32,
    bold: bool,
    color: Rgb,
}

struct SheetWriter<'a> {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    style: &'a PdfStyle,
    palette: Palette,
    title: &'static str,
    page_w: f32,
    page_h: f32,
    /// Cursor, millimetres from the top edge
    y: f32,
    page_no: u32,
    fresh_first_page: bool,
    phase_duration: Option<String>,
    gutter_printed: bool,
}

impl<'a> SheetWriter<'a> {
    fn new(audience: Audience, style: &'a PdfStyle, font_set: &FontSet) -> Result<Self> {
        let (page_w, page_h) = style.page_size_mm();
        let title = audience.page_title();
        let (doc, page, layer) = PdfDocument::new(title, Mm(page_w), Mm(page_h), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);

        let fonts = match &font_set.regular {
            Some(regular) => {
                let regular_ref = doc
                    .add_external_font(Cursor::new(regular.clone()))
                    .map_err(|e| anyhow!("Failed to embed regular font: {:?}", e))?;
                let bold_ref = match &font_set.bold {
                    Some(bold) => doc
                        .add_external_font(Cursor::new(bold.clone()))
                        .map_err(|e| anyhow!("Failed to embed bold font: {:?}", e))?,
                    None => regular_ref.clone(),
                };
                Fonts {
                    regular: regular_ref,
                    bold: bold_ref,
                    unicode: true,
                }
            }
            None => Fonts {
                regular: doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|e| anyhow!("Failed to add Helvetica: {:?}", e))?,
                bold: doc
                    .add_builtin_font(BuiltinFont::HelveticaBold)
                    .map_err(|e| anyhow!("Failed to add Helvetica-Bold: {:?}", e))?,
                unicode: false,
            },
        };

        Ok(Self {
            doc,
            layer,
            fonts,
            style,
            palette: style.palette(),
            title,
            page_w,
            page_h,
            y: style.margins.top,
            page_no: 0,
            fresh_first_page: true,
            phase_duration: None,
            gutter_printed: false,
        })
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    fn left(&self) -> f32 {
        self.style.margins.left
    }

    fn content_w(&self) -> f32 {
        self.page_w - self.style.margins.left - self.style.margins.right
    }

    fn base(&self) -> f32 {
        self.style.base_font_size
    }

    fn line_h(&self, h: f32) -> f32 {
        h * self.style.line_spacing
    }

    fn text_w(text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * AVG_ADVANCE * PT_TO_MM
    }

    // ── Pages ─────────────────────────────────────────────────────────────

    fn add_page(&mut self, with_header: bool) {
        if self.fresh_first_page {
            self.fresh_first_page = false;
        } else {
            self.footer();
            let (page, layer) = self.doc.add_page(Mm(self.page_w), Mm(self.page_h), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
        }
        self.page_no += 1;
        self.y = self.style.margins.top;
        if with_header {
            self.header();
        }
    }

    fn ensure_space(&mut self, h: f32) {
        if self.y + h > self.page_h - BREAK_MARGIN {
            self.add_page(true);
        }
    }

    fn ln(&mut self, h: f32) {
        self.y += h;
    }

    // ── Drawing primitives ────────────────────────────────────────────────

    fn fill(&self, color: Rgb) {
        self.layer.set_fill_color(pdf_color(color));
    }

    fn rect(&self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.fill(color);
        let top = self.page_h - y;
        let bottom = top - h;
        let ring = vec![
            (Point::new(Mm(x), Mm(bottom)), false),
            (Point::new(Mm(x + w), Mm(bottom)), false),
            (Point::new(Mm(x + w), Mm(top)), false),
            (Point::new(Mm(x), Mm(top)), false),
        ];
        self.layer.add_polygon(Polygon {
            rings: vec![ring],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    fn hline(&self, x1: f32, x2: f32, y: f32, color: Rgb, thickness_mm: f32) {
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(thickness_mm / PT_TO_MM);
        let y = self.page_h - y;
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y)), false),
                (Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Draw one line of text in a cell without moving the cursor.
    fn cell(&self, x: f32, w: f32, h: f32, text: &str, ink: Ink, align: Align, bg: Option<Rgb>) {
        if let Some(bg) = bg {
            self.rect(x, self.y, w, h, bg);
        }
        if text.is_empty() {
            return;
        }

        let text = if self.fonts.unicode {
            text.to_string()
        } else {
            winansi_safe(text)
        };
        let text_x = match align {
            Align::Left => x + 1.0,
            Align::Center => x + ((w - Self::text_w(&text, ink.size)) / 2.0).max(0.0),
        };
        // Vertically centre the glyphs in the cell
        let size_mm = ink.size * PT_TO_MM;
        let baseline = self.y + h / 2.0 + size_mm * 0.35;

        self.fill(ink.color);
        let font = if ink.bold { &self.fonts.bold } else { &self.fonts.regular };
        self.layer
            .use_text(text, ink.size, Mm(text_x), Mm(self.page_h - baseline), font);
    }

    /// Wrapped text block after `prefix`; moves the cursor below the last line.
    #[allow(clippy::too_many_arguments)]
    fn multi_cell(&mut self, x: f32, w: f32, h: f32, prefix: &str, text: &str, ink: Ink, bg: Option<Rgb>) {
        for line in wrap(prefix, text, w - 2.0, ink.size) {
            self.ensure_space(h);
            self.cell(x, w, h, &line, ink, Align::Left, bg);
            self.y += h;
        }
    }

    // ── Page furniture ────────────────────────────────────────────────────

    fn header(&mut self) {
        let left = self.left();
        let width = self.content_w();
        let palette = self.palette;

        match self.style.base_template {
            BaseTemplate::Teal => {
                let ink = Ink { size: 16.0, bold: true, color: palette.primary };
                self.cell(left, width, 12.0, self.title, ink, Align::Center, None);
                self.ln(12.0 + 2.0);
                self.hline(left, left + width, self.y, palette.primary, 0.6);
                self.ln(6.0);
            }
            template => {
                let ink = Ink { size: self.base() * 1.8, bold: true, color: palette.primary };
                self.cell(left, width, 10.0, self.title, ink, Align::Center, None);
                self.ln(10.0);
                if template == BaseTemplate::Pro {
                    self.hline(left, left + width, self.y + 2.0, palette.secondary, 0.5);
                } else {
                    self.rect(left, self.y, width, 2.0, palette.secondary);
                    self.ln(2.0);
                }
                self.ln(8.0);
            }
        }

        if !self.style.watermark_text.is_empty() {
            // Drawn in light gray under the header, overlapping the content
            let ink = Ink { size: self.base() * 2.0, bold: true, color: GRAY_WATERMARK };
            self.ln(2.0);
            let watermark = self.style.watermark_text.clone();
            self.cell(left, width, 10.0, &watermark, ink, Align::Center, None);
            self.ln(2.0);
        }
    }

    fn footer(&mut self) {
        let ink = Ink {
            size: (self.base() * 0.7).max(8.0),
            bold: false,
            color: GRAY_FOOTER,
        };
        self.y = self.page_h - 12.0;
        let label = format!("Page {}", self.page_no);
        self.cell(self.left(), self.content_w(), 8.0, &label, ink, Align::Center, None);
    }

    fn cover_page(&mut self, meta: &CoverMeta) {
        self.add_page(false);
        let left = self.left();
        let width = self.content_w();
        let palette = self.palette;

        self.ln(40.0);
        let title_ink = Ink { size: self.base() * 2.2, bold: true, color: palette.primary };
        self.cell(left, width, 12.0, self.title, title_ink, Align::Center, None);
        self.ln(12.0 + 6.0);

        let ink = Ink { size: self.base() * 1.1, bold: false, color: palette.text };
        for (label, value) in [
            ("Sujet", &meta.title),
            ("Classe", &meta.class_level),
            ("Durée", &meta.duration),
        ] {
            if !value.trim().is_empty() {
                self.cell(left, width, 10.0, &format!("{}: {}", label, value.trim()), ink, Align::Center, None);
                self.ln(10.0);
            }
        }

        let author = meta.author.trim();
        let date = meta.date.trim();
        if !author.is_empty() || !date.is_empty() {
            self.ln(4.0);
            let line = match (author.is_empty(), date.is_empty()) {
                (false, false) => format!("{} — {}", author, date),
                (true, false) => format!("— {}", date),
                _ => author.to_string(),
            };
            let ink = Ink { size: ink.size, bold: false, color: GRAY_COVER };
            self.cell(left, width, 8.0, &line, ink, Align::Center, None);
            self.ln(8.0);
        }

        self.ln(10.0);
        self.rect(left, self.y, width, 4.0, palette.secondary);
    }

    // ── Blocks ────────────────────────────────────────────────────────────

    fn section(&mut self, title: &str) {
        let left = self.left();
        let width = self.content_w();
        let palette = self.palette;

        if self.style.base_template == BaseTemplate::Teal {
            self.phase_duration = None;
            self.gutter_printed = false;
            let ink = Ink { size: 14.0, bold: true, color: palette.secondary };
            let h = self.line_h(9.0);
            self.multi_cell(left, width, h, "", title, ink, None);
            self.ln(2.0);
        } else {
            let ink = Ink { size: self.base() * 1.2, bold: true, color: palette.secondary };
            let h = self.line_h(9.0);
            self.multi_cell(left, width, h, " ", title, ink, Some(palette.bg_light));
            if self.style.base_template == BaseTemplate::Study {
                self.hline(left, left + width, self.y, palette.secondary, 0.2);
            }
            self.ln(3.0);
        }
    }

    fn subsection(&mut self, title: &str) {
        let left = self.left();
        let width = self.content_w();
        let ink = if self.style.base_template == BaseTemplate::Teal {
            Ink { size: 12.0, bold: true, color: self.palette.primary }
        } else {
            Ink { size: self.base() * 1.05, bold: true, color: self.palette.accent }
        };
        let h = self.line_h(8.0);
        self.multi_cell(left, width, h, "", title, ink, None);
        self.ln(1.0);
    }

    fn phase(&mut self, title: &str, minutes: Option<u32>) {
        if self.style.base_template == BaseTemplate::Teal {
            self.phase_duration = minutes.map(|m| format!("{} min", m));
            self.gutter_printed = false;
            self.subsection(title);
        } else {
            match minutes {
                Some(m) => self.subsection(&format!("{} ({} min)", title, m)),
                None => self.subsection(title),
            }
        }
    }

    fn bullet(&mut self, text: &str) {
        let left = self.left();
        let width = self.content_w();

        if self.style.base_template == BaseTemplate::Teal {
            self.ensure_space(8.0);
            match (&self.phase_duration, self.palette.gutter_bg) {
                (Some(duration), Some(gutter_bg)) if !self.gutter_printed => {
                    let ink = Ink { size: 10.0, bold: true, color: self.palette.secondary };
                    let duration = duration.clone();
                    self.cell(left, GUTTER_W, 8.0, &duration, ink, Align::Center, Some(gutter_bg));
                    self.gutter_printed = true;
                }
                _ => {}
            }
            let ink = Ink { size: 11.0, bold: false, color: BLACK };
            self.multi_cell(left + GUTTER_W, width - GUTTER_W, 8.0, "• ", text, ink, None);
            self.ln(1.0);
        } else {
            let mark = if self.style.base_template == BaseTemplate::Study { '✓' } else { '•' };
            let ink = Ink { size: self.base() * 0.95, bold: false, color: self.palette.text };
            let h = self.line_h(7.0);
            self.multi_cell(left, width, h, &format!("  {}  ", mark), text, ink, None);
            self.ln(0.5);
        }
    }

    fn key_value(&mut self, label: &str, value: &str) {
        let left = self.left();
        let width = self.content_w();
        let h = self.line_h(7.0);
        let size = self.base() * 0.95;

        self.ensure_space(h);
        let label_ink = Ink { size, bold: true, color: self.palette.primary };
        self.cell(left, LABEL_W, h, &format!("{} :", label), label_ink, Align::Left, None);

        let value_ink = Ink { size, bold: false, color: self.palette.text };
        if value.is_empty() {
            self.y += h;
        } else {
            self.multi_cell(left + LABEL_W, width - LABEL_W, h, "", value, value_ink, None);
        }
        self.ln(1.0);
    }

    fn paragraph(&mut self, text: &str) {
        let ink = Ink { size: self.base() * 0.95, bold: false, color: self.palette.text };
        let h = self.line_h(7.0);
        self.multi_cell(self.left(), self.content_w(), h, "", text, ink, None);
        self.ln(1.5);
    }

    fn add_content(&mut self, blocks: &[Block], cover: &CoverMeta) {
        if self.style.show_cover {
            self.cover_page(cover);
        }
        self.add_page(true);
        self.phase_duration = None;
        self.gutter_printed = false;

        for block in blocks {
            match block {
                Block::Blank => self.ln(1.0),
                Block::Section(title) => self.section(title),
                Block::Phase { title, minutes } => self.phase(title, *minutes),
                Block::Bullet(text) => self.bullet(text),
                Block::KeyValue { label, value } => self.key_value(label, value),
                Block::Paragraph(text) => self.paragraph(text),
            }
        }
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        self.footer();
        debug!("Rendered {} page(s)", self.page_no);
        self.doc
            .save_to_bytes()
            .map_err(|e| anyhow!("{:?}", e))
            .context("Failed to serialize PDF")
    }
}

fn pdf_color((r, g, b): Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Greedy word wrap using the average glyph advance.
///
/// `prefix` (a bullet mark, an indent) is kept verbatim on the first line and
/// counts toward its width; later lines are indented by the same amount.
fn wrap(prefix: &str, text: &str, width_mm: f32, size: f32) -> Vec<String> {
    let max_chars = ((width_mm / (size * AVG_ADVANCE * PT_TO_MM)).floor() as usize).max(1);
    let indent = prefix.chars().count();
    let body_chars = max_chars.saturating_sub(indent).max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        // Hard-split words longer than a full line
        while word.len() > body_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(body_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > body_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    let hanging = " ".repeat(indent);
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| if i == 0 { format!("{}{}", prefix, line) } else { format!("{}{}", hanging, line) })
        .collect()
}

/// Map text onto what the built-in WinAnsi fonts can show.
fn winansi_safe(text: &str) -> String {
    const WINANSI_EXTRA: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";
    text.chars()
        .map(|c| match c {
            '✓' | '✔' => '•',
            c if (c as u32) < 0x100 || WINANSI_EXTRA.contains(c) => c,
            _ => '?',
        })
        .collect()
}
