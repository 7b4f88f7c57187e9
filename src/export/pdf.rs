//! Project PDF export
//!
//! Renders a title and free-text answer to an A4 document: centered title,
//! then one block per paragraph with simple word wrapping and page breaks.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use once_cell::sync::Lazy;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use regex::Regex;
use thiserror::Error;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const PT_TO_MM: f32 = 0.352_778;
const MARGIN_PT: f32 = 40.0;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 11.0;
/// Line height as a multiple of the font size
const LINE_SPACING: f32 = 1.2;
/// Average glyph advance as a fraction of the font size, used for wrapping
const GLYPH_WIDTH: f32 = 0.5;
const LAYER_NAME: &str = "Katman 1";

static UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_ığüşöçİĞÜŞÖÇ\- ]+").expect("valid regex"));
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to read font {path}: {source}")]
    Font {
        path: String,
        source: std::io::Error,
    },
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Attachment file name for a project title
pub fn safe_file_name(title: &str) -> String {
    let cleaned: String = UNSAFE_FILENAME
        .replace_all(title, "_")
        .chars()
        .take(80)
        .collect();
    let stem = if cleaned.is_empty() { "proje".to_string() } else { cleaned };
    format!("{stem}.pdf")
}

/// Render `title` and `content` to PDF bytes
///
/// Without a TrueType `font`, builtin Helvetica is used and non-ASCII letters
/// are transliterated.
pub fn render_project_pdf(
    title: &str,
    content: &str,
    font: Option<&Path>,
) -> Result<Vec<u8>, PdfError> {
    let (doc, page, layer) = PdfDocument::new(
        title,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );

    let (font_ref, builtin) = match font {
        Some(path) => {
            let file = File::open(path).map_err(|source| PdfError::Font {
                path: path.display().to_string(),
                source,
            })?;
            let font = doc.add_external_font(BufReader::new(file)).map_err(render_error)?;
            (font, false)
        }
        None => (
            doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?,
            true,
        ),
    };

    let layer = doc.get_page(page).get_layer(layer);
    let mut writer = PageWriter {
        doc,
        layer,
        font: font_ref,
        builtin,
        cursor_pt: MARGIN_PT,
    };

    writer.centered(title, TITLE_SIZE);
    writer.move_down(1.0, BODY_SIZE);

    for paragraph in PARAGRAPH_BREAK.split(content) {
        writer.paragraph(paragraph.trim(), BODY_SIZE);
        writer.move_down(0.7, BODY_SIZE);
    }

    writer.doc.save_to_bytes().map_err(render_error)
}

fn render_error(e: printpdf::Error) -> PdfError {
    PdfError::Render(format!("{e:?}"))
}

/// Top-down text cursor over a growing document
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    builtin: bool,
    /// Distance from the top edge of the page, in points
    cursor_pt: f32,
}

impl PageWriter {
    fn usable_width_pt() -> f32 {
        PAGE_WIDTH_MM / PT_TO_MM - 2.0 * MARGIN_PT
    }

    fn centered(&mut self, text: &str, size: f32) {
        for line in wrap(&self.prepare(text), max_chars(size)) {
            let width = line.chars().count() as f32 * size * GLYPH_WIDTH;
            let x = MARGIN_PT + ((Self::usable_width_pt() - width) / 2.0).max(0.0);
            self.write_line(&line, size, x);
        }
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        let text = self.prepare(text);
        for source_line in text.lines() {
            for line in wrap(source_line, max_chars(size)) {
                self.write_line(&line, size, MARGIN_PT);
            }
        }
    }

    fn write_line(&mut self, line: &str, size: f32, x_pt: f32) {
        let height = size * LINE_SPACING;
        let page_height_pt = PAGE_HEIGHT_MM / PT_TO_MM;
        if self.cursor_pt + height > page_height_pt - MARGIN_PT {
            self.new_page();
        }
        self.cursor_pt += height;
        let baseline = page_height_pt - self.cursor_pt;
        self.layer.use_text(
            line,
            size,
            Mm(x_pt * PT_TO_MM),
            Mm(baseline * PT_TO_MM),
            &self.font,
        );
    }

    fn move_down(&mut self, lines: f32, size: f32) {
        self.cursor_pt += lines * size * LINE_SPACING;
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_pt = MARGIN_PT;
    }

    fn prepare(&self, text: &str) -> String {
        if self.builtin {
            transliterate(text)
        } else {
            text.to_string()
        }
    }
}

fn max_chars(size: f32) -> usize {
    ((PageWriter::usable_width_pt() / (size * GLYPH_WIDTH)) as usize).max(1)
}

/// Greedy word wrap; words longer than a line are hard-split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Map text onto the ASCII range the builtin fonts can show
fn transliterate(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ı' => 'i',
            'İ' => 'I',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            'ö' => 'o',
            'Ö' => 'O',
            'ç' => 'c',
            'Ç' => 'C',
            'â' => 'a',
            'î' => 'i',
            'û' => 'u',
            '‘' | '’' => '\'',
            '“' | '”' => '"',
            '–' | '—' => '-',
            '…' => '.',
            '\t' => ' ',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}
