use eframe::egui::{Color32, ColorImage, Vec2};

use crate::source::{Token, TokenKind, tokenize};

const KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "continue", "default",
    "do", "double", "else", "enum", "extends", "final", "finally", "float", "for", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "new", "package", "private",
    "protected", "public", "record", "return", "short", "static", "super", "switch", "this",
    "throw", "throws", "try", "var", "void", "while",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ink {
    Keyword,
    Type,
    Ident,
    Literal,
    Symbol,
    Comment,
}

/// Draws source text as a minimap: one block per glyph, coloured by token class.
#[derive(Clone, Debug)]
pub struct MinimapRenderer {
    pub char_width: f32,
    pub line_height: f32,
    pub padding: f32,
    pub tab_width: usize,
    pub min_columns: usize,
    pub max_columns: usize,
    pub max_lines: usize,
    pub background: Color32,
}

impl Default for MinimapRenderer {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 14.0,
            padding: 6.0,
            tab_width: 4,
            min_columns: 24,
            max_columns: 120,
            max_lines: 300,
            background: Color32::from_rgb(250, 250, 247),
        }
    }
}

impl MinimapRenderer {
    /// Size of the text area, clamped to the column and line limits.
    pub fn preferred_size(&self, text: &str) -> Vec2 {
        let columns = text
            .lines()
            .map(|line| self.columns(line))
            .max()
            .unwrap_or(0)
            .clamp(self.min_columns, self.max_columns);
        let lines = text.lines().count().clamp(1, self.max_lines);
        Vec2::new(
            columns as f32 * self.char_width + 2.0 * self.padding,
            lines as f32 * self.line_height + 2.0 * self.padding,
        )
    }

    pub fn render(&self, text: &str, size: Vec2) -> ColorImage {
        let width = size.x.max(0.0).round() as usize;
        let height = size.y.max(0.0).round() as usize;
        let mut image = ColorImage::filled([width, height], self.background);
        let tokens = tokenize(text);
        let mut next = 0;
        let block_height = (self.line_height / 2.0).max(1.0);

        let mut line_start = 0;
        for (row, line) in text.split('\n').enumerate().take(self.max_lines) {
            let top = self.padding + row as f32 * self.line_height + (self.line_height - block_height) / 2.0;
            let mut column = 0;
            for (offset, ch) in line.char_indices() {
                if column >= self.max_columns {
                    break;
                }
                if ch == '\t' {
                    column += self.tab_width;
                    continue;
                }
                if ch.is_whitespace() {
                    column += 1;
                    continue;
                }

                let byte = line_start + offset;
                while tokens.get(next).is_some_and(|token| token.end <= byte) {
                    next += 1;
                }
                let ink = tokens
                    .get(next)
                    .filter(|token| token.start <= byte)
                    .map_or(Ink::Comment, ink_for);
                let left = self.padding + column as f32 * self.char_width;
                fill(&mut image, left, top, self.char_width - 1.0, block_height, color_for(ink));
                column += 1;
            }
            line_start += line.len() + 1;
        }
        image
    }

    fn columns(&self, line: &str) -> usize {
        line.chars()
            .map(|ch| if ch == '\t' { self.tab_width } else { 1 })
            .sum()
    }
}

fn ink_for(token: &Token<'_>) -> Ink {
    match token.kind {
        TokenKind::Ident if KEYWORDS.contains(&token.text) => Ink::Keyword,
        TokenKind::Ident if token.text.starts_with(char::is_uppercase) => Ink::Type,
        TokenKind::Ident => Ink::Ident,
        TokenKind::Literal => Ink::Literal,
        TokenKind::Symbol(_) => Ink::Symbol,
    }
}

fn color_for(ink: Ink) -> Color32 {
    match ink {
        Ink::Keyword => Color32::from_rgb(127, 0, 85),
        Ink::Type => Color32::from_rgb(0, 80, 160),
        Ink::Ident => Color32::from_rgb(60, 60, 60),
        Ink::Literal => Color32::from_rgb(42, 0, 255),
        Ink::Symbol => Color32::from_rgb(150, 150, 150),
        Ink::Comment => Color32::from_rgb(63, 127, 95),
    }
}

fn fill(image: &mut ColorImage, left: f32, top: f32, width: f32, height: f32, color: Color32) {
    let [image_width, image_height] = image.size;
    let x0 = left.max(0.0) as usize;
    let y0 = top.max(0.0) as usize;
    let x1 = ((left + width).max(0.0) as usize).min(image_width);
    let y1 = ((top + height).max(0.0) as usize).min(image_height);
    for y in y0..y1 {
        let row = y * image_width;
        image.pixels[row + x0.min(x1)..row + x1].fill(color);
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Color32, vec2};

    use super::{Ink, MinimapRenderer, color_for};

    #[test]
    fn preferred_size_follows_the_longest_line() {
        let renderer = MinimapRenderer::default();
        let narrow = renderer.preferred_size("class A {}\n");
        assert_eq!(narrow, vec2(24.0 * 7.0 + 12.0, 14.0 + 12.0));

        let wide = renderer.preferred_size(&format!("{}\n\n\n", "x".repeat(200)));
        assert_eq!(wide, vec2(120.0 * 7.0 + 12.0, 3.0 * 14.0 + 12.0));
        assert_eq!(renderer.preferred_size("").y, 14.0 + 12.0);
    }

    #[test]
    fn glyphs_are_coloured_by_token_class() {
        let renderer = MinimapRenderer::default();
        let text = "class Dog // pet\n";
        let size = renderer.preferred_size(text);
        let image = renderer.render(text, size);
        assert_eq!(image.size, [size.x as usize, size.y as usize]);

        let pixel = |column: usize| {
            let x = 6 + column * 7 + 2;
            let y = 6 + 7;
            image.pixels[y * image.size[0] + x]
        };
        assert_eq!(pixel(0), color_for(Ink::Keyword));
        assert_eq!(pixel(5), Color32::from_rgb(250, 250, 247), "space stays blank");
        assert_eq!(pixel(6), color_for(Ink::Type));
        assert_eq!(pixel(10), color_for(Ink::Comment));
    }

    #[test]
    fn tiny_targets_do_not_panic() {
        let renderer = MinimapRenderer::default();
        let image = renderer.render("class A extends B {}", vec2(3.0, 2.0));
        assert_eq!(image.size, [3, 2]);
        let empty = renderer.render("class A", vec2(0.0, 0.0));
        assert!(empty.pixels.is_empty());
    }
}
