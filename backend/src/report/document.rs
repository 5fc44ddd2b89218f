use image::RgbImage;

#[derive(Debug, Clone)]
pub enum Cell {
    Image { image: RgbImage, caption: String },
    Placeholder(String),
}

impl Cell {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Cell::Placeholder(_))
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Logo(RgbImage),
    Title(String),
    Subtitle(String),
    SectionHeading(String),
    Paragraph(String),
    /// Bold label followed by regular text on the same line.
    LabeledParagraph { label: String, text: String },
    Bullet(String),
    Spacer(f32),
    Rule,
    ImagePair { left: Cell, right: Cell },
    /// Two-column key/value table.
    Table(Vec<(String, String)>),
    PageBreak,
}

/// Ordered content blocks for one report, realized by the renderer.
#[derive(Debug, Clone, Default)]
pub struct ReportDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn spacer(&mut self, points: f32) -> &mut Self {
        self.push(Block::Spacer(points))
    }

    pub fn section(&mut self, heading: &str) -> &mut Self {
        self.push(Block::SectionHeading(heading.to_string()))
            .spacer(12.0)
    }

    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::SectionHeading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All visible text, in order. Used for content checks.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let text = match block {
                Block::Title(t)
                | Block::Subtitle(t)
                | Block::SectionHeading(t)
                | Block::Paragraph(t)
                | Block::Bullet(t) => t.clone(),
                Block::LabeledParagraph { label, text } => format!("{label} {text}"),
                Block::Table(rows) => rows
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::ImagePair { left, right } => [left, right]
                    .iter()
                    .map(|cell| match cell {
                        Cell::Image { caption, .. } => caption.clone(),
                        Cell::Placeholder(text) => text.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::Logo(_) | Block::Spacer(_) | Block::Rule | Block::PageBreak => continue,
            };
            out.push_str(&text);
            out.push('\n');
        }
        out
    }
}
