//! Indentation-aware line writer for generated sources

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct SourceWriter {
    buffer: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `text` at the current indentation, one line per `\n`
    pub fn line(&mut self, text: &str) -> &mut Self {
        for line in text.split('\n') {
            if line.is_empty() {
                self.buffer.push('\n');
                continue;
            }
            for _ in 0..self.depth {
                self.buffer.push_str(INDENT);
            }
            self.buffer.push_str(line);
            self.buffer.push('\n');
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.buffer.push('\n');
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    pub fn outdent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// `header {`, the body one level deeper, then `}` plus `suffix`
    pub fn block(&mut self, header: &str, suffix: &str, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.line(&format!("{header} {{"));
        self.indent();
        body(self);
        self.outdent();
        self.line(&format!("}}{suffix}"))
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}
