//! Text vs JSON rendering of command results.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;

/// Writes payloads in the selected format.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders `payload` to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)
    }

    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Text => payload.render_text(w),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)
            }
        }
    }
}

/// Human-readable rendering, implemented next to `Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}
