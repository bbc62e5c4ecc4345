use std::io::{self, Write};
use std::path::PathBuf;

use gpx_engine::{AtomicFileWriter, PersistError};
use gpx_logging::gpx_info;

use super::render::{page_shell, UiCommand};

/// Applies [`UiCommand`]s to a terminal. Repeated lines are printed once.
pub struct TerminalUi<W: Write = io::Stdout> {
    out: W,
    writer: AtomicFileWriter,
    title: String,
    last_status: Option<String>,
    last_diagnostic: Option<String>,
}

impl TerminalUi<io::Stdout> {
    pub fn new(writer: AtomicFileWriter, title: impl Into<String>) -> Self {
        Self::with_output(io::stdout(), writer, title)
    }
}

impl<W: Write> TerminalUi<W> {
    pub fn with_output(out: W, writer: AtomicFileWriter, title: impl Into<String>) -> Self {
        Self {
            out,
            writer,
            title: title.into(),
            last_status: None,
            last_diagnostic: None,
        }
    }

    /// Returns the page path when a fragment was written.
    pub fn apply(&mut self, commands: Vec<UiCommand>) -> Result<Option<PathBuf>, PersistError> {
        let mut written = None;
        for command in commands {
            match command {
                UiCommand::Status(text) => {
                    if self.last_status.as_deref() != Some(text.as_str()) {
                        writeln!(self.out, "{text}")?;
                        self.last_status = Some(text);
                    }
                }
                UiCommand::Prompt(text) => {
                    writeln!(self.out, "! {text}")?;
                }
                UiCommand::Diagnostic(text) => {
                    if self.last_diagnostic.as_deref() != Some(text.as_str()) {
                        writeln!(self.out, "  {text}")?;
                        self.last_diagnostic = Some(text);
                    }
                }
                UiCommand::ShowFragment(fragment) => {
                    let page = page_shell(&self.title, &fragment);
                    let path = self.writer.write(&page)?;
                    gpx_info!("Wrote map page to {}", path.display());
                    writeln!(self.out, "Map written to {}", path.display())?;
                    written = Some(path);
                }
            }
        }
        self.out.flush()?;
        Ok(written)
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
