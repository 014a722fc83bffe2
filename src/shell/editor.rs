use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

/// Terminal line source for an interactive session
pub trait LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError>;
}

impl LineEditor for Editor<(), DefaultHistory> {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        let line = self.readline(prompt)?;
        if !line.trim().is_empty() {
            self.add_history_entry(line.as_str())?;
        }
        Ok(line)
    }
}
