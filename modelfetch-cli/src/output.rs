//! Report output abstraction.
//!
//! Reports are written through [`Output`] so they can be captured in tests.
//! Logs and progress bars go to stderr; reports go to stdout.

use console::style;

/// Destination for human-readable report lines.
pub trait Output {
    /// Print a line.
    fn println(&self, text: &str);

    /// Print an empty line.
    fn newline(&self) {
        self.println("");
    }

    /// Print a line indented by two spaces.
    fn indented(&self, text: &str) {
        self.println(&format!("  {}", text));
    }

    /// Print a prominent section header.
    fn header(&self, text: &str);

    /// Print a secondary header.
    fn subheader(&self, text: &str);

    /// Print a line marked as successful.
    fn success(&self, text: &str);

    /// Print a line marked as failed.
    fn failure(&self, text: &str);
}

/// Styled output on stdout.
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Output for ConsoleOutput {
    fn println(&self, text: &str) {
        println!("{}", text);
    }

    fn header(&self, text: &str) {
        println!("{}", style(text).bold().underlined());
    }

    fn subheader(&self, text: &str) {
        println!("{}", style(text).bold());
    }

    fn success(&self, text: &str) {
        println!("{} {}", style("✓").green(), text);
    }

    fn failure(&self, text: &str) {
        println!("{} {}", style("✗").red(), text);
    }
}

/// Plain-text output collected into a string.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CaptureOutput {
    buffer: std::cell::RefCell<String>,
}

#[cfg(test)]
impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buffer.borrow().clone()
    }
}

#[cfg(test)]
impl Output for CaptureOutput {
    fn println(&self, text: &str) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push_str(text);
        buffer.push('\n');
    }

    fn header(&self, text: &str) {
        self.println(text);
    }

    fn subheader(&self, text: &str) {
        self.println(text);
    }

    fn success(&self, text: &str) {
        self.println(&format!("[ok] {}", text));
    }

    fn failure(&self, text: &str) {
        self.println(&format!("[fail] {}", text));
    }
}
