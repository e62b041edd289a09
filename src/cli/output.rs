//! Colored terminal output helpers.

use owo_colors::OwoColorize;

/// Output style configuration.
pub struct Output {
    /// Whether to use colored output.
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Colors enabled.
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Colors disabled.
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the startup banner.
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n  {} {}\n",
                "vellum".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n  vellum v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Success message with a checkmark.
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Informational message.
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Warning message.
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Error message, to stderr.
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// A key-value detail line, indented under a previous message.
    pub fn detail(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {} {}", format!("{}:", key).dimmed(), value);
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Section heading.
    pub fn heading(&self, text: &str) {
        if self.colored {
            println!("\n  {}\n", text.bright_white().bold());
        } else {
            println!("\n  {}\n", text);
        }
    }
}
