//! Markup converters.
//!
//! ReST to HTML and HTML to PDF are treated as black boxes behind two small
//! traits. [`CommandConverter`] implements both by piping the input through
//! an external program such as `rst2html5` or `weasyprint - -`.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;

use crate::error::{RenderError, RenderResult};

/// HTML produced from a markup document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HtmlParts {
    /// A complete, standalone HTML page.
    pub whole: String,
    /// The content of `<body>`, for embedding in another page.
    pub body: String,
}

impl HtmlParts {
    /// Split a standalone page into its parts. Input without a `<body>`
    /// element is used as the body as-is.
    pub fn from_whole(whole: impl Into<String>) -> Self {
        let whole = whole.into();
        let body = extract_body(&whole).unwrap_or(&whole).trim().to_string();
        Self { whole, body }
    }
}

fn extract_body(html: &str) -> Option<&str> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<body")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = lower[start..].find("</body>")? + start;
    Some(&html[start..end])
}

/// ReST text to HTML.
pub trait RestToHtml: Send + Sync {
    /// Convert `text`. `settings` carries the document type's overrides.
    fn convert(&self, text: &str, settings: &BTreeMap<String, String>) -> RenderResult<HtmlParts>;
}

/// HTML to PDF bytes.
pub trait HtmlToPdf: Send + Sync {
    fn convert(&self, html: &str) -> RenderResult<Vec<u8>>;
}

/// Runs an external program with the input on stdin and reads the result
/// from stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build from a command line split into words, program first.
    pub fn from_argv(argv: &[String]) -> RenderResult<Self> {
        let (program, args) = argv.split_first().ok_or(RenderError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn failure(&self, reason: impl Into<String>) -> RenderError {
        RenderError::Converter {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }

    /// Run the program with `extra_args` appended, feeding `input`.
    pub fn run(&self, extra_args: &[String], input: &[u8]) -> RenderResult<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("could not start: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure("stdin was not captured"))?;
        let input = input.to_vec();
        // Feed stdin from another thread so a full stdout pipe cannot deadlock us.
        let writer = thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            // The program may exit without reading all of its input.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(self.failure("stdin writer panicked")),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(program = %self.program, status = %output.status, "converter failed");
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }
        tracing::debug!(
            program = %self.program,
            bytes = output.stdout.len(),
            "converter finished"
        );
        Ok(output.stdout)
    }
}

impl RestToHtml for CommandConverter {
    /// Settings become `--key=value` options; keys starting with `_` are
    /// internal and skipped.
    fn convert(&self, text: &str, settings: &BTreeMap<String, String>) -> RenderResult<HtmlParts> {
        let options: Vec<String> = settings
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .map(|(key, value)| format!("--{key}={value}"))
            .collect();
        let html = self.run(&options, text.as_bytes())?;
        let html = String::from_utf8(html).map_err(|e| self.failure(format!("output is not UTF-8: {e}")))?;
        Ok(HtmlParts::from_whole(html))
    }
}

impl HtmlToPdf for CommandConverter {
    fn convert(&self, html: &str) -> RenderResult<Vec<u8>> {
        self.run(&[], html.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_body() {
        let parts = HtmlParts::from_whole(
            "<html><head><title>t</title></head><BODY class=\"x\">\n<p>Hi</p>\n</body></html>",
        );
        assert_eq!(parts.body, "<p>Hi</p>");
        assert!(parts.whole.starts_with("<html>"));
    }

    #[test]
    fn fragment_is_its_own_body() {
        let parts = HtmlParts::from_whole("<p>fragment</p>");
        assert_eq!(parts.body, "<p>fragment</p>");
    }

    #[test]
    fn empty_argv_rejected() {
        assert!(matches!(
            CommandConverter::from_argv(&[]),
            Err(RenderError::EmptyCommand)
        ));
        let argv = vec!["weasyprint".to_string(), "-".to_string(), "-".to_string()];
        let converter = CommandConverter::from_argv(&argv).unwrap();
        assert_eq!(converter.program(), "weasyprint");
        assert_eq!(converter, CommandConverter::new("weasyprint").arg("-").arg("-"));
    }

    #[test]
    fn missing_program_is_converter_error() {
        let converter = CommandConverter::new("folio-no-such-converter-binary");
        assert!(matches!(
            HtmlToPdf::convert(&converter, "<p/>"),
            Err(RenderError::Converter { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn pipes_through_program() {
        let cat = CommandConverter::new("cat");
        let parts = RestToHtml::convert(&cat, "<body>ok</body>", &BTreeMap::new()).unwrap();
        assert_eq!(parts.body, "ok");
        assert_eq!(HtmlToPdf::convert(&cat, "%PDF").unwrap(), b"%PDF");
    }

    #[cfg(unix)]
    #[test]
    fn settings_become_options() {
        // `echo` prints its arguments and ignores stdin.
        let echo = CommandConverter::new("echo");
        let settings = BTreeMap::from([
            ("stylesheet".to_string(), "report.css".to_string()),
            ("_internal".to_string(), "skip".to_string()),
        ]);
        let parts = RestToHtml::convert(&echo, "ignored", &settings).unwrap();
        assert_eq!(parts.body, "--stylesheet=report.css");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_converter_error() {
        let failing = CommandConverter::new("false");
        let err = HtmlToPdf::convert(&failing, "").unwrap_err();
        assert!(matches!(err, RenderError::Converter { ref program, .. } if program == "false"));
    }
}
