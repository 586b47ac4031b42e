use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: versioned documents on a content-addressed store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, default_value = "folio.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new document repository
    Init(InitArgs),
    /// List documents and registered document types
    List,
    /// Create a document from its type's model
    Create(CreateArgs),
    /// Show a document snapshot or one of its parts
    Show(ShowArgs),
    /// Write a part of a document
    Edit(EditArgs),
    /// Render a document and store the result as an archive snapshot
    Archive(ArchiveArgs),
    /// Show the history of a document
    Log(LogArgs),
    /// Render a document as text, HTML or PDF
    Render(RenderArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

/// A `key=value` pair.
pub fn parse_binding(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct MetaArgs {
    #[arg(short, long)]
    pub message: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Repository directory; defaults to the configured repository.
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CreateArgs {
    pub document_type: String,
    /// Explicit id; computed from the type's id template when omitted.
    pub id: Option<String>,
    /// Id template binding, repeatable.
    #[arg(long = "bind", value_parser = parse_binding)]
    pub bindings: Vec<(String, String)>,
    #[command(flatten)]
    pub meta: MetaArgs,
}

/// Selects one snapshot of a document.
#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    pub document_type: String,
    pub id: String,
    /// Commit to read; the current tip when omitted.
    #[arg(long)]
    pub version: Option<String>,
    /// Read the archive ref instead of the live one.
    #[arg(long)]
    pub archive: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,
    /// Part to print; lists the snapshot when omitted.
    pub part: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    pub document_type: String,
    pub id: String,
    /// Part to write; the type's default part when omitted.
    #[arg(long)]
    pub part: Option<String>,
    /// Write to the archive ref; the part is always the archive part.
    #[arg(long)]
    pub archive: bool,
    /// Read the content from a file instead of stdin.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Commit the edit was made against; fails with a conflict if the
    /// document has moved on.
    #[arg(long)]
    pub expect: Option<String>,
    #[command(flatten)]
    pub meta: MetaArgs,
}

#[derive(Args)]
pub struct ArchiveArgs {
    pub document_type: String,
    pub id: String,
    #[arg(long)]
    pub version: Option<String>,
    #[arg(long)]
    pub part: Option<String>,
    #[command(flatten)]
    pub meta: MetaArgs,
}

#[derive(Args)]
pub struct LogArgs {
    pub document_type: String,
    pub id: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub archive: bool,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderTarget {
    Text,
    Html,
    Pdf,
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,
    #[arg(long)]
    pub part: Option<String>,
    #[arg(long, default_value = "html")]
    pub to: RenderTarget,
    /// Inline resources as data URIs instead of linking to the server.
    #[arg(long)]
    pub inline: bool,
    /// Template binding, repeatable.
    #[arg(long = "bind", value_parser = parse_binding)]
    pub bindings: Vec<(String, String)>,
    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides the configured bind address.
    #[arg(long)]
    pub bind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["folio", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
        assert_eq!(cli.config, PathBuf::from("folio.toml"));
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_globals_after_subcommand() {
        let cli = Cli::try_parse_from(["folio", "list", "--format", "json", "-v", "-c", "site.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }

    #[test]
    fn parse_create_with_bindings() {
        let cli = Cli::try_parse_from([
            "folio", "create", "EmployeeDoc", "--bind", "person_id=7", "-m", "hello",
        ])
        .unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.id, None);
            assert_eq!(args.bindings, vec![("person_id".to_string(), "7".to_string())]);
            assert_eq!(args.meta.message, Some("hello".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn rejects_malformed_binding() {
        assert!(Cli::try_parse_from(["folio", "create", "EmployeeDoc", "--bind", "oops"]).is_err());
        assert!(Cli::try_parse_from(["folio", "create", "EmployeeDoc", "--bind", "=x"]).is_err());
    }

    #[test]
    fn parse_edit_expect() {
        let cli = Cli::try_parse_from([
            "folio", "edit", "EmployeeDoc", "42", "--part", "comments", "--expect", "abc", "-f", "in.txt",
        ])
        .unwrap();
        if let Command::Edit(args) = cli.command {
            assert_eq!(args.id, "42");
            assert_eq!(args.part.as_deref(), Some("comments"));
            assert_eq!(args.expect.as_deref(), Some("abc"));
            assert_eq!(args.file, Some(PathBuf::from("in.txt")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_log() {
        let cli = Cli::try_parse_from(["folio", "log", "EmployeeDoc", "42", "--oneline", "-n", "5"])
            .unwrap();
        if let Command::Log(args) = cli.command {
            assert!(args.oneline);
            assert_eq!(args.limit, 5);
            assert!(!args.archive);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_render_pdf() {
        let cli = Cli::try_parse_from([
            "folio", "render", "EmployeeDoc", "42", "--to", "pdf", "-o", "out.pdf", "--archive",
        ])
        .unwrap();
        if let Command::Render(args) = cli.command {
            assert_eq!(args.to, RenderTarget::Pdf);
            assert!(args.snapshot.archive);
            assert_eq!(args.output, Some(PathBuf::from("out.pdf")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["folio", "serve", "--bind", "0.0.0.0:8065"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8065"));
        } else {
            panic!("wrong command");
        }
    }
}
