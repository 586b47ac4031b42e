use std::io::{Read, Write};
use std::net::SocketAddr;

use anyhow::{bail, Context as _};
use colored::Colorize;
use folio_document::{
    parse_version, Bindings, CommitMeta, Context, Document, EditOutcome, Target,
};
use folio_fs::Repository;
use folio_render::ResourceMode;
use folio_server::{DocumentSummary, FolioServer};
use folio_types::ObjectId;
use serde::Serialize;
use serde_json::json;

use crate::cli::*;
use crate::config::FolioConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = FolioConfig::load(&cli.config)?;
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&config, args, format),
        Command::List => cmd_list(&config, format),
        Command::Create(args) => cmd_create(&config, args, format),
        Command::Show(args) => cmd_show(&config, args, format),
        Command::Edit(args) => cmd_edit(&config, args, format),
        Command::Archive(args) => cmd_archive(&config, args, format),
        Command::Log(args) => cmd_log(&config, args, format),
        Command::Render(args) => cmd_render(&config, args),
        Command::Serve(args) => cmd_serve(&config, args),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_context(config: &FolioConfig) -> anyhow::Result<Context> {
    let repo = Repository::open(&config.repository)
        .with_context(|| format!("opening {}", config.repository.display()))?;
    Ok(Context::new(repo, config.registry()?).with_default_author(&config.default_author))
}

fn commit_meta(meta: &MetaArgs) -> CommitMeta {
    CommitMeta {
        author: meta.author.clone(),
        message: meta.message.clone(),
    }
}

fn open_snapshot(ctx: &Context, args: &SnapshotArgs) -> anyhow::Result<Document> {
    let version = parse_version(args.version.as_deref().unwrap_or_default())?;
    let target = if args.archive {
        Target::Archive
    } else {
        Target::Live
    };
    let doc = ctx.open_target(&args.document_type, &args.id, target, version)?;
    if !doc.exists() {
        bail!("no such document: {}/{}", args.document_type, args.id);
    }
    Ok(doc)
}

fn short(version: Option<ObjectId>) -> String {
    version.map(|v| v.short_hex()).unwrap_or_else(|| "-".into())
}

fn cmd_init(config: &FolioConfig, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = args.path.unwrap_or_else(|| config.repository.clone());
    Repository::init(&path).with_context(|| format!("initializing {}", path.display()))?;
    match format {
        OutputFormat::Json => print_json(&json!({ "repository": path })),
        OutputFormat::Text => {
            println!(
                "{} Initialized folio repository in {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            Ok(())
        }
    }
}

fn cmd_list(config: &FolioConfig, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let types: Vec<&str> = ctx.registry().iter().map(|t| t.name.as_str()).collect();
    let documents = ctx.document_ids()?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "document_types": types,
            "documents": documents,
        })),
        OutputFormat::Text => {
            println!("{}", "Document types:".bold());
            for name in types {
                println!("  {}", name.cyan());
            }
            println!("{}", "Documents:".bold());
            for id in documents {
                println!("  {id}");
            }
            Ok(())
        }
    }
}

fn cmd_create(config: &FolioConfig, args: CreateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let meta = commit_meta(&args.meta);
    let (id, created) = match args.id {
        Some(id) => {
            let created = ctx.create(&args.document_type, &id, &meta)?;
            (id, created)
        }
        None => {
            let bindings: Bindings = args.bindings.into_iter().collect();
            ctx.create_from(&args.document_type, &bindings, &meta)?
        }
    };
    if !created {
        bail!("document {}/{id} already exists", args.document_type);
    }
    let doc = ctx.open(&args.document_type, &id, None)?;
    match format {
        OutputFormat::Json => print_json(&DocumentSummary::from(&doc)),
        OutputFormat::Text => {
            println!(
                "{} Created {}/{} at {}",
                "✓".green().bold(),
                args.document_type,
                id.bold(),
                short(doc.version()).yellow()
            );
            Ok(())
        }
    }
}

fn cmd_show(config: &FolioConfig, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let doc = open_snapshot(&ctx, &args.snapshot)?;

    if let Some(part) = args.part {
        let content = doc.read(&part)?;
        return match format {
            OutputFormat::Json => print_json(&json!({
                "version": doc.version(),
                "part": part,
                "content": String::from_utf8_lossy(&content),
            })),
            OutputFormat::Text => {
                std::io::stdout().write_all(&content)?;
                Ok(())
            }
        };
    }

    let entries = doc.list("")?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "document": DocumentSummary::from(&doc),
            "entries": entries,
        })),
        OutputFormat::Text => {
            println!("{} {}", "version".yellow(), short(doc.version()).yellow());
            println!("Author: {}", doc.author().unwrap_or_default());
            if let Some(datetime) = doc.datetime() {
                println!("Date:   {}", datetime.to_rfc2822());
            }
            println!("\n    {}\n", doc.message().unwrap_or_default());
            for entry in entries {
                let name = if entry.mode.is_directory() {
                    format!("{}/", entry.name).blue().to_string()
                } else {
                    entry.name.clone()
                };
                println!("{} {}  {}", entry.mode, entry.object_id.short_hex().dimmed(), name);
            }
            Ok(())
        }
    }
}

fn print_outcome(
    outcome: &EditOutcome,
    verb: &str,
    doc: &Document,
    branch: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        print_json(outcome)?;
    }
    match outcome {
        EditOutcome::Saved { commit } => {
            if format == OutputFormat::Text {
                println!(
                    "{} {verb} {} at {}",
                    "✓".green().bold(),
                    doc.id().bold(),
                    commit.short_hex().yellow()
                );
            }
            Ok(())
        }
        EditOutcome::Conflict { current } => bail!(
            "conflict: {branch} is now at {}, re-read and resubmit",
            short(*current)
        ),
    }
}

fn cmd_edit(config: &FolioConfig, args: EditArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let expected = parse_version(args.expect.as_deref().unwrap_or_default())?;
    let target = if args.archive {
        Target::Archive
    } else {
        Target::Live
    };
    let doc = ctx.open_target(&args.document_type, &args.id, target, expected)?;
    if !doc.exists() {
        bail!("no such document: {}/{}", args.document_type, args.id);
    }
    let part = match (&args.part, target) {
        (Some(part), Target::Live) => part.as_str(),
        _ => doc.default_part(),
    };

    let content = match &args.file {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    let outcome = doc.edit(part, &content, &commit_meta(&args.meta))?;
    print_outcome(&outcome, "Saved", &doc, doc.branch(), format)
}

fn cmd_archive(config: &FolioConfig, args: ArchiveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let version = parse_version(args.version.as_deref().unwrap_or_default())?;
    let doc = ctx.open(&args.document_type, &args.id, version)?;
    if !doc.exists() {
        bail!("no such document: {}/{}", args.document_type, args.id);
    }
    let renderer = config.renderer()?;
    let outcome = renderer.archive(&doc, args.part.as_deref(), &commit_meta(&args.meta))?;
    print_outcome(&outcome, "Archived", &doc, &doc.archive_branch(), format)
}

fn cmd_log(config: &FolioConfig, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let target = if args.archive {
        Target::Archive
    } else {
        Target::Live
    };
    let doc = ctx.open_target(&args.document_type, &args.id, target, None)?;
    let mut entries = Vec::new();
    for handle in doc.history()?.take(args.limit) {
        entries.push(handle?);
    }

    if format == OutputFormat::Json {
        let summaries: Vec<DocumentSummary> = entries.iter().map(DocumentSummary::from).collect();
        return print_json(&summaries);
    }
    if entries.is_empty() {
        println!("No history for {}.", doc.branch());
    }
    for entry in &entries {
        let version = short(entry.version()).yellow();
        let message = entry.message().unwrap_or_default();
        if args.oneline {
            println!("{version} {message}");
        } else {
            println!("{} {}", "version".yellow(), version.bold());
            println!("Author: {}", entry.author().unwrap_or_default());
            if let Some(datetime) = entry.datetime() {
                println!("Date:   {}", datetime.to_rfc2822());
            }
            println!("\n    {message}\n");
        }
    }
    Ok(())
}

fn cmd_render(config: &FolioConfig, args: RenderArgs) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let doc = open_snapshot(&ctx, &args.snapshot)?;
    let renderer = config.renderer()?;
    let bindings: serde_json::Map<String, serde_json::Value> = args
        .bindings
        .into_iter()
        .map(|(key, value)| (key, serde_json::Value::String(value)))
        .collect();
    let mode = if args.inline {
        ResourceMode::Base64
    } else {
        ResourceMode::Url
    };
    let part = args.part.as_deref();

    let bytes = match args.to {
        RenderTarget::Text => renderer
            .render_as_text(&doc, part, mode, &bindings)?
            .into_bytes(),
        RenderTarget::Html => renderer
            .render_as_html(&doc, part, mode, &bindings)?
            .whole
            .into_bytes(),
        RenderTarget::Pdf => renderer.render_as_pdf(&doc, part, &bindings)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                bytes.len(),
                path.display()
            );
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn cmd_serve(config: &FolioConfig, args: ServeArgs) -> anyhow::Result<()> {
    let ctx = open_context(config)?;
    let mut server_config = config.server.clone();
    if let Some(bind) = &args.bind {
        server_config.bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    println!(
        "Folio server on {} (repository: {})",
        server_config.bind_addr.to_string().bold(),
        config.repository.display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(FolioServer::new(server_config, ctx).serve())?;
    Ok(())
}
