use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use idr_engine::{ContactView, IdentifyRequest, Reconciler, ValidationReport};
use idr_server::{IdrServer, ServerConfig, StoreConfig};
use idr_store::SqliteContactStore;
use idr_types::ContactId;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Identify(args) => cmd_identify(args, format),
        Command::Show(args) => cmd_show(args, format),
        Command::Check(args) => cmd_check(args, format),
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub fn log_filter(cli: &Cli) -> String {
    if let Command::Serve(ServeArgs { config: Some(path), .. }) = &cli.command {
        if let Ok(config) = ServerConfig::load(path) {
            return config.log_filter;
        }
    }
    ServerConfig::default().log_filter
}

fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(db) = &args.db {
        config.store = StoreConfig::sqlite(db);
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    debug!(?config, "server configuration");
    let server = IdrServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn open(db: &Path) -> anyhow::Result<Reconciler<SqliteContactStore>> {
    let store = SqliteContactStore::open(db)
        .with_context(|| format!("opening contact database {}", db.display()))?;
    Ok(Reconciler::new(store))
}

fn cmd_identify(args: IdentifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reconciler = open(&args.db)?;
    let request = IdentifyRequest::new(args.email.as_deref(), args.phone.as_deref());
    let view = reconciler.identify(&request)?;
    println!("{}", render_view(&view, format)?);
    Ok(())
}

fn cmd_show(args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reconciler = open(&args.db)?;
    let view = reconciler.cluster(ContactId::new(args.id))?;
    println!("{}", render_view(&view, format)?);
    Ok(())
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = open(&args.db)?.validate()?;
    println!("{}", render_report(&report, format)?);
    if !report.is_valid() {
        anyhow::bail!("{} cluster violation(s) found", report.violations.len());
    }
    Ok(())
}

fn render_view(view: &ContactView, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(view)?);
    }
    let mut out = format!("Primary contact {}", view.primary_contact_id.to_string().yellow().bold());
    out.push_str(&format!("\n  Emails: {}", join_or_none(&view.emails)));
    out.push_str(&format!("\n  Phone numbers: {}", join_or_none(&view.phone_numbers)));
    let secondaries: Vec<String> = view
        .secondary_contact_ids
        .iter()
        .map(ToString::to_string)
        .collect();
    out.push_str(&format!("\n  Secondary contacts: {}", join_or_none(&secondaries)));
    Ok(out)
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".dimmed().to_string()
    } else {
        values.join(", ").cyan().to_string()
    }
}

fn render_report(report: &ValidationReport, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    let mut out = format!(
        "{} contacts in {} clusters",
        report.contact_count.to_string().bold(),
        report.primary_count.to_string().bold()
    );
    if report.is_valid() {
        out.push_str(&format!("\n{} All clusters are flat.", "✓".green().bold()));
    }
    for violation in &report.violations {
        out.push_str(&format!(
            "\n{} contact {}: {}",
            "✗".red().bold(),
            violation.contact.to_string().yellow(),
            violation.description
        ));
    }
    Ok(out)
}
