//! fbtr-clean - run the engine over a saved page and print the result

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use fbtr_engine::{Config, LogChannel, Pipeline};
use fbtr_html::HtmlParser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: fbtr-clean <page.html> [--config settings.json] [--rules rules.json] \
                     [--domains domains.json] [--url https://www.facebook.com/]";

/// Upper bound on observer batches; engine writes settle long before this
const MAX_BATCHES: usize = 64;

#[derive(Debug, Default)]
struct Args {
    page: PathBuf,
    config: Option<PathBuf>,
    rules: Option<PathBuf>,
    domains: Option<PathBuf>,
    url: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut page = None;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || iter.next().with_context(|| format!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--config" => args.config = Some(value()?.into()),
            "--rules" => args.rules = Some(value()?.into()),
            "--domains" => args.domains = Some(value()?.into()),
            "--url" => args.url = Some(value()?),
            "-h" | "--help" => bail!(USAGE),
            _ if page.is_none() => page = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }
    args.page = page.context(USAGE)?;
    Ok(args)
}

fn read_optional(path: Option<&PathBuf>) -> Result<Option<String>> {
    path.map(|p| std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())))
        .transpose()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let settings = read_optional(args.config.as_ref())?;
    let rules = read_optional(args.rules.as_ref())?;
    let domains = read_optional(args.domains.as_ref())?;
    let config = Config::from_json_parts(settings.as_deref(), rules.as_deref(), domains.as_deref())
        .context("loading configuration")?;

    let html = std::fs::read_to_string(&args.page).with_context(|| format!("reading {}", args.page.display()))?;
    let url = args.url.as_deref().unwrap_or("https://www.facebook.com/");
    tracing::info!("fbtr-clean v{} on {} as {}", fbtr_engine::VERSION, args.page.display(), url);

    let mut doc = HtmlParser::new().parse_with_url(&html, url);
    let mut pipeline = Pipeline::new(config, url, Box::new(LogChannel))?;
    pipeline.start(&mut doc);
    let batches = pipeline.pump_until_idle(&mut doc, MAX_BATCHES);

    let stats = pipeline.stats();
    tracing::info!(
        "Done after {} batches: {} items hidden, {} links cleaned, {} batches failed",
        batches,
        stats.hidden,
        stats.links_cleaned,
        stats.failed_batches
    );
    println!("{}", doc.tree.outer_html(doc.tree.root()));
    Ok(())
}
