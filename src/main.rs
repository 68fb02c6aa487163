mod app;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use palantir::board::{cleaned_path, Board, CellEdit, StructureUpdate};
use palantir::logging::{log, obj, set_level, v_str, Domain, Level};
use palantir::poll;
use palantir::source::SourceKind;
use palantir::state::Config;
use palantir::sync::DashboardSync;
use palantir::template::Templates;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = app::build_cli().get_matches();
    if matches.get_flag("verbose") {
        set_level(Level::Debug);
    }

    match matches.subcommand() {
        Some(("create", sub)) => cmd_create(sub),
        Some(("update", sub)) => cmd_update(sub),
        Some(("cell", sub)) => cmd_cell(sub),
        Some(("watch", sub)) => cmd_watch(sub).await,
        Some(("detail", sub)) => cmd_detail(sub).await,
        _ => bail!("unknown command"),
    }
}

fn dir_arg(sub: &ArgMatches) -> PathBuf {
    cleaned_path(sub.get_one::<String>("dir").map(String::as_str).unwrap_or("."))
}

fn strings(sub: &ArgMatches, id: &str) -> Vec<String> {
    sub.get_many::<String>(id).map(|v| v.cloned().collect()).unwrap_or_default()
}

fn cmd_create(sub: &ArgMatches) -> Result<()> {
    let dir = dir_arg(sub);
    let name = sub.get_one::<String>("name").context("--name is required")?;
    Board::create(&dir, name).with_context(|| format!("creating dashboard in {}", dir.display()))?;
    println!("Created dashboard '{}' in {}", name, dir.display());
    Ok(())
}

fn cmd_update(sub: &ArgMatches) -> Result<()> {
    let dir = dir_arg(sub);
    let update = StructureUpdate {
        add_rows: strings(sub, "addrow"),
        remove_rows: strings(sub, "rmrow"),
        add_columns: strings(sub, "addcol"),
        remove_columns: strings(sub, "rmcol"),
    };
    let report = Board::open(&dir)
        .update(&update)
        .with_context(|| format!("updating {}", dir.display()))?;
    println!(
        "Updated {}: {} cells added, {} cells removed",
        dir.display(),
        report.added_cells.len(),
        report.removed_cells.len()
    );
    Ok(())
}

fn cmd_cell(sub: &ArgMatches) -> Result<()> {
    let dir = dir_arg(sub);
    let row = sub.get_one::<String>("row").context("--row is required")?;
    let col = sub.get_one::<String>("col").context("--col is required")?;
    let edit = CellEdit {
        text: sub.get_one::<String>("settext").cloned(),
        background_color: sub.get_one::<String>("setbgcolor").cloned(),
        text_color: sub.get_one::<String>("settxtcolor").cloned(),
        boolean: sub.get_one::<String>("setbool").cloned(),
        animation: sub.get_one::<String>("setanimate").cloned(),
        add_image: sub.get_one::<PathBuf>("addimage").map(|p| cleaned_path(&p.to_string_lossy())),
        remove_image: sub.get_one::<usize>("rmimage").copied(),
        add_note: sub.get_one::<String>("addnote").cloned(),
    };
    let cell = Board::open(&dir)
        .edit_cell(row, col, &edit)
        .with_context(|| format!("updating cell {}-{} in {}", row, col, dir.display()))?;
    println!("{}", serde_json::to_string_pretty(&cell)?);
    Ok(())
}

fn load_templates(sub: &ArgMatches, cfg: &Config) -> Result<Templates> {
    let dir = sub
        .get_one::<PathBuf>("templates")
        .cloned()
        .or_else(|| cfg.template_dir.clone())
        .or_else(|| {
            // a directory source carries its own templates
            let local = PathBuf::from(&cfg.source).join("templates");
            (SourceKind::detect(&cfg.source) == SourceKind::Dir && local.is_dir()).then_some(local)
        });
    match dir {
        Some(dir) => Templates::load_dir(&dir).with_context(|| format!("loading templates from {}", dir.display())),
        None => Ok(Templates::default()),
    }
}

fn build_sync(sub: &ArgMatches, cfg: Config) -> Result<DashboardSync> {
    let source = SourceKind::detect(&cfg.source).build(&cfg.source, cfg.fetch_timeout)?;
    let templates = load_templates(sub, &cfg)?;
    log(
        Level::Info,
        Domain::System,
        "source_opened",
        obj(&[("path", v_str(&source.describe()))]),
    );
    Ok(DashboardSync::with_templates(source, cfg, templates))
}

async fn cmd_watch(sub: &ArgMatches) -> Result<()> {
    let mut cfg = Config::from_env();
    if let Some(src) = sub.get_one::<String>("source") {
        cfg.source = src.clone();
    }
    if SourceKind::detect(&cfg.source) == SourceKind::Dir {
        cfg.source = cleaned_path(&cfg.source).to_string_lossy().into_owned();
    }
    if let Some(secs) = sub.get_one::<u64>("interval") {
        cfg.poll_interval = Duration::from_secs(*secs);
    }
    if let Some(ms) = sub.get_one::<u64>("delay") {
        cfg.fetch_delay = Duration::from_millis(*ms);
    }
    let output = match sub.get_one::<PathBuf>("output") {
        Some(p) => p.clone(),
        None if SourceKind::detect(&cfg.source) == SourceKind::Dir => PathBuf::from(&cfg.source).join("index.html"),
        None => PathBuf::from("index.html"),
    };
    let max_cycles = sub.get_one::<u64>("cycles").copied();

    let sync = build_sync(sub, cfg)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = poll::start_reporting(sync.clone(), tx);

    while let Some(report) = rx.recv().await {
        let html = sync.with_page(|page| page.to_html());
        if let Err(e) = tokio::fs::write(&output, html).await {
            log(
                Level::Error,
                Domain::System,
                "snapshot_write_failed",
                obj(&[("path", v_str(&output.display().to_string())), ("reason", v_str(&e.to_string()))]),
            );
        }
        log(
            Level::Info,
            Domain::Poll,
            "cycle_complete",
            obj(&[
                ("cycle", json!(report.cycle)),
                ("outcome", v_str(&format!("{:?}", report.outcome))),
                ("path", v_str(&output.display().to_string())),
            ]),
        );
        if max_cycles.is_some_and(|max| report.cycle >= max) {
            handle.stop();
            break;
        }
    }
    handle.join().await;
    Ok(())
}

async fn cmd_detail(sub: &ArgMatches) -> Result<()> {
    let mut cfg = Config::immediate();
    let source = sub.get_one::<String>("source").context("source is required")?;
    cfg.source = match SourceKind::detect(source) {
        SourceKind::Dir => cleaned_path(source).to_string_lossy().into_owned(),
        SourceKind::Http => source.clone(),
    };
    let id = sub.get_one::<String>("id").context("id is required")?;
    let sync = build_sync(sub, cfg)?;
    println!("{}", sync.open_detail(id).await);
    Ok(())
}
