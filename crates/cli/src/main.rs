use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use highlight_cli::format::{format_relative, format_size, format_time};
use highlight_cli::paths::{find_video, resolve_dir};
use highlight_cli::repl::{self, SessionProbe};
use highlight_core::config::{self, Settings};
use highlight_core::library::{LibraryFilter, SortOrder};
use highlight_core::models::VideoRecord;
use highlight_core::probe::{FfmpegProbe, MediaProbe};
use highlight_core::taxonomy;
use highlight_core::{AppContext, FinishOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;
    let mut app = AppContext::bootstrap(settings)
        .await
        .context("failed to load the library")?;

    match cli.command {
        Commands::Folders { json } => run_folders(&app, json),
        Commands::Import { dir } => run_import(&mut app, &dir).await,
        Commands::Remove { dir } => run_remove(&mut app, &dir).await,
        Commands::List {
            folder,
            query,
            tags,
            sort,
            json,
        } => run_list(&mut app, folder, query, tags, sort, json),
        Commands::Tags { json } => run_tags(&app, json),
        Commands::Presets { action } => run_presets(&mut app, action).await,
        Commands::Taxonomy { json } => run_taxonomy(json),
        Commands::Tag {
            video,
            tag,
            custom,
            agent,
            weapon,
            start,
            end,
        } => {
            let edits = TagEdits {
                tags: tag,
                custom,
                agent,
                weapon,
                start,
                end,
            };
            run_tag(&mut app, &video, edits).await
        }
        Commands::Session { quick, video } => run_session(&mut app, quick, video).await,
        Commands::Probe { json } => run_probe(&mut app, json).await,
    }
}

#[derive(Parser)]
#[command(name = "highlight")]
#[command(about = "Tag, trim and browse gameplay highlight clips", long_about = None)]
struct Cli {
    /// Path to settings TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List imported folders
    Folders {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a folder of clips
    Import {
        dir: String,
    },
    /// Stop tracking a folder (its metadata file is kept)
    Remove {
        dir: String,
    },
    /// List clips in the library
    List {
        /// Only clips of this folder
        #[arg(long)]
        folder: Option<String>,
        /// Substring over filename, tags, agent and weapon
        #[arg(short, long, default_value = "")]
        query: String,
        /// Required tags (comma-separated, all must match)
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        tags: Vec<String>,
        /// Sort order: time-desc|time-asc|name-asc|name-desc
        #[arg(long, default_value = "time-desc")]
        sort: SortOrder,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Every tag used in the library
    Tags {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage preset tags
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Known agents and weapons
    Taxonomy {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit one clip and save it
    Tag {
        /// Clip path or unique filename
        video: String,
        /// Toggle a tag (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Add a free-form tag (repeatable)
        #[arg(long)]
        custom: Vec<String>,
        /// Select (or deselect) the agent
        #[arg(long)]
        agent: Option<String>,
        /// Select (or deselect) the weapon
        #[arg(long)]
        weapon: Option<String>,
        /// Trim start in seconds
        #[arg(long)]
        start: Option<f64>,
        /// Trim end in seconds
        #[arg(long)]
        end: Option<f64>,
    },
    /// Interactive editing session reading commands from stdin
    Session {
        /// Walk every new clip across all folders
        #[arg(long)]
        quick: bool,
        /// Clip to start with (defaults to the first new clip)
        video: Option<String>,
    },
    /// Probe durations and thumbnails for the whole library
    Probe {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Show preset tags
    List,
    /// Add a preset tag
    Add { tag: String },
    /// Remove a preset tag
    Remove { tag: String },
}

struct TagEdits {
    tags: Vec<String>,
    custom: Vec<String>,
    agent: Option<String>,
    weapon: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
}

fn run_folders(app: &AppContext, json: bool) -> Result<()> {
    let rows: Vec<serde_json::Value> = app
        .config()
        .imported_folders
        .iter()
        .map(|f| {
            serde_json::json!({
                "folder": f,
                "videos": app.library().folder_videos(f).len(),
                "new": app.library().new_count(Some(f)),
            })
        })
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("no folders imported");
    }
    for f in &app.config().imported_folders {
        println!(
            "{}  ({} clips, {} new)",
            f.display(),
            app.library().folder_videos(f).len(),
            app.library().new_count(Some(f))
        );
    }
    Ok(())
}

async fn run_import(app: &mut AppContext, dir: &str) -> Result<()> {
    let folder = resolve_dir(dir)?;
    let count = app.import_folder(&folder).await?;
    println!(
        "imported {} ({} clips, {} new)",
        folder.display(),
        count,
        app.library().new_count(Some(&folder))
    );
    Ok(())
}

async fn run_remove(app: &mut AppContext, dir: &str) -> Result<()> {
    let folder = resolve_dir(dir).unwrap_or_else(|_| PathBuf::from(dir));
    let removed = app.remove_folder(&folder).await?;
    println!("removed {} ({} clips)", folder.display(), removed);
    Ok(())
}

fn run_list(
    app: &mut AppContext,
    folder: Option<String>,
    query: String,
    tags: Vec<String>,
    sort: SortOrder,
    json: bool,
) -> Result<()> {
    let folder = match folder {
        Some(f) => Some(resolve_dir(&f)?),
        None => None,
    };
    app.set_sort(sort);
    app.set_filter(LibraryFilter {
        query,
        tags,
        folder,
    });
    let rows = app.filtered();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    let now = chrono::Utc::now();
    for r in &rows {
        println!("{}", list_line(r, now));
    }
    println!("{} of {} clips", rows.len(), app.library().len());
    Ok(())
}

fn list_line(r: &VideoRecord, now: chrono::DateTime<chrono::Utc>) -> String {
    let marker = if r.meta.is_new { "*" } else { " " };
    let mut tags = r.meta.tags.join(",");
    if tags.is_empty() {
        tags.push('-');
    }
    format!(
        "{} {:<32} {:>9} {:>8} {:>6}  {}",
        marker,
        r.filename,
        format_size(r.size),
        format_relative(r.mtime, now),
        r.duration.map(format_time).unwrap_or_default(),
        tags
    )
}

fn run_tags(app: &AppContext, json: bool) -> Result<()> {
    let tags = app.library().unique_tags();
    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else {
        for t in tags {
            println!("{}", t);
        }
    }
    Ok(())
}

async fn run_presets(app: &mut AppContext, action: PresetAction) -> Result<()> {
    match action {
        PresetAction::List => {}
        PresetAction::Add { tag } => app.add_preset_tag(&tag).await?,
        PresetAction::Remove { tag } => app.remove_preset_tag(&tag).await?,
    }
    println!("{}", app.config().preset_tags.join(", "));
    Ok(())
}

fn run_taxonomy(json: bool) -> Result<()> {
    if json {
        let group = |table: &[(&str, &[&str])]| -> serde_json::Value {
            table
                .iter()
                .map(|(cat, names)| serde_json::json!({ "category": cat, "names": names }))
                .collect()
        };
        let body = serde_json::json!({
            "agents": group(taxonomy::AGENTS),
            "weapons": group(taxonomy::WEAPONS),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    for (title, table) in [("agents", taxonomy::AGENTS), ("weapons", taxonomy::WEAPONS)] {
        println!("{}:", title);
        for (cat, names) in table {
            println!("  {}: {}", cat, names.join(", "));
        }
    }
    Ok(())
}

async fn run_tag(app: &mut AppContext, video: &str, edits: TagEdits) -> Result<()> {
    let path = find_video(app.library(), video)?;
    app.open_video(&path)?;
    // Trim handles are clamped against the clip length, so learn it first.
    let probe = session_probe(app.settings());
    repl::learn_duration(app, probe.as_ref()).await;
    let session = app.session_mut()?;
    for t in &edits.tags {
        session.toggle_tag(t);
    }
    for t in &edits.custom {
        session.add_custom_tag(t)?;
    }
    if let Some(a) = &edits.agent {
        session.select_agent(a)?;
    }
    if let Some(w) = &edits.weapon {
        session.select_weapon(w)?;
    }
    match (edits.start, edits.end) {
        (Some(s), Some(e)) => session.set_trim_range(s, e),
        (Some(s), None) => session.set_start(s),
        (None, Some(e)) => session.set_end(e),
        (None, None) => {}
    }
    let draft = session.draft().clone();

    let outcome = app.finish().await?;
    if let FinishOutcome::Failed(report) = &outcome {
        bail!("{}", report.summary());
    }
    println!(
        "{}: tags [{}] agent {} weapon {} trim {:.2}-{:.2}",
        path.display(),
        draft.tags.join(", "),
        draft.agent.as_deref().unwrap_or("-"),
        draft.weapon.as_deref().unwrap_or("-"),
        draft.start_time,
        draft.end_time
    );
    println!("{}", outcome.report().summary());
    Ok(())
}

fn session_probe(settings: &Settings) -> Option<SessionProbe> {
    settings.probe.enabled.then(|| SessionProbe {
        probe: Arc::new(FfmpegProbe::new(&settings.probe)) as Arc<dyn MediaProbe>,
        timeout: settings.probe.timeout(),
    })
}

async fn run_session(app: &mut AppContext, quick: bool, video: Option<String>) -> Result<()> {
    if quick {
        if app.start_quick_tag()?.is_none() {
            println!("no new clips to tag");
            return Ok(());
        }
    } else {
        let path = match video {
            Some(v) => find_video(app.library(), &v)?,
            None => match app.library().new_videos().first() {
                Some(r) => r.path.clone(),
                None => bail!("no new clips; pass a video to edit"),
            },
        };
        app.open_video(&path)?;
    }

    let probe = session_probe(app.settings());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(app, stdin, &mut stdout, probe.as_ref()).await
}

async fn run_probe(app: &mut AppContext, json: bool) -> Result<()> {
    let probe: Arc<dyn MediaProbe> = Arc::new(FfmpegProbe::new(&app.settings().probe));
    let mut rx = app.spawn_probes(probe);
    let mut rows = Vec::new();
    while let Some(update) = rx.recv().await {
        let path = update.path.clone();
        let duration = update.info.duration;
        let thumbnail = update.info.thumbnail.clone();
        if !app.apply_probe(update) {
            continue;
        }
        if json {
            rows.push(serde_json::json!({
                "path": path,
                "duration": duration,
                "thumbnail": thumbnail,
            }));
        } else {
            println!("{:>6}  {}", format_time(duration), path.display());
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}
