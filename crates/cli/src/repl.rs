//! Line-driven editing session: one command per line, applied to the open
//! clip of an `AppContext`.

use crate::format::{format_time, format_time_ms};
use crate::paths;
use anyhow::Result;
use highlight_core::probe::{MediaProbe, ProbeUpdate};
use highlight_core::session::SessionState;
use highlight_core::{AppContext, FinishOutcome};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

pub const HELP: &str = "\
commands:
  show                 current clip and draft
  tag <name>           toggle a tag
  custom <name>        add a free-form tag
  agent <name>         select/deselect the agent
  weapon <name>        select/deselect the weapon
  start <secs>         move the start handle
  end <secs>           move the end handle
  trim <start> <end>   set both handles
  open <video>         switch to another clip
  next                 next clip in the folder (or quick-tag list)
  finish               save everything and continue with the next new clip
  save                 save everything, stay on this clip
  discard              drop unsaved changes and leave
  quit                 leave (quit! to leave with unsaved changes)";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Show,
    Tag(String),
    Custom(String),
    Agent(String),
    Weapon(String),
    Start(f64),
    End(f64),
    Trim(f64, f64),
    Open(String),
    Next,
    Finish,
    Save,
    Discard,
    Quit { force: bool },
    Help,
}

/// Parses one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let arg = |name: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{} needs an argument", name))
        } else {
            Ok(rest.to_string())
        }
    };
    let secs = |s: &str| -> Result<f64, String> {
        s.parse::<f64>()
            .map_err(|_| format!("not a number of seconds: {}", s))
    };

    let parsed = match cmd {
        "show" | "s" => ReplCommand::Show,
        "tag" | "t" => ReplCommand::Tag(arg(cmd)?),
        "custom" | "c" => ReplCommand::Custom(arg(cmd)?),
        "agent" | "a" => ReplCommand::Agent(arg(cmd)?),
        "weapon" | "w" => ReplCommand::Weapon(arg(cmd)?),
        "start" => ReplCommand::Start(secs(&arg(cmd)?)?),
        "end" => ReplCommand::End(secs(&arg(cmd)?)?),
        "trim" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.as_slice() {
                [s, e] => ReplCommand::Trim(secs(s)?, secs(e)?),
                _ => return Err("trim needs <start> <end>".to_string()),
            }
        }
        "open" | "o" => ReplCommand::Open(arg(cmd)?),
        "next" | "n" => ReplCommand::Next,
        "finish" | "f" => ReplCommand::Finish,
        "save" => ReplCommand::Save,
        "discard" => ReplCommand::Discard,
        "quit" | "q" => ReplCommand::Quit { force: false },
        "quit!" | "q!" => ReplCommand::Quit { force: true },
        "help" | "?" => ReplCommand::Help,
        other => return Err(format!("unknown command '{}', try help", other)),
    };
    Ok(Some(parsed))
}

/// Probing used to learn the open clip's duration.
pub struct SessionProbe {
    pub probe: Arc<dyn MediaProbe>,
    pub timeout: Duration,
}

/// Runs commands from `input` until the session ends, input runs out or
/// the user quits. Command errors are reported and the loop continues.
pub async fn run<R, W>(
    app: &mut AppContext,
    input: R,
    out: &mut W,
    probe: Option<&SessionProbe>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    learn_duration(app, probe).await;
    describe(app, out)?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                writeln!(out, "error: {}", msg)?;
                continue;
            }
        };
        debug!(?cmd, "session command");
        match execute(app, cmd, out, probe).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => return Ok(()),
            Err(e) => writeln!(out, "error: {:#}", e)?,
        }
    }

    if app.has_unsaved_changes() {
        writeln!(
            out,
            "input ended with {} unsaved clip(s); nothing was written",
            unsaved_count(app)
        )?;
    }
    Ok(())
}

enum Flow {
    Continue,
    Stop,
}

async fn execute<W: Write>(
    app: &mut AppContext,
    cmd: ReplCommand,
    out: &mut W,
    probe: Option<&SessionProbe>,
) -> Result<Flow> {
    match cmd {
        ReplCommand::Show => describe(app, out)?,
        ReplCommand::Help => writeln!(out, "{}", HELP)?,
        ReplCommand::Tag(tag) => {
            let on = app.session_mut()?.toggle_tag(&tag);
            writeln!(out, "{} {}", if on { "+" } else { "-" }, tag)?;
        }
        ReplCommand::Custom(tag) => {
            app.session_mut()?.add_custom_tag(&tag)?;
            writeln!(out, "+ {}", tag.trim())?;
        }
        ReplCommand::Agent(name) => {
            let session = app.session_mut()?;
            session.select_agent(&name)?;
            writeln!(out, "agent: {}", session.draft().agent.as_deref().unwrap_or("-"))?;
        }
        ReplCommand::Weapon(name) => {
            let session = app.session_mut()?;
            session.select_weapon(&name)?;
            writeln!(out, "weapon: {}", session.draft().weapon.as_deref().unwrap_or("-"))?;
        }
        ReplCommand::Start(t) => {
            app.session_mut()?.set_start(t);
            print_trim(app, out)?;
        }
        ReplCommand::End(t) => {
            app.session_mut()?.set_end(t);
            print_trim(app, out)?;
        }
        ReplCommand::Trim(s, e) => {
            app.session_mut()?.set_trim_range(s, e);
            print_trim(app, out)?;
        }
        ReplCommand::Open(name) => {
            let path = paths::find_video(app.library(), &name)?;
            app.open_video(&path)?;
            learn_duration(app, probe).await;
            describe(app, out)?;
        }
        ReplCommand::Next => {
            if app.next_video()?.is_some() {
                learn_duration(app, probe).await;
                describe(app, out)?;
            } else {
                writeln!(out, "already at the last clip")?;
            }
        }
        ReplCommand::Save => {
            app.commit_current();
            let report = app.flush_all().await;
            writeln!(out, "{}", report.summary())?;
        }
        ReplCommand::Finish => match app.finish().await? {
            FinishOutcome::Completed(report) => {
                writeln!(out, "{}", report.summary())?;
                writeln!(out, "no new clips left")?;
                return Ok(Flow::Stop);
            }
            FinishOutcome::Continue {
                report, remaining, ..
            } => {
                writeln!(out, "{}", report.summary())?;
                writeln!(out, "{} new clip(s) to go", remaining)?;
                learn_duration(app, probe).await;
                describe(app, out)?;
            }
            FinishOutcome::Failed(report) => {
                writeln!(out, "{}", report.summary())?;
                writeln!(out, "changes kept, run finish or save again to retry")?;
            }
        },
        ReplCommand::Discard => {
            app.discard();
            writeln!(out, "changes discarded")?;
            return Ok(Flow::Stop);
        }
        ReplCommand::Quit { force } => {
            if app.has_unsaved_changes() && !force {
                writeln!(
                    out,
                    "{} clip(s) have unsaved changes; finish, save, or quit! to leave anyway",
                    unsaved_count(app)
                )?;
                return Ok(Flow::Continue);
            }
            app.close_session();
            return Ok(Flow::Stop);
        }
    }
    Ok(Flow::Continue)
}

/// Clips that a save would write: the overlay plus a dirty open clip.
fn unsaved_count(app: &AppContext) -> usize {
    let mut count = app.pending().len();
    if let Some(s) = app.session() {
        if s.is_dirty() && app.pending().get(s.path()).is_none() {
            count += 1;
        }
    }
    count
}

/// Fills in the open clip's duration when it is not known yet. Probe
/// failures and timeouts leave it unknown.
pub async fn learn_duration(app: &mut AppContext, probe: Option<&SessionProbe>) {
    let (Some(probe), Some(session)) = (probe, app.session()) else {
        return;
    };
    if session.duration().is_some() {
        return;
    }
    let path = session.path().to_path_buf();
    let mtime = app.library().get(&path).map(|r| r.mtime).unwrap_or_default();
    match tokio::time::timeout(probe.timeout, probe.probe.probe(&path, mtime)).await {
        Ok(Ok(info)) => {
            let generation = app.generation();
            app.apply_probe(ProbeUpdate {
                generation,
                path,
                info,
            });
        }
        Ok(Err(e)) => debug!(error = %e, "duration unavailable"),
        Err(_) => debug!("duration probe timed out"),
    }
}

fn print_trim<W: Write>(app: &AppContext, out: &mut W) -> Result<()> {
    if let Some(s) = app.session() {
        writeln!(
            out,
            "trim {} - {}",
            format_time_ms(s.draft().start_time),
            format_time_ms(s.draft().end_time)
        )?;
    }
    Ok(())
}

fn describe<W: Write>(app: &AppContext, out: &mut W) -> Result<()> {
    let Some(s) = app.session() else {
        writeln!(out, "no clip open")?;
        return Ok(());
    };
    let draft = s.draft();
    let state = match s.state() {
        SessionState::Clean => "clean",
        SessionState::Dirty => "modified",
    };
    writeln!(out, "== {} [{}]", s.filename(), state)?;
    writeln!(out, "   folder:   {}", s.folder().display())?;
    writeln!(
        out,
        "   length:   {}",
        s.duration().map(format_time).unwrap_or_else(|| "?".into())
    )?;
    writeln!(out, "   tags:     {}", join_or_dash(&draft.tags))?;
    writeln!(out, "   agent:    {}", draft.agent.as_deref().unwrap_or("-"))?;
    writeln!(out, "   weapon:   {}", draft.weapon.as_deref().unwrap_or("-"))?;
    writeln!(
        out,
        "   trim:     {} - {}",
        format_time_ms(draft.start_time),
        format_time_ms(draft.end_time)
    )?;
    writeln!(out, "   presets:  {}", join_or_dash(&app.config().preset_tags))?;
    let palette = s.custom_palette(&app.config().preset_tags);
    if !palette.is_empty() {
        writeln!(out, "   custom:   {}", palette.join(", "))?;
    }
    if app.is_quick_tag() {
        writeln!(out, "   quick tag: {} new clip(s)", app.library().new_count(None))?;
    }
    if app.pending().has_unsaved() {
        writeln!(out, "   pending:  {} clip(s)", app.pending().len())?;
    }
    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("  "), Ok(None));
        assert_eq!(parse_line("# note"), Ok(None));
        assert_eq!(
            parse_line("tag 三杀"),
            Ok(Some(ReplCommand::Tag("三杀".into())))
        );
        assert_eq!(
            parse_line("custom  刀 杀 "),
            Ok(Some(ReplCommand::Custom("刀 杀".into())))
        );
        assert_eq!(
            parse_line("trim 1.5 9"),
            Ok(Some(ReplCommand::Trim(1.5, 9.0)))
        );
        assert_eq!(parse_line("q!"), Ok(Some(ReplCommand::Quit { force: true })));
        assert!(parse_line("trim 1").is_err());
        assert!(parse_line("start soon").is_err());
        assert!(parse_line("agent").is_err());
        assert!(parse_line("dance").is_err());
    }
}
