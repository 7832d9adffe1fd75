use highlight_cli::paths::find_video;
use highlight_cli::repl::{self, SessionProbe};
use highlight_core::config::Settings;
use highlight_core::library::SortOrder;
use highlight_core::probe::{MediaProbe, ProbeInfo};
use highlight_core::AppContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn library(root: &Path, files: &[&str]) -> (AppContext, PathBuf) {
    let folder = root.join("clips");
    fs::create_dir_all(&folder).unwrap();
    for f in files {
        fs::write(folder.join(f), b"x").unwrap();
    }
    let settings = Settings {
        app_config: root.join("app_config.json").to_string_lossy().into_owned(),
        ..Settings::default()
    };
    let mut app = AppContext::bootstrap(settings).await.unwrap();
    app.import_folder(&folder).await.unwrap();
    app.set_sort(SortOrder::NameAsc);
    (app, folder)
}

async fn drive(app: &mut AppContext, script: &str, probe: Option<&SessionProbe>) -> String {
    let mut out = Vec::new();
    repl::run(app, script.as_bytes(), &mut out, probe).await.unwrap();
    String::from_utf8(out).unwrap()
}

struct TenSeconds;

#[async_trait::async_trait]
impl MediaProbe for TenSeconds {
    async fn probe(&self, _path: &Path, _mtime: i64) -> anyhow::Result<ProbeInfo> {
        Ok(ProbeInfo {
            duration: 10.0,
            thumbnail: None,
        })
    }
}

#[tokio::test]
async fn scripted_session_tags_and_finishes_every_clip() {
    let temp = tempdir().unwrap();
    let (mut app, folder) = library(temp.path(), &["a.mp4", "b.mp4"]).await;
    app.open_video(&folder.join("a.mp4")).unwrap();
    let probe = SessionProbe {
        probe: Arc::new(TenSeconds),
        timeout: Duration::from_secs(3),
    };

    let script = "\
tag 三杀
agent 捷风
trim 2 40
bogus
finish
custom 刀杀
finish
tag never-reached
";
    let out = drive(&mut app, script, Some(&probe)).await;
    assert!(out.contains("error: unknown command 'bogus'"), "{}", out);
    assert!(out.contains("trim 00:02.00 - 00:10.00"), "{}", out);
    assert!(out.contains("1 new clip(s) to go"), "{}", out);
    assert!(out.contains("no new clips left"), "{}", out);
    assert!(app.session().is_none());

    let doc = storage::JsonMetadataStore::new()
        .try_load(&folder)
        .await
        .unwrap()
        .unwrap();
    let a = &doc.videos["a.mp4"];
    assert_eq!(a.tags, vec!["三杀", "捷风"]);
    assert_eq!(a.agent.as_deref(), Some("捷风"));
    assert_eq!((a.start_time, a.end_time), (2.0, 10.0));
    assert_eq!(doc.videos["b.mp4"].tags, vec!["刀杀"]);
    assert!(doc.videos.values().all(|m| !m.is_new));
}

#[tokio::test]
async fn quit_is_refused_while_changes_are_unsaved() {
    let temp = tempdir().unwrap();
    let (mut app, folder) = library(temp.path(), &["a.mp4", "b.mp4"]).await;
    app.open_video(&folder.join("a.mp4")).unwrap();

    let out = drive(&mut app, "tag 一血\nquit\nnext\nquit!\n", None).await;
    assert!(out.contains("have unsaved changes"), "{}", out);
    assert!(out.contains("== b.mp4"), "{}", out);
    assert!(app.session().is_none());
    assert_eq!(app.pending().len(), 2);
}

#[tokio::test]
async fn discard_leaves_disk_untouched() {
    let temp = tempdir().unwrap();
    let (mut app, folder) = library(temp.path(), &["a.mp4"]).await;
    app.open_video(&folder.join("a.mp4")).unwrap();

    let out = drive(&mut app, "tag 五杀\nweapon 幻影\ndiscard\n", None).await;
    assert!(out.contains("changes discarded"), "{}", out);
    assert!(!app.has_unsaved_changes());
    let doc = storage::JsonMetadataStore::new()
        .try_load(&folder)
        .await
        .unwrap()
        .unwrap();
    assert!(doc.videos["a.mp4"].tags.is_empty());
}

#[tokio::test]
async fn start_handle_is_clamped_after_learning_the_length() {
    let temp = tempdir().unwrap();
    let (mut app, folder) = library(temp.path(), &["a.mp4"]).await;
    app.open_video(&folder.join("a.mp4")).unwrap();
    let probe = SessionProbe {
        probe: Arc::new(TenSeconds),
        timeout: Duration::from_secs(3),
    };

    repl::learn_duration(&mut app, Some(&probe)).await;
    let session = app.session_mut().unwrap();
    assert_eq!(session.duration(), Some(10.0));
    session.set_start(5.0);
    session.set_end(1000.0);
    assert_eq!((session.draft().start_time, session.draft().end_time), (5.0, 10.0));
}

#[tokio::test]
async fn videos_resolve_by_unique_filename() {
    let temp = tempdir().unwrap();
    let (app, folder) = library(temp.path(), &["a.mp4", "b.mp4"]).await;
    assert_eq!(find_video(app.library(), "b.mp4").unwrap(), folder.join("b.mp4"));
    assert!(find_video(app.library(), "c.mp4").is_err());
}
