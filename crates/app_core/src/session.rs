//! Shell session: registry, clips and providers behind one `execute` call
//!
//! State is loaded from the database when the session opens and written back
//! after every completed mutation, never halfway through a transfer.

use crate::clip::{Clip, ClipStore, DEFAULT_CLIP};
use crate::command::{split_drive, Capture, Command, Invocation};
use crate::config::AppConfig;
use crate::error::{AppError, Result, TransferStage};
use crate::registry::{Registry, Repair};
use crate::transfer::{self, PasteReport};
use crate::traverse;
use app_db::{ClipRecord, StateDb};
use app_fs::{
    sort_entries, FileEntry, Prompter, Provider, ProviderAdapter, ProviderKind, ProviderSettings,
    RemotePath, Scratch,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// What kind of listing produced a set of entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Folder,
    Tree,
    Search,
}

/// Result of one command, rendered by the front end
#[derive(Debug)]
pub enum Outcome {
    Nothing,
    WorkingDirectory {
        provider: String,
        drive: String,
        path: RemotePath,
    },
    Entries {
        kind: ListingKind,
        drive: String,
        root: RemotePath,
        entries: Vec<FileEntry>,
        /// Clip the entries were captured into
        captured: Option<String>,
    },
    Fetched {
        path: RemotePath,
        local: Vec<PathBuf>,
    },
    Copied {
        from: String,
        to: Vec<String>,
    },
    Moved {
        from: String,
        to: Vec<String>,
    },
    Removed {
        path: String,
        folder: bool,
    },
    Clips(Vec<Clip>),
    Pasted {
        clip: String,
        report: PasteReport,
    },
    Switched {
        drive: String,
    },
    DriveCreated {
        drive: String,
    },
    Help,
    Clear,
    Quit,
}

/// Notices produced while making the session usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupNotice {
    /// First-time setup created this drive
    Created(String),
    /// The saved active drive was unusable and was replaced
    Substituted { from: Option<String>, to: String },
    /// No drive was usable and the saved state was discarded
    Reset,
}

pub struct Session {
    config: AppConfig,
    settings: ProviderSettings,
    db: StateDb,
    registry: Registry,
    clips: ClipStore,
    providers: HashMap<String, Provider>,
    scratch: Scratch,
}

impl Session {
    /// Load persisted state; call [`Session::startup`] before executing commands
    pub fn open(config: AppConfig, db: StateDb) -> Result<Self> {
        let registry = Registry::from_records(db.load_drives()?, db.active_drive()?);
        let clips = ClipStore::from_records(db.load_clips()?);
        let scratch = Scratch::new().map_err(|e| AppError::Config(format!("scratch directory: {}", e)))?;

        tracing::info!(
            "Session opened with {} drives and {} clips",
            registry.drives().len(),
            clips.iter().count()
        );

        Ok(Self {
            settings: config.provider_settings(),
            config,
            db,
            registry,
            clips,
            providers: HashMap::new(),
            scratch,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// `(provider) drive:path` of the active drive, for the prompt
    pub fn location(&self) -> Option<String> {
        self.registry.active().map(|drive| format!("{}:{}", drive.name, drive.path))
    }

    // ===== Startup & repair =====

    pub fn needs_setup(&self) -> Result<bool> {
        Ok(!self.db.setup_done()? || self.registry.is_empty())
    }

    /// Make sure there is a usable active drive, running setup if needed
    pub async fn startup(&mut self, prompter: &mut dyn Prompter) -> Result<Vec<StartupNotice>> {
        let mut notices = Vec::new();

        if self.needs_setup()? {
            prompter.note("Welcome to drivesh! Let's set up your first drive.");
            let name = self.create_drive(prompter).await?;
            self.db.mark_setup_done()?;
            notices.push(StartupNotice::Created(name));
        }

        match self.repair() {
            Ok(Some(notice)) => notices.push(notice),
            Ok(None) => {}
            Err(AppError::NoValidDrive) => {
                self.reset()?;
                notices.push(StartupNotice::Reset);
                prompter.note("None of the saved drives can be used. Let's set up a new one.");
                let name = self.create_drive(prompter).await?;
                self.db.mark_setup_done()?;
                notices.push(StartupNotice::Created(name));
            }
            Err(e) => return Err(e),
        }

        Ok(notices)
    }

    /// Substitute the first usable drive when the active one is not
    pub fn repair(&mut self) -> Result<Option<StartupNotice>> {
        let repair = self
            .registry
            .repair_with(|d| d.provider_id().map_or(false, ProviderKind::is_known))?;

        match repair {
            Repair::Unchanged => Ok(None),
            Repair::Switched { from, to } => {
                self.flush_registry()?;
                Ok(Some(StartupNotice::Substituted { from, to }))
            }
        }
    }

    /// Discard every drive and clip
    pub fn reset(&mut self) -> Result<()> {
        self.db.reset()?;
        self.registry.clear();
        self.clips.clear();
        self.providers.clear();
        Ok(())
    }

    // ===== Drive creation =====

    /// Interactive drive creation; the registry only changes once every step succeeded
    pub async fn create_drive(&mut self, prompter: &mut dyn Prompter) -> Result<String> {
        let kind = self.ask_provider(prompter)?;
        let name = self.ask_drive_name(prompter)?;

        let mut provider = kind.unconfigured(&self.settings);
        let auth = provider.initialize(&name, prompter).await?;

        self.registry.create(&name, kind.id())?;
        self.registry.get_mut(&name)?.auth = auth;
        self.providers.insert(name.clone(), provider);
        self.flush_registry()?;

        prompter.note(&format!("Created drive {} ({}). Switch to it any time with `{}:`", name, kind, name));
        Ok(name)
    }

    fn ask_provider(&self, prompter: &mut dyn Prompter) -> Result<ProviderKind> {
        let choices: Vec<String> = ProviderKind::ALL
            .iter()
            .map(|k| format!("  {} - {}", k.id(), k.description()))
            .collect();
        prompter.note(&format!("Available providers:\n{}", choices.join("\n")));

        let answer = prompter.ask("Which provider should the drive use?", Some(ProviderKind::ALL[0].id()))?;
        answer
            .parse::<ProviderKind>()
            .map_err(|_| AppError::UnknownProvider(answer.trim().to_string()))
    }

    fn ask_drive_name(&self, prompter: &mut dyn Prompter) -> Result<String> {
        let answer = prompter.ask("What should the drive be called?", None)?;
        let name = Registry::normalize_name(&answer);
        Registry::validate_name(&name)?;
        if self.registry.contains(&name) {
            return Err(AppError::DuplicateDrive(name));
        }
        Ok(name)
    }

    // ===== Providers =====

    /// Adapter for `drive`, built from its stored state on first use
    pub fn provider(&mut self, drive: &str) -> Result<&Provider> {
        self.ensure_provider(drive)?;
        self.providers
            .get(drive)
            .ok_or_else(|| AppError::UnknownDrive(drive.to_string()))
    }

    fn ensure_provider(&mut self, drive: &str) -> Result<()> {
        if self.providers.contains_key(drive) {
            return Ok(());
        }

        let record = self.registry.get(drive)?;
        let id = record.provider_id().unwrap_or_default();
        let kind = id
            .parse::<ProviderKind>()
            .map_err(|_| AppError::UnknownProvider(id.to_string()))?;
        let provider = kind.build(&record.auth, &self.settings)?;

        tracing::debug!("Built {} adapter for drive {}", kind, drive);
        self.providers.insert(drive.to_string(), provider);
        Ok(())
    }

    fn adapter(&self, drive: &str) -> Result<&Provider> {
        self.providers
            .get(drive)
            .ok_or_else(|| AppError::UnknownDrive(drive.to_string()))
    }

    // ===== Persistence =====

    fn flush_registry(&self) -> Result<()> {
        self.db.save_drives(&self.registry.to_records())?;
        if let Some(active) = self.registry.active_name() {
            self.db.set_active_drive(active)?;
        }
        Ok(())
    }

    pub fn history(&self) -> Result<Vec<String>> {
        Ok(self.db.history()?)
    }

    pub fn record_history(&self, line: &str) -> Result<()> {
        Ok(self.db.push_history(line, self.config.general.history_limit)?)
    }

    // ===== Path arguments =====

    fn active_drive(&mut self) -> Result<String> {
        if let Some(drive) = self.registry.active() {
            return Ok(drive.name.clone());
        }
        self.repair()?;
        self.registry
            .active_name()
            .map(str::to_string)
            .ok_or(AppError::NoValidDrive)
    }

    /// Split off a `drive:` prefix that names a configured drive
    ///
    /// `notes:v2.txt` stays a path when no drive is called `notes`. A prefix
    /// followed by nothing or by `/` has to name a drive.
    fn split_prefix<'a>(&self, arg: &'a str) -> Result<(Option<&'a str>, &'a str)> {
        match split_drive(arg) {
            (Some(name), rest) if self.registry.contains(name) => Ok((Some(name), rest)),
            (Some(name), rest) if rest.is_empty() || rest.starts_with('/') => {
                Err(AppError::UnknownDrive(name.to_string()))
            }
            _ => Ok((None, arg)),
        }
    }

    /// Resolve an argument that may carry a `drive:` prefix
    fn locate(&mut self, arg: &str) -> Result<(String, RemotePath)> {
        let (drive, rest) = self.split_prefix(arg)?;
        let drive = match drive {
            Some(name) => name.to_string(),
            None => self.active_drive()?,
        };

        let base = &self.registry.get(&drive)?.path;
        let path = base.resolve(rest)?;
        Ok((drive, path))
    }

    /// As `locate`, but the argument must name a file rather than a folder
    fn locate_file(&mut self, arg: &str) -> Result<(String, RemotePath)> {
        let (_, rest) = self.split_prefix(arg)?;
        if names_folder(rest) {
            return Err(AppError::Usage(format!("{} does not name a file", arg)));
        }
        let (drive, path) = self.locate(arg)?;
        if path.is_root() {
            return Err(AppError::Usage(format!("{} does not name a file", arg)));
        }
        Ok((drive, path))
    }

    // ===== Execution =====

    /// Run one parsed command against the session
    pub async fn execute(
        &mut self,
        invocation: Invocation,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome> {
        let Invocation { command, capture } = invocation;
        tracing::debug!(?command, "Executing");

        match command {
            Command::Pwd => self.pwd(),
            Command::Cd { target } => self.cd(target.as_deref().unwrap_or("/")),
            Command::List { target } => self.list(target.as_deref(), capture).await,
            Command::Tree { target } => {
                let (drive, root) = self.locate(target.as_deref().unwrap_or("."))?;
                self.ensure_provider(&drive)?;
                let entries = traverse::traverse(self.adapter(&drive)?, &root).await?;
                self.finish_listing(ListingKind::Tree, drive, root, entries, capture)
            }
            Command::Search { target, keywords } => {
                if keywords.is_empty() {
                    return Err(AppError::Usage("search <folder> <keyword>...".into()));
                }
                let (drive, root) = self.locate(&target)?;
                self.ensure_provider(&drive)?;
                let entries = traverse::search(self.adapter(&drive)?, &root, &keywords).await?;
                self.finish_listing(ListingKind::Search, drive, root, entries, capture)
            }
            Command::Cat { target } => self.cat(&target).await,
            Command::Copy { from, to } => {
                let (from, to) = self.copy(&from, &to).await?;
                Ok(Outcome::Copied { from, to })
            }
            Command::Move { from, to } => self.move_file(&from, &to).await,
            Command::Remove { target } => self.remove(&target).await,
            Command::ListClips => Ok(Outcome::Clips(self.clips.iter().cloned().collect())),
            Command::Paste { clip } => self.paste(clip.as_deref().unwrap_or(DEFAULT_CLIP)).await,
            Command::SwitchDrive { name } => {
                self.registry.switch(&name)?;
                self.flush_registry()?;
                Ok(Outcome::Switched { drive: name })
            }
            Command::CreateDrive => {
                let drive = self.create_drive(prompter).await?;
                Ok(Outcome::DriveCreated { drive })
            }
            Command::Help => Ok(Outcome::Help),
            Command::Clear => Ok(Outcome::Clear),
            Command::Quit => Ok(Outcome::Quit),
        }
    }

    fn pwd(&mut self) -> Result<Outcome> {
        let name = self.active_drive()?;
        let drive = self.registry.get(&name)?;
        Ok(Outcome::WorkingDirectory {
            provider: drive.provider_id().unwrap_or_default().to_string(),
            drive: drive.name.clone(),
            path: drive.path.clone(),
        })
    }

    /// Move the working path; a `drive:` prefix moves that drive without switching
    fn cd(&mut self, target: &str) -> Result<Outcome> {
        let (drive, path) = self.locate(target)?;
        self.registry.get_mut(&drive)?.path = path;
        self.flush_registry()?;
        Ok(Outcome::Nothing)
    }

    async fn list(&mut self, target: Option<&str>, capture: Option<Capture>) -> Result<Outcome> {
        let (drive, folder) = self.locate(target.unwrap_or("."))?;
        self.ensure_provider(&drive)?;
        let mut entries = self.adapter(&drive)?.list(&folder).await?;
        sort_entries(&mut entries, self.config.list_order());
        self.finish_listing(ListingKind::Folder, drive, folder, entries, capture)
    }

    fn finish_listing(
        &mut self,
        kind: ListingKind,
        drive: String,
        root: RemotePath,
        entries: Vec<FileEntry>,
        capture: Option<Capture>,
    ) -> Result<Outcome> {
        let root = RemotePath::new(root.trimmed());
        let captured = match capture {
            Some(capture) => {
                let clip = self
                    .clips
                    .capture(capture.clip.as_deref(), &drive, root.clone(), entries.clone());
                self.db.save_clip(&ClipRecord::from(clip))?;
                Some(clip.name.clone())
            }
            None => None,
        };

        Ok(Outcome::Entries {
            kind,
            drive,
            root,
            entries,
            captured,
        })
    }

    async fn cat(&mut self, target: &str) -> Result<Outcome> {
        let (drive, path) = self.locate_file(target)?;
        self.ensure_provider(&drive)?;
        let (folder, name) = path.split_file();
        let name = name.unwrap_or_default();

        let handle = self
            .adapter(&drive)?
            .fetch(&folder, name, &self.scratch)
            .await?;
        Ok(Outcome::Fetched {
            path,
            local: handle.parts().to_vec(),
        })
    }

    /// Source and destination of `cp from to`
    ///
    /// A target ending in `/`, `.` or `..` keeps the source name.
    fn copy_endpoints(&mut self, from: &str, to: &str) -> Result<(Location, Location)> {
        let (from_drive, from_path) = self.locate_file(from)?;
        let file_name = from_path.file_name().unwrap_or_default().to_string();

        let (_, to_rest) = self.split_prefix(to)?;
        let (to_drive, to_path) = self.locate(to)?;
        let to_path = if names_folder(to_rest) || to_path.is_root() {
            to_path.join(&file_name)
        } else {
            to_path
        };

        Ok(((from_drive, from_path), (to_drive, to_path)))
    }

    async fn copy(&mut self, from: &str, to: &str) -> Result<(String, Vec<String>)> {
        let (from, to) = self.copy_endpoints(from, to)?;
        self.copy_between(from, to).await
    }

    async fn copy_between(
        &mut self,
        (from_drive, from_path): Location,
        (to_drive, to_path): Location,
    ) -> Result<(String, Vec<String>)> {
        self.ensure_provider(&from_drive)?;
        self.ensure_provider(&to_drive)?;
        let written = transfer::copy_file(
            self.adapter(&from_drive)?,
            &from_path,
            self.adapter(&to_drive)?,
            &to_path,
            &self.scratch,
        )
        .await?;

        let from = format!("{}:{}", from_drive, from_path);
        let to = written
            .iter()
            .map(|p| format!("{}:{}", to_drive, p))
            .collect();
        Ok((from, to))
    }

    async fn move_file(&mut self, from: &str, to: &str) -> Result<Outcome> {
        let (source, target) = self.copy_endpoints(from, to)?;
        if source.0 == target.0 && source.1.same_folder(&target.1) {
            return Err(AppError::Usage(format!("{}:{} is already there", source.0, source.1)));
        }

        let (drive, path) = source.clone();
        let (copied_from, copied_to) = self.copy_between(source, target).await?;
        let (folder, name) = path.split_file();
        self.adapter(&drive)?
            .delete(&folder, name)
            .await
            .map_err(|source| AppError::Transfer {
                stage: TransferStage::Delete,
                path: copied_from.clone(),
                source,
            })?;

        Ok(Outcome::Moved {
            from: copied_from,
            to: copied_to,
        })
    }

    /// Delete a file, or a folder when the argument ends with `/`
    async fn remove(&mut self, target: &str) -> Result<Outcome> {
        let (_, rest) = self.split_prefix(target)?;
        let folder = rest.ends_with('/');

        let (drive, path) = if folder {
            self.locate(target)?
        } else {
            self.locate_file(target)?
        };
        if path.is_root() {
            return Err(AppError::Usage("the drive root cannot be deleted".into()));
        }

        self.ensure_provider(&drive)?;
        let adapter = self.adapter(&drive)?;
        if folder {
            adapter.delete(&path, None).await?;
        } else {
            let (parent, name) = path.split_file();
            adapter.delete(&parent, name).await?;
        }

        Ok(Outcome::Removed {
            path: format!("{}:{}", drive, path.trimmed()),
            folder,
        })
    }

    async fn paste(&mut self, name: &str) -> Result<Outcome> {
        let clip = self.clips.pasteable(name)?.clone();
        let destination_drive = self.active_drive()?;
        let destination = self.registry.get(&destination_drive)?.path.clone();

        self.ensure_provider(&clip.origin_drive)?;
        self.ensure_provider(&destination_drive)?;
        let report = transfer::paste(
            &clip,
            self.adapter(&clip.origin_drive)?,
            self.adapter(&destination_drive)?,
            &destination,
            &self.scratch,
        )
        .await;

        tracing::info!(
            "Pasted clip {}: {} written, {} skipped, {} failed",
            clip.name,
            report.pasted.len(),
            report.skipped.len(),
            report.errors.len()
        );
        Ok(Outcome::Pasted {
            clip: clip.name,
            report,
        })
    }
}

/// A drive name with a path on it
type Location = (String, RemotePath);

/// Does the typed path point at a folder rather than a file?
fn names_folder(rest: &str) -> bool {
    rest.is_empty()
        || rest.ends_with('/')
        || rest == "."
        || rest == ".."
        || rest.ends_with("/.")
        || rest.ends_with("/..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse;
    use crate::testing::ScriptedPrompter;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        session: Session,
    }

    async fn fixture(drives: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = app_db::open(&dir.path().join("state.db")).unwrap();
        let mut session = Session::open(AppConfig::default(), db).unwrap();
        for drive in drives {
            let mut prompter = ScriptedPrompter::new(&["memory", *drive]);
            session.create_drive(&mut prompter).await.unwrap();
        }
        session.db.mark_setup_done().unwrap();
        Fixture { _dir: dir, session }
    }

    fn memory<'a>(session: &'a mut Session, drive: &str) -> &'a app_fs::MemoryProvider {
        match session.provider(drive).unwrap() {
            Provider::Memory(mem) => mem,
            _ => panic!("{drive} is not a memory drive"),
        }
    }

    async fn run(session: &mut Session, line: &str) -> Result<Outcome> {
        let invocation = parse(line)?.expect("blank line");
        let mut prompter = ScriptedPrompter::new(&[]);
        session.execute(invocation, &mut prompter).await
    }

    fn entry_paths(outcome: &Outcome) -> Vec<String> {
        match outcome {
            Outcome::Entries { entries, .. } => entries.iter().map(|e| e.path.to_string()).collect(),
            other => panic!("expected entries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_drive_pipeline() {
        let mut f = fixture(&["work"]).await;
        assert_eq!(f.session.registry().active_name(), Some("work"));

        // Duplicate names fail before the provider is touched
        let mut prompter = ScriptedPrompter::new(&["memory", "work"]);
        let err = f.session.create_drive(&mut prompter).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateDrive(_)));

        let mut prompter = ScriptedPrompter::new(&["ftp"]);
        let err = f.session.create_drive(&mut prompter).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownProvider(_)));
        assert_eq!(f.session.registry().drives().len(), 1);
    }

    #[tokio::test]
    async fn test_drive_name_is_normalized() {
        let mut f = fixture(&[]).await;
        let mut prompter = ScriptedPrompter::new(&["memory", "my drive:"]);
        let name = f.session.create_drive(&mut prompter).await.unwrap();
        assert_eq!(name, "my_drive");
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");
        {
            let db = app_db::open(&path).unwrap();
            let mut session = Session::open(AppConfig::default(), db).unwrap();
            let mut prompter = ScriptedPrompter::new(&["memory", "a"]);
            session.startup(&mut prompter).await.unwrap();
            run(&mut session, "cd /docs/2021").await.unwrap();
        }

        let db = app_db::open(&path).unwrap();
        let mut session = Session::open(AppConfig::default(), db).unwrap();
        assert!(!session.needs_setup().unwrap());
        let mut prompter = ScriptedPrompter::new(&[]);
        assert!(session.startup(&mut prompter).await.unwrap().is_empty());
        assert_eq!(session.location().as_deref(), Some("a:/docs/2021"));
    }

    #[tokio::test]
    async fn test_startup_resets_when_no_drive_is_usable() {
        let dir = TempDir::new().unwrap();
        let db = app_db::open(&dir.path().join("state.db")).unwrap();
        db.save_drives(&[app_db::DriveRecord {
            name: "broken".into(),
            provider: None,
            path: RemotePath::root(),
            auth: app_fs::AuthState::empty(),
        }])
        .unwrap();
        db.mark_setup_done().unwrap();

        let mut session = Session::open(AppConfig::default(), db).unwrap();
        let mut prompter = ScriptedPrompter::new(&["memory", "fresh"]);
        let notices = session.startup(&mut prompter).await.unwrap();
        assert_eq!(
            notices,
            vec![StartupNotice::Reset, StartupNotice::Created("fresh".into())]
        );
        let names: Vec<&str> = session.registry().drives().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_pwd_cd_and_switch() {
        let mut f = fixture(&["a", "b"]).await;
        run(&mut f.session, "a:").await.unwrap();
        run(&mut f.session, "cd docs/../photos/").await.unwrap();

        match run(&mut f.session, "pwd").await.unwrap() {
            Outcome::WorkingDirectory { provider, drive, path } => {
                assert_eq!(provider, "memory");
                assert_eq!(drive, "a");
                assert!(path.same_folder(&RemotePath::new("/photos")));
            }
            other => panic!("unexpected {other:?}"),
        }

        // A prefixed cd moves the other drive without switching to it
        run(&mut f.session, "cd b:/inbox").await.unwrap();
        assert_eq!(f.session.registry().active_name(), Some("a"));
        assert_eq!(f.session.registry().get("b").unwrap().path.as_str(), "/inbox");

        assert!(matches!(run(&mut f.session, "zz:").await, Err(AppError::UnknownDrive(_))));
        assert!(matches!(run(&mut f.session, "cd x:/y").await, Err(AppError::UnknownDrive(_))));
    }

    #[tokio::test]
    async fn test_ls_empty_and_missing() {
        let mut f = fixture(&["a"]).await;
        memory(&mut f.session, "a").insert_folder("/empty");

        let outcome = run(&mut f.session, "ls empty").await.unwrap();
        assert!(entry_paths(&outcome).is_empty());

        let err = run(&mut f.session, "ls missing").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(app_fs::ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_capture_and_paste_across_drives() {
        let mut f = fixture(&["src", "dst"]).await;
        let src = memory(&mut f.session, "src").clone();
        src.insert_file("/docs/report.pdf", "r");
        src.insert_file("/docs/notes.txt", "n");

        run(&mut f.session, "src:").await.unwrap();
        run(&mut f.session, "cd /docs").await.unwrap();
        let outcome = run(&mut f.session, "ls | cp w").await.unwrap();
        assert!(matches!(outcome, Outcome::Entries { captured: Some(ref c), .. } if c == "w"));

        run(&mut f.session, "dst:").await.unwrap();
        run(&mut f.session, "cd /archive").await.unwrap();
        match run(&mut f.session, "pst w").await.unwrap() {
            Outcome::Pasted { report, .. } => {
                assert!(report.is_clean());
                assert_eq!(report.pasted.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let dst = memory(&mut f.session, "dst");
        assert_eq!(dst.read_file("/archive/report.pdf").unwrap(), b"r");
        assert_eq!(dst.read_file("/archive/notes.txt").unwrap(), b"n");
    }

    #[tokio::test]
    async fn test_paste_errors_for_unknown_and_empty_clips() {
        let mut f = fixture(&["a"]).await;
        memory(&mut f.session, "a").insert_folder("/empty");

        assert!(matches!(run(&mut f.session, "pst").await, Err(AppError::UnknownClip(_))));
        run(&mut f.session, "ls empty | cp e").await.unwrap();
        assert!(matches!(run(&mut f.session, "pst e").await, Err(AppError::EmptyClip(_))));
    }

    #[tokio::test]
    async fn test_tree_capture_keeps_structure() {
        let mut f = fixture(&["a"]).await;
        let mem = memory(&mut f.session, "a").clone();
        mem.insert_file("/p/x/1.txt", "1");
        mem.insert_file("/p/2.txt", "2");

        let outcome = run(&mut f.session, "tree /p | cp").await.unwrap();
        assert_eq!(entry_paths(&outcome), vec!["/p/2.txt", "/p/x", "/p/x/1.txt"]);

        run(&mut f.session, "cd /q").await.unwrap();
        run(&mut f.session, "pst").await.unwrap();
        assert_eq!(mem.read_file("/q/x/1.txt").unwrap(), b"1");
        assert_eq!(mem.read_file("/q/2.txt").unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_search_results() {
        let mut f = fixture(&["a"]).await;
        let mem = memory(&mut f.session, "a").clone();
        mem.insert_file("/Invoice_2021.pdf", "i");
        mem.insert_file("/summary.txt", "s");
        mem.insert_file("/notes/Draft-notes.md", "d");

        let outcome = run(&mut f.session, "search . invoice draft").await.unwrap();
        assert_eq!(entry_paths(&outcome), vec!["/Invoice_2021.pdf", "/notes/Draft-notes.md"]);
    }

    #[tokio::test]
    async fn test_cp_mv_rm() {
        let mut f = fixture(&["a", "b"]).await;
        let a = memory(&mut f.session, "a").clone();
        let b = memory(&mut f.session, "b").clone();
        a.insert_file("/in/file.txt", "data");
        run(&mut f.session, "a:").await.unwrap();

        run(&mut f.session, "cp /in/file.txt b:/copies/").await.unwrap();
        assert_eq!(b.read_file("/copies/file.txt").unwrap(), b"data");

        run(&mut f.session, "cp /in/file.txt /in/renamed.txt").await.unwrap();
        assert!(a.exists("/in/renamed.txt"));

        run(&mut f.session, "mv /in/renamed.txt b:/moved.txt").await.unwrap();
        assert!(!a.exists("/in/renamed.txt"));
        assert!(b.exists("/moved.txt"));

        run(&mut f.session, "rm /in/file.txt").await.unwrap();
        assert!(!a.exists("/in/file.txt"));
        run(&mut f.session, "rm /in/").await.unwrap();
        assert!(!a.exists("/in"));

        assert!(matches!(run(&mut f.session, "cp . b:").await, Err(AppError::Usage(_))));
        assert!(matches!(run(&mut f.session, "rm /").await, Err(AppError::Usage(_))));
    }

    #[tokio::test]
    async fn test_mv_onto_itself_writes_nothing() {
        let mut f = fixture(&["a"]).await;
        let mem = memory(&mut f.session, "a").clone();
        mem.insert_file("/a.txt", "data");
        let before = mem.list(&RemotePath::root()).await.unwrap();

        for line in ["mv /a.txt /a.txt", "mv /a.txt .", "mv a.txt a:/"] {
            let err = run(&mut f.session, line).await.unwrap_err();
            assert!(matches!(err, AppError::Usage(_)), "{line}: {err:?}");
        }

        assert_eq!(mem.list(&RemotePath::root()).await.unwrap(), before);
        assert_eq!(mem.read_file("/a.txt").unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_colon_in_file_name_is_not_a_drive() {
        let mut f = fixture(&["a", "b"]).await;
        memory(&mut f.session, "a").insert_file("/notes:v2.txt", "v2");
        run(&mut f.session, "a:").await.unwrap();

        match run(&mut f.session, "cat notes:v2.txt").await.unwrap() {
            Outcome::Fetched { local, .. } => {
                assert_eq!(std::fs::read_to_string(&local[0]).unwrap(), "v2");
            }
            other => panic!("unexpected {other:?}"),
        }

        run(&mut f.session, "cp notes:v2.txt b:/").await.unwrap();
        assert_eq!(memory(&mut f.session, "b").read_file("/notes:v2.txt").unwrap(), b"v2");

        // Bare or rooted prefixes still have to name a drive
        assert!(matches!(run(&mut f.session, "ls zz:").await, Err(AppError::UnknownDrive(_))));
        assert!(matches!(run(&mut f.session, "cat zz:/x.txt").await, Err(AppError::UnknownDrive(_))));
    }

    #[tokio::test]
    async fn test_interrupted_command_leaves_state_untouched() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let mut f = fixture(&["a"]).await;
        let mem = memory(&mut f.session, "a").clone();
        mem.insert_file("/docs/r.txt", "r");
        run(&mut f.session, "ls /docs | cp w").await.unwrap();

        f.session.registry.create("remote", "http").unwrap();
        f.session.registry.get_mut("remote").unwrap().auth = app_fs::AuthState::from_json(serde_json::json!({
            "server": format!("http://{addr}"),
            "backend": "hard_drive",
        }));
        f.session.flush_registry().unwrap();
        run(&mut f.session, "a:").await.unwrap();

        let drives = f.session.registry().drives().to_vec();
        let clips: Vec<Clip> = f.session.clips().iter().cloned().collect();

        for line in ["ls remote:/ | cp w", "mv /docs/r.txt remote:/r.txt"] {
            let invocation = parse(line).unwrap().unwrap();
            let mut prompter = ScriptedPrompter::new(&[]);
            let result = tokio::time::timeout(
                std::time::Duration::from_millis(300),
                f.session.execute(invocation, &mut prompter),
            )
            .await;
            assert!(result.is_err(), "{line} should still be waiting on the server");
        }

        assert_eq!(f.session.registry().drives(), drives.as_slice());
        assert_eq!(f.session.registry().active_name(), Some("a"));
        assert_eq!(f.session.clips().iter().cloned().collect::<Vec<_>>(), clips);
        let saved = f.session.db.load_clips().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].origin_drive, "a");
        assert!(mem.exists("/docs/r.txt"));
    }

    #[tokio::test]
    async fn test_cat_fetches_into_scratch() {
        let mut f = fixture(&["a"]).await;
        memory(&mut f.session, "a").insert_file("/notes.txt", "hello");
        match run(&mut f.session, "cat notes.txt").await.unwrap() {
            Outcome::Fetched { local, .. } => {
                assert_eq!(std::fs::read_to_string(&local[0]).unwrap(), "hello");
                assert!(local[0].starts_with(f.session.scratch().path()));
            }
            other => panic!("unexpected {other:?}"),
        }

        memory(&mut f.session, "a").insert_folder("/photos");
        let err = run(&mut f.session, "cat photos").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(app_fs::ProviderError::IsAFolder(_))));
    }

    #[tokio::test]
    async fn test_drive_token_inside_path_is_rejected() {
        let mut f = fixture(&["a"]).await;
        let err = run(&mut f.session, "ls docs/b:/x").await.unwrap_err();
        assert!(matches!(err, AppError::Path(app_fs::FsError::DriveToken(_))));
    }

    #[tokio::test]
    async fn test_history_is_trimmed_to_limit() {
        let f = fixture(&["a"]).await;
        for i in 0..25 {
            f.session.record_history(&format!("ls {i}")).unwrap();
        }
        let history = f.session.history().unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history.last().map(String::as_str), Some("ls 24"));
    }
}
