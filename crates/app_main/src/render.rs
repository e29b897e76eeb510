//! Text rendering of session outcomes

use app_core::{Clip, ListingKind, Outcome, PasteReport, StartupNotice};
use app_fs::{FileEntry, RemotePath};

pub const HELP_TEXT: &str = r#"drivesh - one shell for all your drives

Drives:
  ::                      Create a new drive
  <name>:                 Switch to drive <name>
  pwd                     Show the active drive and folder
  cd [path]               Change folder; `other:path` moves another drive

Files:
  ls [path]               List a folder (also l, ll, la, lf)
  tree [path]             List a folder and everything below it
  search <path> <kw>...   Find entries whose name contains any keyword
  cat <file>              Download a file and open it
  cp <from> [to]          Copy a file, across drives if you like
  mv <from> <to>          Copy a file, then delete the original
  rm <file>               Delete a file (rm <folder>/ deletes a folder)

Clips:
  ls | cp [clip]          Remember a listing (tree and search work too)
  cp -l                   Show every clip
  pst [clip]              Paste a clip into the current folder

Shell:
  help, clear, quit (q, exit)

Paths with spaces go in quotes: cat "My Documents/notes.txt"
A `name:` prefix only means a drive when one by that name exists;
otherwise notes:v2.txt is just a file name."#;

pub fn banner() -> String {
    format!(
        "drivesh v{}\nType `help` to see what you can do, `quit` to leave.",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn prompt(location: Option<String>) -> String {
    format!("{}> ", location.unwrap_or_else(|| "drivesh".to_string()))
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn notice(notice: &StartupNotice) -> String {
    match notice {
        StartupNotice::Created(name) => format!("Drive {} is ready.", name),
        StartupNotice::Substituted { from: Some(from), to } => {
            format!("Drive {} can no longer be used; switched to {}.", from, to)
        }
        StartupNotice::Substituted { from: None, to } => format!("Switched to drive {}.", to),
        StartupNotice::Reset => "Saved drives were discarded.".to_string(),
    }
}

/// Text for an outcome; `None` when there is nothing to print
pub fn outcome(outcome: &Outcome) -> Option<String> {
    let text = match outcome {
        Outcome::Nothing | Outcome::Clear | Outcome::Quit => return None,
        Outcome::WorkingDirectory { provider, drive, path } => {
            format!("({}) {}:{}", provider, drive, path)
        }
        Outcome::Entries {
            kind,
            root,
            entries,
            captured,
            ..
        } => {
            let mut text = entries_table(*kind, root, entries);
            if let Some(clip) = captured {
                text.push_str(&format!("\nSaved {} entries to clip {}", entries.len(), clip));
            }
            text
        }
        Outcome::Fetched { path, local } => {
            let files: Vec<String> = local.iter().map(|p| p.display().to_string()).collect();
            format!("Downloaded {} to {}", path, files.join(", "))
        }
        Outcome::Copied { from, to } => format!("Copied {} to {}", from, to.join(", ")),
        Outcome::Moved { from, to } => format!("Moved {} to {}", from, to.join(", ")),
        Outcome::Removed { path, folder: true } => format!("Deleted folder {}", path),
        Outcome::Removed { path, folder: false } => format!("Deleted {}", path),
        Outcome::Clips(clips) => clips_listing(clips),
        Outcome::Pasted { clip, report } => paste_report(clip, report),
        Outcome::Switched { drive } => format!("Switched to drive {}", drive),
        Outcome::DriveCreated { drive } => format!("Drive {} is ready", drive),
        Outcome::Help => HELP_TEXT.to_string(),
    };
    Some(text)
}

fn entries_table(kind: ListingKind, root: &RemotePath, entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return match kind {
            ListingKind::Search => "No matches".to_string(),
            _ => "Folder is empty".to_string(),
        };
    }

    let rows: Vec<[String; 4]> = entries
        .iter()
        .map(|entry| {
            let name = match kind {
                ListingKind::Folder => entry.name.clone(),
                // Recursive results are shown relative to where the walk started
                _ => entry.path.relative_to(root).unwrap_or_else(|| entry.path.to_string()),
            };
            let name = if entry.is_folder() { format!("{}/", name) } else { name };
            let size = match (entry.is_folder(), entry.size) {
                (false, Some(bytes)) => format_size(bytes),
                _ => "-".to_string(),
            };
            let modified = entry
                .last_modified_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            let kind = if entry.is_folder() { "folder" } else { "file" };
            [name, size, modified, kind.to_string()]
        })
        .collect();

    table(&["Name", "Size", "Modified", "Kind"], &rows)
}

fn table(headers: &[&str; 4], rows: &[[String; 4]]) -> String {
    let mut widths = headers.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = vec![line(*headers)];
    out.push(line(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str)));
    for row in rows {
        out.push(line(row.each_ref().map(String::as_str)));
    }
    out.join("\n")
}

fn clips_listing(clips: &[Clip]) -> String {
    if clips.is_empty() {
        return "No clips yet. Capture one with `ls | cp [clip]`.".to_string();
    }

    let mut out = Vec::new();
    for clip in clips {
        out.push(format!(
            "{} ({} files from {}:{})",
            clip.name,
            clip.file_count(),
            clip.origin_drive,
            clip.origin_path
        ));
        for entry in &clip.files {
            let marker = if entry.is_folder() { "/" } else { "" };
            out.push(format!("  {}{}", entry.path, marker));
        }
    }
    out.join("\n")
}

fn paste_report(clip: &str, report: &PasteReport) -> String {
    let mut out = vec![format!("Pasted {} files from clip {}", report.pasted.len(), clip)];
    if !report.skipped.is_empty() {
        out.push(format!("Skipped {} folders", report.skipped.len()));
    }
    for (path, error) in &report.errors {
        out.push(format!("  failed {}: {}", path, error.user_message()));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_empty_listing() {
        let text = entries_table(ListingKind::Folder, &RemotePath::root(), &[]);
        assert_eq!(text, "Folder is empty");
        let text = entries_table(ListingKind::Search, &RemotePath::root(), &[]);
        assert_eq!(text, "No matches");
    }

    #[test]
    fn test_tree_rows_are_relative() {
        let entries = vec![
            FileEntry::folder(RemotePath::new("/docs/2021")),
            FileEntry::file(RemotePath::new("/docs/2021/a.txt"), Some(2048)),
        ];
        let text = entries_table(ListingKind::Tree, &RemotePath::new("/docs"), &entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[2].starts_with("2021/"));
        assert!(lines[3].starts_with("2021/a.txt"));
        assert!(lines[3].contains("2.0 KB"));
    }

    #[test]
    fn test_pwd_outcome() {
        let text = outcome(&Outcome::WorkingDirectory {
            provider: "memory".into(),
            drive: "scratch".into(),
            path: RemotePath::new("/a/b"),
        });
        assert_eq!(text.as_deref(), Some("(memory) scratch:/a/b"));
        assert_eq!(outcome(&Outcome::Nothing), None);
    }

    #[test]
    fn test_prompt() {
        assert_eq!(prompt(Some("work:/docs".into())), "work:/docs> ");
        assert_eq!(prompt(None), "drivesh> ");
    }
}
