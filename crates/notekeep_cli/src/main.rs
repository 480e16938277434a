//! Command-line host for the notekeep persistence service.
//!
//! # Responsibility
//! - Open a SQLite-backed store and construct one service instance.
//! - Run a single command, then `force_save` before exit so no debounced
//!   write is lost.
//!
//! Logging is enabled when `NOTEKEEP_LOG_DIR` is set (absolute path);
//! `NOTEKEEP_LOG_LEVEL` overrides the build-mode default level.

use log::{info, warn};
use notekeep_core::model::format_timestamp;
use notekeep_core::{
    default_log_level, format_file_size, init_logging, Category, Clock, FileUpload, Note,
    NotePatch, PersistenceService, Recipient, ServiceConfig, SqliteKeyValueStore, SystemClock,
};
use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

const USAGE: &str = "usage: notekeep <db-path> <command> [args]

commands:
  init                                  seed storage and print status
  categories                            list categories
  notes [query]                         list (or search) notes
  files                                 list derived files and note counts
  add-category <id> <name>              create a category
  rm-category <id>                      delete a category (notes become uncategorized)
  add-note <title> <content> [category] create a note
  edit-note <id> <content>              replace note content
  rm-note <id>                          delete a note
  export [out-file]                     write export JSON to a file or stdout
  import <file>                         replace categories and notes from export JSON
  share <note-id> [base-url]            create a share link
  add-file <path> [mime-type]           record a local file for sharing
  shared-files                          list shared files
  rm-file <file-id>                     delete a shared file record
  share-file <file-id> [base-url]       create a public file share link
  keys                                  list raw storage keys
  status                                show sync timestamp and pending writes";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let (db_path, command, rest) = match args.as_slice() {
        [db_path, command, rest @ ..] => (db_path, command.as_str(), rest),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_logging_from_env();

    let store = match SqliteKeyValueStore::open(db_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut service = PersistenceService::new(store, ServiceConfig::default());
    if !service.initialize() {
        eprintln!("storage initialization failed; see logs");
        return ExitCode::FAILURE;
    }

    let outcome = run_command(&mut service, command, rest);

    if service.has_unsaved_changes() && !service.force_save() {
        eprintln!("failed to persist pending changes");
        return ExitCode::FAILURE;
    }

    match outcome {
        Ok(()) => {
            info!("event=cli_command module=cli status=ok command={command}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            warn!("event=cli_command module=cli status=error command={command}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

type Service = PersistenceService<SqliteKeyValueStore>;

fn run_command(service: &mut Service, command: &str, args: &[String]) -> Result<(), String> {
    match (command, args) {
        ("init", []) | ("status", []) => {
            println!("last_sync={}", service.get_last_sync_timestamp());
            println!("categories={}", service.get_categories().len());
            println!("notes={}", service.get_notes().len());
            println!("unsaved_changes={}", service.has_unsaved_changes());
            Ok(())
        }
        ("categories", []) => {
            for category in service.get_categories() {
                println!("{}\t{}", category.id, category.name);
            }
            Ok(())
        }
        ("notes", query) => {
            let query = query.join(" ");
            for note in service.search_notes(&query) {
                println!(
                    "{}\t{}\t{}",
                    note.id,
                    note.category_id.as_deref().unwrap_or("-"),
                    note.title
                );
            }
            Ok(())
        }
        ("files", []) => {
            for file in service.get_note_files() {
                println!("{}\t{}\t{} note(s)", file.id, file.name, file.notes.len());
            }
            Ok(())
        }
        ("add-category", [id, name]) => check(
            service.create_category(Category::new(id.as_str(), name.as_str())),
            "category was not created",
        ),
        ("rm-category", [id]) => check(service.delete_category(id), "category was not deleted"),
        ("add-note", [title, content, category @ ..]) if category.len() <= 1 => {
            let now = format_timestamp(SystemClock.now());
            let note = Note::new(title.as_str(), content.as_str(), category.first().cloned(), now);
            let id = note.id.clone();
            check(service.create_note(note), "note was not created")?;
            println!("{id}");
            Ok(())
        }
        ("edit-note", [id, content]) => check(
            service.update_note(id, &NotePatch::content(content.as_str())),
            "note was not updated",
        ),
        ("rm-note", [id]) => check(service.delete_note(id), "note was not deleted"),
        ("export", []) => {
            let json = service.export_data();
            if json.is_empty() {
                return Err("export failed".to_string());
            }
            println!("{json}");
            Ok(())
        }
        ("export", [path]) => {
            let json = service.export_data();
            if json.is_empty() {
                return Err("export failed".to_string());
            }
            fs::write(path, json).map_err(|err| format!("failed to write `{path}`: {err}"))
        }
        ("import", [path]) => {
            let json =
                fs::read_to_string(path).map_err(|err| format!("failed to read `{path}`: {err}"))?;
            check(service.import_data(&json), "import rejected: invalid data format")
        }
        ("share", [note_id, base_url @ ..]) if base_url.len() <= 1 => {
            let base_url = base_url
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_SHARE_BASE_URL);
            let share = service
                .share_note(note_id, true, Vec::<Recipient>::new())
                .ok_or_else(|| format!("note `{note_id}` cannot be shared"))?;
            println!("{}", share.link(base_url));
            Ok(())
        }
        ("add-file", [path, mime_type @ ..]) if mime_type.len() <= 1 => {
            let upload = file_upload(path, mime_type.first().map(String::as_str))?;
            let file = service
                .add_shared_file(upload)
                .ok_or_else(|| "file was not recorded".to_string())?;
            println!("{}", file.id);
            Ok(())
        }
        ("shared-files", []) => {
            for file in service.get_shared_files() {
                println!(
                    "{}\t{}\t{}\t{}",
                    file.id,
                    file.name,
                    format_file_size(file.size),
                    if file.is_public { "public" } else { "private" }
                );
            }
            Ok(())
        }
        ("rm-file", [file_id]) => check(
            service.delete_shared_file(file_id),
            "shared file was not deleted",
        ),
        ("share-file", [file_id, base_url @ ..]) if base_url.len() <= 1 => {
            let base_url = base_url
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_SHARE_BASE_URL);
            let file = service
                .share_file(file_id, true, Vec::<Recipient>::new())
                .ok_or_else(|| format!("file `{file_id}` cannot be shared"))?;
            let link = file
                .link(base_url)
                .ok_or_else(|| format!("file `{file_id}` has no share token"))?;
            println!("{link}");
            Ok(())
        }
        ("keys", []) => {
            let keys = service
                .store()
                .keys()
                .map_err(|err| format!("failed to list keys: {err}"))?;
            for key in keys {
                println!("{key}");
            }
            Ok(())
        }
        _ => Err(USAGE.to_string()),
    }
}

fn file_upload(path: &str, mime_type: Option<&str>) -> Result<FileUpload, String> {
    let path = Path::new(path);
    let metadata = fs::metadata(path)
        .map_err(|err| format!("failed to stat `{}`: {err}", path.display()))?;
    let absolute = fs::canonicalize(path)
        .map_err(|err| format!("failed to resolve `{}`: {err}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| format!("`{}` has no file name", path.display()))?;
    Ok(FileUpload {
        name,
        size: metadata.len(),
        mime_type: mime_type.unwrap_or(DEFAULT_MIME_TYPE).to_string(),
        url: format!("file://{}", absolute.display()),
    })
}

fn check(ok: bool, failure: &str) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(failure.to_string())
    }
}

fn init_logging_from_env() {
    let Ok(log_dir) = env::var("NOTEKEEP_LOG_DIR") else {
        return;
    };
    let level = env::var("NOTEKEEP_LOG_LEVEL").unwrap_or_else(|_| default_log_level().to_string());
    if let Err(err) = init_logging(&level, &log_dir) {
        eprintln!("logging disabled: {err}");
    }
}
