//! Command-line front end for the progress tracker.
//!
//! Opens the cached index and bookmark for a book, prints where reading
//! stands, and optionally jumps to a character offset or lists chapters.

use anyhow::{Context, Result, anyhow};
use reading_progress::cache::{FileStore, ProgressStore};
use reading_progress::config::{LogReloadHandle, apply_log_level, init_tracing, load_config};
use reading_progress::session::{ReaderSession, SystemClock};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const USAGE: &str = "Usage: reading-progress <path-to-book> [--jump <count>] [--chapters]";

#[derive(Debug, PartialEq)]
struct Args {
    book_path: PathBuf,
    jump: Option<u64>,
    chapters: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &LogReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(Path::new("conf/config.toml"));
    apply_log_level(reload_handle, config.log_level);
    info!(
        path = %args.book_path.display(),
        level = %config.log_level,
        "Starting progress tracker"
    );

    let store = FileStore::for_book(Path::new(&config.cache_dir), &args.book_path);
    let index = store.load_book_index().with_context(|| {
        format!(
            "No book index in {}; import the book first",
            store.dir().display()
        )
    })?;
    let spine = index.spine_paths();
    let title = args
        .book_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut session = ReaderSession::open(
        &title,
        index,
        spine,
        Box::new(store),
        Box::new(SystemClock),
        &config,
    );

    if let Some(count) = args.jump {
        if !session.jump_to_character(count) {
            return Err(anyhow!("Character {count} is outside the indexed book"));
        }
    }

    let position = session.position();
    println!(
        "{title}: chapter {} at {:.1}%, character {} of {} ({:.1}% of book)",
        position.chapter_index + 1,
        position.fractional_progress * 100.0,
        session.current_character_count(),
        session.index().total_character_count(),
        session.book_progress() * 100.0,
    );

    if args.chapters {
        for row in session.chapter_rows() {
            let marker = if row.is_current { '>' } else { ' ' };
            println!(
                "{marker} {:>3}  {:>5.1}%  {:>8}  {}",
                row.chapter_index + 1,
                row.start_percent,
                row.length,
                row.content_path
            );
        }
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut book_path = None;
    let mut jump = None;
    let mut chapters = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--jump" => {
                let value = args.next().ok_or_else(|| anyhow!(USAGE))?;
                let count = value
                    .parse()
                    .with_context(|| format!("Invalid character count: {value}"))?;
                jump = Some(count);
            }
            "--chapters" => chapters = true,
            _ if book_path.is_none() => book_path = Some(PathBuf::from(arg)),
            _ => return Err(anyhow!(USAGE)),
        }
    }

    let book_path = book_path.ok_or_else(|| anyhow!(USAGE))?;
    Ok(Args {
        book_path,
        jump,
        chapters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_book_and_flags_in_any_order() {
        let parsed = args(&["--chapters", "book.epub", "--jump", "1200"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                book_path: PathBuf::from("book.epub"),
                jump: Some(1200),
                chapters: true,
            }
        );
    }

    #[test]
    fn rejects_missing_book_and_bad_counts() {
        assert!(args(&[]).is_err());
        assert!(args(&["book.epub", "--jump"]).is_err());
        assert!(args(&["book.epub", "--jump", "many"]).is_err());
        assert!(args(&["a.epub", "b.epub"]).is_err());
    }
}
