use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::SubjectId;
use quiz_core::progress::ProgressSeries;
use services::generation::HttpQuestionGenerator;
use services::{AutoAdvanceTimer, Clock, QuizConfig, QuizLoopService};
use storage::SubjectStore;

mod terminal;

use terminal::Terminal;

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidSubjectId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing subcommand"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSubjectId { raw } => write!(f, "invalid --subject value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quizmaster subjects [--db <sqlite_url>]");
    eprintln!("  quizmaster add      --name <name> [--file <path>] [--db <sqlite_url>]");
    eprintln!("  quizmaster quiz     (--subject <id> | --file <path>) [--db <sqlite_url>]");
    eprintln!("  quizmaster progress --subject <id> [--db <sqlite_url>]");
    eprintln!("  quizmaster delete   --subject <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("`add` reads the source text from stdin when --file is omitted.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quizmaster.sqlite3");
    eprintln!();
    eprintln!("Environment (a .env file is honored):");
    eprintln!("  QUIZ_DB_URL, QUIZ_BATCH_SIZE, QUIZ_AUTO_ADVANCE_MS, QUIZ_LANGUAGE");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Subjects,
    Add { name: String, source: Source },
    QuizSubject(SubjectId),
    QuizText(PathBuf),
    Progress(SubjectId),
    Delete(SubjectId),
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

#[derive(Default)]
struct Flags {
    name: Option<String>,
    file: Option<PathBuf>,
    subject: Option<SubjectId>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let cmd = args.next().ok_or(ArgsError::MissingCommand)?;
        if matches!(cmd.as_str(), "--help" | "-h") {
            print_usage();
            std::process::exit(0);
        }

        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quizmaster.sqlite3".into(), normalize_sqlite_url);
        let mut flags = Flags::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--name" => flags.name = Some(require_value(&mut args, "--name")?),
                "--file" => flags.file = Some(require_value(&mut args, "--file")?.into()),
                "--subject" => {
                    let value = require_value(&mut args, "--subject")?;
                    let id = value
                        .parse::<SubjectId>()
                        .map_err(|_| ArgsError::InvalidSubjectId { raw: value.clone() })?;
                    flags.subject = Some(id);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let subject = |flags: Flags| {
            flags
                .subject
                .ok_or(ArgsError::MissingFlag { flag: "--subject" })
        };
        let command = match cmd.as_str() {
            "subjects" => Command::Subjects,
            "add" => Command::Add {
                name: flags
                    .name
                    .ok_or(ArgsError::MissingFlag { flag: "--name" })?,
                source: flags.file.map_or(Source::Stdin, Source::File),
            },
            "quiz" => match (flags.subject, flags.file) {
                (Some(id), _) => Command::QuizSubject(id),
                (None, Some(path)) => Command::QuizText(path),
                (None, None) => return Err(ArgsError::MissingFlag { flag: "--subject" }),
            },
            "progress" => Command::Progress(subject(flags)?),
            "delete" => Command::Delete(subject(flags)?),
            _ => return Err(ArgsError::UnknownCommand(cmd)),
        };

        Ok(Self { db_url, command })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn read_source(source: &Source) -> std::io::Result<String> {
    match source {
        Source::File(path) => tokio::fs::read_to_string(path).await,
        Source::Stdin => {
            use tokio::io::AsyncReadExt;
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let store = SubjectStore::sqlite(&args.db_url).await?;

    let config = QuizConfig::from_env()?;
    let generator = HttpQuestionGenerator::from_env();
    if !generator.enabled() {
        log::warn!("QUIZ_AI_API_KEY is not set; only cached questions are available");
    }
    let timer = AutoAdvanceTimer::new(config.auto_advance_delay);
    let mut service =
        QuizLoopService::load(config, Clock::System, store, Arc::new(generator)).await;

    match args.command {
        Command::Subjects => {
            if service.subjects().is_empty() {
                println!("No subjects yet. Create one with `quizmaster add`.");
            }
            for subject in service.subjects() {
                let cached = subject.cached_questions().map_or(0, <[_]>::len);
                println!(
                    "{}  {}  ({cached} questions, {} attempts)",
                    subject.id(),
                    subject.name(),
                    subject.history().len()
                );
            }
            Ok(())
        }
        Command::Add { name, source } => {
            let text = read_source(&source).await?;
            service
                .create_subject(&text)
                .await
                .map_err(|err| err.user_message())?;
            let transition = service
                .save_subject(&name)
                .await
                .map_err(|err| err.user_message())?;
            if let Some(id) = transition.saved_subject {
                println!("Saved subject {id}");
            }
            Ok(())
        }
        Command::QuizSubject(id) => {
            service
                .select_subject(&id)
                .await
                .map_err(|err| err.user_message())?;
            Terminal::new().run(&mut service, timer).await
        }
        Command::QuizText(path) => {
            let text = read_source(&Source::File(path)).await?;
            service
                .create_subject(&text)
                .await
                .map_err(|err| err.user_message())?;
            Terminal::new().run(&mut service, timer).await
        }
        Command::Progress(id) => {
            match service.subject_progress(&id)? {
                ProgressSeries::NoHistory => println!("No attempts yet."),
                ProgressSeries::InsufficientHistory(point) => println!(
                    "One attempt so far: {}/{} ({:.0}%). Take another quiz to see a trend.",
                    point.score, point.total_questions, point.percentage
                ),
                ProgressSeries::Trend(points) => {
                    for point in points {
                        println!(
                            "{}  {:>3.0}%  {}/{}",
                            point.date.format("%Y-%m-%d %H:%M"),
                            point.percentage,
                            point.score,
                            point.total_questions
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Delete(id) => {
            let name = service
                .subject(&id)
                .map(|subject| subject.name().to_string())
                .ok_or_else(|| services::QuizLoopError::UnknownSubject(id.clone()))?;
            service.delete_subject(&id).await;
            println!("Deleted {name}");
            Ok(())
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|arg| (*arg).to_string()))
    }

    #[test]
    fn parses_quiz_for_subject() {
        let args = parse(&["quiz", "--subject", "abc", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.command, Command::QuizSubject("abc".parse().unwrap()));
    }

    #[test]
    fn add_defaults_to_stdin() {
        let args = parse(&["add", "--name", "Biology"]).unwrap();
        assert_eq!(
            args.command,
            Command::Add {
                name: "Biology".into(),
                source: Source::Stdin
            }
        );
    }

    #[test]
    fn rejects_missing_and_unknown_input() {
        assert!(matches!(parse(&[]), Err(ArgsError::MissingCommand)));
        assert!(matches!(
            parse(&["progress"]),
            Err(ArgsError::MissingFlag { flag: "--subject" })
        ));
        assert!(matches!(
            parse(&["delete", "--subject"]),
            Err(ArgsError::MissingValue { flag: "--subject" })
        ));
        assert!(matches!(
            parse(&["subjects", "--verbose"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(parse(&["fly"]), Err(ArgsError::UnknownCommand(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.db"));
    }
}
