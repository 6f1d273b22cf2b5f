use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{self, ClearType},
};
use engine::{Engine, EngineError, Principal, users};
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};

#[derive(Parser, Debug)]
#[command(name = "expense_tracker_admin")]
#[command(about = "Admin utilities for the expense tracker (bootstrap users and tokens)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./expense_tracker.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a user and print its token.
    Create(UsernameArgs),
    /// Print the user's token, issuing one if needed. Asks for the password.
    Token(UsernameArgs),
    /// Revoke the user's token.
    Revoke(UsernameArgs),
}

#[derive(Args, Debug)]
struct UsernameArgs {
    #[arg(long)]
    username: String,
}

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Outcome of feeding one key to a [`MaskedInput`].
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Editing,
    Submitted,
    Cancelled,
}

/// Line buffer for a secret typed in raw mode.
#[derive(Debug, Default)]
struct MaskedInput {
    secret: String,
}

impl MaskedInput {
    fn feed(&mut self, key: KeyEvent) -> Step {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => Step::Submitted,
            KeyCode::Esc => Step::Cancelled,
            KeyCode::Char('c' | 'd') if ctrl => Step::Cancelled,
            KeyCode::Char('u') if ctrl => {
                self.secret.clear();
                Step::Editing
            }
            KeyCode::Backspace => {
                self.secret.pop();
                Step::Editing
            }
            KeyCode::Char(ch) if !ctrl => {
                self.secret.push(ch);
                Step::Editing
            }
            _ => Step::Editing,
        }
    }

    fn mask(&self) -> String {
        "*".repeat(self.secret.chars().count())
    }
}

/// Reads a secret from the terminal, echoing one `*` per character.
fn read_secret(label: &str) -> CliResult<String> {
    terminal::enable_raw_mode()?;
    let read = read_masked(label);
    terminal::disable_raw_mode()?;
    eprintln!();
    read?.ok_or_else(|| "cancelled".into())
}

fn read_masked(label: &str) -> CliResult<Option<String>> {
    let mut out = std::io::stderr();
    let mut input = MaskedInput::default();
    loop {
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(label),
            Print(input.mask())
        )?;
        out.flush()?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match input.feed(key) {
            Step::Editing => {}
            Step::Submitted => return Ok(Some(input.secret)),
            Step::Cancelled => return Ok(None),
        }
    }
}

/// Asks for a new password and its confirmation.
fn read_new_password() -> CliResult<String> {
    let password = read_secret("New password: ")?;
    if read_secret("Repeat password: ")? != password {
        return Err("the two passwords differ".into());
    }
    Ok(password)
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Prints field messages one per line and exits, other errors bubble up.
fn report(err: EngineError) -> Box<dyn Error + Send + Sync> {
    if let EngineError::Validation(errors) = &err {
        for (field, messages) in errors.fields() {
            for message in messages {
                eprintln!("{field}: {message}");
            }
        }
        std::process::exit(1);
    }
    err.into()
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = read_new_password()?;
            let registration = engine
                .register(&args.username, &password)
                .await
                .map_err(report)?;
            println!("created user: {}", registration.principal.username);
            println!("token: {}", registration.token);
        }
        Command::User(User {
            command: UserCommand::Token(args),
        }) => {
            let password = read_secret("Password: ")?;
            match engine.login(&args.username, &password).await {
                Ok(token) => println!("token: {token}"),
                Err(EngineError::Unauthorized(reason)) => {
                    eprintln!("{reason}");
                    std::process::exit(1);
                }
                Err(err) => return Err(report(err)),
            }
        }
        Command::User(User {
            command: UserCommand::Revoke(args),
        }) => {
            let Some(user) = users::Entity::find()
                .filter(users::Column::Username.eq(args.username.as_str()))
                .one(&db)
                .await?
            else {
                eprintln!("user not found: {}", args.username);
                std::process::exit(1);
            };

            engine.logout(&Principal::new(user.id, user.username)).await?;
            println!("revoked token of: {}", args.username);
        }
    }

    Ok(())
}
