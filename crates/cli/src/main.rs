mod commands;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sketchstory::canvas::Canvas;
use sketchstory::config::Config;
use sketchstory::{
    logging, Credential, DrawingSurface, OpenAiBackend, Session, SessionError, Stage,
    DRAWINGS_PER_STORY,
};
use tokio::runtime::Runtime;
use tracing::info;

use crate::commands::Command;

#[derive(Parser)]
#[command(name = "sketchstory", about = "SketchStory -- turn three drawings into a football story")]
struct Cli {
    /// Path to config.toml (defaults to config.toml next to this exe)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key for the vision/text service (falls back to OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Analyze three PNG drawings in order and print the story
    Run {
        #[arg(num_args = DRAWINGS_PER_STORY, required = true)]
        drawings: Vec<PathBuf>,
    },
}

const PREVIEW_COLUMNS: u32 = 50;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());
    if let Some(path) = logging::init_tracing(&config.logging) {
        eprintln!("Logging to {}", path.display());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let canvas = Canvas::new(&config.canvas).context("Invalid [canvas] settings in config")?;
    let backend = Arc::new(OpenAiBackend::new(&config.api));
    let mut session = Session::from_config(canvas, backend, &config);
    session.set_credential(
        cli.api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .and_then(Credential::new),
    );
    info!(model = %config.api.model, "Session started");

    match cli.mode {
        Some(Mode::Run { drawings }) => run_batch(&runtime, &mut session, &drawings),
        None => run_interactive(&runtime, &mut session),
    }
}

fn run_batch(runtime: &Runtime, session: &mut Session<Canvas>, drawings: &[PathBuf]) -> Result<()> {
    if drawings.len() != DRAWINGS_PER_STORY {
        bail!("Expected {DRAWINGS_PER_STORY} drawings, got {}", drawings.len());
    }
    if let Some(warning) = session.credential_warning() {
        bail!("{warning} Pass --api-key or set OPENAI_API_KEY.");
    }

    for path in drawings {
        let step = session.progress().step();
        println!("Analyzing drawing {step} ({}) ...", path.display());
        let description = match runtime.block_on(session.analyze_file(path)) {
            Ok(d) => d,
            Err(SessionError::MissingImage) => {
                bail!("{} is missing or is not a readable PNG", path.display())
            }
            Err(e) => return Err(e).with_context(|| format!("Drawing {step} failed")),
        };
        println!("Drawing {step} analyzed: {description}");
    }

    println!("Creating football story...");
    let story = runtime
        .block_on(session.generate_story())
        .context("Story generation failed")?;
    println!("\nYour football story:\n{story}");
    Ok(())
}

fn print_instructions() {
    println!("SketchStory -- football stories from your drawings");
    println!();
    println!("  1. Draw a first football element (e.g. a ball).");
    println!("  2. Then draw the second (e.g. a player).");
    println!("  3. Finally, draw the third (e.g. a goal).");
    println!("  A football story is created from all three.");
    println!();
    println!("{}", commands::HELP);
}

fn prompt(session: &Session<Canvas>) -> String {
    match session.progress().stage() {
        Stage::AwaitingDrawing(n) => format!("[drawing {n}/{DRAWINGS_PER_STORY}]> "),
        Stage::Complete => "[story ready]> ".into(),
    }
}

fn run_interactive(runtime: &Runtime, session: &mut Session<Canvas>) -> Result<()> {
    print_instructions();
    if let Some(warning) = session.credential_warning() {
        println!("\n{warning}");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", prompt(session));
        io::stdout().flush().context("Failed to write to stdout")?;

        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read from stdin")?;

        match commands::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(runtime, session, command),
            Ok(None) => continue,
            Err(e) => println!("{e}"),
        }

        if let Some(warning) = session.credential_warning() {
            println!("{warning}");
        }
    }
    Ok(())
}

fn execute(runtime: &Runtime, session: &mut Session<Canvas>, command: Command) {
    match command {
        Command::Key(secret) => {
            let secret = match secret {
                Some(secret) => secret,
                None => match rpassword::prompt_password("API key (input hidden): ") {
                    Ok(secret) => secret,
                    Err(e) => {
                        println!("Could not read the key: {e}");
                        return;
                    }
                },
            };
            match Credential::new(secret) {
                Some(credential) => {
                    session.set_credential(Some(credential));
                    println!("API key set.");
                }
                None => session.set_credential(None),
            }
        }
        Command::Width(width) => match session.surface_mut().set_stroke_width(width) {
            Ok(()) => println!("Line width {width}."),
            Err(e) => println!("{e}"),
        },
        Command::Stroke(points) => session.surface_mut().draw_stroke(&points),
        Command::Load(path) => match session.surface_mut().import(&path) {
            Ok(()) => println!("Loaded {} onto the canvas.", path.display()),
            Err(e) => println!("{e}"),
        },
        Command::Show => print!("{}", session.surface().preview(PREVIEW_COLUMNS)),
        Command::Clear => session.surface_mut().reset(),
        Command::Analyze(path) => analyze(runtime, session, path),
        Command::Story => story(runtime, session),
        Command::Status => status(session),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
}

fn analyze(runtime: &Runtime, session: &mut Session<Canvas>, path: Option<PathBuf>) {
    let Some(label) = session.analyze_label() else {
        println!("All {DRAWINGS_PER_STORY} drawings are analyzed. Type `story` to create your story.");
        return;
    };
    if !session.has_credential() {
        // The warning after every command already says what to do.
        return;
    }

    let step = session.progress().step();
    println!("{label} ...");
    let result = match path {
        Some(path) => runtime.block_on(session.analyze_file(&path)),
        None => runtime.block_on(session.analyze()),
    };
    match result {
        Ok(description) => {
            println!("Drawing {step} analyzed: {description}");
            if session.story_available() {
                println!("All drawings are in. Type `story` to create your football story.");
            }
        }
        Err(SessionError::MissingImage) => {}
        Err(e) => println!("Error: {e}"),
    }
}

fn story(runtime: &Runtime, session: &Session<Canvas>) {
    if !session.story_available() {
        let missing = DRAWINGS_PER_STORY - session.progress().descriptions().len();
        println!("Analyze {missing} more drawing(s) first.");
        return;
    }
    if !session.has_credential() {
        return;
    }

    println!("Creating football story...");
    match runtime.block_on(session.generate_story()) {
        Ok(story) => println!("\nYour football story:\n{story}\n"),
        Err(e) => println!("Error: {e}"),
    }
}

fn status(session: &Session<Canvas>) {
    let progress = session.progress();
    println!("Progress: {}", progress.stage());
    for (i, description) in progress.descriptions().iter().enumerate() {
        println!("  Drawing {}: {description}", i + 1);
    }
    let canvas = session.surface();
    println!(
        "Canvas {}x{}, line width {}, {}.",
        canvas.width(),
        canvas.height(),
        canvas.stroke_width(),
        if canvas.is_blank() { "blank" } else { "has a drawing" }
    );
}
