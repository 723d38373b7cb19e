use anyhow::Context;
use clap::Parser;
use console::Term;
use duel_tetris::{
    AnsiTermStyle, Command, EngineConfig, EngineEvent, EngineResult, GameConfig, GameFieldPair,
    Mode, PlainTermStyle, PlayerSnapshot, TermRender, TermStyle, TetrisEngine, command_for_key,
};
use match_sync::{
    MatchId, PlayerSlot, SyncConfig, ZenohStore, generate_guest_name, generate_player_name,
};
use std::path::PathBuf;
use std::sync::Arc;
use zenoh::key_expr::KeyExpr;

/// duel_tetris - falling blocks, alone or head to head over zenoh
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name
    #[arg(short, long)]
    name: Option<String>,

    /// Match to join; plays single-player when omitted
    #[arg(short, long)]
    room: Option<String>,

    /// Player slot in the match (1 or 2)
    #[arg(short, long, default_value_t = 1)]
    slot: u8,

    /// Key expression prefix
    #[arg(short, long, default_value = "duel_tetris")]
    prefix: KeyExpr<'static>,

    /// Path to Zenoh config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed of the piece generator
    #[arg(long)]
    seed: Option<u64>,

    /// Polling interval of the opponent state (in milliseconds)
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Draw without colors
    #[arg(long)]
    plain: bool,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, the board to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let zenoh_config = if let Some(config_path) = &args.config {
        zenoh::Config::from_file(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?
    } else {
        zenoh::Config::default()
    };
    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open zenoh session: {}", e))?;

    let store = Arc::new(
        ZenohStore::<PlayerSnapshot>::new(session, args.prefix.clone())
            .await
            .context("Failed to declare store")?,
    );

    let name = match (&args.name, &args.room) {
        (Some(name), _) => name.clone(),
        (None, Some(_)) => generate_guest_name(),
        (None, None) => generate_player_name(),
    };
    let mode = match &args.room {
        Some(room) => Mode::Versus {
            match_id: MatchId::from_name(room.as_str())?,
            slot: PlayerSlot::try_from(args.slot)?,
        },
        None => Mode::Single,
    };
    let config = EngineConfig::new(name.clone())
        .with_mode(mode.clone())
        .with_game(GameConfig::new().with_seed(args.seed))
        .with_sync(SyncConfig::new().with_poll_interval_ms(args.poll_ms));

    println!("=== duel_tetris ===");
    println!("Player: {}", name);
    println!("Prefix: {}", args.prefix);
    if let Mode::Versus { match_id, slot } = &mode {
        println!("Match: {} (slot {})", match_id, slot);
    }
    println!("Controls:");
    println!("  ← → / a d - Move left/right");
    println!("  ↓ / s - Soft drop");
    println!("  ↑ / w - Rotate");
    println!("  Space - Hard drop");
    println!("  c - Hold");
    println!("  p - Pause drawing");
    println!("  q - Quit");
    println!();

    let (command_tx, command_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::unbounded();

    // Keyboard reading blocks, keep it off the runtime
    let keyboard_task = tokio::task::spawn_blocking(move || {
        let input_term = Term::stdout();
        loop {
            if let Ok(key) = input_term.read_key()
                && let Some(command) = command_for_key(&key)
            {
                let quit = command == Command::Quit;
                if command_tx.send(command).is_err() || quit {
                    break;
                }
            }
        }
    });

    let engine = tokio::spawn(TetrisEngine::new(store, config).run(command_rx, event_tx));

    let render_term = Term::stdout();
    render_term.clear_screen()?;
    let help = vec!["q - Quit, p - Pause".to_string()];
    while let Ok(event) = event_rx.recv_async().await {
        match event {
            EngineEvent::Frame(commands) => {
                let screen = GameFieldPair::from_commands(&commands, help.clone());
                if args.plain {
                    draw(&render_term, &screen, &PlainTermStyle)?;
                } else {
                    draw(&render_term, &screen, &AnsiTermStyle)?;
                }
            }
            EngineEvent::Hidden => {
                render_term.clear_screen()?;
                render_term.write_line("Paused, press p to resume")?;
            }
            EngineEvent::Status(text) => {
                render_term.clear_screen()?;
                render_term.write_line(&text)?;
            }
        }
    }

    let result = engine.await.context("Engine task failed")??;
    keyboard_task.abort();

    match result {
        EngineResult::Single(record) => println!(
            "Game Over! Score {} (level {}, {} lines)",
            record.score, record.level, record.lines
        ),
        EngineResult::Versus { outcome, stats } => {
            println!("{}", outcome);
            println!("{}", stats);
        }
        EngineResult::Quit => println!("Bye"),
    }
    Ok(())
}

fn draw(term: &Term, screen: &GameFieldPair, style: &impl TermStyle) -> anyhow::Result<()> {
    term.move_cursor_to(0, 0)?;
    for line in screen.render(style) {
        term.write_line(&line)?;
    }
    term.flush()?;
    Ok(())
}
