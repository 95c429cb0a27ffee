//! Tic-Tac-Toe Client
//!
//! Line-oriented terminal front end. Plays online against the game server
//! or pass-and-play on one machine.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tictactoe_online::{
    core::rules::Verdict,
    ClientConfig, ConnectionManager, LocalGame, Phase, SessionController, SessionView, Update,
    VERSION,
};

/// A parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Online,
    Cancel,
    Local,
    Play(usize),
    Reset,
    Leave,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Command> {
        match line {
            "online" | "o" => Some(Command::Online),
            "cancel" | "c" => Some(Command::Cancel),
            "local" | "l" => Some(Command::Local),
            "reset" | "r" => Some(Command::Reset),
            "leave" | "menu" => Some(Command::Leave),
            "help" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            other => other.parse().ok().map(Command::Play),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ClientConfig::from_env();
    info!("Tic-Tac-Toe Client v{}", VERSION);
    info!("Server: {}", config.server_url);

    let mut controller = SessionController::new(ConnectionManager::websocket(&config));
    let mut local: Option<LocalGame> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let Some(command) = Command::parse(line.trim()) else {
                    println!("Unknown command. Type 'help'.");
                    continue;
                };
                if command == Command::Quit {
                    break;
                }
                run_command(command, &mut controller, &mut local);
            }
            Some(update) = controller.next_update() => {
                render_update(&update, &controller.view());
            }
        }
    }

    controller.leave();
    info!("Goodbye");
    Ok(())
}

fn run_command(command: Command, controller: &mut SessionController, local: &mut Option<LocalGame>) {
    match command {
        Command::Online => {
            if controller.find_match() {
                *local = None;
                println!("Connecting...");
            } else {
                println!("Already online. Type 'leave' first.");
            }
        }
        Command::Cancel => {
            if controller.cancel_search() {
                println!("Search cancelled.");
            }
        }
        Command::Local => {
            controller.leave();
            let game = local.insert(LocalGame::new());
            render_local(game);
        }
        Command::Play(cell) => match local {
            Some(game) => {
                if !game.play(cell) {
                    println!("Can't play {}.", cell);
                }
                render_local(game);
            }
            None if controller.phase() == Phase::Idle => {
                println!("Start a game first: 'online' or 'local'.");
            }
            // Feedback arrives with the next server snapshot.
            None => {
                if !controller.submit_move(cell) {
                    println!("Can't play {} now.", cell);
                }
            }
        },
        Command::Reset => {
            if let Some(game) = local {
                game.reset();
                render_local(game);
            }
        }
        Command::Leave => {
            *local = None;
            controller.leave();
            println!("Back to menu.");
        }
        Command::Help => print_help(),
        Command::Quit => {}
    }
}

fn render_update(update: &Update, view: &SessionView) {
    match update {
        Update::Connected(id) => println!("Connected as {}. Looking for an opponent...", id),
        Update::Matchmaking(status) => println!("{}", status),
        Update::SessionStarted | Update::SessionUpdated | Update::GameOver(_) => render_online(view),
        Update::ConnectionLost(reason) => {
            println!("Disconnected: {}", reason.as_deref().unwrap_or("connection closed"));
        }
        Update::Ignored => {}
    }
}

fn render_online(view: &SessionView) {
    println!();
    print!("{}", view.board);

    let status = match view.phase {
        Phase::Active if view.my_turn => "Your turn.",
        Phase::Active => "Opponent's turn.",
        Phase::Finished => match view.did_i_win {
            Some(true) => "You won!",
            Some(false) => "You lost.",
            None => "It's a draw.",
        },
        Phase::Searching => "Searching for an opponent...",
        Phase::Idle => "Not in a game.",
    };
    println!("{}", status);

    if let Some([a, b, c]) = view.winning_line {
        println!("Winning line: {}-{}-{}", a, b, c);
    }
    if view.phase == Phase::Finished {
        println!("Type 'leave' to return to the menu.");
    }
}

fn render_local(game: &LocalGame) {
    println!();
    print!("{}", game.board());
    match game.verdict() {
        Verdict::InProgress => println!("{} to move.", game.to_move()),
        Verdict::Won { mark, line: [a, b, c] } => {
            println!("{} wins! ({}-{}-{}) Type 'reset' to play again.", mark, a, b, c);
        }
        Verdict::Draw => println!("Draw. Type 'reset' to play again."),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  online   find an online opponent");
    println!("  cancel   stop searching");
    println!("  local    two players on this machine");
    println!("  0-8      play a cell");
    println!("  reset    restart the local game");
    println!("  leave    back to the menu");
    println!("  quit     exit");
}
