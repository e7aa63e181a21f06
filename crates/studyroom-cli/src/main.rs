use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use studyroom_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "studyroom", version, about = "Studyroom study planner CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Study timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Recorded study sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Weekly study goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Dashboard statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> commands::CliResult {
    // `config` must still work when the file on disk is broken.
    let config = match cli.command {
        Commands::Config { .. } | Commands::Completions { .. } => Config::default(),
        _ => Config::load()?,
    };
    commands::init_logging(&config);

    match cli.command {
        Commands::Timer { action } => commands::timer::run(action, &config),
        Commands::Task { action } => commands::task::run(action, &config),
        Commands::Session { action } => commands::session::run(action, &config),
        Commands::Goal { action } => commands::goal::run(action, &config),
        Commands::Stats { action } => commands::stats::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "studyroom", &mut std::io::stdout());
            Ok(())
        }
    }
}
