//! Binary entrypoint for the waymark CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `status` - print current map, map/pin counts
//! - `export [-o FILE]` - write a dated world snapshot
//! - `import FILE [--yes]` - classify and import a snapshot or legacy dump
//! - `reset [--yes]` - reset the world to the starter maps
//! - `travel` - drive the travel wizard end to end from flags
//!
//! See the library crate docs for module-level details: `waymark::`.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use waymark::atlas::{
    export_world, import_document, AtlasModel, CommandSink, Confirm, KvStore, LegacyStore,
    TravelWizard,
};
use waymark::config::Config;

#[derive(Parser)]
#[command(name = "waymark")]
#[command(about = "A persistent multi-map location registry with a travel wizard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init,
    /// Show the current map and world statistics
    Status,
    /// Export the world as a dated JSON snapshot
    Export {
        /// Output file; defaults to the snapshot's dated name
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Import a world snapshot or legacy pin dump, replacing the world
    Import {
        /// Document to import
        file: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Reset the world to the starter maps
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Assemble a travel instruction and print it
    Travel {
        /// Destination name
        #[arg(long)]
        dest: String,
        /// Companion name; omit to travel alone
        #[arg(long = "with")]
        companion: Option<String>,
        /// NPC to meet at the destination
        #[arg(long)]
        npc: Option<String>,
        /// Activity at the destination
        #[arg(long)]
        activity: String,
    },
}

/// Yes/no prompt on the controlling terminal; `--yes` short-circuits it.
struct TtyConfirm {
    assume_yes: bool,
}

impl Confirm for TtyConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Command sink that prints the finished instruction to stdout.
struct StdoutSink;

impl CommandSink for StdoutSink {
    fn dispatch(&self, command: &str) {
        println!("{command}");
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level.
    let level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(path) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            let file = std::sync::Arc::new(std::sync::Mutex::new(f));
            // With stderr redirected (cron, pipelines) the file is the only sink.
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{line}");
                }
                if is_tty {
                    writeln!(fmt, "{line}")
                } else {
                    Ok(())
                }
            });
        }
    } else if !atty::is(atty::Stream::Stderr) {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    let _ = builder.try_init();
}

async fn open_model(config: &Config) -> Result<AtlasModel> {
    let store = KvStore::new(&config.storage.data_dir);
    let legacy = LegacyStore::load(Path::new(&config.storage.legacy_file)).await;
    Ok(AtlasModel::load(store, &legacy).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote starter configuration to {}", cli.config);
        }
        Commands::Status => {
            let config = pre_config.unwrap_or_default();
            let model = open_model(&config).await?;
            let world = model.world();
            println!(
                "Current map: {} ({})",
                model.current_map().name,
                world.current_map_id
            );
            println!("Maps: {}", world.maps.len());
            for (id, map) in &world.maps {
                println!("  {id}: {} ({} pins)", map.name, map.pins.len());
            }
        }
        Commands::Export { output } => {
            let config = pre_config.unwrap_or_default();
            let model = open_model(&config).await?;
            let snapshot = export_world(model.world())?;
            let path = output.unwrap_or(snapshot.file_name);
            tokio::fs::write(&path, &snapshot.contents).await?;
            println!("Exported world to {path}");
        }
        Commands::Import { file, yes } => {
            let config = pre_config.unwrap_or_default();
            let mut model = open_model(&config).await?;
            let text = tokio::fs::read_to_string(&file).await?;
            let _ = import_document(&mut model, &text, &TtyConfirm { assume_yes: yes }).await?;
            info!("imported world from {file}");
            println!(
                "Imported {} map(s) from {file}",
                model.world().maps.len()
            );
        }
        Commands::Reset { yes } => {
            let config = pre_config.unwrap_or_default();
            let mut model = open_model(&config).await?;
            let _ = model
                .reset_to_defaults(&TtyConfirm { assume_yes: yes })
                .await?;
            println!("World reset to starter maps");
        }
        Commands::Travel {
            dest,
            companion,
            npc,
            activity,
        } => {
            let mut wizard = TravelWizard::new();
            wizard.set_destination(&dest)?;
            if let Some(npc) = npc {
                wizard.set_meet_npc(true, &npc);
            }
            match companion {
                Some(name) => wizard.set_companion_name(&name)?,
                None => wizard.choose_alone()?,
            }
            let _ = wizard.finalize(&activity, &StdoutSink)?;
        }
    }

    Ok(())
}
