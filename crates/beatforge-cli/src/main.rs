//! beatforge - beatmap timing engine driver
//!
//! Plays charts through the voice pools, remaps pastes across tempo maps and
//! converts between beats and song time.

use anyhow::Context;
use beatforge_cli::commands::convert::{convert, Position};
use beatforge_cli::commands::paste::{merge, remap, PasteRequest};
use beatforge_cli::commands::play::{play, PlayOptions};
use beatforge_cli::read_json;
use beatforge_core::EngineConfig;
use beatforge_domain_chart::ChartSnapshot;
use beatforge_domain_paste::{Clipboard, PastePolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beatforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a chart in real time and print struck notes
    Play {
        /// Chart snapshot (JSON)
        #[arg(short, long)]
        chart: PathBuf,

        /// Engine configuration (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding the drum and metronome WAV variants
        #[arg(short, long)]
        samples: PathBuf,

        /// Output device name (default: host default output)
        #[arg(long)]
        device: Option<String>,

        /// Song time to start from
        #[arg(long, default_value_t = 0.0)]
        from_ms: f64,

        /// Playback speed factor
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Click on every beat
        #[arg(long)]
        metronome: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Remap clipboard notes into a destination chart and print them as JSON
    Paste {
        /// Destination chart snapshot (JSON)
        #[arg(short, long)]
        dest: PathBuf,

        /// Clipboard: copied notes plus their tempo context (JSON)
        #[arg(short = 'b', long)]
        clipboard: PathBuf,

        /// Destination beat of the first copied note
        #[arg(short, long)]
        offset: f64,

        /// Lane for the first copied note; other notes keep their distance to it
        #[arg(short, long)]
        lane: Option<i32>,

        /// How copied note spacing follows tempo
        #[arg(short, long, value_enum, default_value_t = PolicyArg::NoteBpm)]
        policy: PolicyArg,

        /// Print the destination chart with the notes merged in
        #[arg(long)]
        merge: bool,
    },

    /// Convert between beats and song time on a chart's tempo map
    Convert {
        /// Chart snapshot (JSON)
        #[arg(short, long)]
        chart: PathBuf,

        #[command(flatten)]
        position: PositionArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PositionArgs {
    /// Beat position to convert to milliseconds
    #[arg(long)]
    beat: Option<f64>,

    /// Song time in milliseconds to convert to a beat
    #[arg(long)]
    ms: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    GlobalBeat,
    FirstNoteBpm,
    NoteBpm,
}

impl From<PolicyArg> for PastePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::GlobalBeat => PastePolicy::GlobalBeat,
            PolicyArg::FirstNoteBpm => PastePolicy::FirstNoteBpm,
            PolicyArg::NoteBpm => PastePolicy::NoteBpm,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play {
            chart,
            config,
            samples,
            device,
            from_ms,
            scale,
            metronome,
            json,
        } => {
            let chart: ChartSnapshot = read_json(&chart)?;
            let config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("cannot load config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let options = PlayOptions {
                samples,
                device,
                from_ms,
                tempo_scale: scale,
                metronome,
                json,
            };
            play(chart, config, &options)
        }
        Commands::Paste {
            dest,
            clipboard,
            offset,
            lane,
            policy,
            merge: merged,
        } => {
            let dest: ChartSnapshot = read_json(&dest)?;
            let clipboard: Clipboard = read_json(&clipboard)?;
            let request = PasteRequest {
                offset,
                lane,
                policy: policy.into(),
            };
            let output = if merged {
                serde_json::to_string_pretty(&merge(dest, &clipboard, request)?)?
            } else {
                serde_json::to_string_pretty(&remap(&dest, &clipboard, request)?)?
            };
            println!("{output}");
            Ok(())
        }
        Commands::Convert { chart, position } => {
            let chart: ChartSnapshot = read_json(&chart)?;
            let position = match (position.beat, position.ms) {
                (Some(beat), _) => Position::Beat(beat),
                (None, Some(ms)) => Position::Millis(ms),
                (None, None) => anyhow::bail!("either --beat or --ms is required"),
            };
            println!("{}", serde_json::to_string_pretty(&convert(&chart, position)?)?);
            Ok(())
        }
    }
}
