use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voltex_core::{run, BuildSettings, PreviewSettings};

#[derive(Debug, Parser)]
#[command(name = "voltex-world", version, about = "Sound Voltex manual world builder")]
struct Args {
    /// Song catalog written by the fetcher (JSON, optionally gzip-compressed)
    #[arg(long, default_value = "src/data/songs.json")]
    songs: PathBuf,

    /// JSON object mapping navigator names to the song titles they unlock
    #[arg(long)]
    navigators: Option<PathBuf>,

    /// JSON file overriding the built-in goal/trap/helper/gauge tables
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Manual `src` folder that receives the data files and is packed
    #[arg(long, default_value = "src")]
    manual_src: PathBuf,

    #[arg(long, env = "APWORLD_OUTPUT_FOLDER", default_value = "dist")]
    output: PathBuf,

    #[arg(long, default_value = "MapleLeaf")]
    creator: String,

    /// Build without the `_dev` suffix and with compact JSON
    #[arg(long, default_value_t = false)]
    release: bool,

    /// Generate and validate without writing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Report what a player choosing this many songs would keep
    #[arg(long, value_name = "COUNT")]
    preview_songs: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Also write a plain-text world summary next to the apworld
    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// Log filter used when `RUST_LOG` is unset. The binary's own target is its
/// crate name, which follows the `[[bin]]` name rather than the package.
fn default_filter() -> String {
    format!("voltex_core=info,{}=info", module_path!())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = BuildSettings {
        songs_path: args.songs,
        navigators_path: args.navigators,
        tables_path: args.tables,
        manual_src: args.manual_src,
        output_path: args.output,
        creator: args.creator,
        dev: !args.release,
        dry_run: args.dry_run,
        debug: args.debug,
        preview: args.preview_songs.map(|song_count| PreviewSettings {
            song_count,
            seed: args.seed,
        }),
    };

    if settings.dev {
        tracing::warn!("set --release to generate without the '_dev' suffix");
    }

    let report = match run(settings) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    println!("Game: {}", report.game.game);
    println!("Creator: {}", report.game.creator);
    println!("Generated {} items", report.item_count);
    println!("Generated {} locations", report.location_count);
    println!("Configured {} categories", report.category_count);
    if let Some(path) = &report.apworld_path {
        println!("World path: {}", path.display());
    }
    if let Some(preview) = &report.preview {
        println!(
            "Preview: {} items, {} locations enabled",
            preview.items, preview.locations
        );
    }
}
