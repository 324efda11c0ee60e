use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use tree_pins::error::Error;
use tree_pins::icon::{self, IconSet, StatusClass};
use tree_pins::location;
use tree_pins::{TreeRecord, render, tree};

#[derive(Parser)]
#[command(name = "tree-pins", version, about = "Normalize tree location records into map pins")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log parsing decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    icons: IconArgs,
}

#[derive(Args)]
struct IconArgs {
    /// Marker for endangered/critical/vulnerable trees
    #[arg(long, global = true, default_value = icon::DEFAULT_RED)]
    icon_red: String,

    /// Marker for threatened/concern trees
    #[arg(long, global = true, default_value = icon::DEFAULT_ORANGE)]
    icon_orange: String,

    /// Marker for every other tree
    #[arg(long, global = true, default_value = icon::DEFAULT_GREEN)]
    icon_green: String,
}

impl From<IconArgs> for IconSet {
    fn from(args: IconArgs) -> Self {
        Self {
            red: args.icon_red,
            orange: args.icon_orange,
            green: args.icon_green,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every pin of a location record
    Pins(RecordInput),

    /// Print the representative coordinate of a location record
    Primary(RecordInput),

    /// Print which stored encoding a location record uses
    Shape(RecordInput),

    /// Print canonical locations for trees still stored in a legacy encoding
    Migrate(TreesInput),

    /// One line per tree: pin count, first coordinate and marker
    Summary {
        #[command(flatten)]
        trees: TreesInput,

        /// Emit JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Draw an ASCII preview map of each tree's pins
    Preview {
        #[command(flatten)]
        trees: TreesInput,

        /// Only this tree id
        #[arg(long)]
        id: Option<String>,

        /// Map width in characters
        #[arg(short = 'W', long, default_value_t = 40)]
        width: usize,

        /// Map height in characters
        #[arg(short = 'H', long, default_value_t = 12)]
        height: usize,
    },
}

#[derive(Args)]
struct RecordInput {
    /// Raw location value (reads --file or stdin when omitted)
    #[arg(allow_hyphen_values = true)]
    record: Option<String>,

    /// Read the location value from a file
    #[arg(short, long, conflicts_with = "record")]
    file: Option<PathBuf>,
}

impl RecordInput {
    fn read(&self) -> Result<Value, Error> {
        let text = match (&self.record, &self.file) {
            (Some(record), _) => record.clone(),
            (None, Some(path)) => read_file(path)?,
            (None, None) => read_stdin()?,
        };
        Ok(Value::String(text.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[derive(Args)]
struct TreesInput {
    /// JSON file holding a tree list (reads stdin when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Fetch trees from {URL}/api/trees instead
    #[cfg(feature = "api")]
    #[arg(long, value_name = "URL", conflicts_with = "file")]
    api_url: Option<String>,
}

impl TreesInput {
    fn read(&self) -> Result<Vec<TreeRecord>, Error> {
        #[cfg(feature = "api")]
        if let Some(url) = &self.api_url {
            return tree_pins::api::fetch_trees(url);
        }
        let text = match &self.file {
            Some(path) => read_file(path)?,
            None => read_stdin()?,
        };
        tree::parse_tree_list(&text)
    }
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })
}

fn read_stdin() -> Result<String, Error> {
    std::io::read_to_string(std::io::stdin()).map_err(|source| Error::Read {
        path: "<stdin>".to_string(),
        source,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli.command, &cli.icons.into()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but found nothing.
fn run(command: Command, icons: &IconSet) -> Result<bool, Error> {
    match command {
        Command::Pins(input) => {
            let pins = location::parse_all_coordinates(Some(&input.read()?), None);
            for (i, pin) in pins.iter().enumerate() {
                println!(
                    "{:>3}. {}  icon={}  image={}",
                    i + 1,
                    pin.coordinate,
                    pin.icon.as_deref().unwrap_or("-"),
                    pin.image.as_deref().unwrap_or("-"),
                );
            }
            Ok(!pins.is_empty())
        }
        Command::Primary(input) => {
            match location::parse_primary_coordinate(Some(&input.read()?), None) {
                Some(c) => {
                    println!("{},{}", c.lat(), c.lng());
                    Ok(true)
                }
                None => {
                    eprintln!("No coordinate found");
                    Ok(false)
                }
            }
        }
        Command::Shape(input) => {
            println!("{}", location::detect_shape(Some(&input.read()?)).as_str());
            Ok(true)
        }
        Command::Migrate(input) => {
            let trees = input.read()?;
            let mut migrated = 0;
            for t in &trees {
                if let Some(canonical) = location::migrate_location(t.location.as_ref()) {
                    migrated += 1;
                    let line = serde_json::json!({
                        "id": t.id,
                        "from": t.shape().as_str(),
                        "location": canonical,
                    });
                    println!("{line}");
                }
            }
            eprintln!("{migrated} of {} trees need migration", trees.len());
            Ok(true)
        }
        Command::Summary { trees, json } => {
            for t in &trees.read()? {
                let summary = t.summarize(icons);
                if json {
                    println!("{}", serde_json::to_string(&summary)?);
                } else {
                    println!(
                        "{:<8} {:<28} {:>3} pin(s)  {:<28} {}",
                        summary.id.as_deref().unwrap_or("-"),
                        summary.name,
                        summary.pin_count,
                        summary
                            .first
                            .map_or_else(|| "-".to_string(), |c| c.to_string()),
                        summary.icon,
                    );
                }
            }
            Ok(true)
        }
        Command::Preview {
            trees,
            id,
            width,
            height,
        } => {
            let mut drawn = 0;
            for t in trees.read()? {
                if id.as_deref().is_some_and(|id| t.id.as_deref() != Some(id)) {
                    continue;
                }
                let pins = t.pins();
                let marker = StatusClass::classify(t.tree_status.as_deref()).glyph();
                let map = render::render_preview(&pins, marker, width, height);
                if map.is_empty() {
                    continue;
                }
                println!("{} ({} pin(s))", t.display_name(), pins.len());
                println!("{map}");
                println!();
                drawn += 1;
            }
            Ok(drawn > 0)
        }
    }
}
