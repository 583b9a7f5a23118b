mod inspect;
mod pack;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pack files into a resource pack
    PackResources(PackResourcesCommand),
    /// Pack a story script and its media into a story pack
    PackStory(PackStoryCommand),
    /// List the resources of a resource pack
    List(ListCommand),
    /// Extract one resource by name
    Extract(ExtractCommand),
    /// Play a story pack back as text
    Read(ReadCommand),
    /// Resolve every action of a story pack
    Verify(VerifyCommand),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false, id = "input")]
struct ResourceInput {
    /// JSON manifest listing `{ name, path }` sources
    #[arg(long)]
    manifest: Option<String>,
    /// Directory to pack; names are paths relative to it
    #[arg(long)]
    dir: Option<String>,
}

#[derive(Debug, Args)]
struct PackResourcesCommand {
    #[command(flatten)]
    input: ResourceInput,
    /// Output resource pack path
    #[arg(short, long)]
    output: String,
    /// Also write a Rust module with one index constant per resource
    #[arg(long)]
    index_module: Option<String>,
    /// Override existing files
    #[arg(long, default_value_t = false)]
    r#override: bool,
}

#[derive(Debug, Args)]
struct PackStoryCommand {
    /// JSON story script
    #[arg(short, long)]
    script: String,
    /// Output story pack path
    #[arg(short, long)]
    output: String,
    /// Override existing files
    #[arg(long, default_value_t = false)]
    r#override: bool,
}

#[derive(Debug, Args)]
struct ListCommand {
    /// Resource pack path
    input: String,
    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Args)]
struct ExtractCommand {
    /// Resource pack path
    input: String,
    /// Exact resource name
    name: String,
    /// Output file path, defaults to the last name segment
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Debug, Args)]
struct ReadCommand {
    /// Story pack path
    input: String,
    /// Wait for Enter after each line
    #[arg(short, long, default_value_t = false)]
    interactive: bool,
}

#[derive(Debug, Args)]
struct VerifyCommand {
    /// Story pack path
    input: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed arguments");

    match &cli.command {
        Command::PackResources(cmd) => pack::pack_resources(cmd),
        Command::PackStory(cmd) => pack::pack_story(cmd),
        Command::List(cmd) => inspect::list(cmd),
        Command::Extract(cmd) => inspect::extract(cmd),
        Command::Read(cmd) => inspect::read(cmd),
        Command::Verify(cmd) => inspect::verify(cmd),
    }
}
