use std::path::{Path, PathBuf};
use std::process::ExitCode;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use log::error;
use recipe_parser::{ParseInput, ParseResponse, RecipeParser};
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(author, version, about = "Extract structured recipes from pages, posts, text and photos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a recipe page or a TikTok/Instagram post
    Url {
        url: String,

        /// Only use structured data embedded in the page; never call the model
        #[arg(long)]
        structured_only: bool,
    },

    /// Parse recipe text from a file, or from stdin with `-`
    Text { file: String },

    /// Parse a photo of a recipe
    Image {
        path: PathBuf,

        /// Defaults to a guess from the file extension
        #[arg(long)]
        mime_type: Option<String>,
    },
}

fn mime_from_extension(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
    .to_string()
}

async fn read_input(command: Commands) -> std::io::Result<ParseInput> {
    Ok(match command {
        Commands::Url {
            url,
            structured_only: true,
        } => ParseInput::structured_url(url),
        Commands::Url { url, .. } => ParseInput::url(url),
        Commands::Text { file } if file == "-" => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            ParseInput::text(text)
        }
        Commands::Text { file } => ParseInput::text(tokio::fs::read_to_string(file).await?),
        Commands::Image { path, mime_type } => {
            let bytes = tokio::fs::read(&path).await?;
            let mime_type = mime_type.unwrap_or_else(|| mime_from_extension(&path));
            ParseInput::image(STANDARD.encode(bytes), mime_type)
        }
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let parser = match RecipeParser::builder().build() {
        Ok(parser) => parser,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let input = match read_input(cli.command).await {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: could not read input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let response: ParseResponse = parser.parse(input).await;
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: could not serialize response: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
