//! Montage CLI: container clip tooling.
//!
//! Usage:
//!   montage new [OPTIONS] <CLIP>      Create a container clip document
//!   montage program-id <CLIP>         Print the clip's program id
//!   montage validate <CLIP>           Check the clip's program
//!   montage render <CLIP>             Render a container clip
//!   montage status <CLIP>             Show the render session state
//!   montage abort <CLIP>              Ask a running renderer to stop
//!   montage clone <CLIP> <OUT>        Duplicate a container clip
//!   montage preview <CLIP>            Render one generator preview frame
//!   montage thumbnail <CLIP>          Write the clip thumbnail
//!   montage placeholder <IMAGE>       Encode placeholder media
//!   montage plugins <DIR>             List generator plugins
//!   montage check                     Check renderer availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Render container clips out of process",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a container clip document
    New {
        /// Output clip document (JSON)
        clip: PathBuf,

        /// Container type: generator|filter|xml
        #[arg(short = 't', long = "type")]
        container_type: String,

        /// Script or project file the clip renders
        #[arg(short, long)]
        program: PathBuf,

        /// Placeholder media played until rendered
        #[arg(short, long)]
        media: PathBuf,

        /// Frame count of the placeholder media
        #[arg(short, long)]
        length: Option<u64>,
    },

    /// Print the program id of a container clip
    ProgramId {
        /// Clip document
        clip: PathBuf,
    },

    /// Validate the program of a container clip
    Validate {
        /// Clip document
        clip: PathBuf,
    },

    /// Render a container clip and swap the result in
    Render {
        /// Clip document
        clip: PathBuf,

        /// Render kind: full|clip|preview
        #[arg(short, long, default_value = "full")]
        kind: String,

        /// First timeline frame of the clip (inclusive)
        #[arg(long, default_value = "0")]
        clip_in: i64,

        /// Last timeline frame of the clip (inclusive)
        #[arg(long)]
        clip_out: Option<i64>,

        /// Frame to render for previews
        #[arg(long, default_value = "0")]
        frame: i64,

        /// Write frames instead of an encoded video
        #[arg(long)]
        frames: bool,
    },

    /// Show the render session state of a clip
    Status {
        /// Clip document
        clip: PathBuf,
    },

    /// Ask the renderer of a clip to stop
    Abort {
        /// Clip document
        clip: PathBuf,
    },

    /// Duplicate a container clip, copying rendered media
    Clone {
        /// Clip document
        clip: PathBuf,

        /// Output clip document
        output: PathBuf,
    },

    /// Render one generator frame with optional editor values
    Preview {
        /// Clip document
        clip: PathBuf,

        /// Frame to render
        #[arg(long, default_value = "0")]
        frame: i64,

        /// Editor values as JSON
        #[arg(long)]
        editors: Option<String>,
    },

    /// Write the clip thumbnail
    Thumbnail {
        /// Clip document
        clip: PathBuf,
    },

    /// Encode placeholder media from a still image
    Placeholder {
        /// Still image
        image: PathBuf,

        /// Frame count
        #[arg(short, long, default_value = "200")]
        length: u64,
    },

    /// List generator plugins
    Plugins {
        /// Plugin library root
        dir: PathBuf,
    },

    /// Check renderer availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = montage_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    montage_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::New {
            clip,
            container_type,
            program,
            media,
            length,
        } => commands::new::run(clip, container_type, program, media, length),
        Commands::ProgramId { clip } => commands::status::program_id(clip),
        Commands::Validate { clip } => commands::validate::run(&config, clip),
        Commands::Render {
            clip,
            kind,
            clip_in,
            clip_out,
            frame,
            frames,
        } => {
            let request = commands::render::RenderRequest {
                kind,
                clip_in,
                clip_out,
                frame,
                frames,
            };
            commands::render::run(&config, clip, request).await
        }
        Commands::Status { clip } => commands::status::run(&config, clip),
        Commands::Abort { clip } => commands::status::abort(&config, clip),
        Commands::Clone { clip, output } => commands::clone::run(&config, clip, output),
        Commands::Preview {
            clip,
            frame,
            editors,
        } => commands::preview::run(&config, clip, frame, editors),
        Commands::Thumbnail { clip } => commands::preview::thumbnail(&config, clip),
        Commands::Placeholder { image, length } => {
            commands::placeholder::run(&config, image, length).await
        }
        Commands::Plugins { dir } => commands::plugins::run(dir),
        Commands::Check => commands::check::run(&config),
    }
}
