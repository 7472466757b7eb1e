//! Imgdescgen - AI image description CLI.

use std::process;

use clap::Parser;

use imgdescgen::chatbot::GeminiClient;
use imgdescgen::cli::{Cli, Command, DescribeArgs, ModelsArgs};
use imgdescgen::config::{self, Config, GeminiConfig};
use imgdescgen::context::{RecordingSession, ServiceContext};
use imgdescgen::error::Error;
use imgdescgen::imgdescgen::ImgDescGen;
use imgdescgen::logging;
use imgdescgen::model::ModelName;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        if e.is_payload_too_large() {
            eprintln!("Hint: retry with --reduce-quality, --force-upload, or fewer images.");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    tracing::debug!(path = %config_path.display(), "loading config");
    let config = Config::load(&config_path).map_err(Error::Config)?;
    let mut gemini = GeminiConfig::resolve(&config.gemini, |key| std::env::var(key).ok())?;

    if let Command::Describe(ref args) = cli.command {
        if let Some(ref model) = args.model {
            gemini.model_name = Some(ModelName::resolve(model)?);
        }
        if args.force_upload {
            gemini.force_upload = true;
        }
    }

    let (ctx, recording_session) = ServiceContext::from_env(&gemini)?;
    let client = GeminiClient::new(gemini, ctx.api);

    // The client must be gone before the recorder can be unwrapped; failed
    // runs are recorded too.
    let result = match cli.command {
        Command::Describe(ref args) => describe(client, &config, args).await,
        Command::Models(ref args) => {
            let result = models(&client, args).await;
            drop(client);
            result
        }
    };
    finish_recording(recording_session);
    result
}

async fn describe(client: GeminiClient, config: &Config, args: &DescribeArgs) -> Result<(), Error> {
    let gen = ImgDescGen::new(client, config.exiftool());
    let descriptions = gen
        .generate_image_description(&args.images, args.output_dir.as_deref(), args.reduce_quality)
        .await?;
    print_json(&descriptions)
}

async fn models(client: &GeminiClient, args: &ModelsArgs) -> Result<(), Error> {
    let models = client.available_models().await?;
    match args.model {
        Some(ref name) => {
            let wanted = ModelName::resolve(name)?;
            let model = models.get_model_by_name(&wanted.name).ok_or_else(|| {
                Error::Chatbot(format!("Model {wanted} is not available for image descriptions"))
            })?;
            print_json(model)
        }
        None => print_json(&models.models),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::Io(std::io::Error::other(e)))?;
    println!("{json}");
    Ok(())
}

fn finish_recording(session: Option<RecordingSession>) {
    if let Some(session) = session {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }
}
