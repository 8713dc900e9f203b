use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use now_gist::cli::{interactive, Cli, Commands, OutputFormat};
use now_gist::config::Config;
use now_gist::pipeline::GistPipeline;
use now_gist::provider::probe_manifest;
use now_gist::utils::{self, format_file_size};
use now_gist::{output, GistError};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "now_gist=debug" } else { "now_gist=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref()).await?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Gist {
            url,
            output,
            format,
            transcribe,
            save_audio,
            debug,
        } => {
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config.app.default_output_format));
            let pipeline = GistPipeline::new(config).with_progress(show_progress);
            let enable_stt = transcribe || pipeline.config().transcription.enabled;

            let report = match pipeline.generate(&url, enable_stt).await {
                Ok(report) => report,
                Err(e) => return Ok(fail(&e)),
            };

            for warning in &report.warnings {
                eprintln!("⚠️  {}", warning);
            }

            match output {
                Some(path) => {
                    output::save_to_file(&report, &path, &format).await?;
                    println!("Gist saved to: {}", path.display());
                }
                None => output::print_to_console(&report, &format)?,
            }

            if let Some(dir) = save_audio {
                match report.audio().await {
                    Ok(audio) => {
                        let path = audio.save_into(&dir).await?;
                        println!("Audio saved to: {} ({})", path.display(), format_file_size(audio.bytes.len() as u64));
                    }
                    Err(e) => return Ok(fail(&e)),
                }
            }

            if debug {
                println!("{}", serde_json::to_string_pretty(&output::debug_panel(&report.metadata))?);
            }
        }
        Commands::Audio { url, output, timeout } => {
            let mut pipeline = GistPipeline::new(config).with_progress(show_progress);
            if let Some(secs) = timeout {
                pipeline = pipeline.with_transcode_timeout(std::time::Duration::from_secs(secs.max(1)));
            }

            let audio = match pipeline.manifest_audio(&url).await {
                Ok(audio) => audio,
                Err(e) => return Ok(fail(&e)),
            };

            let path = audio.save_into(&output).await?;
            println!("Audio saved to: {} ({})", path.display(), format_file_size(audio.bytes.len() as u64));
        }
        Commands::Resolve { url, check } => {
            let pipeline = GistPipeline::new(config);
            let target = match pipeline.resolve(&url) {
                Ok(target) => target,
                Err(e) => return Ok(fail(&e)),
            };

            println!("newsId:   {}", target.media);
            println!("manifest: {}", target.manifest_url);

            if check {
                let probe = probe_manifest(&target.manifest_url, std::time::Duration::from_secs(15)).await;
                println!("status:   {}", probe.summary());
            }
        }
        Commands::Interactive { transcribe } => {
            let pipeline = GistPipeline::new(config).with_progress(show_progress);
            let enable_stt = transcribe || pipeline.config().transcription.enabled;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            interactive::run(&pipeline, enable_stt, stdin, &mut stdout).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", match &cli.config {
                    Some(path) => path.display().to_string(),
                    None => Config::config_path()?.display().to_string(),
                });
            }
        }
        Commands::Check => {
            let statuses = utils::check_dependencies(&config).await;
            for status in &statuses {
                match &status.version {
                    Some(version) => println!("✓ {:<22} {} ({})", status.name, version, status.purpose),
                    None => println!("✗ {:<22} not found ({})", status.name, status.purpose),
                }
            }
            if !utils::missing_required(&statuses).is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Report a classified failure; input errors exit with 2, everything else with 1
fn fail(error: &GistError) -> ExitCode {
    let mut stderr = std::io::stderr();
    if interactive::report_error(error, &mut stderr).is_err() {
        eprintln!("{}", error.classified());
    }
    if error.is_input_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}
