mod cli;
mod size;

use df_av::ToolRegistry;
use df_cache::ResourceCache;
use df_core::config::Config;
use df_core::{OutputSpec, Profile, TalkManifest, DEFAULT_STREAM_URL};
use df_fetch::{Fetcher, HttpTransport};
use df_pipeline::{StateObserver, Synthesizer};

use anyhow::Result;
use clap::Parser;
use cli::{CacheAction, Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Options of the `download` command that override the config file.
struct DownloadArgs {
    manifest: PathBuf,
    output: Option<PathBuf>,
    overwrite: bool,
    profile: Option<Profile>,
    ffmpeg: Option<PathBuf>,
    rtmpdump: Option<PathBuf>,
    swfrender: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "deckforge=trace,df_core=debug,df_cache=debug,df_fetch=debug,df_av=debug,df_pipeline=debug"
                .to_string()
        } else {
            "deckforge=info,df_core=info,df_cache=info,df_fetch=info,df_av=info,df_pipeline=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<df_core::Error>()
            .map(df_core::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Download {
            manifest,
            output,
            overwrite,
            profile,
            ffmpeg,
            rtmpdump,
            swfrender,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            config.cache.enabled |= cli.cache;
            let args = DownloadArgs {
                manifest,
                output,
                overwrite,
                profile,
                ffmpeg,
                rtmpdump,
                swfrender,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(download(config, args))
        }
        Commands::Cache { action } => {
            let config = load_config(cli.config.as_deref())?;
            let cache = ResourceCache::from_config(&config.cache);
            match action {
                CacheAction::Size => {
                    println!("{}", size::humanize(cache.size(), 2));
                }
                CacheAction::Clear => cache.clear()?,
            }
            Ok(())
        }
        Commands::CheckTools => {
            let config = load_config(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Version => {
            println!("deckforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    Ok(config)
}

async fn download(mut config: Config, args: DownloadArgs) -> Result<()> {
    if let Some(p) = args.ffmpeg {
        config.tools.ffmpeg_path = Some(p);
    }
    if let Some(p) = args.rtmpdump {
        config.tools.rtmpdump_path = Some(p);
    }
    if let Some(p) = args.swfrender {
        config.tools.swfrender_path = Some(p);
    }
    if let Some(profile) = args.profile {
        config.output.profile = profile;
    }
    config.output.overwrite |= args.overwrite;

    let mut manifest = TalkManifest::load(&args.manifest)?;
    // Talks that do not name a streaming server use the configured one.
    if manifest.video.url == DEFAULT_STREAM_URL {
        manifest.video.url = config.stream.video_url.clone();
    }

    let output_path = args.output.unwrap_or_else(|| manifest.default_output());
    let output = OutputSpec::new(output_path, config.output.profile)
        .with_overwrite(config.output.overwrite);

    let transport = HttpTransport::new(Duration::from_secs(config.fetch.timeout_secs))?;
    let mut fetcher = Fetcher::from_config(Arc::new(transport), &config.fetch);
    if config.cache.enabled {
        let cache = ResourceCache::from_config(&config.cache);
        tracing::debug!("Using cache at {}", cache.root().display());
        fetcher = fetcher.with_cache(Arc::new(cache));
    }

    let synthesizer = Synthesizer::new(Arc::new(fetcher), ToolRegistry::discover(&config.tools))
        .with_max_resumes(config.stream.max_resumes)
        .with_observer(StateObserver::new(|t| {
            tracing::debug!("Synthesis state: {}", t.state);
        }));

    let path = synthesizer.synthesize(&manifest, &output).await?;
    println!("{}", path.display());
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let registry = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for info in registry.check_all() {
        let status = if info.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, info.tool);

        if let Some(ref version) = info.version {
            print!(" ({})", version);
        }

        println!(" - {}", info.path.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}
