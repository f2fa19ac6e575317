use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use healthgenie::bmi::{self, BmiResult, HeightUnit, WeightUnit};
use healthgenie::config::{ProviderArgs, ProviderConfig, ServeArgs, ServeConfig};
use healthgenie::gemini::GeminiClient;
use healthgenie::{web_server, AdviceRequester};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct MeasurementArgs {
    #[arg(long, help = "Body height.")]
    height: f64,
    #[arg(long, value_enum, default_value_t = HeightUnit::Centimeters)]
    height_unit: HeightUnit,
    #[arg(long, help = "Body weight.")]
    weight: f64,
    #[arg(long, value_enum, default_value_t = WeightUnit::Kilograms)]
    weight_unit: WeightUnit,
}

impl MeasurementArgs {
    fn evaluate(&self) -> Result<BmiResult> {
        bmi::evaluate(self.height, self.height_unit, self.weight, self.weight_unit)
            .context("Could not calculate BMI")
    }
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HealthGenie web server.
    Serve {
        #[command(flatten)]
        serve: ServeArgs,
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Calculate BMI and print the category.
    Bmi {
        #[command(flatten)]
        measurement: MeasurementArgs,
    },
    /// Calculate BMI and ask the model for diet and fitness advice.
    Advise {
        #[command(flatten)]
        measurement: MeasurementArgs,
        #[arg(long, help = "Question for the advisor (defaults to general diet and fitness tips).")]
        question: Option<String>,
        #[command(flatten)]
        provider: ProviderArgs,
    },
}

fn build_requester(args: ProviderArgs) -> Result<AdviceRequester> {
    let config = ProviderConfig::try_from(args).context("Invalid provider configuration")?;
    info!(model = %config.model, api_url = %config.api_url, timeout = ?config.timeout, "Provider configured");
    let client = GeminiClient::new(&config).context("Failed to initialize Gemini client")?;
    if !client.has_api_key() {
        warn!("API key not found; advice requests will fail until GOOGLE_API_KEY is set");
    }
    Ok(AdviceRequester::new(Arc::new(client), config.timeout))
}

fn print_bmi(result: &BmiResult) {
    println!("BMI: {}", result);
    println!("{}: {}", result.category.range(), result.category.wellness_message());
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,healthgenie=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { serve, provider } => {
            let serve_config = ServeConfig::try_from(serve).context("Invalid server configuration")?;
            let requester = build_requester(provider)?;
            info!("Starting HealthGenie on {}...", serve_config.addr);

            let mut web_server_handle =
                tokio::spawn(web_server::start_web_server(serve_config, requester));

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => anyhow::bail!("Web server stopped unexpectedly"),
                        Ok(Err(e)) => {
                            error!("Web server failed: {:?}", e);
                            return Err(e);
                        }
                        Err(e) if e.is_panic() => anyhow::bail!("Web server task panicked: {}", e),
                        Err(e) => anyhow::bail!("Web server task failed: {}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Bmi { measurement } => {
            print_bmi(&measurement.evaluate()?);
        }
        Commands::Advise {
            measurement,
            question,
            provider,
        } => {
            let result = measurement.evaluate()?;
            let requester = build_requester(provider)?;
            print_bmi(&result);

            let advice = requester
                .request_advice(&result, question.as_deref())
                .await
                .context("Response failed")?;
            println!();
            println!("{}", advice.text);
        }
    }

    Ok(())
}
