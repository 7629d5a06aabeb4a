//! Command line surface for the `valuation` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::error::AppError;
use crate::form::AppraisalForm;
use crate::providers::{
    AnalysisClient, AppraisalEvent, ValoraClient, ValuationClient, ValuationProvider,
    demo_valuation,
};
use crate::report::{ReportContext, render_report};
use crate::valuation::Valuation;

#[derive(Parser)]
#[command(
    name = "valuation",
    version,
    about = "Property valuation client and report generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Appraise a property from a saved wizard form
    Appraise(AppraiseArgs),

    /// Render a complete demo report from the built-in sample form
    Demo {
        /// Where to write the PDF report
        #[arg(long, default_value = "demo-report.pdf")]
        output: PathBuf,
    },

    /// Write a starter form to fill in
    InitForm {
        /// Where to write the form JSON
        #[arg(long, default_value = "form.json")]
        output: PathBuf,
    },
}

#[derive(Args)]
pub struct AppraiseArgs {
    /// Path to the form JSON
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the PDF report
    #[arg(long, default_value = "report.pdf")]
    pub output: PathBuf,

    /// Which valuation service to call
    #[arg(long, value_enum, default_value_t = ProviderKind::Analysis)]
    pub provider: ProviderKind,

    /// Stream progress events while the backend works
    #[arg(long)]
    pub stream: bool,

    /// Print the valuation as JSON instead of rendering a report
    #[arg(long)]
    pub json: bool,

    /// Use the built-in demo model without calling any backend
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Analysis,
    Valora,
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Appraise(args) => appraise(config, args).await,
        Command::Demo { output } => render_demo(&config, &output),
        Command::InitForm { output } => init_form(&output),
    }
}

async fn appraise(mut config: Config, args: AppraiseArgs) -> anyhow::Result<()> {
    if args.demo {
        config.demo_mode = true;
    }

    let form = load_form(&args.input)?;

    // Demo mode builds no provider; missing credentials must not block it.
    let valuation = if config.demo_mode {
        form.ensure_valid()?;
        tracing::info!("demo mode is on, skipping the backend");
        demo_valuation(&form, Utc::now().date_naive())
    } else {
        let provider: Arc<dyn ValuationProvider> = match args.provider {
            ProviderKind::Analysis => Arc::new(AnalysisClient::new(&config)),
            ProviderKind::Valora => Arc::new(ValoraClient::from_config(&config)?),
        };
        let client = ValuationClient::new(provider, config.clone());

        if args.stream {
            client.appraise_streamed(&form, print_event).await?
        } else {
            client.appraise(&form).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&valuation)?);
        return Ok(());
    }

    write_report(form, valuation, &config, &args.output)
}

fn render_demo(config: &Config, output: &Path) -> anyhow::Result<()> {
    let form = AppraisalForm::sample();
    let valuation = demo_valuation(&form, Utc::now().date_naive());
    write_report(form, valuation, config, output)
}

fn init_form(output: &Path) -> anyhow::Result<()> {
    let form = AppraisalForm::sample();
    let body = serde_json::to_string_pretty(&form)?;
    fs::write(output, body)
        .with_context(|| format!("could not write form to {}", output.display()))?;
    println!("Starter form written to {}", output.display());
    Ok(())
}

fn load_form(path: &Path) -> anyhow::Result<AppraisalForm> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read form at {}", path.display()))?;
    let form = serde_json::from_str(&raw).map_err(|e| {
        AppError::Decode(format!("form at {} is not valid JSON: {e}", path.display()))
    })?;
    Ok(form)
}

fn write_report(
    form: AppraisalForm,
    valuation: Valuation,
    config: &Config,
    output: &Path,
) -> anyhow::Result<()> {
    let ctx = ReportContext::new(form, valuation, config.prepared_by.clone());
    let bytes = render_report(&ctx)?;
    fs::write(output, &bytes)
        .with_context(|| format!("could not write report to {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        bytes = bytes.len(),
        reference = %ctx.reference,
        "report written"
    );
    println!("Report written to {}", output.display());
    Ok(())
}

fn print_event(event: &AppraisalEvent) {
    match event {
        AppraisalEvent::Queued { position } => println!("Queued at position {position}"),
        AppraisalEvent::Progress { stage, percent } => println!("{stage}... {percent}%"),
        AppraisalEvent::Comparable(comparable) => println!("Comparable found: {}", comparable.label),
        AppraisalEvent::Completed(_) => println!("Valuation complete"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_appraise_flags() {
        let cli = Cli::try_parse_from([
            "valuation", "appraise", "--input", "my-form.json", "--provider", "valora",
            "--stream",
        ])
        .unwrap();

        match cli.command {
            Command::Appraise(args) => {
                assert_eq!(args.input, PathBuf::from("my-form.json"));
                assert_eq!(args.output, PathBuf::from("report.pdf"));
                assert_eq!(args.provider, ProviderKind::Valora);
                assert!(args.stream);
                assert!(!args.json);
                assert!(!args.demo);
            }
            _ => panic!("expected the appraise subcommand"),
        }
    }

    #[test]
    fn test_appraise_requires_input() {
        assert!(Cli::try_parse_from(["valuation", "appraise"]).is_err());
    }

    #[test]
    fn test_parse_demo_defaults() {
        let cli = Cli::try_parse_from(["valuation", "demo"]).unwrap();
        match cli.command {
            Command::Demo { output } => assert_eq!(output, PathBuf::from("demo-report.pdf")),
            _ => panic!("expected the demo subcommand"),
        }
    }

    #[test]
    fn test_init_form_subcommand_name_is_kebab_case() {
        let cli = Cli::try_parse_from(["valuation", "init-form", "--output", "start.json"]).unwrap();
        match cli.command {
            Command::InitForm { output } => assert_eq!(output, PathBuf::from("start.json")),
            _ => panic!("expected the init-form subcommand"),
        }
    }
}
