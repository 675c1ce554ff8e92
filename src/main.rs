//! `loan-eligibility` entry point.
//!
//! - `serve`: load the artifact bundle and serve the applicant form over HTTP.
//! - `predict`: one-shot prediction from `--field key=value` pairs.
//! - `schema`: print the feature layout the classifier expects.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use loan_eligibility::api::{FormServer, FormSpec};
use loan_eligibility::common::config::{AppCfg, ArtifactArgs, LogFormat};
use loan_eligibility::common::log;
use loan_eligibility::model::{load_bundle, FsArtifactRepo};
use loan_eligibility::{EligibilityResult, Predictor, RawInput};

#[derive(Parser, Debug)]
#[command(version, about = "Loan eligibility predictions from a pre-trained classifier")]
struct Cli {
    /// Log line format on stderr.
    #[arg(
        long = "log-format",
        value_enum,
        default_value_t = LogFormat::Text,
        env = "LOAN_ELIGIBILITY_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the applicant form, one request at a time.
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Address to listen on.
        #[arg(long, env = "LOAN_ELIGIBILITY_BIND")]
        bind: Option<String>,
    },
    /// Predict eligibility for a single applicant.
    Predict {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Applicant attribute as `name=value`; repeat for each field.
        #[arg(long = "field", short = 'f', value_name = "NAME=VALUE")]
        fields: Vec<String>,

        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the expected feature schema.
    Schema {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
}

fn load_predictor(cfg: &AppCfg) -> EligibilityResult<Predictor> {
    let repo = FsArtifactRepo::new(cfg);
    Ok(Predictor::new(load_bundle(&repo)?))
}

fn run(cli: Cli) -> EligibilityResult<()> {
    match cli.command {
        Command::Serve { artifacts, bind } => {
            let cfg = AppCfg::from_args(artifacts, bind, cli.log_format)?;
            let predictor = load_predictor(&cfg)?;
            let server = FormServer::bind(&cfg.bind, predictor, FormSpec::loan_application())?;
            server.run()
        }
        Command::Predict {
            artifacts,
            fields,
            json,
        } => {
            let cfg = AppCfg::from_args(artifacts, None, cli.log_format)?;
            let predictor = load_predictor(&cfg)?;
            let input = RawInput::from_pairs(fields.iter().map(String::as_str))?;
            let result = predictor.predict(&input)?;
            if json {
                let out = serde_json::to_string_pretty(&result)
                    .map_err(|e| loan_eligibility::EligibilityError::inference(e.to_string()))?;
                println!("{out}");
            } else {
                println!("Statut prédit : {}", result.verdict);
                if let Some(pct) = result.probability_percent() {
                    println!("Probabilité : {pct:.1} %");
                }
                for warning in &result.warnings {
                    println!("Avertissement : {warning}");
                }
            }
            Ok(())
        }
        Command::Schema { artifacts } => {
            let cfg = AppCfg::from_args(artifacts, None, cli.log_format)?;
            let predictor = load_predictor(&cfg)?;
            let meta = predictor.metadata();
            println!(
                "{} {} ({}, {} features)",
                meta.model_id,
                meta.model_version.as_str(),
                meta.kind.as_str(),
                meta.n_features
            );
            for (idx, name) in predictor.schema().names().iter().enumerate() {
                println!("{idx:>3}  {name}");
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    log::init(cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code().as_str(), fatal = err.is_fatal(), "{err}");
            eprintln!("Erreur : {err}");
            ExitCode::from(err.code() as u8)
        }
    }
}
