use crate::report::{run_report, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use impact_effects::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Impact Effects",
    about = "Serve or run the asteroid impact enrichment pipeline from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Enrich a single impact and print the assembled report
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_arguments_parse() {
        let cli = Cli::try_parse_from([
            "impact-effects-api",
            "report",
            "--latitude",
            "41.4769",
            "--longitude=-1.3742",
            "--destruction-km",
            "5",
            "--damage-km",
            "8",
            "--air-pressure-km",
            "12",
            "--energy-mt",
            "15",
            "--json",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Report(args)) => {
                assert_eq!(args.longitude, -1.3742);
                assert_eq!(args.air_pressure_km, 12.0);
                assert!(args.json);
                assert!(args.gazetteer.is_none());
            }
            other => panic!("expected report command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["impact-effects-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
