use clap::Parser;
use log::error;
use mapula::cli::{Args, Commands};
use mapula::config::RunConfig;
use mapula::helper::resolver::UnknownReferencePolicy;
use mapula::pipelines::aggregate::{aggregate, merged_snapshot_path};
use mapula::pipelines::count::count;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Count {
            input,
            refs,
            exp,
            json,
            format,
            no_fallback,
        } => {
            let config = RunConfig {
                reference_files: refs,
                expected_counts: exp,
                unknown_reference_policy: if no_fallback {
                    UnknownReferencePolicy::Fail
                } else {
                    UnknownReferencePolicy::Fallback
                },
                inputs: input,
            };
            count(&config, &json, format).map(|_| ())
        }
        Commands::Aggregate {
            json,
            refs,
            exp,
            output,
            format,
        } => aggregate(
            &json,
            &refs,
            exp.as_deref(),
            &merged_snapshot_path(&output),
            format,
        )
        .map(|_| ()),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
