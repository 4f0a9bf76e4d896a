// src/main.rs

use omegafold_task::{Completion, cli, logging, run};

/// Exit code when `--strict` is set and the prediction failed.
const PREDICTION_FAILED_EXIT: i32 = 2;

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("omegafold-task error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let strict = args.strict;

    match run(args).await? {
        Completion::Finished(result) if strict && !result.status.is_success() => {
            Ok(PREDICTION_FAILED_EXIT)
        }
        _ => Ok(0),
    }
}
