mod cli;

use vget_core::logging;

#[tokio::main]
async fn main() {
    // Logs go to a file so the terminal stays free for the progress
    // redraw; fall back to stderr if the state dir is unusable.
    if logging::init().is_err() {
        logging::init_stderr();
    }

    if let Err(err) = cli::run().await {
        eprintln!("vget error: {:#}", err);
        std::process::exit(1);
    }
}
