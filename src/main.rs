use docker_tag_finder::cli::{Args, Runner};
use docker_tag_finder::logging::init_tracing;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.verbose, args.debug);

    let runner = Runner::new(args);

    // Ctrl-C stops handing out new tags; in-flight lookups still finish.
    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    runner.run().await
}
