use smokeprobe::configuration::get_configuration;
use smokeprobe::runner::{Suite, run_suites};
use smokeprobe::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("smokeprobe".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().expect("Failed to read configuration.");

    // Suites named on the command line, or all of them.
    let mut suites = Vec::new();
    for argument in std::env::args().skip(1) {
        let suite: Suite = argument.parse().map_err(anyhow::Error::msg)?;
        suites.push(suite);
    }
    if suites.is_empty() {
        suites = Suite::all();
    }

    let outcomes = run_suites(&suites, &settings).await;
    let failed = outcomes.iter().filter(|o| !o.passed()).count();
    tracing::info!(
        total = outcomes.len(),
        passed = outcomes.len() - failed,
        failed,
        "Probe run finished"
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
