use snatcharr::{load_config, run};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(std::path::PathBuf::from);
    let config = load_config(config_path.as_deref())?;
    let worker_threads = config.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run())
}
