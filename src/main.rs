use shopscout::{Config, run};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load errors are reported by `run`; the runtime only needs the thread count.
    let worker_threads = Config::load().unwrap_or_default().general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run())
}
