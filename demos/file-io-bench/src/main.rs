//! Measures how many concurrent fibers it takes to saturate a fixed
//! `io_uring` queue depth with small writes, as a sanity check that the
//! scheduler and engine scale the way the design expects.

use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
struct Args {
    /// Number of fibers writing concurrently.
    #[arg(long, default_value_t = 64)]
    fibers: u32,

    /// Writes performed by each fiber.
    #[arg(long, default_value_t = 1000)]
    writes_per_fiber: u32,

    /// io_uring submission/completion queue depth.
    #[arg(long, default_value_t = rocket_io::DEFAULT_QUEUE_DEPTH)]
    queue_depth: u32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let dir = std::env::temp_dir().join(format!("rocket-io-bench-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("failed to create scratch directory");

    let total_writes = Arc::new(AtomicU64::new(0));
    let mut executor = rocket_io::Executor::new(args.queue_depth).expect("failed to create executor");

    let start = Instant::now();
    for i in 0..args.fibers {
        let path = dir.join(format!("bench-{i}.dat"));
        let total_writes = total_writes.clone();
        let writes_per_fiber = args.writes_per_fiber;
        executor
            .submit(move || {
                let fd = rocket_io::openat_await(
                    libc::AT_FDCWD,
                    &path,
                    libc::O_RDWR | libc::O_CREAT,
                    0o600,
                )
                .expect("path is not representable as a C string");
                assert!(fd >= 0, "open failed: {fd}");

                let payload = [0x42u8; 256];
                for w in 0..writes_per_fiber {
                    let offset = u64::from(w) * payload.len() as u64;
                    let n = rocket_io::write_at_await(fd, &payload, offset);
                    assert_eq!(n as usize, payload.len(), "write failed: {n}");
                    total_writes.fetch_add(1, Ordering::Relaxed);
                }
                rocket_io::close_await(fd);
            })
            .expect("failed to spawn fiber");
    }

    executor.execute().expect("executor loop failed");
    let elapsed = start.elapsed();

    let n = total_writes.load(Ordering::Relaxed);
    println!(
        "{} fibers x {} writes = {n} writes in {:.3}s ({:.0} writes/s)",
        args.fibers,
        args.writes_per_fiber,
        elapsed.as_secs_f64(),
        n as f64 / elapsed.as_secs_f64()
    );

    let _ = std::fs::remove_dir_all(&dir);
}
