//! A TCP echo server built on `rocket-io`, one fiber per connection.

use clap::Parser;
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Parser)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:7070")]
    addr: String,

    /// io_uring submission/completion queue depth.
    #[arg(long, default_value_t = rocket_io::DEFAULT_QUEUE_DEPTH)]
    queue_depth: u32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.addr).expect("failed to bind listener");
    let listener_fd = listener.as_raw_fd();
    log::info!("listening on {}", args.addr);

    let mut executor = rocket_io::Executor::new(args.queue_depth).expect("failed to create executor");
    let connections = std::sync::Arc::new(AtomicU32::new(0));

    executor
        .submit(move || accept_loop(listener_fd, connections))
        .expect("failed to spawn accept loop");

    executor.execute().expect("executor loop failed");
}

fn accept_loop(listener_fd: i32, connections: std::sync::Arc<AtomicU32>) {
    loop {
        let conn_fd = rocket_io::accept_await(listener_fd, std::ptr::null_mut(), std::ptr::null_mut(), 0);
        if conn_fd < 0 {
            log::warn!("accept failed: {conn_fd}");
            continue;
        }

        let id = connections.fetch_add(1, Ordering::Relaxed);
        log::debug!("connection {id} accepted (fd {conn_fd})");
        if let Err(err) = rocket_io::spawn(move || echo_one(conn_fd, id)) {
            log::warn!("failed to spawn fiber for connection {id}: {err}");
        }
    }
}

fn echo_one(fd: i32, id: u32) {
    let mut buf = [0u8; 4096];
    loop {
        let n = rocket_io::recv_await(fd, &mut buf, 0);
        if n <= 0 {
            break;
        }
        let mut sent = 0usize;
        while sent < n as usize {
            let written = rocket_io::send_await(fd, &buf[sent..n as usize], 0);
            if written < 0 {
                log::warn!("connection {id}: send failed: {written}");
                break;
            }
            sent += written as usize;
        }
    }
    rocket_io::close_await(fd);
    log::debug!("connection {id} closed");
}
