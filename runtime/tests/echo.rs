//! A minimal accept/recv/send echo round-trip, driven by a real client on a
//! separate OS thread while the fiber-based server runs on the executor's
//! single thread.

use rocket_io::Executor;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;

#[test]
fn echoes_one_message_back_to_a_real_client() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let listener_fd = listener.as_raw_fd();

    let client = std::thread::spawn(move || {
        let mut stream = loop {
            match std::net::TcpStream::connect(addr) {
                Ok(stream) => break stream,
                Err(_) => std::thread::yield_now(),
            }
        };
        stream.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    });

    let mut executor = Executor::new(32).unwrap();
    executor
        .submit(move || {
            let conn_fd = rocket_io::accept_await(
                listener_fd,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                0,
            );
            assert!(conn_fd >= 0, "accept failed: {conn_fd}");

            let mut buf = [0u8; 4];
            let n = rocket_io::recv_await(conn_fd, &mut buf, 0);
            assert_eq!(n, 4);

            let sent = rocket_io::send_await(conn_fd, &buf, 0);
            assert_eq!(sent, 4);

            assert_eq!(rocket_io::close_await(conn_fd), 0);
            // `listener` keeps the listening socket itself open for the
            // duration of the test; only the accepted connection is closed
            // here.
        })
        .unwrap();
    executor.execute().unwrap();

    client.join().unwrap();
}
