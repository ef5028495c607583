//! Open/write/read/close round-trip against a real file, exercising the
//! `io_uring` submission path end to end rather than just the scheduler.

use rocket_io::Executor;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn writes_then_reads_back_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.txt");
    let path_for_fiber = path.clone();

    let outcome = Rc::new(RefCell::new(None));
    let outcome_in_fiber = outcome.clone();

    let mut executor = Executor::new(32).unwrap();
    executor
        .submit(move || {
            let fd = rocket_io::openat_await(
                libc::AT_FDCWD,
                &path_for_fiber,
                libc::O_RDWR | libc::O_CREAT,
                0o600,
            )
            .unwrap();
            assert!(fd >= 0, "open failed: {fd}");

            let written = rocket_io::write_at_await(fd, b"hello fiber", 0);
            assert_eq!(written, 11);

            let mut buf = [0u8; 11];
            let read = rocket_io::read_at_await(fd, &mut buf, 0);
            assert_eq!(read, 11);

            let close_result = rocket_io::close_await(fd);
            assert_eq!(close_result, 0);

            *outcome_in_fiber.borrow_mut() = Some(buf);
        })
        .unwrap();
    executor.execute().unwrap();

    assert_eq!(outcome.borrow().unwrap(), *b"hello fiber");
    assert_eq!(std::fs::read(&path).unwrap(), b"hello fiber");
}

#[test]
fn reports_negative_errno_for_a_missing_file() {
    let result = Rc::new(RefCell::new(0));
    let result_in_fiber = result.clone();

    let mut executor = Executor::new(32).unwrap();
    executor
        .submit(move || {
            let fd = rocket_io::openat_await(
                libc::AT_FDCWD,
                std::path::Path::new("/nonexistent/rocket-io-test-path"),
                libc::O_RDONLY,
                0,
            )
            .unwrap();
            *result_in_fiber.borrow_mut() = fd;
        })
        .unwrap();
    executor.execute().unwrap();

    assert_eq!(*result.borrow(), -libc::ENOENT);
}

#[test]
fn many_fibers_can_have_files_open_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let completed = Rc::new(RefCell::new(0));

    let mut executor = Executor::new(64).unwrap();
    for i in 0..16 {
        let path = dir.path().join(format!("file-{i}.txt"));
        let completed = completed.clone();
        executor
            .submit(move || {
                let fd = rocket_io::openat_await(
                    libc::AT_FDCWD,
                    &path,
                    libc::O_RDWR | libc::O_CREAT,
                    0o600,
                )
                .unwrap();
                assert!(fd >= 0);
                let payload = format!("fiber {i}");
                let n = rocket_io::write_at_await(fd, payload.as_bytes(), 0);
                assert_eq!(n as usize, payload.len());
                assert_eq!(rocket_io::close_await(fd), 0);
                *completed.borrow_mut() += 1;
            })
            .unwrap();
    }
    executor.execute().unwrap();

    assert_eq!(*completed.borrow(), 16);
}
