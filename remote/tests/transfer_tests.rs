use anyhow::Result;
use tokio::io::AsyncWriteExt;

const CHUNK_SIZE: usize = 1024;

fn config() -> common::TransferConfig {
    common::TransferConfig {
        chunk_size: CHUNK_SIZE,
        ..Default::default()
    }
}

fn test_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

async fn write_source(dir: &std::path::Path, name: &str, len: usize) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, test_payload(len)).await?;
    Ok(path)
}

/// Accepts a single connection and runs one receiving session on it.
async fn accept_one(
    output_dir: &std::path::Path,
) -> Result<(
    std::net::SocketAddr,
    tokio::task::JoinHandle<Result<common::Summary, remote::SessionError>>,
)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let output_dir = output_dir.to_path_buf();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        remote::ConnectionSession::new(stream, &output_dir, &config())
            .run()
            .await
    });
    Ok((addr, handle))
}

async fn start_listener(output_dir: &std::path::Path) -> Result<std::net::SocketAddr> {
    let listener =
        remote::Listener::bind("127.0.0.1:0".parse()?, output_dir, config()).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(listener.run());
    Ok(addr)
}

/// The listener reports outcomes only through logs, so wait for the file to fill up.
async fn wait_for_contents(path: &std::path::Path, len: usize) -> Result<Vec<u8>> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        if let Ok(contents) = tokio::fs::read(path).await {
            if contents.len() == len {
                return Ok(contents);
            }
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("timed out waiting for {path:?} to reach {len} bytes");
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

async fn send(path: &std::path::Path, addr: std::net::SocketAddr) -> Result<common::Summary> {
    let session = remote::TransferSession::open(path, config()).await?;
    Ok(session.send("127.0.0.1", addr.port()).await?)
}

#[tokio::test]
async fn round_trip_preserves_contents() -> Result<()> {
    for len in [
        0,
        1,
        CHUNK_SIZE - 1,
        CHUNK_SIZE,
        CHUNK_SIZE + 1,
        3 * CHUNK_SIZE,
        3 * CHUNK_SIZE + 17,
    ] {
        let src_dir = tempfile::tempdir()?;
        let dst_dir = tempfile::tempdir()?;
        let src = write_source(src_dir.path(), "payload.bin", len).await?;
        let (addr, receiver) = accept_one(dst_dir.path()).await?;
        let sent = send(&src, addr).await?;
        let received = receiver.await??;
        assert_eq!(sent, received, "len {len}");
        assert_eq!(received.bytes_transferred, len as u64);
        let contents = tokio::fs::read(dst_dir.path().join("payload.bin")).await?;
        assert_eq!(contents, test_payload(len), "len {len}");
    }
    Ok(())
}

#[tokio::test]
async fn nested_source_path_arrives_under_base_name() -> Result<()> {
    let src_dir = tempfile::tempdir()?;
    let dst_dir = tempfile::tempdir()?;
    let nested = src_dir.path().join("a").join("b");
    tokio::fs::create_dir_all(&nested).await?;
    let src = write_source(&nested, "deep.txt", 100).await?;
    let (addr, receiver) = accept_one(dst_dir.path()).await?;
    send(&src, addr).await?;
    receiver.await??;
    assert_eq!(
        tokio::fs::read(dst_dir.path().join("deep.txt")).await?,
        test_payload(100)
    );
    Ok(())
}

#[tokio::test]
async fn sender_disconnecting_early_is_incomplete() -> Result<()> {
    let dst_dir = tempfile::tempdir()?;
    let (addr, receiver) = accept_one(dst_dir.path()).await?;
    {
        let mut stream = tokio::net::TcpStream::connect(addr).await?;
        stream.write_all(b"short.bin 100\n").await?;
        stream.write_all(&test_payload(40)).await?;
        stream.shutdown().await?;
    }
    let res = receiver.await?;
    assert!(
        matches!(
            res,
            Err(remote::SessionError::IncompleteTransfer {
                expected: 100,
                received: 40
            })
        ),
        "{res:?}"
    );
    assert_eq!(
        tokio::fs::read(dst_dir.path().join("short.bin")).await?,
        test_payload(40)
    );
    Ok(())
}

#[tokio::test]
async fn listener_runs_concurrent_sessions_independently() -> Result<()> {
    let src_dir = tempfile::tempdir()?;
    let dst_dir = tempfile::tempdir()?;
    let addr = start_listener(dst_dir.path()).await?;
    let first = write_source(src_dir.path(), "first.bin", 5 * CHUNK_SIZE + 3).await?;
    let second_path = src_dir.path().join("second.bin");
    let second_payload: Vec<u8> = test_payload(4 * CHUNK_SIZE).into_iter().rev().collect();
    tokio::fs::write(&second_path, &second_payload).await?;
    let (first_res, second_res) = tokio::join!(send(&first, addr), send(&second_path, addr));
    first_res?;
    second_res?;
    assert_eq!(
        wait_for_contents(&dst_dir.path().join("first.bin"), 5 * CHUNK_SIZE + 3).await?,
        test_payload(5 * CHUNK_SIZE + 3)
    );
    assert_eq!(
        wait_for_contents(&dst_dir.path().join("second.bin"), 4 * CHUNK_SIZE).await?,
        second_payload
    );
    Ok(())
}

#[tokio::test]
async fn listener_keeps_accepting_after_failed_session() -> Result<()> {
    let src_dir = tempfile::tempdir()?;
    let dst_dir = tempfile::tempdir()?;
    let addr = start_listener(dst_dir.path()).await?;
    {
        let mut stream = tokio::net::TcpStream::connect(addr).await?;
        stream.write_all(b"missing-size\n").await?;
        stream.shutdown().await?;
    }
    let src = write_source(src_dir.path(), "after.bin", 2 * CHUNK_SIZE).await?;
    send(&src, addr).await?;
    assert_eq!(
        wait_for_contents(&dst_dir.path().join("after.bin"), 2 * CHUNK_SIZE).await?,
        test_payload(2 * CHUNK_SIZE)
    );
    assert!(!dst_dir.path().join("missing-size").exists());
    Ok(())
}

#[tokio::test]
async fn binding_a_taken_port_fails() -> Result<()> {
    let dst_dir = tempfile::tempdir()?;
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let res = remote::Listener::bind(taken.local_addr()?, dst_dir.path(), config()).await;
    assert!(matches!(res, Err(remote::ListenError::Bind { .. })));
    Ok(())
}
