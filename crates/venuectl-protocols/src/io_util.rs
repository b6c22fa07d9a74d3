use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use venuectl_commons::{classify_io_error, ErrorKind};

/// Connects with a deadline, classifying both the timeout and the
/// underlying I/O error into the closed `ErrorKind` set (spec §7).
pub async fn connect(ip: &str, port: u16, deadline: Duration) -> Result<TcpStream, ErrorKind> {
    let addr = format!("{ip}:{port}");
    match timeout(deadline, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(classify_io_error(&e)),
        Err(_) => Err(ErrorKind::Timeout),
    }
}

/// Sends `payload` with a deadline, classifying failures the same way.
pub async fn send(stream: &mut TcpStream, payload: &[u8], deadline: Duration) -> Result<(), ErrorKind> {
    match timeout(deadline, stream.write_all(payload)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(classify_io_error(&e)),
        Err(_) => Err(ErrorKind::Timeout),
    }
}

/// Reads up to `max_bytes` with a deadline. An elapsed deadline with zero
/// bytes read is reported as an empty read (`Ok(Vec::new())`), not an
/// error — many adapters treat a silent device as a success (spec §4.B).
pub async fn read_best_effort(stream: &mut TcpStream, max_bytes: usize, deadline: Duration) -> Vec<u8> {
    let mut buf = vec![0u8; max_bytes];
    match timeout(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) => buf[..n].to_vec(),
        Ok(Err(_)) | Err(_) => Vec::new(),
    }
}

/// Reads one `\n`-terminated line (or until `}` if no newline arrives) with
/// a deadline, used by the JSON-RPC adapter (spec §4.B).
pub async fn read_line_best_effort(stream: &mut TcpStream, deadline: Duration) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    let read_fut = async {
        loop {
            match stream.read(&mut byte).await {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buf.push(byte[0]);
                    if byte[0] == b'}' {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    };
    let _ = timeout(deadline, read_fut).await;
    buf
}
