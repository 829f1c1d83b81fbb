use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

#[test]
fn length_prefix_is_little_endian() {
    let length: u32 = 1234;
    let bytes = length.to_le_bytes();

    assert_eq!(bytes[0], (length & 0xFF) as u8);
    assert_eq!(bytes[1], ((length >> 8) & 0xFF) as u8);
    assert_eq!(bytes[2], ((length >> 16) & 0xFF) as u8);
    assert_eq!(bytes[3], ((length >> 24) & 0xFF) as u8);

    assert_eq!(u32::from_le_bytes(bytes), length);
}

#[test]
fn frame_layout_is_length_then_body() {
    let message = serde_json::json!({"headers": {"service": "mode", "method": "read"}});
    let body = serde_json::to_vec(&message).unwrap();
    let length_bytes = (body.len() as u32).to_le_bytes();

    let mut frame = Vec::new();
    frame.extend_from_slice(&length_bytes);
    frame.extend_from_slice(&body);

    assert_eq!(frame.len(), 4 + body.len());
    assert_eq!(&frame[0..4], &length_bytes);
    assert_eq!(&frame[4..], &body);
}

#[tokio::test]
async fn pipe_sender_writes_framed_messages() {
    let (mut our_read, their_write) = tokio::io::duplex(1024);
    let (their_read, _our_write) = tokio::io::duplex(1024);

    let (transport, _rx) = PipeTransport::new(their_write, their_read);
    let (mut sender, _receiver) = transport.into_parts();

    let message = serde_json::json!({
        "headers": {"service": "mode", "method": "save"},
        "payload": {"domain": "example.com"}
    });

    sender.send(message.clone()).await.unwrap();

    let mut length_buf = [0u8; 4];
    our_read.read_exact(&mut length_buf).await.unwrap();
    let length = u32::from_le_bytes(length_buf) as usize;

    let mut body = vec![0u8; length];
    our_read.read_exact(&mut body).await.unwrap();

    let received: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(received, message);
}

#[tokio::test]
async fn pipe_receiver_delivers_messages_in_order() {
    let (_their_read, their_write) = tokio::io::duplex(4096);
    let (our_read, mut our_write) = tokio::io::duplex(4096);

    let (transport, mut rx) = PipeTransport::new(their_write, our_read);
    let (_sender, mut receiver) = transport.into_parts();

    let read_task = tokio::spawn(async move { receiver.run().await });

    let messages = vec![
        serde_json::json!({"headers": {"service": "mode", "method": "read"}, "payload": 1}),
        serde_json::json!({"headers": {"service": "mode", "method": "read"}, "payload": 2}),
        serde_json::json!({"headers": {"service": "mode", "method": "read"}, "payload": 3}),
    ];

    for message in &messages {
        let body = serde_json::to_vec(message).unwrap();
        our_write
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        our_write.write_all(&body).await.unwrap();
    }

    for expected in &messages {
        let received = rx.recv().await.unwrap();
        assert_eq!(&received, expected);
    }

    // Closing the pipe ends the read loop cleanly.
    drop(our_write);
    read_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn pipe_receiver_stops_when_consumer_drops() {
    let (_their_read, their_write) = tokio::io::duplex(1024);
    let (our_read, mut our_write) = tokio::io::duplex(1024);

    let (transport, rx) = PipeTransport::new(their_write, our_read);
    let (_sender, mut receiver) = transport.into_parts();

    drop(rx);

    let read_task = tokio::spawn(async move { receiver.run().await });

    let body = serde_json::to_vec(&serde_json::json!({"payload": null})).unwrap();
    our_write
        .write_all(&(body.len() as u32).to_le_bytes())
        .await
        .unwrap();
    our_write.write_all(&body).await.unwrap();

    read_task.await.unwrap().unwrap();
}
