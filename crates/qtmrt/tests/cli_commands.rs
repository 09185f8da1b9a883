#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::Command;
use std::thread;

use bytes::BytesMut;
use qtmrt_frame::{encode_frame, Frame, FrameReader, PacketType};

fn write_text(stream: &mut TcpStream, packet_type: PacketType, text: &str) {
    let mut payload = text.as_bytes().to_vec();
    payload.push(0);
    let mut buf = BytesMut::new();
    encode_frame(packet_type.as_u32(), &payload, &mut buf).unwrap();
    stream.write_all(&buf).unwrap();
}

fn read_frame(stream: &mut TcpStream, reader: &mut FrameReader) -> Frame {
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "client closed before sending a frame");
        if let Some(frame) = reader.feed(&buf[..n]).unwrap().into_iter().next() {
            return frame;
        }
    }
}

/// Accepts one client, negotiates the version, then answers one command.
fn scripted_server(answer: &'static str) -> (u16, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = FrameReader::new();

        write_text(&mut stream, PacketType::Command, "QTM RT Interface connected");
        let version = read_frame(&mut stream, &mut reader);
        assert_eq!(&version.text_body()[..], b"version 1.23");
        write_text(&mut stream, PacketType::Command, "Version set to 1.23");

        let command = read_frame(&mut stream, &mut reader);
        write_text(&mut stream, PacketType::Command, answer);
        String::from_utf8(command.text_body().to_vec()).unwrap()
    });
    (port, handle)
}

#[test]
fn send_prints_the_answer_as_json() {
    let (port, server) = scripted_server("QTM Version is 2024.1");

    let output = Command::new(env!("CARGO_BIN_EXE_qtmrt"))
        .args(["--log-level", "error", "--format", "json", "send", "127.0.0.1"])
        .arg("qtmversion")
        .args(["--port", &port.to_string()])
        .output()
        .expect("send should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(payload["kind"], "command");
    assert_eq!(payload["text"], "QTM Version is 2024.1");
    assert_eq!(server.join().unwrap(), "qtmversion");
}

#[test]
fn refused_connection_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let output = Command::new(env!("CARGO_BIN_EXE_qtmrt"))
        .args(["send", "127.0.0.1", "qtmversion", "--port", &port.to_string()])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_qtmrt"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("qtmrt {}", env!("CARGO_PKG_VERSION")));
}
