//! Command executor behavior tests
//!
//! Drives the executor directly with decoded packets and checks the exact
//! responses for each built-in command.

use std::{net::SocketAddr, sync::Arc};

use mrim_core::Connection;
use mrim_proto::{
    Opcode, Packet, PacketHeader, Payload, ProtocolVersion,
    payloads::{ContactList, HelloAck, Login, MailboxStatus},
};
use mrim_server::{
    CommandExecutor, Execution, MemoryUserStore, PasswordAuthenticator, RejectReason,
    commands::{Command, CommandError},
};

type TestExecutor = CommandExecutor<PasswordAuthenticator<MemoryUserStore>>;

fn executor() -> TestExecutor {
    let auth = PasswordAuthenticator::new(MemoryUserStore::new());
    auth.register("alice", "secret").unwrap();
    CommandExecutor::new(auth, 10)
}

fn connection() -> Connection {
    Connection::new(1, SocketAddr::from(([192, 168, 1, 20], 40001)))
}

fn header(opcode: Opcode, seq: u32) -> PacketHeader {
    let mut header = PacketHeader::new(opcode);
    header.set_seq(seq);
    header
}

fn login_request(seq: u32, login: &str, password: &str) -> Packet {
    let body = Login {
        login: login.to_string(),
        password: password.to_string(),
        status: 1,
        user_agent: "Mail.Ru Agent".to_string(),
    };
    Payload::Login(body).into_packet(header(Opcode::Login2, seq)).unwrap()
}

fn responses(execution: Execution) -> Vec<Packet> {
    match execution {
        Execution::Respond(packets) => packets,
        other => panic!("expected a response, got {other:?}"),
    }
}

#[tokio::test]
async fn hello_acknowledges_with_ping_interval() {
    let request = Packet::new(header(Opcode::Hello, 42), None);
    let packets = responses(executor().execute(&request, &connection()).await);

    assert_eq!(packets.len(), 1);
    let ack = &packets[0];
    assert_eq!(ack.opcode(), Some(Opcode::HelloAck));
    assert_eq!(ack.header.seq(), 42);
    assert_eq!(ack.header.version(), ProtocolVersion::DEFAULT);
    assert_eq!(ack.payload_bytes(), 10u32.to_le_bytes());
    assert_eq!(
        Payload::from_packet(ack.clone()).unwrap(),
        Payload::HelloAck(HelloAck { ping_interval_secs: 10 })
    );
}

#[tokio::test]
async fn ping_has_no_response() {
    let request = Packet::new(header(Opcode::Ping, 5), None);
    assert_eq!(executor().execute(&request, &connection()).await, Execution::NoResponse);
}

#[tokio::test]
async fn login_success_sends_four_packets_in_order() {
    let request = login_request(77, "alice@mail.ru", "secret");
    let packets = responses(executor().execute(&request, &connection()).await);

    let opcodes: Vec<_> = packets.iter().map(Packet::opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            Some(Opcode::LoginAck),
            Some(Opcode::ContactList2),
            Some(Opcode::MailboxStatus),
            Some(Opcode::UserInfo),
        ]
    );
    assert!(packets.iter().all(|packet| packet.header.seq() == 77));
    assert!(packets[0].payload.is_none());

    assert_eq!(
        Payload::from_packet(packets[1].clone()).unwrap(),
        Payload::ContactList(ContactList::empty())
    );
    assert_eq!(
        Payload::from_packet(packets[2].clone()).unwrap(),
        Payload::MailboxStatus(MailboxStatus { unread: 0 })
    );
}

#[tokio::test]
async fn login_user_info_describes_session() {
    let request = login_request(1, "alice@mail.ru", "secret");
    let packets = responses(executor().execute(&request, &connection()).await);

    let Payload::UserInfo(info) = Payload::from_packet(packets[3].clone()).unwrap() else {
        panic!("fourth packet must be user info");
    };
    let keys: Vec<_> = info.entries().iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["MRIM.NICKNAME", "MESSAGES.TOTAL", "MESSAGES.UNREAD", "client.endpoint"]);
    assert_eq!(info.get("MRIM.NICKNAME"), Some("alice"));
    assert_eq!(info.get("client.endpoint"), Some("192.168.1.20:40001"));
}

#[tokio::test]
async fn login_failure_sends_single_reject() {
    let request = login_request(78, "alice@mail.ru", "wrong");
    let packets = responses(executor().execute(&request, &connection()).await);

    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].opcode(), Some(Opcode::LoginRej));
    assert_eq!(packets[0].header.seq(), 78);
    assert!(packets[0].payload_bytes().is_empty());
}

#[tokio::test]
async fn unknown_user_is_rejected_like_wrong_password() {
    let request = login_request(3, "bob@mail.ru", "secret");
    let packets = responses(executor().execute(&request, &connection()).await);

    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].opcode(), Some(Opcode::LoginRej));
}

#[tokio::test]
async fn unknown_opcode_is_rejected() {
    let mut unknown = header(Opcode::Ping, 1);
    unknown.set_command(0x10ff);

    assert_eq!(
        executor().execute(&Packet::new(unknown, None), &connection()).await,
        Execution::Reject(RejectReason::UnknownCommand(0x10ff))
    );
}

#[tokio::test]
async fn server_opcode_from_client_is_rejected() {
    let request = Packet::new(header(Opcode::HelloAck, 1), None);

    assert_eq!(
        executor().execute(&request, &connection()).await,
        Execution::Reject(RejectReason::UnknownCommand(0x1002))
    );
}

#[tokio::test]
async fn handler_error_becomes_reject() {
    let request = Packet::new(header(Opcode::Login2, 4), None);

    assert_eq!(
        executor().execute(&request, &connection()).await,
        Execution::Reject(RejectReason::HandlerFailed {
            command: Command::Login,
            error: CommandError::MissingPayload(Opcode::Login2),
        })
    );
}

#[tokio::test]
async fn executor_is_shared_across_connections() {
    let executor = Arc::new(executor());
    let request = login_request(1, "alice", "secret");

    let first = Connection::new(1, SocketAddr::from(([127, 0, 0, 1], 1000)));
    let second = Connection::new(2, SocketAddr::from(([127, 0, 0, 1], 2000)));

    let (a, b) =
        tokio::join!(executor.execute(&request, &first), executor.execute(&request, &second));
    assert_eq!(responses(a).len(), 4);
    assert_eq!(responses(b).len(), 4);
}
