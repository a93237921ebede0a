//! `CS_LOGIN2` → `SC_LOGIN_ACK` + session state, or `SC_LOGIN_REJ`.
//!
//! A successful login is answered with four packets, in this order:
//!
//! ```text
//! SC_LOGIN_ACK       (empty)
//! SC_CONTACT_LIST2   empty list, group mask "us", contact mask "uussuus"
//! SC_MAILBOX_STATUS  0 unread
//! SC_USER_INFO       nickname, message counters, client endpoint
//! ```
//!
//! Clients expect the acknowledgement before the auxiliary state. Every
//! packet echoes the request's version and sequence number.

use std::net::SocketAddr;

use mrim_proto::{
    BinaryCursor, Opcode, Packet, PacketHeader, Payload,
    payloads::{ContactList, Login, MailboxStatus, UserInfo},
};

use super::{CommandError, CommandOutcome};
use crate::auth::{Authenticator, UserRecord};

/// Check credentials and build the login response.
///
/// Bad credentials are an ordinary outcome (a single `SC_LOGIN_REJ`), not an
/// error.
///
/// # Errors
///
/// - `CommandError::MissingPayload` if the request has no body
/// - `CommandError::Protocol` if the body is truncated
/// - `CommandError::Auth` if the user store fails
pub async fn execute<A: Authenticator>(
    request: &Packet,
    peer: SocketAddr,
    authenticator: &A,
) -> Result<CommandOutcome, CommandError> {
    let login = parse(request)?;

    let Some(user) = authenticator.login(login.localpart(), &login.password).await? else {
        return Ok(CommandOutcome::Respond(vec![Packet::reply(
            &request.header,
            Opcode::LoginRej,
            None,
        )]));
    };

    Ok(CommandOutcome::Respond(session_packets(&request.header, &user, peer)?))
}

fn parse(request: &Packet) -> Result<Login, CommandError> {
    let mut cursor = request
        .payload
        .as_ref()
        .map(|payload| BinaryCursor::from_bytes(payload.as_bytes()))
        .ok_or(CommandError::MissingPayload(Opcode::Login2))?;

    Ok(Login::decode(&mut cursor)?)
}

fn session_packets(
    request: &PacketHeader,
    user: &UserRecord,
    peer: SocketAddr,
) -> Result<Vec<Packet>, CommandError> {
    let endpoint = format!("{}:{}", peer.ip(), peer.port());

    Ok(vec![
        Payload::LoginAck.into_reply(request)?,
        Payload::ContactList(ContactList::empty()).into_reply(request)?,
        Payload::MailboxStatus(MailboxStatus::default()).into_reply(request)?,
        Payload::UserInfo(UserInfo::for_session(&user.localpart, &endpoint)).into_reply(request)?,
    ])
}

#[cfg(test)]
mod tests {
    use mrim_proto::ProtocolError;

    use super::*;
    use crate::{auth::PasswordAuthenticator, storage::MemoryUserStore};

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 5], 51234))
    }

    fn authenticator() -> PasswordAuthenticator<MemoryUserStore> {
        let auth = PasswordAuthenticator::new(MemoryUserStore::new());
        auth.register("alice", "secret").unwrap();
        auth
    }

    fn request(login: &str, password: &str) -> Packet {
        let body = Login {
            login: login.to_string(),
            password: password.to_string(),
            status: 1,
            user_agent: "client 1.0".to_string(),
        };
        let mut header = PacketHeader::new(Opcode::Login2);
        header.set_seq(3);
        Payload::Login(body).into_packet(header).unwrap()
    }

    #[tokio::test]
    async fn user_info_carries_nickname_and_endpoint() {
        let outcome = execute(&request("alice@mail.ru", "secret"), peer(), &authenticator())
            .await
            .unwrap();
        let CommandOutcome::Respond(packets) = outcome else {
            panic!("login must respond");
        };

        let Payload::UserInfo(info) = Payload::from_packet(packets[3].clone()).unwrap() else {
            panic!("fourth packet must be user info");
        };
        assert_eq!(info.get(UserInfo::NICKNAME), Some("alice"));
        assert_eq!(info.get(UserInfo::CLIENT_ENDPOINT), Some("10.0.0.5:51234"));
        assert_eq!(info.get(UserInfo::MESSAGES_UNREAD), Some(""));
    }

    #[tokio::test]
    async fn login_without_domain_uses_whole_login() {
        let outcome =
            execute(&request("alice", "secret"), peer(), &authenticator()).await.unwrap();
        let CommandOutcome::Respond(packets) = outcome else {
            panic!("login must respond");
        };
        assert_eq!(packets[0].opcode(), Some(Opcode::LoginAck));
    }

    #[tokio::test]
    async fn missing_payload_is_an_error() {
        let bare = Packet::new(PacketHeader::new(Opcode::Login2), None);
        assert_eq!(
            execute(&bare, peer(), &authenticator()).await,
            Err(CommandError::MissingPayload(Opcode::Login2))
        );
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let mut payload = BinaryCursor::new();
        payload.write_string("alice").unwrap();
        let truncated = Packet::new(PacketHeader::new(Opcode::Login2), Some(payload));

        assert!(matches!(
            execute(&truncated, peer(), &authenticator()).await,
            Err(CommandError::Protocol(ProtocolError::UnexpectedEnd { .. }))
        ));
    }
}
