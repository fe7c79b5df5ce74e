//! End-to-end engine tests against an in-process server
//!
//! Drives a running engine through its public handle while playing the
//! server side of the wire protocol over a real TCP socket.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use palaver_engine::{EngineConfig, EngineHandle, EngineUpdate, Identity, SyncEngine};
use palaver_protocol::{
    Chat, ChatEvent, ChatMessage, ClientCommand, ClientPacket, ServerPacket, ServerPayload,
};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

struct ServerSide {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl ServerSide {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, listener.accept())
            .await
            .expect("timed out waiting for the engine to dial")
            .expect("accept failed");
        let (read, write) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    async fn read_line(&mut self) -> String {
        tokio::time::timeout(STEP_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a client frame")
            .expect("read failed")
            .expect("client closed the connection")
    }

    async fn expect_hello(&mut self, user_id: Uuid) {
        let line = self.read_line().await;
        let hello: serde_json::Value = serde_json::from_str(&line).expect("hello is not JSON");
        assert_eq!(hello["user_id"], user_id.to_string());
    }

    async fn read_packet(&mut self) -> ClientPacket {
        let line = self.read_line().await;
        serde_json::from_str(&line).expect("client frame is not a packet")
    }

    async fn send(&mut self, packet: &ServerPacket) {
        let mut frame = serde_json::to_vec(packet).unwrap();
        frame.push(b'\n');
        self.write.write_all(&frame).await.unwrap();
        self.write.flush().await.unwrap();
    }
}

async fn next_update(updates: &mut mpsc::Receiver<EngineUpdate>) -> EngineUpdate {
    tokio::time::timeout(STEP_TIMEOUT, updates.recv())
        .await
        .expect("timed out waiting for an engine update")
        .expect("engine dropped its update sender")
}

async fn start_engine() -> (TcpListener, EngineHandle, mpsc::Receiver<EngineUpdate>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = EngineConfig {
        endpoint: format!("tcp://127.0.0.1:{}", port),
        connect_delay_ms: 1,
        reconnect_delay_ms: 20,
        page_size: 5,
    };
    let (engine, handle, updates) = SyncEngine::new(config);
    tokio::spawn(engine.run());

    (listener, handle, updates)
}

fn chat(title: &str) -> Chat {
    Chat {
        id: Uuid::new_v4(),
        title: title.to_string(),
        owner_id: Uuid::new_v4(),
        last_message_text: None,
        members_count: 1,
    }
}

fn msg(chat_id: Uuid, id: &str, text: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        chat_id,
        dt: "2024-05-01T12:00:00Z".to_string(),
        text: text.to_string(),
        is_notification: false,
        sender_id: Some(Uuid::new_v4()),
        params: None,
        sender_name: None,
    }
}

#[tokio::test]
async fn full_session_flow() {
    let (listener, handle, mut updates) = start_engine().await;
    let user_id = Uuid::new_v4();

    handle.connect(Identity::UserId(user_id)).await.unwrap();
    let mut server = ServerSide::accept(&listener).await;
    server.expect_hello(user_id).await;

    // Bootstrap: roster request, then directory snapshot request
    let roster_req = server.read_packet().await;
    assert!(matches!(roster_req.data, ClientCommand::GetJoinedChats));
    let directory_req = server.read_packet().await;
    assert!(matches!(directory_req.data, ClientCommand::GetFirstCircleUpdates));
    assert!(directory_req.id > roster_req.id);

    // Serve the roster
    let general = chat("general");
    server
        .send(&ServerPacket {
            request_packet_id: Some(roster_req.id),
            data: ServerPayload::JoinedChatList {
                chats: vec![general.clone()],
            },
        })
        .await;
    assert_eq!(
        next_update(&mut updates).await,
        EngineUpdate::RosterChanged(vec![general.clone()])
    );

    // Selecting a chat with nothing loaded clears the snapshot and fetches
    handle.select_chat(general.clone()).await.unwrap();
    assert_eq!(
        next_update(&mut updates).await,
        EngineUpdate::SelectedChatChanged(Some(general.clone()))
    );
    assert_eq!(
        next_update(&mut updates).await,
        EngineUpdate::SelectedChatMessagesChanged(Vec::new())
    );

    let fetch = server.read_packet().await;
    match fetch.data {
        ClientCommand::GetMessages {
            chat_id,
            start_id,
            limit,
        } => {
            assert_eq!(chat_id, general.id);
            assert_eq!(start_id, None);
            assert_eq!(limit, Some(5));
        }
        other => panic!("expected GetMessages, got {:?}", other),
    }

    // Newest-first page; the engine reverses before merging
    server
        .send(&ServerPacket {
            request_packet_id: Some(fetch.id),
            data: ServerPayload::Messages {
                messages: vec![msg(general.id, "10", "latest"), msg(general.id, "9", "older")],
            },
        })
        .await;

    match next_update(&mut updates).await {
        EngineUpdate::RosterChanged(chats) => {
            assert_eq!(chats[0].last_message_text.as_deref(), Some("latest"));
        }
        other => panic!("expected RosterChanged, got {:?}", other),
    }
    match next_update(&mut updates).await {
        EngineUpdate::SelectedChatMessagesChanged(messages) => {
            let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids, vec!["9", "10"]);
        }
        other => panic!("expected SelectedChatMessagesChanged, got {:?}", other),
    }

    // Server pushes an event batch; the engine applies it all, then acks once
    server
        .send(&ServerPacket {
            request_packet_id: None,
            data: ServerPayload::EventList {
                events: vec![ChatEvent::Message {
                    message: msg(general.id, "11", "breaking news"),
                }],
            },
        })
        .await;

    match next_update(&mut updates).await {
        EngineUpdate::RosterChanged(chats) => {
            assert_eq!(chats[0].last_message_text.as_deref(), Some("breaking news"));
        }
        other => panic!("expected RosterChanged, got {:?}", other),
    }
    match next_update(&mut updates).await {
        EngineUpdate::SelectedChatMessagesChanged(messages) => {
            let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids, vec!["9", "10", "11"]);
        }
        other => panic!("expected SelectedChatMessagesChanged, got {:?}", other),
    }

    let ack = server.read_packet().await;
    assert!(matches!(ack.data, ClientCommand::AcknowledgeEvents));

    // Pagination uses the window's lower bound as the cursor
    handle.load_previous_messages(general.id).await.unwrap();
    let page_req = server.read_packet().await;
    match page_req.data {
        ClientCommand::GetMessages { start_id, .. } => assert_eq!(start_id, Some(9)),
        other => panic!("expected GetMessages, got {:?}", other),
    }

    handle.disconnect().await.unwrap();
}

#[tokio::test]
async fn send_message_carries_the_connected_user() {
    let (listener, handle, _updates) = start_engine().await;
    let user_id = Uuid::new_v4();

    handle.connect(Identity::UserId(user_id)).await.unwrap();
    let mut server = ServerSide::accept(&listener).await;
    server.expect_hello(user_id).await;
    let _roster_req = server.read_packet().await;
    let _directory_req = server.read_packet().await;

    let chat_id = Uuid::new_v4();
    handle.send_message("hello there", chat_id).await.unwrap();

    let packet = server.read_packet().await;
    match packet.data {
        ClientCommand::SendMessage { message } => {
            assert_eq!(message.chat_id, chat_id);
            assert_eq!(message.text, "hello there");
            assert_eq!(message.sender_id, user_id);
            assert!(!message.is_notification);
        }
        other => panic!("expected SendMessage, got {:?}", other),
    }
}

#[tokio::test]
async fn commands_before_connecting_are_dropped_not_fatal() {
    let (_listener, handle, mut updates) = start_engine().await;

    // None of these may panic or produce updates; they log and no-op
    handle.send_message("into the void", Uuid::new_v4()).await.unwrap();
    handle.edit_message("5", "new text").await.unwrap();
    handle.search_users("jo").await.unwrap();
    handle.load_previous_messages(Uuid::new_v4()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn reconnect_rebootstraps_and_refetches_selected_chat() {
    let (listener, handle, mut updates) = start_engine().await;
    let user_id = Uuid::new_v4();

    handle.connect(Identity::UserId(user_id)).await.unwrap();
    let mut server = ServerSide::accept(&listener).await;
    server.expect_hello(user_id).await;
    let roster_req = server.read_packet().await;
    let _directory_req = server.read_packet().await;

    let general = chat("general");
    server
        .send(&ServerPacket {
            request_packet_id: Some(roster_req.id),
            data: ServerPayload::JoinedChatList {
                chats: vec![general.clone()],
            },
        })
        .await;
    let _ = next_update(&mut updates).await; // RosterChanged

    handle.select_chat(general.clone()).await.unwrap();
    let _ = next_update(&mut updates).await; // SelectedChatChanged
    let _ = next_update(&mut updates).await; // empty snapshot
    let fetch = server.read_packet().await;
    server
        .send(&ServerPacket {
            request_packet_id: Some(fetch.id),
            data: ServerPayload::Messages {
                messages: vec![msg(general.id, "4", "before the drop")],
            },
        })
        .await;
    let _ = next_update(&mut updates).await; // RosterChanged (preview)
    let _ = next_update(&mut updates).await; // snapshot

    // Kill the connection; the transport redials on its own
    drop(server);
    let mut server = ServerSide::accept(&listener).await;
    server.expect_hello(user_id).await;

    // Fresh bootstrap: roster, directory, and the selected chat again
    let roster_req = server.read_packet().await;
    assert!(matches!(roster_req.data, ClientCommand::GetJoinedChats));
    let directory_req = server.read_packet().await;
    assert!(matches!(directory_req.data, ClientCommand::GetFirstCircleUpdates));
    let refetch = server.read_packet().await;
    match refetch.data {
        ClientCommand::GetMessages { chat_id, start_id, .. } => {
            assert_eq!(chat_id, general.id);
            // Windows were cleared, so the fetch starts from the newest page
            assert_eq!(start_id, None);
        }
        other => panic!("expected GetMessages, got {:?}", other),
    }

    // Request ids keep increasing across the reconnect
    assert!(roster_req.id > fetch.id);
}
