//! Behaviour of output routing after user entries and remote deliveries.

use std::net::{Ipv4Addr, SocketAddrV4};

use rstest::{fixture, rstest};

use eventmgr_wire::payload::{Entry, RemoteOutput};
use eventmgr_wire::{Opcode, ResultCode, TAG_LEN};

use crate::backend::{EntryId, Param};
use crate::dispatch::Output;

use super::support::{Harness, Invocation, ScriptedReply};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn output(conn_id: u16, ciphertext: &[u8], tag_byte: u8) -> Output {
    Output {
        conn_id,
        ciphertext: ciphertext.to_vec(),
        tag: [tag_byte; TAG_LEN],
    }
}

fn delivered(invocation: &Invocation) -> (u16, Vec<u8>, Vec<u8>) {
    let params = invocation.operation.params();
    let Param::Value { a: len, b: conn_id } = params[0] else {
        panic!("handle-input slot 0 should carry a value");
    };
    let len = usize::try_from(len).expect("length fits");
    let data = params[2].bytes().expect("data buffer");
    let tag = params[3].bytes().expect("tag buffer");
    (
        u16::try_from(conn_id).expect("conn id fits"),
        data[..len].to_vec(),
        tag[..TAG_LEN].to_vec(),
    )
}

#[rstest]
fn user_output_on_a_local_connection_is_delivered_once(harness: Harness) {
    harness.connect_local(5, 9);
    let session = harness.load_module(9);
    harness.backend.reply(
        session,
        EntryId::User,
        ScriptedReply::Outputs(vec![output(5, &[0x01, 0x02], 0xEE)]),
    );

    let result = harness.call(9, Entry::User(7), &[0x10, 0x20]);

    assert_eq!(result.code, ResultCode::Ok);
    let deliveries = harness.backend.invocations_of(EntryId::HandleInput);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].session, session);
    assert_eq!(
        delivered(&deliveries[0]),
        (5, vec![0x01, 0x02], vec![0xEE; TAG_LEN])
    );
}

#[rstest]
fn outputs_for_unknown_connections_are_dropped(harness: Harness) {
    harness.connect_local(5, 9);
    let session = harness.load_module(9);
    harness.backend.reply(
        session,
        EntryId::User,
        ScriptedReply::Outputs(vec![output(77, &[0xAA], 0x01), output(5, &[0xBB], 0x02)]),
    );

    let result = harness.call(9, Entry::User(4), &[]);

    assert_eq!(result.code, ResultCode::Ok);
    let deliveries = harness.backend.invocations_of(EntryId::HandleInput);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(delivered(&deliveries[0]).1, vec![0xBB]);
}

#[rstest]
fn local_outputs_are_routed_depth_first(harness: Harness) {
    harness.connect_local(1, 2);
    harness.connect_local(2, 3);
    harness.connect_local(4, 3);
    let source = harness.load_module(1);
    let middle = harness.load_module(2);
    let sink = harness.load_module(3);
    harness.backend.reply(
        source,
        EntryId::User,
        ScriptedReply::Outputs(vec![output(1, &[0xA1], 0x01), output(4, &[0xB1], 0x02)]),
    );
    harness.backend.reply(
        middle,
        EntryId::HandleInput,
        ScriptedReply::Outputs(vec![output(2, &[0xA2], 0x03)]),
    );

    let result = harness.call(1, Entry::User(3), &[]);

    assert_eq!(result.code, ResultCode::Ok);
    let order: Vec<_> = harness
        .backend
        .invocations_of(EntryId::HandleInput)
        .iter()
        .map(|invocation| (invocation.session, delivered(invocation).1))
        .collect();
    assert_eq!(
        order,
        vec![
            (middle, vec![0xA1]),
            (sink, vec![0xA2]),
            (sink, vec![0xB1]),
        ]
    );
}

#[rstest]
fn remote_outputs_are_forwarded_as_remote_output_frames(harness: Harness) {
    let peer = Ipv4Addr::new(10, 1, 2, 3);
    harness.connect_remote(5, 9, (peer, 1236));
    let session = harness.load_module(1);
    harness.backend.reply(
        session,
        EntryId::User,
        ScriptedReply::Outputs(vec![output(5, &[0x01, 0x02], 0xEE)]),
    );

    let result = harness.call(1, Entry::User(7), &[]);

    assert_eq!(result.code, ResultCode::Ok);
    let sent = harness.forwarder.sent();
    assert_eq!(sent.len(), 1);
    let (destination, frame) = &sent[0];
    assert_eq!(*destination, SocketAddrV4::new(peer, 1236));
    assert_eq!(frame.opcode, Opcode::RemoteOutput);
    let forwarded = RemoteOutput::parse(&frame.payload).expect("forwarded payload");
    assert_eq!(forwarded.module_id, 9);
    assert_eq!(forwarded.conn_id, 5);
    assert_eq!(forwarded.ciphertext, &[0x01, 0x02]);
    assert_eq!(forwarded.tag, [0xEE; TAG_LEN]);
}

#[rstest]
fn cyclic_routes_stop_at_the_hop_limit() {
    let harness = Harness::with_max_hops(4);
    harness.connect_local(5, 9);
    harness.connect_remote(6, 2, (Ipv4Addr::LOCALHOST, 9000));
    let session = harness.load_module(9);
    let looping = ScriptedReply::Outputs(vec![output(5, &[0x01], 0x01), output(6, &[0x02], 0x02)]);
    harness
        .backend
        .reply(session, EntryId::User, looping.clone());
    harness
        .backend
        .reply(session, EntryId::HandleInput, looping);

    let result = harness.call(9, Entry::User(5), &[]);

    assert_eq!(result.code, ResultCode::InternalError);
    assert_eq!(harness.backend.invocations_of(EntryId::HandleInput).len(), 4);
    assert!(harness.forwarder.sent().is_empty());
}

#[rstest]
fn malformed_output_batch_fails_the_call(harness: Harness) {
    let session = harness.load_module(1);
    harness
        .backend
        .reply(session, EntryId::User, ScriptedReply::Malformed);

    let result = harness.call(1, Entry::User(3), &[]);
    assert_eq!(result.code, ResultCode::InternalError);
}

#[rstest]
fn failed_local_delivery_does_not_fail_the_call(harness: Harness) {
    harness.connect_local(5, 2);
    harness.connect_local(6, 2);
    let source = harness.load_module(1);
    let target = harness.load_module(2);
    harness.backend.reply(
        source,
        EntryId::User,
        ScriptedReply::Outputs(vec![output(5, &[0x01], 0x01), output(6, &[0x02], 0x02)]),
    );
    harness
        .backend
        .reply(target, EntryId::HandleInput, ScriptedReply::Fail(0xFFFF_3024));

    let result = harness.call(1, Entry::User(3), &[]);

    assert_eq!(result.code, ResultCode::Ok);
    assert_eq!(harness.backend.invocations_of(EntryId::HandleInput).len(), 2);
}

#[rstest]
fn remote_output_is_delivered_to_the_named_module(harness: Harness) {
    let session = harness.load_module(9);
    let payload = RemoteOutput {
        module_id: 9,
        conn_id: 5,
        ciphertext: &[0x01, 0x02],
        tag: [0xEE; TAG_LEN],
    }
    .encode();

    let dispatch = harness
        .router
        .dispatch(&eventmgr_wire::CommandFrame::new(Opcode::RemoteOutput, payload));

    assert_eq!(dispatch.result.code, ResultCode::Ok);
    assert!(harness.backend.invocations_of(EntryId::HandleInput).is_empty());
    assert_eq!(
        dispatch.follow_up.delivery().map(|delivery| delivery.module_id),
        Some(9)
    );

    harness.router.complete(dispatch.follow_up);
    let deliveries = harness.backend.invocations_of(EntryId::HandleInput);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].session, session);
    assert_eq!(
        delivered(&deliveries[0]),
        (5, vec![0x01, 0x02], vec![0xEE; TAG_LEN])
    );
}

#[rstest]
fn deferred_delivery_into_a_cycle_stops_at_the_hop_limit() {
    let harness = Harness::with_max_hops(3);
    harness.connect_local(5, 9);
    harness.connect_remote(6, 2, (Ipv4Addr::LOCALHOST, 9000));
    let session = harness.load_module(9);
    harness.backend.reply(
        session,
        EntryId::HandleInput,
        ScriptedReply::Outputs(vec![output(5, &[0x01], 0x01), output(6, &[0x02], 0x02)]),
    );
    let payload = RemoteOutput {
        module_id: 9,
        conn_id: 5,
        ciphertext: &[0x01],
        tag: [0x01; TAG_LEN],
    }
    .encode();

    let dispatch = harness
        .router
        .dispatch(&eventmgr_wire::CommandFrame::new(Opcode::RemoteOutput, payload));
    assert_eq!(dispatch.result.code, ResultCode::Ok);
    assert!(harness.backend.invocations_of(EntryId::HandleInput).is_empty());

    harness.router.complete(dispatch.follow_up);

    assert_eq!(harness.backend.invocations_of(EntryId::HandleInput).len(), 3);
    assert!(harness.forwarder.sent().is_empty());
}

#[rstest]
#[case::missing_tag(vec![0x00, 0x09, 0x00, 0x05, 0x01])]
#[case::no_header(vec![0x00])]
fn malformed_remote_output_is_an_illegal_payload(harness: Harness, #[case] payload: Vec<u8>) {
    let result = harness.send(Opcode::RemoteOutput, payload);
    assert_eq!(result.code, ResultCode::IllegalPayload);
}

#[rstest]
fn remote_output_for_an_unknown_module_still_replies_ok(harness: Harness) {
    let payload = RemoteOutput {
        module_id: 3,
        conn_id: 5,
        ciphertext: &[],
        tag: [0; TAG_LEN],
    }
    .encode();

    let result = harness.send(Opcode::RemoteOutput, payload);

    assert_eq!(result.code, ResultCode::Ok);
    assert!(harness.backend.invocations().is_empty());
}
