#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use brrtdispatch::echo::{register_demo, EchoRequest, EchoResponse};
use brrtdispatch::{
    codes, Context, DispatchError, Dispatcher, HandlerError, MessageId, Payload, Transport,
    Validate,
};
use common::handlers::sum;
use common::messages::{Counter, Total, Unrelated};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};
use std::thread;

fn dispatch(dispatcher: &Dispatcher, id: impl Into<MessageId>, payload: Payload<'_>) -> Result<Vec<u8>, DispatchError> {
    let id = id.into();
    dispatcher.dispatch(&Context::new(&id), &id, payload)
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[test]
fn test_echo_round_trip() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();
    let body = dispatch(&dispatcher, "echo", Payload::json(br#"{"message":"hi"}"#)).unwrap();
    assert_eq!(as_json(&body), json!({ "message": "hi" }));
}

#[test]
fn test_unknown_message_touches_no_pool() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();
    let echo = dispatcher.lookup(&MessageId::from("echo")).unwrap();
    let before = (echo.request_pool_stats(), echo.response_pool_stats());

    let err = dispatch(&dispatcher, 10_001u64, Payload::json(br#"{"message":"hi"}"#)).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownMessage(MessageId::Num(10_001))));
    let env = err.envelope();
    assert_eq!(env.error_code, codes::UNKNOWN_MESSAGE);
    assert!(env.error_message.contains("10001"));

    assert_eq!(before, (echo.request_pool_stats(), echo.response_pool_stats()));
}

#[test]
fn test_truncated_payload_releases_both_instances() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();

    let err = dispatch(&dispatcher, "echo", Payload::json(br#"{"message":"#)).unwrap_err();
    assert!(matches!(err, DispatchError::Decode(_)));
    assert_eq!(err.code(), codes::DECODE);
    assert!(err.envelope().error_message.starts_with("bad json msg"));

    let echo = dispatcher.lookup(&MessageId::from("echo")).unwrap();
    let (req, res) = (echo.request_pool_stats(), echo.response_pool_stats());
    assert_eq!((req.acquired, req.in_use()), (1, 0));
    assert_eq!((res.acquired, res.in_use()), (1, 0));
}

#[test]
fn test_wrong_field_type_is_decode_error() {
    let dispatcher = Dispatcher::new();
    dispatcher.register("sum", sum).unwrap();
    let err = dispatch(&dispatcher, "sum", Payload::json(br#"{"name":5}"#)).unwrap_err();
    assert_eq!(err.code(), codes::DECODE);
}

#[test]
fn test_coded_handler_error() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register(
            "limited",
            |_ctx: &Context, _req: &EchoRequest, res: &mut EchoResponse| -> Result<(), HandlerError> {
                res.message.push_str("partial");
                Err(HandlerError::coded(42, "quota exceeded"))
            },
        )
        .unwrap();

    let err = dispatch(&dispatcher, "limited", Payload::json(br#"{"message":"hi"}"#)).unwrap_err();
    let env = err.envelope();
    assert_eq!(env.error_code, 42);
    assert_eq!(env.error_message, "quota exceeded");
}

#[test]
fn test_plain_handler_error_is_minus_one() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register(
            "plain",
            |_ctx: &Context, _req: &Unrelated, _res: &mut Unrelated| -> Result<(), HandlerError> {
                Err(HandlerError::plain("storage offline"))
            },
        )
        .unwrap();
    let err = dispatch(&dispatcher, "plain", Payload::Empty).unwrap_err();
    assert_eq!(err.code(), codes::PLAIN);
    assert_eq!(err.envelope().error_message, "storage offline");
}

#[test]
fn test_empty_payload_yields_zero_request() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register(
            "flip",
            |_ctx: &Context, req: &Unrelated, res: &mut Unrelated| -> Result<(), HandlerError> {
                res.flag = !req.flag;
                Ok(())
            },
        )
        .unwrap();

    for payload in [Payload::Empty, Payload::json(b""), Payload::json(b"  \n")] {
        let body = dispatch(&dispatcher, "flip", payload).unwrap();
        assert_eq!(as_json(&body), json!({ "flag": true }));
    }
}

#[test]
fn test_validation_failure() {
    let dispatcher = Dispatcher::new();
    dispatcher.register("sum", sum).unwrap();

    let err = dispatch(
        &dispatcher,
        "sum",
        Payload::json(br#"{"name":"","values":[1,2,3,4,5,6,7,8,9]}"#),
    )
    .unwrap_err();
    assert_eq!(err.code(), codes::VALIDATION);
    let DispatchError::Validation(validation) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<&str> = validation.fields().iter().map(|f| f.field.as_ref()).collect();
    assert_eq!(fields, vec!["name", "values"]);
}

#[test]
fn test_validation_can_be_disabled() {
    let dispatcher = Dispatcher::builder().without_validation().build();
    dispatcher.register("sum", sum).unwrap();
    let body = dispatch(&dispatcher, "sum", Payload::json(br#"{"values":[2,3]}"#)).unwrap();
    assert_eq!(as_json(&body)["total"], 5);
}

#[test]
fn test_payload_limit() {
    let dispatcher = Dispatcher::builder().max_payload_bytes(16).build();
    register_demo(&dispatcher).unwrap();
    let err = dispatch(
        &dispatcher,
        "echo",
        Payload::json(br#"{"message":"this one is too long"}"#),
    )
    .unwrap_err();
    assert_eq!(err.code(), codes::DECODE);
    assert!(dispatch(&dispatcher, "echo", Payload::json(br#"{"message":"ok"}"#)).is_ok());
}

#[test]
fn test_field_payload() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();
    let fields = json!({ "message": "from query" });
    let body = dispatch(&dispatcher, "test::echo", Payload::fields(&fields)).unwrap();
    assert_eq!(as_json(&body), json!({ "message": "from query" }));
}

#[test]
fn test_payload_limit_applies_to_fields() {
    let dispatcher = Dispatcher::builder().max_payload_bytes(16).build();
    register_demo(&dispatcher).unwrap();
    let echo = dispatcher.lookup(&MessageId::from("test::echo")).unwrap();

    let fields = json!({ "message": "this one is too long" });
    let err = dispatch(&dispatcher, "test::echo", Payload::fields(&fields)).unwrap_err();
    assert_eq!(err.code(), codes::DECODE);
    assert!(err.to_string().contains("16"));
    assert_eq!(echo.request_pool_stats().in_use(), 0);

    let fields = json!({ "message": "ok" });
    assert!(dispatch(&dispatcher, "test::echo", Payload::fields(&fields)).is_ok());
}

#[derive(Debug, Default, Serialize)]
struct TupleKeys {
    map: BTreeMap<(u8, u8), u8>,
}

#[test]
fn test_encode_failure() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register(
            "pairs",
            |_ctx: &Context, _req: &Unrelated, res: &mut TupleKeys| -> Result<(), HandlerError> {
                res.map.insert((1, 2), 3);
                Ok(())
            },
        )
        .unwrap();
    let err = dispatch(&dispatcher, "pairs", Payload::Empty).unwrap_err();
    assert!(matches!(err, DispatchError::Encode(_)));
    assert_eq!(err.code(), codes::ENCODE);
}

#[test]
fn test_reregistration_does_not_disturb_in_flight_dispatch() {
    let dispatcher = Arc::new(Dispatcher::new());
    let started = Arc::new(Barrier::new(2));
    let resume = Arc::new(Barrier::new(2));
    {
        let started = Arc::clone(&started);
        let resume = Arc::clone(&resume);
        dispatcher
            .register(
                "v",
                move |_ctx: &Context, _req: &Unrelated, res: &mut EchoResponse| -> Result<(), HandlerError> {
                    started.wait();
                    resume.wait();
                    res.message.push_str("v1");
                    Ok(())
                },
            )
            .unwrap();
    }

    let in_flight = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || dispatch(&dispatcher, "v", Payload::Empty))
    };

    started.wait();
    dispatcher
        .register(
            "v",
            |_ctx: &Context, _req: &Unrelated, res: &mut EchoResponse| -> Result<(), HandlerError> {
                res.message.push_str("v2");
                Ok(())
            },
        )
        .unwrap();
    resume.wait();

    let body = in_flight.join().unwrap().unwrap();
    assert_eq!(as_json(&body), json!({ "message": "v1" }));
    let body = dispatch(&dispatcher, "v", Payload::Empty).unwrap();
    assert_eq!(as_json(&body), json!({ "message": "v2" }));
}

#[test]
fn test_unregister_then_unknown() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();
    assert!(dispatcher.unregister(&MessageId::from("echo")));
    let err = dispatch(&dispatcher, "echo", Payload::json(br#"{"message":"hi"}"#)).unwrap_err();
    assert_eq!(err.code(), codes::UNKNOWN_MESSAGE);
}

#[test]
fn test_concurrent_dispatch_never_sees_stale_state() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register("sum", sum).unwrap();

    let handles: Vec<_> = (0..8i64)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for i in 0..200i64 {
                    let values = vec![t, i, t * i];
                    let payload = serde_json::to_vec(&Counter {
                        name: format!("t{t}"),
                        values: values.clone(),
                    })
                    .unwrap();
                    let body = dispatch(&dispatcher, "sum", Payload::json(&payload)).unwrap();
                    let total: Total = serde_json::from_slice(&body).unwrap();
                    assert_eq!(total.name, format!("t{t}"));
                    assert_eq!(total.seen, values);
                    assert_eq!(total.total, values.iter().sum::<i64>());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let descriptor = dispatcher.lookup(&MessageId::from("sum")).unwrap();
    let stats = descriptor.request_pool_stats();
    assert_eq!(stats.acquired, 1600);
    assert_eq!(stats.in_use(), 0);
    assert!(stats.created <= 8);
}

/// Transport over an in-memory request, as a non-HTTP binding would look.
struct Inbox;

#[derive(Default)]
struct Letter {
    id: Option<&'static str>,
    body: Vec<u8>,
    reply: Option<Result<Vec<u8>, (i32, String)>>,
}

impl Transport for Inbox {
    type Request = Letter;

    fn message_id(&self, req: &Letter) -> Result<MessageId, DispatchError> {
        req.id
            .map(MessageId::from)
            .ok_or_else(|| DispatchError::BadRequest("no id".into()))
    }

    fn payload<'a>(&self, req: &'a Letter) -> Payload<'a> {
        Payload::json(&req.body)
    }

    fn write_response(&self, req: &mut Letter, body: Vec<u8>) {
        req.reply = Some(Ok(body));
    }

    fn report_error(&self, req: &mut Letter, err: &DispatchError) {
        let env = err.envelope();
        req.reply = Some(Err((env.error_code, env.error_message)));
    }
}

#[test]
fn test_serve_through_custom_transport() {
    let dispatcher = Dispatcher::new();
    register_demo(&dispatcher).unwrap();

    let mut ok = Letter {
        id: Some("echo"),
        body: br#"{"message":"mail"}"#.to_vec(),
        ..Letter::default()
    };
    dispatcher.serve(&Inbox, &mut ok);
    assert_eq!(ok.reply, Some(Ok(br#"{"message":"mail"}"#.to_vec())));

    let mut no_id = Letter::default();
    dispatcher.serve(&Inbox, &mut no_id);
    assert!(matches!(no_id.reply, Some(Err((code, _))) if code == codes::BAD_REQUEST));

    let mut invalid = Letter {
        id: Some("echo"),
        ..Letter::default()
    };
    dispatcher.serve(&Inbox, &mut invalid);
    assert!(matches!(invalid.reply, Some(Err((code, _))) if code == codes::VALIDATION));
}

#[test]
fn test_echo_request_validation_rule() {
    assert!(EchoRequest::default().validate().is_err());
    assert!(EchoRequest {
        message: "x".into()
    }
    .validate()
    .is_ok());
}
