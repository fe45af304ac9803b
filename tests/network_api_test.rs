// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use mote_gateway::command::CommandDispatcher;
use mote_gateway::modbus::{build, FunctionCode};
use mote_gateway::serial::{ChannelSettings, MockHandle, MockTransport, SerialChannel};
use mote_gateway::server::{build_rocket, HealthReport};
use rocket::config::LogLevel;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;

fn get_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", 0))
        .merge(("log_level", LogLevel::Off))
}

async fn test_client() -> (Client, MockHandle) {
    let (transport, handle) = MockTransport::new();
    let channel = SerialChannel::open(Box::new(transport), ChannelSettings::default())
        .await
        .expect("mock channel opens");
    let rocket = build_rocket(get_figment(), CommandDispatcher::new(Arc::new(channel))).await;
    let client = Client::tracked(rocket)
        .await
        .expect("valid rocket instance");
    (client, handle)
}

#[rocket::async_test]
async fn test_query_parameters_are_written_in_order() {
    let (client, handle) = test_client().await;

    let response = client
        .post("/network/?servo_A0-B1_numeric_05=42.9&lamp_0C_binary_01=true")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.unwrap_or_default(), "");
    assert_eq!(
        handle.written_frames(),
        vec![
            build(0xA0, FunctionCode::WriteHoldingRegister, &[0x00, 0x05, 0x00, 42]),
            build(0xB1, FunctionCode::WriteHoldingRegister, &[0x00, 0x05, 0x00, 42]),
            build(0x0C, FunctionCode::WriteSingleCoil, &[0x00, 0x01, 0x00, 0x01]),
        ]
    );
}

#[rocket::async_test]
async fn test_form_body_parameters() {
    let (client, handle) = test_client().await;

    let response = client
        .post("/network/")
        .header(ContentType::Form)
        .body("valve_1F_binary_02=0&pump_1F_numeric_0A=1000")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        handle.written_frames(),
        vec![
            ":1F050002000000DA\r\n".to_string(),
            build(0x1F, FunctionCode::WriteHoldingRegister, &[0x00, 0x0A, 0x03, 0xE8]),
        ]
    );
}

#[rocket::async_test]
async fn test_invalid_parameter_writes_nothing() {
    let (client, handle) = test_client().await;

    let response = client
        .post("/network/?lamp_0C_binary_01=1&servo_A0_numeric=5")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let body = response.into_string().await.unwrap_or_default();
    assert!(body.contains("servo_A0_numeric"), "unexpected body: {}", body);
    assert!(handle.writes().is_empty());
}

#[rocket::async_test]
async fn test_out_of_range_values_are_rejected() {
    let (client, handle) = test_client().await;

    for query in [
        "servo_A0_numeric_05=70000",
        "servo_A0_numeric_05=-1",
        "servo_A0_numeric_05=abc",
        "lamp_0C_binary_01=maybe",
        "lamp_ZZ_binary_01=1",
        "lamp_0C_analog_01=1",
    ] {
        let uri = format!("/network/?{}", query);
        let response = client
            .post(uri.as_str())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "query {}", query);
    }
    assert!(handle.writes().is_empty());
}

#[rocket::async_test]
async fn test_empty_request_is_accepted() {
    let (client, handle) = test_client().await;

    let response = client.post("/network/").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert!(handle.writes().is_empty());
}

#[rocket::async_test]
async fn test_serial_failure_maps_to_service_unavailable() {
    let (client, handle) = test_client().await;
    handle.set_fail_writes(true);

    let response = client
        .post("/network/?lamp_0C_binary_01=1")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::ServiceUnavailable);
}

#[rocket::async_test]
async fn test_health_endpoint() {
    let (client, _handle) = test_client().await;

    let response = client.get("/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );
    let report: HealthReport = response.into_json().await.expect("health report");
    assert_eq!(report.status, "ok");
    assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(report.serial_port, "mock");
}

#[rocket::async_test]
async fn test_cors_preflight() {
    let (client, _handle) = test_client().await;

    let response = client.options("/network/").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response
        .headers()
        .get_one("Access-Control-Allow-Methods")
        .unwrap_or_default()
        .contains("POST"));
}
