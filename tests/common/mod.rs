//! Shared payload fixtures and router helpers for integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use heatos_lead_api::app::{build_router, build_state, RouterOptions};
use heatos_lead_api::connection::ConnectionStatus;
use heatos_lead_api::links::LinkConfig;
use heatos_lead_api::memory_store::MemoryLeadStore;

pub const EMAIL: &str = "a@x.de";
pub const PHONE: &str = "+491701234567";

pub fn minimal_payload() -> Value {
    json!({
        "version": "1.2.0",
        "leadStage": "minimal",
        "contact": {
            "contactInformation": {
                "firstName": "Anna",
                "lastName": "Muller",
                "phone": PHONE,
                "email": EMAIL
            }
        }
    })
}

fn address() -> Value {
    json!({
        "street": "Hauptstrasse 1",
        "city": "Berlin",
        "postalCode": "10115",
        "countryCode": "DE"
    })
}

pub fn qualification_payload() -> Value {
    let mut payload = minimal_payload();
    payload["leadStage"] = json!("qualification");
    payload["contact"]["address"] = address();
    payload["building"] = json!({
        "address": address(),
        "buildingInformation": {
            "immoType": "Single-family / Two-family house",
            "constructionYearString": "1978",
            "heritageProtection": "No",
            "boilerRoomSize": "more than 4 sqm",
            "installationLocationCeilingHeight": "180 - 199 cm",
            "widthPathway": "Yes",
            "heightPathway": "Yes",
            "personsHousehold": 4
        },
        "ownershipRelationships": { "type": "one_owner" },
        "energyRelevantInformation": {
            "heatedArea": 140,
            "locationHeating": "In the basement"
        }
    });
    payload["heatingSystem"] = json!({
        "systemType": "Natural gas",
        "consumption": 18000,
        "consumptionUnit": "Kilowatt hours (kWh)"
    });
    payload["project"] = json!({ "timeline": "1-3 months" });
    payload
}

pub fn discovery_payload() -> Value {
    let mut payload = qualification_payload();
    payload["leadStage"] = json!("discovery");

    let info = &mut payload["building"]["buildingInformation"];
    info["livingSpace"] = json!(160);
    info["residentialUnits"] = json!(1);
    info["roomsBetweenHeatingRoomAndOutdoorUnit"] = json!("one_room");
    info["meterClosetLocation"] = json!("Basement");
    info["electricityConnectionLocation"] = json!("Ground floor");
    info["groundingType"] = json!("grounding_spike_or_foundation");
    info["hasSolarThermalSystem"] = json!(false);

    payload["building"]["ownershipRelationships"]["ownerOccupiedHousing"] = json!(true);
    payload["building"]["energyRelevantInformation"]["typeOfHeating"] = json!("Radiator");

    let heating = &mut payload["heatingSystem"];
    heating["constructionYearHeatingSystem"] = json!(2001);
    heating["floorHeatingConnectedToReturnPipe"] = json!(false);
    heating["floorHeatingOwnHeatingCircuit"] = json!(false);
    heating["floorHeatingOnlyInSmallRooms"] = json!(true);
    heating["numberOfFloorHeatingDistributors"] = json!(0);
    heating["numberOfRadiators"] = json!(11);
    heating["domesticHotWaterByHeatpump"] = json!(true);
    heating["domesticHotWaterCirculationPump"] = json!("yes_but_inactive");
    heating["domestic_water_station"] = json!("water_filter_and_pressure_reducer");

    let project = &mut payload["project"];
    project["householdIncome"] = json!("no_answer");
    project["statusOfFoundationConstruction"] = json!("Vamo");
    project["fullReplacementOfHeatingSystemPlanned"] = json!(true);
    project["additionalDisposal"] = json!(["oil_tank_steel_up_to_5000l"]);

    payload
}

pub fn selling_payload() -> Value {
    let mut payload = discovery_payload();
    payload["leadStage"] = json!("selling");

    let photo = |name: &str| json!([{ "url": format!("https://cdn.example.com/{}.jpg", name) }]);
    payload["project"]["pictures"] = json!({
        "outdoorUnitLocation": photo("outdoor"),
        "outdoorUnitLocationWithArea": photo("outdoor-area"),
        "heatingRoom": photo("heating-room"),
        "meterClosetWithDoorOpen": photo("meter"),
        "meterClosetSlsSwitchDetailed": [],
        "floorHeatingDistributionWithDoorOpen": []
    });

    payload
}

pub fn payload_for(stage: &str) -> Value {
    match stage {
        "minimal" => minimal_payload(),
        "qualification" => qualification_payload(),
        "discovery" => discovery_payload(),
        "selling" => selling_payload(),
        other => panic!("unknown stage {other}"),
    }
}

/// A ready service over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryLeadStore>,
    pub status: ConnectionStatus,
    pub links: LinkConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryLeadStore::new());
        let status = ConnectionStatus::new();
        status.mark_initialized();
        Self::with(store, status)
    }

    pub fn uninitialized() -> Self {
        Self::with(Arc::new(MemoryLeadStore::new()), ConnectionStatus::new())
    }

    fn with(store: Arc<MemoryLeadStore>, status: ConnectionStatus) -> Self {
        let links = LinkConfig::default();
        let state = build_state(store.clone(), status.clone(), links.clone());
        let router = build_router(state, RouterOptions::default()).expect("router builds");
        Self {
            router,
            store,
            status,
            links,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<&Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn post(&self, body: &Value) -> (StatusCode, Value) {
        self.send(Method::POST, "/api/lead", Some(body)).await
    }

    pub async fn put(&self, body: &Value) -> (StatusCode, Value) {
        self.send(Method::PUT, "/api/lead", Some(body)).await
    }
}
