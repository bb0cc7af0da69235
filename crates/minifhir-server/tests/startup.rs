use std::fs;

use minifhir_core::{ResourceInfo, ResourceRegistry, ResourceType};
use minifhir_server::{AppConfig, bootstrap_with_registry};
use minifhir_storage::FhirStorage;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn patient_profile() -> serde_json::Value {
    json!({
        "resourceType": "StructureDefinition",
        "type": "Patient",
        "snapshot": {"element": [
            {"path": "Patient", "min": 0},
            {"path": "Patient.gender", "min": 1}
        ]}
    })
}

fn registry(server: &MockServer) -> ResourceRegistry {
    ResourceRegistry::new([
        ResourceInfo::stu3(ResourceType::Patient)
            .with_profile_source(Some(format!("{}/patient.profile.json", server.uri()))),
        ResourceInfo::stu3(ResourceType::Organization).with_profile_source(None),
    ])
}

fn config(cache_dir: &std::path::Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.profiles.cache_dir = cache_dir.display().to_string();
    cfg
}

#[tokio::test]
async fn startup_loads_profiles_and_seeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patient.profile.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(patient_profile()))
        .expect(1)
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().expect("cache dir");
    let seed = tempfile::tempdir().expect("seed dir");
    fs::write(
        seed.path().join("patient.json"),
        json!({"resourceType": "Patient", "id": "pat-1", "gender": "female"}).to_string(),
    )
    .unwrap();

    let mut cfg = config(cache.path());
    cfg.seed.pattern = Some(format!("{}/*.json", seed.path().display()));

    let state = bootstrap_with_registry(&cfg, registry(&server)).await.unwrap();
    assert!(
        state
            .storage
            .read(ResourceType::Patient, "pat-1")
            .await
            .is_ok()
    );
    assert_eq!(state.validator.profiles().len(), 1);
    assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn profile_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().expect("cache dir");
    let err = bootstrap_with_registry(&config(cache.path()), registry(&server))
        .await
        .err()
        .expect("startup must fail");
    assert!(format!("{err:#}").contains("profile load failed"));
}

#[tokio::test]
async fn strict_seed_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patient.profile.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(patient_profile()))
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().expect("cache dir");
    let seed = tempfile::tempdir().expect("seed dir");
    fs::write(
        seed.path().join("patient.json"),
        json!({"resourceType": "Patient", "id": "pat-1"}).to_string(),
    )
    .unwrap();

    let mut cfg = config(cache.path());
    cfg.seed.pattern = Some(format!("{}/*.json", seed.path().display()));
    let err = bootstrap_with_registry(&cfg, registry(&server))
        .await
        .err()
        .expect("startup must fail");
    assert!(format!("{err:#}").contains("seed load failed"));

    cfg.seed.strict = false;
    let state = bootstrap_with_registry(&cfg, registry(&server)).await.unwrap();
    assert!(
        state
            .storage
            .read(ResourceType::Patient, "pat-1")
            .await
            .is_err()
    );
}
