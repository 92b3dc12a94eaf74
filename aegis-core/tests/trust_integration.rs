//! End-to-end integration tests for the trust layer: explain a decision,
//! sign the resulting operation, attest both, and assemble a verifiable
//! evidence pack.

use aegis_core::{
    export_json, export_zip, feature_importance_stats, generate_keypair, generate_pack,
    generate_summary, hash_action, sign_price_update, verify_integrity, verify_operation,
    verify_proof, AttestationLogEntry, AttestationLogManager, DecisionType, ExplainRequest,
    ExplainabilityEngine, ExplainerConfig, PackFormat, PackRequest, Scalar, SignatureStore,
};
use serde_json::{json, Map};
use std::collections::BTreeMap;

fn pricing_request() -> ExplainRequest {
    let mut features = BTreeMap::new();
    features.insert("current_price".to_string(), Scalar::from(129.99));
    features.insert("demand_forecast".to_string(), Scalar::from(450.0));
    features.insert("competitor_price".to_string(), Scalar::from(159.99));
    features.insert("stock_level".to_string(), Scalar::from(120.0));
    ExplainRequest {
        decision_type: DecisionType::Pricing,
        model_name: "price-optimizer-v2".to_string(),
        model_version: "2.1.0".to_string(),
        prediction: Scalar::from(149.99),
        confidence: 0.87,
        features,
        shap_values: None,
    }
}

#[test]
fn explain_sign_attest_pack_roundtrip() {
    // 1. Explain the decision.
    let engine = ExplainabilityEngine::new(ExplainerConfig::default());
    let explanation = engine.explain(pricing_request()).unwrap();
    assert!(explanation.feature_importances.len() <= 5);
    let decision_id = explanation.decision_id.to_string();

    // 2. Sign the consequential operation and store it.
    let keypair = generate_keypair();
    let operation =
        sign_price_update("user1", "SKU-1", 129.99, 149.99, &keypair.private_key).unwrap();
    assert!(verify_operation(&operation).valid);

    let mut store = SignatureStore::new();
    store.store(operation.clone()).unwrap();
    assert_eq!(store.count(), 1);

    // 3. Attest the decision and the operation in the append-only log.
    let mut log = AttestationLogManager::new();
    let mut metadata = Map::new();
    metadata.insert("decision_id".to_string(), json!(decision_id.clone()));
    log.append(
        AttestationLogEntry::new(hash_action(decision_id.as_bytes()), "user1")
            .with_metadata(metadata),
    );
    log.append(AttestationLogEntry::new(
        hash_action(operation.signature.as_bytes()),
        "user1",
    ));

    // 4. Assemble the evidence pack against a point-in-time snapshot.
    let pack = generate_pack(PackRequest {
        decision_id: decision_id.clone(),
        explanation: Some(explanation),
        signed_operation: Some(operation),
        attestation_logs: Some(log.get_all()),
        format: PackFormat::Json,
    })
    .unwrap();

    assert!(verify_integrity(&pack));
    let proof = pack.includes.merkle_proof.as_ref().unwrap();
    assert_eq!(proof.leaf_index, 0);
    let logs = pack.includes.attestation_logs.as_ref().unwrap();
    assert!(verify_proof(proof, &logs[0].canonical()));

    // 5. The pack survives export and re-import intact.
    let exported = export_json(&pack).unwrap();
    let restored: aegis_core::EvidencePack = serde_json::from_str(&exported).unwrap();
    assert!(verify_integrity(&restored));

    let summary = generate_summary(&pack);
    assert!(summary.contains(&decision_id));
}

#[test]
fn pack_survives_log_growth_after_generation() {
    let mut log = AttestationLogManager::new();
    let decision_id = "dec-growth".to_string();
    let mut metadata = Map::new();
    metadata.insert("decision_id".to_string(), json!(decision_id.clone()));
    log.append(
        AttestationLogEntry::new(hash_action(b"decision"), "ops").with_metadata(metadata),
    );

    let pack = generate_pack(PackRequest {
        decision_id,
        explanation: None,
        signed_operation: None,
        attestation_logs: Some(log.get_all()),
        format: PackFormat::Json,
    })
    .unwrap();

    // The originating log keeps growing; the pack's snapshot copy and
    // proof stay valid.
    for i in 0..10 {
        log.append(AttestationLogEntry::new(
            hash_action(format!("later-{i}").as_bytes()),
            "ops",
        ));
    }

    assert!(verify_integrity(&pack));
    let proof = pack.includes.merkle_proof.as_ref().unwrap();
    let snapshot = pack.includes.attestation_logs.as_ref().unwrap();
    assert!(verify_proof(proof, &snapshot[0].canonical()));
    // A proof against the grown log would have a different root.
    assert_ne!(proof.root_hash, log.root_hash().unwrap());
}

#[test]
fn log_manager_proof_matches_pack_proof_for_same_snapshot() {
    let mut log = AttestationLogManager::new();
    for i in 0..6 {
        log.append(AttestationLogEntry::new(
            hash_action(format!("action-{i}").as_bytes()),
            "system",
        ));
    }

    let target = hash_action(b"action-4");
    let direct = log.generate_proof_for_log(&target).unwrap().unwrap();

    let pack = generate_pack(PackRequest {
        decision_id: target,
        explanation: None,
        signed_operation: None,
        attestation_logs: Some(log.get_all()),
        format: PackFormat::Json,
    })
    .unwrap();

    assert_eq!(pack.includes.merkle_proof.as_ref().unwrap(), &direct);
}

#[test]
fn zip_export_is_self_contained() {
    let engine = ExplainabilityEngine::new(ExplainerConfig::default());
    let explanation = engine.explain(pricing_request()).unwrap();
    let keypair = generate_keypair();
    let operation =
        sign_price_update("user1", "SKU-1", 100.0, 110.0, &keypair.private_key).unwrap();

    let pack = generate_pack(PackRequest {
        decision_id: explanation.decision_id.to_string(),
        explanation: Some(explanation),
        signed_operation: Some(operation),
        attestation_logs: None,
        format: PackFormat::Zip,
    })
    .unwrap();

    let bytes = export_zip(&pack).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    let mut pack_json = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("pack.json").unwrap(), &mut pack_json)
        .unwrap();
    let restored: aegis_core::EvidencePack = serde_json::from_str(&pack_json).unwrap();
    assert!(verify_integrity(&restored));
    assert!(verify_operation(restored.includes.signed_operation.as_ref().unwrap()).valid);
}

#[test]
fn stats_aggregate_across_batch() {
    let engine = ExplainabilityEngine::new(ExplainerConfig::default());
    let results = engine.explain_batch(vec![pricing_request(), pricing_request()]);
    let explanations: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

    let stats = feature_importance_stats(&explanations);
    let price = stats
        .iter()
        .find(|s| s.feature_name == "current_price")
        .unwrap();
    assert_eq!(price.frequency, 2);
    assert_eq!(price.max_importance, price.min_importance);
}
