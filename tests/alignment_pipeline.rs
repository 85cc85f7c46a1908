use std::collections::HashSet;
use std::fs;
use vocab_nexus::ingest::RowIssue;
use vocab_nexus::sink::EquivalenceDocument;
use vocab_nexus::{
    AlignmentConfig, AlignmentOrchestrator, EntityKind, Ingestor, InputFormat, ResultSink,
};

const SCORES_CSV: &str = "\
entity_a,vocabulary_a,entity_b,vocabulary_b,kind,score
http://schema.org/Person,http://schema.org/,http://xmlns.com/foaf/0.1/Person,http://xmlns.com/foaf/0.1/,class,http://value/0.97_0.98
http://schema.org/Person,http://schema.org/,http://xmlns.com/foaf/0.1/Agent,http://xmlns.com/foaf/0.1/,class,http://value/0.81_0.82
http://schema.org/Organization,http://schema.org/,http://xmlns.com/foaf/0.1/Organization,http://xmlns.com/foaf/0.1/,class,0.955
http://schema.org/Organization,http://schema.org/,http://xmlns.com/foaf/0.1/Group,http://xmlns.com/foaf/0.1/,class,0.93
http://schema.org/name,http://schema.org/,http://xmlns.com/foaf/0.1/name,http://xmlns.com/foaf/0.1/,property,0.99
http://schema.org/name,http://schema.org/,http://purl.org/dc/terms/title,http://purl.org/dc/terms/,property,0.77
http://schema.org/name,http://schema.org/,http://schema.org/name,http://purl.org/dc/terms/,property,0.9
http://schema.org/url,http://schema.org/,http://xmlns.com/foaf/0.1/homepage,http://xmlns.com/foaf/0.1/,property,0.42
";

fn write_scores(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("vocab_nexus_{}", name));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("scores.csv");
    fs::write(&path, SCORES_CSV).unwrap();
    path
}

#[test]
fn test_csv_to_equivalences() -> Result<(), Box<dyn std::error::Error>> {
    let config = AlignmentConfig::default();
    let path = write_scores("csv_to_equivalences");

    let ingest = Ingestor::new(&config).read_path(&path, None)?;
    assert_eq!(ingest.candidates.len(), 6);
    assert_eq!(ingest.rejected_count(RowIssue::SelfPair), 1);
    assert_eq!(ingest.rejected_count(RowIssue::BelowThreshold), 1);

    let report = AlignmentOrchestrator::new(&config).align(ingest.candidates);

    // schema-foaf classes, schema-foaf properties, schema-dcterms properties
    assert_eq!(report.totals.scopes, 3);

    let accepted: HashSet<(String, String)> = report
        .accepted
        .iter()
        .map(|p| (p.entity_a.to_string(), p.entity_b.to_string()))
        .collect();

    // foaf sorts after schema.org, so foaf entities come first
    assert!(accepted.contains(&(
        "http://xmlns.com/foaf/0.1/Person".to_string(),
        "http://schema.org/Person".to_string()
    )));
    assert!(accepted.contains(&(
        "http://xmlns.com/foaf/0.1/Organization".to_string(),
        "http://schema.org/Organization".to_string()
    )));
    assert!(accepted.contains(&(
        "http://xmlns.com/foaf/0.1/name".to_string(),
        "http://schema.org/name".to_string()
    )));
    // dcterms:title only competes inside its own scope
    assert!(accepted.contains(&(
        "http://schema.org/name".to_string(),
        "http://purl.org/dc/terms/title".to_string()
    )));
    // Agent and Group lose to the higher-scored claims on Person and Organization
    assert_eq!(report.accepted.len(), 4);
    assert_eq!(report.accepted_of_kind(EntityKind::Class).count(), 2);

    let sink = ResultSink::new(&config);
    let out_path = path.with_file_name("equivalences.json");
    sink.write_json(&report, fs::File::create(&out_path)?)?;

    let doc: EquivalenceDocument = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
    assert_eq!(doc.equivalences.len(), 4);
    assert!(doc
        .equivalences
        .iter()
        .filter(|r| r.kind == EntityKind::Property)
        .all(|r| r.predicate == config.property_predicate));

    Ok(())
}

#[tokio::test]
async fn test_parallel_run_agrees_with_sequential() -> Result<(), Box<dyn std::error::Error>> {
    let config = AlignmentConfig::default();
    let path = write_scores("parallel_run");
    let ingestor = Ingestor::new(&config);
    let orchestrator = AlignmentOrchestrator::new(&config);

    let sequential = orchestrator
        .run(ingestor.read_path(&path, Some(InputFormat::Csv))?.candidates, false)
        .await?;
    let parallel = orchestrator
        .run(ingestor.read_path(&path, Some(InputFormat::Csv))?.candidates, true)
        .await?;

    assert_eq!(sequential.totals, parallel.totals);
    assert_eq!(sequential.accepted, parallel.accepted);
    Ok(())
}

#[test]
fn test_one_sided_claims_stay_rejected_under_wide_slack() {
    let mut config = AlignmentConfig::default();
    let path = write_scores("wider_slack");

    let narrow = AlignmentOrchestrator::new(&config)
        .align(Ingestor::new(&config).read_path(&path, None).unwrap().candidates);

    // Organization/Group: 0.95 vs 0.93 is already within the default slack,
    // but Group's own side is unclaimed, so it stays rejected either way.
    config.slack = 0.2;
    let wide = AlignmentOrchestrator::new(&config)
        .align(Ingestor::new(&config).read_path(&path, None).unwrap().candidates);

    assert_eq!(narrow.accepted.len(), 4);
    assert_eq!(narrow.accepted, wide.accepted);
}
