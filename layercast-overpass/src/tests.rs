//! End-to-end pipeline tests against stubbed sources.

use std::time::Duration;

use camino::Utf8PathBuf;
use layercast_core::{BoundingBox, LayerCatalog, RegionCatalog};
use rstest::{fixture, rstest};

use crate::{
    FETCH_LOG_FILE_NAME, FetchOutcome, NETWORK_ERROR_STATUS, PendingSource, Pipeline,
    PipelineOptions, StubSource, block_on_for_tests, build_query,
};

const NODE_BODY: &str = r#"{
    "elements": [
        {
            "type": "node",
            "id": 1,
            "lat": 47.0,
            "lon": 8.0,
            "tags": {"historic": "castle"}
        }
    ],
    "osm3s": {"timestamp_osm_base": "2019-05-01T00:00:00Z"}
}"#;

const EMPTY_BODY: &str = r#"{"elements": [], "osm3s": {}}"#;

#[fixture]
fn output_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("create temp directory");
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .expect("temp path should be UTF-8");
    (temp, path)
}

fn builtin_pipeline<S: crate::OverpassSource>(source: S, output_dir: &Utf8PathBuf) -> Pipeline<S> {
    Pipeline::new(
        source,
        LayerCatalog::builtin(),
        RegionCatalog::builtin(),
        PipelineOptions::new(output_dir.clone()),
    )
}

fn log_records(output_dir: &Utf8PathBuf) -> Vec<serde_json::Value> {
    let contents = std::fs::read_to_string(output_dir.join(FETCH_LOG_FILE_NAME))
        .expect("fetch log exists");
    contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("log line is valid JSON"))
        .collect()
}

#[rstest]
fn a_fetched_node_is_published_as_geojson(output_dir: (tempfile::TempDir, Utf8PathBuf)) {
    let (_temp, root) = output_dir;
    let source = StubSource::with_body(NODE_BODY);
    let pipeline = builtin_pipeline(&source, &root);

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.all_failed());

    let published =
        std::fs::read_to_string(root.join("osm-castles-CH.geojson")).expect("layer file");
    assert_eq!(
        published,
        "{\"features\":[{\"geometry\":{\"coordinates\":[8.0,47.0],\"type\":\"Point\"},\
         \"properties\":{\".id\":\"N1\",\"historic\":\"castle\"},\"type\":\"Feature\"}],\
         \"properties\":{\"osm_base_timestamp\":\"2019-05-01T00:00:00Z\"},\
         \"type\":\"FeatureCollection\"}"
    );

    let records = log_records(&root);
    assert_eq!(records.len(), 1);
    let record = records.first().expect("one record");
    assert_eq!(record["layer"], "castles");
    assert_eq!(record["region"], "CH");
    assert_eq!(record["fetch_status"], "ok");
    assert_eq!(record["fetch_http_status_code"], 200);
    assert_eq!(record["output_changed"], true);
    assert_eq!(record["output_bytes"], published.len() as u64);
    assert_eq!(record["tags_total"], 2);
    assert_eq!(record["osm_base_timestamp"], "2019-05-01T00:00:00Z");
    assert_eq!(record["geometry_type_most_common"]["Point"], 1);
    assert!(record["fetch_duration_seconds"].is_number());
}

#[rstest]
fn the_issued_query_matches_the_catalogs(output_dir: (tempfile::TempDir, Utf8PathBuf)) {
    let (_temp, root) = output_dir;
    let source = StubSource::with_body(NODE_BODY);
    let pipeline = builtin_pipeline(&source, &root);
    block_on_for_tests(pipeline.run()).expect("run completes");

    let expected = build_query(
        &LayerCatalog::builtin(),
        &RegionCatalog::builtin(),
        "castles",
        "CH",
    )
    .expect("builtin pair");
    assert_eq!(source.queries(), [expected]);
}

#[rstest]
fn a_transport_failure_is_logged_with_the_sentinel_status(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
) {
    let (_temp, root) = output_dir;
    let source = StubSource::new([FetchOutcome::TransportError {
        url: "stub://overpass".to_owned(),
        message: "connection refused".to_owned(),
    }]);
    let pipeline = builtin_pipeline(&source, &root);

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert!(summary.all_failed());
    assert!(!root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "fail");
    assert_eq!(record["fetch_http_status_code"], NETWORK_ERROR_STATUS);
}

#[rstest]
#[case::too_many_requests(429)]
#[case::gateway_timeout(504)]
fn a_non_2xx_response_is_logged_as_fail(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
    #[case] status: u16,
) {
    let (_temp, root) = output_dir;
    let source = StubSource::new([FetchOutcome::Ok {
        body: b"rate limited".to_vec(),
        status,
    }]);
    let pipeline = builtin_pipeline(&source, &root);

    block_on_for_tests(pipeline.run()).expect("run completes");
    assert!(!root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "fail");
    assert_eq!(record["fetch_http_status_code"], status);
}

#[rstest]
fn an_empty_result_is_fail_nofeatures_and_publishes_nothing(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
) {
    let (_temp, root) = output_dir;
    let source = StubSource::with_body(EMPTY_BODY);
    let pipeline = builtin_pipeline(&source, &root);

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert!(summary.all_failed());
    assert!(!root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "fail_nofeatures");
    assert_eq!(record["fetch_http_status_code"], 200);
    assert_eq!(record["tags_total"], 0);
}

#[rstest]
fn an_unparseable_body_is_logged_as_fail(output_dir: (tempfile::TempDir, Utf8PathBuf)) {
    let (_temp, root) = output_dir;
    let source = StubSource::with_body("<html>server error</html>");
    let pipeline = builtin_pipeline(&source, &root);

    block_on_for_tests(pipeline.run()).expect("run completes");
    assert!(!root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "fail");
    assert_eq!(record["fetch_http_status_code"], 200);
}

#[rstest]
fn an_expired_deadline_is_logged_as_timeout(output_dir: (tempfile::TempDir, Utf8PathBuf)) {
    let (_temp, root) = output_dir;
    let options =
        PipelineOptions::new(root.clone()).with_deadline(Duration::from_millis(20));
    let pipeline = Pipeline::new(
        PendingSource,
        LayerCatalog::builtin(),
        RegionCatalog::builtin(),
        options,
    );

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert!(summary.all_failed());
    assert!(!root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "timeout");
    assert!(
        record.get("fetch_http_status_code").is_none(),
        "a timeout carries no status code"
    );
}

#[rstest]
fn republishing_identical_content_reports_no_change(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
) {
    let (_temp, root) = output_dir;
    let source = StubSource::new([
        FetchOutcome::Ok {
            body: NODE_BODY.into(),
            status: 200,
        },
        FetchOutcome::Ok {
            body: NODE_BODY.into(),
            status: 200,
        },
    ]);
    let pipeline = builtin_pipeline(&source, &root);

    block_on_for_tests(pipeline.run()).expect("first run");
    block_on_for_tests(pipeline.run()).expect("second run");

    let records = log_records(&root);
    assert_eq!(records.len(), 2);
    assert_eq!(records.first().expect("first")["output_changed"], true);
    let second = records.get(1).expect("second");
    assert_eq!(second["fetch_status"], "ok");
    assert_eq!(second["output_changed"], false);
}

#[rstest]
fn a_publish_failure_after_a_good_fetch_is_logged_as_crash(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
) {
    let (_temp, root) = output_dir;
    // A directory squatting on the target path makes publication fail
    // after the fetch and normalisation both succeeded.
    std::fs::create_dir(root.join("osm-castles-CH.geojson")).expect("create blocking dir");
    let source = StubSource::with_body(NODE_BODY);
    let pipeline = builtin_pipeline(&source, &root);

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert_eq!(summary.attempted, 1);
    assert!(summary.all_failed());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "crash");
    assert_eq!(record["fetch_http_status_code"], 200);
    assert_eq!(record["tags_total"], 2, "stats were computed before the crash");
}

#[rstest]
fn malformed_elements_are_counted_and_the_rest_published(
    output_dir: (tempfile::TempDir, Utf8PathBuf),
) {
    let (_temp, root) = output_dir;
    // One good node plus a way too short to be a line.
    let body = r#"{
        "elements": [
            {"type": "node", "id": 1, "lat": 47.0, "lon": 8.0,
             "tags": {"historic": "castle"}},
            {"type": "way", "id": 2, "geometry": [{"lat": 47.0, "lon": 8.0}],
             "tags": {"historic": "castle"}}
        ],
        "osm3s": {}
    }"#;
    let source = StubSource::with_body(body);
    let pipeline = builtin_pipeline(&source, &root);

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert_eq!(summary.succeeded, 1);
    assert!(root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    let record = records.first().expect("one record");
    assert_eq!(record["fetch_status"], "ok");
    assert_eq!(record["elements_skipped"], 1);
    assert_eq!(record["geometry_type_most_common"]["Point"], 1);
}

#[rstest]
fn one_failing_pair_never_aborts_the_pass(output_dir: (tempfile::TempDir, Utf8PathBuf)) {
    let (_temp, root) = output_dir;
    let mut regions = RegionCatalog::builtin();
    regions.insert(
        "AT",
        BoundingBox::new(46.35, 9.5, 49.05, 17.2).expect("valid bounds"),
    );
    // Region codes iterate in sorted order, so AT is attempted before CH.
    let source = StubSource::new([
        FetchOutcome::TransportError {
            url: "stub://overpass".to_owned(),
            message: "connection reset".to_owned(),
        },
        FetchOutcome::Ok {
            body: NODE_BODY.into(),
            status: 200,
        },
    ]);
    let pipeline = Pipeline::new(
        &source,
        LayerCatalog::builtin(),
        regions,
        PipelineOptions::new(root.clone()),
    );

    let summary = block_on_for_tests(pipeline.run()).expect("run completes");
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.all_failed());
    assert!(!root.join("osm-castles-AT.geojson").exists());
    assert!(root.join("osm-castles-CH.geojson").exists());

    let records = log_records(&root);
    assert_eq!(records.len(), 2);
    assert_eq!(records.first().expect("first")["region"], "AT");
    assert_eq!(records.first().expect("first")["fetch_status"], "fail");
    assert_eq!(records.get(1).expect("second")["region"], "CH");
    assert_eq!(records.get(1).expect("second")["fetch_status"], "ok");
}
