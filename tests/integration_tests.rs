use anyhow::Result;
use gcam_etl::utils::error::EtlError;
use gcam_etl::{EtlEngine, LocalStorage, QueryPipeline, RunConfig};
use httpmock::prelude::*;
use tempfile::TempDir;

const CORE_EXPORT: &str = "\
elec gen by gen tech
scenario,region,2020,2025,Units
core,date=2023-07-03T10:15:30-07:00,USA,1.5,2.5,EJ
land allocation
scenario,region,2020,2025,Units
core,date=2023-07-03T10:15:30-07:00,USA,10,11,thous km2
";

const PLCOE_EXPORT: &str = "\
elec gen by gen tech
scenario,region,2020,2025,Units
plcoe,date=2023-07-04T08:00:00-07:00,USA,2.0,2.0,EJ
land allocation
scenario,region,2020,2025,Units
plcoe,date=2023-07-04T08:00:00-07:00,USA,10,12,thous km2
";

fn write_exports(dir: &TempDir) -> Result<()> {
    std::fs::write(dir.path().join("queryout_core.csv"), CORE_EXPORT)?;
    std::fs::write(dir.path().join("queryout_plcoe.csv"), PLCOE_EXPORT)?;
    Ok(())
}

fn run_config(results_dir: &str, extra: &str) -> Result<RunConfig> {
    let content = format!(
        r#"
[run]
name = "coal-exit"
results_dir = "{}"

[[scenarios]]
name = "core"

[[scenarios]]
name = "plcoe"

[diff]
baseline = "core"
{}
"#,
        results_dir.replace('\\', "/"),
        extra
    );
    Ok(RunConfig::from_toml_str(&content)?)
}

fn build_engine(config: RunConfig) -> EtlEngine<QueryPipeline<LocalStorage>> {
    let storage = LocalStorage::new(config.results_dir().to_string());
    let pipeline = QueryPipeline::new(storage, config);
    EtlEngine::new(pipeline)
}

fn read_output(dir: &TempDir, file: &str) -> Result<String> {
    let path = dir.path().join("csv_results").join(file);
    Ok(String::from_utf8(std::fs::read(path)?)?)
}

#[tokio::test]
async fn test_end_to_end_writes_long_tables_and_diffs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;

    let config = run_config(temp_dir.path().to_str().unwrap(), "")?;
    let engine = build_engine(config);

    let output_path = engine.run().await?;
    assert_eq!(output_path, "csv_results");

    let table = read_output(&temp_dir, "elec gen by gen tech.csv")?;
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "scenario,date,region,Units,scen_name,year,value");
    // core rows first (year-major), then plcoe rows
    assert_eq!(
        lines[1],
        "core,date=2023-07-03T10:15:30-07:00,USA,EJ,core,2020,1.5"
    );
    assert_eq!(
        lines[2],
        "core,date=2023-07-03T10:15:30-07:00,USA,EJ,core,2025,2.5"
    );
    assert_eq!(
        lines[3],
        "plcoe,date=2023-07-04T08:00:00-07:00,USA,EJ,plcoe,2020,2.0"
    );
    assert_eq!(lines.len(), 5);

    let diff = read_output(&temp_dir, "elec gen by gen tech_diff.csv")?;
    let lines: Vec<&str> = diff.lines().collect();
    assert_eq!(lines[0], "scen_name,region,Units,year,value");
    assert_eq!(lines[1], "plcoe,USA,EJ,2020,0.5");
    assert_eq!(lines[2], "plcoe,USA,EJ,2025,-0.5");

    let land_diff = read_output(&temp_dir, "land allocation_diff.csv")?;
    assert!(land_diff.contains("plcoe,USA,thous km2,2020,0"));
    assert!(land_diff.contains("plcoe,USA,thous km2,2025,1"));

    Ok(())
}

#[tokio::test]
async fn test_missing_scenario_file_aborts_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("queryout_core.csv"), CORE_EXPORT)?;
    // queryout_plcoe.csv deliberately absent

    let config = run_config(temp_dir.path().to_str().unwrap(), "")?;
    let engine = build_engine(config);

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, EtlError::IoError(_)));

    // nothing gets written when extraction fails
    assert!(!temp_dir.path().join("csv_results").exists());

    Ok(())
}

#[tokio::test]
async fn test_malformed_export_aborts_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // second sentinel arrives before the first table got a header
    let malformed = "elec gen by gen tech\nland allocation\nscenario,region,2020\ncore,d,USA,1\n";
    std::fs::write(temp_dir.path().join("queryout_core.csv"), malformed)?;
    std::fs::write(temp_dir.path().join("queryout_plcoe.csv"), PLCOE_EXPORT)?;

    let config = run_config(temp_dir.path().to_str().unwrap(), "")?;
    let engine = build_engine(config);

    let err = engine.run().await.unwrap_err();
    match err {
        EtlError::QueryParseError { scenario, line, .. } => {
            assert_eq!(scenario, "core");
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_include_filter_and_drop_columns_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;

    let config = run_config(
        temp_dir.path().to_str().unwrap(),
        r#"
[tables]
include = ["land allocation"]

[filters]
drop_columns = ["date"]
"#,
    )?;
    let engine = build_engine(config);

    engine.run().await?;

    let output_dir = temp_dir.path().join("csv_results");
    assert!(output_dir.join("land allocation.csv").exists());
    assert!(!output_dir.join("elec gen by gen tech.csv").exists());

    let table = read_output(&temp_dir, "land allocation.csv")?;
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "scenario,region,Units,scen_name,year,value");
    assert_eq!(lines[1], "core,USA,thous km2,core,2020,10");

    Ok(())
}

#[tokio::test]
async fn test_report_rendered_from_downloaded_template() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;
    std::fs::write(temp_dir.path().join("style.css"), "body { margin: 0; }")?;

    let server = MockServer::start();
    let template_mock = server.mock(|when, then| {
        when.method(GET).path("/template.html");
        then.status(200)
            .header("Content-Type", "text/html")
            .body("<html><title>{{TITLE}}</title><script>let data = {{TABLES_JSON}};</script></html>");
    });

    let config = run_config(
        temp_dir.path().to_str().unwrap(),
        &format!(
            r#"
[report]
title = "Coal exit comparison"
template_url = "{}"
copy_files = ["style.css"]
"#,
            server.url("/template.html")
        ),
    )?;
    let engine = build_engine(config);

    engine.run().await?;
    template_mock.assert();

    let html = read_output(&temp_dir, "report.html")?;
    assert!(html.contains("<title>Coal exit comparison</title>"));
    assert!(html.contains(r#""elec gen by gen tech""#));
    assert!(html.contains(r#""land allocation_diff""#));
    assert!(!html.contains("{{TABLES_JSON}}"));

    let css = read_output(&temp_dir, "style.css")?;
    assert_eq!(css, "body { margin: 0; }");

    Ok(())
}

#[tokio::test]
async fn test_local_template_wins_over_template_url() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;
    std::fs::write(
        temp_dir.path().join("template.html"),
        "<html>local {{TABLES_JSON}}</html>",
    )?;

    let server = MockServer::start();
    let remote = server.mock(|when, then| {
        when.method(GET).path("/template.html");
        then.status(200).body("<html>remote {{TABLES_JSON}}</html>");
    });

    let config = run_config(
        temp_dir.path().to_str().unwrap(),
        &format!(
            r#"
[report]
template_file = "template.html"
template_url = "{}"
"#,
            server.url("/template.html")
        ),
    )?;
    let engine = build_engine(config);

    engine.run().await?;
    remote.assert_hits(0);

    let html = read_output(&temp_dir, "report.html")?;
    assert!(html.starts_with("<html>local "));

    Ok(())
}

#[tokio::test]
async fn test_template_download_failure_aborts_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/template.html");
        then.status(503);
    });

    let config = run_config(
        temp_dir.path().to_str().unwrap(),
        &format!(
            r#"
[report]
template_url = "{}"
"#,
            server.url("/template.html")
        ),
    )?;
    let engine = build_engine(config);

    let err = engine.run().await.unwrap_err();
    match err {
        EtlError::ReportError { message } => assert!(message.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_zip_bundle_collects_all_outputs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;

    let config = run_config(
        temp_dir.path().to_str().unwrap(),
        r#"
[load.compression]
enabled = true
filename = "results.zip"
"#,
    )?;

    let storage = LocalStorage::new(config.results_dir().to_string());
    let pipeline = QueryPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    engine.run().await?;

    let zip_path = temp_dir.path().join("csv_results").join("results.zip");
    assert!(zip_path.exists());

    let zip_data = std::fs::read(&zip_path)?;
    let cursor = std::io::Cursor::new(zip_data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "elec gen by gen tech.csv",
            "elec gen by gen tech_diff.csv",
            "land allocation.csv",
            "land allocation_diff.csv",
        ]
    );

    // bundled CSV matches what landed next to the archive
    let mut table = archive.by_name("elec gen by gen tech.csv")?;
    let mut content = String::new();
    std::io::Read::read_to_string(&mut table, &mut content)?;
    assert_eq!(content, read_output(&temp_dir, "elec gen by gen tech.csv")?);

    Ok(())
}

#[tokio::test]
async fn test_run_without_diff_section_writes_base_tables_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_exports(&temp_dir)?;

    let content = format!(
        r#"
[run]
name = "coal-exit"
results_dir = "{}"

[[scenarios]]
name = "core"

[[scenarios]]
name = "plcoe"
"#,
        temp_dir.path().to_str().unwrap().replace('\\', "/")
    );
    let config = RunConfig::from_toml_str(&content)?;
    let engine = build_engine(config);

    engine.run().await?;

    let output_dir = temp_dir.path().join("csv_results");
    assert!(output_dir.join("elec gen by gen tech.csv").exists());
    assert!(!output_dir.join("elec gen by gen tech_diff.csv").exists());

    Ok(())
}
