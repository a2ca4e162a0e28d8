use anyhow::Result;
use coriolis::domain::ports::StatsOverride;
use coriolis::{CoriolisError, EtlEngine, GridPipeline, LocalStorage, TomlConfig, ZipsPipeline};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

// 經度跨度 16 度，投影比例剛好為 64，所有點都落在格子內部
const HISTORY: &str = "\
USAF,WBAN,STATION NAME,CTRY,FIPS,ST,CALL,LAT,LON,ELEV(.1M)
720001,00001,ALPHA FIELD,US,US,CA,KAAA,+40000,-120000,+00100
720002,00002,BETA MUNI,US,US,NV,KBBB,+36500,-113000,+00100
720003,00003,GAMMA INTL,US,US,NM,KCCC,+33000,-104000,+00100
720004,00004,DELTA AAF,US,US,AZ,KDDD,+35000,-110000,+00100
720005,00005,PACIFIC BUOY,US,US,CA,,+38000,-140000,+00000
";

const GRID: &str = r#"{"W": 5, "H": 3, "Size": 256, "Active": [[0, 0], [1, 0], [4, 1]]}"#;

const STATES: &str = "California,CA,6\nNevada,NV,32\nOregon,OR,41\n";
const POPULATION: &str = "zip,population\n95001,500\n89001,100\n89002,50\n97001,1000\n";
const ZIPS: &str = "\
95001\t+39.5\t-119.5\tx\tALPHA\t06
89001\t+37.0\t-112.5\tx\tBETA\t32
89002\t+36.8\t-112.9\tx\tBETA\t32
97001\t+50.0\t-130.0\tx\tASTORIA\t41
";

fn summary_line(id: (&str, &str), ymd: &str, avg: f64, max: f64, min: f64) -> String {
    let mut line = vec![b' '; 138];
    let mut put = |start: usize, s: &str| {
        line[start..start + s.len()].copy_from_slice(s.as_bytes());
    };
    put(0, id.0);
    put(7, id.1);
    put(14, ymd);
    put(24, &format!("{:>6.1}", avg));
    put(78, "  4.2");
    put(88, "  9.9");
    put(102, &format!("{:>6.1}", max));
    put(110, &format!("{:>6.1}", min));
    put(118, " 0.00");
    put(125, "999.9");
    String::from_utf8(line).unwrap()
}

fn write_archive(path: &Path, members: &[(&str, Vec<String>)]) -> Result<()> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, lines) in members {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        writeln!(gz, "STN--- WBAN   YEARMODA    TEMP       DEWP")?;
        for line in lines {
            writeln!(gz, "{}", line)?;
        }
        let data = gz.finish()?;

        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice())?;
    }
    std::fs::write(path, builder.into_inner()?)?;
    Ok(())
}

const A: (&str, &str) = ("720001", "00001");
const B: (&str, &str) = ("720002", "00002");
const C: (&str, &str) = ("720003", "00003");
const D: (&str, &str) = ("720004", "00004");

fn write_sources(data: &Path) -> Result<()> {
    std::fs::write(data.join("ish-history.csv"), HISTORY)?;
    std::fs::write(data.join("grid.json"), GRID)?;
    std::fs::write(data.join("states.csv"), STATES)?;
    std::fs::write(data.join("population-by-zip.csv"), POPULATION)?;
    std::fs::write(data.join("zips"), ZIPS)?;

    write_archive(
        &data.join("gsod_2012.tar"),
        &[
            (
                "720001-00001-2012.op.gz",
                vec![
                    summary_line(A, "20120615", 65.0, 73.0, 57.0),
                    summary_line(A, "20120616", 95.0, 103.0, 87.0),
                ],
            ),
            (
                "720002-00002-2012.op.gz",
                vec![summary_line(B, "20120110", 30.0, 38.0, 22.0)],
            ),
            (
                "720003-00003-2012.op.gz",
                vec![summary_line(C, "20120704", 65.0, 73.0, 57.0)],
            ),
            (
                "720004-00004-2012.op.gz",
                vec![
                    summary_line(D, "20120705", 66.0, 74.0, 58.0),
                    summary_line(D, "20120706", 66.0, 74.0, 58.0),
                ],
            ),
        ],
    )?;
    write_archive(
        &data.join("gsod_2013.tar"),
        &[
            (
                "720003-00003-2013.op.gz",
                vec![summary_line(C, "20130704", 64.0, 72.0, 56.0)],
            ),
            (
                "999999-99999-2013.op.gz",
                vec![summary_line(("999999", "99999"), "20130101", 0.0, 0.0, 0.0)],
            ),
        ],
    )?;
    Ok(())
}

fn settings(data: &TempDir, work: &TempDir) -> TomlConfig {
    let mut config = TomlConfig::default().with_dirs(
        Some(data.path().to_path_buf()),
        Some(work.path().to_path_buf()),
    );
    config.grid.nearest = 2;
    config.ingest.workers = 2;
    config
}

async fn build_zips(config: &TomlConfig, work: &TempDir) -> Result<()> {
    let pipeline = ZipsPipeline::new(LocalStorage::new(work.path()), config.clone());
    EtlEngine::new(pipeline).run().await?;
    Ok(())
}

async fn build_grid(config: TomlConfig, work: &TempDir) -> coriolis::Result<String> {
    let pipeline = GridPipeline::new(LocalStorage::new(work.path()), config);
    EtlEngine::new_with_monitoring(pipeline, false).run().await
}

fn read_json(path: &Path) -> Result<Value> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

fn region<'a>(doc: &'a Value, i: u64, j: u64) -> &'a Value {
    doc["Regions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["I"] == i && r["J"] == j)
        .unwrap_or_else(|| panic!("region ({}, {}) missing", i, j))
}

#[tokio::test]
async fn test_build_zips_then_grid_end_to_end() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let config = settings(&data, &work);

    build_zips(&config, &work).await?;
    let output = build_grid(config, &work).await?;
    assert_eq!(output, work.path().display().to_string());

    // 統計檔依 Total 由高到低排序
    let norm = read_json(&work.path().join("norm.json"))?;
    assert_eq!(norm["W"], 5);
    assert_eq!(norm["H"], 3);
    let order: Vec<(u64, u64)> = norm["Regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["I"].as_u64().unwrap(), r["J"].as_u64().unwrap()))
        .collect();
    assert_eq!(order, vec![(4, 1), (1, 0), (0, 0)]);

    let west = region(&norm, 0, 0);
    assert_eq!(west["City"], "ALPHA, CA");
    assert_eq!(
        west["Stations"],
        serde_json::json!(["720001-00001", "720002-00002"])
    );
    assert_eq!(west["Months"][0], 1);
    assert_eq!(west["Months"][5], 128);
    assert_eq!(west["Months"][6], 0);
    assert_eq!(west["Total"], 86);

    // (1,0) 的第二近測站位於未啟用的格子 (2,1)
    let middle = region(&norm, 1, 0);
    assert_eq!(middle["City"], "BETA, NV");
    assert_eq!(
        middle["Stations"],
        serde_json::json!(["720002-00002", "720004-00004"])
    );
    assert_eq!(middle["Months"][6], 255);
    assert_eq!(middle["Total"], 171);

    let east = region(&norm, 4, 1);
    assert_eq!(east["City"], "");
    assert_eq!(
        east["Stations"],
        serde_json::json!(["720003-00003", "720004-00004"])
    );
    assert_eq!(east["Total"], 255);

    // info.json 每行一個區域，欄優先順序
    let info = std::fs::read_to_string(work.path().join("info.json"))?;
    let lines: Vec<Value> = info
        .lines()
        .map(serde_json::from_str)
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["I"], 0);
    assert_eq!(lines[0]["J"], 0);
    assert_eq!(lines[0]["City"], "ALPHA, CA");
    assert_eq!(lines[1]["City"], "BETA, NV");
    assert_eq!(lines[1]["Zips"].as_array().unwrap().len(), 2);
    assert_eq!(lines[1]["Zips"][0]["Pop"], 150);
    assert_eq!(lines[2]["Zips"].as_array().unwrap().len(), 0);

    // 郵遞區號前綴索引
    let root = read_json(&work.path().join("z/root.json"))?;
    let keys: Vec<&String> = root.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["8", "9"]);
    assert_eq!(root["9"]["Z"][0], serde_json::json!(["95001", "ALPHA, CA", 0, 0]));
    assert_eq!(root["8"]["C"], serde_json::json!([256]));
    assert_eq!(root["8"]["Z"].as_array().unwrap().len(), 2);

    let deepest = read_json(&work.path().join("z/8/890.json"))?;
    assert_eq!(deepest["8900"]["Z"].as_array().unwrap().len(), 2);
    assert!(!work.path().join("z/9/97.json").exists());

    Ok(())
}

#[tokio::test]
async fn test_rebuild_is_idempotent() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let config = settings(&data, &work);

    build_zips(&config, &work).await?;
    build_grid(config.clone(), &work).await?;
    let first = std::fs::read(work.path().join("norm.json"))?;
    let first_info = std::fs::read(work.path().join("info.json"))?;

    build_grid(config, &work).await?;
    assert_eq!(std::fs::read(work.path().join("norm.json"))?, first);
    assert_eq!(std::fs::read(work.path().join("info.json"))?, first_info);
    Ok(())
}

#[tokio::test]
async fn test_override_copies_source_region_stats() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let mut config = settings(&data, &work);
    config.stats.profiles = vec!["norm".to_string(), "warm".to_string()];
    config.stats.overrides = vec![StatsOverride {
        target: [0, 0],
        source: [4, 1],
        reason: Some("bad station data".to_string()),
    }];

    build_zips(&config, &work).await?;
    build_grid(config, &work).await?;

    let norm = read_json(&work.path().join("norm.json"))?;
    let west = region(&norm, 0, 0);
    let east = region(&norm, 4, 1);
    assert_eq!(west["Months"], east["Months"]);
    assert_eq!(west["Total"], 255);
    // 覆蓋只影響統計，標籤與測站保留原樣
    assert_eq!(west["City"], "ALPHA, CA");
    assert_eq!(west["Stations"][0], "720001-00001");

    assert!(work.path().join("warm.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_override_of_inactive_cell_fails() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let mut config = settings(&data, &work);
    config.stats.overrides = vec![StatsOverride {
        target: [2, 2],
        source: [0, 0],
        reason: None,
    }];

    build_zips(&config, &work).await?;
    let err = build_grid(config, &work).await.unwrap_err();
    assert!(matches!(err, CoriolisError::DataInconsistencyError { .. }));
    assert!(!work.path().join("norm.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_not_enough_stations_aborts_without_output() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let mut config = settings(&data, &work);
    config.grid.nearest = 10;

    build_zips(&config, &work).await?;
    let err = build_grid(config, &work).await.unwrap_err();
    assert!(matches!(
        err,
        CoriolisError::InsufficientDataError { wanted: 10, .. }
    ));
    assert!(!work.path().join("info.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_grid_errors_surface_before_archives_are_read() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    // 截斷的資料行會讓封存檔解析失敗
    write_archive(
        &data.path().join("gsod_2014.tar"),
        &[("720001-00001-2014.op.gz", vec!["720001 00001  2014".to_string()])],
    )?;
    let mut config = settings(&data, &work);
    build_zips(&config, &work).await?;

    let err = build_grid(config.clone(), &work).await.unwrap_err();
    assert!(matches!(err, CoriolisError::ParseError { .. }));

    config.grid.nearest = 10;
    let err = build_grid(config, &work).await.unwrap_err();
    assert!(matches!(err, CoriolisError::InsufficientDataError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_station_outside_grid_is_invalid_input() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    // 4 欄只涵蓋 x < 1024，最東邊的測站剛好落在 x = 1024
    std::fs::write(
        data.path().join("grid.json"),
        r#"{"W": 4, "H": 3, "Size": 256, "Active": [[0, 0]]}"#,
    )?;
    let config = settings(&data, &work);

    build_zips(&config, &work).await?;
    let err = build_grid(config, &work).await.unwrap_err();
    assert!(matches!(err, CoriolisError::InvalidInputError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_missing_zips_json_fails() -> Result<()> {
    let data = TempDir::new()?;
    let work = TempDir::new()?;
    write_sources(data.path())?;
    let config = settings(&data, &work);

    let err = build_grid(config, &work).await.unwrap_err();
    assert!(matches!(err, CoriolisError::IoError(_)));
    Ok(())
}
