//! File-to-file reconstruction: parameter file and event file in,
//! reports and TOF dump out.

use hodoscope_algorithms::Hodoscope;
use hodoscope_core::{EventReport, EventStatus, EventTypeClassifier};
use hodoscope_io::{
    load_config, Error, EventFileReader, OutputFormat, ReportWriter, TofDumpWriter,
};
use serde_json::json;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn params() -> serde_json::Value {
    json!({
        "hhodo_num_planes": 2,
        "hhodo_plane_names": "1x 1y",
        "hhodo_slop": [2.0, 3.0],
        "hscin_1x_nr": 3,
        "hscin_1x_zpos": 77.0,
        "hscin_1x_dzpos": 2.1,
        "hscin_1x_size": 8.0,
        "hscin_1x_spacing": 7.5,
        "hscin_1x_left": 60.0,
        "hscin_1x_right": -60.0,
        "hscin_1x_offset": 0.0,
        "hscin_1x_center": [-7.5, 0.0, 7.5],
        "hscin_1y_nr": 2,
        "hscin_1y_zpos": 97.0,
        "hscin_1y_dzpos": 2.1,
        "hscin_1y_size": 8.0,
        "hscin_1y_spacing": 7.5,
        "hscin_1y_bot": 60.0,
        "hscin_1y_top": -60.0,
        "hscin_1y_offset": 0.0,
        "hscin_1y_center": [-3.75, 3.75],
        "htofusinginvadc": 0,
        "hscin_tdc_min": 0.0,
        "hscin_tdc_max": 4000.0,
        "hscin_tdc_to_time": 0.1,
        "hstart_time_center": 32.0,
        "hstart_time_slop": 100.0,
        "hpathlength_central": 2200.0,
        "hxloscin": [1, 1],
        "hxhiscin": [3, 3],
        "hyloscin": [1, 1],
        "hyhiscin": [2, 2],
        "htrack_eff_test_num_scin_planes": 2
    })
}

fn write_file(path: &std::path::Path, content: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn events() -> String {
    let hit = json!({
        "plane": 1,
        "paddle": 2,
        "pos_tdc": [{"time_raw": 1500, "time": 1500}],
        "neg_tdc": [{"time_raw": 1510, "time": 1510}],
        "pos_adc": {"pulses": [{"ped": 100.0, "int": 900.0, "amp": 200.0, "amp_raw": 200, "time": 150.0}]},
        "neg_adc": {"pulses": [{"ped": 100.0, "int": 800.0, "amp": 180.0, "amp_raw": 180, "time": 151.0}]}
    });
    [
        json!({"event_number": 1, "event_type": 4, "hits": []}),
        json!({"event_number": 2, "event_type": 1, "hits": []}),
        json!({
            "event_number": 3,
            "event_type": 1,
            "hits": [hit],
            "tracks": [{"x": 0.0, "y": 0.0, "momentum": 2.0, "mass": 0.000_511}],
            "cherenkov_npe": 4.0
        }),
    ]
    .iter()
    .map(|e| format!("{e}\n"))
    .collect()
}

#[test]
fn test_load_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hodo.json");
    write_file(&path, &params().to_string());

    let config = load_config(&path, "h").unwrap();
    assert_eq!(config.n_planes(), 2);
    assert_eq!(config.planes[1].name, "1y");

    // keys are looked up under the given prefix only
    assert!(matches!(load_config(&path, "p"), Err(Error::Core(_))));
    assert!(matches!(
        load_config(dir.path().join("missing.json"), "h"),
        Err(Error::Core(_) | Error::Io(_))
    ));
}

#[test]
fn test_process_file_to_reports() {
    let dir = TempDir::new().unwrap();
    let params_path = dir.path().join("hodo.json");
    write_file(&params_path, &params().to_string());
    let events_path = dir.path().join("run.jsonl");
    write_file(&events_path, &events());

    let config = load_config(&params_path, "h").unwrap();
    let mut hodoscope = Hodoscope::new(config);
    let classifier = EventTypeClassifier::new(vec![4]);

    let reader = EventFileReader::open(&events_path).unwrap();
    assert_eq!(reader.event_count(), 3);

    let output = NamedTempFile::new().unwrap();
    let dump = NamedTempFile::new().unwrap();
    let mut writer = ReportWriter::create(output.path(), OutputFormat::JsonLines).unwrap();
    let mut dump_writer = TofDumpWriter::create(dump.path()).unwrap();
    for record in reader.read_all().unwrap() {
        let report =
            hodoscope.process_event(&record.event, &record.tracks, &classifier, &record);
        dump_writer.write(&report.tof_dump).unwrap();
        writer.write(&report).unwrap();
    }
    writer.flush().unwrap();
    dump_writer.flush().unwrap();
    assert_eq!(writer.written(), 3);

    let content = std::fs::read_to_string(output.path()).unwrap();
    let reports: Vec<EventReport> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let statuses: Vec<EventStatus> = reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![EventStatus::Pedestal, EventStatus::Empty, EventStatus::Processed]
    );
    assert!(reports[0].planes.is_empty());
    assert_eq!(reports[1].planes.len(), 2);
    assert_eq!(reports[2].event_number, 3);
    assert_eq!(reports[2].tracks.len(), 1);

    // dumping is off unless requested
    assert!(std::fs::read_to_string(dump.path()).unwrap().is_empty());
    assert_eq!(dump_writer.events(), 0);
}
